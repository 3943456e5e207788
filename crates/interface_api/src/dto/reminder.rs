//! Reminder DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, ReminderId};
use domain_billing::{Channel, EscalationLevel, Reminder, ReminderStatus};
use domain_messaging::ComposedMessage;

/// Body for queueing or previewing a reminder
#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    pub channel: Channel,
    /// Defaults to level 1
    pub level: Option<EscalationLevel>,
}

impl ReminderRequest {
    pub fn level(&self) -> EscalationLevel {
        self.level.unwrap_or(EscalationLevel::Polite)
    }
}

#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    pub id: ReminderId,
    pub invoice_id: InvoiceId,
    #[serde(rename = "type")]
    pub channel: Channel,
    pub escalation_level: EscalationLevel,
    pub scheduled_date: DateTime<Utc>,
    pub status: ReminderStatus,
    pub sent_date: Option<DateTime<Utc>>,
    pub ai_message: Option<String>,
    pub error_message: Option<String>,
}

impl From<Reminder> for ReminderResponse {
    fn from(reminder: Reminder) -> Self {
        Self {
            id: reminder.id,
            invoice_id: reminder.invoice_id,
            channel: reminder.channel,
            escalation_level: reminder.escalation_level,
            scheduled_date: reminder.scheduled_date,
            status: reminder.status,
            sent_date: reminder.sent_date,
            ai_message: reminder.ai_message,
            error_message: reminder.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub channel: Channel,
    pub escalation_level: EscalationLevel,
    pub subject: Option<String>,
    pub body: String,
    pub html: Option<String>,
    pub tone: String,
    pub suggested_action: Option<String>,
    pub ai_generated: bool,
}

impl PreviewResponse {
    pub fn new(channel: Channel, level: EscalationLevel, message: ComposedMessage) -> Self {
        Self {
            channel,
            escalation_level: level,
            subject: message.subject,
            body: message.body,
            html: message.html,
            tone: message.tone,
            suggested_action: message.suggested_action,
            ai_generated: message.ai_generated,
        }
    }
}
