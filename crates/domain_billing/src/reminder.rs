//! Reminders and escalation levels

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{InvoiceId, ReminderId};

use crate::error::BillingError;

/// Delivery channel for a reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Whatsapp,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::Whatsapp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
        }
    }

    /// SMS and WhatsApp are addressed by phone number
    pub fn needs_phone(&self) -> bool {
        matches!(self, Channel::Sms | Channel::Whatsapp)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "SMS",
            Channel::Whatsapp => "WhatsApp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::Whatsapp),
            other => Err(BillingError::validation(format!("unknown channel '{}'", other))),
        }
    }
}

/// Escalation level of a reminder
///
/// Serialized as its number (1, 2, 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EscalationLevel {
    /// Level 1, on the due date
    Polite = 1,
    /// Level 2, a week later
    Firm = 2,
    /// Level 3, final notice
    Urgent = 3,
}

impl EscalationLevel {
    pub const ALL: [EscalationLevel; 3] = [
        EscalationLevel::Polite,
        EscalationLevel::Firm,
        EscalationLevel::Urgent,
    ];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// Days after the due date at which the planned reminder fires
    pub fn offset_days(&self) -> i64 {
        match self {
            EscalationLevel::Polite => 0,
            EscalationLevel::Firm => 7,
            EscalationLevel::Urgent => 14,
        }
    }
}

impl TryFrom<u8> for EscalationLevel {
    type Error = BillingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EscalationLevel::Polite),
            2 => Ok(EscalationLevel::Firm),
            3 => Ok(EscalationLevel::Urgent),
            other => Err(BillingError::validation(format!(
                "escalation level must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

impl From<EscalationLevel> for u8 {
    fn from(level: EscalationLevel) -> u8 {
        level.number()
    }
}

impl fmt::Display for EscalationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Reminder status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Failed => "failed",
            ReminderStatus::Cancelled => "cancelled",
        }
    }

    /// Sent, failed and cancelled reminders are never touched again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReminderStatus::Pending)
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReminderStatus::Pending),
            "sent" => Ok(ReminderStatus::Sent),
            "failed" => Ok(ReminderStatus::Failed),
            "cancelled" => Ok(ReminderStatus::Cancelled),
            other => Err(BillingError::validation(format!("unknown reminder status '{}'", other))),
        }
    }
}

/// A scheduled reminder for an invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub invoice_id: InvoiceId,
    #[serde(rename = "type")]
    pub channel: Channel,
    pub escalation_level: EscalationLevel,
    pub scheduled_date: DateTime<Utc>,
    pub status: ReminderStatus,
    /// Set only when the reminder was delivered
    pub sent_date: Option<DateTime<Utc>>,
    /// Body that was delivered
    pub ai_message: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn pending(
        invoice_id: InvoiceId,
        channel: Channel,
        escalation_level: EscalationLevel,
        scheduled_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReminderId::new_v7(),
            invoice_id,
            channel,
            escalation_level,
            scheduled_date,
            status: ReminderStatus::Pending,
            sent_date: None,
            ai_message: None,
            error_message: None,
            created_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ReminderStatus::Pending && self.scheduled_date <= now
    }
}

/// Midnight UTC of `due_date` plus the level's offset
pub fn scheduled_for(due_date: NaiveDate, level: EscalationLevel) -> DateTime<Utc> {
    let midnight = due_date.and_time(chrono::NaiveTime::MIN).and_utc();
    midnight + Duration::days(level.offset_days())
}
