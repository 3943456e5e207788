//! Row types and their mapping onto domain types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use core_kernel::{ClientId, Currency, InvoiceId, Money, NotificationId, ReminderId, UserId};
use domain_billing::{
    Channel, Client, EscalationLevel, HistoryNote, Invoice, InvoiceStatus, Notification, Reminder, ReminderStatus,
    Severity,
};

use crate::error::DatabaseError;

pub(crate) const INVOICE_COLUMNS: &str = "id, user_id, client_id, invoice_number, amount, currency, \
     due_date, description, status, payment_url, created_at, updated_at";

pub(crate) const CLIENT_COLUMNS: &str =
    "id, user_id, name, email, phone, whatsapp, history_notes, created_at, updated_at";

pub(crate) const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, type, read, link, created_at";

pub(crate) const REMINDER_COLUMNS: &str = "id, invoice_id, type, escalation_level, scheduled_date, \
     status, sent_date, ai_message, error_message, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct InvoiceRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    pub invoice_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub status: String,
    pub payment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DatabaseError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let currency = row.currency.parse::<Currency>().map_err(|e| DatabaseError::invalid(e.to_string()))?;
        Ok(Invoice {
            id: InvoiceId::from(row.id),
            user_id: UserId::from(row.user_id),
            client_id: row.client_id.map(ClientId::from),
            invoice_number: row.invoice_number,
            amount: Money::new(row.amount, currency),
            due_date: row.due_date,
            description: row.description,
            status: row.status.parse::<InvoiceStatus>().map_err(|e| DatabaseError::invalid(e.to_string()))?,
            payment_url: row.payment_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ClientRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub whatsapp: bool,
    pub history_notes: Json<Vec<HistoryNote>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: ClientId::from(row.id),
            user_id: UserId::from(row.user_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            whatsapp: row.whatsapp,
            history_notes: row.history_notes.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ReminderRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    #[sqlx(rename = "type")]
    pub channel: String,
    pub escalation_level: i16,
    pub scheduled_date: DateTime<Utc>,
    pub status: String,
    pub sent_date: Option<DateTime<Utc>>,
    pub ai_message: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = DatabaseError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        let channel = row.channel.parse::<Channel>().map_err(|e| DatabaseError::invalid(e.to_string()))?;
        let escalation_level = u8::try_from(row.escalation_level)
            .ok()
            .and_then(|n| EscalationLevel::try_from(n).ok())
            .ok_or_else(|| DatabaseError::invalid(format!("escalation level {}", row.escalation_level)))?;

        Ok(Reminder {
            id: ReminderId::from(row.id),
            invoice_id: InvoiceId::from(row.invoice_id),
            channel,
            escalation_level,
            scheduled_date: row.scheduled_date,
            status: row.status.parse::<ReminderStatus>().map_err(|e| DatabaseError::invalid(e.to_string()))?,
            sent_date: row.sent_date,
            ai_message: row.ai_message,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[sqlx(rename = "type")]
    pub severity: String,
    pub read: bool,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DatabaseError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: NotificationId::from(row.id),
            user_id: UserId::from(row.user_id),
            title: row.title,
            message: row.message,
            severity: row.severity.parse::<Severity>().map_err(DatabaseError::invalid)?,
            read: row.read,
            link: row.link,
            created_at: row.created_at,
        })
    }
}
