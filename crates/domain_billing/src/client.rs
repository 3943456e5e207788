//! Clients and their payment history

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClientId, InvoiceId, UserId};

use crate::error::BillingError;

/// Kind of history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Payment,
    Reminder,
    Note,
}

/// One entry in a client's append-only history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryNote {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<InvoiceId>,
    /// Only meaningful for payment entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_late: Option<i64>,
}

impl HistoryNote {
    /// A payment received, `days_late` days after the due date
    pub fn payment(date: NaiveDate, invoice_id: InvoiceId, invoice_number: &str, days_late: i64) -> Self {
        let message = if days_late > 0 {
            format!("Invoice {} paid {} day(s) late", invoice_number, days_late)
        } else {
            format!("Invoice {} paid on time", invoice_number)
        };
        Self {
            date,
            kind: HistoryKind::Payment,
            message,
            invoice_id: Some(invoice_id),
            days_late: Some(days_late.max(0)),
        }
    }

    /// A reminder that went out successfully
    pub fn reminder(date: NaiveDate, invoice_id: InvoiceId, message: impl Into<String>) -> Self {
        Self {
            date,
            kind: HistoryKind::Reminder,
            message: message.into(),
            invoice_id: Some(invoice_id),
            days_late: None,
        }
    }

    pub fn note(date: NaiveDate, message: impl Into<String>) -> Self {
        Self {
            date,
            kind: HistoryKind::Note,
            message: message.into(),
            invoice_id: None,
            days_late: None,
        }
    }
}

/// Contact details used to find or create a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A client billed by a user
///
/// The email address is the deduplication key within one user's clients and
/// is stored normalised (trimmed, lowercase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub whatsapp: bool,
    pub history_notes: Vec<HistoryNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Creates a client from contact details; WhatsApp is enabled when a
    /// phone number is present
    pub fn new(user_id: UserId, details: ClientDetails, now: DateTime<Utc>) -> Result<Self, BillingError> {
        let name = details.name.trim().to_string();
        if name.is_empty() {
            return Err(BillingError::validation("client name is required"));
        }
        let email = normalize_email(&details.email);
        if !email.contains('@') {
            return Err(BillingError::validation(format!("invalid client email '{}'", details.email)));
        }
        let phone = details
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            id: ClientId::new_v7(),
            user_id,
            name,
            email,
            whatsapp: phone.is_some(),
            phone,
            history_notes: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// First word of the name, used by the short channel templates
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// Lowercases and trims an address for dedup lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(phone: Option<&str>) -> ClientDetails {
        ClientDetails {
            name: "Ada Lovelace".to_string(),
            email: "  Ada@Example.COM ".to_string(),
            phone: phone.map(str::to_string),
        }
    }

    #[test]
    fn test_client_email_is_normalized() {
        let client = Client::new(UserId::new(), details(None), Utc::now()).unwrap();
        assert_eq!(client.email, "ada@example.com");
        assert!(!client.whatsapp);
        assert_eq!(client.first_name(), "Ada");
    }

    #[test]
    fn test_whatsapp_follows_phone() {
        let client = Client::new(UserId::new(), details(Some("0803 123 4567")), Utc::now()).unwrap();
        assert!(client.whatsapp);

        let blank = Client::new(UserId::new(), details(Some("   ")), Utc::now()).unwrap();
        assert!(!blank.whatsapp);
        assert!(blank.phone.is_none());
    }

    #[test]
    fn test_payment_note_message() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let late = HistoryNote::payment(date, InvoiceId::new(), "INV-9", 4);
        assert_eq!(late.days_late, Some(4));
        assert!(late.message.contains("4 day(s) late"));

        let on_time = HistoryNote::payment(date, InvoiceId::new(), "INV-9", -2);
        assert_eq!(on_time.days_late, Some(0));
        assert!(on_time.message.contains("on time"));
    }

    #[test]
    fn test_history_note_serializes_type_field() {
        let note = HistoryNote::note(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), "called");
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["type"], "note");
        assert!(json.get("days_late").is_none());
    }
}
