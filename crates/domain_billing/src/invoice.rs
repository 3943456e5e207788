//! Invoice management
//!
//! Invoices move through `draft → sent → overdue → paid`. The status field is
//! only ever changed through the lifecycle rules in [`crate::lifecycle`];
//! this module holds the record and its validation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClientId, Currency, InvoiceId, Money, UserId};

use crate::error::BillingError;

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Invoice is being drafted
    Draft,
    /// Invoice has been sent to the client
    Sent,
    /// Past due date and still unpaid
    Overdue,
    /// Fully paid
    Paid,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Overdue,
        InvoiceStatus::Paid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Paid => "paid",
        }
    }

    /// Whether reminders may still go out for an invoice in this status
    pub fn is_collectible(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(BillingError::validation(format!("unknown invoice status '{}'", other))),
        }
    }
}

/// An invoice issued by a user to one of their clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Owning user
    pub user_id: UserId,
    /// Billed client, if any
    pub client_id: Option<ClientId>,
    /// Invoice number (human-readable)
    pub invoice_number: String,
    /// Amount due, never negative
    pub amount: Money,
    /// Due date (date only)
    pub due_date: NaiveDate,
    /// Free-text description
    pub description: Option<String>,
    /// Lifecycle status
    pub status: InvoiceStatus,
    /// Cached payment link
    pub payment_url: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a draft invoice
    ///
    /// # Errors
    ///
    /// Returns `NegativeAmount` for amounts below zero and `Validation` for a
    /// blank invoice number.
    pub fn new(
        user_id: UserId,
        invoice_number: impl Into<String>,
        amount: Money,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        if amount.is_negative() {
            return Err(BillingError::NegativeAmount(amount.amount()));
        }

        let invoice_number = invoice_number.into().trim().to_string();
        if invoice_number.is_empty() {
            return Err(BillingError::validation("invoice number is required"));
        }

        Ok(Self {
            id: InvoiceId::new_v7(),
            user_id,
            client_id: None,
            invoice_number,
            amount,
            due_date,
            description: None,
            status: InvoiceStatus::Draft,
            payment_url: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    pub fn currency(&self) -> Currency {
        self.amount.currency()
    }

    /// True when the due date lies strictly before `today`
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.due_date < today
    }

    /// Whole days between the due date and `on`, floored at zero
    pub fn days_late(&self, on: NaiveDate) -> i64 {
        (on - self.due_date).num_days().max(0)
    }

    /// Relative link used by notifications
    pub fn link(&self) -> String {
        format!("/invoices/{}", self.id.as_uuid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn test_new_invoice_is_draft() {
        let invoice = Invoice::new(
            UserId::new(),
            "INV-001",
            Money::new(dec!(500), Currency::USD),
            due(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert!(invoice.client_id.is_none());
        assert_eq!(invoice.currency(), Currency::USD);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = Invoice::new(
            UserId::new(),
            "INV-001",
            Money::new(dec!(-1), Currency::NGN),
            due(),
            Utc::now(),
        );
        assert!(matches!(result, Err(BillingError::NegativeAmount(_))));
    }

    #[test]
    fn test_zero_amount_allowed() {
        let result = Invoice::new(UserId::new(), "INV-0", Money::zero(Currency::GBP), due(), Utc::now());
        assert!(result.is_ok());
    }

    #[test]
    fn test_blank_number_rejected() {
        let result = Invoice::new(UserId::new(), "  ", Money::zero(Currency::GBP), due(), Utc::now());
        assert!(matches!(result, Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_days_late() {
        let invoice = Invoice::new(UserId::new(), "INV-2", Money::zero(Currency::USD), due(), Utc::now()).unwrap();
        assert_eq!(invoice.days_late(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()), 0);
        assert_eq!(invoice.days_late(NaiveDate::from_ymd_opt(2024, 1, 13).unwrap()), 3);
        assert!(invoice.is_past_due(NaiveDate::from_ymd_opt(2024, 1, 11).unwrap()));
        assert!(!invoice.is_past_due(due()));
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
        assert!("void".parse::<InvoiceStatus>().is_err());
    }
}
