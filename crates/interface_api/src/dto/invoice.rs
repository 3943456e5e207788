//! Invoice DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ClientId, Currency, InvoiceId, Money};
use domain_billing::{BillingError, Client, ClientDetails, Invoice, InvoiceStatus, NewInvoice, Reminder};

use super::reminder::ReminderResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, max = 64))]
    pub invoice_number: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    #[validate(nested)]
    pub client: Option<ClientRequest>,
    /// Create the invoice as sent, scheduling its reminders right away
    #[serde(default)]
    pub send: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClientRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
}

impl From<CreateInvoiceRequest> for NewInvoice {
    fn from(request: CreateInvoiceRequest) -> Self {
        NewInvoice {
            invoice_number: request.invoice_number,
            amount: Money::new(request.amount, request.currency),
            due_date: request.due_date,
            description: request.description,
            client: request.client.map(|c| ClientDetails {
                name: c.name,
                email: c.email,
                phone: c.phone,
            }),
            status: if request.send {
                InvoiceStatus::Sent
            } else {
                InvoiceStatus::Draft
            },
        }
    }
}

/// Query of the invoice list. `status=all` is the same as no filter.
#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
}

impl ListInvoicesQuery {
    pub const DEFAULT_LIMIT: u32 = 50;

    pub fn status_filter(&self) -> Result<Option<InvoiceStatus>, BillingError> {
        match self.status.as_deref() {
            None | Some("all") => Ok(None),
            Some(status) => status.parse::<InvoiceStatus>().map(Some),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub success: bool,
    pub data: Vec<InvoiceResponse>,
}

impl InvoiceListResponse {
    pub fn new(invoices: Vec<Invoice>) -> Self {
        Self {
            success: true,
            data: invoices.into_iter().map(InvoiceResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: InvoiceStatus,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub client_id: Option<ClientId>,
    pub amount: Decimal,
    pub currency: Currency,
    pub formatted_amount: String,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub status: InvoiceStatus,
    pub payment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            formatted_amount: invoice.amount.format(),
            amount: invoice.amount.amount(),
            currency: invoice.currency(),
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            client_id: invoice.client_id,
            due_date: invoice.due_date,
            description: invoice.description,
            status: invoice.status,
            payment_url: invoice.payment_url,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientSummary {
    pub id: ClientId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub whatsapp: bool,
}

impl From<Client> for ClientSummary {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            email: client.email,
            phone: client.phone,
            whatsapp: client.whatsapp,
        }
    }
}

/// An invoice with its client and reminders
#[derive(Debug, Serialize)]
pub struct InvoiceDetailResponse {
    #[serde(flatten)]
    pub invoice: InvoiceResponse,
    pub client: Option<ClientSummary>,
    pub reminders: Vec<ReminderResponse>,
}

impl InvoiceDetailResponse {
    pub fn new(invoice: Invoice, client: Option<Client>, reminders: Vec<Reminder>) -> Self {
        Self {
            invoice: invoice.into(),
            client: client.map(ClientSummary::from),
            reminders: reminders.into_iter().map(ReminderResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(json: serde_json::Value) -> CreateInvoiceRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_send_flag_picks_initial_status() {
        let base = serde_json::json!({
            "invoice_number": "INV-1",
            "amount": "500.00",
            "currency": "USD",
            "due_date": "2024-01-10",
        });
        let draft: NewInvoice = request(base.clone()).into();
        assert_eq!(draft.status, InvoiceStatus::Draft);

        let mut sent = base;
        sent["send"] = serde_json::Value::Bool(true);
        let sent: NewInvoice = request(sent).into();
        assert_eq!(sent.status, InvoiceStatus::Sent);
        assert_eq!(sent.amount, Money::new(dec!(500), Currency::USD));
    }

    #[test]
    fn test_client_email_is_validated() {
        let invalid = request(serde_json::json!({
            "invoice_number": "INV-1",
            "amount": "10",
            "currency": "NGN",
            "due_date": "2024-01-10",
            "client": { "name": "Ada", "email": "not-an-email" },
        }));
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_list_query_defaults() {
        let query = ListInvoicesQuery::default();
        assert_eq!(query.status_filter().unwrap(), None);
        assert_eq!(query.limit(), 50);

        let all = ListInvoicesQuery {
            status: Some("all".to_string()),
            limit: Some(5),
        };
        assert_eq!(all.status_filter().unwrap(), None);
        assert_eq!(all.limit(), 5);

        let paid = ListInvoicesQuery {
            status: Some("paid".to_string()),
            limit: None,
        };
        assert_eq!(paid.status_filter().unwrap(), Some(InvoiceStatus::Paid));

        let unknown = ListInvoicesQuery {
            status: Some("lost".to_string()),
            limit: None,
        };
        assert!(unknown.status_filter().is_err());
    }

    #[test]
    fn test_empty_invoice_number_is_rejected() {
        let invalid = request(serde_json::json!({
            "invoice_number": "",
            "amount": "10",
            "currency": "GBP",
            "due_date": "2024-01-10",
        }));
        assert!(invalid.validate().is_err());
    }
}
