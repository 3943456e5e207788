//! Test Data Builders
//!
//! Builders that let a test specify only the fields it cares about. Each
//! builder can also insert what it builds into the in-memory store.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{ClientId, Money, UserId};
use domain_billing::mock::InMemoryBillingStore;
use domain_billing::{Client, ClientDetails, ClientStore, HistoryNote, Invoice, InvoiceStatus, InvoiceStore};

use crate::fixtures::{ClientFixtures, DateFixtures, MoneyFixtures};

/// Builder for invoices
pub struct InvoiceBuilder {
    user_id: UserId,
    invoice_number: String,
    amount: Money,
    due_date: NaiveDate,
    status: InvoiceStatus,
    client_id: Option<ClientId>,
    description: Option<String>,
    payment_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceBuilder {
    /// A sent $500.00 invoice due Jan 10, 2024
    pub fn new() -> Self {
        Self {
            user_id: UserId::new(),
            invoice_number: "INV-2024-001".to_string(),
            amount: MoneyFixtures::usd_500(),
            due_date: DateFixtures::due_date(),
            status: InvoiceStatus::Sent,
            client_id: None,
            description: None,
            payment_url: None,
            created_at: DateFixtures::january(1),
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = number.into();
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = status;
        self
    }

    /// Links the invoice to a client, taking the client's owner as well
    pub fn for_client(mut self, client: &Client) -> Self {
        self.client_id = Some(client.id);
        self.user_id = client.user_id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_payment_url(mut self, url: impl Into<String>) -> Self {
        self.payment_url = Some(url.into());
        self
    }

    /// Builds the invoice
    ///
    /// # Panics
    ///
    /// Panics if the amount is negative or the number blank
    pub fn build(self) -> Invoice {
        let mut invoice = Invoice::new(
            self.user_id,
            self.invoice_number,
            self.amount,
            self.due_date,
            self.created_at,
        )
        .expect("builder produced an invalid invoice");
        invoice.status = self.status;
        invoice.client_id = self.client_id;
        invoice.description = self.description;
        invoice.payment_url = self.payment_url;
        invoice
    }

    /// Builds the invoice and stores it
    pub async fn insert(self, store: &InMemoryBillingStore) -> Invoice {
        let invoice = self.build();
        store
            .insert_invoice(&invoice)
            .await
            .expect("failed to insert invoice");
        invoice
    }
}

/// Builder for clients
pub struct ClientBuilder {
    user_id: UserId,
    details: ClientDetails,
    history: Vec<HistoryNote>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// An email-only client
    pub fn new() -> Self {
        Self {
            user_id: UserId::new(),
            details: ClientFixtures::email_only(),
            history: Vec::new(),
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_details(mut self, details: ClientDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.details.phone = Some(phone.into());
        self
    }

    pub fn with_note(mut self, note: HistoryNote) -> Self {
        self.history.push(note);
        self
    }

    /// # Panics
    ///
    /// Panics if the details are invalid
    pub fn build(self) -> Client {
        let mut client = Client::new(self.user_id, self.details, DateFixtures::january(1))
            .expect("builder produced an invalid client");
        client.history_notes = self.history;
        client
    }

    /// Builds the client and stores it
    pub async fn insert(self, store: &InMemoryBillingStore) -> Client {
        let client = self.build();
        store
            .insert_client(&client)
            .await
            .expect("failed to insert client");
        client
    }
}
