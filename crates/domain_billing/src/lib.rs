//! Billing Domain - invoices, clients and reminder scheduling
//!
//! This crate owns the receivables records and the rules around them:
//!
//! - **Invoices** with the `draft → sent → overdue → paid` lifecycle
//! - **Clients** with an append-only payment history
//! - **Reminders** planned at +0, +7 and +14 days from the due date
//! - **Notifications** emitted to the owning user
//!
//! Persistence is reached through the store traits in [`ports`]; the
//! `mock` feature exposes an in-memory implementation for tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{LifecycleManager, InvoiceStatus};
//!
//! let invoice = manager.create_invoice(user_id, request).await?;
//! manager.transition(invoice.id, InvoiceStatus::Sent).await?;
//! ```

pub mod client;
pub mod error;
pub mod invoice;
pub mod lifecycle;
pub mod notification;
pub mod ports;
pub mod reminder;
pub mod scheduler;
pub mod settings;
pub mod stats;

pub use client::{Client, ClientDetails, HistoryKind, HistoryNote};
pub use error::BillingError;
pub use invoice::{Invoice, InvoiceStatus};
pub use lifecycle::{plan_transition, LifecycleManager, NewInvoice, TransitionEffect};
pub use notification::{Notification, Severity};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock;
pub use ports::{
    ClientStore, DueReminder, InvoiceStore, NotificationSink, NotificationStore, ReminderStore, SettingsStore,
};
pub use reminder::{Channel, EscalationLevel, Reminder, ReminderStatus};
pub use scheduler::ReminderScheduler;
pub use settings::UserSettings;
pub use stats::{ClientStats, PaymentHistory};
