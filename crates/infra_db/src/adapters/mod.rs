//! Port adapters
//!
//! Adapters translate between the billing ports and the PostgreSQL row
//! types in `crate::rows`.
//!
//! ```rust,ignore
//! use infra_db::adapters::PgBillingStore;
//! use domain_billing::InvoiceStore;
//!
//! let store = PgBillingStore::new(pool);
//! let invoice = store.get_invoice(invoice_id).await?;
//! ```

pub mod billing;

pub use billing::PgBillingStore;
