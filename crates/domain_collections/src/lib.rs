//! Collections
//!
//! The escalation run: sweep overdue invoices, then deliver every reminder
//! that has come due and record the result on it.

pub mod error;
pub mod processor;

pub use error::CollectionsError;
pub use processor::{Collaborators, EscalationProcessor, ProcessorConfig, RunSummary};
