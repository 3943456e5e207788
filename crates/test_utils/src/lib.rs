//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! receivables test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for invoices and clients
//! - `fakes`: Scripted channel senders, content generators and payment links
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod fakes;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use fakes::*;
pub use assertions::*;
pub use generators::*;
