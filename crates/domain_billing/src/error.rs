//! Billing domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{MoneyError, PortError};

use crate::invoice::InvoiceStatus;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// The requested status change is not part of the lifecycle
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    /// Invoice amounts must be zero or positive
    #[error("Invoice amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Client not found
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// The invoice changed underneath the operation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Money arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// The backing store failed
    #[error("Store error: {0}")]
    Store(#[from] PortError),
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation(message.into())
    }

    /// Maps a store not-found into the domain's invoice variant
    pub fn from_invoice_lookup(error: PortError, id: impl std::fmt::Display) -> Self {
        if error.is_not_found() {
            BillingError::InvoiceNotFound(id.to_string())
        } else {
            BillingError::Store(error)
        }
    }

    /// Maps a store not-found into the domain's client variant
    pub fn from_client_lookup(error: PortError, id: impl std::fmt::Display) -> Self {
        if error.is_not_found() {
            BillingError::ClientNotFound(id.to_string())
        } else {
            BillingError::Store(error)
        }
    }
}
