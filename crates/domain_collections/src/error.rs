//! Collections errors

use thiserror::Error;

use core_kernel::PortError;
use domain_billing::BillingError;

/// Errors that abort a whole escalation run
///
/// Failures on a single reminder never surface here; they are recorded on
/// the reminder and counted as failed.
#[derive(Debug, Error)]
pub enum CollectionsError {
    #[error("Store error: {0}")]
    Store(#[from] PortError),

    #[error(transparent)]
    Billing(#[from] BillingError),
}
