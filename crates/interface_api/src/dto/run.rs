//! Reminder run DTOs

use serde::Serialize;

use domain_collections::RunSummary;

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub success: bool,
    pub message: String,
    pub results: RunSummary,
}

impl RunResponse {
    pub fn completed(results: RunSummary) -> Self {
        Self {
            success: true,
            message: format!("Processed {} reminders", results.processed),
            results,
        }
    }
}
