//! Reminder run trigger
//!
//! Called by an external scheduler with the cron secret as a bearer token.
//! Runs never overlap within one process; a trigger that arrives while a run
//! is in progress gets 409 and does no work.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use tracing::{info, warn};

use crate::auth::cron_authorized;
use crate::dto::run::RunResponse;
use crate::{error::ApiError, AppState};

/// Runs the escalation pipeline once (GET or POST)
pub async fn check_reminders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RunResponse>, ApiError> {
    let header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
    if !cron_authorized(header, &state.config.cron_secret) {
        warn!("Rejected reminder run trigger");
        return Err(ApiError::Unauthorized);
    }

    let Ok(_guard) = state.run_lock.try_lock() else {
        info!("Reminder run already in progress");
        return Err(ApiError::Conflict("A reminder run is already in progress".to_string()));
    };

    let summary = state.processor.run().await?;
    Ok(Json(RunResponse::completed(summary)))
}
