//! Client handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use core_kernel::ClientId;
use domain_billing::ClientStats;

use crate::auth::Claims;
use crate::{error::ApiError, AppState};

/// Payment statistics for one of the caller's clients
pub async fn client_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<ClientId>,
) -> Result<Json<ClientStats>, ApiError> {
    let user_id = claims.user_id()?;
    let stats = state.lifecycle.client_stats(user_id, id).await?;
    Ok(Json(stats))
}
