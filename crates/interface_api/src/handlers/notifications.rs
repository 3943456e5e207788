//! Notification handlers

use axum::{extract::State, Extension, Json};

use crate::auth::Claims;
use crate::dto::notification::{MarkReadRequest, NotificationResponse, SuccessResponse};
use crate::{error::ApiError, AppState};

/// How many notifications the feed returns
const FEED_LIMIT: u32 = 20;

/// Latest notifications of the caller, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let user_id = claims.user_id()?;
    let notifications = state.notifications.recent_notifications(user_id, FEED_LIMIT).await?;
    Ok(Json(notifications.into_iter().map(NotificationResponse::from).collect()))
}

/// Marks one notification, or all of them, read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<MarkReadRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user_id = claims.user_id()?;

    if request.mark_all_as_read {
        state.notifications.mark_all_notifications_read(user_id).await?;
    } else if let Some(id) = request.id {
        if !state.notifications.mark_notification_read(user_id, id).await? {
            return Err(ApiError::NotFound(format!("Notification {} not found", id)));
        }
    } else {
        return Err(ApiError::BadRequest("Missing parameters".to_string()));
    }

    Ok(Json(SuccessResponse::ok()))
}
