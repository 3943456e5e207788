//! Invoice handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use core_kernel::{InvoiceId, UserId};
use domain_billing::{Client, Invoice, InvoiceStatus};

use crate::auth::Claims;
use crate::dto::invoice::*;
use crate::dto::notification::SuccessResponse;
use crate::dto::reminder::{PreviewResponse, ReminderRequest, ReminderResponse};
use crate::{error::ApiError, AppState};

/// Creates an invoice, finding or creating its client by email
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    let user_id = claims.user_id()?;
    request.validate()?;

    let invoice = state.lifecycle.create_invoice(user_id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

/// Lists the caller's invoices, newest first
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<InvoiceListResponse>, ApiError> {
    let user_id = claims.user_id()?;
    let invoices = state
        .lifecycle
        .list_invoices(user_id, query.status_filter()?, query.limit())
        .await?;
    Ok(Json(InvoiceListResponse::new(invoices)))
}

/// Gets an invoice with its client and reminders
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<InvoiceId>,
) -> Result<Json<InvoiceDetailResponse>, ApiError> {
    let user_id = claims.user_id()?;
    let invoice = state.lifecycle.get_owned(user_id, id).await?;
    let client = client_of(&state, user_id, &invoice).await?;
    let reminders = state.lifecycle.reminders_for(id).await?;

    Ok(Json(InvoiceDetailResponse::new(invoice, client, reminders)))
}

/// Deletes an invoice together with its reminders
pub async fn delete_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<InvoiceId>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user_id = claims.user_id()?;
    state.lifecycle.delete_invoice(user_id, id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Moves an invoice through its lifecycle
///
/// `overdue` is set only by the overdue sweep and is rejected here.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<InvoiceId>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    if request.status == InvoiceStatus::Overdue {
        return Err(ApiError::BadRequest(
            "Invoices become overdue automatically once past due".to_string(),
        ));
    }

    let user_id = claims.user_id()?;
    state.lifecycle.get_owned(user_id, id).await?;
    let invoice = state.lifecycle.transition(id, request.status).await?;
    Ok(Json(invoice.into()))
}

/// Queues a reminder on a chosen channel for the next run
pub async fn enqueue_reminder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<InvoiceId>,
    Json(request): Json<ReminderRequest>,
) -> Result<(StatusCode, Json<ReminderResponse>), ApiError> {
    let user_id = claims.user_id()?;
    let reminder = state
        .lifecycle
        .enqueue_reminder(user_id, id, request.channel, request.level())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(reminder.into())))
}

/// Composes a reminder without sending it
pub async fn preview_reminder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<InvoiceId>,
    Json(request): Json<ReminderRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let user_id = claims.user_id()?;
    let invoice = state.lifecycle.get_owned(user_id, id).await?;
    let client = client_of(&state, user_id, &invoice).await?;

    let user_settings = state.settings.user_settings(user_id).await?;
    let settings = state.config.providers.merged_with(&user_settings);

    let level = request.level();
    let message = state
        .composer
        .compose(&invoice, client.as_ref(), level, request.channel, &settings)
        .await;

    Ok(Json(PreviewResponse::new(request.channel, level, message)))
}

async fn client_of(state: &AppState, user_id: UserId, invoice: &Invoice) -> Result<Option<Client>, ApiError> {
    match invoice.client_id {
        Some(client_id) => Ok(Some(state.lifecycle.get_client_owned(user_id, client_id).await?)),
        None => Ok(None),
    }
}
