//! Payment reminder handler

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::ClientId;
use domain_billing::{build_reminder, dispatch_reminder, InvoiceBalance};

use crate::auth::{permissions, Claims};
use crate::dto::billing::{ReminderRequest, ReminderResponse};
use crate::error::ApiError;
use crate::handlers::client_in_cabinet;
use crate::handlers::invoices::with_balances;
use crate::AppState;

/// Builds a reminder of the client's overdue invoices and sends it
///
/// A delivery failure does not fail the request: it comes back as a
/// warning notification.
pub async fn send_reminder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(client_id): Path<Uuid>,
    Json(request): Json<ReminderRequest>,
) -> Result<Json<ReminderResponse>, ApiError> {
    claims.require(permissions::REMINDER_SEND)?;
    let client = client_in_cabinet(&state, &claims, ClientId::from(client_id)).await?;
    let today = state.today();

    let invoices = state.billing.list_invoices(client.id, Some(claims.metadata())).await?;
    let payments = state.billing.list_payments(client.id, Some(claims.metadata())).await?;
    let balances: Vec<InvoiceBalance> = with_balances(invoices, &payments, today)?
        .into_iter()
        .map(|row| row.balance)
        .collect();

    let reminder = build_reminder(&client, &balances, request.channel, today, request.locale)?;

    let gateway = state
        .reminders
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("reminder delivery is not configured".to_string()))?;
    let notification = dispatch_reminder(gateway.as_ref(), &reminder).await;

    Ok(Json(ReminderResponse { reminder, notification }))
}
