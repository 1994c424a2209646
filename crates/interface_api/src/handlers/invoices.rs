//! Invoice handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ClientId, InvoiceId};
use domain_billing::{reconcile, BillingError, Invoice, Payment};

use crate::auth::{permissions, Claims};
use crate::dto::billing::*;
use crate::error::ApiError;
use crate::handlers::{client_in_cabinet, invoice_in_cabinet};
use crate::AppState;

/// Pairs each invoice with its balance against `payments`
pub(crate) fn with_balances(
    invoices: Vec<Invoice>,
    payments: &[Payment],
    today: NaiveDate,
) -> Result<Vec<InvoiceResponse>, BillingError> {
    invoices
        .into_iter()
        .map(|invoice| {
            let balance = reconcile(&invoice, payments, today)?;
            Ok(InvoiceResponse { invoice, balance })
        })
        .collect()
}

/// Lists the invoices of a client with their balances
pub async fn list_client_invoices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    claims.require(permissions::BILLING_READ)?;
    let client = client_in_cabinet(&state, &claims, ClientId::from(client_id)).await?;

    let invoices = state.billing.list_invoices(client.id, Some(claims.metadata())).await?;
    let payments = state.billing.list_payments(client.id, Some(claims.metadata())).await?;
    Ok(Json(with_balances(invoices, &payments, state.today())?))
}

/// Creates an invoice for a client of the caller's cabinet
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    claims.require(permissions::BILLING_WRITE)?;
    request.validate()?;
    client_in_cabinet(&state, &claims, ClientId::from(request.client_id)).await?;

    let today = state.today();
    let invoice = request.into_invoice(today)?;
    let invoice = state.billing.create_invoice(invoice, Some(claims.metadata())).await?;
    let balance = reconcile(&invoice, &[], today)?;

    Ok((StatusCode::CREATED, Json(InvoiceResponse { invoice, balance })))
}

/// Gets an invoice with its balance
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    claims.require(permissions::BILLING_READ)?;
    let invoice = invoice_in_cabinet(&state, &claims, InvoiceId::from(id)).await?;
    let balance = state
        .billing
        .invoice_balance(invoice.id, state.today(), Some(claims.metadata()))
        .await?;
    Ok(Json(InvoiceResponse { invoice, balance }))
}

/// Cancels an invoice that has no payment
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    claims.require(permissions::BILLING_WRITE)?;
    let invoice = invoice_in_cabinet(&state, &claims, InvoiceId::from(id)).await?;
    let invoice = state.billing.cancel_invoice(invoice.id, Some(claims.metadata())).await?;
    let balance = reconcile(&invoice, &[], state.today())?;
    Ok(Json(InvoiceResponse { invoice, balance }))
}
