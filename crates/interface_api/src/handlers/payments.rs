//! Payment and credit handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ClientId, InvoiceId, Money, PaymentId};
use domain_billing::{CreditOutcome, Payment, PaymentOutcome};

use crate::auth::{permissions, Claims};
use crate::dto::billing::*;
use crate::error::ApiError;
use crate::handlers::{client_in_cabinet, invoice_in_cabinet, payment_in_cabinet};
use crate::AppState;

/// Records a payment against an invoice
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentOutcome>), ApiError> {
    claims.require(permissions::BILLING_WRITE)?;
    request.validate()?;
    let invoice = invoice_in_cabinet(&state, &claims, InvoiceId::from(invoice_id)).await?;

    let today = state.today();
    let outcome = state
        .billing
        .record_payment(
            invoice.id,
            request.into_new_payment(invoice.currency(), today),
            today,
            Some(claims.metadata()),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Edits a payment; the invoice status is recomputed with it
pub async fn update_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<PaymentOutcome>, ApiError> {
    claims.require(permissions::BILLING_WRITE)?;
    request.validate()?;
    let payment = payment_in_cabinet(&state, &claims, PaymentId::from(id)).await?;

    let outcome = state
        .billing
        .update_payment(
            payment.id,
            request.into_update(payment.montant.currency()),
            state.today(),
            Some(claims.metadata()),
        )
        .await?;
    Ok(Json(outcome))
}

/// Deletes a payment or an unapplied credit
pub async fn delete_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletePaymentResponse>, ApiError> {
    claims.require(permissions::BILLING_WRITE)?;
    let payment = payment_in_cabinet(&state, &claims, PaymentId::from(id)).await?;

    let balance = state
        .billing
        .delete_payment(payment.id, state.today(), Some(claims.metadata()))
        .await?;
    Ok(Json(DeletePaymentResponse { deleted: id, balance }))
}

/// Records an unattached credit for a client
pub async fn create_credit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(client_id): Path<Uuid>,
    Json(request): Json<CreateCreditRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    claims.require(permissions::BILLING_WRITE)?;
    request.validate()?;
    let client = client_in_cabinet(&state, &claims, ClientId::from(client_id)).await?;

    let credit = request.into_credit(client.id, state.today())?;
    let credit = state.billing.record_credit(credit, Some(claims.metadata())).await?;
    Ok((StatusCode::CREATED, Json(credit)))
}

/// Applies a credit, whole or in part, to an invoice of the same client
pub async fn apply_credit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(credit_id): Path<Uuid>,
    Json(request): Json<ApplyCreditRequest>,
) -> Result<Json<CreditOutcome>, ApiError> {
    claims.require(permissions::BILLING_WRITE)?;
    request.validate()?;
    let credit = payment_in_cabinet(&state, &claims, PaymentId::from(credit_id)).await?;
    let invoice = invoice_in_cabinet(&state, &claims, InvoiceId::from(request.facture_id)).await?;

    let requested = request.montant.map(|m| Money::new(m, invoice.currency()));
    let outcome = state
        .billing
        .apply_credit(credit.id, invoice.id, requested, state.today(), Some(claims.metadata()))
        .await?;
    Ok(Json(outcome))
}
