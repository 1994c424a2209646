//! Request handlers
//!
//! Billing records are not tenant-scoped by themselves; an invoice or a
//! payment is visible to a cabinet through the client it belongs to. The
//! lookups below report records of other cabinets as not found.

pub mod health;
pub mod clients;
pub mod obligations;
pub mod invoices;
pub mod payments;
pub mod reports;
pub mod reminders;

use core_kernel::{ClientId, InvoiceId, PaymentId, PortError};
use domain_billing::{Invoice, Payment};
use domain_client::Client;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::AppState;

pub(crate) async fn client_in_cabinet(
    state: &AppState,
    claims: &Claims,
    id: ClientId,
) -> Result<Client, ApiError> {
    Ok(state
        .clients
        .get_client(claims.cabinet_id(), id, Some(claims.metadata()))
        .await?)
}

async fn ensure_client_visible(
    state: &AppState,
    claims: &Claims,
    client_id: ClientId,
    hidden: PortError,
) -> Result<(), ApiError> {
    match client_in_cabinet(state, claims, client_id).await {
        Ok(_) => Ok(()),
        Err(ApiError::NotFound(_)) => Err(hidden.into()),
        Err(e) => Err(e),
    }
}

pub(crate) async fn invoice_in_cabinet(
    state: &AppState,
    claims: &Claims,
    id: InvoiceId,
) -> Result<Invoice, ApiError> {
    let invoice = state.billing.get_invoice(id, Some(claims.metadata())).await?;
    ensure_client_visible(state, claims, invoice.client_id, PortError::not_found("Invoice", id)).await?;
    Ok(invoice)
}

pub(crate) async fn payment_in_cabinet(
    state: &AppState,
    claims: &Claims,
    id: PaymentId,
) -> Result<Payment, ApiError> {
    let payment = state.billing.get_payment(id, Some(claims.metadata())).await?;
    ensure_client_visible(state, claims, payment.client_id, PortError::not_found("Payment", id)).await?;
    Ok(payment)
}
