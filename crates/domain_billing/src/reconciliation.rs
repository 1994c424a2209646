//! Invoice/payment reconciliation
//!
//! The amount paid on an invoice is always the sum of the payments attached
//! to it. Status, remaining balance and the overdue flag are derived from
//! that sum every time a payment changes; the status stored on the invoice
//! is only a cache of [`derive_status`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{ClientId, InvoiceId, Money};

use crate::error::BillingError;
use crate::invoice::{Invoice, InvoiceStatus};
use crate::payment::{ensure_positive, NewPayment, Payment};
use crate::selection::PaymentDraft;

/// Derived financial state of one invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceBalance {
    pub invoice_id: InvoiceId,
    pub client_id: ClientId,
    pub numero: String,
    pub date_echeance: NaiveDate,
    pub montant: Money,
    pub montant_paye: Money,
    pub montant_restant: Money,
    pub status: InvoiceStatus,
    pub overdue: bool,
}

/// Sum of the payments attached to `invoice`; other payments are ignored
pub fn amount_paid<'a, I>(invoice: &Invoice, payments: I) -> Result<Money, BillingError>
where
    I: IntoIterator<Item = &'a Payment>,
{
    let attached: Vec<&Money> = payments
        .into_iter()
        .filter(|p| p.facture_id == Some(invoice.id))
        .map(|p| &p.montant)
        .collect();
    Ok(Money::try_sum(invoice.currency(), attached)?)
}

/// Status for `paid` on `invoice`; a cancelled invoice stays cancelled
pub fn derive_status(invoice: &Invoice, paid: &Money) -> InvoiceStatus {
    if invoice.is_cancelled() {
        InvoiceStatus::Annulee
    } else {
        InvoiceStatus::from_amounts(paid, &invoice.montant)
    }
}

/// Past due and not fully paid
pub fn is_overdue(invoice: &Invoice, paid: &Money, today: NaiveDate) -> bool {
    !invoice.is_cancelled()
        && invoice.date_echeance < today
        && paid.amount() < invoice.montant.amount()
}

/// Derived balance of `invoice` given all known payments
pub fn reconcile(
    invoice: &Invoice,
    payments: &[Payment],
    today: NaiveDate,
) -> Result<InvoiceBalance, BillingError> {
    let paid = amount_paid(invoice, payments)?;
    let remaining = invoice.montant.checked_sub(&paid)?.clamp_zero();
    Ok(InvoiceBalance {
        invoice_id: invoice.id,
        client_id: invoice.client_id,
        numero: invoice.numero.clone(),
        date_echeance: invoice.date_echeance,
        montant: invoice.montant,
        montant_paye: paid,
        montant_restant: remaining,
        status: derive_status(invoice, &paid),
        overdue: is_overdue(invoice, &paid, today),
    })
}

/// Rewrites the stored status from the payments and returns the balance
pub fn recompute(
    invoice: &mut Invoice,
    payments: &[Payment],
    today: NaiveDate,
) -> Result<InvoiceBalance, BillingError> {
    let balance = reconcile(invoice, payments, today)?;
    if invoice.status != balance.status {
        tracing::debug!(
            invoice = %invoice.numero,
            from = %invoice.status,
            to = %balance.status,
            "invoice status recomputed"
        );
        invoice.status = balance.status;
        invoice.updated_at = chrono::Utc::now();
    }
    Ok(balance)
}

/// Checks that `payment` may be attached to `invoice`
pub fn ensure_payable(invoice: &Invoice, payment: &Money) -> Result<(), BillingError> {
    if invoice.is_cancelled() {
        return Err(BillingError::InvoiceCancelled(invoice.numero.clone()));
    }
    if payment.currency() != invoice.currency() {
        return Err(BillingError::currency_mismatch(invoice.currency(), payment.currency()));
    }
    ensure_positive(payment)
}

/// Builds the payment described by `request` against `invoice`
///
/// With line items selected the amount is their sum; an explicit amount
/// that disagrees with it is rejected. The caller persists the payment,
/// marks the items paid and recomputes the invoice.
pub fn plan_payment(invoice: &Invoice, request: NewPayment) -> Result<Payment, BillingError> {
    if invoice.is_cancelled() {
        return Err(BillingError::InvoiceCancelled(invoice.numero.clone()));
    }

    let (montant, prestation_ids) = if request.prestation_ids.is_empty() {
        let montant = request
            .montant
            .ok_or_else(|| BillingError::invalid_amount("amount is required"))?;
        (montant, Vec::new())
    } else {
        let mut draft = PaymentDraft::for_invoice(invoice);
        for id in &request.prestation_ids {
            draft.select(*id)?;
        }
        if let Some(explicit) = request.montant {
            draft.set_amount(explicit)?;
        }
        let montant = draft
            .amount()
            .ok_or_else(|| BillingError::invalid_amount("no line item selected"))?;
        (montant, draft.selected().to_vec())
    };

    ensure_payable(invoice, &montant)?;

    let mut payment = Payment::new(
        invoice.client_id,
        invoice.id,
        montant,
        request.methode,
        request.date_paiement,
    )?;
    payment.prestation_ids = prestation_ids;
    payment.reference = request.reference;
    payment.notes = request.notes;
    Ok(payment)
}
