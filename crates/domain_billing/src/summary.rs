//! Per-client financial summary
//!
//! For every active client with billed work:
//!
//! ```text
//! factures  = sum of non-cancelled invoice amounts
//! paiements = sum of all the client's payments, credits included
//! solde     = paiements - factures
//! ```
//!
//! A non-negative balance is `à_jour`. A negative balance is `en_retard`
//! when an invoice is overdue, `partiel` when something was paid, and
//! otherwise falls back to `en_retard` with [`DelinquencyReason::NoPayment`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use core_kernel::{ClientId, Currency, Money};
use domain_client::Client;

use crate::error::BillingError;
use crate::invoice::Invoice;
use crate::payment::Payment;
use crate::reconciliation::{amount_paid, is_overdue};

/// Payment standing of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryStatus {
    #[serde(rename = "à_jour")]
    AJour,
    #[serde(rename = "partiel")]
    Partiel,
    #[serde(rename = "en_retard")]
    EnRetard,
}

/// Why a client is `en_retard`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelinquencyReason {
    /// At least one invoice is past due and underpaid
    Overdue,
    /// Nothing overdue, but nothing paid either
    NoPayment,
}

/// Summary line for one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub client_id: ClientId,
    pub nom: String,
    pub factures: Money,
    pub paiements: Money,
    pub solde: Money,
    pub status: SummaryStatus,
    pub reason: Option<DelinquencyReason>,
    pub overdue_invoices: usize,
}

/// Classification of a balance
pub fn classify(
    solde: &Money,
    overdue_invoices: usize,
    has_payment: bool,
) -> (SummaryStatus, Option<DelinquencyReason>) {
    if !solde.is_negative() {
        (SummaryStatus::AJour, None)
    } else if overdue_invoices > 0 {
        (SummaryStatus::EnRetard, Some(DelinquencyReason::Overdue))
    } else if has_payment {
        (SummaryStatus::Partiel, None)
    } else {
        (SummaryStatus::EnRetard, Some(DelinquencyReason::NoPayment))
    }
}

/// Summary of one client, or `None` when nothing was invoiced
///
/// Only amounts in `currency` are counted.
pub fn summarize_client(
    client: &Client,
    invoices: &[Invoice],
    payments: &[Payment],
    currency: Currency,
    today: NaiveDate,
) -> Result<Option<ClientSummary>, BillingError> {
    let invoices: Vec<&Invoice> = invoices
        .iter()
        .filter(|i| i.client_id == client.id && !i.is_cancelled())
        .filter(|i| same_currency(i.currency(), currency, client))
        .collect();
    let payments: Vec<&Payment> = payments
        .iter()
        .filter(|p| p.client_id == client.id)
        .filter(|p| same_currency(p.montant.currency(), currency, client))
        .collect();

    let factures = Money::try_sum(currency, invoices.iter().map(|i| &i.montant))?;
    if factures.is_zero() {
        return Ok(None);
    }
    let paiements = Money::try_sum(currency, payments.iter().map(|p| &p.montant))?;
    let solde = paiements.checked_sub(&factures)?;

    let mut overdue_invoices = 0;
    for invoice in &invoices {
        let paid = amount_paid(invoice, payments.iter().copied())?;
        if is_overdue(invoice, &paid, today) {
            overdue_invoices += 1;
        }
    }

    let (status, reason) = classify(&solde, overdue_invoices, !payments.is_empty());
    Ok(Some(ClientSummary {
        client_id: client.id,
        nom: client.nom.clone(),
        factures,
        paiements,
        solde,
        status,
        reason,
        overdue_invoices,
    }))
}

fn same_currency(actual: Currency, expected: Currency, client: &Client) -> bool {
    if actual != expected {
        tracing::warn!(
            client_id = %client.id,
            currency = %actual,
            "amount excluded from summary, not in reporting currency"
        );
        return false;
    }
    true
}

/// Summary of every active client that has been invoiced, ordered by `nom`
pub fn build_summary(
    clients: &[Client],
    invoices: &[Invoice],
    payments: &[Payment],
    currency: Currency,
    today: NaiveDate,
) -> Result<Vec<ClientSummary>, BillingError> {
    let mut invoices_by_client: HashMap<ClientId, Vec<Invoice>> = HashMap::new();
    for invoice in invoices {
        invoices_by_client.entry(invoice.client_id).or_default().push(invoice.clone());
    }
    let mut payments_by_client: HashMap<ClientId, Vec<Payment>> = HashMap::new();
    for payment in payments {
        payments_by_client.entry(payment.client_id).or_default().push(payment.clone());
    }

    let mut rows = Vec::new();
    for client in clients.iter().filter(|c| c.is_active()) {
        let client_invoices = invoices_by_client.get(&client.id).map(Vec::as_slice).unwrap_or(&[]);
        let client_payments = payments_by_client.get(&client.id).map(Vec::as_slice).unwrap_or(&[]);
        if let Some(row) = summarize_client(client, client_invoices, client_payments, currency, today)? {
            rows.push(row);
        }
    }
    rows.sort_by(|a, b| a.nom.cmp(&b.nom));
    Ok(rows)
}
