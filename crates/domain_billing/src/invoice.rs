//! Invoices (factures) and their line items (prestations)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClientId, Currency, InvoiceId, Money, PrestationId};

use crate::error::BillingError;

/// Invoice status
///
/// Apart from `Annulee`, the status is never set by hand: it is derived from
/// the payments recorded against the invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// Nothing paid yet
    #[serde(rename = "en_attente")]
    EnAttente,
    #[serde(rename = "partiellement_payée")]
    PartiellementPayee,
    #[serde(rename = "payée")]
    Payee,
    #[serde(rename = "annulée")]
    Annulee,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::EnAttente => "en_attente",
            InvoiceStatus::PartiellementPayee => "partiellement_payée",
            InvoiceStatus::Payee => "payée",
            InvoiceStatus::Annulee => "annulée",
        }
    }

    /// Parses a stored status; unaccented spellings are accepted
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "en_attente" => Some(InvoiceStatus::EnAttente),
            "partiellement_payée" | "partiellement_payee" => Some(InvoiceStatus::PartiellementPayee),
            "payée" | "payee" => Some(InvoiceStatus::Payee),
            "annulée" | "annulee" => Some(InvoiceStatus::Annulee),
            _ => None,
        }
    }

    /// Status implied by `paid` against `total`
    pub fn from_amounts(paid: &Money, total: &Money) -> Self {
        if paid.amount() <= rust_decimal::Decimal::ZERO {
            InvoiceStatus::EnAttente
        } else if paid.amount() < total.amount() {
            InvoiceStatus::PartiellementPayee
        } else {
            InvoiceStatus::Payee
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line item on an invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prestation {
    pub id: PrestationId,
    pub facture_id: InvoiceId,
    pub description: String,
    pub montant: Money,
    /// Settled by a line-item scoped payment
    #[serde(default)]
    pub payee: bool,
}

/// An invoice issued to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub client_id: ClientId,
    /// Human-readable number
    pub numero: String,
    pub date_emission: NaiveDate,
    pub date_echeance: NaiveDate,
    /// Total amount due
    pub montant: Money,
    pub prestations: Vec<Prestation>,
    /// Persisted copy of the derived status
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates an invoice without line items
    pub fn new(
        client_id: ClientId,
        date_emission: NaiveDate,
        date_echeance: NaiveDate,
        montant: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new_v7(),
            client_id,
            numero: generate_invoice_number(date_emission),
            date_emission,
            date_echeance,
            montant,
            prestations: Vec::new(),
            status: InvoiceStatus::EnAttente,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an invoice whose total is the sum of its line items
    pub fn with_prestations<I, S>(
        client_id: ClientId,
        date_emission: NaiveDate,
        date_echeance: NaiveDate,
        currency: Currency,
        items: I,
    ) -> Result<Self, BillingError>
    where
        I: IntoIterator<Item = (S, Money)>,
        S: Into<String>,
    {
        let mut invoice = Self::new(client_id, date_emission, date_echeance, Money::zero(currency));
        for (description, montant) in items {
            invoice.add_prestation(description, montant)?;
        }
        Ok(invoice)
    }

    pub fn with_numero(mut self, numero: impl Into<String>) -> Self {
        self.numero = numero.into();
        self
    }

    pub fn currency(&self) -> Currency {
        self.montant.currency()
    }

    /// Adds a line item and grows the total by its amount
    pub fn add_prestation(
        &mut self,
        description: impl Into<String>,
        montant: Money,
    ) -> Result<PrestationId, BillingError> {
        if !montant.is_positive() {
            return Err(BillingError::invalid_amount(format!(
                "line item amount must be positive, got {}",
                montant
            )));
        }
        self.montant = self.montant.checked_add(&montant)?;
        let prestation = Prestation {
            id: PrestationId::new_v7(),
            facture_id: self.id,
            description: description.into(),
            montant,
            payee: false,
        };
        let id = prestation.id;
        self.prestations.push(prestation);
        Ok(id)
    }

    pub fn prestation(&self, id: PrestationId) -> Option<&Prestation> {
        self.prestations.iter().find(|p| p.id == id)
    }

    /// Sets the `payee` flag of the given line items
    pub fn mark_prestations(&mut self, ids: &[PrestationId], paid: bool) {
        for prestation in self.prestations.iter_mut().filter(|p| ids.contains(&p.id)) {
            prestation.payee = paid;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == InvoiceStatus::Annulee
    }

    /// Cancels the invoice; refused once any payment exists
    pub fn cancel(&mut self, payment_count: usize) -> Result<(), BillingError> {
        if payment_count > 0 {
            return Err(BillingError::InvoiceHasPayments(self.numero.clone()));
        }
        self.status = InvoiceStatus::Annulee;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Generates an invoice number of the form `FAC-YYYYMM-NNNNNN`
pub fn generate_invoice_number(date: NaiveDate) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("FAC-{}-{:06}", date.format("%Y%m"), duration.as_micros() % 1_000_000)
}
