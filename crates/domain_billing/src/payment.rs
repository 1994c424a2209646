//! Payments (paiements) and client credits
//!
//! A payment either settles (part of) an invoice or, when it has no invoice,
//! is a credit held by the client until it is applied to one of the
//! client's invoices.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClientId, InvoiceId, Money, PaymentId, PrestationId};

use crate::error::BillingError;

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Especes,
    Virement,
    Cheque,
    /// Orange Money, MTN MoMo and the like
    MobileMoney,
    Carte,
    Autre,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Especes => "especes",
            PaymentMethod::Virement => "virement",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Carte => "carte",
            PaymentMethod::Autre => "autre",
        }
    }

    /// Parses a stored method; unknown values become `Autre`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "especes" | "espèces" => PaymentMethod::Especes,
            "virement" => PaymentMethod::Virement,
            "cheque" | "chèque" => PaymentMethod::Cheque,
            "mobile_money" => PaymentMethod::MobileMoney,
            "carte" => PaymentMethod::Carte,
            _ => PaymentMethod::Autre,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub client_id: ClientId,
    /// `None` for a credit not yet applied
    pub facture_id: Option<InvoiceId>,
    pub montant: Money,
    pub methode: PaymentMethod,
    pub date_paiement: NaiveDate,
    /// Bank or mobile-money reference
    pub reference: Option<String>,
    /// Line items settled by this payment
    #[serde(default)]
    pub prestation_ids: Vec<PrestationId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a payment against an invoice
    pub fn new(
        client_id: ClientId,
        facture_id: InvoiceId,
        montant: Money,
        methode: PaymentMethod,
        date_paiement: NaiveDate,
    ) -> Result<Self, BillingError> {
        Self::build(client_id, Some(facture_id), montant, methode, date_paiement)
    }

    /// Creates an unattached credit for a client
    pub fn credit(
        client_id: ClientId,
        montant: Money,
        methode: PaymentMethod,
        date_paiement: NaiveDate,
    ) -> Result<Self, BillingError> {
        Self::build(client_id, None, montant, methode, date_paiement)
    }

    fn build(
        client_id: ClientId,
        facture_id: Option<InvoiceId>,
        montant: Money,
        methode: PaymentMethod,
        date_paiement: NaiveDate,
    ) -> Result<Self, BillingError> {
        ensure_positive(&montant)?;
        let now = Utc::now();
        Ok(Self {
            id: PaymentId::new_v7(),
            client_id,
            facture_id,
            montant,
            methode,
            date_paiement,
            reference: None,
            prestation_ids: Vec::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_credit(&self) -> bool {
        self.facture_id.is_none()
    }

    /// Whether the amount was derived from a line-item selection
    pub fn is_item_scoped(&self) -> bool {
        !self.prestation_ids.is_empty()
    }
}

pub(crate) fn ensure_positive(montant: &Money) -> Result<(), BillingError> {
    if !montant.is_positive() {
        return Err(BillingError::invalid_amount(format!(
            "payment amount must be positive, got {}",
            montant
        )));
    }
    Ok(())
}

/// Request for recording a payment against an invoice
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Required unless line items are selected
    pub montant: Option<Money>,
    /// Line items to settle; the amount is then their sum
    pub prestation_ids: Vec<PrestationId>,
    pub methode: PaymentMethod,
    pub date_paiement: NaiveDate,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Changes to an existing payment; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub montant: Option<Money>,
    pub methode: Option<PaymentMethod>,
    pub date_paiement: Option<NaiveDate>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl PaymentUpdate {
    /// Applies the update; the amount of a line-item scoped payment is locked
    pub fn apply(self, payment: &mut Payment) -> Result<(), BillingError> {
        if let Some(montant) = self.montant {
            if payment.is_item_scoped() && montant != payment.montant {
                return Err(BillingError::AmountIsDerived);
            }
            ensure_positive(&montant)?;
            if montant.currency() != payment.montant.currency() {
                return Err(BillingError::currency_mismatch(
                    payment.montant.currency(),
                    montant.currency(),
                ));
            }
            payment.montant = montant;
        }
        if let Some(v) = self.methode {
            payment.methode = v;
        }
        if let Some(v) = self.date_paiement {
            payment.date_paiement = v;
        }
        if self.reference.is_some() {
            payment.reference = self.reference;
        }
        if self.notes.is_some() {
            payment.notes = self.notes;
        }
        payment.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    #[test]
    fn test_payment_must_be_positive() {
        let result = Payment::new(ClientId::new(), InvoiceId::new(), Money::xaf(dec!(0)), PaymentMethod::Especes, today());
        assert!(matches!(result, Err(BillingError::InvalidAmount(_))));
    }

    #[test]
    fn test_credit_has_no_invoice() {
        let credit = Payment::credit(ClientId::new(), Money::xaf(dec!(5000)), PaymentMethod::Virement, today()).unwrap();
        assert!(credit.is_credit());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(PaymentMethod::parse("Chèque"), PaymentMethod::Cheque);
        assert_eq!(PaymentMethod::parse("bitcoin"), PaymentMethod::Autre);
    }

    #[test]
    fn test_update_locked_amount() {
        let mut payment = Payment::new(ClientId::new(), InvoiceId::new(), Money::xaf(dec!(5000)), PaymentMethod::Especes, today()).unwrap();
        payment.prestation_ids.push(PrestationId::new());

        let update = PaymentUpdate { montant: Some(Money::xaf(dec!(6000))), ..Default::default() };
        assert!(matches!(update.apply(&mut payment), Err(BillingError::AmountIsDerived)));

        let update = PaymentUpdate { methode: Some(PaymentMethod::Cheque), ..Default::default() };
        update.apply(&mut payment).unwrap();
        assert_eq!(payment.methode, PaymentMethod::Cheque);
    }
}
