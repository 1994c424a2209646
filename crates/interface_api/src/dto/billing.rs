//! Billing DTOs
//!
//! Amounts travel as decimal strings or numbers; the currency is taken from
//! the invoice (payments) or from the request (invoices, credits), with
//! FCFA as default.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use core_kernel::{ClientId, Currency, Money, PrestationId};
use domain_billing::{
    ClientSummary, Invoice, InvoiceBalance, Locale, NewPayment, Notification, Payment,
    PaymentMethod, PaymentUpdate, Reminder, ReminderChannel,
};

use crate::error::ApiError;

/// Largest amount accepted on a single invoice, line item or payment
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

fn positive(amount: &Decimal) -> Result<(), ValidationError> {
    if !amount.is_sign_positive() || amount.is_zero() {
        return Err(ValidationError::new("positive"));
    }
    if *amount > Decimal::from(MAX_AMOUNT) {
        return Err(ValidationError::new("too_large"));
    }
    Ok(())
}

/// Parses an ISO 4217 code, defaulting to FCFA
pub fn parse_currency(code: Option<&str>) -> Result<Currency, ApiError> {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(Currency::XAF),
        Some(code) => Currency::from_code(code)
            .ok_or_else(|| ApiError::validation(format!("unsupported currency {code}"))),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PrestationRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(custom(function = "positive"))]
    pub montant: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    /// Generated from the emission date when absent
    #[validate(length(min = 1, max = 64))]
    pub numero: Option<String>,
    /// Defaults to today
    pub date_emission: Option<NaiveDate>,
    pub date_echeance: NaiveDate,
    pub currency: Option<String>,
    /// Total of an invoice without line items
    #[validate(custom(function = "positive"))]
    pub montant: Option<Decimal>,
    #[serde(default)]
    #[validate(nested)]
    pub prestations: Vec<PrestationRequest>,
    pub notes: Option<String>,
}

impl CreateInvoiceRequest {
    pub fn into_invoice(self, today: NaiveDate) -> Result<Invoice, ApiError> {
        let currency = parse_currency(self.currency.as_deref())?;
        let date_emission = self.date_emission.unwrap_or(today);
        if self.date_echeance < date_emission {
            return Err(ApiError::validation("date_echeance precedes date_emission"));
        }

        let mut invoice = match (self.prestations.is_empty(), self.montant) {
            (true, Some(montant)) => {
                Invoice::new(ClientId::from(self.client_id), date_emission, self.date_echeance, Money::new(montant, currency))
            }
            (false, None) => Invoice::with_prestations(
                ClientId::from(self.client_id),
                date_emission,
                self.date_echeance,
                currency,
                self.prestations.into_iter().map(|p| (p.description, Money::new(p.montant, currency))),
            )?,
            (true, None) => return Err(ApiError::validation("either montant or prestations is required")),
            (false, Some(_)) => {
                return Err(ApiError::validation("montant is derived from prestations; send one or the other"))
            }
        };
        if let Some(numero) = self.numero {
            invoice = invoice.with_numero(numero.trim());
        }
        invoice.notes = self.notes;
        Ok(invoice)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    /// Required unless line items are selected
    #[validate(custom(function = "positive"))]
    pub montant: Option<Decimal>,
    #[serde(default)]
    pub prestation_ids: Vec<Uuid>,
    pub methode: PaymentMethod,
    /// Defaults to today
    pub date_paiement: Option<NaiveDate>,
    #[validate(length(max = 128))]
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl RecordPaymentRequest {
    pub fn into_new_payment(self, currency: Currency, today: NaiveDate) -> NewPayment {
        NewPayment {
            montant: self.montant.map(|m| Money::new(m, currency)),
            prestation_ids: self.prestation_ids.into_iter().map(PrestationId::from).collect(),
            methode: self.methode,
            date_paiement: self.date_paiement.unwrap_or(today),
            reference: self.reference,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePaymentRequest {
    #[validate(custom(function = "positive"))]
    pub montant: Option<Decimal>,
    pub methode: Option<PaymentMethod>,
    pub date_paiement: Option<NaiveDate>,
    #[validate(length(max = 128))]
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl UpdatePaymentRequest {
    pub fn into_update(self, currency: Currency) -> PaymentUpdate {
        PaymentUpdate {
            montant: self.montant.map(|m| Money::new(m, currency)),
            methode: self.methode,
            date_paiement: self.date_paiement,
            reference: self.reference,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCreditRequest {
    #[validate(custom(function = "positive"))]
    pub montant: Decimal,
    pub currency: Option<String>,
    pub methode: PaymentMethod,
    pub date_paiement: Option<NaiveDate>,
    #[validate(length(max = 128))]
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl CreateCreditRequest {
    pub fn into_credit(self, client_id: ClientId, today: NaiveDate) -> Result<Payment, ApiError> {
        let currency = parse_currency(self.currency.as_deref())?;
        let mut credit = Payment::credit(
            client_id,
            Money::new(self.montant, currency),
            self.methode,
            self.date_paiement.unwrap_or(today),
        )?;
        credit.reference = self.reference;
        credit.notes = self.notes;
        Ok(credit)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyCreditRequest {
    pub facture_id: Uuid,
    /// Applies as much as the invoice still owes when absent
    #[validate(custom(function = "positive"))]
    pub montant: Option<Decimal>,
}

/// An invoice with its derived balance
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub balance: InvoiceBalance,
}

#[derive(Debug, Serialize)]
pub struct DeletePaymentResponse {
    pub deleted: Uuid,
    /// Balance of the invoice the payment was attached to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<InvoiceBalance>,
}

/// Query string of `GET /reports/summary`
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub currency: Currency,
    pub date: NaiveDate,
    pub clients: Vec<ClientSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    pub channel: ReminderChannel,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    pub reminder: Reminder,
    pub notification: Notification,
}
