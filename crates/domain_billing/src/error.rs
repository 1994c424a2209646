//! Billing domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// No payment may touch a cancelled invoice
    #[error("Invoice {0} is cancelled")]
    InvoiceCancelled(String),

    #[error("Invoice {0} is already fully paid")]
    InvoiceAlreadyPaid(String),

    /// An invoice with recorded payments cannot be cancelled
    #[error("Invoice {0} has recorded payments")]
    InvoiceHasPayments(String),

    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        expected: String,
        actual: String,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The amount of a line-item scoped payment is derived from the items
    #[error("Payment amount is derived from the selected line items")]
    AmountIsDerived,

    #[error("Line item {0} is already paid")]
    PrestationAlreadyPaid(String),

    #[error("Line item {0} does not belong to the invoice")]
    UnknownPrestation(String),

    #[error("Credit {0} is already applied to an invoice")]
    CreditAlreadyApplied(String),

    #[error("Payment {0} is not a credit")]
    NotACredit(String),

    /// Credit and invoice belong to different clients
    #[error("Credit {credit} does not belong to the client of invoice {invoice}")]
    ClientMismatch {
        credit: String,
        invoice: String,
    },

    #[error("Client has no overdue invoice")]
    NoOverdueInvoices,

    #[error("Client has no {0} address")]
    MissingRecipient(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl BillingError {
    pub fn currency_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        BillingError::CurrencyMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn invalid_amount(message: impl Into<String>) -> Self {
        BillingError::InvalidAmount(message.into())
    }
}

impl From<BillingError> for PortError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvoiceNotFound(id) => PortError::not_found("Invoice", id),
            BillingError::PaymentNotFound(id) => PortError::not_found("Payment", id),
            BillingError::InvoiceCancelled(_)
            | BillingError::InvoiceAlreadyPaid(_)
            | BillingError::InvoiceHasPayments(_)
            | BillingError::CreditAlreadyApplied(_)
            | BillingError::PrestationAlreadyPaid(_)
            | BillingError::NoOverdueInvoices => PortError::conflict(err.to_string()),
            BillingError::Template(_) => PortError::internal(err.to_string()),
            _ => PortError::validation(err.to_string()),
        }
    }
}
