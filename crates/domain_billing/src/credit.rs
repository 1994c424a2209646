//! Credit application
//!
//! A credit is a payment with no invoice. Applying it to an invoice either
//! attaches the whole credit, or, when the invoice needs less than the
//! credit holds, splits it: the credit shrinks and a new payment for the
//! applied part is attached to the invoice.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, Money, PaymentId};

use crate::error::BillingError;
use crate::invoice::Invoice;
use crate::payment::{ensure_positive, Payment};
use crate::reconciliation::InvoiceBalance;

/// Reference written on the payment split off a credit
pub fn credit_reference(credit_id: PaymentId) -> String {
    format!("credit:{}", credit_id.as_uuid())
}

/// How a credit will be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreditPlan {
    /// The whole credit is attached to the invoice
    AttachWhole {
        credit_id: PaymentId,
        invoice_id: InvoiceId,
        applied: Money,
    },
    /// Part of the credit is split off into a new payment
    Split {
        credit_id: PaymentId,
        invoice_id: InvoiceId,
        applied: Money,
        remaining_credit: Money,
    },
}

impl CreditPlan {
    pub fn applied(&self) -> Money {
        match self {
            CreditPlan::AttachWhole { applied, .. } | CreditPlan::Split { applied, .. } => *applied,
        }
    }

    /// Mutates `credit` and returns the new payment to insert, if any
    pub fn execute(&self, credit: &mut Payment, today: NaiveDate) -> Result<Option<Payment>, BillingError> {
        match self {
            CreditPlan::AttachWhole { invoice_id, .. } => {
                credit.facture_id = Some(*invoice_id);
                credit.updated_at = Utc::now();
                Ok(None)
            }
            CreditPlan::Split {
                credit_id,
                invoice_id,
                applied,
                remaining_credit,
            } => {
                credit.montant = *remaining_credit;
                credit.updated_at = Utc::now();
                let payment = Payment::new(credit.client_id, *invoice_id, *applied, credit.methode, today)?
                    .with_reference(credit_reference(*credit_id));
                Ok(Some(payment))
            }
        }
    }
}

/// Decides how much of `credit` goes to `invoice`
///
/// `requested` defaults to the whole credit. The applied amount is never
/// more than the credit nor more than what the invoice still needs.
pub fn plan_credit_application(
    credit: &Payment,
    invoice: &Invoice,
    balance: &InvoiceBalance,
    requested: Option<Money>,
) -> Result<CreditPlan, BillingError> {
    if !credit.is_credit() {
        return Err(BillingError::CreditAlreadyApplied(credit.id.to_string()));
    }
    if credit.client_id != invoice.client_id {
        return Err(BillingError::ClientMismatch {
            credit: credit.id.to_string(),
            invoice: invoice.numero.clone(),
        });
    }
    if invoice.is_cancelled() {
        return Err(BillingError::InvoiceCancelled(invoice.numero.clone()));
    }
    if balance.montant_restant.is_zero() {
        return Err(BillingError::InvoiceAlreadyPaid(invoice.numero.clone()));
    }
    if credit.montant.currency() != invoice.currency() {
        return Err(BillingError::currency_mismatch(invoice.currency(), credit.montant.currency()));
    }

    let requested = match requested {
        Some(amount) => {
            ensure_positive(&amount)?;
            amount
        }
        None => credit.montant,
    };
    let applied = requested
        .min(&credit.montant)?
        .min(&balance.montant_restant)?;

    if applied == credit.montant {
        Ok(CreditPlan::AttachWhole {
            credit_id: credit.id,
            invoice_id: invoice.id,
            applied,
        })
    } else {
        Ok(CreditPlan::Split {
            credit_id: credit.id,
            invoice_id: invoice.id,
            applied,
            remaining_credit: credit.montant.checked_sub(&applied)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::PaymentMethod;
    use crate::reconciliation::reconcile;
    use core_kernel::ClientId;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    fn setup(credit_amount: i64, invoice_amount: i64) -> (Payment, Invoice, InvoiceBalance) {
        let client = ClientId::new();
        let credit = Payment::credit(client, Money::xaf(credit_amount.into()), PaymentMethod::Virement, today()).unwrap();
        let invoice = Invoice::new(client, today(), today(), Money::xaf(invoice_amount.into()));
        let balance = reconcile(&invoice, &[], today()).unwrap();
        (credit, invoice, balance)
    }

    #[test]
    fn test_small_credit_is_attached_whole() {
        let (mut credit, invoice, balance) = setup(4000, 10000);
        let plan = plan_credit_application(&credit, &invoice, &balance, None).unwrap();
        assert!(matches!(plan, CreditPlan::AttachWhole { .. }));

        assert!(plan.execute(&mut credit, today()).unwrap().is_none());
        assert_eq!(credit.facture_id, Some(invoice.id));
    }

    #[test]
    fn test_large_credit_is_split() {
        let (mut credit, invoice, balance) = setup(15000, 10000);
        let plan = plan_credit_application(&credit, &invoice, &balance, None).unwrap();
        assert_eq!(plan.applied(), Money::xaf(dec!(10000)));

        let split = plan.execute(&mut credit, today()).unwrap().unwrap();
        assert!(credit.is_credit());
        assert_eq!(credit.montant, Money::xaf(dec!(5000)));
        assert_eq!(split.facture_id, Some(invoice.id));
        assert_eq!(split.montant, Money::xaf(dec!(10000)));
        assert_eq!(split.reference, Some(credit_reference(credit.id)));
    }

    #[test]
    fn test_requested_amount_caps_application() {
        let (credit, invoice, balance) = setup(8000, 10000);
        let plan = plan_credit_application(&credit, &invoice, &balance, Some(Money::xaf(dec!(3000)))).unwrap();
        assert!(matches!(plan, CreditPlan::Split { .. }));
        assert_eq!(plan.applied(), Money::xaf(dec!(3000)));
    }

    #[test]
    fn test_other_client_credit_rejected() {
        let (credit, _, _) = setup(8000, 10000);
        let other = Invoice::new(ClientId::new(), today(), today(), Money::xaf(dec!(10000)));
        let balance = reconcile(&other, &[], today()).unwrap();
        assert!(matches!(
            plan_credit_application(&credit, &other, &balance, None),
            Err(BillingError::ClientMismatch { .. })
        ));
    }

    #[test]
    fn test_applied_credit_rejected() {
        let (mut credit, invoice, balance) = setup(8000, 10000);
        credit.facture_id = Some(invoice.id);
        assert!(matches!(
            plan_credit_application(&credit, &invoice, &balance, None),
            Err(BillingError::CreditAlreadyApplied(_))
        ));
    }

    #[test]
    fn test_paid_invoice_rejected() {
        let (credit, invoice, _) = setup(8000, 10000);
        let payment = Payment::new(invoice.client_id, invoice.id, Money::xaf(dec!(10000)), PaymentMethod::Especes, today()).unwrap();
        let balance = reconcile(&invoice, &[payment], today()).unwrap();
        assert!(matches!(
            plan_credit_application(&credit, &invoice, &balance, None),
            Err(BillingError::InvoiceAlreadyPaid(_))
        ));
    }
}
