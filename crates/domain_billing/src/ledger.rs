//! Per-invoice unit of work
//!
//! [`InvoiceLedger`] holds one invoice together with every payment attached
//! to it. Each payment mutation goes through it so the stored status, the
//! `payee` flags of line items and the payments never drift apart. Adapters
//! load a ledger inside a transaction (or under a lock), apply one
//! operation and write back the records it reports as changed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{Money, PaymentId};

use crate::credit::{plan_credit_application, CreditPlan};
use crate::error::BillingError;
use crate::invoice::Invoice;
use crate::payment::{NewPayment, Payment, PaymentUpdate};
use crate::reconciliation::{plan_payment, reconcile, recompute, InvoiceBalance};

/// Result of recording or updating a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub balance: InvoiceBalance,
}

/// Result of applying a credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditOutcome {
    pub plan: CreditPlan,
    /// The credit after application; attached to the invoice when used whole
    pub credit: Payment,
    /// Payment split off the credit, if any
    pub payment: Option<Payment>,
    pub balance: InvoiceBalance,
}

/// An invoice and the payments attached to it
#[derive(Debug, Clone)]
pub struct InvoiceLedger {
    pub invoice: Invoice,
    pub payments: Vec<Payment>,
}

impl InvoiceLedger {
    /// Payments not attached to `invoice` are dropped
    pub fn new(invoice: Invoice, payments: Vec<Payment>) -> Self {
        let payments = payments
            .into_iter()
            .filter(|p| p.facture_id == Some(invoice.id))
            .collect();
        Self { invoice, payments }
    }

    pub fn balance(&self, today: NaiveDate) -> Result<InvoiceBalance, BillingError> {
        reconcile(&self.invoice, &self.payments, today)
    }

    fn payment_index(&self, id: PaymentId) -> Result<usize, BillingError> {
        self.payments
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| BillingError::PaymentNotFound(id.to_string()))
    }

    /// Cancels the invoice; refused once a payment is attached
    pub fn cancel(&mut self) -> Result<(), BillingError> {
        self.invoice.cancel(self.payments.len())
    }

    /// Records a new payment, marks its line items paid and recomputes
    pub fn record_payment(
        &mut self,
        request: NewPayment,
        today: NaiveDate,
    ) -> Result<PaymentOutcome, BillingError> {
        let payment = plan_payment(&self.invoice, request)?;
        self.invoice.mark_prestations(&payment.prestation_ids, true);
        self.payments.push(payment.clone());
        let balance = recompute(&mut self.invoice, &self.payments, today)?;
        Ok(PaymentOutcome { payment, balance })
    }

    /// Updates an attached payment and recomputes
    pub fn update_payment(
        &mut self,
        id: PaymentId,
        update: PaymentUpdate,
        today: NaiveDate,
    ) -> Result<PaymentOutcome, BillingError> {
        let index = self.payment_index(id)?;
        update.apply(&mut self.payments[index])?;
        let payment = self.payments[index].clone();
        let balance = recompute(&mut self.invoice, &self.payments, today)?;
        Ok(PaymentOutcome { payment, balance })
    }

    /// Removes an attached payment, releases its line items and recomputes
    pub fn remove_payment(
        &mut self,
        id: PaymentId,
        today: NaiveDate,
    ) -> Result<(Payment, InvoiceBalance), BillingError> {
        let index = self.payment_index(id)?;
        let payment = self.payments.remove(index);
        self.invoice.mark_prestations(&payment.prestation_ids, false);
        let balance = recompute(&mut self.invoice, &self.payments, today)?;
        Ok((payment, balance))
    }

    /// Applies (part of) `credit` to the invoice and recomputes
    pub fn apply_credit(
        &mut self,
        mut credit: Payment,
        requested: Option<Money>,
        today: NaiveDate,
    ) -> Result<CreditOutcome, BillingError> {
        let current = self.balance(today)?;
        let plan = plan_credit_application(&credit, &self.invoice, &current, requested)?;
        let payment = plan.execute(&mut credit, today)?;

        match &payment {
            Some(split) => self.payments.push(split.clone()),
            None => self.payments.push(credit.clone()),
        }
        let balance = recompute(&mut self.invoice, &self.payments, today)?;
        Ok(CreditOutcome {
            plan,
            credit,
            payment,
            balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::InvoiceStatus;
    use crate::payment::PaymentMethod;
    use core_kernel::{ClientId, PrestationId};
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn request(montant: Option<i64>, items: Vec<PrestationId>) -> NewPayment {
        NewPayment {
            montant: montant.map(|m| Money::xaf(m.into())),
            prestation_ids: items,
            methode: PaymentMethod::MobileMoney,
            date_paiement: date(5),
            reference: None,
            notes: None,
        }
    }

    fn ledger_with_items() -> (InvoiceLedger, PrestationId, PrestationId) {
        let mut invoice = Invoice::new(ClientId::new(), date(1), date(31), Money::xaf(dec!(0)));
        let a = invoice.add_prestation("Bilan", Money::xaf(dec!(30000))).unwrap();
        let b = invoice.add_prestation("DSF", Money::xaf(dec!(20000))).unwrap();
        (InvoiceLedger::new(invoice, Vec::new()), a, b)
    }

    #[test]
    fn test_item_payment_marks_and_releases() {
        let (mut ledger, a, _b) = ledger_with_items();

        let outcome = ledger.record_payment(request(None, vec![a]), date(5)).unwrap();
        assert!(ledger.invoice.prestation(a).unwrap().payee);
        assert_eq!(outcome.balance.status, InvoiceStatus::PartiellementPayee);
        assert_eq!(ledger.invoice.status, InvoiceStatus::PartiellementPayee);

        // the same item cannot be paid twice
        assert!(matches!(
            ledger.record_payment(request(None, vec![a]), date(6)),
            Err(BillingError::PrestationAlreadyPaid(_))
        ));

        let (_, balance) = ledger.remove_payment(outcome.payment.id, date(7)).unwrap();
        assert!(!ledger.invoice.prestation(a).unwrap().payee);
        assert_eq!(balance.status, InvoiceStatus::EnAttente);
    }

    #[test]
    fn test_update_payment_recomputes() {
        let (mut ledger, _, _) = ledger_with_items();
        let outcome = ledger.record_payment(request(Some(10000), vec![]), date(5)).unwrap();

        let update = PaymentUpdate { montant: Some(Money::xaf(dec!(50000))), ..Default::default() };
        let updated = ledger.update_payment(outcome.payment.id, update, date(6)).unwrap();
        assert_eq!(updated.balance.status, InvoiceStatus::Payee);
        assert_eq!(ledger.invoice.status, InvoiceStatus::Payee);
    }

    #[test]
    fn test_cancel_refused_with_payments() {
        let (mut ledger, _, _) = ledger_with_items();
        ledger.record_payment(request(Some(1000), vec![]), date(5)).unwrap();
        assert!(matches!(ledger.cancel(), Err(BillingError::InvoiceHasPayments(_))));
    }

    #[test]
    fn test_split_credit() {
        let (mut ledger, _, _) = ledger_with_items();
        let credit = Payment::credit(ledger.invoice.client_id, Money::xaf(dec!(80000)), PaymentMethod::Virement, date(2)).unwrap();

        let outcome = ledger.apply_credit(credit, None, date(10)).unwrap();
        assert_eq!(outcome.credit.montant, Money::xaf(dec!(30000)));
        assert!(outcome.credit.is_credit());
        let split = outcome.payment.unwrap();
        assert_eq!(split.montant, Money::xaf(dec!(50000)));
        assert_eq!(outcome.balance.status, InvoiceStatus::Payee);
    }

    #[test]
    fn test_whole_credit_attaches() {
        let (mut ledger, _, _) = ledger_with_items();
        let credit = Payment::credit(ledger.invoice.client_id, Money::xaf(dec!(20000)), PaymentMethod::Especes, date(2)).unwrap();

        let outcome = ledger.apply_credit(credit.clone(), None, date(10)).unwrap();
        assert!(outcome.payment.is_none());
        assert_eq!(outcome.credit.facture_id, Some(ledger.invoice.id));
        assert_eq!(ledger.payments.len(), 1);
        assert_eq!(ledger.invoice.status, InvoiceStatus::PartiellementPayee);
    }
}
