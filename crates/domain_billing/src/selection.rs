//! Line-item scoped payments
//!
//! A payment may settle a subset of an invoice's prestations. Once at least
//! one item is selected the payment amount is the sum of the selection and
//! can no longer be typed in. Items already paid cannot be selected again.

use core_kernel::{Currency, InvoiceId, Money, PrestationId};

use crate::error::BillingError;
use crate::invoice::{Invoice, Prestation};

#[derive(Debug, Clone)]
struct Item {
    id: PrestationId,
    montant: Money,
    payee: bool,
}

/// Payment being prepared against one invoice
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    facture_id: InvoiceId,
    currency: Currency,
    items: Vec<Item>,
    selected: Vec<PrestationId>,
    manual_amount: Option<Money>,
}

impl PaymentDraft {
    pub fn for_invoice(invoice: &Invoice) -> Self {
        Self {
            facture_id: invoice.id,
            currency: invoice.currency(),
            items: invoice
                .prestations
                .iter()
                .map(|p| Item {
                    id: p.id,
                    montant: p.montant,
                    payee: p.payee,
                })
                .collect(),
            selected: Vec::new(),
            manual_amount: None,
        }
    }

    pub fn facture_id(&self) -> InvoiceId {
        self.facture_id
    }

    /// Adds an unpaid line item to the selection
    pub fn select(&mut self, id: PrestationId) -> Result<(), BillingError> {
        let item = self
            .items
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| BillingError::UnknownPrestation(id.to_string()))?;
        if item.payee {
            return Err(BillingError::PrestationAlreadyPaid(id.to_string()));
        }
        if !self.selected.contains(&id) {
            self.selected.push(id);
        }
        self.manual_amount = None;
        Ok(())
    }

    pub fn deselect(&mut self, id: PrestationId) {
        self.selected.retain(|s| *s != id);
    }

    pub fn selected(&self) -> &[PrestationId] {
        &self.selected
    }

    /// True while the amount is derived from the selection
    pub fn is_amount_locked(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Sets the amount by hand; with a selection only the derived value is accepted
    pub fn set_amount(&mut self, amount: Money) -> Result<(), BillingError> {
        if self.is_amount_locked() {
            if Some(amount) == self.selected_total() {
                return Ok(());
            }
            return Err(BillingError::AmountIsDerived);
        }
        self.manual_amount = Some(amount);
        Ok(())
    }

    /// Sum of the selected items
    fn selected_total(&self) -> Option<Money> {
        if self.selected.is_empty() {
            return None;
        }
        let amounts: Vec<&Money> = self
            .items
            .iter()
            .filter(|i| self.selected.contains(&i.id))
            .map(|i| &i.montant)
            .collect();
        Money::try_sum(self.currency, amounts).ok()
    }

    /// The amount the payment will carry
    pub fn amount(&self) -> Option<Money> {
        self.selected_total().or(self.manual_amount)
    }
}

/// Line items still open for selection
pub fn selectable_items(invoice: &Invoice) -> Vec<&Prestation> {
    invoice.prestations.iter().filter(|p| !p.payee).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::ClientId;
    use rust_decimal_macros::dec;

    fn invoice() -> (Invoice, PrestationId, PrestationId, PrestationId) {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut invoice = Invoice::new(ClientId::new(), d, d, Money::zero(Currency::XAF));
        let a = invoice.add_prestation("Tenue", Money::xaf(dec!(15000))).unwrap();
        let b = invoice.add_prestation("Paie", Money::xaf(dec!(10000))).unwrap();
        let c = invoice.add_prestation("DSF", Money::xaf(dec!(25000))).unwrap();
        invoice.mark_prestations(&[c], true);
        (invoice, a, b, c)
    }

    #[test]
    fn test_selection_sums_amounts() {
        let (invoice, a, b, _) = invoice();
        let mut draft = PaymentDraft::for_invoice(&invoice);
        draft.select(a).unwrap();
        draft.select(b).unwrap();
        draft.select(b).unwrap();
        assert_eq!(draft.amount(), Some(Money::xaf(dec!(25000))));

        draft.deselect(a);
        assert_eq!(draft.amount(), Some(Money::xaf(dec!(10000))));
    }

    #[test]
    fn test_amount_is_read_only_with_selection() {
        let (invoice, a, _, _) = invoice();
        let mut draft = PaymentDraft::for_invoice(&invoice);
        draft.set_amount(Money::xaf(dec!(1000))).unwrap();
        draft.select(a).unwrap();
        assert!(draft.is_amount_locked());
        assert!(matches!(draft.set_amount(Money::xaf(dec!(1000))), Err(BillingError::AmountIsDerived)));
        assert_eq!(draft.amount(), Some(Money::xaf(dec!(15000))));
    }

    #[test]
    fn test_paid_item_not_selectable() {
        let (invoice, _, _, c) = invoice();
        let mut draft = PaymentDraft::for_invoice(&invoice);
        assert!(matches!(draft.select(c), Err(BillingError::PrestationAlreadyPaid(_))));
        assert_eq!(selectable_items(&invoice).len(), 2);
    }

    #[test]
    fn test_unknown_item() {
        let (invoice, _, _, _) = invoice();
        let mut draft = PaymentDraft::for_invoice(&invoice);
        assert!(matches!(draft.select(PrestationId::new()), Err(BillingError::UnknownPrestation(_))));
    }
}
