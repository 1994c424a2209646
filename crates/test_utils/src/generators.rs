//! Property-Based Test Generators
//!
//! Proptest strategies that produce domain values respecting their
//! invariants: positive FCFA amounts, valid clients, and invoices with
//! payments attached to them.

use chrono::{Duration, NaiveDate};
use core_kernel::{CabinetId, ClientId, Money};
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_billing::{Invoice, Payment, PaymentMethod};
use domain_client::{Client, ClientStatus, ClientType, FiscalRegime, ObligationKind, ObligationUpdate};

use crate::fixtures::DateFixtures;

/// Whole FCFA amounts between 1 and 10 million
pub fn xaf_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(Decimal::from)
}

pub fn xaf_money_strategy() -> impl Strategy<Value = Money> {
    xaf_amount_strategy().prop_map(Money::xaf)
}

pub fn client_type_strategy() -> impl Strategy<Value = ClientType> {
    prop_oneof![Just(ClientType::Physique), Just(ClientType::Morale)]
}

pub fn regime_strategy() -> impl Strategy<Value = FiscalRegime> {
    proptest::sample::select(FiscalRegime::ALL.to_vec())
}

pub fn status_strategy() -> impl Strategy<Value = ClientStatus> {
    prop_oneof![
        Just(ClientStatus::Actif),
        Just(ClientStatus::Archive),
        Just(ClientStatus::Supprime),
    ]
}

pub fn obligation_kind_strategy() -> impl Strategy<Value = ObligationKind> {
    proptest::sample::select(ObligationKind::ALL.to_vec())
}

pub fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Especes),
        Just(PaymentMethod::Virement),
        Just(PaymentMethod::Cheque),
        Just(PaymentMethod::MobileMoney),
    ]
}

/// Client names, accents included
pub fn nom_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-zéèô]{2,12}( [A-Z][a-zé]{2,10}){0,2}"
}

/// A client that passes validation, in `cabinet_id`
pub fn client_strategy(cabinet_id: CabinetId) -> impl Strategy<Value = Client> {
    (
        nom_strategy(),
        client_type_strategy(),
        regime_strategy(),
        status_strategy(),
        "[A-Z][0-9]{12}[A-Z]",
        proptest::option::of("[a-z]{3,8}@[a-z]{3,8}\\.cm"),
    )
        .prop_map(move |(nom, client_type, regime, status, niu, email)| {
            let mut client = Client::new(cabinet_id, nom, client_type, regime).with_niu(niu);
            client.status = status;
            client.email = email;
            client
        })
}

/// Partial obligation update with every field optional
pub fn obligation_update_strategy() -> impl Strategy<Value = ObligationUpdate> {
    (
        proptest::option::of(any::<bool>()),
        proptest::option::of(any::<bool>()),
        proptest::option::of(any::<bool>()),
        proptest::option::of(xaf_amount_strategy()),
    )
        .prop_map(|(assujetti, payee, depose, montant)| ObligationUpdate {
            assujetti,
            payee,
            depose,
            montant,
            ..Default::default()
        })
}

/// Due dates within two months either side of [`DateFixtures::today`]
pub fn due_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (-60i64..60i64).prop_map(|offset| DateFixtures::today() + Duration::days(offset))
}

/// An FCFA invoice for `client_id` and between zero and five payments
/// against it; payments may sum past the total
pub fn invoice_with_payments_strategy(client_id: ClientId) -> impl Strategy<Value = (Invoice, Vec<Payment>)> {
    (
        xaf_amount_strategy(),
        due_date_strategy(),
        proptest::collection::vec((xaf_amount_strategy(), payment_method_strategy()), 0..5),
    )
        .prop_map(move |(total, due, paid)| {
            let invoice = Invoice::new(client_id, due - Duration::days(30), due, Money::xaf(total));
            let payments = paid
                .into_iter()
                .filter_map(|(amount, methode)| {
                    Payment::new(client_id, invoice.id, Money::xaf(amount), methode, DateFixtures::today()).ok()
                })
                .collect();
            (invoice, payments)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::IdFixtures;
    use domain_billing::{reconcile, InvoiceStatus};
    use domain_client::ClientValidator;

    proptest! {
        #[test]
        fn prop_generated_clients_validate(client in client_strategy(IdFixtures::cabinet_id())) {
            let result = ClientValidator::validate(&client);
            prop_assert!(result.errors.is_empty(), "{:?}", result.errors);
        }

        #[test]
        fn prop_remaining_never_negative(
            (invoice, payments) in invoice_with_payments_strategy(ClientId::new())
        ) {
            let balance = reconcile(&invoice, &payments, DateFixtures::today()).unwrap();
            prop_assert!(!balance.montant_restant.is_negative());
            prop_assert_ne!(balance.status, InvoiceStatus::Annulee);
        }

        #[test]
        fn prop_amounts_are_positive(money in xaf_money_strategy()) {
            prop_assert!(money.is_positive());
        }
    }
}
