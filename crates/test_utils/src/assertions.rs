//! Custom Test Assertions
//!
//! Assertion helpers for domain types that print the values that matter
//! when they fail.

use core_kernel::{Money, PortError};
use rust_decimal::Decimal;

use domain_billing::{ClientSummary, InvoiceBalance, InvoiceStatus, SummaryStatus};
use domain_client::{Client, ClientStatus};

/// Asserts an FCFA amount
pub fn assert_xaf(actual: &Money, expected: Decimal) {
    assert_eq!(
        *actual,
        Money::xaf(expected),
        "expected {} FCFA, got {}",
        expected,
        actual
    );
}

pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "expected zero, got {}", money);
}

/// Asserts the derived state of an invoice
pub fn assert_balance(balance: &InvoiceBalance, status: InvoiceStatus, remaining: Decimal) {
    assert_eq!(
        balance.status, status,
        "invoice {}: expected status {}, got {}",
        balance.numero, status, balance.status
    );
    assert_eq!(
        balance.montant_restant.amount(),
        remaining,
        "invoice {}: expected {} remaining, got {}",
        balance.numero,
        remaining,
        balance.montant_restant
    );
}

/// Asserts that paid plus remaining covers the total, allowing overpayment
pub fn assert_balance_consistent(balance: &InvoiceBalance) {
    assert!(
        !balance.montant_restant.is_negative(),
        "invoice {}: negative remaining {}",
        balance.numero,
        balance.montant_restant
    );
    let covered = balance.montant_paye.amount() + balance.montant_restant.amount();
    assert!(
        covered >= balance.montant.amount(),
        "invoice {}: paid {} + remaining {} < total {}",
        balance.numero,
        balance.montant_paye,
        balance.montant_restant,
        balance.montant
    );
}

pub fn assert_client_status(client: &Client, expected: ClientStatus) {
    assert_eq!(
        client.status, expected,
        "client {} ({}): expected {}, got {}",
        client.nom, client.id, expected, client.status
    );
}

/// Finds the summary line of `nom` and asserts its status
pub fn assert_summary_status(rows: &[ClientSummary], nom: &str, expected: SummaryStatus) {
    let row = rows
        .iter()
        .find(|r| r.nom == nom)
        .unwrap_or_else(|| panic!("no summary line for {}", nom));
    assert_eq!(row.status, expected, "summary of {}: {:?}", nom, row);
}

pub fn assert_not_found<T: std::fmt::Debug>(result: Result<T, PortError>) {
    match result {
        Err(PortError::NotFound { .. }) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}

pub fn assert_conflict<T: std::fmt::Debug>(result: Result<T, PortError>) {
    match result {
        Err(PortError::Conflict { .. }) => {}
        other => panic!("expected Conflict, got {:?}", other),
    }
}

pub fn assert_validation<T: std::fmt::Debug>(result: Result<T, PortError>) {
    match result {
        Err(PortError::Validation { .. }) => {}
        other => panic!("expected Validation, got {:?}", other),
    }
}
