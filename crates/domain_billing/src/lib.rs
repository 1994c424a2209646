//! Billing Domain - Invoices, Payments and Client Balances
//!
//! This crate covers the money side of the cabinet: invoices (factures) and
//! their line items (prestations), payments (paiements) and client credits,
//! the per-client financial summary and payment reminders.
//!
//! # Derived State
//!
//! Nothing about an invoice's payment state is entered by hand:
//! - `montant_paye` is the sum of the payments attached to the invoice
//! - the status follows from `montant_paye` against `montant`
//! - `montant_restant` is `montant - montant_paye`, never below zero
//! - an invoice is overdue when its due date is past and it is underpaid
//!
//! Every payment mutation goes through [`InvoiceLedger`], which recomputes
//! and stores the status in the same unit of work.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use core_kernel::{ClientId, Money};
//! use domain_billing::{Invoice, InvoiceLedger, InvoiceStatus, NewPayment, PaymentMethod};
//! use rust_decimal_macros::dec;
//!
//! let emitted = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let due = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//! let invoice = Invoice::new(ClientId::new(), emitted, due, Money::xaf(dec!(10000)));
//! let mut ledger = InvoiceLedger::new(invoice, Vec::new());
//!
//! let outcome = ledger.record_payment(
//!     NewPayment {
//!         montant: Some(Money::xaf(dec!(4000))),
//!         prestation_ids: Vec::new(),
//!         methode: PaymentMethod::MobileMoney,
//!         date_paiement: emitted,
//!         reference: None,
//!         notes: None,
//!     },
//!     emitted,
//! ).unwrap();
//!
//! assert_eq!(outcome.balance.status, InvoiceStatus::PartiellementPayee);
//! assert_eq!(outcome.balance.montant_restant, Money::xaf(dec!(6000)));
//! ```

pub mod invoice;
pub mod payment;
pub mod reconciliation;
pub mod selection;
pub mod credit;
pub mod ledger;
pub mod summary;
pub mod reminders;
pub mod ports;
pub mod adapters;
pub mod error;

pub use invoice::{Invoice, InvoiceStatus, Prestation, generate_invoice_number};
pub use payment::{Payment, PaymentMethod, NewPayment, PaymentUpdate};
pub use reconciliation::{InvoiceBalance, amount_paid, derive_status, is_overdue, reconcile};
pub use selection::{PaymentDraft, selectable_items};
pub use credit::{CreditPlan, plan_credit_application, credit_reference};
pub use ledger::{InvoiceLedger, PaymentOutcome, CreditOutcome};
pub use summary::{ClientSummary, SummaryStatus, DelinquencyReason, build_summary};
pub use reminders::{Reminder, ReminderChannel, ReminderLine, Locale, Notification, NotificationLevel, build_reminder, dispatch_reminder};
pub use ports::{BillingPort, ReminderGateway};
pub use adapters::{HttpReminderGateway, ReminderGatewayConfig};
pub use error::BillingError;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{MockBillingPort, MockReminderGateway};
