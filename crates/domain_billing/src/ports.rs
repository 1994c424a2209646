//! Billing Domain Ports
//!
//! `BillingPort` persists invoices and payments. Every payment mutation is
//! expressed as an [`InvoiceLedger`](crate::ledger::InvoiceLedger) operation
//! that the adapter runs atomically with the write-back, so the stored
//! invoice status is always the one derived from the payments.
//!
//! `ReminderGateway` delivers rendered reminders to the notification
//! service.
//!
//! Tenancy is enforced one level up: callers resolve the owning client
//! through `ClientPort` before touching its invoices.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    ClientId, DomainPort, HealthCheckable, InvoiceId, Money, OperationMetadata, PaymentId, PortError,
};

use crate::invoice::Invoice;
use crate::ledger::{CreditOutcome, PaymentOutcome};
use crate::payment::{NewPayment, Payment, PaymentUpdate};
use crate::reconciliation::InvoiceBalance;
use crate::reminders::Reminder;

/// Storage port for invoices, payments and credits
#[async_trait]
pub trait BillingPort: DomainPort + HealthCheckable {
    async fn create_invoice(
        &self,
        invoice: Invoice,
        metadata: Option<OperationMetadata>,
    ) -> Result<Invoice, PortError>;

    async fn get_invoice(
        &self,
        id: InvoiceId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Invoice, PortError>;

    /// Invoices of a client, most recent first
    async fn list_invoices(
        &self,
        client_id: ClientId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Invoice>, PortError>;

    /// Invoices of several clients in one round trip
    async fn list_invoices_for_clients(
        &self,
        client_ids: &[ClientId],
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Invoice>, PortError>;

    async fn get_payment(
        &self,
        id: PaymentId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Payment, PortError>;

    /// Payments and credits of a client
    async fn list_payments(
        &self,
        client_id: ClientId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Payment>, PortError>;

    async fn list_payments_for_clients(
        &self,
        client_ids: &[ClientId],
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Payment>, PortError>;

    /// Derived balance of an invoice
    async fn invoice_balance(
        &self,
        id: InvoiceId,
        today: NaiveDate,
        metadata: Option<OperationMetadata>,
    ) -> Result<InvoiceBalance, PortError>;

    async fn cancel_invoice(
        &self,
        id: InvoiceId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Invoice, PortError>;

    async fn record_payment(
        &self,
        invoice_id: InvoiceId,
        request: NewPayment,
        today: NaiveDate,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentOutcome, PortError>;

    /// Updates a payment attached to an invoice
    async fn update_payment(
        &self,
        id: PaymentId,
        update: PaymentUpdate,
        today: NaiveDate,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentOutcome, PortError>;

    /// Deletes a payment; returns the new balance of its invoice, if any
    async fn delete_payment(
        &self,
        id: PaymentId,
        today: NaiveDate,
        metadata: Option<OperationMetadata>,
    ) -> Result<Option<InvoiceBalance>, PortError>;

    /// Stores an unattached credit
    async fn record_credit(
        &self,
        credit: Payment,
        metadata: Option<OperationMetadata>,
    ) -> Result<Payment, PortError>;

    async fn apply_credit(
        &self,
        credit_id: PaymentId,
        invoice_id: InvoiceId,
        requested: Option<Money>,
        today: NaiveDate,
        metadata: Option<OperationMetadata>,
    ) -> Result<CreditOutcome, PortError>;
}

/// Outbound port for payment reminders
#[async_trait]
pub trait ReminderGateway: DomainPort + HealthCheckable {
    /// Delivers one reminder; failures are not retried
    async fn send_reminder(&self, reminder: &Reminder) -> Result<(), PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use crate::error::BillingError;
    use crate::ledger::InvoiceLedger;
    use core_kernel::HealthCheckResult;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct Store {
        invoices: HashMap<InvoiceId, Invoice>,
        payments: HashMap<PaymentId, Payment>,
    }

    impl Store {
        fn ledger(&self, invoice_id: InvoiceId) -> Result<InvoiceLedger, PortError> {
            let invoice = self
                .invoices
                .get(&invoice_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Invoice", invoice_id))?;
            let payments = self
                .payments
                .values()
                .filter(|p| p.facture_id == Some(invoice_id))
                .cloned()
                .collect();
            Ok(InvoiceLedger::new(invoice, payments))
        }

        fn store_ledger(&mut self, ledger: InvoiceLedger) {
            for payment in ledger.payments {
                self.payments.insert(payment.id, payment);
            }
            self.invoices.insert(ledger.invoice.id, ledger.invoice);
        }

        fn payment(&self, id: PaymentId) -> Result<Payment, PortError> {
            self.payments
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Payment", id))
        }
    }

    /// In-memory mock implementation of BillingPort
    ///
    /// A single lock guards invoices and payments so each ledger operation
    /// is atomic.
    #[derive(Debug, Default, Clone)]
    pub struct MockBillingPort {
        store: Arc<RwLock<Store>>,
    }

    impl MockBillingPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with invoices and payments for testing
        pub async fn with_records(invoices: Vec<Invoice>, payments: Vec<Payment>) -> Self {
            let port = Self::new();
            {
                let mut store = port.store.write().await;
                for invoice in invoices {
                    store.invoices.insert(invoice.id, invoice);
                }
                for payment in payments {
                    store.payments.insert(payment.id, payment);
                }
            }
            port
        }
    }

    impl DomainPort for MockBillingPort {}

    #[async_trait]
    impl HealthCheckable for MockBillingPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-billing-port")
        }
    }

    #[async_trait]
    impl BillingPort for MockBillingPort {
        async fn create_invoice(
            &self,
            invoice: Invoice,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Invoice, PortError> {
            let mut store = self.store.write().await;
            if store.invoices.contains_key(&invoice.id) {
                return Err(PortError::conflict(format!("Invoice {} already exists", invoice.id)));
            }
            store.invoices.insert(invoice.id, invoice.clone());
            Ok(invoice)
        }

        async fn get_invoice(
            &self,
            id: InvoiceId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Invoice, PortError> {
            self.store
                .read()
                .await
                .invoices
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        async fn list_invoices(
            &self,
            client_id: ClientId,
            metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Invoice>, PortError> {
            self.list_invoices_for_clients(&[client_id], metadata).await
        }

        async fn list_invoices_for_clients(
            &self,
            client_ids: &[ClientId],
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Invoice>, PortError> {
            let store = self.store.read().await;
            let mut invoices: Vec<Invoice> = store
                .invoices
                .values()
                .filter(|i| client_ids.contains(&i.client_id))
                .cloned()
                .collect();
            invoices.sort_by(|a, b| b.date_emission.cmp(&a.date_emission).then(b.id.cmp(&a.id)));
            Ok(invoices)
        }

        async fn get_payment(
            &self,
            id: PaymentId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Payment, PortError> {
            self.store.read().await.payment(id)
        }

        async fn list_payments(
            &self,
            client_id: ClientId,
            metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Payment>, PortError> {
            self.list_payments_for_clients(&[client_id], metadata).await
        }

        async fn list_payments_for_clients(
            &self,
            client_ids: &[ClientId],
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Payment>, PortError> {
            let store = self.store.read().await;
            let mut payments: Vec<Payment> = store
                .payments
                .values()
                .filter(|p| client_ids.contains(&p.client_id))
                .cloned()
                .collect();
            payments.sort_by(|a, b| b.date_paiement.cmp(&a.date_paiement).then(b.id.cmp(&a.id)));
            Ok(payments)
        }

        async fn invoice_balance(
            &self,
            id: InvoiceId,
            today: NaiveDate,
            _metadata: Option<OperationMetadata>,
        ) -> Result<InvoiceBalance, PortError> {
            let ledger = self.store.read().await.ledger(id)?;
            Ok(ledger.balance(today)?)
        }

        async fn cancel_invoice(
            &self,
            id: InvoiceId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Invoice, PortError> {
            let mut store = self.store.write().await;
            let mut ledger = store.ledger(id)?;
            ledger.cancel()?;
            let invoice = ledger.invoice.clone();
            store.store_ledger(ledger);
            Ok(invoice)
        }

        async fn record_payment(
            &self,
            invoice_id: InvoiceId,
            request: NewPayment,
            today: NaiveDate,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentOutcome, PortError> {
            let mut store = self.store.write().await;
            let mut ledger = store.ledger(invoice_id)?;
            let outcome = ledger.record_payment(request, today)?;
            store.store_ledger(ledger);
            Ok(outcome)
        }

        async fn update_payment(
            &self,
            id: PaymentId,
            update: PaymentUpdate,
            today: NaiveDate,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentOutcome, PortError> {
            let mut store = self.store.write().await;
            let payment = store.payment(id)?;
            let invoice_id = payment
                .facture_id
                .ok_or_else(|| PortError::validation("credits are changed through apply_credit"))?;
            let mut ledger = store.ledger(invoice_id)?;
            let outcome = ledger.update_payment(id, update, today)?;
            store.store_ledger(ledger);
            Ok(outcome)
        }

        async fn delete_payment(
            &self,
            id: PaymentId,
            today: NaiveDate,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Option<InvoiceBalance>, PortError> {
            let mut store = self.store.write().await;
            let payment = store.payment(id)?;
            let Some(invoice_id) = payment.facture_id else {
                store.payments.remove(&id);
                return Ok(None);
            };
            let mut ledger = store.ledger(invoice_id)?;
            let (_, balance) = ledger.remove_payment(id, today)?;
            store.payments.remove(&id);
            store.store_ledger(ledger);
            Ok(Some(balance))
        }

        async fn record_credit(
            &self,
            credit: Payment,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Payment, PortError> {
            if !credit.is_credit() {
                return Err(BillingError::NotACredit(credit.id.to_string()).into());
            }
            self.store.write().await.payments.insert(credit.id, credit.clone());
            Ok(credit)
        }

        async fn apply_credit(
            &self,
            credit_id: PaymentId,
            invoice_id: InvoiceId,
            requested: Option<Money>,
            today: NaiveDate,
            _metadata: Option<OperationMetadata>,
        ) -> Result<CreditOutcome, PortError> {
            let mut store = self.store.write().await;
            let credit = store.payment(credit_id)?;
            let mut ledger = store.ledger(invoice_id)?;
            let outcome = ledger.apply_credit(credit, requested, today)?;
            store.payments.insert(outcome.credit.id, outcome.credit.clone());
            store.store_ledger(ledger);
            Ok(outcome)
        }
    }

    /// Mock gateway that records what it was asked to send
    #[derive(Debug, Default, Clone)]
    pub struct MockReminderGateway {
        sent: Arc<RwLock<Vec<Reminder>>>,
        failure: Arc<RwLock<Option<String>>>,
    }

    impl MockReminderGateway {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every following send fail with `message`
        pub async fn fail_with(&self, message: impl Into<String>) {
            *self.failure.write().await = Some(message.into());
        }

        pub async fn sent(&self) -> Vec<Reminder> {
            self.sent.read().await.clone()
        }
    }

    impl DomainPort for MockReminderGateway {}

    #[async_trait]
    impl HealthCheckable for MockReminderGateway {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-reminder-gateway")
        }
    }

    #[async_trait]
    impl ReminderGateway for MockReminderGateway {
        async fn send_reminder(&self, reminder: &Reminder) -> Result<(), PortError> {
            if let Some(message) = self.failure.read().await.clone() {
                return Err(PortError::ServiceUnavailable { service: message });
            }
            self.sent.write().await.push(reminder.clone());
            Ok(())
        }
    }
}
