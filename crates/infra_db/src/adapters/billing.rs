//! PostgreSQL Billing Adapter
//!
//! Implements `BillingPort`. Each payment mutation opens a transaction,
//! locks the invoice and its payments, applies one `InvoiceLedger`
//! operation and writes the result back before committing, so the payment
//! rows and the stored invoice status change together.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use core_kernel::{
    ClientId, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId, Money, OperationMetadata,
    PaymentId, PortError,
};
use domain_billing::{
    BillingError, BillingPort, CreditOutcome, Invoice, InvoiceBalance, InvoiceLedger, NewPayment,
    Payment, PaymentOutcome, PaymentUpdate,
};

use crate::adapters::client::database_health;
use crate::error::DatabaseError;
use crate::repositories::billing::{self as repo, BillingRepository};

/// PostgreSQL-backed implementation of the BillingPort trait
#[derive(Debug, Clone)]
pub struct PostgresBillingAdapter {
    repository: BillingRepository,
}

impl PostgresBillingAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BillingRepository::new(pool),
        }
    }

    pub fn repository(&self) -> &BillingRepository {
        &self.repository
    }

    /// Runs `op` on the locked ledger of `facture_id` and commits its changes
    async fn with_ledger<T, F>(&self, facture_id: Uuid, op: F) -> Result<T, PortError>
    where
        T: Send,
        F: FnOnce(&mut InvoiceLedger) -> Result<T, BillingError> + Send,
    {
        let mut tx = self.repository.begin().await?;
        let mut ledger = repo::load_ledger(&mut tx, facture_id, true).await?;
        let output = op(&mut ledger)?;
        repo::write_ledger(&mut tx, &ledger).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(output)
    }

    async fn attached_invoice(&self, payment_id: PaymentId) -> Result<Uuid, PortError> {
        let payment = self.repository.get_payment(payment_id.into()).await?;
        payment
            .facture_id
            .map(Uuid::from)
            .ok_or_else(|| PortError::validation("credits are changed through apply_credit"))
    }
}

impl DomainPort for PostgresBillingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBillingAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        database_health("postgres-billing-adapter", self.repository.pool()).await
    }
}

#[async_trait]
impl BillingPort for PostgresBillingAdapter {
    #[instrument(skip_all, fields(client_id = %invoice.client_id, numero = %invoice.numero))]
    async fn create_invoice(
        &self,
        invoice: Invoice,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Invoice, PortError> {
        let invoice = self.repository.insert_invoice(&invoice).await?;
        info!(invoice_id = %invoice.id, "invoice created");
        Ok(invoice)
    }

    #[instrument(skip_all, fields(invoice_id = %id))]
    async fn get_invoice(
        &self,
        id: InvoiceId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Invoice, PortError> {
        Ok(self.repository.get_invoice(id.into()).await?)
    }

    #[instrument(skip_all, fields(client_id = %client_id))]
    async fn list_invoices(
        &self,
        client_id: ClientId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Invoice>, PortError> {
        Ok(self.repository.list_invoices(&[client_id.into()]).await?)
    }

    #[instrument(skip_all, fields(clients = client_ids.len()))]
    async fn list_invoices_for_clients(
        &self,
        client_ids: &[ClientId],
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Invoice>, PortError> {
        let ids: Vec<Uuid> = client_ids.iter().map(|id| Uuid::from(*id)).collect();
        Ok(self.repository.list_invoices(&ids).await?)
    }

    #[instrument(skip_all, fields(payment_id = %id))]
    async fn get_payment(
        &self,
        id: PaymentId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Payment, PortError> {
        Ok(self.repository.get_payment(id.into()).await?)
    }

    #[instrument(skip_all, fields(client_id = %client_id))]
    async fn list_payments(
        &self,
        client_id: ClientId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Payment>, PortError> {
        Ok(self.repository.list_payments(&[client_id.into()]).await?)
    }

    #[instrument(skip_all, fields(clients = client_ids.len()))]
    async fn list_payments_for_clients(
        &self,
        client_ids: &[ClientId],
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Payment>, PortError> {
        let ids: Vec<Uuid> = client_ids.iter().map(|id| Uuid::from(*id)).collect();
        Ok(self.repository.list_payments(&ids).await?)
    }

    #[instrument(skip_all, fields(invoice_id = %id))]
    async fn invoice_balance(
        &self,
        id: InvoiceId,
        today: NaiveDate,
        _metadata: Option<OperationMetadata>,
    ) -> Result<InvoiceBalance, PortError> {
        let ledger = self.repository.get_ledger(id.into()).await?;
        Ok(ledger.balance(today)?)
    }

    #[instrument(skip_all, fields(invoice_id = %id))]
    async fn cancel_invoice(
        &self,
        id: InvoiceId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Invoice, PortError> {
        let invoice = self
            .with_ledger(id.into(), |ledger| {
                ledger.cancel()?;
                Ok(ledger.invoice.clone())
            })
            .await?;
        info!(numero = %invoice.numero, "invoice cancelled");
        Ok(invoice)
    }

    #[instrument(skip_all, fields(invoice_id = %invoice_id))]
    async fn record_payment(
        &self,
        invoice_id: InvoiceId,
        request: NewPayment,
        today: NaiveDate,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentOutcome, PortError> {
        let outcome = self
            .with_ledger(invoice_id.into(), move |ledger| ledger.record_payment(request, today))
            .await?;
        info!(
            payment_id = %outcome.payment.id,
            montant = %outcome.payment.montant,
            status = %outcome.balance.status,
            "payment recorded"
        );
        Ok(outcome)
    }

    #[instrument(skip_all, fields(payment_id = %id))]
    async fn update_payment(
        &self,
        id: PaymentId,
        update: PaymentUpdate,
        today: NaiveDate,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentOutcome, PortError> {
        let facture_id = self.attached_invoice(id).await?;
        let outcome = self
            .with_ledger(facture_id, move |ledger| ledger.update_payment(id, update, today))
            .await?;
        info!(status = %outcome.balance.status, "payment updated");
        Ok(outcome)
    }

    #[instrument(skip_all, fields(payment_id = %id))]
    async fn delete_payment(
        &self,
        id: PaymentId,
        today: NaiveDate,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Option<InvoiceBalance>, PortError> {
        let payment = self.repository.get_payment(id.into()).await?;
        let mut tx = self.repository.begin().await?;

        let Some(facture_id) = payment.facture_id else {
            repo::delete_payment(&mut tx, id.into()).await?;
            tx.commit().await.map_err(DatabaseError::from)?;
            info!("credit deleted");
            return Ok(None);
        };

        let mut ledger = repo::load_ledger(&mut tx, facture_id.into(), true).await?;
        let (_, balance) = ledger.remove_payment(id, today)?;
        repo::delete_payment(&mut tx, id.into()).await?;
        repo::write_ledger(&mut tx, &ledger).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!(status = %balance.status, "payment deleted");
        Ok(Some(balance))
    }

    #[instrument(skip_all, fields(client_id = %credit.client_id))]
    async fn record_credit(
        &self,
        credit: Payment,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Payment, PortError> {
        if !credit.is_credit() {
            return Err(BillingError::NotACredit(credit.id.to_string()).into());
        }
        let credit = self.repository.insert_credit(&credit).await?;
        info!(payment_id = %credit.id, montant = %credit.montant, "credit recorded");
        Ok(credit)
    }

    #[instrument(skip_all, fields(credit_id = %credit_id, invoice_id = %invoice_id))]
    async fn apply_credit(
        &self,
        credit_id: PaymentId,
        invoice_id: InvoiceId,
        requested: Option<Money>,
        today: NaiveDate,
        _metadata: Option<OperationMetadata>,
    ) -> Result<CreditOutcome, PortError> {
        let mut tx = self.repository.begin().await?;
        let mut ledger = repo::load_ledger(&mut tx, invoice_id.into(), true).await?;
        let credit = repo::lock_payment(&mut tx, credit_id.into()).await?;

        let outcome = ledger.apply_credit(credit, requested, today)?;
        repo::write_ledger(&mut tx, &ledger).await?;
        repo::upsert_payment(&mut tx, &outcome.credit).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!(
            applied = %outcome.plan.applied(),
            status = %outcome.balance.status,
            "credit applied"
        );
        Ok(outcome)
    }
}
