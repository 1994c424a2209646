//! Billing repository implementation
//!
//! Invoices live in `factures` with their line items in `prestations`;
//! payments and credits share `paiements` (a credit has no `facture_id`).
//! Mutations that touch an invoice's payments run on a connection inside a
//! transaction: the invoice and payment rows are locked with `FOR UPDATE`, the ledger is
//! rebuilt from the rows, and everything it changed is written back before
//! commit.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use core_kernel::{ClientId, Currency, InvoiceId, Money, PaymentId, PrestationId};
use domain_billing::{Invoice, InvoiceLedger, InvoiceStatus, Payment, PaymentMethod, Prestation};

use crate::error::DatabaseError;

const INVOICE_COLUMNS: &str = "facture_id, client_id, numero, date_emission, date_echeance, \
     montant, currency, status, notes, created_at, updated_at";

const PRESTATION_COLUMNS: &str = "prestation_id, facture_id, description, montant, payee, position";

const PAYMENT_COLUMNS: &str = "paiement_id, client_id, facture_id, montant, currency, methode, \
     date_paiement, reference, prestation_ids, notes, created_at, updated_at";

/// Row of the `factures` table
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub facture_id: Uuid,
    pub client_id: Uuid,
    pub numero: String,
    pub date_emission: NaiveDate,
    pub date_echeance: NaiveDate,
    pub montant: Decimal,
    pub currency: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `prestations` table
#[derive(Debug, Clone, FromRow)]
pub struct PrestationRow {
    pub prestation_id: Uuid,
    pub facture_id: Uuid,
    pub description: String,
    pub montant: Decimal,
    pub payee: bool,
    pub position: i32,
}

/// Row of the `paiements` table
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub paiement_id: Uuid,
    pub client_id: Uuid,
    pub facture_id: Option<Uuid>,
    pub montant: Decimal,
    pub currency: String,
    pub methode: String,
    pub date_paiement: NaiveDate,
    pub reference: Option<String>,
    pub prestation_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn currency(code: &str) -> Result<Currency, DatabaseError> {
    Currency::from_code(code).ok_or_else(|| DatabaseError::decode(format!("currency '{code}'")))
}

impl InvoiceRow {
    pub fn from_invoice(invoice: &Invoice) -> Self {
        Self {
            facture_id: Uuid::from(invoice.id),
            client_id: Uuid::from(invoice.client_id),
            numero: invoice.numero.clone(),
            date_emission: invoice.date_emission,
            date_echeance: invoice.date_echeance,
            montant: invoice.montant.amount(),
            currency: invoice.currency().code().to_string(),
            status: invoice.status.as_str().to_string(),
            notes: invoice.notes.clone(),
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }

    /// Assembles the invoice from its row and line-item rows
    pub fn into_invoice(self, mut prestations: Vec<PrestationRow>) -> Result<Invoice, DatabaseError> {
        let currency = currency(&self.currency)?;
        let status = InvoiceStatus::parse(&self.status)
            .ok_or_else(|| DatabaseError::decode(format!("invoice status '{}'", self.status)))?;
        prestations.sort_by_key(|p| p.position);

        Ok(Invoice {
            id: InvoiceId::from(self.facture_id),
            client_id: ClientId::from(self.client_id),
            numero: self.numero,
            date_emission: self.date_emission,
            date_echeance: self.date_echeance,
            montant: Money::new(self.montant, currency),
            prestations: prestations
                .into_iter()
                .map(|p| Prestation {
                    id: PrestationId::from(p.prestation_id),
                    facture_id: InvoiceId::from(p.facture_id),
                    description: p.description,
                    montant: Money::new(p.montant, currency),
                    payee: p.payee,
                })
                .collect(),
            status,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PaymentRow {
    pub fn from_payment(payment: &Payment) -> Self {
        Self {
            paiement_id: Uuid::from(payment.id),
            client_id: Uuid::from(payment.client_id),
            facture_id: payment.facture_id.map(Uuid::from),
            montant: payment.montant.amount(),
            currency: payment.montant.currency().code().to_string(),
            methode: payment.methode.as_str().to_string(),
            date_paiement: payment.date_paiement,
            reference: payment.reference.clone(),
            prestation_ids: payment.prestation_ids.iter().map(|id| Uuid::from(*id)).collect(),
            notes: payment.notes.clone(),
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }

    pub fn into_payment(self) -> Result<Payment, DatabaseError> {
        Ok(Payment {
            id: PaymentId::from(self.paiement_id),
            client_id: ClientId::from(self.client_id),
            facture_id: self.facture_id.map(InvoiceId::from),
            montant: Money::new(self.montant, currency(&self.currency)?),
            methode: PaymentMethod::parse(&self.methode),
            date_paiement: self.date_paiement,
            reference: self.reference,
            prestation_ids: self.prestation_ids.into_iter().map(PrestationId::from).collect(),
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for invoices, line items and payments
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts an invoice and its line items in a single transaction
    pub async fn insert_invoice(&self, invoice: &Invoice) -> Result<Invoice, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let row = InvoiceRow::from_invoice(invoice);

        sqlx::query(
            r#"
            INSERT INTO factures (
                facture_id, client_id, numero, date_emission, date_echeance,
                montant, currency, status, notes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(row.facture_id)
        .bind(row.client_id)
        .bind(&row.numero)
        .bind(row.date_emission)
        .bind(row.date_echeance)
        .bind(row.montant)
        .bind(&row.currency)
        .bind(&row.status)
        .bind(&row.notes)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, prestation) in invoice.prestations.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO prestations (prestation_id, facture_id, description, montant, payee, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::from(prestation.id))
            .bind(row.facture_id)
            .bind(&prestation.description)
            .bind(prestation.montant.amount())
            .bind(prestation.payee)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(invoice.clone())
    }

    pub async fn get_invoice(&self, facture_id: Uuid) -> Result<Invoice, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let row = fetch_invoice_row(&mut conn, facture_id, false).await?;
        let prestations = fetch_prestations(&mut conn, &[facture_id]).await?;
        row.into_invoice(prestations)
    }

    /// Invoices of the given clients, most recent first
    pub async fn list_invoices(&self, client_ids: &[Uuid]) -> Result<Vec<Invoice>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM factures WHERE client_id = ANY($1) \
             ORDER BY date_emission DESC, facture_id DESC"
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(client_ids)
            .fetch_all(&mut *conn)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.facture_id).collect();
        let mut by_invoice: HashMap<Uuid, Vec<PrestationRow>> = HashMap::new();
        for prestation in fetch_prestations(&mut conn, &ids).await? {
            by_invoice.entry(prestation.facture_id).or_default().push(prestation);
        }

        rows.into_iter()
            .map(|row| {
                let prestations = by_invoice.remove(&row.facture_id).unwrap_or_default();
                row.into_invoice(prestations)
            })
            .collect()
    }

    pub async fn get_payment(&self, paiement_id: Uuid) -> Result<Payment, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fetch_payment_row(&mut conn, paiement_id, false).await?.into_payment()
    }

    /// Invoice and attached payments without taking locks
    pub async fn get_ledger(&self, facture_id: Uuid) -> Result<InvoiceLedger, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        load_ledger(&mut conn, facture_id, false).await
    }

    /// Payments and credits of the given clients, most recent first
    pub async fn list_payments(&self, client_ids: &[Uuid]) -> Result<Vec<Payment>, DatabaseError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM paiements WHERE client_id = ANY($1) \
             ORDER BY date_paiement DESC, paiement_id DESC"
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(client_ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(PaymentRow::into_payment)
            .collect()
    }

    /// Inserts an unattached credit
    pub async fn insert_credit(&self, credit: &Payment) -> Result<Payment, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        upsert_payment(&mut conn, credit).await?;
        Ok(credit.clone())
    }

    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, DatabaseError> {
        Ok(self.pool.begin().await?)
    }
}

/// Loads an invoice with its payments; `for_update` locks the rows
pub async fn load_ledger(
    conn: &mut PgConnection,
    facture_id: Uuid,
    for_update: bool,
) -> Result<InvoiceLedger, DatabaseError> {
    let row = fetch_invoice_row(conn, facture_id, for_update).await?;
    let prestations = fetch_prestations(conn, &[facture_id]).await?;
    let invoice = row.into_invoice(prestations)?;

    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM paiements WHERE facture_id = $1{lock}");
    let payments = sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(facture_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(PaymentRow::into_payment)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InvoiceLedger::new(invoice, payments))
}

/// Loads a payment, locking its row
pub async fn lock_payment(conn: &mut PgConnection, paiement_id: Uuid) -> Result<Payment, DatabaseError> {
    fetch_payment_row(conn, paiement_id, true).await?.into_payment()
}

/// Writes back the stored status, line-item flags and payments of a ledger
pub async fn write_ledger(conn: &mut PgConnection, ledger: &InvoiceLedger) -> Result<(), DatabaseError> {
    let invoice = &ledger.invoice;
    sqlx::query("UPDATE factures SET status = $2, updated_at = $3 WHERE facture_id = $1")
        .bind(Uuid::from(invoice.id))
        .bind(invoice.status.as_str())
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

    let paid: Vec<Uuid> = invoice
        .prestations
        .iter()
        .filter(|p| p.payee)
        .map(|p| Uuid::from(p.id))
        .collect();
    sqlx::query("UPDATE prestations SET payee = (prestation_id = ANY($2)) WHERE facture_id = $1")
        .bind(Uuid::from(invoice.id))
        .bind(&paid)
        .execute(&mut *conn)
        .await?;

    for payment in &ledger.payments {
        upsert_payment(conn, payment).await?;
    }
    Ok(())
}

pub async fn upsert_payment(conn: &mut PgConnection, payment: &Payment) -> Result<(), DatabaseError> {
    let row = PaymentRow::from_payment(payment);
    sqlx::query(
        r#"
        INSERT INTO paiements (
            paiement_id, client_id, facture_id, montant, currency, methode, date_paiement,
            reference, prestation_ids, notes, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (paiement_id) DO UPDATE SET
            facture_id = EXCLUDED.facture_id,
            montant = EXCLUDED.montant,
            methode = EXCLUDED.methode,
            date_paiement = EXCLUDED.date_paiement,
            reference = EXCLUDED.reference,
            prestation_ids = EXCLUDED.prestation_ids,
            notes = EXCLUDED.notes,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(row.paiement_id)
    .bind(row.client_id)
    .bind(row.facture_id)
    .bind(row.montant)
    .bind(&row.currency)
    .bind(&row.methode)
    .bind(row.date_paiement)
    .bind(&row.reference)
    .bind(&row.prestation_ids)
    .bind(&row.notes)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_payment(conn: &mut PgConnection, paiement_id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM paiements WHERE paiement_id = $1")
        .bind(paiement_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Payment", paiement_id));
    }
    Ok(())
}

async fn fetch_invoice_row(
    conn: &mut PgConnection,
    facture_id: Uuid,
    for_update: bool,
) -> Result<InvoiceRow, DatabaseError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM factures WHERE facture_id = $1{lock}");
    sqlx::query_as::<_, InvoiceRow>(&sql)
        .bind(facture_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Invoice", facture_id))
}

async fn fetch_prestations(conn: &mut PgConnection, facture_ids: &[Uuid]) -> Result<Vec<PrestationRow>, DatabaseError> {
    let sql = format!(
        "SELECT {PRESTATION_COLUMNS} FROM prestations WHERE facture_id = ANY($1) ORDER BY position"
    );
    Ok(sqlx::query_as::<_, PrestationRow>(&sql)
        .bind(facture_ids)
        .fetch_all(&mut *conn)
        .await?)
}

async fn fetch_payment_row(
    conn: &mut PgConnection,
    paiement_id: Uuid,
    for_update: bool,
) -> Result<PaymentRow, DatabaseError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM paiements WHERE paiement_id = $1{lock}");
    sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(paiement_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Payment", paiement_id))
}
