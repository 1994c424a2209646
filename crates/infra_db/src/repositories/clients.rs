//! Client repository implementation
//!
//! Clients are stored flat in the `clients` table. Enumerations are kept as
//! text (constrained by CHECKs in the schema) and the per-year fiscal data
//! as a JSONB blob.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{CabinetId, ClientId, CollaboratorId};
use domain_client::{Client, ClientStatus, ClientType, FiscalData, FiscalRegime, ObligationKind};

use crate::error::DatabaseError;

const CLIENT_COLUMNS: &str = "client_id, cabinet_id, nom, niu, client_type, regime_fiscal, status, \
     email, telephone, ville, gestionnaire_id, centre_gestion_agree, fiscal_data, created_at, updated_at";

/// Row of the `clients` table
#[derive(Debug, Clone, FromRow)]
pub struct ClientRow {
    pub client_id: Uuid,
    pub cabinet_id: Uuid,
    pub nom: String,
    pub niu: Option<String>,
    pub client_type: String,
    pub regime_fiscal: String,
    pub status: String,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub ville: Option<String>,
    pub gestionnaire_id: Option<Uuid>,
    pub centre_gestion_agree: bool,
    pub fiscal_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientRow {
    pub fn from_client(client: &Client) -> Result<Self, DatabaseError> {
        let fiscal_data = client
            .fiscal_data
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| DatabaseError::decode(format!("fiscal data: {e}")))?;
        Ok(Self {
            client_id: Uuid::from(client.id),
            cabinet_id: Uuid::from(client.cabinet_id),
            nom: client.nom.clone(),
            niu: client.niu.clone(),
            client_type: client.client_type.as_str().to_string(),
            regime_fiscal: client.regime_fiscal.as_str().to_string(),
            status: client.status.as_str().to_string(),
            email: client.email.clone(),
            telephone: client.telephone.clone(),
            ville: client.ville.clone(),
            gestionnaire_id: client.gestionnaire_id.map(Uuid::from),
            centre_gestion_agree: client.centre_gestion_agree,
            fiscal_data,
            created_at: client.created_at,
            updated_at: client.updated_at,
        })
    }

    /// Converts back to a domain client; unknown regimes fall back to `reel`
    pub fn into_client(self) -> Result<Client, DatabaseError> {
        let client_type = ClientType::parse(&self.client_type)
            .ok_or_else(|| DatabaseError::decode(format!("client_type '{}'", self.client_type)))?;
        let status = ClientStatus::parse(&self.status)
            .ok_or_else(|| DatabaseError::decode(format!("status '{}'", self.status)))?;
        let fiscal_data = self
            .fiscal_data
            .map(serde_json::from_value::<FiscalData>)
            .transpose()
            .map_err(|e| DatabaseError::decode(format!("fiscal data of client {}: {e}", self.client_id)))?;

        Ok(Client {
            id: ClientId::from(self.client_id),
            cabinet_id: CabinetId::from(self.cabinet_id),
            nom: self.nom,
            niu: self.niu,
            client_type,
            regime_fiscal: FiscalRegime::parse_lenient(&self.regime_fiscal),
            status,
            email: self.email,
            telephone: self.telephone,
            ville: self.ville,
            gestionnaire_id: self.gestionnaire_id.map(CollaboratorId::from),
            centre_gestion_agree: self.centre_gestion_agree,
            fiscal_data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Listing filter; `None` fields do not constrain the result
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub status: Option<String>,
    pub regime_fiscal: Option<String>,
    pub client_type: Option<String>,
    /// Matched case-insensitively against `nom` and `niu`
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: i64,
}

/// Repository for the `clients`, `tasks` and `fiscal_documents` tables
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Retrieves a client of `cabinet_id`
    pub async fn get(&self, cabinet_id: Uuid, client_id: Uuid) -> Result<ClientRow, DatabaseError> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE client_id = $1 AND cabinet_id = $2"
        );
        sqlx::query_as::<_, ClientRow>(&sql)
            .bind(client_id)
            .bind(cabinet_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Client", client_id))
    }

    /// Lists clients of `cabinet_id` ordered by name
    pub async fn list(&self, cabinet_id: Uuid, filter: &ClientFilter) -> Result<Vec<ClientRow>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE cabinet_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR regime_fiscal = $3)
              AND ($4::text IS NULL OR client_type = $4)
              AND ($5::text IS NULL OR nom ILIKE $5 OR niu ILIKE $5)
            ORDER BY nom, client_id
            LIMIT $6 OFFSET $7
            "#
        );
        let pattern = filter.search.as_deref().map(like_pattern);
        let rows = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(cabinet_id)
            .bind(filter.status.as_deref())
            .bind(filter.regime_fiscal.as_deref())
            .bind(filter.client_type.as_deref())
            .bind(pattern)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn insert(&self, row: &ClientRow) -> Result<ClientRow, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO clients (
                client_id, cabinet_id, nom, niu, client_type, regime_fiscal, status,
                email, telephone, ville, gestionnaire_id, centre_gestion_agree, fiscal_data,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(row.client_id)
            .bind(row.cabinet_id)
            .bind(&row.nom)
            .bind(&row.niu)
            .bind(&row.client_type)
            .bind(&row.regime_fiscal)
            .bind(&row.status)
            .bind(&row.email)
            .bind(&row.telephone)
            .bind(&row.ville)
            .bind(row.gestionnaire_id)
            .bind(row.centre_gestion_agree)
            .bind(&row.fiscal_data)
            .bind(row.created_at)
            .bind(row.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    /// Overwrites every mutable column of an existing client
    pub async fn update(&self, row: &ClientRow) -> Result<ClientRow, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE clients SET
                nom = $3, niu = $4, client_type = $5, regime_fiscal = $6, status = $7,
                email = $8, telephone = $9, ville = $10, gestionnaire_id = $11,
                centre_gestion_agree = $12, fiscal_data = $13, updated_at = $14
            WHERE client_id = $1 AND cabinet_id = $2
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ClientRow>(&sql)
            .bind(row.client_id)
            .bind(row.cabinet_id)
            .bind(&row.nom)
            .bind(&row.niu)
            .bind(&row.client_type)
            .bind(&row.regime_fiscal)
            .bind(&row.status)
            .bind(&row.email)
            .bind(&row.telephone)
            .bind(&row.ville)
            .bind(row.gestionnaire_id)
            .bind(row.centre_gestion_agree)
            .bind(&row.fiscal_data)
            .bind(row.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Client", row.client_id))
    }

    pub async fn delete(&self, cabinet_id: Uuid, client_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM clients WHERE client_id = $1 AND cabinet_id = $2")
            .bind(client_id)
            .bind(cabinet_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Client", client_id));
        }
        Ok(())
    }

    pub async fn count_tasks(&self, cabinet_id: Uuid, client_id: Uuid) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks WHERE client_id = $1 AND cabinet_id = $2",
        )
        .bind(client_id)
        .bind(cabinet_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Catalogues an uploaded fiscal document; re-registering a path is a no-op
    pub async fn register_document(
        &self,
        client_id: Uuid,
        year: i32,
        kind: ObligationKind,
        storage_path: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO fiscal_documents (document_id, client_id, year, kind, storage_path)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (storage_path) DO NOTHING
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(client_id)
        .bind(year)
        .bind(kind.as_str())
        .bind(storage_path)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// `%term%` with LIKE wildcards in `term` escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_client::ObligationUpdate;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }

    proptest::proptest! {
        #[test]
        fn prop_like_pattern_has_no_bare_wildcards(term in "[a-z%_\\\\ ]{0,20}") {
            let pattern = like_pattern(&term);
            let inner = &pattern[1..pattern.len() - 1];
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    proptest::prop_assert!(matches!(chars.next(), Some('\\' | '%' | '_')));
                } else {
                    proptest::prop_assert!(c != '%' && c != '_');
                }
            }
        }
    }

    #[test]
    fn test_row_roundtrip() {
        let client = Client::new(CabinetId::new(), "Tchoua & Fils", ClientType::Morale, FiscalRegime::Reel)
            .with_niu("M098765432109Z")
            .with_fiscal_data(FiscalData::new().with(
                2024,
                ObligationKind::Patente,
                ObligationUpdate { assujetti: Some(true), ..Default::default() },
            ));
        let row = ClientRow::from_client(&client).unwrap();
        assert_eq!(row.regime_fiscal, "reel");
        assert_eq!(row.into_client().unwrap(), client);
    }

    #[test]
    fn test_unknown_regime_is_coerced() {
        let client = Client::new(CabinetId::new(), "X", ClientType::Physique, FiscalRegime::Igs);
        let mut row = ClientRow::from_client(&client).unwrap();
        row.regime_fiscal = "forfait".to_string();
        assert_eq!(row.into_client().unwrap().regime_fiscal, FiscalRegime::Reel);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let client = Client::new(CabinetId::new(), "X", ClientType::Physique, FiscalRegime::Igs);
        let mut row = ClientRow::from_client(&client).unwrap();
        row.status = "gelé".to_string();
        assert!(matches!(row.into_client(), Err(DatabaseError::Decode(_))));
    }
}
