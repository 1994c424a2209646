//! PostgreSQL Client Adapter
//!
//! Implements `ClientPort` on top of [`ClientRepository`]. The adapter only
//! stores and loads; validation and lifecycle rules come from
//! `ClientPortExt`, which works the same over this adapter and the mock.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClientAdapter;
//! use domain_client::{ClientPort, ClientPortExt};
//!
//! let port: Arc<dyn ClientPort> = Arc::new(PostgresClientAdapter::new(pool));
//! let saved = port.register_client(client, None).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, CabinetId, ClientId, DomainPort, HealthCheckResult, HealthCheckable,
    OperationMetadata, PortError,
};
use domain_client::{Client, ClientPort, ClientQuery, ObligationKind};

use crate::repositories::clients::{ClientFilter, ClientRepository, ClientRow};

/// PostgreSQL-backed implementation of the ClientPort trait
#[derive(Debug, Clone)]
pub struct PostgresClientAdapter {
    repository: ClientRepository,
}

impl PostgresClientAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClientRepository::new(pool),
        }
    }

    pub fn repository(&self) -> &ClientRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClientAdapter {}

#[async_trait]
impl HealthCheckable for PostgresClientAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        database_health("postgres-client-adapter", self.repository.pool()).await
    }
}

/// Runs `SELECT 1` and reports the latency
pub(crate) async fn database_health(adapter_id: &str, pool: &PgPool) -> HealthCheckResult {
    let start = std::time::Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };
    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: Utc::now(),
    }
}

fn filter_from_query(query: &ClientQuery) -> ClientFilter {
    ClientFilter {
        status: query.status.map(|s| s.as_str().to_string()),
        regime_fiscal: query.regime.map(|r| r.as_str().to_string()),
        client_type: query.client_type.map(|t| t.as_str().to_string()),
        search: query.search.clone().filter(|s| !s.trim().is_empty()),
        limit: query.limit.map(i64::from),
        offset: query.offset.map(i64::from).unwrap_or(0),
    }
}

#[async_trait]
impl ClientPort for PostgresClientAdapter {
    #[instrument(skip_all, fields(cabinet_id = %cabinet_id, client_id = %id))]
    async fn get_client(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Client, PortError> {
        let row = self.repository.get(cabinet_id.into(), id.into()).await?;
        Ok(row.into_client()?)
    }

    #[instrument(skip_all, fields(cabinet_id = %cabinet_id))]
    async fn find_clients(
        &self,
        cabinet_id: CabinetId,
        query: ClientQuery,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Client>, PortError> {
        debug!(?query, "Finding clients");
        let rows = self
            .repository
            .list(cabinet_id.into(), &filter_from_query(&query))
            .await?;
        rows.into_iter()
            .map(|row| row.into_client().map_err(PortError::from))
            .collect()
    }

    #[instrument(skip_all, fields(client_id = %client.id))]
    async fn create_client(
        &self,
        client: Client,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Client, PortError> {
        let row = self.repository.insert(&ClientRow::from_client(&client)?).await?;
        Ok(row.into_client()?)
    }

    #[instrument(skip_all, fields(client_id = %client.id))]
    async fn save_client(
        &self,
        client: Client,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Client, PortError> {
        let row = self.repository.update(&ClientRow::from_client(&client)?).await?;
        Ok(row.into_client()?)
    }

    #[instrument(skip_all, fields(client_id = %id))]
    async fn purge_client(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        Ok(self.repository.delete(cabinet_id.into(), id.into()).await?)
    }

    #[instrument(skip_all, fields(client_id = %id))]
    async fn count_tasks(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<i64, PortError> {
        Ok(self.repository.count_tasks(cabinet_id.into(), id.into()).await?)
    }

    #[instrument(skip_all, fields(client_id = %id, year = year, kind = %kind.as_str()))]
    async fn register_document(
        &self,
        id: ClientId,
        year: i32,
        kind: ObligationKind,
        path: &str,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        Ok(self
            .repository
            .register_document(Uuid::from(id), year, kind, path)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_client::{ClientStatus, FiscalRegime};

    #[test]
    fn test_filter_from_query() {
        let query = ClientQuery {
            status: Some(ClientStatus::Archive),
            regime: Some(FiscalRegime::NonProfessionnel),
            search: Some("   ".into()),
            ..Default::default()
        }
        .paginate(25, 50);

        let filter = filter_from_query(&query);
        assert_eq!(filter.status.as_deref(), Some("archive"));
        assert_eq!(filter.regime_fiscal.as_deref(), Some("non_professionnel"));
        assert!(filter.search.is_none());
        assert_eq!(filter.limit, Some(25));
        assert_eq!(filter.offset, 50);
    }
}
