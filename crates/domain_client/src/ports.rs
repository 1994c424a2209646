//! Client Domain Ports
//!
//! `ClientPort` is the storage seam of the client domain. Adapters only move
//! records in and out; the lifecycle, validation and fiscal-data rules are
//! applied once, in [`ClientPortExt`], on top of any adapter.
//!
//! Every call is scoped to a cabinet (tenant). A client that belongs to
//! another cabinet is reported as not found.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_client::ports::{ClientPort, ClientPortExt};
//!
//! let port: Arc<dyn ClientPort> = Arc::new(PostgresClientAdapter::new(pool));
//! let client = port.archive_client(cabinet_id, client_id, None).await?;
//! ```

use async_trait::async_trait;

use core_kernel::{
    CabinetId, ClientId, CollaboratorId, DomainPort, HealthCheckable, OperationMetadata, PortError,
};

use crate::client::{Client, ClientStatus, ClientType};
use crate::error::ClientError;
use crate::fiscal::{attachment_path, ObligationKind, ObligationStatus, ObligationUpdate};
use crate::regime::FiscalRegime;
use crate::validation::ClientValidator;

/// Query parameters for listing clients
#[derive(Debug, Clone, Default)]
pub struct ClientQuery {
    pub status: Option<ClientStatus>,
    pub regime: Option<FiscalRegime>,
    pub client_type: Option<ClientType>,
    /// Case-insensitive match on `nom` or `niu`
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ClientQuery {
    pub fn active() -> Self {
        Self {
            status: Some(ClientStatus::Actif),
            ..Default::default()
        }
    }

    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// In-memory form of the query, shared by adapters that filter in Rust
    pub fn matches(&self, client: &Client) -> bool {
        if let Some(status) = self.status {
            if client.status != status {
                return false;
            }
        }
        if let Some(regime) = self.regime {
            if client.regime_fiscal != regime {
                return false;
            }
        }
        if let Some(client_type) = self.client_type {
            if client.client_type != client_type {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            let in_nom = client.nom.to_lowercase().contains(&needle);
            let in_niu = client
                .niu
                .as_deref()
                .map(|n| n.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_nom && !in_niu {
                return false;
            }
        }
        true
    }
}

/// Request for updating a client; `None` leaves a field unchanged and a
/// blank string clears an optional one
#[derive(Debug, Clone, Default)]
pub struct UpdateClientRequest {
    pub nom: Option<String>,
    pub niu: Option<String>,
    pub client_type: Option<ClientType>,
    pub regime_fiscal: Option<FiscalRegime>,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub ville: Option<String>,
    pub gestionnaire_id: Option<CollaboratorId>,
    pub centre_gestion_agree: Option<bool>,
}

fn trimmed(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl UpdateClientRequest {
    fn apply(self, client: &mut Client) {
        if let Some(v) = self.nom {
            client.nom = v.trim().to_string();
        }
        if let Some(v) = self.niu {
            client.niu = trimmed(v);
        }
        if let Some(v) = self.client_type {
            client.client_type = v;
        }
        if let Some(v) = self.regime_fiscal {
            client.regime_fiscal = v;
        }
        if let Some(v) = self.email {
            client.email = trimmed(v);
        }
        if let Some(v) = self.telephone {
            client.telephone = trimmed(v);
        }
        if let Some(v) = self.ville {
            client.ville = trimmed(v);
        }
        if let Some(v) = self.gestionnaire_id {
            client.gestionnaire_id = Some(v);
        }
        if let Some(v) = self.centre_gestion_agree {
            client.centre_gestion_agree = v;
        }
    }
}

/// Outcome of a client write that passed validation
#[derive(Debug, Clone)]
pub struct SavedClient {
    pub client: Client,
    pub warnings: Vec<String>,
}

/// Storage port for clients
#[async_trait]
pub trait ClientPort: DomainPort + HealthCheckable {
    /// Retrieves a client of `cabinet_id`
    async fn get_client(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Client, PortError>;

    /// Lists clients of `cabinet_id` ordered by `nom`
    async fn find_clients(
        &self,
        cabinet_id: CabinetId,
        query: ClientQuery,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Client>, PortError>;

    /// Inserts a new client record
    async fn create_client(
        &self,
        client: Client,
        metadata: Option<OperationMetadata>,
    ) -> Result<Client, PortError>;

    /// Overwrites an existing client record, status and fiscal data included
    async fn save_client(
        &self,
        client: Client,
        metadata: Option<OperationMetadata>,
    ) -> Result<Client, PortError>;

    /// Removes the record for good
    async fn purge_client(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Number of tasks still attached to the client
    async fn count_tasks(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        metadata: Option<OperationMetadata>,
    ) -> Result<i64, PortError>;

    /// Catalogues an attached document; adapters without a catalogue keep
    /// only the path on the obligation record
    async fn register_document(
        &self,
        _id: ClientId,
        _year: i32,
        _kind: ObligationKind,
        _path: &str,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        Ok(())
    }
}

/// Client operations built on top of any [`ClientPort`]
#[async_trait]
pub trait ClientPortExt: ClientPort {
    /// Validates and inserts a client
    async fn register_client(
        &self,
        client: Client,
        metadata: Option<OperationMetadata>,
    ) -> Result<SavedClient, PortError> {
        let warnings = ClientValidator::validate(&client).into_result()?;
        let client = self.create_client(client, metadata).await?;
        tracing::info!(client_id = %client.id, "client created");
        Ok(SavedClient { client, warnings })
    }

    /// Applies an update, validates the result and saves it
    async fn update_client(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        request: UpdateClientRequest,
        metadata: Option<OperationMetadata>,
    ) -> Result<SavedClient, PortError> {
        let mut client = self.get_client(cabinet_id, id, metadata.clone()).await?;
        request.apply(&mut client);
        let warnings = ClientValidator::validate(&client).into_result()?;
        client.touch();
        let client = self.save_client(client, metadata).await?;
        Ok(SavedClient { client, warnings })
    }

    async fn archive_client(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Client, PortError> {
        let mut client = self.get_client(cabinet_id, id, metadata.clone()).await?;
        client.archive()?;
        tracing::info!(client_id = %id, "client archived");
        self.save_client(client, metadata).await
    }

    async fn restore_client(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Client, PortError> {
        let mut client = self.get_client(cabinet_id, id, metadata.clone()).await?;
        client.restore()?;
        tracing::info!(client_id = %id, "client restored");
        self.save_client(client, metadata).await
    }

    /// Soft delete, or purge when `permanent` is set
    async fn delete_client(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        permanent: bool,
        metadata: Option<OperationMetadata>,
    ) -> Result<Option<Client>, PortError> {
        let mut client = self.get_client(cabinet_id, id, metadata.clone()).await?;
        let tasks = self.count_tasks(cabinet_id, id, metadata.clone()).await?;

        if permanent {
            client.ensure_purgeable(tasks)?;
            self.purge_client(cabinet_id, id, metadata).await?;
            tracing::info!(client_id = %id, "client purged");
            return Ok(None);
        }

        client.soft_delete(tasks)?;
        tracing::info!(client_id = %id, "client deleted");
        self.save_client(client, metadata).await.map(Some)
    }

    /// Upserts the obligation entry for (year, kind)
    async fn record_obligation(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        year: i32,
        kind: ObligationKind,
        update: ObligationUpdate,
        metadata: Option<OperationMetadata>,
    ) -> Result<ObligationStatus, PortError> {
        let mut client = self.get_client(cabinet_id, id, metadata.clone()).await?;
        let status = client.fiscal_data_mut().record(year, kind, update).clone();
        client.touch();
        self.save_client(client, metadata).await?;
        Ok(status)
    }

    /// Registers a supporting document and returns its storage path
    async fn attach_document(
        &self,
        cabinet_id: CabinetId,
        id: ClientId,
        year: i32,
        kind: ObligationKind,
        file_name: &str,
        metadata: Option<OperationMetadata>,
    ) -> Result<String, PortError> {
        let path = attachment_path(id, year, kind, file_name)?;
        let mut client = self.get_client(cabinet_id, id, metadata.clone()).await?;
        client.fiscal_data_mut().attach(year, kind, path.clone());
        client.touch();
        self.save_client(client, metadata.clone()).await?;
        self.register_document(id, year, kind, &path, metadata).await?;
        Ok(path)
    }
}

impl<T: ClientPort + ?Sized> ClientPortExt for T {}

impl From<ClientError> for PortError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::ClientNotFound(id) => PortError::not_found("Client", id),
            ClientError::ValidationFailed(_)
            | ClientError::UnknownObligation(_)
            | ClientError::InvalidAttachment(_)
            | ClientError::ConfirmationRequired(_) => PortError::validation(err.to_string()),
            ClientError::InvalidTransition { .. } | ClientError::HasAssociatedTasks(_) => {
                PortError::conflict(err.to_string())
            }
            ClientError::Csv(_) | ClientError::Export(_) => PortError::internal(err.to_string()),
        }
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::HealthCheckResult;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock implementation of ClientPort
    #[derive(Debug, Default, Clone)]
    pub struct MockClientPort {
        clients: Arc<RwLock<HashMap<ClientId, Client>>>,
        tasks: Arc<RwLock<HashMap<ClientId, i64>>>,
    }

    impl MockClientPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with clients for testing
        pub async fn with_clients(clients: Vec<Client>) -> Self {
            let port = Self::new();
            for client in clients {
                port.clients.write().await.insert(client.id, client);
            }
            port
        }

        pub async fn set_task_count(&self, id: ClientId, count: i64) {
            self.tasks.write().await.insert(id, count);
        }
    }

    impl DomainPort for MockClientPort {}

    #[async_trait]
    impl HealthCheckable for MockClientPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-client-port")
        }
    }

    #[async_trait]
    impl ClientPort for MockClientPort {
        async fn get_client(
            &self,
            cabinet_id: CabinetId,
            id: ClientId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Client, PortError> {
            self.clients
                .read()
                .await
                .get(&id)
                .filter(|c| c.cabinet_id == cabinet_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Client", id))
        }

        async fn find_clients(
            &self,
            cabinet_id: CabinetId,
            query: ClientQuery,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Client>, PortError> {
            let clients = self.clients.read().await;
            let mut results: Vec<Client> = clients
                .values()
                .filter(|c| c.cabinet_id == cabinet_id && query.matches(c))
                .cloned()
                .collect();
            results.sort_by(|a, b| a.nom.cmp(&b.nom).then(a.id.cmp(&b.id)));

            let offset = query.offset.unwrap_or(0) as usize;
            let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
            Ok(results.into_iter().skip(offset).take(limit).collect())
        }

        async fn create_client(
            &self,
            client: Client,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Client, PortError> {
            let mut clients = self.clients.write().await;
            if clients.contains_key(&client.id) {
                return Err(PortError::conflict(format!("Client {} already exists", client.id)));
            }
            clients.insert(client.id, client.clone());
            Ok(client)
        }

        async fn save_client(
            &self,
            client: Client,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Client, PortError> {
            let mut clients = self.clients.write().await;
            match clients.get(&client.id) {
                Some(existing) if existing.cabinet_id == client.cabinet_id => {
                    clients.insert(client.id, client.clone());
                    Ok(client)
                }
                _ => Err(PortError::not_found("Client", client.id)),
            }
        }

        async fn purge_client(
            &self,
            cabinet_id: CabinetId,
            id: ClientId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            let mut clients = self.clients.write().await;
            match clients.get(&id) {
                Some(c) if c.cabinet_id == cabinet_id => {
                    clients.remove(&id);
                    Ok(())
                }
                _ => Err(PortError::not_found("Client", id)),
            }
        }

        async fn count_tasks(
            &self,
            _cabinet_id: CabinetId,
            id: ClientId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<i64, PortError> {
            Ok(self.tasks.read().await.get(&id).copied().unwrap_or(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockClientPort;
    use super::*;

    fn client(cabinet: CabinetId) -> Client {
        Client::new(cabinet, "Ets Nguema", ClientType::Morale, FiscalRegime::Reel)
            .with_niu("M123456789012X")
    }

    #[tokio::test]
    async fn test_register_validates() {
        let port = MockClientPort::new();
        let invalid = Client::new(CabinetId::new(), "", ClientType::Morale, FiscalRegime::Reel);
        let err = port.register_client(invalid, None).await.unwrap_err();
        assert!(matches!(err, PortError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_other_cabinet_is_not_found() {
        let cabinet = CabinetId::new();
        let c = client(cabinet);
        let port = MockClientPort::with_clients(vec![c.clone()]).await;

        assert!(port.get_client(cabinet, c.id, None).await.is_ok());
        let err = port.get_client(CabinetId::new(), c.id, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_blank_fields_clear_them() {
        let cabinet = CabinetId::new();
        let c = Client::new(cabinet, "Awa Ndiaye", ClientType::Physique, FiscalRegime::Igs)
            .with_niu("P123456789012A")
            .with_email("awa@ndiaye.cm");
        let port = MockClientPort::with_clients(vec![c.clone()]).await;

        let update = UpdateClientRequest {
            niu: Some("  ".into()),
            email: Some("".into()),
            ville: Some(" Douala ".into()),
            ..Default::default()
        };
        let saved = port.update_client(cabinet, c.id, update, None).await.unwrap();
        assert_eq!(saved.client.niu, None);
        assert_eq!(saved.client.email, None);
        assert_eq!(saved.client.ville.as_deref(), Some("Douala"));
    }

    #[tokio::test]
    async fn test_update_cannot_blank_required_niu() {
        let cabinet = CabinetId::new();
        let c = client(cabinet);
        let port = MockClientPort::with_clients(vec![c.clone()]).await;

        let update = UpdateClientRequest {
            niu: Some(String::new()),
            ..Default::default()
        };
        let err = port.update_client(cabinet, c.id, update, None).await.unwrap_err();
        assert!(matches!(err, PortError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_tasks() {
        let cabinet = CabinetId::new();
        let c = client(cabinet);
        let port = MockClientPort::with_clients(vec![c.clone()]).await;
        port.set_task_count(c.id, 3).await;

        let err = port.delete_client(cabinet, c.id, false, None).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_soft_then_permanent_delete() {
        let cabinet = CabinetId::new();
        let c = client(cabinet);
        let port = MockClientPort::with_clients(vec![c.clone()]).await;

        assert!(port.delete_client(cabinet, c.id, true, None).await.is_err());
        let deleted = port.delete_client(cabinet, c.id, false, None).await.unwrap().unwrap();
        assert_eq!(deleted.status, ClientStatus::Supprime);
        assert!(port.delete_client(cabinet, c.id, true, None).await.unwrap().is_none());
        assert!(port.get_client(cabinet, c.id, None).await.is_err());
    }

    #[tokio::test]
    async fn test_record_obligation_persists() {
        let cabinet = CabinetId::new();
        let c = client(cabinet);
        let port = MockClientPort::with_clients(vec![c.clone()]).await;

        let update = ObligationUpdate {
            assujetti: Some(true),
            payee: Some(true),
            ..Default::default()
        };
        port.record_obligation(cabinet, c.id, 2024, ObligationKind::Patente, update, None)
            .await
            .unwrap();
        let path = port
            .attach_document(cabinet, c.id, 2024, ObligationKind::Patente, "quittance.pdf", None)
            .await
            .unwrap();

        let stored = port.get_client(cabinet, c.id, None).await.unwrap();
        let status = stored
            .fiscal_data
            .as_ref()
            .and_then(|d| d.obligation(2024, ObligationKind::Patente))
            .unwrap();
        assert!(status.payee);
        assert_eq!(status.attachments, vec![path]);
    }

    #[tokio::test]
    async fn test_find_clients_search_and_paginate() {
        let cabinet = CabinetId::new();
        let a = Client::new(cabinet, "Alpha", ClientType::Physique, FiscalRegime::Igs);
        let b = Client::new(cabinet, "Beta", ClientType::Physique, FiscalRegime::Igs);
        let port = MockClientPort::with_clients(vec![b, a]).await;

        let all = port.find_clients(cabinet, ClientQuery::default(), None).await.unwrap();
        assert_eq!(all.iter().map(|c| c.nom.as_str()).collect::<Vec<_>>(), vec!["Alpha", "Beta"]);

        let query = ClientQuery { search: Some("bet".into()), ..Default::default() };
        assert_eq!(port.find_clients(cabinet, query, None).await.unwrap().len(), 1);

        let page = port.find_clients(cabinet, ClientQuery::default().paginate(1, 1), None).await.unwrap();
        assert_eq!(page[0].nom, "Beta");
    }
}
