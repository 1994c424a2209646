//! Application state shared across handlers

use std::sync::Arc;

use chrono::NaiveDate;

use core_kernel::{CabinetId, Clock, OperationMetadata, PortError, Timezone, TtlCache};
use domain_billing::{BillingPort, ReminderGateway};
use domain_client::{Client, ClientPort, ClientQuery};

use crate::config::ApiConfig;

/// Cached client listing of one cabinet
pub type ClientListCache = TtlCache<CabinetId, Arc<Vec<Client>>>;

/// Ports and collaborators behind the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub clients: Arc<dyn ClientPort>,
    pub billing: Arc<dyn BillingPort>,
    /// Absent when no notification endpoint is configured
    pub reminders: Option<Arc<dyn ReminderGateway>>,
    pub client_cache: Arc<ClientListCache>,
    pub timezone: Timezone,
}

impl AppState {
    pub fn new(config: ApiConfig, clients: Arc<dyn ClientPort>, billing: Arc<dyn BillingPort>) -> Self {
        let timezone = config.timezone().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default timezone");
            Timezone::default()
        });
        let client_cache = Arc::new(TtlCache::new(config.cache_ttl()));
        Self {
            config: Arc::new(config),
            clients,
            billing,
            reminders: None,
            client_cache,
            timezone,
        }
    }

    pub fn with_reminder_gateway(mut self, gateway: Arc<dyn ReminderGateway>) -> Self {
        self.reminders = Some(gateway);
        self
    }

    /// Replaces the cache clock, for tests that move time forward
    pub fn with_cache_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.client_cache = Arc::new(TtlCache::with_clock(self.config.cache_ttl(), clock));
        self
    }

    /// Current date in the firm's timezone
    pub fn today(&self) -> NaiveDate {
        self.timezone.today()
    }

    /// Every client of the cabinet, served from the cache while fresh
    pub async fn cabinet_clients(
        &self,
        cabinet_id: CabinetId,
        metadata: OperationMetadata,
    ) -> Result<Arc<Vec<Client>>, PortError> {
        let clients = self.clients.clone();
        self.client_cache
            .get_or_fetch(cabinet_id, move || async move {
                let listing = clients.find_clients(cabinet_id, ClientQuery::default(), Some(metadata)).await?;
                Ok::<_, PortError>(Arc::new(listing))
            })
            .await
    }

    /// Drops the cached listing after a client write
    pub async fn invalidate_clients(&self, cabinet_id: CabinetId) {
        self.client_cache.invalidate(&cabinet_id).await;
    }
}
