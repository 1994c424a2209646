//! HTTP reminder gateway
//!
//! Posts each reminder as JSON to the notification function of the firm
//! (email and SMS delivery live behind it). The API key is sent as a bearer
//! token. Retries are not attempted; a failed send is reported to the
//! caller, which downgrades it to a notification.

use async_trait::async_trait;
use serde::Serialize;
use std::time::{Duration, Instant};

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, Money, PortError};

use crate::ports::ReminderGateway;
use crate::reminders::{Reminder, ReminderChannel};

/// Configuration for the notification endpoint
#[derive(Debug, Clone)]
pub struct ReminderGatewayConfig {
    /// Full URL of the notification function
    pub endpoint: String,
    pub api_key: String,
    /// Request timeout in seconds (default: 10)
    pub timeout_secs: u64,
}

impl ReminderGatewayConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout_secs: 10,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Body posted to the notification function
#[derive(Debug, Serialize)]
struct ReminderPayload<'a> {
    channel: ReminderChannel,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
    client_id: String,
    total_due: String,
}

impl<'a> From<&'a Reminder> for ReminderPayload<'a> {
    fn from(reminder: &'a Reminder) -> Self {
        Self {
            channel: reminder.channel,
            to: &reminder.recipient,
            subject: &reminder.subject,
            body: &reminder.body,
            client_id: reminder.client_id.as_uuid().to_string(),
            total_due: reminder
                .totals_due
                .iter()
                .map(Money::to_string)
                .collect::<Vec<_>>()
                .join(" + "),
        }
    }
}

/// `ReminderGateway` backed by an HTTP notification endpoint
#[derive(Debug, Clone)]
pub struct HttpReminderGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_ms: u64,
}

impl HttpReminderGateway {
    pub fn new(config: ReminderGatewayConfig) -> Result<Self, PortError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PortError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            timeout_ms: config.timeout_secs * 1000,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> PortError {
        if err.is_timeout() {
            PortError::Timeout {
                operation: "send_reminder".to_string(),
                duration_ms: self.timeout_ms,
            }
        } else {
            PortError::Connection {
                message: format!("notification endpoint unreachable: {err}"),
                source: Some(Box::new(err)),
            }
        }
    }
}

impl DomainPort for HttpReminderGateway {}

#[async_trait]
impl HealthCheckable for HttpReminderGateway {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let (status, message) = match self.client.head(&self.endpoint).send().await {
            Ok(resp) if !resp.status().is_server_error() => (AdapterHealth::Healthy, None),
            Ok(resp) => (AdapterHealth::Degraded, Some(format!("HTTP {}", resp.status()))),
            Err(e) => (AdapterHealth::Unhealthy, Some(e.to_string())),
        };
        HealthCheckResult {
            adapter_id: "http-reminder-gateway".to_string(),
            status,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
            checked_at: chrono::Utc::now(),
        }
    }
}

#[async_trait]
impl ReminderGateway for HttpReminderGateway {
    #[tracing::instrument(skip(self, reminder), fields(client_id = %reminder.client_id, channel = %reminder.channel))]
    async fn send_reminder(&self, reminder: &Reminder) -> Result<(), PortError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ReminderPayload::from(reminder))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(%status, body = %body, "notification endpoint rejected reminder");
        Err(match status.as_u16() {
            401 | 403 => PortError::Unauthorized {
                message: format!("notification endpoint refused the API key (HTTP {status})"),
            },
            400 | 422 => PortError::validation(format!("notification rejected: {body}")),
            _ if status.is_server_error() => PortError::ServiceUnavailable {
                service: format!("notifications (HTTP {status})"),
            },
            _ => PortError::internal(format!("unexpected HTTP {status} from notification endpoint")),
        })
    }
}
