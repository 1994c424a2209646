//! Outbound adapters owned by the billing domain

pub mod http_reminders;

pub use http_reminders::{HttpReminderGateway, ReminderGatewayConfig};
