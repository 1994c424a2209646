//! Core Kernel - Foundational types shared by the cabinet workspace
//!
//! This crate provides the building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic (FCFA by default)
//! - Strongly typed identifiers
//! - Port error and health types for the hexagonal adapters
//! - A get-or-fetch TTL cache with an injectable clock
//! - The firm calendar (timezone-aware "today")

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;
pub mod cache;
pub mod calendar;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{
    CabinetId, UserId, CollaboratorId, ClientId, TaskId, FiscalDocumentId,
    InvoiceId, PrestationId, PaymentId,
};
pub use error::CoreError;
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth, OperationMetadata};
pub use cache::{TtlCache, Clock, SystemClock, ManualClock};
pub use calendar::Timezone;
