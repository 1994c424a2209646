//! Test Utilities Crate
//!
//! Shared test infrastructure for the cabinet workspace.
//!
//! # Modules
//!
//! - `fixtures`: Fixed clients, dates and amounts
//! - `builders`: Builders for clients, invoices and payments
//! - `database`: PostgreSQL testcontainer with the migrations applied
//! - `assertions`: Assertion helpers for balances, summaries and port errors
//! - `generators`: Proptest strategies for domain values

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
