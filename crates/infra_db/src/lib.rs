//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the cabinet workspace, built on SQLx.
//!
//! # Architecture
//!
//! - [`repositories`] own the SQL and map rows to domain types
//! - [`adapters`] implement the domain ports (`ClientPort`, `BillingPort`)
//!   on top of the repositories
//! - [`pool`] creates the connection pool and applies the embedded
//!   migrations under `migrations/`
//!
//! Payment mutations run in a single transaction: the invoice is locked,
//! the `InvoiceLedger` operation runs in memory, and the payment rows and
//! invoice status are written back together.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresBillingAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/cabinet")).await?;
//! let billing = PostgresBillingAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, DatabaseConfig, create_pool, create_pool_from_url, run_migrations, MIGRATOR};
pub use error::DatabaseError;
pub use adapters::{PostgresClientAdapter, PostgresBillingAdapter};
