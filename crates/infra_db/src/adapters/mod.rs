//! Domain Adapters
//!
//! PostgreSQL implementations of the domain ports. Each adapter wraps a
//! repository, converts rows to domain types and turns `DatabaseError`
//! into `PortError`.
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresBillingAdapter, PostgresClientAdapter};
//!
//! let clients = PostgresClientAdapter::new(pool.clone());
//! let billing = PostgresBillingAdapter::new(pool);
//! ```

pub mod client;
pub mod billing;

pub use client::PostgresClientAdapter;
pub use billing::PostgresBillingAdapter;
