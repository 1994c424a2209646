//! Repository implementations
//!
//! Repositories own the SQL. They speak in row types and map rows to and
//! from the domain types; the adapters in [`crate::adapters`] sit on top and
//! expose the domain ports. Queries are built at runtime with
//! `sqlx::query_as` and `FromRow` rows.

pub mod clients;
pub mod billing;

pub use clients::{ClientRepository, ClientRow, ClientFilter};
pub use billing::{BillingRepository, InvoiceRow, PrestationRow, PaymentRow};
