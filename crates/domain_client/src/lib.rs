//! Client Domain
//!
//! Client records of the firm and everything that hangs off them: the
//! fiscal regime, the per-year obligation data, the rules that decide which
//! obligations a client owes and whether they are settled, validation,
//! lifecycle and CSV export.
//!
//! # Obligation rules
//!
//! ```rust
//! use chrono::NaiveDate;
//! use core_kernel::CabinetId;
//! use domain_client::{Client, ClientType, FiscalRegime, ObligationKind};
//! use domain_client::obligations::{is_non_compliant, should_be_subject};
//!
//! let client = Client::new(CabinetId::new(), "Awa Ndiaye", ClientType::Physique, FiscalRegime::Igs);
//! assert!(should_be_subject(client.client_type, client.regime_fiscal, ObligationKind::Igs));
//!
//! // Nothing recorded yet, so the obligation is flagged
//! let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! assert!(is_non_compliant(&client, ObligationKind::Igs, None, today));
//! ```

pub mod client;
pub mod regime;
pub mod fiscal;
pub mod obligations;
pub mod validation;
pub mod lifecycle;
pub mod export;
pub mod error;
pub mod ports;

pub use client::{Client, ClientType, ClientStatus};
pub use regime::FiscalRegime;
pub use fiscal::{FiscalData, FiscalYearData, ObligationKind, ObligationStatus, ObligationUpdate, attachment_path};
pub use obligations::{should_be_subject, is_non_compliant, obligation_report, ObligationReportRow};
pub use validation::{ClientValidator, ValidationResult};
pub use export::{write_clients_csv, clients_to_csv, read_clients_csv, ClientCsvRow, CLIENTS_HEADER};
pub use error::ClientError;
pub use ports::{ClientPort, ClientPortExt, ClientQuery, UpdateClientRequest, SavedClient};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockClientPort;
