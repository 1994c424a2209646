//! Client domain errors

use thiserror::Error;

use crate::client::ClientStatus;

/// Errors that can occur in the client domain
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client with the given ID was not found
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Client failed validation
    #[error("Client validation failed: {0}")]
    ValidationFailed(String),

    /// Lifecycle transition not allowed from the current status
    #[error("Cannot move client from {from} to {to}")]
    InvalidTransition {
        from: ClientStatus,
        to: ClientStatus,
    },

    /// Deletion blocked because tasks still reference the client
    #[error("Client has {0} associated task(s)")]
    HasAssociatedTasks(i64),

    /// Destructive operation attempted without confirmation
    #[error("Confirmation required for {0}")]
    ConfirmationRequired(String),

    /// Unknown obligation kind in a path or payload
    #[error("Unknown obligation kind: {0}")]
    UnknownObligation(String),

    /// Attachment file name is not usable as a storage key
    #[error("Invalid attachment name: {0}")]
    InvalidAttachment(String),

    /// CSV export or import failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export error: {0}")]
    Export(String),
}

impl ClientError {
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        ClientError::ClientNotFound(id.to_string())
    }

    /// Creates a ValidationFailed error from validation errors
    pub fn validation_failed(errors: Vec<String>) -> Self {
        ClientError::ValidationFailed(errors.join("; "))
    }
}
