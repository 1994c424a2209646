//! Client lifecycle
//!
//! ```text
//!            archive
//!   actif ─────────────▶ archive
//!     ▲  ◀───────────────   │
//!     │      restore        │ delete
//!     │ restore             ▼
//!     └──────────────── supprime ──▶ (purged)
//! ```
//!
//! Soft and permanent deletes are refused while tasks reference the client.

use crate::client::{Client, ClientStatus};
use crate::error::ClientError;

impl ClientStatus {
    /// Whether a direct move to `target` is allowed
    pub fn can_transition_to(&self, target: ClientStatus) -> bool {
        use ClientStatus::*;
        matches!(
            (self, target),
            (Actif, Archive) | (Archive, Actif) | (Actif, Supprime) | (Archive, Supprime) | (Supprime, Actif)
        )
    }
}

impl Client {
    fn transition(&mut self, target: ClientStatus) -> Result<(), ClientError> {
        if !self.status.can_transition_to(target) {
            return Err(ClientError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.touch();
        Ok(())
    }

    pub fn archive(&mut self) -> Result<(), ClientError> {
        self.transition(ClientStatus::Archive)
    }

    /// Brings an archived or soft-deleted client back to `actif`
    pub fn restore(&mut self) -> Result<(), ClientError> {
        self.transition(ClientStatus::Actif)
    }

    /// Soft delete; `task_count` is the number of tasks still attached
    pub fn soft_delete(&mut self, task_count: i64) -> Result<(), ClientError> {
        if task_count > 0 {
            return Err(ClientError::HasAssociatedTasks(task_count));
        }
        self.transition(ClientStatus::Supprime)
    }

    /// Checks that the record may be purged
    pub fn ensure_purgeable(&self, task_count: i64) -> Result<(), ClientError> {
        if self.status != ClientStatus::Supprime {
            return Err(ClientError::InvalidTransition {
                from: self.status,
                to: ClientStatus::Supprime,
            });
        }
        if task_count > 0 {
            return Err(ClientError::HasAssociatedTasks(task_count));
        }
        Ok(())
    }
}

/// Guard for destructive operations coming from the outside
pub fn require_confirmation(confirmed: bool, operation: &str) -> Result<(), ClientError> {
    if confirmed {
        Ok(())
    } else {
        Err(ClientError::ConfirmationRequired(operation.to_string()))
    }
}
