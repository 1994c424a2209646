//! Client validation rules
//!
//! # Rules
//!
//! - `nom` is required
//! - `niu` is required for legal entities (`morale`)
//! - a NIU that is not 14 alphanumeric characters is accepted with a warning
//! - an email, when present, must contain `@`
//! - legacy regimes are accepted with a warning

use crate::client::{Client, ClientType};
use crate::error::ClientError;

/// Expected length of a NIU
pub const NIU_LENGTH: usize = 14;

/// Result of client validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the client is valid
    pub is_valid: bool,
    pub errors: Vec<String>,
    /// Non-fatal issues
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Converts to a `Result`, keeping warnings on success
    pub fn into_result(self) -> Result<Vec<String>, ClientError> {
        if self.is_valid {
            Ok(self.warnings)
        } else {
            Err(ClientError::validation_failed(self.errors))
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Validator for client records
pub struct ClientValidator;

impl ClientValidator {
    pub fn validate(client: &Client) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if client.nom.trim().is_empty() {
            result.add_error("nom is required");
        }

        Self::validate_niu(client, &mut result);

        if let Some(email) = client.email.as_deref() {
            if !email.trim().is_empty() && !email.contains('@') {
                result.add_error(format!("email '{}' must contain '@'", email));
            }
        }

        if client.regime_fiscal.is_legacy() {
            result.add_warning(format!(
                "regime '{}' is a legacy regime; consider migrating the client",
                client.regime_fiscal
            ));
        }

        result
    }

    fn validate_niu(client: &Client, result: &mut ValidationResult) {
        let niu = client.niu.as_deref().map(str::trim).filter(|n| !n.is_empty());
        match niu {
            None if client.client_type == ClientType::Morale => {
                result.add_error("niu is required for legal entities");
            }
            None => {}
            Some(niu) => {
                let well_formed = niu.len() == NIU_LENGTH
                    && niu.chars().all(|c| c.is_ascii_alphanumeric());
                if !well_formed {
                    result.add_warning(format!(
                        "niu '{}' is not {} alphanumeric characters",
                        niu, NIU_LENGTH
                    ));
                }
            }
        }
    }
}
