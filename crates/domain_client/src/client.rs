//! Client entity
//!
//! A client is a taxpayer followed by the firm: either a natural person
//! (`physique`) or a legal entity (`morale`). Every client belongs to exactly
//! one cabinet (tenant) and carries its per-year fiscal data inline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{CabinetId, ClientId, CollaboratorId};

use crate::fiscal::FiscalData;
use crate::regime::FiscalRegime;

/// Legal nature of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// Natural person
    Physique,
    /// Legal entity
    Morale,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Physique => "physique",
            ClientType::Morale => "morale",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "physique" => Some(ClientType::Physique),
            "morale" => Some(ClientType::Morale),
            _ => None,
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record status of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Actif,
    Archive,
    /// Soft-deleted; restorable until purged
    Supprime,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Actif => "actif",
            ClientStatus::Archive => "archive",
            ClientStatus::Supprime => "supprime",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "actif" => Some(ClientStatus::Actif),
            "archive" => Some(ClientStatus::Archive),
            "supprime" => Some(ClientStatus::Supprime),
            _ => None,
        }
    }
}

impl Default for ClientStatus {
    fn default() -> Self {
        ClientStatus::Actif
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client of the firm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub cabinet_id: CabinetId,
    pub nom: String,
    /// Numéro d'Identifiant Unique (taxpayer number)
    pub niu: Option<String>,
    pub client_type: ClientType,
    pub regime_fiscal: FiscalRegime,
    #[serde(default)]
    pub status: ClientStatus,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub ville: Option<String>,
    /// Collaborator in charge of the file
    pub gestionnaire_id: Option<CollaboratorId>,
    /// Member of a Centre de Gestion Agréé
    #[serde(default)]
    pub centre_gestion_agree: bool,
    pub fiscal_data: Option<FiscalData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Creates an active client with no contact details or fiscal data
    pub fn new(
        cabinet_id: CabinetId,
        nom: impl Into<String>,
        client_type: ClientType,
        regime_fiscal: FiscalRegime,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ClientId::new_v7(),
            cabinet_id,
            nom: nom.into(),
            niu: None,
            client_type,
            regime_fiscal,
            status: ClientStatus::Actif,
            email: None,
            telephone: None,
            ville: None,
            gestionnaire_id: None,
            centre_gestion_agree: false,
            fiscal_data: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_niu(mut self, niu: impl Into<String>) -> Self {
        self.niu = Some(niu.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_telephone(mut self, telephone: impl Into<String>) -> Self {
        self.telephone = Some(telephone.into());
        self
    }

    pub fn with_ville(mut self, ville: impl Into<String>) -> Self {
        self.ville = Some(ville.into());
        self
    }

    pub fn with_fiscal_data(mut self, data: FiscalData) -> Self {
        self.fiscal_data = Some(data);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ClientStatus::Actif
    }

    /// Fiscal data, created empty on first write
    pub fn fiscal_data_mut(&mut self) -> &mut FiscalData {
        self.fiscal_data.get_or_insert_with(FiscalData::default)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
