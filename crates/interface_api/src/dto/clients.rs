//! Client DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{CabinetId, CollaboratorId};
use domain_client::{
    Client, ClientQuery, ClientStatus, ClientType, FiscalRegime, ObligationKind, ObligationReportRow,
    ObligationStatus, ObligationUpdate, SavedClient, UpdateClientRequest as DomainUpdate,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 255))]
    pub nom: String,
    #[validate(length(max = 32))]
    pub niu: Option<String>,
    pub client_type: ClientType,
    /// Unknown values are read as `reel`
    #[serde(default)]
    pub regime_fiscal: FiscalRegime,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub telephone: Option<String>,
    pub ville: Option<String>,
    pub gestionnaire_id: Option<Uuid>,
    #[serde(default)]
    pub centre_gestion_agree: bool,
}

impl CreateClientRequest {
    pub fn into_client(self, cabinet_id: CabinetId) -> Client {
        let mut client = Client::new(cabinet_id, self.nom.trim(), self.client_type, self.regime_fiscal);
        client.niu = non_blank(self.niu);
        client.email = non_blank(self.email);
        client.telephone = non_blank(self.telephone);
        client.ville = non_blank(self.ville);
        client.gestionnaire_id = self.gestionnaire_id.map(CollaboratorId::from);
        client.centre_gestion_agree = self.centre_gestion_agree;
        client
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 255))]
    pub nom: Option<String>,
    #[validate(length(max = 32))]
    pub niu: Option<String>,
    pub client_type: Option<ClientType>,
    pub regime_fiscal: Option<FiscalRegime>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub telephone: Option<String>,
    pub ville: Option<String>,
    pub gestionnaire_id: Option<Uuid>,
    pub centre_gestion_agree: Option<bool>,
}

impl From<UpdateClientRequest> for DomainUpdate {
    fn from(request: UpdateClientRequest) -> Self {
        DomainUpdate {
            nom: request.nom.map(|n| n.trim().to_string()),
            niu: request.niu,
            client_type: request.client_type,
            regime_fiscal: request.regime_fiscal,
            email: request.email,
            telephone: request.telephone,
            ville: request.ville,
            gestionnaire_id: request.gestionnaire_id.map(CollaboratorId::from),
            centre_gestion_agree: request.centre_gestion_agree,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Query string of `GET /clients`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListClientsQuery {
    pub status: Option<ClientStatus>,
    pub regime: Option<FiscalRegime>,
    pub client_type: Option<ClientType>,
    pub search: Option<String>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListClientsQuery {
    /// True when the query asks for the whole cabinet listing
    pub fn is_unfiltered(&self) -> bool {
        self.status.is_none()
            && self.regime.is_none()
            && self.client_type.is_none()
            && self.search.as_deref().map(str::trim).unwrap_or("").is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
    }
}

impl From<ListClientsQuery> for ClientQuery {
    fn from(query: ListClientsQuery) -> Self {
        ClientQuery {
            status: query.status,
            regime: query.regime,
            client_type: query.client_type,
            search: non_blank(query.search),
            limit: query.limit,
            offset: query.offset,
        }
    }
}

/// Query string of `DELETE /clients/:id`
#[derive(Debug, Default, Deserialize)]
pub struct DeleteClientQuery {
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub permanent: bool,
}

/// A client together with non-blocking validation warnings
#[derive(Debug, Serialize)]
pub struct ClientResponse {
    #[serde(flatten)]
    pub client: Client,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<SavedClient> for ClientResponse {
    fn from(saved: SavedClient) -> Self {
        Self {
            client: saved.client,
            warnings: saved.warnings,
        }
    }
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            client,
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteClientResponse {
    pub permanent: bool,
    /// The soft-deleted record; absent after a purge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
}

/// Query string of `GET /clients/:id/obligations`
#[derive(Debug, Default, Deserialize)]
pub struct ObligationsQuery {
    /// Defaults to the current fiscal year
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ObligationsResponse {
    pub client_id: Uuid,
    pub year: i32,
    pub obligations: Vec<ObligationReportRow>,
}

/// Body of `PUT /clients/:id/obligations/:year/:kind`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ObligationRequest {
    #[serde(flatten)]
    pub update: ObligationUpdate,
    /// File name of a supporting document to attach
    #[validate(length(min = 1, max = 255))]
    pub attachment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ObligationResponse {
    pub kind: ObligationKind,
    pub year: i32,
    pub status: ObligationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<String>,
}
