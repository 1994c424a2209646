//! CSV export of the client list
//!
//! Column order is fixed so that spreadsheets built on top of the export
//! keep working. [`read_clients_csv`] parses the same format back.

use serde::{Deserialize, Serialize};

use crate::client::{Client, ClientStatus, ClientType};
use crate::error::ClientError;
use crate::regime::FiscalRegime;

/// Header of the client export
pub const CLIENTS_HEADER: [&str; 8] = [
    "Nom", "NIU", "Type", "Regime", "Statut", "Email", "Telephone", "Ville",
];

/// One parsed line of a client export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCsvRow {
    pub nom: String,
    pub niu: Option<String>,
    pub client_type: ClientType,
    pub regime_fiscal: FiscalRegime,
    pub status: ClientStatus,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub ville: Option<String>,
}

impl From<&Client> for ClientCsvRow {
    fn from(client: &Client) -> Self {
        Self {
            nom: client.nom.clone(),
            niu: client.niu.clone(),
            client_type: client.client_type,
            regime_fiscal: client.regime_fiscal,
            status: client.status,
            email: client.email.clone(),
            telephone: client.telephone.clone(),
            ville: client.ville.clone(),
        }
    }
}

/// Writes `clients` in input order
pub fn write_clients_csv(clients: &[Client], writer: impl std::io::Write) -> Result<(), ClientError> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(CLIENTS_HEADER)?;
    for client in clients {
        csv.write_record([
            client.nom.as_str(),
            client.niu.as_deref().unwrap_or(""),
            client.client_type.as_str(),
            client.regime_fiscal.as_str(),
            client.status.as_str(),
            client.email.as_deref().unwrap_or(""),
            client.telephone.as_deref().unwrap_or(""),
            client.ville.as_deref().unwrap_or(""),
        ])?;
    }
    csv.flush().map_err(|e| ClientError::Export(format!("CSV flush error: {e}")))?;
    Ok(())
}

/// Renders the export to a UTF-8 string
pub fn clients_to_csv(clients: &[Client]) -> Result<String, ClientError> {
    let mut buf = Vec::new();
    write_clients_csv(clients, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ClientError::Export(e.to_string()))
}

/// Parses the format produced by [`write_clients_csv`]
pub fn read_clients_csv(reader: impl std::io::Read) -> Result<Vec<ClientCsvRow>, ClientError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    if headers.iter().collect::<Vec<_>>() != CLIENTS_HEADER {
        return Err(ClientError::Export(format!(
            "unexpected header: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut rows = Vec::new();
    for (i, result) in csv.records().enumerate() {
        let record = result?;
        let line = i + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("").to_string();
        let optional = |idx: usize| {
            let value = field(idx);
            if value.is_empty() { None } else { Some(value) }
        };

        let client_type = ClientType::parse(&field(2))
            .ok_or_else(|| ClientError::Export(format!("line {line}: invalid type '{}'", field(2))))?;
        let status = ClientStatus::parse(&field(4))
            .ok_or_else(|| ClientError::Export(format!("line {line}: invalid status '{}'", field(4))))?;

        rows.push(ClientCsvRow {
            nom: field(0),
            niu: optional(1),
            client_type,
            regime_fiscal: FiscalRegime::parse_lenient(&field(3)),
            status,
            email: optional(5),
            telephone: optional(6),
            ville: optional(7),
        });
    }
    Ok(rows)
}
