//! Per-year fiscal data
//!
//! Each client carries a map from fiscal year to the state of its four
//! obligations. The blob is stored as JSON, so every field is optional on
//! read: missing booleans are `false` and unknown keys are ignored.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use core_kernel::ClientId;

use crate::error::ClientError;

/// The four obligations tracked for each year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObligationKind {
    /// Impôt Général Synthétique
    Igs,
    Patente,
    /// Déclaration Statistique et Fiscale
    Dsf,
    /// Annual declaration for natural persons
    Darp,
}

impl ObligationKind {
    pub const ALL: [ObligationKind; 4] = [
        ObligationKind::Igs,
        ObligationKind::Patente,
        ObligationKind::Dsf,
        ObligationKind::Darp,
    ];

    /// Taxes are settled by paying; declarations by filing
    pub fn is_tax(&self) -> bool {
        matches!(self, ObligationKind::Igs | ObligationKind::Patente)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObligationKind::Igs => "igs",
            ObligationKind::Patente => "patente",
            ObligationKind::Dsf => "dsf",
            ObligationKind::Darp => "darp",
        }
    }
}

impl fmt::Display for ObligationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObligationKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "igs" => Ok(ObligationKind::Igs),
            "patente" => Ok(ObligationKind::Patente),
            "dsf" => Ok(ObligationKind::Dsf),
            "darp" => Ok(ObligationKind::Darp),
            other => Err(ClientError::UnknownObligation(other.to_string())),
        }
    }
}

/// Recorded state of one obligation for one year
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationStatus {
    #[serde(default)]
    pub assujetti: bool,
    #[serde(default)]
    pub payee: bool,
    #[serde(default)]
    pub depose: bool,
    #[serde(default)]
    pub montant: Option<Decimal>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub observations: Option<String>,
}

impl ObligationStatus {
    /// Whether the settling flag for `kind` is set
    pub fn is_settled(&self, kind: ObligationKind) -> bool {
        if kind.is_tax() {
            self.payee
        } else {
            self.depose
        }
    }

    pub fn is_non_compliant(&self, kind: ObligationKind) -> bool {
        self.assujetti && !self.is_settled(kind)
    }
}

/// Partial update of an obligation entry; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationUpdate {
    pub assujetti: Option<bool>,
    pub payee: Option<bool>,
    pub depose: Option<bool>,
    pub montant: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub observations: Option<String>,
}

impl ObligationUpdate {
    fn apply(self, status: &mut ObligationStatus) {
        if let Some(v) = self.assujetti {
            status.assujetti = v;
        }
        if let Some(v) = self.payee {
            status.payee = v;
        }
        if let Some(v) = self.depose {
            status.depose = v;
        }
        if self.montant.is_some() {
            status.montant = self.montant;
        }
        if self.date.is_some() {
            status.date = self.date;
        }
        if self.observations.is_some() {
            status.observations = self.observations;
        }
    }
}

/// Obligation entries for one fiscal year
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub igs: Option<ObligationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patente: Option<ObligationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsf: Option<ObligationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub darp: Option<ObligationStatus>,
}

impl FiscalYearData {
    pub fn get(&self, kind: ObligationKind) -> Option<&ObligationStatus> {
        match kind {
            ObligationKind::Igs => self.igs.as_ref(),
            ObligationKind::Patente => self.patente.as_ref(),
            ObligationKind::Dsf => self.dsf.as_ref(),
            ObligationKind::Darp => self.darp.as_ref(),
        }
    }

    fn slot(&mut self, kind: ObligationKind) -> &mut Option<ObligationStatus> {
        match kind {
            ObligationKind::Igs => &mut self.igs,
            ObligationKind::Patente => &mut self.patente,
            ObligationKind::Dsf => &mut self.dsf,
            ObligationKind::Darp => &mut self.darp,
        }
    }

    /// Entry for `kind`, inserting a default one if absent
    pub fn entry(&mut self, kind: ObligationKind) -> &mut ObligationStatus {
        self.slot(kind).get_or_insert_with(ObligationStatus::default)
    }
}

/// Fiscal data of a client, keyed by year
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalData(BTreeMap<i32, FiscalYearData>);

impl FiscalData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn year(&self, year: i32) -> Option<&FiscalYearData> {
        self.0.get(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.keys().copied()
    }

    pub fn obligation(&self, year: i32, kind: ObligationKind) -> Option<&ObligationStatus> {
        self.year(year).and_then(|y| y.get(kind))
    }

    /// Upserts the entry for (year, kind) and returns it
    pub fn record(
        &mut self,
        year: i32,
        kind: ObligationKind,
        update: ObligationUpdate,
    ) -> &ObligationStatus {
        let status = self.0.entry(year).or_default().entry(kind);
        update.apply(status);
        status
    }

    /// Appends an attachment path to (year, kind), creating the entry if needed
    pub fn attach(&mut self, year: i32, kind: ObligationKind, path: impl Into<String>) {
        let path = path.into();
        let status = self.0.entry(year).or_default().entry(kind);
        if !status.attachments.contains(&path) {
            status.attachments.push(path);
        }
    }

    /// Builder form of [`FiscalData::record`]
    pub fn with(mut self, year: i32, kind: ObligationKind, update: ObligationUpdate) -> Self {
        self.record(year, kind, update);
        self
    }
}

/// Object-storage key for a supporting document
///
/// Layout: `fiscal_documents/{client_id}/{year}/{kind}/{file_name}`.
pub fn attachment_path(
    client_id: ClientId,
    year: i32,
    kind: ObligationKind,
    file_name: &str,
) -> Result<String, ClientError> {
    let name = file_name.trim();
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ClientError::InvalidAttachment(file_name.to_string()));
    }
    Ok(format!(
        "fiscal_documents/{}/{}/{}/{}",
        client_id.as_uuid(),
        year,
        kind,
        name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_booleans_default_false() {
        let status: ObligationStatus = serde_json::from_str(r#"{"assujetti": true}"#).unwrap();
        assert!(status.assujetti);
        assert!(!status.payee);
        assert!(!status.depose);
        assert!(status.attachments.is_empty());
    }

    #[test]
    fn test_blob_parses_with_unknown_keys() {
        let json = r#"{
            "2024": {
                "igs": {"assujetti": true, "payee": true, "montant": "75000"},
                "dsf": {"assujetti": true},
                "tva": {"assujetti": true}
            }
        }"#;
        let data: FiscalData = serde_json::from_str(json).unwrap();
        let igs = data.obligation(2024, ObligationKind::Igs).unwrap();
        assert!(igs.payee);
        assert_eq!(igs.montant, Some(dec!(75000)));
        assert!(data.obligation(2024, ObligationKind::Patente).is_none());
        assert!(data.obligation(2023, ObligationKind::Igs).is_none());
    }

    #[test]
    fn test_record_merges_fields() {
        let mut data = FiscalData::new();
        data.record(2024, ObligationKind::Dsf, ObligationUpdate {
            assujetti: Some(true),
            ..Default::default()
        });
        let status = data.record(2024, ObligationKind::Dsf, ObligationUpdate {
            depose: Some(true),
            ..Default::default()
        });
        assert!(status.assujetti);
        assert!(status.depose);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut data = FiscalData::new();
        data.attach(2024, ObligationKind::Igs, "a.pdf");
        data.attach(2024, ObligationKind::Igs, "a.pdf");
        assert_eq!(data.obligation(2024, ObligationKind::Igs).unwrap().attachments.len(), 1);
    }

    #[test]
    fn test_attachment_path_layout() {
        let id = ClientId::new();
        let path = attachment_path(id, 2024, ObligationKind::Patente, "recu.pdf").unwrap();
        assert_eq!(path, format!("fiscal_documents/{}/2024/patente/recu.pdf", id.as_uuid()));
        assert!(attachment_path(id, 2024, ObligationKind::Patente, "../x").is_err());
        assert!(attachment_path(id, 2024, ObligationKind::Patente, " ").is_err());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("DSF".parse::<ObligationKind>().unwrap(), ObligationKind::Dsf);
        assert!("tva".parse::<ObligationKind>().is_err());
    }
}
