//! Fiscal regimes
//!
//! The regime decides which taxes a client owes. The set is closed: values
//! are checked once, when a record is deserialized, and every other module
//! works with the enum. Unknown values from older records are coerced to
//! [`FiscalRegime::Reel`] and logged, so a bad row never blocks a listing.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Fiscal regime of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalRegime {
    /// Régime du réel, subject to Patente
    Reel,
    /// Impôt Général Synthétique
    Igs,
    NonProfessionnel,
    /// Legacy "régime simplifié", kept for old records
    Simplifie,
    /// Legacy "prélèvement libératoire", kept for old records
    Liberatoire,
}

impl FiscalRegime {
    pub const ALL: [FiscalRegime; 5] = [
        FiscalRegime::Reel,
        FiscalRegime::Igs,
        FiscalRegime::NonProfessionnel,
        FiscalRegime::Simplifie,
        FiscalRegime::Liberatoire,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FiscalRegime::Reel => "reel",
            FiscalRegime::Igs => "igs",
            FiscalRegime::NonProfessionnel => "non_professionnel",
            FiscalRegime::Simplifie => "simplifie",
            FiscalRegime::Liberatoire => "liberatoire",
        }
    }

    /// Strict parse; accepts accented and upper-case spellings
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace(['é', 'è'], "e");
        match normalized.as_str() {
            "reel" => Some(FiscalRegime::Reel),
            "igs" => Some(FiscalRegime::Igs),
            "non_professionnel" | "non professionnel" => Some(FiscalRegime::NonProfessionnel),
            "simplifie" => Some(FiscalRegime::Simplifie),
            "liberatoire" => Some(FiscalRegime::Liberatoire),
            _ => None,
        }
    }

    /// Parses a stored value, falling back to `Reel` for anything unknown
    pub fn parse_lenient(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            tracing::warn!(regime = %value, "unknown fiscal regime, treating as reel");
            FiscalRegime::Reel
        })
    }

    /// Regimes that only survive on old records
    pub fn is_legacy(&self) -> bool {
        matches!(self, FiscalRegime::Simplifie | FiscalRegime::Liberatoire)
    }
}

impl Default for FiscalRegime {
    fn default() -> Self {
        FiscalRegime::Reel
    }
}

impl fmt::Display for FiscalRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FiscalRegime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(FiscalRegime::parse_lenient(&raw))
    }
}
