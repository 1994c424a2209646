//! Obligation subjection and compliance
//!
//! Two rule sets decide what the firm has to chase for a client:
//!
//! - [`should_be_subject`] maps (client type, regime, obligation) to whether
//!   the client owes that obligation at all. It is a fixed table.
//! - [`is_non_compliant`] reads the client's fiscal data for a year and
//!   flags obligations that are owed but not paid or filed. Missing data is
//!   treated as non-compliance.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::client::{Client, ClientType};
use crate::fiscal::{ObligationKind, ObligationStatus};
use crate::regime::FiscalRegime;

/// Whether a client of this type and regime owes `kind`
///
/// | obligation | subject when                      |
/// |------------|-----------------------------------|
/// | IGS        | regime `igs`                      |
/// | Patente    | regime `reel`                     |
/// | DSF        | subject to IGS or to Patente      |
/// | DARP       | every `physique` client           |
pub fn should_be_subject(client_type: ClientType, regime: FiscalRegime, kind: ObligationKind) -> bool {
    match kind {
        ObligationKind::Igs => regime == FiscalRegime::Igs,
        ObligationKind::Patente => regime == FiscalRegime::Reel,
        ObligationKind::Dsf => {
            should_be_subject(client_type, regime, ObligationKind::Igs)
                || should_be_subject(client_type, regime, ObligationKind::Patente)
        }
        ObligationKind::Darp => client_type == ClientType::Physique,
    }
}

/// Obligations owed by a client, in display order
pub fn applicable_obligations(client_type: ClientType, regime: FiscalRegime) -> Vec<ObligationKind> {
    ObligationKind::ALL
        .into_iter()
        .filter(|kind| should_be_subject(client_type, regime, *kind))
        .collect()
}

/// Whether `client` should be chased for `kind` in `year`
///
/// `year` defaults to the calendar year of `today`.
pub fn is_non_compliant(
    client: &Client,
    kind: ObligationKind,
    year: Option<i32>,
    today: NaiveDate,
) -> bool {
    non_compliant_in_year(client, kind, year.unwrap_or_else(|| today.year()))
}

fn non_compliant_in_year(client: &Client, kind: ObligationKind, year: i32) -> bool {
    if !should_be_subject(client.client_type, client.regime_fiscal, kind) {
        return false;
    }

    match client
        .fiscal_data
        .as_ref()
        .and_then(|data| data.obligation(year, kind))
    {
        Some(status) => status.is_non_compliant(kind),
        None => true,
    }
}

/// One row of a client's obligation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationReportRow {
    pub kind: ObligationKind,
    pub subject: bool,
    /// An entry exists in the fiscal data for this year
    pub recorded: bool,
    pub non_compliant: bool,
    pub status: Option<ObligationStatus>,
}

/// Subjection and compliance of every obligation for `year`
pub fn obligation_report(client: &Client, year: i32) -> Vec<ObligationReportRow> {
    ObligationKind::ALL
        .into_iter()
        .map(|kind| {
            let status = client
                .fiscal_data
                .as_ref()
                .and_then(|data| data.obligation(year, kind))
                .cloned();
            ObligationReportRow {
                kind,
                subject: should_be_subject(client.client_type, client.regime_fiscal, kind),
                recorded: status.is_some(),
                non_compliant: non_compliant_in_year(client, kind, year),
                status,
            }
        })
        .collect()
}

/// Kinds for which `client` is non-compliant in `year`
pub fn outstanding_obligations(client: &Client, year: i32) -> Vec<ObligationKind> {
    obligation_report(client, year)
        .into_iter()
        .filter(|row| row.non_compliant)
        .map(|row| row.kind)
        .collect()
}
