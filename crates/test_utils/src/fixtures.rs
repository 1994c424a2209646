//! Pre-built Test Fixtures
//!
//! Ready-to-use values for the cabinet domain. Dates are fixed so that
//! overdue checks stay deterministic; pass [`DateFixtures::today`] wherever
//! an operation takes "today".

use chrono::NaiveDate;
use core_kernel::{CabinetId, Currency, Money};
use rust_decimal_macros::dec;
use uuid::Uuid;

use domain_client::{Client, ClientType, FiscalData, FiscalRegime, ObligationKind, ObligationUpdate};

/// Money amounts in FCFA
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Typical monthly bookkeeping fee
    pub fn xaf_fee() -> Money {
        Money::xaf(dec!(50000))
    }

    pub fn xaf_small() -> Money {
        Money::xaf(dec!(5000))
    }

    pub fn xaf_zero() -> Money {
        Money::zero(Currency::XAF)
    }

    /// Amount in another currency for mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }
}

/// Fixed calendar used by the fixtures
pub struct DateFixtures;

impl DateFixtures {
    /// Reference "today" (1 April 2024)
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    pub fn issued() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    /// Due date already past relative to [`Self::today`]
    pub fn past_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    /// Due date still ahead of [`Self::today`]
    pub fn future_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    pub fn fiscal_year() -> i32 {
        2024
    }
}

/// Stable identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn cabinet_id() -> CabinetId {
        CabinetId::from_uuid(Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0001))
    }

    pub fn other_cabinet_id() -> CabinetId {
        CabinetId::from_uuid(Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0002))
    }
}

/// Representative clients
pub struct ClientFixtures;

impl ClientFixtures {
    /// Natural person under IGS, with contact details
    pub fn physique_igs(cabinet_id: CabinetId) -> Client {
        Client::new(cabinet_id, "Awa Ndiaye", ClientType::Physique, FiscalRegime::Igs)
            .with_niu("P012345678901A")
            .with_email("awa.ndiaye@example.cm")
            .with_telephone("+237690112233")
            .with_ville("Douala")
    }

    /// Legal entity under the réel regime
    pub fn morale_reel(cabinet_id: CabinetId) -> Client {
        Client::new(cabinet_id, "SARL Mbarga & Fils", ClientType::Morale, FiscalRegime::Reel)
            .with_niu("M098765432109Z")
            .with_email("compta@mbarga.cm")
            .with_ville("Yaoundé")
    }

    /// Client still on a retired regime
    pub fn legacy_simplifie(cabinet_id: CabinetId) -> Client {
        Client::new(cabinet_id, "Ets Fouda", ClientType::Physique, FiscalRegime::Simplifie)
    }

    /// IGS client whose tax for the fixture year is recorded and paid
    pub fn compliant_igs(cabinet_id: CabinetId) -> Client {
        let paid = ObligationUpdate {
            assujetti: Some(true),
            payee: Some(true),
            montant: Some(dec!(75000)),
            ..Default::default()
        };
        let filed = ObligationUpdate {
            assujetti: Some(true),
            depose: Some(true),
            ..Default::default()
        };
        let year = DateFixtures::fiscal_year();
        let data = FiscalData::new()
            .with(year, ObligationKind::Igs, paid)
            .with(year, ObligationKind::Dsf, filed.clone())
            .with(year, ObligationKind::Darp, filed);
        Self::physique_igs(cabinet_id).with_fiscal_data(data)
    }
}

/// Free-text values
pub struct StringFixtures;

impl StringFixtures {
    pub fn invoice_number() -> &'static str {
        "FAC-202402-0001"
    }

    pub fn bookkeeping() -> &'static str {
        "Tenue de comptabilité"
    }

    pub fn tax_return() -> &'static str {
        "Déclaration IGS"
    }

    pub fn attachment() -> &'static str {
        "quittance.pdf"
    }
}
