//! Tests for domain_client

use chrono::NaiveDate;
use proptest::prelude::*;

use core_kernel::CabinetId;
use domain_client::{
    clients_to_csv, is_non_compliant, read_clients_csv, should_be_subject, Client, ClientStatus,
    ClientType, FiscalData, FiscalRegime, ObligationKind, ObligationUpdate,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 20).unwrap()
}

// ============================================================================
// Subjection table
// ============================================================================

mod subjection_tests {
    use super::*;

    fn client_type() -> impl Strategy<Value = ClientType> {
        prop_oneof![Just(ClientType::Physique), Just(ClientType::Morale)]
    }

    fn regime() -> impl Strategy<Value = FiscalRegime> {
        prop::sample::select(FiscalRegime::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn igs_regime_owes_igs_not_patente(t in client_type()) {
            prop_assert!(should_be_subject(t, FiscalRegime::Igs, ObligationKind::Igs));
            prop_assert!(!should_be_subject(t, FiscalRegime::Igs, ObligationKind::Patente));
        }

        #[test]
        fn igs_or_patente_implies_dsf(t in client_type(), r in regime()) {
            let owes_tax = should_be_subject(t, r, ObligationKind::Igs)
                || should_be_subject(t, r, ObligationKind::Patente);
            prop_assert_eq!(should_be_subject(t, r, ObligationKind::Dsf), owes_tax);
        }

        #[test]
        fn physique_always_owes_darp(r in regime()) {
            prop_assert!(should_be_subject(ClientType::Physique, r, ObligationKind::Darp));
            prop_assert!(!should_be_subject(ClientType::Morale, r, ObligationKind::Darp));
        }

        #[test]
        fn not_subject_is_never_non_compliant(t in client_type(), r in regime(), year in 2000i32..2100) {
            let client = Client::new(CabinetId::new(), "X", t, r);
            for kind in ObligationKind::ALL {
                if !should_be_subject(t, r, kind) {
                    prop_assert!(!is_non_compliant(&client, kind, Some(year), today()));
                }
            }
        }
    }
}

// ============================================================================
// Compliance checker
// ============================================================================

mod compliance_tests {
    use super::*;

    fn igs_client(data: Option<FiscalData>) -> Client {
        let client = Client::new(CabinetId::new(), "Boutique Ama", ClientType::Physique, FiscalRegime::Igs);
        match data {
            Some(d) => client.with_fiscal_data(d),
            None => client,
        }
    }

    #[test]
    fn test_assujetti_unpaid_is_non_compliant() {
        let data = FiscalData::new().with(2024, ObligationKind::Igs, ObligationUpdate {
            assujetti: Some(true),
            payee: Some(false),
            ..Default::default()
        });
        assert!(is_non_compliant(&igs_client(Some(data)), ObligationKind::Igs, Some(2024), today()));
    }

    #[test]
    fn test_paid_is_compliant() {
        let data = FiscalData::new().with(2024, ObligationKind::Igs, ObligationUpdate {
            assujetti: Some(true),
            payee: Some(true),
            ..Default::default()
        });
        assert!(!is_non_compliant(&igs_client(Some(data)), ObligationKind::Igs, Some(2024), today()));
    }

    #[test]
    fn test_no_entry_but_subject_is_non_compliant() {
        let client = igs_client(None);
        assert!(is_non_compliant(&client, ObligationKind::Igs, None, today()));
        assert!(is_non_compliant(&client, ObligationKind::Dsf, None, today()));
        assert!(is_non_compliant(&client, ObligationKind::Darp, None, today()));
        assert!(!is_non_compliant(&client, ObligationKind::Patente, None, today()));
    }

    #[test]
    fn test_blob_from_storage() {
        let json = r#"{"2024": {"dsf": {"assujetti": true, "depose": true, "date": "2024-03-15"}}}"#;
        let data: FiscalData = serde_json::from_str(json).unwrap();
        let client = igs_client(Some(data));
        assert!(!is_non_compliant(&client, ObligationKind::Dsf, None, today()));
    }
}

// ============================================================================
// CSV export
// ============================================================================

mod export_tests {
    use super::*;

    fn regime() -> impl Strategy<Value = FiscalRegime> {
        prop::sample::select(FiscalRegime::ALL.to_vec())
    }

    fn client_strategy() -> impl Strategy<Value = Client> {
        (
            "[A-Za-z][A-Za-z ,.'\"-]{0,30}",
            proptest::option::of("[A-Z0-9]{14}"),
            regime(),
        )
            .prop_map(|(nom, niu, regime)| {
                let mut client = Client::new(CabinetId::new(), nom, ClientType::Morale, regime);
                client.niu = niu;
                client
            })
    }

    proptest! {
        #[test]
        fn csv_roundtrip_preserves_identity(clients in prop::collection::vec(client_strategy(), 0..20)) {
            let csv = clients_to_csv(&clients).unwrap();
            let rows = read_clients_csv(csv.as_bytes()).unwrap();

            let expected: Vec<_> = clients
                .iter()
                .map(|c| (c.nom.clone(), c.niu.clone(), c.regime_fiscal))
                .collect();
            let actual: Vec<_> = rows
                .into_iter()
                .map(|r| (r.nom, r.niu, r.regime_fiscal))
                .collect();
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_status_column() {
        let mut client = Client::new(CabinetId::new(), "Archivé SA", ClientType::Morale, FiscalRegime::Reel);
        client.archive().unwrap();
        let rows = read_clients_csv(clients_to_csv(&[client]).unwrap().as_bytes()).unwrap();
        assert_eq!(rows[0].status, ClientStatus::Archive);
        assert_eq!(rows[0].nom, "Archivé SA");
    }
}
