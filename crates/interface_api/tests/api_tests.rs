//! HTTP-level tests for interface_api, run against the in-memory ports

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Duration, NaiveDate};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use core_kernel::{CabinetId, Money, Timezone};
use domain_billing::{
    BillingPort, CreditOutcome, Invoice, InvoiceStatus, MockBillingPort, MockReminderGateway, NotificationLevel,
    Payment, PaymentMethod, PaymentOutcome,
};
use domain_client::{read_clients_csv, Client, ClientPort, ClientType, FiscalRegime, MockClientPort};
use interface_api::auth::{create_token, permissions, roles};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};

const SECRET: &str = "api-test-secret";

struct TestApp {
    server: TestServer,
    clients: MockClientPort,
    billing: MockBillingPort,
    reminders: MockReminderGateway,
    cabinet: CabinetId,
    token: String,
}

fn today() -> NaiveDate {
    Timezone::default().today()
}

fn config() -> ApiConfig {
    ApiConfig {
        jwt_secret: SECRET.to_string(),
        ..Default::default()
    }
}

fn token_for(cabinet: CabinetId, roles: &[&str]) -> String {
    let roles = roles.iter().map(|r| r.to_string()).collect();
    create_token("user-test", cabinet, roles, SECRET, 600).unwrap()
}

async fn app_with(clients: Vec<Client>, invoices: Vec<Invoice>, payments: Vec<Payment>, cabinet: CabinetId) -> TestApp {
    let client_port = MockClientPort::with_clients(clients).await;
    let billing = MockBillingPort::with_records(invoices, payments).await;
    let reminders = MockReminderGateway::new();

    let state = AppState::new(config(), Arc::new(client_port.clone()), Arc::new(billing.clone()))
        .with_reminder_gateway(Arc::new(reminders.clone()));
    let server = TestServer::new(create_router(state)).unwrap();

    TestApp {
        server,
        clients: client_port,
        billing,
        reminders,
        cabinet,
        token: token_for(cabinet, &[roles::ADMIN]),
    }
}

async fn empty_app() -> TestApp {
    app_with(vec![], vec![], vec![], CabinetId::new()).await
}

fn physique_igs(cabinet: CabinetId) -> Client {
    Client::new(cabinet, "Awa Ndiaye", ClientType::Physique, FiscalRegime::Igs)
        .with_email("awa@example.cm")
        .with_telephone("+237690000000")
}

fn overdue_invoice(client: &Client, montant: rust_decimal::Decimal) -> Invoice {
    let due = today() - Duration::days(1);
    Invoice::new(client.id, due - Duration::days(30), due, Money::xaf(montant))
}

// ============================================================================
// Health and authentication
// ============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let app = empty_app().await;
        let response = app.server.get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readiness_reports_components() {
        let app = empty_app().await;
        let response = app.server.get("/health/ready").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["components"].as_array().unwrap().len(), 2);
    }
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = empty_app().await;
        app.server.get("/api/v1/clients").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_foreign_signature_is_unauthorized() {
        let app = empty_app().await;
        let forged = create_token("intruder", app.cabinet, vec![roles::ADMIN.into()], "other-secret", 600).unwrap();
        app.server
            .get("/api/v1/clients")
            .authorization_bearer(forged)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed_or_generated() {
        let app = empty_app().await;

        let response = app
            .server
            .get("/api/v1/clients")
            .authorization_bearer(&app.token)
            .add_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("req-abc"),
            )
            .await;
        response.assert_status_ok();
        assert_eq!(response.header("x-request-id"), "req-abc");

        let generated = app.server.get("/health").await.header("x-request-id");
        assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_reader_cannot_write() {
        let app = empty_app().await;
        let reader = token_for(app.cabinet, &[permissions::CLIENT_READ]);

        app.server
            .get("/api/v1/clients")
            .authorization_bearer(&reader)
            .await
            .assert_status_ok();
        app.server
            .post("/api/v1/clients")
            .authorization_bearer(&reader)
            .json(&json!({"nom": "Ets Fotso", "client_type": "physique"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}

// ============================================================================
// Clients
// ============================================================================

mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_list() {
        let app = empty_app().await;

        let response = app
            .server
            .post("/api/v1/clients")
            .authorization_bearer(&app.token)
            .json(&json!({
                "nom": "Boulangerie Mbida",
                "client_type": "morale",
                "niu": "M012345678901A",
                "regime_fiscal": "reel",
                "ville": "Yaoundé"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        assert_eq!(created["status"], "actif");

        let listed: Vec<Client> = app
            .server
            .get("/api/v1/clients")
            .authorization_bearer(&app.token)
            .await
            .json();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].nom, "Boulangerie Mbida");
        assert_eq!(listed[0].cabinet_id, app.cabinet);
    }

    #[tokio::test]
    async fn test_cached_listing_sees_new_clients() {
        let app = empty_app().await;
        let list = || app.server.get("/api/v1/clients").authorization_bearer(&app.token);

        assert_eq!(list().await.json::<Vec<Client>>().len(), 0);
        app.server
            .post("/api/v1/clients")
            .authorization_bearer(&app.token)
            .json(&json!({"nom": "Kamga", "client_type": "physique", "regime_fiscal": "igs"}))
            .await
            .assert_status(StatusCode::CREATED);
        assert_eq!(list().await.json::<Vec<Client>>().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_client_is_rejected() {
        let app = empty_app().await;

        app.server
            .post("/api/v1/clients")
            .authorization_bearer(&app.token)
            .json(&json!({"nom": "", "client_type": "physique"}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        // A legal entity needs a NIU
        app.server
            .post("/api/v1/clients")
            .authorization_bearer(&app.token)
            .json(&json!({"nom": "SARL Tchinda", "client_type": "morale"}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_legacy_regime_is_a_warning() {
        let app = empty_app().await;
        let response = app
            .server
            .post("/api/v1/clients")
            .authorization_bearer(&app.token)
            .json(&json!({"nom": "Ngo Bassa", "client_type": "physique", "regime_fiscal": "simplifie"}))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        assert_eq!(body["regime_fiscal"], "simplifie");
        assert!(!body["warnings"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_cabinet_is_not_found() {
        let other = physique_igs(CabinetId::new());
        let app = app_with(vec![other.clone()], vec![], vec![], CabinetId::new()).await;

        app.server
            .get(&format!("/api/v1/clients/{}", other.id.as_uuid()))
            .authorization_bearer(&app.token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_client() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        let response = app
            .server
            .put(&format!("/api/v1/clients/{}", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"ville": "Douala", "regime_fiscal": "reel"}))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["ville"], "Douala");
        assert_eq!(body["regime_fiscal"], "reel");
    }

    #[tokio::test]
    async fn test_blank_update_clears_field_and_survives_export() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet).with_niu("P123456789012A");
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        let response = app
            .server
            .put(&format!("/api/v1/clients/{}", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"niu": "", "ville": "  "}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["niu"].is_null());
        assert!(body["ville"].is_null());

        let stored = app.clients.get_client(cabinet, client.id, None).await.unwrap();
        assert_eq!(stored.niu, None);

        let csv = app
            .server
            .get("/api/v1/exports/clients.csv")
            .authorization_bearer(&app.token)
            .await
            .text();
        let rows = read_clients_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            (rows[0].nom.as_str(), rows[0].niu.as_deref(), rows[0].regime_fiscal),
            (stored.nom.as_str(), stored.niu.as_deref(), stored.regime_fiscal)
        );
    }

    #[tokio::test]
    async fn test_archive_and_restore() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;
        let base = format!("/api/v1/clients/{}", client.id.as_uuid());

        let archived: Value = app
            .server
            .post(&format!("{base}/archive"))
            .authorization_bearer(&app.token)
            .await
            .json();
        assert_eq!(archived["status"], "archive");

        // Archiving twice is not a valid transition
        app.server
            .post(&format!("{base}/archive"))
            .authorization_bearer(&app.token)
            .await
            .assert_status(StatusCode::CONFLICT);

        let restored: Value = app
            .server
            .post(&format!("{base}/restore"))
            .authorization_bearer(&app.token)
            .await
            .json();
        assert_eq!(restored["status"], "actif");
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        app.server
            .delete(&format!("/api/v1/clients/{}", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_tasks() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;
        app.clients.set_task_count(client.id, 2).await;

        app.server
            .delete(&format!("/api/v1/clients/{}", client.id.as_uuid()))
            .add_query_param("confirm", "true")
            .authorization_bearer(&app.token)
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_soft_then_permanent_delete() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;
        let path = format!("/api/v1/clients/{}", client.id.as_uuid());

        // Only a deleted client can be purged
        app.server
            .delete(&path)
            .add_query_param("confirm", "true")
            .add_query_param("permanent", "true")
            .authorization_bearer(&app.token)
            .await
            .assert_status(StatusCode::CONFLICT);

        let soft: Value = app
            .server
            .delete(&path)
            .add_query_param("confirm", "true")
            .authorization_bearer(&app.token)
            .await
            .json();
        assert_eq!(soft["client"]["status"], "supprime");

        let purged: Value = app
            .server
            .delete(&path)
            .add_query_param("confirm", "true")
            .add_query_param("permanent", "true")
            .authorization_bearer(&app.token)
            .await
            .json();
        assert_eq!(purged["permanent"], true);
        app.server
            .get(&path)
            .authorization_bearer(&app.token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Obligations
// ============================================================================

mod obligation_tests {
    use super::*;

    #[tokio::test]
    async fn test_report_flags_missing_entries() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        let body: Value = app
            .server
            .get(&format!("/api/v1/clients/{}/obligations", client.id.as_uuid()))
            .add_query_param("year", "2024")
            .authorization_bearer(&app.token)
            .await
            .json();

        assert_eq!(body["year"], 2024);
        let rows = body["obligations"].as_array().unwrap();
        let row = |kind: &str| rows.iter().find(|r| r["kind"] == kind).unwrap().clone();
        assert_eq!(row("igs")["subject"], true);
        assert_eq!(row("igs")["non_compliant"], true);
        assert_eq!(row("patente")["subject"], false);
        assert_eq!(row("dsf")["non_compliant"], true);
    }

    #[tokio::test]
    async fn test_record_and_attach() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        let response = app
            .server
            .put(&format!("/api/v1/clients/{}/obligations/2024/igs", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"assujetti": true, "payee": true, "attachment": "quittance igs.pdf"}))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"]["payee"], true);
        let path = body["attachment_path"].as_str().unwrap();
        assert!(path.contains("2024"));
        assert!(path.contains("igs"));

        let report: Value = app
            .server
            .get(&format!("/api/v1/clients/{}/obligations", client.id.as_uuid()))
            .add_query_param("year", "2024")
            .authorization_bearer(&app.token)
            .await
            .json();
        let igs = report["obligations"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["kind"] == "igs")
            .unwrap()
            .clone();
        assert_eq!(igs["non_compliant"], false);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_rejected() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        app.server
            .put(&format!("/api/v1/clients/{}/obligations/2024/tva", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"assujetti": true}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}

// ============================================================================
// Invoices, payments and credits
// ============================================================================

mod billing_tests {
    use super::*;

    async fn create_invoice(app: &TestApp, client: &Client) -> Value {
        let response = app
            .server
            .post("/api/v1/invoices")
            .authorization_bearer(&app.token)
            .json(&json!({
                "client_id": client.id.as_uuid(),
                "date_echeance": (today() + Duration::days(30)).to_string(),
                "prestations": [
                    {"description": "Tenue comptable", "montant": "6000"},
                    {"description": "Déclaration IGS", "montant": "4000"}
                ]
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        let invoice = create_invoice(&app, &client).await;
        assert_eq!(invoice["status"], "en_attente");
        let invoice_id = invoice["id"].as_str().unwrap().to_string();

        let partial: PaymentOutcome = app
            .server
            .post(&format!("/api/v1/invoices/{invoice_id}/payments"))
            .authorization_bearer(&app.token)
            .json(&json!({"montant": 4000, "methode": "mobile_money"}))
            .await
            .json();
        assert_eq!(partial.balance.status, InvoiceStatus::PartiellementPayee);
        assert_eq!(partial.balance.montant_restant, Money::xaf(dec!(6000)));

        let full: PaymentOutcome = app
            .server
            .post(&format!("/api/v1/invoices/{invoice_id}/payments"))
            .authorization_bearer(&app.token)
            .json(&json!({"montant": 6000, "methode": "especes"}))
            .await
            .json();
        assert_eq!(full.balance.status, InvoiceStatus::Payee);
        assert!(full.balance.montant_restant.is_zero());

        // Invoices with payments cannot be cancelled
        app.server
            .post(&format!("/api/v1/invoices/{invoice_id}/cancel"))
            .authorization_bearer(&app.token)
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_line_item_payment_and_delete() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        let invoice = create_invoice(&app, &client).await;
        let invoice_id = invoice["id"].as_str().unwrap().to_string();
        let item = invoice["prestations"][1]["id"].as_str().unwrap().to_string();

        let outcome: PaymentOutcome = app
            .server
            .post(&format!("/api/v1/invoices/{invoice_id}/payments"))
            .authorization_bearer(&app.token)
            .json(&json!({"prestation_ids": [item], "methode": "virement"}))
            .await
            .json();
        assert_eq!(outcome.payment.montant, Money::xaf(dec!(4000)));

        let deleted: Value = app
            .server
            .delete(&format!("/api/v1/payments/{}", outcome.payment.id.as_uuid()))
            .authorization_bearer(&app.token)
            .await
            .json();
        assert_eq!(deleted["balance"]["status"], "en_attente");

        let reloaded: Value = app
            .server
            .get(&format!("/api/v1/invoices/{invoice_id}"))
            .authorization_bearer(&app.token)
            .await
            .json();
        assert_eq!(reloaded["prestations"][1]["payee"], false);
    }

    #[tokio::test]
    async fn test_update_payment_recomputes_status() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        let invoice = create_invoice(&app, &client).await;
        let invoice_id = invoice["id"].as_str().unwrap().to_string();
        let outcome: PaymentOutcome = app
            .server
            .post(&format!("/api/v1/invoices/{invoice_id}/payments"))
            .authorization_bearer(&app.token)
            .json(&json!({"montant": 10000, "methode": "cheque"}))
            .await
            .json();
        assert_eq!(outcome.balance.status, InvoiceStatus::Payee);

        let updated: PaymentOutcome = app
            .server
            .put(&format!("/api/v1/payments/{}", outcome.payment.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"montant": 2500}))
            .await
            .json();
        assert_eq!(updated.balance.status, InvoiceStatus::PartiellementPayee);
        assert_eq!(updated.balance.montant_restant, Money::xaf(dec!(7500)));
    }

    #[tokio::test]
    async fn test_cancel_unpaid_invoice() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        let invoice = create_invoice(&app, &client).await;
        let invoice_id = invoice["id"].as_str().unwrap().to_string();

        let cancelled: Value = app
            .server
            .post(&format!("/api/v1/invoices/{invoice_id}/cancel"))
            .authorization_bearer(&app.token)
            .await
            .json();
        assert_eq!(cancelled["status"], "annulée");

        app.server
            .post(&format!("/api/v1/invoices/{invoice_id}/payments"))
            .authorization_bearer(&app.token)
            .json(&json!({"montant": 1000, "methode": "especes"}))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_invoice_for_foreign_client_is_refused() {
        let foreign = physique_igs(CabinetId::new());
        let app = app_with(vec![foreign.clone()], vec![], vec![], CabinetId::new()).await;

        app.server
            .post("/api/v1/invoices")
            .authorization_bearer(&app.token)
            .json(&json!({
                "client_id": foreign.id.as_uuid(),
                "date_echeance": today().to_string(),
                "montant": 5000
            }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_foreign_invoice_is_hidden() {
        let foreign = physique_igs(CabinetId::new());
        let invoice = overdue_invoice(&foreign, dec!(5000));
        let app = app_with(vec![foreign], vec![invoice.clone()], vec![], CabinetId::new()).await;

        app.server
            .get(&format!("/api/v1/invoices/{}", invoice.id.as_uuid()))
            .authorization_bearer(&app.token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_credit_applied_whole() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let invoice = overdue_invoice(&client, dec!(25000));
        let app = app_with(vec![client.clone()], vec![invoice.clone()], vec![], cabinet).await;

        let response = app
            .server
            .post(&format!("/api/v1/clients/{}/credits", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"montant": 10000, "methode": "virement"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let credit: Payment = response.json();
        assert!(credit.is_credit());

        let outcome: CreditOutcome = app
            .server
            .post(&format!("/api/v1/credits/{}/apply", credit.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"facture_id": invoice.id.as_uuid()}))
            .await
            .json();
        assert_eq!(outcome.plan.applied(), Money::xaf(dec!(10000)));
        assert_eq!(outcome.credit.facture_id, Some(invoice.id));
        assert_eq!(outcome.balance.montant_restant, Money::xaf(dec!(15000)));

        app.server
            .post(&format!("/api/v1/credits/{}/apply", credit.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"facture_id": invoice.id.as_uuid()}))
            .await
            .assert_status(StatusCode::CONFLICT);

        let stored = app.billing.list_payments(client.id, None).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_credit_split_across_invoice() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let invoice = overdue_invoice(&client, dec!(3000));
        let app = app_with(vec![client.clone()], vec![invoice.clone()], vec![], cabinet).await;

        let credit: Payment = app
            .server
            .post(&format!("/api/v1/clients/{}/credits", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"montant": 10000, "methode": "especes"}))
            .await
            .json();

        let outcome: CreditOutcome = app
            .server
            .post(&format!("/api/v1/credits/{}/apply", credit.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"facture_id": invoice.id.as_uuid()}))
            .await
            .json();

        assert_eq!(outcome.balance.status, InvoiceStatus::Payee);
        assert_eq!(outcome.credit.montant, Money::xaf(dec!(7000)));
        assert!(outcome.credit.is_credit());
        assert_eq!(outcome.payment.unwrap().montant, Money::xaf(dec!(3000)));
    }
}

// ============================================================================
// Reports, export and reminders
// ============================================================================

mod report_tests {
    use super::*;

    #[tokio::test]
    async fn test_overdue_client_is_en_retard() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let invoice = overdue_invoice(&client, dec!(50000));
        let app = app_with(vec![client.clone()], vec![invoice], vec![], cabinet).await;

        let body: Value = app
            .server
            .get("/api/v1/reports/summary")
            .authorization_bearer(&app.token)
            .await
            .json();

        assert_eq!(body["currency"], "XAF");
        let rows = body["clients"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "en_retard");
        assert_eq!(rows[0]["reason"], "overdue");
        assert_eq!(rows[0]["overdue_invoices"], 1);
    }

    #[tokio::test]
    async fn test_paid_client_is_a_jour() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let invoice = overdue_invoice(&client, dec!(50000));
        let payment = Payment::new(client.id, invoice.id, Money::xaf(dec!(50000)), PaymentMethod::Especes, today())
            .unwrap();
        let app = app_with(vec![client], vec![invoice], vec![payment], cabinet).await;

        let body: Value = app
            .server
            .get("/api/v1/reports/summary")
            .authorization_bearer(&app.token)
            .await
            .json();
        assert_eq!(body["clients"][0]["status"], "à_jour");
    }

    #[tokio::test]
    async fn test_csv_export() {
        let cabinet = CabinetId::new();
        let clients = vec![
            physique_igs(cabinet).with_niu("P123456789012A"),
            Client::new(cabinet, "Brasserie Etoa", ClientType::Morale, FiscalRegime::Reel),
        ];
        let app = app_with(clients, vec![], vec![], cabinet).await;

        let response = app
            .server
            .get("/api/v1/exports/clients.csv")
            .authorization_bearer(&app.token)
            .await;
        response.assert_status_ok();
        assert!(response
            .header("content-type")
            .to_str()
            .unwrap()
            .starts_with("text/csv"));

        let text = response.text();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Nom,NIU,Type,Regime,Statut,Email,Telephone,Ville"));
        assert!(lines.next().unwrap().starts_with("Awa Ndiaye,P123456789012A"));
        assert!(lines.next().unwrap().starts_with("Brasserie Etoa"));
    }
}

mod reminder_tests {
    use super::*;

    #[tokio::test]
    async fn test_reminder_is_sent() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let invoice = overdue_invoice(&client, dec!(50000));
        let app = app_with(vec![client.clone()], vec![invoice], vec![], cabinet).await;

        let response = app
            .server
            .post(&format!("/api/v1/clients/{}/reminders", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"channel": "email"}))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["notification"]["level"], "info");
        assert_eq!(body["reminder"]["recipient"], "awa@example.cm");
        assert_eq!(app.reminders.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_a_warning() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let invoice = overdue_invoice(&client, dec!(50000));
        let app = app_with(vec![client.clone()], vec![invoice], vec![], cabinet).await;
        app.reminders.fail_with("smtp relay down").await;

        let response = app
            .server
            .post(&format!("/api/v1/clients/{}/reminders", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"channel": "sms", "locale": "en"}))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["notification"]["level"], serde_json::to_value(NotificationLevel::Warning).unwrap());
        assert!(app.reminders.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_overdue() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let app = app_with(vec![client.clone()], vec![], vec![], cabinet).await;

        app.server
            .post(&format!("/api/v1/clients/{}/reminders", client.id.as_uuid()))
            .authorization_bearer(&app.token)
            .json(&json!({"channel": "email"}))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_disabled_gateway() {
        let cabinet = CabinetId::new();
        let client = physique_igs(cabinet);
        let invoice = overdue_invoice(&client, dec!(50000));
        let state = AppState::new(
            config(),
            Arc::new(MockClientPort::with_clients(vec![client.clone()]).await),
            Arc::new(MockBillingPort::with_records(vec![invoice], vec![]).await),
        );
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .post(&format!("/api/v1/clients/{}/reminders", client.id.as_uuid()))
            .authorization_bearer(token_for(cabinet, &[permissions::REMINDER_SEND]))
            .json(&json!({"channel": "email"}))
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }
}
