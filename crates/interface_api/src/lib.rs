//! HTTP API Layer
//!
//! This crate provides the REST API of the cabinet system using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for clients, obligations, billing,
//!   reports and reminders
//! - **Middleware**: JWT authentication and audit logging
//! - **DTOs**: Request/Response data transfer objects, validated with
//!   `validator`
//! - **State**: the domain ports, the client listing cache and the firm
//!   timezone
//!
//! Handlers only talk to ports, so the same router runs on the PostgreSQL
//! adapters in production and on the in-memory mocks in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(config, clients, billing);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{clients, health, invoices, obligations, payments, reminders, reports};

pub use crate::state::AppState;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let client_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/:id/archive", post(clients::archive_client))
        .route("/:id/restore", post(clients::restore_client))
        .route("/:id/obligations", get(obligations::get_obligations))
        .route("/:id/obligations/:year/:kind", put(obligations::put_obligation))
        .route("/:id/invoices", get(invoices::list_client_invoices))
        .route("/:id/credits", post(payments::create_credit))
        .route("/:id/reminders", post(reminders::send_reminder));

    let invoice_routes = Router::new()
        .route("/", post(invoices::create_invoice))
        .route("/:id", get(invoices::get_invoice))
        .route("/:id/cancel", post(invoices::cancel_invoice))
        .route("/:id/payments", post(payments::record_payment));

    let payment_routes = Router::new()
        .route("/:id", put(payments::update_payment).delete(payments::delete_payment));

    let credit_routes = Router::new()
        .route("/:id/apply", post(payments::apply_credit));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/clients", client_routes)
        .nest("/invoices", invoice_routes)
        .nest("/payments", payment_routes)
        .nest("/credits", credit_routes)
        .route("/reports/summary", get(reports::client_summary))
        .route("/exports/clients.csv", get(reports::export_clients_csv))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
