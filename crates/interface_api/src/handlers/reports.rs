//! Reporting and export handlers

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

use core_kernel::ClientId;
use domain_billing::build_summary;
use domain_client::{clients_to_csv, Client, ClientQuery};

use crate::auth::{permissions, Claims};
use crate::dto::billing::{parse_currency, SummaryQuery, SummaryResponse};
use crate::dto::clients::ListClientsQuery;
use crate::error::ApiError;
use crate::AppState;

/// Balance and delinquency of every active, invoiced client
pub async fn client_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    claims.require(permissions::REPORT_READ)?;
    let currency = parse_currency(query.currency.as_deref())?;
    let today = state.today();

    let clients = state.cabinet_clients(claims.cabinet_id(), claims.metadata()).await?;
    let active: Vec<Client> = clients.iter().filter(|c| c.is_active()).cloned().collect();
    let ids: Vec<ClientId> = active.iter().map(|c| c.id).collect();

    let invoices = state
        .billing
        .list_invoices_for_clients(&ids, Some(claims.metadata()))
        .await?;
    let payments = state
        .billing
        .list_payments_for_clients(&ids, Some(claims.metadata()))
        .await?;

    let rows = build_summary(&active, &invoices, &payments, currency, today)?;
    Ok(Json(SummaryResponse {
        currency,
        date: today,
        clients: rows,
    }))
}

/// CSV export of the cabinet's clients, accepting the listing filters
pub async fn export_clients_csv(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListClientsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    claims.require(permissions::CLIENT_READ)?;
    query.validate()?;

    let clients = state.cabinet_clients(claims.cabinet_id(), claims.metadata()).await?;
    let filter = ClientQuery::from(query);
    let offset = filter.offset.unwrap_or(0) as usize;
    let limit = filter.limit.map(|l| l as usize).unwrap_or(usize::MAX);
    let selected: Vec<Client> = clients
        .iter()
        .filter(|c| filter.matches(c))
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    let csv = clients_to_csv(&selected)?;
    tracing::info!(rows = selected.len(), "clients exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"clients.csv\""),
        ],
        csv,
    ))
}
