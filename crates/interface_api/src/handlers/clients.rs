//! Client handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ClientId;
use domain_client::{Client, ClientError, ClientPortExt};

use crate::auth::{permissions, Claims};
use crate::dto::clients::*;
use crate::error::ApiError;
use crate::handlers::client_in_cabinet;
use crate::AppState;

/// Lists clients of the caller's cabinet
///
/// The unfiltered listing is served from the client cache.
pub async fn list_clients(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<Vec<Client>>, ApiError> {
    claims.require(permissions::CLIENT_READ)?;
    query.validate()?;

    if query.is_unfiltered() {
        let clients = state.cabinet_clients(claims.cabinet_id(), claims.metadata()).await?;
        return Ok(Json(clients.as_ref().clone()));
    }

    let clients = state
        .clients
        .find_clients(claims.cabinet_id(), query.into(), Some(claims.metadata()))
        .await?;
    Ok(Json(clients))
}

/// Creates a client
pub async fn create_client(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), ApiError> {
    claims.require(permissions::CLIENT_WRITE)?;
    request.validate()?;

    let client = request.into_client(claims.cabinet_id());
    let saved = state.clients.register_client(client, Some(claims.metadata())).await?;
    state.invalidate_clients(claims.cabinet_id()).await;

    Ok((StatusCode::CREATED, Json(saved.into())))
}

/// Gets a client by ID
pub async fn get_client(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, ApiError> {
    claims.require(permissions::CLIENT_READ)?;
    let client = client_in_cabinet(&state, &claims, ClientId::from(id)).await?;
    Ok(Json(client))
}

/// Updates a client
pub async fn update_client(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<ClientResponse>, ApiError> {
    claims.require(permissions::CLIENT_WRITE)?;
    request.validate()?;

    let saved = state
        .clients
        .update_client(claims.cabinet_id(), ClientId::from(id), request.into(), Some(claims.metadata()))
        .await?;
    state.invalidate_clients(claims.cabinet_id()).await;

    Ok(Json(saved.into()))
}

/// Archives an active client
pub async fn archive_client(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, ApiError> {
    claims.require(permissions::CLIENT_WRITE)?;
    let client = state
        .clients
        .archive_client(claims.cabinet_id(), ClientId::from(id), Some(claims.metadata()))
        .await?;
    state.invalidate_clients(claims.cabinet_id()).await;
    Ok(Json(client))
}

/// Brings an archived or deleted client back to active
pub async fn restore_client(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, ApiError> {
    claims.require(permissions::CLIENT_WRITE)?;
    let client = state
        .clients
        .restore_client(claims.cabinet_id(), ClientId::from(id), Some(claims.metadata()))
        .await?;
    state.invalidate_clients(claims.cabinet_id()).await;
    Ok(Json(client))
}

/// Soft-deletes a client, or purges it with `permanent=true`
///
/// Both require `confirm=true`.
pub async fn delete_client(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteClientQuery>,
) -> Result<Json<DeleteClientResponse>, ApiError> {
    claims.require(permissions::CLIENT_DELETE)?;
    if !query.confirm {
        let operation = if query.permanent { "permanent delete" } else { "delete" };
        return Err(ClientError::ConfirmationRequired(operation.to_string()).into());
    }

    let client = state
        .clients
        .delete_client(claims.cabinet_id(), ClientId::from(id), query.permanent, Some(claims.metadata()))
        .await?;
    state.invalidate_clients(claims.cabinet_id()).await;

    Ok(Json(DeleteClientResponse {
        permanent: query.permanent,
        client,
    }))
}
