//! Fiscal obligation handlers

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ClientId;
use domain_client::{obligation_report, ClientPortExt, ObligationKind};

use crate::auth::{permissions, Claims};
use crate::dto::clients::*;
use crate::error::ApiError;
use crate::handlers::client_in_cabinet;
use crate::AppState;

const YEARS: std::ops::RangeInclusive<i32> = 1990..=2100;

fn check_year(year: i32) -> Result<i32, ApiError> {
    if YEARS.contains(&year) {
        Ok(year)
    } else {
        Err(ApiError::validation(format!("fiscal year {year} out of range")))
    }
}

/// Subjection and compliance of every obligation for one year
pub async fn get_obligations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<ObligationsQuery>,
) -> Result<Json<ObligationsResponse>, ApiError> {
    claims.require(permissions::CLIENT_READ)?;
    let year = check_year(query.year.unwrap_or_else(|| state.timezone.current_year()))?;
    let client = client_in_cabinet(&state, &claims, ClientId::from(id)).await?;

    Ok(Json(ObligationsResponse {
        client_id: id,
        year,
        obligations: obligation_report(&client, year),
    }))
}

/// Upserts the obligation entry for (year, kind), optionally attaching a document
pub async fn put_obligation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, year, kind)): Path<(Uuid, i32, String)>,
    Json(request): Json<ObligationRequest>,
) -> Result<Json<ObligationResponse>, ApiError> {
    claims.require(permissions::CLIENT_WRITE)?;
    request.validate()?;
    let year = check_year(year)?;
    let kind = ObligationKind::from_str(&kind)?;
    let client_id = ClientId::from(id);
    let cabinet_id = claims.cabinet_id();

    let mut status = state
        .clients
        .record_obligation(cabinet_id, client_id, year, kind, request.update, Some(claims.metadata()))
        .await?;

    let attachment_path = match request.attachment {
        Some(file_name) => {
            let path = state
                .clients
                .attach_document(cabinet_id, client_id, year, kind, &file_name, Some(claims.metadata()))
                .await?;
            status.attachments.push(path.clone());
            Some(path)
        }
        None => None,
    };
    state.invalidate_clients(cabinet_id).await;

    Ok(Json(ObligationResponse {
        kind,
        year,
        status,
        attachment_path,
    }))
}
