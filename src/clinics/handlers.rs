use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{ClinicDetail, ClinicSummary};
use super::filter::{ClinicFilter, ClinicListQuery};
use super::services;
use crate::{
    error::AppResult,
    pagination::{Data, Paginated},
    state::AppState,
};

pub fn clinic_routes() -> Router<AppState> {
    Router::new()
        .route("/clinics", get(list_clinics))
        .route("/clinics/:id", get(get_clinic))
}

#[instrument(skip(state))]
pub async fn list_clinics(
    State(state): State<AppState>,
    query: Result<Query<ClinicListQuery>, QueryRejection>,
) -> AppResult<Json<Paginated<ClinicSummary>>> {
    let Query(q) = query?;
    let (filter, page) = ClinicFilter::from_query(&q)?;
    Ok(Json(services::list_clinics(&state.db, &filter, page).await?))
}

#[instrument(skip(state))]
pub async fn get_clinic(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<Data<ClinicDetail>>> {
    let id = super::clinic_id(path)?;
    let data = services::clinic_detail(&state.db, id).await?;
    Ok(Json(Data { data }))
}
