use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateReviewRequest, ReviewListQuery, ReviewView};
use super::services;
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    pagination::{Data, PageRequest, Paginated},
    state::AppState,
};

pub fn review_routes() -> Router<AppState> {
    Router::new().route("/reviews", get(list_reviews).post(create_review))
}

#[instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    query: Result<Query<ReviewListQuery>, QueryRejection>,
) -> AppResult<Json<Paginated<ReviewView>>> {
    let Query(q) = query?;
    let clinic_id = q
        .clinic_id
        .ok_or_else(|| AppError::validation("clinicId is required"))?;
    let page = PageRequest::new(q.page, q.limit);
    Ok(Json(services::list_for_clinic(&state.db, clinic_id, page).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Data<ReviewView>>)> {
    let Json(req) = payload?;
    let review = services::create_review(&state.db, user_id, req).await?;
    Ok((StatusCode::CREATED, Json(Data { data: review })))
}
