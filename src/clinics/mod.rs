pub mod dto;
pub mod filter;
mod handlers;
pub mod repo;
mod repo_types;
pub mod services;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::extract::{rejection::PathRejection, Path};
use axum::Router;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::clinic_routes())
}

/// Clinic id from the URL; an id that is not a UUID names no clinic.
pub fn clinic_id(path: Result<Path<Uuid>, PathRejection>) -> AppResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::not_found("Clinic not found"))
}
