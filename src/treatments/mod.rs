pub mod repo;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::pagination::Data;
use crate::state::AppState;
use repo::Treatment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Laser,
    Injectable,
    Skincare,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Laser => "laser",
            Category::Injectable => "injectable",
            Category::Skincare => "skincare",
            Category::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw {
            "laser" => Ok(Category::Laser),
            "injectable" => Ok(Category::Injectable),
            "skincare" => Ok(Category::Skincare),
            "other" => Ok(Category::Other),
            other => Err(AppError::validation(format!("unknown category {other}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentQuery {
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub clinic_id: Option<Uuid>,
    pub category: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/treatments", get(list_treatments))
}

#[instrument(skip(state))]
async fn list_treatments(
    State(state): State<AppState>,
    query: Result<Query<TreatmentQuery>, QueryRejection>,
) -> AppResult<Json<Data<Vec<Treatment>>>> {
    let Query(q) = query?;
    let category = q
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(Category::parse)
        .transpose()?;
    let data = repo::list(&state.db, q.clinic_id, category).await?;
    Ok(Json(Data { data }))
}
