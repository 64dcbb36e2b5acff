use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    clinics::{
        dto::ClinicSummary,
        filter::{ClinicFilter, Region},
        services::list_clinics,
    },
    error::{AppError, AppResult},
    pagination::{PageRequest, Pagination},
    state::AppState,
    treatments::repo::{self as treatment_repo, Treatment},
};

const TREATMENT_MATCH_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchType {
    #[default]
    All,
    Clinic,
    Treatment,
}

impl SearchType {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw {
            "all" => Ok(SearchType::All),
            "clinic" => Ok(SearchType::Clinic),
            "treatment" => Ok(SearchType::Treatment),
            other => Err(AppError::validation(format!("unknown search type {other}"))),
        }
    }

    fn includes_clinics(&self) -> bool {
        matches!(self, SearchType::All | SearchType::Clinic)
    }

    fn includes_treatments(&self) -> bool {
        matches!(self, SearchType::All | SearchType::Treatment)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub region: Option<String>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub clinics: Vec<ClinicSummary>,
    pub treatments: Vec<Treatment>,
    pub pagination: Pagination,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[instrument(skip(state))]
async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> AppResult<Json<SearchResults>> {
    let Query(q) = query?;
    let kind = match q.kind.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => SearchType::parse(raw)?,
        None => SearchType::All,
    };
    let text = q.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let filter = ClinicFilter {
        region: q
            .region
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Region::parse)
            .transpose()?,
        search: text.map(str::to_string),
        ..ClinicFilter::default()
    };
    let page = PageRequest::new(q.page, q.limit);

    let (clinics, pagination) = if kind.includes_clinics() {
        let found = list_clinics(&state.db, &filter, page).await?;
        (found.data, found.pagination)
    } else {
        (Vec::new(), page.with_total(0))
    };

    let treatments = match text {
        Some(t) if kind.includes_treatments() => {
            treatment_repo::search(&state.db, t, TREATMENT_MATCH_LIMIT).await?
        }
        _ => Vec::new(),
    };

    Ok(Json(SearchResults {
        clinics,
        treatments,
        pagination,
    }))
}
