mod handlers;
pub mod repo;
pub mod services;

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::Router;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageType {
    #[default]
    Main,
    Interior,
    Exterior,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Main => "main",
            ImageType::Interior => "interior",
            ImageType::Exterior => "exterior",
        }
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw {
            "main" => Ok(ImageType::Main),
            "interior" => Ok(ImageType::Interior),
            "exterior" => Ok(ImageType::Exterior),
            other => Err(AppError::validation(format!("unknown image type {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClinicImage {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub url: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::image_routes())
}
