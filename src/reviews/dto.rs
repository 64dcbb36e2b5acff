use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{ReviewImageRow, ReviewRow};
use crate::error::{AppError, AppResult};
use crate::validation::{char_len_between, is_http_url};

time::serde::format_description!(visit_date_format, Date, "[year]-[month]-[day]");

pub const CONTENT_MIN_CHARS: usize = 10;
pub const CONTENT_MAX_CHARS: usize = 2000;
pub const MAX_REVIEW_IMAGES: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListQuery {
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub clinic_id: Option<Uuid>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub clinic_id: Uuid,
    #[serde(default)]
    pub treatment_id: Option<Uuid>,
    pub rating: i32,
    pub content: String,
    #[serde(default, with = "visit_date_format::option")]
    pub visit_date: Option<Date>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateReviewRequest {
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::validation("rating must be between 1 and 5"));
        }
        if !char_len_between(&self.content, CONTENT_MIN_CHARS, CONTENT_MAX_CHARS) {
            return Err(AppError::validation(format!(
                "content must be {CONTENT_MIN_CHARS} to {CONTENT_MAX_CHARS} characters"
            )));
        }
        if self.images.len() > MAX_REVIEW_IMAGES {
            return Err(AppError::validation(format!(
                "at most {MAX_REVIEW_IMAGES} images per review"
            )));
        }
        if let Some(bad) = self.images.iter().find(|u| !is_http_url(u)) {
            return Err(AppError::validation(format!("invalid image url {bad}")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTreatment {
    pub id: Uuid,
    pub name: String,
    pub name_en: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewImage {
    pub id: Uuid,
    pub url: String,
    pub order: i32,
}

impl From<ReviewImageRow> for ReviewImage {
    fn from(r: ReviewImageRow) -> Self {
        Self {
            id: r.id,
            url: r.url,
            order: r.order,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub rating: i32,
    pub content: String,
    #[serde(with = "visit_date_format::option")]
    pub visit_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user: ReviewAuthor,
    pub treatment: Option<ReviewTreatment>,
    pub images: Vec<ReviewImage>,
}

impl ReviewView {
    pub fn from_row(r: ReviewRow, images: Vec<ReviewImage>) -> Self {
        let treatment = match (r.treatment_id, r.treatment_name) {
            (Some(id), Some(name)) => Some(ReviewTreatment {
                id,
                name,
                name_en: r.treatment_name_en,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            clinic_id: r.clinic_id,
            rating: r.rating,
            content: r.content,
            visit_date: r.visit_date,
            created_at: r.created_at,
            user: ReviewAuthor {
                id: r.user_id,
                name: r.user_name,
                avatar: r.user_avatar,
            },
            treatment,
            images,
        }
    }
}
