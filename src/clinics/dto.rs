use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{ClinicListRow, ClinicRow, ClinicTreatmentRow, PromotionRow};
use crate::images::ClinicImage;
use crate::reviews::{aggregate::RatingSummary, dto::ReviewView};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicInfo {
    pub id: Uuid,
    pub name: String,
    pub name_en: Option<String>,
    pub address: String,
    pub address_en: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub operating_hours: Option<Value>,
    pub region: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<ClinicRow> for ClinicInfo {
    fn from(r: ClinicRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            name_en: r.name_en,
            address: r.address,
            address_en: r.address_en,
            latitude: r.latitude,
            longitude: r.longitude,
            phone: r.phone,
            website: r.website,
            operating_hours: r.operating_hours,
            region: r.region,
            created_at: r.created_at,
        }
    }
}

/// Listing card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicSummary {
    #[serde(flatten)]
    pub clinic: ClinicInfo,
    pub main_image: Option<String>,
    pub review_count: i64,
    pub average_rating: f64,
    pub min_price: Option<i64>,
}

impl From<ClinicListRow> for ClinicSummary {
    fn from(r: ClinicListRow) -> Self {
        Self {
            clinic: r.clinic.into(),
            main_image: r.main_image,
            review_count: r.review_count,
            average_rating: r.average_rating.unwrap_or(0.0),
            min_price: r.min_price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentOffer {
    pub id: Uuid,
    pub price: i64,
    pub currency: String,
    pub duration: Option<i32>,
    pub treatment: OfferedTreatment,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferedTreatment {
    pub id: Uuid,
    pub name: String,
    pub name_en: Option<String>,
    pub category: String,
    pub description: Option<String>,
}

impl From<ClinicTreatmentRow> for TreatmentOffer {
    fn from(r: ClinicTreatmentRow) -> Self {
        Self {
            id: r.id,
            price: r.price,
            currency: r.currency,
            duration: r.duration,
            treatment: OfferedTreatment {
                id: r.treatment_id,
                name: r.treatment_name,
                name_en: r.treatment_name_en,
                category: r.category,
                description: r.description,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub discount: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
}

impl From<PromotionRow> for Promotion {
    fn from(r: PromotionRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            discount: r.discount,
            start_date: r.start_date,
            end_date: r.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicDetail {
    #[serde(flatten)]
    pub clinic: ClinicInfo,
    pub images: Vec<ClinicImage>,
    pub treatments: Vec<TreatmentOffer>,
    pub reviews: Vec<ReviewView>,
    pub promotions: Vec<Promotion>,
    pub review_count: i64,
    pub rating: RatingSummary,
}
