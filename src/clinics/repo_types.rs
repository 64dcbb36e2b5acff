use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ClinicRow {
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
    pub created_at: OffsetDateTime,
}

/// A listing row: the clinic plus the aggregates computed alongside it.
#[derive(Debug, Clone, FromRow)]
pub struct ClinicListRow {
    #[sqlx(flatten)]
    pub clinic: ClinicRow,
    pub review_count: i64,
    pub average_rating: Option<f64>,
    pub min_price: Option<i64>,
    pub main_image: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClinicTreatmentRow {
    pub id: Uuid,
    pub treatment_id: Uuid,
    pub price: i64,
    pub currency: String,
    pub duration: Option<i32>,
    pub treatment_name: String,
    pub treatment_name_en: Option<String>,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PromotionRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub discount: Option<i32>,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
}
