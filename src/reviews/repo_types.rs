use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub clinic_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub rating: i32,
    pub content: String,
    pub visit_date: Option<Date>,
    pub created_at: OffsetDateTime,
    pub user_name: Option<String>,
    pub user_avatar: Option<String>,
    pub treatment_name: Option<String>,
    pub treatment_name_en: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReviewImageRow {
    pub id: Uuid,
    pub review_id: Uuid,
    pub url: String,
    pub order: i32,
}
