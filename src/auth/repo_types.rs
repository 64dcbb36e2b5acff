use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Session record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_token: String,
    pub expires: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct SessionUserRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub role: String,
}
