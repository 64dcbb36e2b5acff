use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::Role;
use crate::error::{AppError, AppResult};
use crate::validation::{char_len_between, is_http_url};

pub const NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub role: String,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub role: Role,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRow> for Profile {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            name: r.name,
            avatar: r.avatar,
            role: Role::from_db(&r.role),
            provider: r.provider,
            provider_id: r.provider_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAccount {
    pub id: Uuid,
    pub provider: String,
    pub provider_account_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionSummaryRow {
    pub id: Uuid,
    pub expires: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub expires: OffsetDateTime,
    pub is_active: bool,
}

impl SessionSummary {
    pub fn at(row: SessionSummaryRow, now: OffsetDateTime) -> Self {
        Self {
            id: row.id,
            expires: row.expires,
            is_active: row.expires > now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UserStats {
    pub reviews: i64,
    pub favorites: i64,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Profile,
    pub accounts: Vec<LinkedAccount>,
    pub sessions: Vec<SessionSummary>,
    pub stats: UserStats,
}

/// `PATCH /users/me` body. An absent field is left alone; `null` is explicit.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMeRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
}

fn nullable<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

/// Validated profile changes. `avatar: Some(None)` clears the avatar.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub avatar: Option<Option<String>>,
}

impl UpdateMeRequest {
    pub fn into_patch(self) -> AppResult<ProfilePatch> {
        let name = match self.name {
            None => None,
            Some(None) => return Err(AppError::validation("name cannot be empty")),
            Some(Some(raw)) => {
                let trimmed = raw.trim();
                if !char_len_between(trimmed, 1, NAME_MAX_CHARS) {
                    return Err(AppError::validation(format!(
                        "name must be 1 to {NAME_MAX_CHARS} characters"
                    )));
                }
                Some(trimmed.to_string())
            }
        };

        let avatar = match self.avatar {
            None => None,
            Some(v) => match v.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                None => Some(None),
                Some(url) if is_http_url(url) => Some(Some(url.to_string())),
                Some(_) => return Err(AppError::validation("avatar must be an http(s) URL")),
            },
        };

        Ok(ProfilePatch { name, avatar })
    }
}
