use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{LinkedAccount, ProfilePatch, SessionSummaryRow, UserRow, UserStats};

const RECENT_SESSIONS: i64 = 5;

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, email, name, avatar, role, provider, provider_id, created_at, updated_at
          FROM users
         WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find user")?;
    Ok(row)
}

pub async fn accounts(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<LinkedAccount>> {
    let rows = sqlx::query_as::<_, LinkedAccount>(
        "SELECT id, provider, provider_account_id, type FROM accounts WHERE user_id = $1 ORDER BY provider",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list accounts")?;
    Ok(rows)
}

pub async fn recent_sessions(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<SessionSummaryRow>> {
    let rows = sqlx::query_as::<_, SessionSummaryRow>(
        r#"
        SELECT id, expires
          FROM sessions
         WHERE user_id = $1
         ORDER BY expires DESC
         LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(RECENT_SESSIONS)
    .fetch_all(db)
    .await
    .context("list sessions")?;
    Ok(rows)
}

pub async fn stats(db: &PgPool, user_id: Uuid) -> anyhow::Result<UserStats> {
    let (reviews, favorites): (i64, i64) = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM reviews   WHERE user_id = $1),
               (SELECT COUNT(*) FROM favorites WHERE user_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("user stats")?;
    Ok(UserStats { reviews, favorites })
}

pub async fn update_profile(
    db: &PgPool,
    id: Uuid,
    patch: &ProfilePatch,
) -> anyhow::Result<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users
           SET name       = COALESCE($2, name),
               avatar     = CASE WHEN $3 THEN $4 ELSE avatar END,
               updated_at = now()
         WHERE id = $1
        RETURNING id, email, name, avatar, role, provider, provider_id, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(&patch.name)
    .bind(patch.avatar.is_some())
    .bind(patch.avatar.clone().flatten())
    .fetch_optional(db)
    .await
    .context("update profile")?;
    Ok(row)
}
