use anyhow::Context;
use async_trait::async_trait;
use rand::distributions::{Alphanumeric, DistString};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::dto::{ExternalAccount, Role, SessionUser, SignInUser};
use super::identity::{IdentityStore, ProviderPatch};
use super::repo_types::{SessionRow, SessionUserRow};

const SESSION_TOKEN_LEN: usize = 64;

/// Postgres-backed identity store; owns user provisioning and account linking.
#[derive(Clone)]
pub struct PgIdentityStore {
    db: PgPool,
}

impl PgIdentityStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn link_identity(
        &self,
        email: &str,
        user: &SignInUser,
        account: &ExternalAccount,
    ) -> anyhow::Result<Uuid> {
        let tokens = &account.tokens;
        let mut tx = self.db.begin().await.context("begin tx")?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE accounts
               SET access_token  = COALESCE($3, access_token),
                   refresh_token = COALESCE($4, refresh_token),
                   expires_at    = COALESCE($5, expires_at),
                   token_type    = COALESCE($6, token_type),
                   scope         = COALESCE($7, scope),
                   id_token      = COALESCE($8, id_token)
             WHERE provider = $1 AND provider_account_id = $2
            RETURNING user_id
            "#,
        )
        .bind(&account.provider)
        .bind(&account.provider_account_id)
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .bind(&tokens.token_type)
        .bind(&tokens.scope)
        .bind(&tokens.id_token)
        .fetch_optional(&mut *tx)
        .await
        .context("refresh linked account")?;

        if let Some(user_id) = existing {
            tx.commit().await.context("commit tx")?;
            return Ok(user_id);
        }

        let user_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, name, avatar)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET updated_at = now()
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(&user.name)
        .bind(&user.image)
        .fetch_one(&mut *tx)
        .await
        .context("upsert user by email")?;

        // A concurrent first sign-in may have linked the account already; keep its owner.
        let owner: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO accounts (user_id, type, provider, provider_account_id,
                                  access_token, refresh_token, expires_at, token_type, scope, id_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (provider, provider_account_id)
                DO UPDATE SET access_token = EXCLUDED.access_token
            RETURNING user_id
            "#,
        )
        .bind(user_id)
        .bind(&account.kind)
        .bind(&account.provider)
        .bind(&account.provider_account_id)
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .bind(&tokens.token_type)
        .bind(&tokens.scope)
        .bind(&tokens.id_token)
        .fetch_one(&mut *tx)
        .await
        .context("insert account")?;

        tx.commit().await.context("commit tx")?;
        Ok(owner)
    }

    async fn apply_provider_patch(&self, email: &str, patch: &ProviderPatch) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET provider    = $2,
                   provider_id = $3,
                   name        = COALESCE($4, name),
                   avatar      = COALESCE($5, avatar),
                   updated_at  = now()
             WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(&patch.provider)
        .bind(&patch.provider_id)
        .bind(&patch.name)
        .bind(&patch.avatar)
        .execute(&self.db)
        .await
        .context("apply provider patch")?;
        Ok(res.rows_affected())
    }

    async fn find_session_user(&self, user_id: Uuid) -> anyhow::Result<Option<SessionUser>> {
        let row = sqlx::query_as::<_, SessionUserRow>(
            r#"SELECT id, name, email, avatar, role FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("load session user")?;
        Ok(row.map(|r| SessionUser {
            id: r.id,
            name: r.name,
            email: Some(r.email),
            image: r.avatar,
            role: Role::from_db(&r.role),
        }))
    }
}

pub fn new_session_token() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), SESSION_TOKEN_LEN)
}

pub async fn create_session(db: &PgPool, user_id: Uuid, ttl: Duration) -> anyhow::Result<SessionRow> {
    let expires = OffsetDateTime::now_utc() + ttl;
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        INSERT INTO sessions (user_id, session_token, expires)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, session_token, expires
        "#,
    )
    .bind(user_id)
    .bind(new_session_token())
    .bind(expires)
    .fetch_one(db)
    .await
    .context("insert session")?;
    Ok(row)
}

/// Looks up an unexpired session by token.
pub async fn find_valid_session(db: &PgPool, token: &str) -> anyhow::Result<Option<SessionRow>> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT id, user_id, session_token, expires
          FROM sessions
         WHERE session_token = $1 AND expires > now()
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await
    .context("find session")?;
    Ok(row)
}

pub async fn delete_session(db: &PgPool, token: &str) -> anyhow::Result<u64> {
    let res = sqlx::query("DELETE FROM sessions WHERE session_token = $1")
        .bind(token)
        .execute(db)
        .await
        .context("delete session")?;
    Ok(res.rows_affected())
}
