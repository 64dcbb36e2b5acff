pub mod dto;
pub mod repo;

use axum::{extract::rejection::JsonRejection, extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};
use dto::{MeResponse, Profile, SessionSummary, UpdateMeRequest};

pub fn router() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).patch(update_me))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<MeResponse>> {
    let user = repo::find(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let accounts = repo::accounts(&state.db, user_id).await?;
    let now = OffsetDateTime::now_utc();
    let sessions = repo::recent_sessions(&state.db, user_id)
        .await?
        .into_iter()
        .map(|s| SessionSummary::at(s, now))
        .collect();
    let stats = repo::stats(&state.db, user_id).await?;

    Ok(Json(MeResponse {
        user: user.into(),
        accounts,
        sessions,
        stats,
    }))
}

#[derive(Debug, Serialize)]
pub struct UpdatedProfile {
    pub user: Profile,
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<UpdateMeRequest>, JsonRejection>,
) -> AppResult<Json<UpdatedProfile>> {
    let Json(req) = payload?;
    let patch = req.into_patch()?;
    let user = repo::update_profile(&state.db, user_id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(%user_id, name = patch.name.is_some(), avatar = patch.avatar.is_some(), "profile updated");
    Ok(Json(UpdatedProfile { user: user.into() }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::repo::create_session;
    use crate::testing::PgTestContext;

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = http_body_util::BodyExt::collect(res.into_body())
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn me_without_session_is_401() {
        let res = router()
            .with_state(AppState::fake())
            .oneshot(Request::get("/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_stats_and_patch() {
        let Some(ctx) = PgTestContext::new().await else {
            return;
        };
        let db = ctx.db.clone();
        let user: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, name, avatar, provider, provider_id) VALUES ('me@test.local', 'Me', 'https://a.test/1.png', 'kakao', '42') RETURNING id",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO accounts (user_id, type, provider, provider_account_id) VALUES ($1, 'oauth', 'kakao', '42')",
        )
        .bind(user)
        .execute(&db)
        .await
        .unwrap();
        let clinic: Uuid = sqlx::query_scalar(
            "INSERT INTO clinics (name, address, region) VALUES ('A', 'Seoul', 'samsung') RETURNING id",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        sqlx::query("INSERT INTO favorites (user_id, clinic_id) VALUES ($1, $2)")
            .bind(user)
            .bind(clinic)
            .execute(&db)
            .await
            .unwrap();
        let token = create_session(&db, user, time::Duration::days(1))
            .await
            .unwrap()
            .session_token;
        create_session(&db, user, time::Duration::days(-1)).await.unwrap();

        let app = router().with_state(AppState::with_db(db.clone(), None));
        let authed = |req: axum::http::request::Builder| {
            req.header(header::AUTHORIZATION, format!("Bearer {token}"))
        };

        let res = app
            .clone()
            .oneshot(authed(Request::get("/users/me")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let me = body_json(res).await;
        assert_eq!(me["user"]["email"], "me@test.local");
        assert_eq!(me["user"]["role"], "user");
        assert_eq!(me["accounts"][0]["provider"], "kakao");
        assert_eq!(me["accounts"][0]["providerAccountId"], "42");
        assert_eq!(me["accounts"][0]["type"], "oauth");
        assert!(me["accounts"][0]["id"].is_string());
        assert_eq!(me["user"]["providerId"], "42");
        assert_eq!(me["stats"]["favorites"], 1);
        assert_eq!(me["stats"]["reviews"], 0);
        let sessions = me["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0]["isActive"], true);
        assert_eq!(sessions[1]["isActive"], false);

        let patch = |body: Value| {
            authed(Request::patch("/users/me"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        };

        let res = app.clone().oneshot(patch(json!({ "role": "admin" }))).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .clone()
            .oneshot(patch(json!({ "name": "a".repeat(51) })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .oneshot(patch(json!({ "name": "New Name", "avatar": "" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let updated = body_json(res).await;
        assert_eq!(updated["user"]["name"], "New Name");
        assert_eq!(updated["user"]["avatar"], Value::Null);
        assert_eq!(updated["user"]["role"], "user");

        ctx.cleanup().await;
    }
}
