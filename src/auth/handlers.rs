use axum::{
    extract::{rejection::QueryRejection, FromRef, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use time::Duration;
use tracing::{error, info, instrument, warn};

use super::{
    dto::{CallbackQuery, Session, SessionUser, SignInQuery},
    extractors::{SessionToken, SESSION_COOKIE},
    jwt::{new_nonce, StateKeys},
    oauth::{resolve_redirect, OAuthClient, Provider},
    repo,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub const STATE_COOKIE: &str = "oauth_state";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signin/:provider", get(sign_in))
        .route("/auth/callback/:provider", get(callback))
        .route("/auth/signout", post(sign_out))
        .route("/auth/session", get(get_session))
}

fn provider_client<'a>(state: &'a AppState, raw: &str) -> AppResult<(Provider, &'a OAuthClient)> {
    Provider::parse(raw)
        .and_then(|p| state.oauth.get(p).map(|c| (p, c)))
        .ok_or_else(|| AppError::not_found(format!("unknown provider {raw}")))
}

fn auth_cookie(name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn expired(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

#[instrument(skip(state, jar))]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(provider): Path<String>,
    query: Result<Query<SignInQuery>, QueryRejection>,
) -> AppResult<(CookieJar, Redirect)> {
    let Query(q) = query?;
    let (provider, client) = provider_client(&state, &provider)?;
    let keys = StateKeys::from_ref(&state);
    let nonce = new_nonce();
    let oauth_state = keys.sign(provider, q.callback_url, &nonce)?;
    let url = client.authorize_url(&oauth_state)?;
    let max_age = Duration::seconds(keys.ttl.as_secs() as i64);
    Ok((
        jar.add(auth_cookie(STATE_COOKIE, nonce, max_age)),
        Redirect::to(&url),
    ))
}

#[instrument(skip(state, jar, q))]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(provider): Path<String>,
    Query(q): Query<CallbackQuery>,
) -> (CookieJar, Redirect) {
    let error_redirect = format!("{}/login?error=Callback", state.config.base_url);
    let nonce = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(expired(STATE_COOKIE));
    match complete_sign_in(&state, &provider, q, nonce.as_deref()).await {
        Ok((session, target)) => (jar.add(session), Redirect::to(&target)),
        Err(e) => {
            error!(error = ?e, %provider, "oauth callback failed");
            (jar, Redirect::to(&error_redirect))
        }
    }
}

async fn complete_sign_in(
    state: &AppState,
    provider: &str,
    q: CallbackQuery,
    nonce: Option<&str>,
) -> anyhow::Result<(Cookie<'static>, String)> {
    if let Some(err) = q.error {
        anyhow::bail!("provider returned error {err}");
    }
    let (provider, client) =
        provider_client(state, provider).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let code = q.code.ok_or_else(|| anyhow::anyhow!("missing code"))?;
    let raw_state = q.state.ok_or_else(|| anyhow::anyhow!("missing state"))?;
    let claims = StateKeys::from_ref(state).verify(&raw_state, provider)?;
    let nonce = nonce.ok_or_else(|| anyhow::anyhow!("missing state cookie"))?;
    if claims.nonce != nonce {
        anyhow::bail!("state was issued to another browser");
    }

    let callback = client.exchange(&code).await?;
    let outcome = state.identity.sign_in(callback).await?;
    let user_id = outcome
        .user_id
        .ok_or_else(|| anyhow::anyhow!("provider returned no identity"))?;

    let ttl = Duration::days(state.config.auth.session_ttl_days);
    let session = repo::create_session(&state.db, user_id, ttl).await?;
    info!(%user_id, provider = provider.as_str(), patch = ?outcome.patch, "signed in");

    let cookie = auth_cookie(SESSION_COOKIE, session.session_token, ttl);
    let target = resolve_redirect(claims.callback_url.as_deref(), &state.config.base_url);
    Ok((cookie, target))
}

#[instrument(skip(state, jar, token))]
pub async fn sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
    SessionToken(token): SessionToken,
) -> AppResult<(StatusCode, CookieJar)> {
    if let Some(token) = token {
        let removed = repo::delete_session(&state.db, &token).await?;
        if removed == 0 {
            warn!("sign-out with unknown session");
        }
    }
    Ok((StatusCode::NO_CONTENT, jar.remove(expired(SESSION_COOKIE))))
}

/// Current session with live user data, or `{}` when signed out or when the
/// session's user can no longer be loaded.
#[instrument(skip(state, token))]
pub async fn get_session(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Json<serde_json::Value>> {
    let Some(token) = token else {
        return Ok(Json(json!({})));
    };
    let Some(row) = repo::find_valid_session(&state.db, &token).await? else {
        return Ok(Json(json!({})));
    };
    let placeholder = Session {
        user: SessionUser {
            id: row.user_id,
            ..Default::default()
        },
        expires: row.expires,
    };
    let session = state.identity.materialize(placeholder.clone()).await;
    if session == placeholder {
        warn!(user_id = %row.user_id, "session user unavailable");
        return Ok(Json(json!({})));
    }
    Ok(Json(serde_json::to_value(session).map_err(anyhow::Error::from)?))
}
