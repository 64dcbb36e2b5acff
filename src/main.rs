mod app;
mod auth;
mod clinics;
mod config;
mod error;
mod images;
mod pagination;
mod reviews;
mod search;
mod state;
mod storage;
#[cfg(test)]
mod testing;
mod treatments;
mod users;
mod validation;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "clinic_advisor=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    sqlx::migrate!("./migrations").run(&app_state.db).await?;
    tracing::info!(
        base_url = %app_state.config.base_url,
        media = app_state.media.is_some(),
        patch_mode = ?app_state.config.auth.patch_mode,
        "starting clinic-advisor"
    );

    app::serve(app::build_app(app_state)).await
}
