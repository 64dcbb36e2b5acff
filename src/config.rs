use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Public base URL objects are served from, e.g. `https://cdn.example.com/clinic-media`.
    pub public_url: String,
}

/// How the provider metadata patch runs relative to the sign-in request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMode {
    Inline,
    Deferred(Duration),
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub session_ttl_days: i64,
    pub patch_mode: PatchMode,
    pub google: Option<OAuthClientConfig>,
    pub kakao: Option<OAuthClientConfig>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub base_url: String,
    pub auth: AuthConfig,
    pub media: Option<MediaConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let patch_delay = std::env::var("IDENTITY_PATCH_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(200);
        let patch_mode = parse_patch_mode(
            std::env::var("IDENTITY_PATCH_MODE").ok().as_deref(),
            patch_delay,
        )?;

        let auth = AuthConfig {
            secret: std::env::var("AUTH_SECRET")?,
            session_ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            patch_mode,
            google: oauth_client_from_env("GOOGLE"),
            kakao: oauth_client_from_env("KAKAO"),
        };

        Ok(Self {
            database_url,
            base_url,
            auth,
            media: media_from_env(),
        })
    }
}

fn parse_patch_mode(raw: Option<&str>, delay_ms: u64) -> anyhow::Result<PatchMode> {
    match raw.map(str::trim) {
        None | Some("") | Some("inline") => Ok(PatchMode::Inline),
        Some("deferred") => Ok(PatchMode::Deferred(Duration::from_millis(delay_ms))),
        Some(other) => anyhow::bail!("unknown IDENTITY_PATCH_MODE {other:?}"),
    }
}

fn oauth_client_from_env(prefix: &str) -> Option<OAuthClientConfig> {
    let client_id = non_empty_var(&format!("{prefix}_CLIENT_ID"))?;
    let client_secret = non_empty_var(&format!("{prefix}_CLIENT_SECRET")).unwrap_or_default();
    Some(OAuthClientConfig {
        client_id,
        client_secret,
    })
}

// All four credentials must be present; a partial config counts as unconfigured.
fn media_from_env() -> Option<MediaConfig> {
    let endpoint = non_empty_var("MEDIA_ENDPOINT")?;
    let bucket = non_empty_var("MEDIA_BUCKET")?;
    let access_key = non_empty_var("MEDIA_ACCESS_KEY")?;
    let secret_key = non_empty_var("MEDIA_SECRET_KEY")?;
    let public_url = non_empty_var("MEDIA_PUBLIC_URL")
        .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
    Some(MediaConfig {
        endpoint,
        bucket,
        access_key,
        secret_key,
        region: non_empty_var("MEDIA_REGION").unwrap_or_else(|| "us-east-1".into()),
        public_url: public_url.trim_end_matches('/').to_string(),
    })
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_mode_defaults_to_inline() {
        assert_eq!(parse_patch_mode(None, 200).unwrap(), PatchMode::Inline);
        assert_eq!(parse_patch_mode(Some("inline"), 200).unwrap(), PatchMode::Inline);
    }

    #[test]
    fn deferred_patch_mode_carries_delay() {
        assert_eq!(
            parse_patch_mode(Some("deferred"), 250).unwrap(),
            PatchMode::Deferred(Duration::from_millis(250))
        );
    }

    #[test]
    fn unknown_patch_mode_is_rejected() {
        assert!(parse_patch_mode(Some("eventually"), 200).is_err());
    }
}
