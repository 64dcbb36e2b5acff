use std::collections::HashMap;

use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::dto::{AccountTokens, ExternalAccount, SignInCallback, SignInUser};
use crate::config::{AppConfig, OAuthClientConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Kakao,
}

impl Provider {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "google" => Some(Provider::Google),
            "kakao" => Some(Provider::Kakao),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Kakao => "kakao",
        }
    }

    fn authorize_endpoint(&self) -> &'static str {
        match self {
            Provider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            Provider::Kakao => "https://kauth.kakao.com/oauth/authorize",
        }
    }

    fn token_endpoint(&self) -> &'static str {
        match self {
            Provider::Google => "https://oauth2.googleapis.com/token",
            Provider::Kakao => "https://kauth.kakao.com/oauth/token",
        }
    }

    fn userinfo_endpoint(&self) -> &'static str {
        match self {
            Provider::Google => "https://openidconnect.googleapis.com/v1/userinfo",
            Provider::Kakao => "https://kapi.kakao.com/v2/user/me",
        }
    }

    fn extra_authorize_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Provider::Google => &[
                ("scope", "openid email profile"),
                ("prompt", "consent"),
                ("access_type", "offline"),
            ],
            Provider::Kakao => &[],
        }
    }

    /// Pulls the account id and candidate profile out of a userinfo payload.
    pub fn parse_profile(&self, v: &Value) -> anyhow::Result<(String, SignInUser)> {
        match self {
            Provider::Google => {
                let id = v["sub"].as_str().context("google profile without sub")?;
                Ok((
                    id.to_string(),
                    SignInUser {
                        email: str_field(&v["email"]),
                        name: str_field(&v["name"]),
                        image: str_field(&v["picture"]),
                    },
                ))
            }
            Provider::Kakao => {
                let id = match &v["id"] {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s.clone(),
                    _ => anyhow::bail!("kakao profile without id"),
                };
                let account = &v["kakao_account"];
                let profile = &account["profile"];
                Ok((
                    id,
                    SignInUser {
                        email: str_field(&account["email"]),
                        name: str_field(&profile["nickname"])
                            .or_else(|| str_field(&v["properties"]["nickname"])),
                        image: str_field(&profile["profile_image_url"])
                            .or_else(|| str_field(&v["properties"]["profile_image"])),
                    },
                ))
            }
        }
    }
}

fn str_field(v: &Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
    id_token: Option<String>,
}

impl TokenResponse {
    fn into_tokens(self, now: OffsetDateTime) -> AccountTokens {
        AccountTokens {
            expires_at: self.expires_in.map(|s| now.unix_timestamp() + s),
            access_token: Some(self.access_token),
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            scope: self.scope,
            id_token: self.id_token,
        }
    }
}

pub struct OAuthClient {
    provider: Provider,
    cfg: OAuthClientConfig,
    redirect_uri: String,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(provider: Provider, cfg: OAuthClientConfig, base_url: &str, http: reqwest::Client) -> Self {
        Self {
            redirect_uri: format!("{}/api/auth/callback/{}", base_url, provider.as_str()),
            provider,
            cfg,
            http,
        }
    }

    pub fn authorize_url(&self, state: &str) -> anyhow::Result<String> {
        let mut params = vec![
            ("client_id", self.cfg.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("state", state),
        ];
        params.extend_from_slice(self.provider.extra_authorize_params());
        let url = Url::parse_with_params(self.provider.authorize_endpoint(), &params)?;
        Ok(url.into())
    }

    /// Trades the authorization code for tokens and the provider profile.
    #[instrument(skip(self, code), fields(provider = self.provider.as_str()))]
    pub async fn exchange(&self, code: &str) -> anyhow::Result<SignInCallback> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.cfg.client_id.as_str()),
            ("client_secret", self.cfg.client_secret.as_str()),
        ];
        let token: TokenResponse = self
            .http
            .post(self.provider.token_endpoint())
            .form(&form)
            .send()
            .await
            .context("token request")?
            .error_for_status()
            .context("token endpoint rejected code")?
            .json()
            .await
            .context("decode token response")?;

        let profile: Value = self
            .http
            .get(self.provider.userinfo_endpoint())
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("userinfo request")?
            .error_for_status()
            .context("userinfo endpoint rejected token")?
            .json()
            .await
            .context("decode userinfo")?;

        let (provider_account_id, user) = self.provider.parse_profile(&profile)?;
        debug!(%provider_account_id, has_email = user.email.is_some(), "provider profile fetched");

        Ok(SignInCallback {
            user: Some(user),
            account: Some(ExternalAccount {
                provider: self.provider.as_str().to_string(),
                provider_account_id,
                kind: "oauth".into(),
                tokens: token.into_tokens(OffsetDateTime::now_utc()),
            }),
            profile: Some(profile),
        })
    }
}

/// Configured providers; an absent entry means the provider is disabled.
#[derive(Default)]
pub struct OAuthProviders {
    clients: HashMap<Provider, OAuthClient>,
}

impl OAuthProviders {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let http = reqwest::Client::new();
        let mut clients = HashMap::new();
        for (provider, client_cfg) in [
            (Provider::Google, &cfg.auth.google),
            (Provider::Kakao, &cfg.auth.kakao),
        ] {
            if let Some(c) = client_cfg {
                clients.insert(
                    provider,
                    OAuthClient::new(provider, c.clone(), &cfg.base_url, http.clone()),
                );
            }
        }
        Self { clients }
    }

    pub fn get(&self, provider: Provider) -> Option<&OAuthClient> {
        self.clients.get(&provider)
    }
}

/// Where to send the browser after sign-in: relative paths resolve against
/// `base_url`, same-origin absolute URLs pass through, anything else falls back.
pub fn resolve_redirect(target: Option<&str>, base_url: &str) -> String {
    let Some(target) = target.filter(|t| !t.is_empty()) else {
        return base_url.to_string();
    };
    if target.starts_with('/') && !target.starts_with("//") {
        return format!("{}{}", base_url, target);
    }
    match (Url::parse(target), Url::parse(base_url)) {
        (Ok(t), Ok(b)) if t.origin() == b.origin() => target.to_string(),
        _ => base_url.to_string(),
    }
}
