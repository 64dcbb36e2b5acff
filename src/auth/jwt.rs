use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::oauth::Provider;
use crate::state::AppState;

const STATE_AUDIENCE: &str = "oauth-state";
const STATE_TTL: Duration = Duration::from_secs(10 * 60);
const NONCE_LEN: usize = 32;

/// Payload of the `state` parameter round-tripped through the provider.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StateClaims {
    pub provider: Provider,
    pub callback_url: Option<String>,
    /// Must equal the browser's state cookie on callback.
    pub nonce: String,
    pub iat: usize,
    pub exp: usize,
    pub aud: String,
}

/// Signs and verifies OAuth `state` tokens.
#[derive(Clone)]
pub struct StateKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for StateKeys {
    fn from_ref(state: &AppState) -> Self {
        StateKeys::new(&state.config.auth.secret)
    }
}

impl StateKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: STATE_TTL,
        }
    }

    pub fn sign(
        &self,
        provider: Provider,
        callback_url: Option<String>,
        nonce: &str,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = StateClaims {
            provider,
            callback_url,
            nonce: nonce.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            aud: STATE_AUDIENCE.to_string(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(provider = provider.as_str(), "oauth state signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str, provider: Provider) -> anyhow::Result<StateClaims> {
        let mut validation = Validation::default();
        validation.set_audience(&[STATE_AUDIENCE]);
        let data = decode::<StateClaims>(token, &self.decoding, &validation)?;
        if data.claims.provider != provider {
            anyhow::bail!("state was issued for another provider");
        }
        Ok(data.claims)
    }
}

/// Random value tying an OAuth `state` to the browser that started the sign-in.
pub fn new_nonce() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), NONCE_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_state() {
        let keys = StateKeys::new("dev-secret");
        let token = keys
            .sign(Provider::Kakao, Some("/clinics".into()), "n0nce")
            .expect("sign state");
        let claims = keys.verify(&token, Provider::Kakao).expect("verify state");
        assert_eq!(claims.provider, Provider::Kakao);
        assert_eq!(claims.callback_url.as_deref(), Some("/clinics"));
        assert_eq!(claims.nonce, "n0nce");
    }

    #[test]
    fn verify_rejects_other_provider() {
        let keys = StateKeys::new("dev-secret");
        let token = keys.sign(Provider::Google, None, "n").expect("sign state");
        let err = keys.verify(&token, Provider::Kakao).unwrap_err();
        assert!(err.to_string().contains("another provider"));
    }

    #[test]
    fn verify_rejects_foreign_secret() {
        let good = StateKeys::new("secret-a");
        let bad = StateKeys::new("secret-b");
        let token = good.sign(Provider::Google, None, "n").expect("sign state");
        assert!(bad.verify(&token, Provider::Google).is_err());
    }

    #[test]
    fn nonces_are_random() {
        let a = new_nonce();
        assert_eq!(a.len(), NONCE_LEN);
        assert_ne!(a, new_nonce());
    }
}
