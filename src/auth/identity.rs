//! Reconciles an external sign-in with the local `users`/`accounts` rows.
//!
//! A sign-in event moves through
//! `RECEIVED -> EMAIL_ENSURED -> LINKED -> PATCH_SCHEDULED -> {APPLIED | SKIPPED}`.
//! Linking (creating or finding the User and Account) is atomic and owned by
//! [`IdentityStore::link_identity`]. The provider metadata patch that follows is
//! best effort: it either runs inline or is detached after a fixed delay, and
//! its failures are logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dto::{ExternalAccount, Session, SessionUser, SignInCallback, SignInUser};
use crate::config::PatchMode;

/// Placeholder email for providers that don't share one.
pub fn synthesize_email(provider: &str, provider_account_id: &str) -> String {
    format!("{provider}_{provider_account_id}@{provider}.local")
}

/// Fills in `user.email` when the provider left it out and returns the join key.
pub fn ensure_email<'a>(user: &'a mut SignInUser, account: &ExternalAccount) -> &'a str {
    let missing = user.email.as_deref().map_or(true, |e| e.trim().is_empty());
    if missing {
        let email = synthesize_email(&account.provider, &account.provider_account_id);
        debug!(provider = %account.provider, %email, "synthesized email for provider without one");
        user.email = Some(email);
    }
    user.email.as_deref().unwrap_or_default()
}

/// Provider metadata copied onto the User row after linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPatch {
    pub provider: String,
    pub provider_id: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl ProviderPatch {
    pub fn new(user: &SignInUser, account: &ExternalAccount) -> Self {
        Self {
            provider: account.provider.clone(),
            provider_id: account.provider_account_id.clone(),
            name: user.name.clone().filter(|n| !n.is_empty()),
            avatar: user.image.clone().filter(|i| !i.is_empty()),
        }
    }
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Returns the owner of `account`, creating the User (keyed by `email`) and
    /// the Account link when they don't exist yet.
    async fn link_identity(
        &self,
        email: &str,
        user: &SignInUser,
        account: &ExternalAccount,
    ) -> anyhow::Result<Uuid>;

    /// Overwrites provider fields on the user with `email`; returns rows touched.
    async fn apply_provider_patch(&self, email: &str, patch: &ProviderPatch) -> anyhow::Result<u64>;

    async fn find_session_user(&self, user_id: Uuid) -> anyhow::Result<Option<SessionUser>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Applied,
    Skipped,
    /// Detached; its terminal state is only visible in the logs.
    Scheduled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub allowed: bool,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub patch: Option<PatchStatus>,
}

impl SignInOutcome {
    fn passthrough() -> Self {
        Self {
            allowed: true,
            user_id: None,
            email: None,
            patch: None,
        }
    }
}

#[derive(Clone)]
pub struct IdentityReconciler {
    store: Arc<dyn IdentityStore>,
    mode: PatchMode,
}

impl IdentityReconciler {
    pub fn new(store: Arc<dyn IdentityStore>, mode: PatchMode) -> Self {
        Self { store, mode }
    }

    /// Handles a provider callback. A missing `user` or `account` is trusted as-is.
    #[instrument(skip_all, fields(provider = tracing::field::Empty))]
    pub async fn sign_in(&self, callback: SignInCallback) -> anyhow::Result<SignInOutcome> {
        let (Some(mut user), Some(account)) = (callback.user, callback.account) else {
            debug!("sign-in without user/account payload; nothing to reconcile");
            return Ok(SignInOutcome::passthrough());
        };
        tracing::Span::current().record("provider", account.provider.as_str());

        let email = ensure_email(&mut user, &account).to_string();
        let user_id = self.store.link_identity(&email, &user, &account).await?;
        info!(%user_id, %email, "identity linked");

        let patch = ProviderPatch::new(&user, &account);
        let status = match self.mode {
            PatchMode::Inline => run_patch(self.store.as_ref(), &email, &patch).await,
            PatchMode::Deferred(delay) => {
                let store = Arc::clone(&self.store);
                let email = email.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    run_patch(store.as_ref(), &email, &patch).await;
                });
                PatchStatus::Scheduled
            }
        };

        Ok(SignInOutcome {
            allowed: true,
            user_id: Some(user_id),
            email: Some(email),
            patch: Some(status),
        })
    }

    /// Refreshes the session's user fields from the store. A missing row or a
    /// failed lookup leaves the session as it was.
    pub async fn materialize(&self, mut session: Session) -> Session {
        match self.store.find_session_user(session.user.id).await {
            Ok(Some(fresh)) => session.user = fresh,
            Ok(None) => debug!(user_id = %session.user.id, "session user missing; keeping cached fields"),
            Err(e) => warn!(error = %e, user_id = %session.user.id, "session user lookup failed"),
        }
        session
    }
}

async fn run_patch(store: &dyn IdentityStore, email: &str, patch: &ProviderPatch) -> PatchStatus {
    match store.apply_provider_patch(email, patch).await {
        Ok(0) => {
            info!(%email, "provider patch skipped: user not found");
            PatchStatus::Skipped
        }
        Ok(_) => {
            info!(%email, provider = %patch.provider, "provider info updated");
            PatchStatus::Applied
        }
        Err(e) => {
            warn!(error = %e, %email, "provider patch skipped");
            PatchStatus::Skipped
        }
    }
}
