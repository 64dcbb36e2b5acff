//! In-memory fakes and a scratch-database harness shared by the unit tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use uuid::Uuid;

use crate::auth::dto::{ExternalAccount, Role, SessionUser, SignInUser};
use crate::auth::identity::{IdentityStore, ProviderPatch};
use crate::storage::{format_from_mime, MediaAsset, MediaHost, UploadOptions};

#[derive(Debug, Clone)]
pub struct MemoryUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub role: Role,
}

#[derive(Default)]
pub struct MemoryIdentityStore {
    users: Mutex<Vec<MemoryUser>>,
    accounts: Mutex<Vec<(String, String, Uuid)>>,
    fail_patches: AtomicBool,
    patch_attempts: AtomicUsize,
}

impl MemoryIdentityStore {
    pub fn fail_patches(&self, fail: bool) {
        self.fail_patches.store(fail, Ordering::SeqCst);
    }

    pub fn patch_attempts(&self) -> usize {
        self.patch_attempts.load(Ordering::SeqCst)
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn user_by_email(&self, email: &str) -> Option<MemoryUser> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn set_role(&self, id: Uuid, role: Role) {
        if let Some(u) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            u.role = role;
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn link_identity(
        &self,
        email: &str,
        user: &SignInUser,
        account: &ExternalAccount,
    ) -> anyhow::Result<Uuid> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some((_, _, owner)) = accounts
            .iter()
            .find(|(p, id, _)| *p == account.provider && *id == account.provider_account_id)
        {
            return Ok(*owner);
        }
        let mut users = self.users.lock().unwrap();
        let owner = match users.iter().find(|u| u.email == email) {
            Some(u) => u.id,
            None => {
                let id = Uuid::new_v4();
                users.push(MemoryUser {
                    id,
                    email: email.to_string(),
                    name: user.name.clone(),
                    avatar: user.image.clone(),
                    provider: None,
                    provider_id: None,
                    role: Role::User,
                });
                id
            }
        };
        accounts.push((
            account.provider.clone(),
            account.provider_account_id.clone(),
            owner,
        ));
        Ok(owner)
    }

    async fn apply_provider_patch(&self, email: &str, patch: &ProviderPatch) -> anyhow::Result<u64> {
        self.patch_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_patches.load(Ordering::SeqCst) {
            anyhow::bail!("simulated store failure");
        }
        let mut users = self.users.lock().unwrap();
        let Some(u) = users.iter_mut().find(|u| u.email == email) else {
            return Ok(0);
        };
        u.provider = Some(patch.provider.clone());
        u.provider_id = Some(patch.provider_id.clone());
        if let Some(name) = &patch.name {
            u.name = Some(name.clone());
        }
        if let Some(avatar) = &patch.avatar {
            u.avatar = Some(avatar.clone());
        }
        Ok(1)
    }

    async fn find_session_user(&self, user_id: Uuid) -> anyhow::Result<Option<SessionUser>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| SessionUser {
                id: u.id,
                name: u.name.clone(),
                email: Some(u.email.clone()),
                image: u.avatar.clone(),
                role: u.role,
            }))
    }
}

/// Media host that records calls instead of talking to a bucket.
#[derive(Default)]
pub struct RecordingMedia {
    pub uploads: AtomicUsize,
    pub deletes: Mutex<Vec<String>>,
    pub fail_deletes: AtomicBool,
}

pub const FAKE_MEDIA_BASE: &str = "https://media.test/bucket";

#[async_trait]
impl MediaHost for RecordingMedia {
    async fn upload(&self, body: Bytes, opts: UploadOptions<'_>) -> anyhow::Result<MediaAsset> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let format = format_from_mime(opts.content_type).unwrap_or("bin");
        let public_id = format!("{}/{}.{}", opts.folder, Uuid::new_v4(), format);
        Ok(MediaAsset {
            secure_url: format!("{}/{}", FAKE_MEDIA_BASE, public_id),
            public_id,
            width: None,
            height: None,
            format: format.to_string(),
            bytes: body.len() as u64,
        })
    }

    async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
        self.deletes.lock().unwrap().push(public_id.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            anyhow::bail!("simulated media host outage");
        }
        Ok(())
    }

    fn public_id_from_url(&self, url: &str) -> Option<String> {
        crate::storage::strip_public_prefix(FAKE_MEDIA_BASE, url)
    }
}

impl RecordingMedia {
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

/// Fresh migrated database per test, created from `TEST_DATABASE_URL`.
/// Returns `None` when the variable is unset so DB-backed tests skip.
pub struct PgTestContext {
    pub db: PgPool,
    admin_url: String,
    db_name: String,
}

impl PgTestContext {
    pub async fn new() -> Option<Self> {
        let base = std::env::var("TEST_DATABASE_URL").ok()?;
        let (prefix, _) = base.rsplit_once('/')?;
        let admin_url = format!("{prefix}/postgres");
        let db_name = format!("clinic_test_{}", Uuid::new_v4().simple());

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&admin_url)
            .await
            .ok()?;
        admin
            .execute(format!("CREATE DATABASE \"{db_name}\"").as_str())
            .await
            .ok()?;
        admin.close().await;

        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect(&format!("{prefix}/{db_name}"))
            .await
            .ok()?;
        sqlx::migrate!("./migrations").run(&db).await.ok()?;
        Some(Self {
            db,
            admin_url,
            db_name,
        })
    }

    pub async fn cleanup(self) {
        self.db.close().await;
        if let Ok(admin) = PgPoolOptions::new().connect(&self.admin_url).await {
            let _ = admin
                .execute(format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.db_name).as_str())
                .await;
        }
    }
}
