use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::config::MediaConfig;

pub struct UploadOptions<'a> {
    pub folder: String,
    pub content_type: &'a str,
}

/// What the media host reports back for a stored asset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub secure_url: String,
    pub public_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: String,
    pub bytes: u64,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, body: Bytes, opts: UploadOptions<'_>) -> anyhow::Result<MediaAsset>;
    async fn delete(&self, public_id: &str) -> anyhow::Result<()>;
    /// Maps a stored URL back to the host's public id; `None` if the URL is not ours.
    fn public_id_from_url(&self, url: &str) -> Option<String>;
}

/// S3-compatible bucket behind a public URL prefix.
#[derive(Clone)]
pub struct S3MediaHost {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3MediaHost {
    pub async fn new(cfg: &MediaConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_url: cfg.public_url.clone(),
        })
    }
}

#[async_trait]
impl MediaHost for S3MediaHost {
    async fn upload(&self, body: Bytes, opts: UploadOptions<'_>) -> anyhow::Result<MediaAsset> {
        let format = format_from_mime(opts.content_type)
            .with_context(|| format!("unsupported content type {}", opts.content_type))?;
        let key = object_key(&opts.folder, Uuid::new_v4(), format);
        let size = body.len() as u64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(opts.content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {}", key))?;

        Ok(MediaAsset {
            secure_url: format!("{}/{}", self.public_url, key),
            public_id: key,
            width: None,
            height: None,
            format: format.to_string(),
            bytes: size,
        })
    }

    async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    fn public_id_from_url(&self, url: &str) -> Option<String> {
        strip_public_prefix(&self.public_url, url)
    }
}

pub(crate) fn object_key(folder: &str, id: Uuid, format: &str) -> String {
    format!("{}/{}.{}", folder.trim_matches('/'), id, format)
}

pub(crate) fn strip_public_prefix(public_url: &str, url: &str) -> Option<String> {
    let rest = url.strip_prefix(public_url)?.strip_prefix('/')?;
    (!rest.is_empty()).then(|| rest.to_string())
}

pub fn format_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
