use bytes::Bytes;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{repo, ClinicImage, ImageType};
use crate::error::{AppError, AppResult};
use crate::storage::{format_from_mime, MediaHost, UploadOptions};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Uploaded file as read off the multipart body.
pub struct FilePart {
    pub body: Bytes,
    pub content_type: String,
}

/// Multipart fields before validation.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<FilePart>,
    pub kind: Option<String>,
    pub order: Option<String>,
}

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub kind: ImageType,
    pub order: i32,
}

/// Checks presence, content type and size. Nothing here talks to the media host.
pub fn validate_upload(form: UploadForm) -> AppResult<UploadItem> {
    let file = form
        .file
        .ok_or_else(|| AppError::validation("file is required"))?;

    if format_from_mime(&file.content_type).is_none() {
        return Err(AppError::validation(
            "invalid file type; only JPEG, PNG and WebP are allowed",
        ));
    }
    if file.body.len() > MAX_IMAGE_BYTES {
        return Err(AppError::validation("file too large; maximum size is 10MB"));
    }

    let kind = match form.kind.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => ImageType::parse(raw)?,
        None => ImageType::default(),
    };
    let order = match form.order.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|_| AppError::validation("order must be an integer"))?,
        None => 0,
    };

    Ok(UploadItem {
        body: file.body,
        content_type: file.content_type,
        kind,
        order,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    #[serde(flatten)]
    pub image: ClinicImage,
    pub public_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: String,
    pub bytes: u64,
}

/// Pushes the file to the media host, then records it. The row is only
/// written once the upload succeeded.
pub async fn upload_and_link_image(
    db: &PgPool,
    media: &dyn MediaHost,
    clinic_id: Uuid,
    item: UploadItem,
) -> AppResult<UploadedImage> {
    let asset = media
        .upload(
            item.body,
            UploadOptions {
                folder: format!("clinics/{clinic_id}"),
                content_type: &item.content_type,
            },
        )
        .await
        .map_err(|e| {
            warn!(error = ?e, %clinic_id, "media upload failed");
            AppError::Upstream("failed to upload image".into())
        })?;

    let image = match repo::insert(db, clinic_id, &asset.secure_url, item.kind, item.order).await {
        Ok(image) => image,
        Err(e) => {
            if let Err(cleanup) = media.delete(&asset.public_id).await {
                warn!(error = ?cleanup, public_id = %asset.public_id, "orphaned media asset");
            }
            return Err(e.into());
        }
    };
    info!(image_id = %image.id, %clinic_id, bytes = asset.bytes, "clinic image stored");

    Ok(UploadedImage {
        image,
        public_id: asset.public_id,
        width: asset.width,
        height: asset.height,
        format: asset.format,
        bytes: asset.bytes,
    })
}

/// Removes an image of `clinic_id`. Remote deletion is best-effort; the row
/// is deleted regardless.
pub async fn delete_clinic_image(
    db: &PgPool,
    media: Option<&dyn MediaHost>,
    clinic_id: Uuid,
    image_id: Uuid,
) -> AppResult<()> {
    let image = repo::find(db, image_id)
        .await?
        .ok_or_else(|| AppError::not_found("Image not found"))?;
    if image.clinic_id != clinic_id {
        return Err(AppError::Forbidden("Image does not belong to this clinic".into()));
    }

    match media.and_then(|m| m.public_id_from_url(&image.url).map(|id| (m, id))) {
        Some((m, public_id)) => {
            if let Err(e) = m.delete(&public_id).await {
                warn!(error = ?e, %public_id, "remote image delete failed; removing row anyway");
            }
        }
        None => warn!(url = %image.url, "image url not managed by media host; skipping remote delete"),
    }

    repo::delete(db, image_id).await?;
    info!(%image_id, %clinic_id, "clinic image deleted");
    Ok(())
}

#[cfg(test)]
mod image_tests {
    use super::*;

    fn form(content_type: &str, size: usize) -> UploadForm {
        UploadForm {
            file: Some(FilePart {
                body: Bytes::from(vec![0u8; size]),
                content_type: content_type.into(),
            }),
            kind: None,
            order: None,
        }
    }

    #[test]
    fn missing_file() {
        let err = validate_upload(UploadForm::default()).err().unwrap();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn gif_is_rejected() {
        let err = validate_upload(form("image/gif", 1024)).err().unwrap();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn twelve_megabytes_is_rejected() {
        let err = validate_upload(form("image/png", 12 * 1024 * 1024)).err().unwrap();
        assert_eq!(err.to_string(), "file too large; maximum size is 10MB");
    }

    #[test]
    fn exactly_ten_megabytes_passes() {
        assert!(validate_upload(form("image/jpeg", MAX_IMAGE_BYTES)).is_ok());
    }

    #[test]
    fn type_and_order_fields() {
        let mut f = form("image/webp", 10);
        f.kind = Some("interior".into());
        f.order = Some("3".into());
        let item = validate_upload(f).unwrap();
        assert_eq!(item.kind, ImageType::Interior);
        assert_eq!(item.order, 3);

        let item = validate_upload(form("image/png", 10)).unwrap();
        assert_eq!(item.kind, ImageType::Main);
        assert_eq!(item.order, 0);

        let mut f = form("image/png", 10);
        f.order = Some("first".into());
        assert!(validate_upload(f).is_err());

        let mut f = form("image/png", 10);
        f.kind = Some("logo".into());
        assert!(validate_upload(f).is_err());
    }
}
