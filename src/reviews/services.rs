use std::collections::HashMap;

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::dto::{CreateReviewRequest, ReviewImage, ReviewView};
use super::repo;
use super::repo_types::ReviewRow;
use crate::clinics;
use crate::error::{AppError, AppResult};
use crate::pagination::{PageRequest, Paginated};
use crate::treatments;

/// Attaches each review's images, preserving row order.
pub async fn with_images(db: &PgPool, rows: Vec<ReviewRow>) -> anyhow::Result<Vec<ReviewView>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut by_review: HashMap<Uuid, Vec<ReviewImage>> = HashMap::new();
    for img in repo::images_for(db, &ids).await? {
        by_review.entry(img.review_id).or_default().push(img.into());
    }
    Ok(rows
        .into_iter()
        .map(|r| {
            let images = by_review.remove(&r.id).unwrap_or_default();
            ReviewView::from_row(r, images)
        })
        .collect())
}

pub async fn list_for_clinic(
    db: &PgPool,
    clinic_id: Uuid,
    page: PageRequest,
) -> anyhow::Result<Paginated<ReviewView>> {
    let rows = repo::list_for_clinic(db, clinic_id, page.limit, page.skip()).await?;
    let total = repo::count_for_clinic(db, clinic_id).await?;
    Ok(Paginated {
        data: with_images(db, rows).await?,
        pagination: page.with_total(total),
    })
}

pub async fn create_review(
    db: &PgPool,
    user_id: Uuid,
    req: CreateReviewRequest,
) -> AppResult<ReviewView> {
    req.validate()?;

    if clinics::repo::activity(db, req.clinic_id).await? != Some(true) {
        return Err(AppError::not_found("Clinic not found"));
    }
    if let Some(t) = req.treatment_id {
        if !treatments::repo::exists(db, t).await? {
            return Err(AppError::not_found("Treatment not found"));
        }
    }

    let mut tx = db.begin().await.context("begin tx")?;
    let review_id = repo::insert_review_tx(&mut tx, user_id, &req).await?;
    for (i, url) in req.images.iter().enumerate() {
        repo::insert_review_image_tx(&mut tx, review_id, url, i as i32).await?;
    }
    tx.commit().await.context("commit tx")?;
    info!(%review_id, clinic_id = %req.clinic_id, %user_id, "review created");

    let row = repo::find_by_id(db, review_id)
        .await?
        .context("created review vanished")?;
    let mut views = with_images(db, vec![row]).await?;
    views
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("created review vanished")))
}
