use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{ClinicDetail, ClinicSummary};
use super::filter::ClinicFilter;
use super::repo;
use crate::error::{AppError, AppResult};
use crate::images;
use crate::pagination::{PageRequest, Paginated};
use crate::reviews::{self, aggregate::RatingSummary};

pub const DETAIL_REVIEW_LIMIT: i64 = 10;

pub async fn list_clinics(
    db: &PgPool,
    filter: &ClinicFilter,
    page: PageRequest,
) -> anyhow::Result<Paginated<ClinicSummary>> {
    let rows = repo::list(db, filter, page).await?;
    let total = repo::count(db, filter).await?;
    Ok(Paginated {
        data: rows.into_iter().map(ClinicSummary::from).collect(),
        pagination: page.with_total(total),
    })
}

pub async fn clinic_detail(db: &PgPool, id: Uuid) -> AppResult<ClinicDetail> {
    let clinic = repo::find_active(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Clinic not found"))?;

    let images = images::repo::list_for_clinic(db, id).await?;
    let treatments = repo::active_treatments(db, id).await?;
    let promotions = repo::running_promotions(db, id).await?;

    let review_rows = reviews::repo::list_for_clinic(db, id, DETAIL_REVIEW_LIMIT, 0).await?;
    let shown: Vec<i32> = review_rows.iter().map(|r| r.rating).collect();
    let total = reviews::repo::count_for_clinic(db, id).await?;
    let reviews = reviews::services::with_images(db, review_rows).await?;

    Ok(ClinicDetail {
        clinic: clinic.into(),
        images,
        treatments: treatments.into_iter().map(Into::into).collect(),
        reviews,
        promotions: promotions.into_iter().map(Into::into).collect(),
        review_count: total,
        rating: RatingSummary::new(&shown, total),
    })
}
