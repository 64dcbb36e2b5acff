use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::dto::CreateReviewRequest;
use super::repo_types::{ReviewImageRow, ReviewRow};

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.clinic_id, r.treatment_id, r.rating, r.content,
           r.visit_date, r.created_at,
           u.name AS user_name, u.avatar AS user_avatar,
           t.name AS treatment_name, t.name_en AS treatment_name_en
      FROM reviews r
      JOIN users u ON u.id = r.user_id
      LEFT JOIN treatments t ON t.id = r.treatment_id
"#;

/// Active reviews of a clinic, newest first.
pub async fn list_for_clinic(
    db: &PgPool,
    clinic_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<ReviewRow>> {
    let sql = format!(
        "{REVIEW_SELECT} WHERE r.clinic_id = $1 AND r.is_active \
         ORDER BY r.created_at DESC, r.id LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as::<_, ReviewRow>(&sql)
        .bind(clinic_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list reviews by clinic")?;
    Ok(rows)
}

pub async fn count_for_clinic(db: &PgPool, clinic_id: Uuid) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reviews WHERE clinic_id = $1 AND is_active",
    )
    .bind(clinic_id)
    .fetch_one(db)
    .await
    .context("count reviews by clinic")?;
    Ok(n)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ReviewRow>> {
    let sql = format!("{REVIEW_SELECT} WHERE r.id = $1");
    let row = sqlx::query_as::<_, ReviewRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find review")?;
    Ok(row)
}

/// Images of the given reviews ordered by review then position.
pub async fn images_for(db: &PgPool, review_ids: &[Uuid]) -> anyhow::Result<Vec<ReviewImageRow>> {
    if review_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, ReviewImageRow>(
        r#"
        SELECT id, review_id, url, "order"
          FROM review_images
         WHERE review_id = ANY($1)
         ORDER BY review_id, "order", id
        "#,
    )
    .bind(review_ids)
    .fetch_all(db)
    .await
    .context("list review images")?;
    Ok(rows)
}

pub async fn insert_review_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    req: &CreateReviewRequest,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO reviews (user_id, clinic_id, treatment_id, rating, content, visit_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(req.clinic_id)
    .bind(req.treatment_id)
    .bind(req.rating)
    .bind(&req.content)
    .bind(req.visit_date)
    .fetch_one(&mut **tx)
    .await
    .context("insert review")?;
    Ok(id)
}

pub async fn insert_review_image_tx(
    tx: &mut Transaction<'_, Postgres>,
    review_id: Uuid,
    url: &str,
    order: i32,
) -> anyhow::Result<()> {
    sqlx::query(r#"INSERT INTO review_images (review_id, url, "order") VALUES ($1, $2, $3)"#)
        .bind(review_id)
        .bind(url)
        .bind(order)
        .execute(&mut **tx)
        .await
        .context("insert review image")?;
    Ok(())
}
