use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ClinicImage, ImageType};

/// Images of a clinic in display order.
pub async fn list_for_clinic(db: &PgPool, clinic_id: Uuid) -> anyhow::Result<Vec<ClinicImage>> {
    let rows = sqlx::query_as::<_, ClinicImage>(
        r#"
        SELECT id, clinic_id, url, type, "order", created_at
          FROM clinic_images
         WHERE clinic_id = $1
         ORDER BY "order" ASC, created_at ASC, id
        "#,
    )
    .bind(clinic_id)
    .fetch_all(db)
    .await
    .context("list clinic images")?;
    Ok(rows)
}

pub async fn insert(
    db: &PgPool,
    clinic_id: Uuid,
    url: &str,
    kind: ImageType,
    order: i32,
) -> anyhow::Result<ClinicImage> {
    let row = sqlx::query_as::<_, ClinicImage>(
        r#"
        INSERT INTO clinic_images (clinic_id, url, type, "order")
        VALUES ($1, $2, $3, $4)
        RETURNING id, clinic_id, url, type, "order", created_at
        "#,
    )
    .bind(clinic_id)
    .bind(url)
    .bind(kind.as_str())
    .bind(order)
    .fetch_one(db)
    .await
    .context("insert clinic image")?;
    Ok(row)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ClinicImage>> {
    let row = sqlx::query_as::<_, ClinicImage>(
        r#"SELECT id, clinic_id, url, type, "order", created_at FROM clinic_images WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find clinic image")?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query("DELETE FROM clinic_images WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete clinic image")?;
    Ok(res.rows_affected())
}
