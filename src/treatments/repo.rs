use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::Category;
use crate::clinics::filter::escape_like;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    pub id: Uuid,
    pub name: String,
    pub name_en: Option<String>,
    pub category: String,
    pub description: Option<String>,
}

pub async fn exists(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM treatments WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await
        .context("treatment exists")?;
    Ok(found)
}

/// Catalog ordered by name, optionally narrowed to a category or to what a
/// clinic actively offers.
pub async fn list(
    db: &PgPool,
    clinic_id: Option<Uuid>,
    category: Option<Category>,
) -> anyhow::Result<Vec<Treatment>> {
    let rows = sqlx::query_as::<_, Treatment>(
        r#"
        SELECT t.id, t.name, t.name_en, t.category, t.description
          FROM treatments t
         WHERE ($1::text IS NULL OR t.category = $1)
           AND ($2::uuid IS NULL OR EXISTS (
                 SELECT 1 FROM clinic_treatments ct
                  WHERE ct.treatment_id = t.id
                    AND ct.clinic_id = $2
                    AND ct.is_active))
         ORDER BY t.name, t.id
        "#,
    )
    .bind(category.map(|c| c.as_str()))
    .bind(clinic_id)
    .fetch_all(db)
    .await
    .context("list treatments")?;
    Ok(rows)
}

/// Name matches for the search endpoint.
pub async fn search(db: &PgPool, q: &str, limit: i64) -> anyhow::Result<Vec<Treatment>> {
    let pattern = format!("%{}%", escape_like(q));
    let rows = sqlx::query_as::<_, Treatment>(
        r#"
        SELECT id, name, name_en, category, description
          FROM treatments
         WHERE name ILIKE $1 OR name_en ILIKE $1
         ORDER BY name, id
         LIMIT $2
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("search treatments")?;
    Ok(rows)
}
