use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::filter::ClinicFilter;
use super::repo_types::{ClinicListRow, ClinicRow, ClinicTreatmentRow, PromotionRow};
use crate::pagination::PageRequest;

const CLINIC_COLUMNS: &str = "c.id, c.name, c.name_en, c.address, c.address_en, c.latitude, \
     c.longitude, c.phone, c.website, c.operating_hours, c.region, c.created_at";

/// One page of active clinics matching `filter`, in the filter's sort order.
pub async fn list(
    db: &PgPool,
    filter: &ClinicFilter,
    page: PageRequest,
) -> anyhow::Result<Vec<ClinicListRow>> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
    qb.push(CLINIC_COLUMNS).push(
        r#",
        (SELECT COUNT(*) FROM reviews r
          WHERE r.clinic_id = c.id AND r.is_active) AS review_count,
        (SELECT ROUND(AVG(r.rating)::numeric, 1)::float8 FROM reviews r
          WHERE r.clinic_id = c.id AND r.is_active) AS average_rating,
        (SELECT MIN(ct.price) FROM clinic_treatments ct
          WHERE ct.clinic_id = c.id AND ct.is_active) AS min_price,
        (SELECT ci.url FROM clinic_images ci
          WHERE ci.clinic_id = c.id AND ci.type = 'main'
          ORDER BY ci."order", ci.created_at LIMIT 1) AS main_image
        FROM clinics c"#,
    );
    filter.push_where(&mut qb);
    filter.push_order_by(&mut qb);
    qb.push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.skip());

    let rows = qb
        .build_query_as::<ClinicListRow>()
        .fetch_all(db)
        .await
        .context("list clinics")?;
    Ok(rows)
}

pub async fn count(db: &PgPool, filter: &ClinicFilter) -> anyhow::Result<i64> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clinics c");
    filter.push_where(&mut qb);
    let total: i64 = qb
        .build_query_scalar::<i64>()
        .fetch_one(db)
        .await
        .context("count clinics")?;
    Ok(total)
}

pub async fn find_active(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ClinicRow>> {
    let sql = format!("SELECT {CLINIC_COLUMNS} FROM clinics c WHERE c.id = $1 AND c.is_active");
    let row = sqlx::query_as::<_, ClinicRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find active clinic")?;
    Ok(row)
}

/// `Some(is_active)` for a known clinic, `None` otherwise.
pub async fn activity(db: &PgPool, id: Uuid) -> anyhow::Result<Option<bool>> {
    let row = sqlx::query_scalar::<_, bool>("SELECT is_active FROM clinics WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("clinic activity")?;
    Ok(row)
}

pub async fn active_treatments(db: &PgPool, clinic_id: Uuid) -> anyhow::Result<Vec<ClinicTreatmentRow>> {
    let rows = sqlx::query_as::<_, ClinicTreatmentRow>(
        r#"
        SELECT ct.id, ct.treatment_id, ct.price, ct.currency, ct.duration,
               t.name AS treatment_name, t.name_en AS treatment_name_en,
               t.category, t.description
          FROM clinic_treatments ct
          JOIN treatments t ON t.id = ct.treatment_id
         WHERE ct.clinic_id = $1 AND ct.is_active
         ORDER BY t.name, ct.id
        "#,
    )
    .bind(clinic_id)
    .fetch_all(db)
    .await
    .context("list clinic treatments")?;
    Ok(rows)
}

/// Promotions flagged active whose date window contains now.
pub async fn running_promotions(db: &PgPool, clinic_id: Uuid) -> anyhow::Result<Vec<PromotionRow>> {
    let rows = sqlx::query_as::<_, PromotionRow>(
        r#"
        SELECT id, title, description, discount, start_date, end_date
          FROM promotions
         WHERE clinic_id = $1
           AND is_active
           AND start_date <= now()
           AND end_date >= now()
         ORDER BY end_date ASC
        "#,
    )
    .bind(clinic_id)
    .fetch_all(db)
    .await
    .context("list promotions")?;
    Ok(rows)
}
