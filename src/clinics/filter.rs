use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::pagination::PageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Gangnam,
    Cheongdam,
    Apgujeong,
    Sinsa,
    Samsung,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Gangnam,
        Region::Cheongdam,
        Region::Apgujeong,
        Region::Sinsa,
        Region::Samsung,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Gangnam => "gangnam",
            Region::Cheongdam => "cheongdam",
            Region::Apgujeong => "apgujeong",
            Region::Sinsa => "sinsa",
            Region::Samsung => "samsung",
        }
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == raw)
            .ok_or_else(|| AppError::validation(format!("unknown region {raw}")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Rating,
    Reviews,
    PriceLow,
    PriceHigh,
    Newest,
}

impl SortKey {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw {
            "rating" => Ok(SortKey::Rating),
            "reviews" => Ok(SortKey::Reviews),
            "price-low" => Ok(SortKey::PriceLow),
            "price-high" => Ok(SortKey::PriceHigh),
            "newest" => Ok(SortKey::Newest),
            other => Err(AppError::validation(format!("unknown sort {other}"))),
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            SortKey::Rating | SortKey::Reviews => {
                " ORDER BY review_count DESC, c.created_at DESC, c.id"
            }
            SortKey::PriceLow => " ORDER BY min_price ASC NULLS LAST, c.created_at DESC, c.id",
            SortKey::PriceHigh => " ORDER BY min_price DESC NULLS LAST, c.created_at DESC, c.id",
            SortKey::Newest => " ORDER BY c.created_at DESC, c.id",
        }
    }
}

/// Raw `/clinics` query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicListQuery {
    pub region: Option<String>,
    pub search: Option<String>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub treatment_id: Option<Uuid>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub min_price: Option<i64>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub max_price: Option<i64>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub min_rating: Option<f64>,
    pub sort: Option<String>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub limit: Option<i64>,
}

/// Price bounds on an active clinic treatment, both inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl PriceRange {
    fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Validated listing filter, lowered into SQL by [`ClinicFilter::push_where`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClinicFilter {
    pub region: Option<Region>,
    pub search: Option<String>,
    pub treatment_id: Option<Uuid>,
    pub price: PriceRange,
    pub min_rating: Option<f64>,
    pub sort: SortKey,
}

impl ClinicFilter {
    pub fn from_query(q: &ClinicListQuery) -> AppResult<(Self, PageRequest)> {
        let region = non_blank(q.region.as_deref()).map(Region::parse).transpose()?;
        let sort = non_blank(q.sort.as_deref())
            .map(SortKey::parse)
            .transpose()?
            .unwrap_or_default();

        if q.min_price.is_some_and(|p| p < 0) || q.max_price.is_some_and(|p| p < 0) {
            return Err(AppError::validation("price bounds must be non-negative"));
        }
        if let (Some(lo), Some(hi)) = (q.min_price, q.max_price) {
            if lo > hi {
                return Err(AppError::validation("minPrice must not exceed maxPrice"));
            }
        }
        if let Some(r) = q.min_rating {
            if !(0.0..=5.0).contains(&r) {
                return Err(AppError::validation("minRating must be between 0 and 5"));
            }
        }

        let filter = Self {
            region,
            search: non_blank(q.search.as_deref()).map(str::to_string),
            treatment_id: q.treatment_id,
            price: PriceRange {
                min: q.min_price,
                max: q.max_price,
            },
            min_rating: q.min_rating,
            sort,
        };
        Ok((filter, PageRequest::new(q.page, q.limit)))
    }

    /// Appends the `WHERE` clause over clinics aliased as `c`.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE c.is_active");

        if let Some(region) = self.region {
            qb.push(" AND c.region = ").push_bind(region.as_str());
        }

        if let Some(search) = &self.search {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (c.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.name_en ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.address ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if self.treatment_id.is_some() || !self.price.is_unbounded() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM clinic_treatments ct \
                 WHERE ct.clinic_id = c.id AND ct.is_active",
            );
            if let Some(t) = self.treatment_id {
                qb.push(" AND ct.treatment_id = ").push_bind(t);
            }
            if let Some(min) = self.price.min {
                qb.push(" AND ct.price >= ").push_bind(min);
            }
            if let Some(max) = self.price.max {
                qb.push(" AND ct.price <= ").push_bind(max);
            }
            qb.push(")");
        }

        if let Some(min_rating) = self.min_rating {
            qb.push(
                " AND COALESCE((SELECT AVG(r.rating)::float8 FROM reviews r \
                 WHERE r.clinic_id = c.id AND r.is_active), 0) >= ",
            )
            .push_bind(min_rating);
        }
    }

    pub fn push_order_by(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(self.sort.order_by());
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Escapes `LIKE` metacharacters so user input matches literally.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
