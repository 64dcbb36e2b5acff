use serde::Serialize;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Page/limit pair after clamping raw query values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Self { page, limit }
    }

    /// Row offset of this page; saturates for absurdly large pages.
    pub fn skip(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn with_total(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total_pages(total, self.limit),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// `{ "data": .. }` envelope for single resources and unpaged lists.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_division_for_total_pages() {
        assert_eq!(total_pages(45, 20), 3);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
    }

    #[test]
    fn third_page_skips_forty() {
        let req = PageRequest::new(Some(3), Some(20));
        assert_eq!(req.skip(), 40);
        let p = req.with_total(45);
        assert_eq!(p.total_pages, 3);
        // rows remaining on the last page
        assert_eq!(p.total - req.skip(), 5);
    }

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 20 });
        assert_eq!(PageRequest::new(Some(0), Some(-5)), PageRequest { page: 1, limit: 20 });
        assert_eq!(PageRequest::new(Some(2), Some(500)).limit, MAX_LIMIT);
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let req = PageRequest::new(Some(i64::MAX), Some(20));
        assert_eq!(req.page, i64::MAX);
        assert_eq!(req.skip(), i64::MAX);
        assert_eq!(req.with_total(3).total_pages, 1);
    }

    #[test]
    fn pagination_serializes_camel_case() {
        let json = serde_json::to_value(PageRequest::new(Some(1), Some(10)).with_total(11)).unwrap();
        assert_eq!(json["totalPages"], 2);
        assert_eq!(json["limit"], 10);
    }
}
