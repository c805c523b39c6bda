//! Paged list responses.

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
pub const DEFAULT_PER_PAGE: u32 = 24;
/// Upper bound on page size.
pub const MAX_PER_PAGE: u32 = 100;

/// Page request parameters (`?page=2&perPage=24`). Pages are 1-based.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    #[must_use]
    pub fn page(self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.per_page())
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, query: PageQuery) -> Self {
        Self {
            items,
            total,
            page: query.page(),
            per_page: query.per_page(),
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> i64 {
        let per_page = i64::from(self.per_page.max(1));
        (self.total + per_page - 1) / per_page
    }

    /// Convert every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let q = PageQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(q.offset(), 0);

        let q = PageQuery {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn test_offset() {
        let q = PageQuery {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(q.offset(), 20);
        assert_eq!(q.limit(), 10);
    }

    #[test]
    fn test_total_pages() {
        let page: Page<u8> = Page::new(vec![], 21, PageQuery {
            page: None,
            per_page: Some(10),
        });
        assert_eq!(page.total_pages(), 3);
    }
}
