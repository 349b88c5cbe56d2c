//! Pagination types shared by list endpoints

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamped to valid ranges
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Build from optional query values
    pub fn from_query(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self::new(page.unwrap_or(1), per_page.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        ((self.total as u64 + self.per_page as u64 - 1) / self.per_page as u64) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Transform the items, keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
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
    fn test_list_params_clamps() {
        let params = ListParams::new(0, 1000);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, MAX_PAGE_SIZE);

        let params = ListParams::new(3, 0);
        assert_eq!(params.per_page, 1);
    }

    #[test]
    fn test_list_params_offset() {
        assert_eq!(ListParams::new(1, 20).offset(), 0);
        assert_eq!(ListParams::new(3, 20).offset(), 40);
    }

    #[test]
    fn test_from_query_defaults() {
        let params = ListParams::from_query(None, None);
        assert_eq!(params, ListParams::default());
        assert_eq!(params.per_page, 20);
    }

    #[test]
    fn test_total_pages() {
        let params = ListParams::new(1, 20);
        assert_eq!(PagedResult::<i32>::new(vec![], 0, &params).total_pages(), 0);
        assert_eq!(PagedResult::<i32>::new(vec![], 20, &params).total_pages(), 1);
        assert_eq!(PagedResult::<i32>::new(vec![], 21, &params).total_pages(), 2);
        assert!(PagedResult::<i32>::new(vec![], 21, &params).has_next());
    }
}
