//! Pagination types for list endpoints

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Pagination parameters (from query string)
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    /// Items per page
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Number of items to skip
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl PaginationParams {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            offset: offset.max(0),
        }
    }

    /// Clamp values that arrived unchecked from a query string
    pub fn normalized(self) -> Self {
        Self::new(self.limit, self.offset)
    }

    /// Apply to an in-memory, already ordered sequence
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let p = self.normalized();
        items
            .into_iter()
            .skip(p.offset as usize)
            .take(p.limit as usize)
            .collect()
    }
}

/// Paginated collection response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Total count of items matching the filter
    pub total: i64,
    /// Number of items in this page
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
    pub elements: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(elements: Vec<T>, total: i64, params: PaginationParams) -> Self {
        let params = params.normalized();
        Self {
            total,
            count: elements.len() as i64,
            limit: params.limit,
            offset: params.offset,
            elements,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            count: self.count,
            limit: self.limit,
            offset: self.offset,
            elements: self.elements.into_iter().map(f).collect(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.offset + self.count < self.total
    }
}
