//! Pagination types for folder listings.

use serde::{Deserialize, Serialize};

/// Default page size.
const DEFAULT_LIMIT: u32 = 50;
/// Maximum page size.
const MAX_LIMIT: u32 = 500;

/// Limit/offset window for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of rows per kind returned.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Number of rows skipped.
    #[serde(default)]
    pub offset: u32,
}

impl PageRequest {
    /// Create a new page request, clamping the limit to `1..=500`.
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset,
        }
    }

    /// Return the SQL `LIMIT` value.
    pub fn sql_limit(&self) -> i64 {
        i64::from(self.limit.clamp(1, MAX_LIMIT))
    }

    /// Return the SQL `OFFSET` value.
    pub fn sql_offset(&self) -> i64 {
        i64::from(self.offset)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(PageRequest::new(0, 0).limit, 1);
        assert_eq!(PageRequest::new(10_000, 5).sql_limit(), 500);
        assert_eq!(PageRequest::new(20, 40).sql_offset(), 40);
    }

    #[test]
    fn test_deserialize_defaults() {
        let page: PageRequest = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(page, PageRequest::default());
    }
}
