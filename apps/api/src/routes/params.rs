/// Default and maximum page size for list endpoints.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Offset/limit window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    /// Negative skips become 0; limit is clamped to 1..=100 and defaults to 100.
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            offset: skip.unwrap_or(0).max(0),
            limit: limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Trimmed value, or `None` when absent or blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamps() {
        assert_eq!(Page::default(), Page { offset: 0, limit: 100 });
        assert_eq!(Page::new(Some(-5), Some(0)), Page { offset: 0, limit: 1 });
        assert_eq!(Page::new(Some(20), Some(500)), Page { offset: 20, limit: 100 });
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Platform ")), Some("Platform"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
