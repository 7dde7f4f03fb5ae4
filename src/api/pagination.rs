//! Pagination validator
//!
//! Turns the raw `page` / `page-size` query values into a typed pair of
//! positive integers. Missing values take the configured defaults; present
//! values must be positive decimal integers.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, PaginationConfig};

/// Query parameter carrying the page number.
pub const PAGE_PARAM: &str = "page";
/// Query parameter carrying the page size, both inbound and upstream.
pub const PAGE_SIZE_PARAM: &str = "page-size";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPagination")]
pub struct PaginationParams {
    pub page: u64,
    pub page_size: u64,
}

/// Unchecked wire form; converted through [`PaginationParams::new`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPagination {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_page_size", alias = "page-size")]
    page_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("page must be a positive integer, got {0:?}")]
    InvalidPage(String),
    #[error("page-size must be a positive integer, got {0:?}")]
    InvalidPageSize(String),
}

fn default_page() -> u64 {
    DEFAULT_PAGE
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TryFrom<RawPagination> for PaginationParams {
    type Error = PaginationError;

    fn try_from(raw: RawPagination) -> Result<Self, Self::Error> {
        Self::new(raw.page, raw.page_size)
    }
}

impl PaginationParams {
    /// Strict constructor: both values must be positive.
    pub fn new(page: u64, page_size: u64) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage(page.to_string()));
        }
        if page_size == 0 {
            return Err(PaginationError::InvalidPageSize(page_size.to_string()));
        }
        Ok(Self { page, page_size })
    }

    /// Validates raw query values against the built-in defaults (1 and 25).
    pub fn validate(
        raw_page: Option<&str>,
        raw_page_size: Option<&str>,
    ) -> Result<Self, PaginationError> {
        Self::validate_with(raw_page, raw_page_size, &PaginationConfig::default())
    }

    /// Validates raw query values, filling gaps from `defaults`.
    ///
    /// `defaults.max_page_size` is not enforced; an oversized page is logged
    /// and passed through.
    pub fn validate_with(
        raw_page: Option<&str>,
        raw_page_size: Option<&str>,
        defaults: &PaginationConfig,
    ) -> Result<Self, PaginationError> {
        let page = match raw_page {
            Some(raw) => parse_positive(raw).ok_or_else(|| PaginationError::InvalidPage(raw.to_string()))?,
            None => defaults.default_page,
        };
        let page_size = match raw_page_size {
            Some(raw) => {
                parse_positive(raw).ok_or_else(|| PaginationError::InvalidPageSize(raw.to_string()))?
            }
            None => defaults.default_page_size,
        };

        let params = Self::new(page, page_size)?;
        if params.exceeds(defaults.max_page_size) {
            tracing::warn!(
                page_size = params.page_size,
                max_page_size = defaults.max_page_size,
                "Requested page size exceeds configured maximum, forwarding unchanged"
            );
        }
        Ok(params)
    }

    pub fn exceeds(&self, max_page_size: u64) -> bool {
        self.page_size > max_page_size
    }
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_positive_trims_whitespace() {
        assert_eq!(parse_positive(" 7 "), Some(7));
        assert_eq!(parse_positive("0"), None);
        assert_eq!(parse_positive("-3"), None);
        assert_eq!(parse_positive(""), None);
    }
}
