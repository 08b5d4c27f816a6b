//! Seam between the listing engine and whatever serves the catalog.

use std::future::Future;

use product_catalog_core::ProductPage;

use crate::error::CatalogError;

/// One paginated request against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// Page size.
    pub limit: u32,
    /// Offset of the first item.
    pub skip: u64,
    /// Trimmed, non-empty search term. `None` means a plain listing request.
    pub search: Option<String>,
}

impl PageRequest {
    /// Plain pagination request.
    #[must_use]
    pub const fn page(limit: u32, skip: u64) -> Self {
        Self {
            limit,
            skip,
            search: None,
        }
    }

    /// Build a request, normalizing the search term.
    ///
    /// Whitespace is trimmed and an empty term means no search.
    #[must_use]
    pub fn new(limit: u32, skip: u64, search: Option<&str>) -> Self {
        let search = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string);
        Self {
            limit,
            skip,
            search,
        }
    }
}

/// A remote (or simulated) product catalog.
///
/// Implementations only need native pagination and free-text search.
pub trait CatalogSource: Send + Sync + 'static {
    /// Fetch one window of products, optionally restricted to a search term.
    fn fetch_products(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<ProductPage, CatalogError>> + Send;

    /// Fetch the list of category tags.
    fn fetch_categories(&self) -> impl Future<Output = Result<Vec<String>, CatalogError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_trims_search() {
        let request = PageRequest::new(12, 24, Some("  phone "));
        assert_eq!(request.search.as_deref(), Some("phone"));
    }

    #[test]
    fn test_page_request_blank_search_is_none() {
        assert_eq!(PageRequest::new(12, 0, Some("   ")), PageRequest::page(12, 0));
        assert_eq!(PageRequest::new(12, 0, None), PageRequest::page(12, 0));
    }
}
