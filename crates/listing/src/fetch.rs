//! Fetch operations built on a [`CatalogSource`].
//!
//! - [`fetch_page`] - one page of the remote listing or search (server mode)
//! - [`fetch_all_products`] - the entire catalog, paged through (client mode)

use product_catalog_core::{Product, ProductPage, skip_for};
use tracing::{debug, info, instrument, warn};

use crate::error::CatalogError;
use crate::source::{CatalogSource, PageRequest};

/// Fetch a 1-based page of products, optionally restricted to a search term.
///
/// A blank search term issues a plain pagination request.
///
/// # Errors
///
/// Returns `CatalogError::InvalidQuery` if `page` is 0 or `limit` is 0, or the
/// source error if the request fails.
#[instrument(skip(source))]
pub async fn fetch_page<S: CatalogSource>(
    source: &S,
    page: u32,
    limit: u32,
    search: &str,
) -> Result<ProductPage, CatalogError> {
    if page == 0 {
        return Err(CatalogError::InvalidQuery("page must be >= 1".to_string()));
    }
    if limit == 0 {
        return Err(CatalogError::InvalidQuery("limit must be > 0".to_string()));
    }

    let request = PageRequest::new(limit, skip_for(page, limit), Some(search));
    source.fetch_products(&request).await
}

/// Result of [`fetch_all_products`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedCatalog {
    pub products: Vec<Product>,
    /// Total the first response declared.
    pub declared_total: u64,
}

impl FetchedCatalog {
    /// Every declared product was received.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.products.len() as u64 >= self.declared_total
    }
}

/// Fetch every product by paging through the remote listing.
///
/// The first response declares the total; subsequent pages are requested
/// until that many products are accumulated. At most `ceil(total / page_size)`
/// requests are issued. Any failing page aborts the whole operation and the
/// partial accumulation is dropped. An empty page ends the fetch early; the
/// result then reports itself incomplete.
///
/// # Errors
///
/// Returns `CatalogError::InvalidQuery` if `page_size` is 0, or the error of
/// the first failing page request.
#[instrument(skip(source))]
pub async fn fetch_all_products<S: CatalogSource>(
    source: &S,
    page_size: u32,
) -> Result<FetchedCatalog, CatalogError> {
    if page_size == 0 {
        return Err(CatalogError::InvalidQuery("page size must be > 0".to_string()));
    }
    let step = u64::from(page_size);

    let first = source.fetch_products(&PageRequest::page(page_size, 0)).await?;
    let total = first.total;
    let max_requests = total.div_ceil(step).max(1);

    let mut all = first.products;
    let mut skip = step;
    let mut requests: u64 = 1;

    while (all.len() as u64) < total && requests < max_requests {
        let next = source.fetch_products(&PageRequest::page(page_size, skip)).await?;
        requests += 1;
        debug!(skip, received = next.products.len(), "Fetched catalog page");

        if next.products.is_empty() {
            break;
        }
        all.extend(next.products);
        skip += step;
    }

    let catalog = FetchedCatalog {
        products: all,
        declared_total: total,
    };
    if catalog.is_complete() {
        info!(products = catalog.products.len(), requests, "Fetched full catalog");
    } else {
        warn!(
            expected = total,
            received = catalog.products.len(),
            "Catalog returned fewer products than declared"
        );
    }
    Ok(catalog)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use product_catalog_core::ProductId;

    use super::*;
    use crate::memory::InMemoryCatalog;

    fn products(n: u64) -> Vec<Product> {
        (1..=n)
            .map(|id| Product {
                id: ProductId::new(id),
                title: format!("Product {id}"),
                description: String::new(),
                category: "misc".to_string(),
                brand: None,
                price: 1.0,
                discount_percentage: 0.0,
                rating: 0.0,
                stock: 1,
                thumbnail: String::new(),
                images: Vec::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_page_converts_page_to_skip() {
        let source = InMemoryCatalog::new(products(40));
        let page = fetch_page(&source, 3, 12, "").await.unwrap();
        assert_eq!(page.total, 40);
        assert_eq!(page.products.len(), 12);
        assert_eq!(page.products[0].id, ProductId::new(25));
        assert_eq!(source.requests(), vec![PageRequest::page(12, 24)]);
    }

    #[tokio::test]
    async fn test_fetch_page_search_is_trimmed() {
        let source = InMemoryCatalog::new(products(5));
        let page = fetch_page(&source, 1, 10, "  product 3 ").await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(source.search_requests(), vec!["product 3"]);
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_zero_page_and_limit() {
        let source = InMemoryCatalog::new(products(5));
        assert!(matches!(
            fetch_page(&source, 0, 10, "").await,
            Err(CatalogError::InvalidQuery(_))
        ));
        assert!(matches!(
            fetch_page(&source, 1, 0, "").await,
            Err(CatalogError::InvalidQuery(_))
        ));
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_three_requests_for_250() {
        let source = InMemoryCatalog::new(products(250));
        let all = fetch_all_products(&source, 100).await.unwrap();

        assert!(all.is_complete());
        assert_eq!(all.products.len(), 250);
        assert_eq!(
            source.requests(),
            vec![
                PageRequest::page(100, 0),
                PageRequest::page(100, 100),
                PageRequest::page(100, 200),
            ]
        );
        assert_eq!(all.products[249].id, ProductId::new(250));
    }

    #[tokio::test]
    async fn test_fetch_all_single_request_when_total_fits() {
        let source = InMemoryCatalog::new(products(30));
        let all = fetch_all_products(&source, 100).await.unwrap();
        assert_eq!(all.products.len(), 30);
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_empty_catalog() {
        let source = InMemoryCatalog::new(Vec::new());
        let all = fetch_all_products(&source, 100).await.unwrap();
        assert!(all.products.is_empty());
        assert!(all.is_complete());
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_stops_at_empty_page_and_reports_short() {
        let source = InMemoryCatalog::new(products(30)).declaring_total(45);
        let all = fetch_all_products(&source, 10).await.unwrap();

        assert_eq!(all.products.len(), 30);
        assert_eq!(all.declared_total, 45);
        assert!(!all.is_complete());
        // Fourth page came back empty
        assert_eq!(source.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_all_is_all_or_nothing() {
        let source = InMemoryCatalog::new(products(250)).failing_from_request(2);
        let err = fetch_all_products(&source, 100).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(source.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_zero_page_size() {
        let source = InMemoryCatalog::new(products(3));
        assert!(fetch_all_products(&source, 0).await.is_err());
    }
}
