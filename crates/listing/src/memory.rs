//! In-memory catalog source.
//!
//! Serves a fixed product list with the same pagination and search
//! semantics as the remote API. Used for offline runs from a JSON fixture
//! and to simulate slow or failing remotes.

use std::ops::Range;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use product_catalog_core::{Product, ProductPage};
use serde::Deserialize;

use crate::error::CatalogError;
use crate::source::{CatalogSource, PageRequest};

/// Catalog served from memory.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    inner: Arc<InMemoryCatalogInner>,
}

#[derive(Default)]
struct InMemoryCatalogInner {
    products: Vec<Product>,
    categories: Vec<String>,
    latency: Option<Duration>,
    failing: Option<Range<usize>>,
    declared_total: Option<u64>,
    requests: Mutex<Vec<PageRequest>>,
}

/// Fixture file shape: either a bare product array or a `/products` response.
#[derive(Deserialize)]
#[serde(untagged)]
enum Fixture {
    Products(Vec<Product>),
    Page(ProductPage),
}

impl InMemoryCatalog {
    /// Serve the given products, in order.
    ///
    /// Categories are derived from the products in first-seen order.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let mut categories: Vec<String> = Vec::new();
        for product in &products {
            if !categories.contains(&product.category) {
                categories.push(product.category.clone());
            }
        }

        Self {
            inner: Arc::new(InMemoryCatalogInner {
                products,
                categories,
                ..Default::default()
            }),
        }
    }

    /// Load products from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn from_json_file(path: &Path) -> Result<Self, std::io::Error> {
        let raw = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&raw)?;
        let products = match fixture {
            Fixture::Products(products) => products,
            Fixture::Page(page) => page.products,
        };
        Ok(Self::new(products))
    }

    /// Delay every request by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.rebuild(|inner| inner.latency = Some(latency))
    }

    /// Fail every request from the `n`th one on (0-based) with HTTP 500.
    #[must_use]
    pub fn failing_from_request(self, n: usize) -> Self {
        self.failing_requests(n..usize::MAX)
    }

    /// Fail the requests whose 0-based sequence numbers fall in `range`.
    #[must_use]
    pub fn failing_requests(self, range: Range<usize>) -> Self {
        self.rebuild(|inner| inner.failing = Some(range))
    }

    /// Report `total` on plain listing pages regardless of how many products
    /// are actually served.
    #[must_use]
    pub fn declaring_total(self, total: u64) -> Self {
        self.rebuild(|inner| inner.declared_total = Some(total))
    }

    /// All page requests received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<PageRequest> {
        self.inner
            .requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Search terms of all search requests received so far.
    #[must_use]
    pub fn search_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|request| request.search)
            .collect()
    }

    /// Number of products served.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.products.is_empty()
    }

    fn rebuild(self, configure: impl FnOnce(&mut InMemoryCatalogInner)) -> Self {
        let mut inner = InMemoryCatalogInner {
            products: self.inner.products.clone(),
            categories: self.inner.categories.clone(),
            latency: self.inner.latency,
            failing: self.inner.failing.clone(),
            declared_total: self.inner.declared_total,
            requests: Mutex::new(self.requests()),
        };
        configure(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Record the request and return its 0-based sequence number.
    fn record(&self, request: &PageRequest) -> usize {
        self.inner
            .requests
            .lock()
            .map(|mut guard| {
                guard.push(request.clone());
                guard.len() - 1
            })
            .unwrap_or_default()
    }

    fn matches(product: &Product, term: &str) -> bool {
        let term = term.to_lowercase();
        product.title.to_lowercase().contains(&term)
            || product.description.to_lowercase().contains(&term)
            || product.category.to_lowercase().contains(&term)
            || product
                .brand
                .as_deref()
                .is_some_and(|brand| brand.to_lowercase().contains(&term))
    }
}

impl CatalogSource for InMemoryCatalog {
    async fn fetch_products(&self, request: &PageRequest) -> Result<ProductPage, CatalogError> {
        let sequence = self.record(request);

        if let Some(latency) = self.inner.latency {
            tokio::time::sleep(latency).await;
        }

        if self
            .inner
            .failing
            .as_ref()
            .is_some_and(|range| range.contains(&sequence))
        {
            return Err(CatalogError::Status {
                status: 500,
                status_text: "Internal Server Error".to_string(),
                body: "simulated failure".to_string(),
            });
        }

        let matching: Vec<&Product> = match &request.search {
            Some(term) => self
                .inner
                .products
                .iter()
                .filter(|p| Self::matches(p, term))
                .collect(),
            None => self.inner.products.iter().collect(),
        };

        let total = match (&request.search, self.inner.declared_total) {
            (None, Some(declared)) => declared,
            _ => matching.len() as u64,
        };
        let products = matching
            .into_iter()
            .skip(usize::try_from(request.skip).unwrap_or(usize::MAX))
            .take(request.limit as usize)
            .cloned()
            .collect();

        Ok(ProductPage {
            products,
            total,
            skip: request.skip,
            limit: u64::from(request.limit),
        })
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, CatalogError> {
        if let Some(latency) = self.inner.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.inner.categories.clone())
    }
}

impl std::fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCatalog")
            .field("products", &self.inner.products.len())
            .field("latency", &self.inner.latency)
            .finish_non_exhaustive()
    }
}
