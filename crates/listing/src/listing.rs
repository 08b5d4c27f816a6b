//! Strategy selection and fetch orchestration.
//!
//! [`ProductListing`] decides which data path a view needs, starts the
//! matching background fetch if the cache cannot already satisfy it, and
//! resolves the visible result from the caches.
//!
//! # Caching
//!
//! - Server pages are keyed by `(page, limit, search)` and stay fresh until
//!   explicitly refetched.
//! - The full catalog snapshot has a single fixed key and goes stale after the
//!   configured TTL (60 seconds by default). It is only fetched in client mode.
//! - Categories go stale after 30 minutes.
//!
//! A failed or short fetch is not retried while the same query stays active.
//! It is retried when its query becomes active again, or once a freshness
//! window has passed since the failure.
//!
//! A fetch only ever writes its own cache entry. A response for a view that
//! is no longer current therefore never shows up in the current view.

use std::sync::{Arc, Mutex};

use product_catalog_core::{ListingMode, Product, ProductPage};
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::cache::{AllProductsKey, CategoriesKey, PageKey, QueryCache, Refresh};
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::fetch::{fetch_all_products, fetch_page};
use crate::resolver::{CacheSnapshot, ViewState, VisibleResult, resolve};
use crate::source::CatalogSource;

/// Visibility engine for the product listing.
///
/// Cheaply cloneable; clones share caches and the catalog source.
pub struct ProductListing<S> {
    inner: Arc<ListingInner<S>>,
}

struct ListingInner<S> {
    source: S,
    fetch_all_page_size: u32,
    keep_previous_page: bool,
    pages: QueryCache<PageKey, ProductPage>,
    all_products: QueryCache<AllProductsKey, Arc<[Product]>>,
    categories: QueryCache<CategoriesKey, Arc<[String]>>,
    /// Last server signature resolved with data.
    last_shown_page: Mutex<Option<PageKey>>,
    /// Query the most recent evaluation asked for.
    active: Mutex<Option<ActiveQuery>>,
    /// Bumped after every completed fetch.
    changes: watch::Sender<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ActiveQuery {
    Page(PageKey),
    AllProducts,
}

impl<S> Clone for ProductListing<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CatalogSource> ProductListing<S> {
    /// Create a listing engine over `source`.
    #[must_use]
    pub fn new(source: S, config: &CatalogConfig) -> Self {
        let (changes, _) = watch::channel(0);

        Self {
            inner: Arc::new(ListingInner {
                source,
                fetch_all_page_size: config.fetch_all_page_size,
                keep_previous_page: config.keep_previous_page,
                pages: QueryCache::new(config.page_cache_capacity, None),
                all_products: QueryCache::new(1, Some(config.snapshot_ttl)),
                categories: QueryCache::new(1, Some(config.categories_ttl)),
                last_shown_page: Mutex::new(None),
                active: Mutex::new(None),
                changes,
            }),
        }
    }

    /// The catalog source backing this listing.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Receiver bumped every time a fetch completes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Start whatever fetch `view` needs and return the current result.
    ///
    /// Does not wait for the fetch. Only the active mode's query is touched:
    /// the full catalog is never fetched in server mode, and server pages are
    /// never fetched in client mode.
    #[instrument(skip(self, view), fields(mode = %view.mode(), page = view.page))]
    pub async fn evaluate(&self, view: &ViewState) -> VisibleResult {
        self.ensure(view, false).await;
        self.current(view).await
    }

    /// Like [`Self::evaluate`], then wait until the active query settles.
    pub async fn settle(&self, view: &ViewState) -> VisibleResult {
        let mut changes = self.subscribe();
        let mut result = self.evaluate(view).await;

        while result.is_fetching {
            if changes.changed().await.is_err() {
                break;
            }
            result = self.current(view).await;
        }
        result
    }

    /// Refresh the active query of `view` even if it is fresh or errored.
    pub async fn refetch(&self, view: &ViewState) -> VisibleResult {
        self.ensure(view, true).await;
        self.current(view).await
    }

    /// Resolve `view` from the caches without starting any fetch.
    pub async fn current(&self, view: &ViewState) -> VisibleResult {
        let snapshot = self.snapshot(view).await;
        let result = resolve(view, &snapshot);

        if result.mode == ListingMode::Server && snapshot.page.data.is_some() {
            self.set_last_shown_page(Some(view.page_key()));
        }
        result
    }

    /// Drop the full catalog snapshot so the next client-mode view refetches it.
    ///
    /// A snapshot fetch already in flight is kept, and its result lands stale.
    pub async fn invalidate_all_products(&self) {
        self.inner.all_products.invalidate(&AllProductsKey).await;
    }

    /// Category list, fetched at most once per freshness window.
    ///
    /// # Errors
    ///
    /// Returns the error of the most recent category fetch if there is no data.
    pub async fn categories(&self) -> Result<Arc<[String]>, Arc<CatalogError>> {
        let mut changes = self.subscribe();

        loop {
            if self.inner.categories.begin_fetch(&CategoriesKey, Refresh::IfStale).await {
                let result = self
                    .inner
                    .source
                    .fetch_categories()
                    .await
                    .map(Arc::from);
                self.inner.categories.complete(CategoriesKey, result).await;
                self.notify();
            }

            let snapshot = self.inner.categories.snapshot(&CategoriesKey).await;
            if snapshot.is_fetching {
                // The sender lives in `self`, so this only returns on a change
                let _ = changes.changed().await;
                continue;
            }
            match (snapshot.data, snapshot.error) {
                (Some(categories), _) => return Ok(categories),
                (None, Some(error)) => return Err(error),
                (None, None) => {}
            }
        }
    }

    async fn snapshot(&self, view: &ViewState) -> CacheSnapshot {
        match view.mode() {
            ListingMode::Server => {
                let key = view.page_key();
                let page = self.inner.pages.snapshot(&key).await;
                let previous_page = if page.data.is_none() && self.inner.keep_previous_page {
                    self.previous_page(&key).await
                } else {
                    None
                };
                CacheSnapshot {
                    page,
                    previous_page,
                    ..Default::default()
                }
            }
            ListingMode::Client => CacheSnapshot {
                all_products: self.inner.all_products.snapshot(&AllProductsKey).await,
                ..Default::default()
            },
        }
    }

    async fn previous_page(&self, current: &PageKey) -> Option<ProductPage> {
        let key = self.last_shown_page().filter(|key| key != current)?;
        self.inner.pages.snapshot(&key).await.data
    }

    async fn ensure(&self, view: &ViewState, force: bool) {
        let active = match view.mode() {
            ListingMode::Server => ActiveQuery::Page(view.page_key()),
            ListingMode::Client => ActiveQuery::AllProducts,
        };
        let refresh = if force {
            Refresh::Force
        } else if self.activate(&active) {
            Refresh::RetryErrors
        } else {
            Refresh::IfStale
        };

        match active {
            ActiveQuery::Page(key) => self.ensure_page(key, refresh).await,
            ActiveQuery::AllProducts => self.ensure_all_products(refresh).await,
        }
    }

    /// Record `active` as the current query. Returns `true` if it changed.
    fn activate(&self, active: &ActiveQuery) -> bool {
        self.inner
            .active
            .lock()
            .map(|mut guard| {
                let changed = guard.as_ref() != Some(active);
                if changed {
                    *guard = Some(active.clone());
                }
                changed
            })
            .unwrap_or_default()
    }

    async fn ensure_page(&self, key: PageKey, refresh: Refresh) {
        if !self.inner.pages.begin_fetch(&key, refresh).await {
            return;
        }
        debug!(page = key.page, limit = key.limit, search = %key.search, "Fetching page");

        let this = self.clone();
        tokio::spawn(async move {
            let result = fetch_page(&this.inner.source, key.page, key.limit, &key.search).await;
            this.inner.pages.complete(key, result).await;
            this.notify();
        });
    }

    async fn ensure_all_products(&self, refresh: Refresh) {
        if !self.inner.all_products.begin_fetch(&AllProductsKey, refresh).await {
            return;
        }
        debug!("Fetching full catalog");

        let this = self.clone();
        tokio::spawn(async move {
            let cache = &this.inner.all_products;
            match fetch_all_products(&this.inner.source, this.inner.fetch_all_page_size).await {
                Ok(catalog) if catalog.is_complete() => {
                    cache.complete(AllProductsKey, Ok(Arc::from(catalog.products))).await;
                }
                Ok(catalog) => {
                    cache.complete_partial(AllProductsKey, Arc::from(catalog.products)).await;
                }
                Err(e) => cache.complete(AllProductsKey, Err(e)).await,
            }
            this.notify();
        });
    }

    fn notify(&self) {
        self.inner.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    fn last_shown_page(&self) -> Option<PageKey> {
        self.inner
            .last_shown_page
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn set_last_shown_page(&self, key: Option<PageKey>) {
        if let Ok(mut guard) = self.inner.last_shown_page.lock() {
            *guard = key;
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for ProductListing<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductListing")
            .field("source", &self.inner.source)
            .field("fetch_all_page_size", &self.inner.fetch_all_page_size)
            .field("keep_previous_page", &self.inner.keep_previous_page)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use product_catalog_core::{ProductId, ProductsUiState, SortOption};

    use super::*;
    use crate::memory::InMemoryCatalog;
    use crate::source::PageRequest;

    fn products(n: u64) -> Vec<Product> {
        (1..=n)
            .map(|id| Product {
                id: ProductId::new(id),
                title: format!("Product {id}"),
                description: String::new(),
                category: if id % 2 == 0 { "even" } else { "odd" }.to_string(),
                brand: None,
                price: 100.0 - id as f64,
                discount_percentage: 0.0,
                rating: 0.0,
                stock: u32::from(id % 4 != 0),
                thumbnail: String::new(),
                images: Vec::new(),
            })
            .collect()
    }

    fn listing(source: InMemoryCatalog) -> ProductListing<InMemoryCatalog> {
        ProductListing::new(source, &CatalogConfig::default())
    }

    fn view_of(state: &ProductsUiState) -> ViewState {
        ViewState::new(state, "")
    }

    #[tokio::test]
    async fn test_server_mode_fetches_single_page() {
        let listing = listing(InMemoryCatalog::new(products(30)));
        let result = listing.settle(&view_of(&ProductsUiState::new())).await;

        assert_eq!(result.mode, ListingMode::Server);
        assert_eq!(result.total, 30);
        assert_eq!(result.items.len(), 12);
        assert_eq!(listing.source().requests(), vec![PageRequest::page(12, 0)]);
    }

    #[tokio::test]
    async fn test_evaluate_reports_loading_then_data() {
        let source = InMemoryCatalog::new(products(30)).with_latency(Duration::from_millis(50));
        let listing = listing(source);
        let view = view_of(&ProductsUiState::new());

        let first = listing.evaluate(&view).await;
        assert!(first.is_loading);
        assert!(first.is_fetching);
        assert!(first.items.is_empty());

        let settled = listing.settle(&view).await;
        assert!(!settled.is_loading);
        assert!(!settled.is_fetching);
        assert_eq!(settled.items.len(), 12);
        assert_eq!(listing.source().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_server_pages_cached_per_signature() {
        let listing = listing(InMemoryCatalog::new(products(30)));
        let mut state = ProductsUiState::new();

        listing.settle(&view_of(&state)).await;
        state.set_page(2);
        listing.settle(&view_of(&state)).await;
        state.set_page(1);
        listing.settle(&view_of(&state)).await;

        assert_eq!(
            listing.source().requests(),
            vec![PageRequest::page(12, 0), PageRequest::page(12, 12)]
        );
    }

    #[tokio::test]
    async fn test_client_mode_fetches_full_catalog_once() {
        let listing = listing(InMemoryCatalog::new(products(250)));
        let mut state = ProductsUiState::new();
        state.set_in_stock_only(true);

        let result = listing.settle(&view_of(&state)).await;
        assert_eq!(result.mode, ListingMode::Client);
        // Every fourth product is out of stock
        assert_eq!(result.total, 188);
        assert_eq!(listing.source().requests().len(), 3);

        state.set_sort(SortOption::PriceAsc);
        state.set_page(2);
        let sorted = listing.settle(&view_of(&state)).await;
        assert_eq!(sorted.items.len(), 12);
        assert_eq!(listing.source().requests().len(), 3);
    }

    #[tokio::test]
    async fn test_full_catalog_never_fetched_in_server_mode() {
        let listing = listing(InMemoryCatalog::new(products(250)));
        listing.settle(&view_of(&ProductsUiState::new())).await;
        assert_eq!(listing.source().requests(), vec![PageRequest::page(12, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_refetched_after_ttl() {
        let source = InMemoryCatalog::new(products(50)).with_latency(Duration::from_millis(10));
        let listing = listing(source);
        let mut state = ProductsUiState::new();
        state.set_sort(SortOption::RatingDesc);
        let view = view_of(&state);

        listing.settle(&view).await;
        tokio::time::advance(Duration::from_secs(30)).await;
        listing.settle(&view).await;
        assert_eq!(listing.source().requests().len(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        let stale = listing.evaluate(&view).await;
        // Stale data stays visible during the background refresh
        assert!(!stale.is_loading);
        assert!(stale.is_fetching);
        assert_eq!(stale.total, 50);

        listing.settle(&view).await;
        assert_eq!(listing.source().requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mode_switch_drops_client_total() {
        let listing = listing(InMemoryCatalog::new(products(30)));
        let mut state = ProductsUiState::new();
        state.toggle_category("odd");

        let client = listing.settle(&view_of(&state)).await;
        assert_eq!(client.mode, ListingMode::Client);
        assert_eq!(client.total, 15);

        state.reset_filters();
        let server = listing.settle(&view_of(&state)).await;
        assert_eq!(server.mode, ListingMode::Server);
        assert_eq!(server.total, 30);
    }

    #[tokio::test]
    async fn test_error_surfaces_and_is_not_retried_in_same_view() {
        let listing = listing(InMemoryCatalog::new(products(30)).failing_from_request(0));
        let view = view_of(&ProductsUiState::new());

        let result = listing.settle(&view).await;
        assert!(!result.is_loading);
        assert_eq!(result.error.as_ref().and_then(|e| e.status()), Some(500));

        listing.settle(&view).await;
        assert_eq!(listing.source().requests().len(), 1);

        listing.refetch(&view).await;
        listing.settle(&view).await;
        assert_eq!(listing.source().requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_retried_when_revisited() {
        let listing = listing(InMemoryCatalog::new(products(30)).failing_requests(0..1));
        let mut state = ProductsUiState::new();
        assert!(listing.settle(&view_of(&state)).await.error.is_some());

        state.set_page(2);
        listing.settle(&view_of(&state)).await;
        state.set_page(1);
        let result = listing.settle(&view_of(&state)).await;

        assert!(result.error.is_none());
        assert_eq!(result.items.len(), 12);
        assert_eq!(
            listing.source().requests(),
            vec![
                PageRequest::page(12, 0),
                PageRequest::page(12, 12),
                PageRequest::page(12, 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_snapshot_retried_on_mode_switch_back() {
        let listing = listing(InMemoryCatalog::new(products(30)).failing_requests(0..1));
        let mut state = ProductsUiState::new();
        state.set_in_stock_only(true);
        assert!(listing.settle(&view_of(&state)).await.error.is_some());
        listing.settle(&view_of(&state)).await;
        assert_eq!(listing.source().requests().len(), 1);

        state.set_in_stock_only(false);
        listing.settle(&view_of(&state)).await;
        state.set_in_stock_only(true);
        let client = listing.settle(&view_of(&state)).await;

        assert!(client.error.is_none());
        assert_eq!(client.total, 23);
        assert_eq!(listing.source().requests().len(), 3);
    }

    #[tokio::test]
    async fn test_short_snapshot_retried_on_mode_switch_back() {
        let listing = listing(InMemoryCatalog::new(products(30)).declaring_total(40));
        let mut state = ProductsUiState::new();
        state.set_in_stock_only(true);

        let short = listing.settle(&view_of(&state)).await;
        assert!(short.error.is_none());
        assert_eq!(short.total, 23);
        listing.settle(&view_of(&state)).await;
        assert_eq!(listing.source().requests().len(), 1);

        state.set_in_stock_only(false);
        listing.settle(&view_of(&state)).await;
        state.set_in_stock_only(true);
        listing.settle(&view_of(&state)).await;

        assert_eq!(
            listing.source().requests(),
            vec![
                PageRequest::page(100, 0),
                PageRequest::page(12, 0),
                PageRequest::page(100, 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_inactive_path_error_not_surfaced() {
        // First request (the full catalog's first page) fails
        let listing = listing(InMemoryCatalog::new(products(30)).failing_from_request(0));
        let mut state = ProductsUiState::new();
        state.set_in_stock_only(true);
        let client = listing.settle(&view_of(&state)).await;
        assert!(client.error.is_some());

        // Server mode has its own query, which also fails, but the client error is gone
        state.set_in_stock_only(false);
        let server = listing.current(&view_of(&state)).await;
        assert!(server.error.is_none());
        assert!(server.is_loading);
    }

    #[tokio::test]
    async fn test_categories_cached() {
        let listing = listing(InMemoryCatalog::new(products(4)));
        let first = listing.categories().await.unwrap();
        let second = listing.categories().await.unwrap();
        assert_eq!(&*first, &["odd".to_string(), "even".to_string()]);
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_categories_share_one_fetch() {
        let source = InMemoryCatalog::new(products(4)).with_latency(Duration::from_millis(50));
        let listing = listing(source);

        let (first, second) = tokio::join!(listing.categories(), listing.categories());
        assert_eq!(first.unwrap(), second.unwrap());
        assert!(!listing.inner.categories.snapshot(&CategoriesKey).await.is_fetching);
    }

    #[tokio::test]
    async fn test_invalidate_all_products_forces_refetch() {
        let source = InMemoryCatalog::new(products(10)).with_latency(Duration::from_millis(10));
        let listing = listing(source);
        let mut state = ProductsUiState::new();
        state.set_price_max(Some(95.0));
        let view = view_of(&state);

        listing.settle(&view).await;
        listing.invalidate_all_products().await;
        let result = listing.evaluate(&view).await;
        assert!(result.is_loading);
        listing.settle(&view).await;
        assert_eq!(listing.source().requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_during_fetch_lands_stale() {
        let source = InMemoryCatalog::new(products(10)).with_latency(Duration::from_millis(50));
        let listing = listing(source);
        let mut state = ProductsUiState::new();
        state.set_in_stock_only(true);
        let view = view_of(&state);

        assert!(listing.evaluate(&view).await.is_fetching);
        listing.invalidate_all_products().await;
        assert!(listing.evaluate(&view).await.is_fetching);

        let landed = listing.settle(&view).await;
        assert!(landed.error.is_none());
        assert_eq!(listing.source().requests().len(), 1);

        // Data from before the invalidation is refreshed on the next evaluation
        let refreshing = listing.evaluate(&view).await;
        assert!(refreshing.is_fetching);
        assert!(!refreshing.is_loading);
        listing.settle(&view).await;
        assert_eq!(listing.source().requests().len(), 2);
    }
}
