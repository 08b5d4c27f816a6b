//! Visibility resolver.
//!
//! [`resolve`] is a pure function from the current view inputs and a
//! snapshot of the caches to what the listing displays. It never fetches.

use std::sync::Arc;

use product_catalog_core::{
    FilterCriteria, ListingMode, Product, ProductPage, ProductsUiState, SortOption,
    apply_filters_and_sort, paginate,
};
use serde::Serialize;

use crate::cache::{PageKey, QuerySnapshot};
use crate::error::CatalogError;

/// Inputs that determine the visible result.
///
/// Same as the UI state, except the search text is the debounced one.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub page: u32,
    pub limit: u32,
    /// Debounced search text, trimmed.
    pub search: String,
    pub filters: FilterCriteria,
    pub sort: SortOption,
}

impl ViewState {
    /// Combine the raw UI state with the debounced search text.
    #[must_use]
    pub fn new(state: &ProductsUiState, debounced_search: &str) -> Self {
        Self {
            page: state.page().max(1),
            limit: state.limit().max(1),
            search: debounced_search.trim().to_string(),
            filters: state.filters().clone(),
            sort: state.sort(),
        }
    }

    /// Which data path backs this view.
    #[must_use]
    pub fn mode(&self) -> ListingMode {
        ListingMode::select(&self.filters, self.sort)
    }

    /// Cache signature of the server-mode page for this view.
    #[must_use]
    pub fn page_key(&self) -> PageKey {
        PageKey {
            page: self.page,
            limit: self.limit,
            search: self.search.clone(),
        }
    }
}

/// Cache state relevant to one view.
///
/// Only the entry of the active mode is consulted.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    /// Server page for the view's signature.
    pub page: QuerySnapshot<ProductPage>,
    /// Last server page shown with data, used as a placeholder.
    pub previous_page: Option<ProductPage>,
    /// Full catalog snapshot.
    pub all_products: QuerySnapshot<Arc<[Product]>>,
}

/// What the listing displays.
#[derive(Debug, Clone, Serialize)]
pub struct VisibleResult {
    /// Products of the current page, in display order.
    pub items: Vec<Product>,
    /// Remote total in server mode, filtered count in client mode.
    pub total: u64,
    pub mode: ListingMode,
    /// The active query has never produced data and has not failed.
    pub is_loading: bool,
    /// The active query is in flight, including background refreshes.
    pub is_fetching: bool,
    /// Items come from the previous server page while the current one loads.
    pub is_placeholder: bool,
    /// Most recent error of the active query.
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Arc<CatalogError>>,
}

impl VisibleResult {
    /// Settled with zero matches. Distinct from loading and from an error.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty() && !self.is_loading && !self.is_fetching && self.error.is_none()
    }

    /// Number of pages for the current total and page size.
    #[must_use]
    pub const fn total_pages(&self, limit: u32) -> u64 {
        if limit == 0 {
            return 0;
        }
        self.total.div_ceil(limit as u64)
    }
}

/// Compute the visible result for `view` from `cache`.
#[must_use]
pub fn resolve(view: &ViewState, cache: &CacheSnapshot) -> VisibleResult {
    match view.mode() {
        ListingMode::Server => resolve_server(&cache.page, cache.previous_page.as_ref()),
        ListingMode::Client => resolve_client(view, &cache.all_products),
    }
}

fn resolve_server(
    current: &QuerySnapshot<ProductPage>,
    previous: Option<&ProductPage>,
) -> VisibleResult {
    let (items, total, is_placeholder) = match (&current.data, previous) {
        (Some(page), _) => (page.products.clone(), page.total, false),
        (None, Some(page)) if current.error.is_none() => (page.products.clone(), page.total, true),
        (None, _) => (Vec::new(), 0, false),
    };

    VisibleResult {
        items,
        total,
        mode: ListingMode::Server,
        is_loading: current.is_loading() && !is_placeholder,
        is_fetching: current.is_fetching,
        is_placeholder,
        error: current.error.clone(),
    }
}

fn resolve_client(view: &ViewState, all: &QuerySnapshot<Arc<[Product]>>) -> VisibleResult {
    // Search text does not apply in client mode
    let products: &[Product] = all.data.as_deref().unwrap_or_default();
    let filtered = apply_filters_and_sort(products, &view.filters, view.sort);
    let items = paginate(&filtered.items, view.page, view.limit)
        .into_iter()
        .cloned()
        .collect();

    VisibleResult {
        items,
        total: filtered.total as u64,
        mode: ListingMode::Client,
        is_loading: all.is_loading(),
        is_fetching: all.is_fetching,
        is_placeholder: false,
        error: all.error.clone(),
    }
}

#[allow(clippy::ref_option)]
fn serialize_error<S>(error: &Option<Arc<CatalogError>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
