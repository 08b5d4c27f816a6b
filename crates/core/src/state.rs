//! UI state container for the product listing.
//!
//! Holds the raw user inputs. Every setter that changes the shape of the
//! result (search, sort, any filter, page size) resets pagination to page 1.

use serde::{Deserialize, Serialize};

use crate::filters::{FilterCriteria, ListingMode, SortOption};

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 12;

/// Raw listing inputs as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductsUiState {
    search_text: String,
    sort: SortOption,
    filters: FilterCriteria,
    page: u32,
    limit: u32,
}

impl Default for ProductsUiState {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            sort: SortOption::Relevance,
            filters: FilterCriteria::default(),
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ProductsUiState {
    /// Create the initial state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    #[must_use]
    pub const fn sort(&self) -> SortOption {
        self.sort
    }

    #[must_use]
    pub const fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    /// Current page (1-based).
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Mode implied by the current filters and sort.
    #[must_use]
    pub fn mode(&self) -> ListingMode {
        ListingMode::select(&self.filters, self.sort)
    }

    pub fn set_search_text(&mut self, value: impl Into<String>) {
        self.search_text = value.into();
        self.page = 1;
    }

    pub fn set_sort(&mut self, value: SortOption) {
        self.sort = value;
        self.page = 1;
    }

    /// Add the category to the selection, or remove it if already selected.
    pub fn toggle_category(&mut self, category: &str) {
        toggle(&mut self.filters.selected_categories, category);
        self.page = 1;
    }

    /// Add the brand to the selection, or remove it if already selected.
    pub fn toggle_brand(&mut self, brand: &str) {
        toggle(&mut self.filters.selected_brands, brand);
        self.page = 1;
    }

    pub fn set_price_min(&mut self, value: Option<f64>) {
        self.filters.price_min = value;
        self.page = 1;
    }

    pub fn set_price_max(&mut self, value: Option<f64>) {
        self.filters.price_max = value;
        self.page = 1;
    }

    pub fn set_in_stock_only(&mut self, value: bool) {
        self.filters.in_stock_only = value;
        self.page = 1;
    }

    /// Jump to a page. Does not reset anything else.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit.max(1);
        self.page = 1;
    }

    /// Restore the default filters and go back to page 1. Sort and search are kept.
    pub fn reset_filters(&mut self) {
        self.filters = FilterCriteria::default();
        self.page = 1;
    }
}

fn toggle(selection: &mut Vec<String>, value: &str) {
    if let Some(pos) = selection.iter().position(|v| v == value) {
        selection.remove(pos);
    } else {
        selection.push(value.to_string());
    }
}
