//! Interactive listing session.
//!
//! Ties the UI state container to the listing engine. Raw search text goes
//! through the debouncer, everything else reaches the view immediately.

use std::time::Duration;

use product_catalog_core::ProductsUiState;
use tokio::sync::watch;

use crate::debounce::Debounced;
use crate::listing::ProductListing;
use crate::resolver::{ViewState, VisibleResult};
use crate::source::CatalogSource;

/// One user's view of the product listing.
pub struct ListingSession<S> {
    listing: ProductListing<S>,
    state: ProductsUiState,
    search: Debounced<String>,
    search_updates: watch::Receiver<String>,
    listing_updates: watch::Receiver<u64>,
}

impl<S: CatalogSource> ListingSession<S> {
    /// Start a session with default UI state.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(listing: ProductListing<S>, search_delay: Duration) -> Self {
        let search = Debounced::new(String::new(), search_delay);
        let search_updates = search.subscribe();
        let listing_updates = listing.subscribe();

        Self {
            listing,
            state: ProductsUiState::new(),
            search,
            search_updates,
            listing_updates,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ProductsUiState {
        &self.state
    }

    #[must_use]
    pub const fn listing(&self) -> &ProductListing<S> {
        &self.listing
    }

    /// Apply a change to the UI state.
    ///
    /// A changed search text restarts the debounce window.
    pub fn update(&mut self, change: impl FnOnce(&mut ProductsUiState)) {
        change(&mut self.state);
        self.search.set(self.state.search_text().to_string());
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.update(|state| state.set_search_text(text));
    }

    /// Inputs of the visible result right now.
    #[must_use]
    pub fn view_state(&self) -> ViewState {
        ViewState::new(&self.state, &self.search.get())
    }

    /// Current visible result, starting any fetch it needs.
    pub async fn visible(&self) -> VisibleResult {
        self.listing.evaluate(&self.view_state()).await
    }

    /// Wait for pending search input to settle, then for the active query.
    pub async fn settled(&mut self) -> VisibleResult {
        while self.search.pending() {
            if self.search_updates.changed().await.is_err() {
                break;
            }
        }
        self.listing.settle(&self.view_state()).await
    }

    /// Wait until either the debounced search or a fetch changes.
    ///
    /// Returns `false` once neither can change anymore.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            search = self.search_updates.changed() => search.is_ok(),
            listing = self.listing_updates.changed() => listing.is_ok(),
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for ListingSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingSession")
            .field("listing", &self.listing)
            .field("state", &self.state)
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}
