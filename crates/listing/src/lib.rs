//! Product Catalog Listing library.
//!
//! Resolves what the product listing shows for a given UI state. The remote
//! catalog only supports pagination and free-text search, so the listing runs
//! in one of two modes:
//!
//! - **server**: remote pagination and search, shown as-is
//! - **client**: the whole catalog is fetched once, then filtered, sorted, and
//!   paginated locally
//!
//! # Example
//!
//! ```rust,ignore
//! use product_catalog_listing::{CatalogClient, CatalogConfig, ListingSession, ProductListing};
//!
//! let config = CatalogConfig::from_env()?;
//! let listing = ProductListing::new(CatalogClient::new(&config)?, &config);
//! let mut session = ListingSession::new(listing, config.search_debounce);
//!
//! session.set_search_text("phone");
//! session.update(|state| state.set_in_stock_only(true));
//! let visible = session.settled().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod fetch;
pub mod listing;
pub mod memory;
pub mod resolver;
pub mod session;
pub mod source;

pub use cache::{QueryCache, QuerySnapshot, Refresh};
pub use client::CatalogClient;
pub use config::{CatalogConfig, ConfigError};
pub use debounce::Debounced;
pub use error::CatalogError;
pub use fetch::FetchedCatalog;
pub use listing::ProductListing;
pub use memory::InMemoryCatalog;
pub use resolver::{CacheSnapshot, ViewState, VisibleResult, resolve};
pub use session::ListingSession;
pub use source::{CatalogSource, PageRequest};
