//! Product Catalog Core - Shared types library.
//!
//! This crate provides the types and pure logic used across the catalog components:
//! - `listing` - Remote catalog client, caches, and the visibility resolver
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no timers. Everything here is synchronous and deterministic.
//!
//! # Modules
//!
//! - [`product`] - Remote product entity and page response shape
//! - [`filters`] - Filter criteria, sort options, and listing mode selection
//! - [`pipeline`] - Client-side filter/sort pipeline
//! - [`pagination`] - Page/offset arithmetic and local page slicing
//! - [`state`] - UI state container (raw user inputs)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod filters;
pub mod pagination;
pub mod pipeline;
pub mod product;
pub mod state;

pub use filters::{FilterCriteria, ListingMode, ParseSortError, SortOption};
pub use pagination::{paginate, skip_for};
pub use pipeline::{FilteredProducts, apply_filters_and_sort};
pub use product::{Product, ProductId, ProductPage};
pub use state::ProductsUiState;
