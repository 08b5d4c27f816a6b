//! Client-side filter/sort pipeline.
//!
//! Used in client mode, where the whole catalog has been materialized and the
//! remote cannot combine the requested filters and sort.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::filters::{FilterCriteria, SortOption};
use crate::product::Product;

/// Filtered and sorted view over a borrowed product collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredProducts<'a> {
    /// Matching products in display order.
    pub items: Vec<&'a Product>,
    /// Number of matching products, before pagination.
    pub total: usize,
}

/// Apply filters and sort to `products` without touching the input.
///
/// Filters run in a fixed order: category, brand, price lower bound, price
/// upper bound, in-stock. Sorting is stable, so equal keys keep their input
/// order, and [`SortOption::Relevance`] keeps the input order entirely.
#[must_use]
pub fn apply_filters_and_sort<'a>(
    products: &'a [Product],
    filters: &FilterCriteria,
    sort: SortOption,
) -> FilteredProducts<'a> {
    let mut items: Vec<&Product> = products.iter().collect();

    if !filters.selected_categories.is_empty() {
        let selected: HashSet<&str> = filters
            .selected_categories
            .iter()
            .map(String::as_str)
            .collect();
        items.retain(|p| selected.contains(p.category.as_str()));
    }

    if !filters.selected_brands.is_empty() {
        let selected: HashSet<&str> = filters.selected_brands.iter().map(String::as_str).collect();
        // Unbranded products never match a brand selection
        items.retain(|p| p.brand.as_deref().is_some_and(|b| selected.contains(b)));
    }

    if let Some(min) = filters.price_min {
        items.retain(|p| p.price >= min);
    }

    if let Some(max) = filters.price_max {
        items.retain(|p| p.price <= max);
    }

    if filters.in_stock_only {
        items.retain(|p| p.in_stock());
    }

    // slice::sort_by is stable
    match sort {
        SortOption::Relevance => {}
        SortOption::PriceAsc => items.sort_by(|a, b| ascending(a.price, b.price)),
        SortOption::PriceDesc => items.sort_by(|a, b| ascending(b.price, a.price)),
        SortOption::DiscountDesc => {
            items.sort_by(|a, b| ascending(b.discount_percentage, a.discount_percentage));
        }
        SortOption::RatingDesc => items.sort_by(|a, b| ascending(b.rating, a.rating)),
    }

    let total = items.len();
    FilteredProducts { items, total }
}

fn ascending(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
