//! Filter criteria, sort options, and listing mode selection.
//!
//! The remote catalog only supports pagination and free-text search. Any
//! active filter or non-default sort pushes the listing into client mode,
//! where the full dataset is filtered and sorted locally.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-side filter selections.
///
/// An empty selection never means "match nothing", it means the dimension is
/// not filtered at all.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Selected category tags, in selection order.
    pub selected_categories: Vec<String>,
    /// Selected brand names, in selection order.
    pub selected_brands: Vec<String>,
    /// Inclusive lower price bound.
    pub price_min: Option<f64>,
    /// Inclusive upper price bound.
    pub price_max: Option<f64>,
    /// Only keep products with `stock > 0`.
    pub in_stock_only: bool,
}

impl FilterCriteria {
    /// Whether any filter dimension constrains the result.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.selected_categories.is_empty()
            || !self.selected_brands.is_empty()
            || self.price_min.is_some()
            || self.price_max.is_some()
            || self.in_stock_only
    }
}

/// Error returned when parsing an unknown sort option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown sort option: {0}")]
pub struct ParseSortError(String);

/// Product sort order. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    /// Keep the remote's native order.
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    DiscountDesc,
    RatingDesc,
}

impl SortOption {
    /// All sort options, in display order.
    pub const ALL: [Self; 5] = [
        Self::Relevance,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::DiscountDesc,
        Self::RatingDesc,
    ];

    /// Wire/CLI name of this option.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::DiscountDesc => "discount-desc",
            Self::RatingDesc => "rating-desc",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|option| option.as_str() == s)
            .ok_or_else(|| ParseSortError(s.to_string()))
    }
}

/// Which data path backs the visible result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingMode {
    /// Remote pagination and search, shown as-is.
    Server,
    /// Full dataset filtered, sorted, and paginated locally.
    Client,
}

impl ListingMode {
    /// Pick the mode for the given filters and sort.
    ///
    /// Client mode is required as soon as any filter is active or the sort
    /// is not relevance.
    #[must_use]
    pub fn select(filters: &FilterCriteria, sort: SortOption) -> Self {
        if filters.is_active() || sort != SortOption::Relevance {
            Self::Client
        } else {
            Self::Server
        }
    }

    /// Tag exposed to the presentation layer.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for ListingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_inactive() {
        assert!(!FilterCriteria::default().is_active());
    }

    #[test]
    fn test_each_dimension_activates() {
        let cases = [
            FilterCriteria {
                selected_categories: vec!["beauty".to_string()],
                ..Default::default()
            },
            FilterCriteria {
                selected_brands: vec!["Apple".to_string()],
                ..Default::default()
            },
            FilterCriteria {
                price_min: Some(0.0),
                ..Default::default()
            },
            FilterCriteria {
                price_max: Some(100.0),
                ..Default::default()
            },
            FilterCriteria {
                in_stock_only: true,
                ..Default::default()
            },
        ];

        for filters in &cases {
            assert!(filters.is_active(), "{filters:?}");
            assert_eq!(
                ListingMode::select(filters, SortOption::Relevance),
                ListingMode::Client
            );
        }
    }

    #[test]
    fn test_mode_server_for_defaults() {
        assert_eq!(
            ListingMode::select(&FilterCriteria::default(), SortOption::Relevance),
            ListingMode::Server
        );
    }

    #[test]
    fn test_mode_client_for_non_default_sort() {
        for sort in SortOption::ALL.into_iter().skip(1) {
            assert_eq!(
                ListingMode::select(&FilterCriteria::default(), sort),
                ListingMode::Client
            );
        }
    }

    #[test]
    fn test_sort_option_parse() {
        for sort in SortOption::ALL {
            assert_eq!(sort.as_str().parse::<SortOption>().unwrap(), sort);
        }
        let err = "cheapest".parse::<SortOption>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown sort option: cheapest");
    }

    #[test]
    fn test_sort_option_serde_matches_as_str() {
        let json = serde_json::to_string(&SortOption::DiscountDesc).unwrap();
        assert_eq!(json, "\"discount-desc\"");
    }

    #[test]
    fn test_mode_tags() {
        assert_eq!(ListingMode::Server.to_string(), "server");
        assert_eq!(ListingMode::Client.to_string(), "client");
    }
}
