//! HTTP client for the remote catalog API.
//!
//! # Endpoints
//!
//! - `GET /products?limit=L&skip=S` - plain pagination
//! - `GET /products/search?q=TERM&limit=L&skip=S` - free-text search
//! - `GET /products/categories` - category list

use std::sync::Arc;

use product_catalog_core::ProductPage;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::source::{CatalogSource, PageRequest};

/// Maximum number of body characters kept in logs and errors.
const MAX_BODY_CHARS: usize = 500;

/// Client for the remote catalog API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails to build.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        // Fail early on a bad base URL rather than on the first request
        Url::parse(&config.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request and decode the JSON body.
    ///
    /// Parameters with empty values are left out of the query string.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = build_url(&self.inner.base_url, path, params)?;
        debug!(url = %url, "Catalog request");

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate(&response_text),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body: truncate(&response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&response_text),
                "Failed to parse catalog response"
            );
            CatalogError::Parse(e)
        })
    }
}

impl CatalogSource for CatalogClient {
    #[instrument(skip(self), fields(limit = request.limit, skip = request.skip))]
    async fn fetch_products(&self, request: &PageRequest) -> Result<ProductPage, CatalogError> {
        let mut params = Vec::with_capacity(3);
        let path = match &request.search {
            Some(term) => {
                params.push(("q", term.clone()));
                "/products/search"
            }
            None => "/products",
        };
        params.push(("limit", request.limit.to_string()));
        params.push(("skip", request.skip.to_string()));

        self.get(path, &params).await
    }

    #[instrument(skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<String>, CatalogError> {
        let entries: Vec<CategoryEntry> = self.get("/products/categories", &[]).await?;
        Ok(entries.into_iter().map(CategoryEntry::into_slug).collect())
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

/// A category as returned by `/products/categories`.
///
/// Older API versions return bare slugs, newer ones return objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryEntry {
    Slug(String),
    Detailed { slug: String },
}

impl CategoryEntry {
    fn into_slug(self) -> String {
        match self {
            Self::Slug(slug) | Self::Detailed { slug } => slug,
        }
    }
}

/// Build a request URL from base, path, and non-empty parameters.
fn build_url(base_url: &str, path: &str, params: &[(&str, String)]) -> Result<Url, CatalogError> {
    let mut url = Url::parse(&format!("{base_url}{path}"))?;
    let mut present = params.iter().filter(|(_, value)| !value.is_empty()).peekable();
    if present.peek().is_some() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in present {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_BODY_CHARS).collect()
}
