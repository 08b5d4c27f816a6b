//! Integration test support for the product catalog listing.
//!
//! Provides product fixtures and [`MockCatalogServer`], a local HTTP server
//! speaking the remote catalog's JSON API, so the real HTTP client can be
//! exercised end to end.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p product-catalog-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use product_catalog_core::{Product, ProductId, ProductPage};
use product_catalog_listing::CatalogConfig;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;

/// Page size of the remote API when no limit is given.
const REMOTE_DEFAULT_LIMIT: u32 = 30;

/// Categories cycled through by [`products`].
pub const CATEGORIES: [&str; 4] = ["beauty", "fragrances", "groceries", "smartphones"];

/// Brands cycled through by [`products`]. Every fifth product has none.
pub const BRANDS: [&str; 4] = ["Essence", "Chanel", "Apple", "Samsung"];

/// `n` deterministic products with ids `1..=n`.
///
/// - category cycles through [`CATEGORIES`]
/// - every fifth product is unbranded, the others cycle through [`BRANDS`]
/// - every third product is out of stock
/// - prices are `id * 1.5`, ratings cycle through `1.0..=5.0`
#[must_use]
pub fn products(n: u64) -> Vec<Product> {
    (1..=n).map(product).collect()
}

/// Product `id` of the [`products`] fixture.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::indexing_slicing
)]
pub fn product(id: u64) -> Product {
    let index = (id - 1) as usize;
    let title = match id % 10 {
        0 => format!("Phone Case {id}"),
        1 => format!("Smartphone {id}"),
        _ => format!("Item {id}"),
    };

    Product {
        id: ProductId::new(id),
        title,
        description: format!("Fixture product number {id}"),
        category: CATEGORIES[index % CATEGORIES.len()].to_string(),
        brand: (id % 5 != 0).then(|| BRANDS[index % BRANDS.len()].to_string()),
        price: id as f64 * 1.5,
        discount_percentage: (id % 7) as f64 * 2.5,
        rating: (index % 5) as f64 + 1.0,
        stock: if id % 3 == 0 { 0 } else { (id % 50) as u32 + 1 },
        thumbnail: format!("https://cdn.example.com/products/{id}/thumbnail.png"),
        images: Vec::new(),
    }
}

/// Config pointing at `base_url`, otherwise defaults.
#[must_use]
pub fn config_for(base_url: &str) -> CatalogConfig {
    CatalogConfig {
        base_url: base_url.to_string(),
        ..CatalogConfig::default()
    }
}

/// One request received by the mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub limit: Option<u32>,
    pub skip: Option<u64>,
    pub q: Option<String>,
}

struct MockState {
    products: Vec<Product>,
    requests: Mutex<Vec<RecordedRequest>>,
    fail_status: Mutex<Option<StatusCode>>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<u32>,
    skip: Option<u64>,
    q: Option<String>,
}

/// Local server mimicking the remote catalog API.
///
/// Shuts down when dropped.
pub struct MockCatalogServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockCatalogServer {
    /// Serve `products` on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    #[allow(clippy::expect_used)]
    pub async fn start(products: Vec<Product>) -> Self {
        let state = Arc::new(MockState {
            products,
            requests: Mutex::new(Vec::new()),
            fail_status: Mutex::new(None),
        });

        let app = Router::new()
            .route("/products", get(list_products))
            .route("/products/search", get(search_products))
            .route("/products/categories", get(list_categories))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Mock server has no address");

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock catalog server failed");
            }
        });

        Self { addr, state, task }
    }

    /// Base URL to configure the client with.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer every following request with `status`, or recover with `None`.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        if let Ok(mut guard) = self.state.fail_status.lock() {
            *guard = status;
        }
    }

    /// Requests received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Requests received so far for `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

impl Drop for MockCatalogServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MockState {
    fn record(&self, path: &str, query: &ListQuery) -> Option<Response> {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(RecordedRequest {
                path: path.to_string(),
                limit: query.limit,
                skip: query.skip,
                q: query.q.clone(),
            });
        }

        let status = self.fail_status.lock().ok().and_then(|guard| *guard)?;
        Some((status, "mock failure").into_response())
    }

    fn page(&self, matching: &[&Product], query: &ListQuery) -> ProductPage {
        let limit = query.limit.unwrap_or(REMOTE_DEFAULT_LIMIT);
        let skip = query.skip.unwrap_or(0);

        ProductPage {
            products: matching
                .iter()
                .skip(usize::try_from(skip).unwrap_or(usize::MAX))
                .take(limit as usize)
                .map(|product| (*product).clone())
                .collect(),
            total: matching.len() as u64,
            skip,
            limit: u64::from(limit),
        }
    }
}

async fn list_products(
    State(state): State<Arc<MockState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    if let Some(failure) = state.record("/products", &query) {
        return failure;
    }
    let all: Vec<&Product> = state.products.iter().collect();
    axum::Json(state.page(&all, &query)).into_response()
}

async fn search_products(
    State(state): State<Arc<MockState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    if let Some(failure) = state.record("/products/search", &query) {
        return failure;
    }
    let term = query.q.as_deref().unwrap_or_default().to_lowercase();
    let matching: Vec<&Product> = state
        .products
        .iter()
        .filter(|product| {
            product.title.to_lowercase().contains(&term)
                || product.description.to_lowercase().contains(&term)
        })
        .collect();
    axum::Json(state.page(&matching, &query)).into_response()
}

async fn list_categories(State(state): State<Arc<MockState>>) -> Response {
    let query = ListQuery {
        limit: None,
        skip: None,
        q: None,
    };
    if let Some(failure) = state.record("/products/categories", &query) {
        return failure;
    }

    let mut slugs: Vec<&str> = Vec::new();
    for product in &state.products {
        if !slugs.contains(&product.category.as_str()) {
            slugs.push(&product.category);
        }
    }
    let body: Vec<_> = slugs
        .into_iter()
        .map(|slug| {
            json!({
                "slug": slug,
                "name": slug,
                "url": format!("/products/category/{slug}"),
            })
        })
        .collect();
    axum::Json(body).into_response()
}
