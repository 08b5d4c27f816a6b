//! Show one page of the product listing.

use clap::Args;
use product_catalog_core::{Product, ProductsUiState, SortOption};
use product_catalog_listing::{CatalogSource, ProductListing, ViewState, VisibleResult};
use tracing::info;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Free-text search, sent to the remote API
    #[arg(short, long, default_value = "")]
    search: String,

    /// Only show this category (repeatable)
    #[arg(short, long = "category")]
    categories: Vec<String>,

    /// Only show this brand (repeatable)
    #[arg(short, long = "brand")]
    brands: Vec<String>,

    /// Inclusive lower price bound
    #[arg(long)]
    min_price: Option<f64>,

    /// Inclusive upper price bound
    #[arg(long)]
    max_price: Option<f64>,

    /// Only show products with stock
    #[arg(long)]
    in_stock: bool,

    /// Sort order (relevance, price-asc, price-desc, discount-desc, rating-desc)
    #[arg(long, default_value_t = SortOption::Relevance)]
    sort: SortOption,

    /// 1-based page number
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Products per page
    #[arg(short, long, default_value_t = product_catalog_core::state::DEFAULT_LIMIT)]
    limit: u32,
}

impl ListArgs {
    /// UI state equivalent to these arguments.
    fn to_state(&self) -> ProductsUiState {
        let mut state = ProductsUiState::new();
        state.set_search_text(self.search.as_str());
        for category in &self.categories {
            state.toggle_category(category);
        }
        for brand in &self.brands {
            state.toggle_brand(brand);
        }
        state.set_price_min(self.min_price);
        state.set_price_max(self.max_price);
        state.set_in_stock_only(self.in_stock);
        state.set_sort(self.sort);
        // Every other setter resets the page
        state.set_limit(self.limit);
        state.set_page(self.page);
        state
    }
}

/// Resolve and print the requested page.
///
/// One-shot, so the search text is used without debouncing.
///
/// # Errors
///
/// Returns an error if the active query fails.
#[allow(clippy::print_stdout)]
pub async fn run<S: CatalogSource>(
    listing: &ProductListing<S>,
    args: &ListArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = args.to_state();
    let view = ViewState::new(&state, state.search_text());
    info!(mode = %view.mode(), page = view.page, "Resolving listing");

    let result = listing.settle(&view).await;
    if let Some(error) = result.error.clone() {
        return Err(error.into());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", summary_line(&result, &view));
    if result.items.is_empty() {
        println!("No products found");
    }
    for product in &result.items {
        println!("{}", product_line(product));
    }
    Ok(())
}

fn summary_line(result: &VisibleResult, view: &ViewState) -> String {
    format!(
        "Mode: {} | Total: {} | Page {}/{}",
        result.mode,
        result.total,
        view.page,
        result.total_pages(view.limit).max(1)
    )
}

fn product_line(product: &Product) -> String {
    let brand = product.brand.as_deref().unwrap_or("-");
    let stock = if product.in_stock() {
        format!("{} in stock", product.stock)
    } else {
        "out of stock".to_string()
    };
    format!(
        "#{:<4} {:<40} ${:>9.2}  {:>5.1}%  ★{:.1}  {} / {}  {}",
        product.id.as_u64(),
        product.title,
        product.price,
        product.discount_percentage,
        product.rating,
        product.category,
        brand,
        stock
    )
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use product_catalog_core::{ListingMode, ProductId};

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ListArgs,
    }

    fn parse(argv: &[&str]) -> ListArgs {
        TestCli::parse_from(std::iter::once("catalog").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_defaults_are_server_mode() {
        let state = parse(&[]).to_state();
        assert_eq!(state.mode(), ListingMode::Server);
        assert_eq!(state.page(), 1);
        assert_eq!(state.limit(), 12);
    }

    #[test]
    fn test_page_survives_filter_setters() {
        let state = parse(&["--in-stock", "--sort", "price-asc", "--page", "3", "-l", "5"]).to_state();
        assert_eq!(state.mode(), ListingMode::Client);
        assert_eq!(state.sort(), SortOption::PriceAsc);
        assert_eq!(state.page(), 3);
        assert_eq!(state.limit(), 5);
    }

    #[test]
    fn test_repeatable_categories() {
        let state = parse(&["-c", "beauty", "-c", "fragrances"]).to_state();
        assert_eq!(state.filters().selected_categories, vec!["beauty", "fragrances"]);
    }

    #[test]
    fn test_product_line() {
        let product = Product {
            id: ProductId::new(7),
            title: "Essence Mascara".to_string(),
            description: String::new(),
            category: "beauty".to_string(),
            brand: None,
            price: 9.99,
            discount_percentage: 7.17,
            rating: 4.94,
            stock: 0,
            thumbnail: String::new(),
            images: Vec::new(),
        };
        let line = product_line(&product);
        assert!(line.starts_with("#7"));
        assert!(line.contains("$     9.99"));
        assert!(line.contains("beauty / -"));
        assert!(line.ends_with("out of stock"));
    }
}
