//! List category tags.

use product_catalog_listing::{CatalogSource, ProductListing};

/// Print every category tag, one per line.
///
/// # Errors
///
/// Returns an error if the category request fails.
#[allow(clippy::print_stdout)]
pub async fn run<S: CatalogSource>(
    listing: &ProductListing<S>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let categories = listing.categories().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*categories)?);
        return Ok(());
    }

    for category in categories.iter() {
        println!("{category}");
    }
    Ok(())
}
