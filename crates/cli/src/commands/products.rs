//! Catalog commands.

use shopfront_client::api::CategoryInput;
use shopfront_core::{CategoryId, Product, ProductStats, format_price};
use tracing::info;

use super::Shell;

/// List products shown on the storefront.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn list(shell: &Shell) -> Result<(), Box<dyn std::error::Error>> {
    let products = shell.api.products().await?;
    print_products(shell, products.iter().filter(|p| p.display));
    Ok(())
}

/// List products owned by the signed-in seller, hidden ones included.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn mine(shell: &Shell) -> Result<(), Box<dyn std::error::Error>> {
    let products = shell.api.my_products().await?;
    print_products(shell, products.iter());
    Ok(())
}

/// List categories.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn categories(shell: &Shell) -> Result<(), Box<dyn std::error::Error>> {
    let categories = shell.api.categories().await?;
    for category in categories.iter() {
        info!("{:<24} [{}]", category.name, category.id);
    }
    info!("{} categories", categories.len());
    Ok(())
}

/// Create a category.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn add_category(shell: &Shell, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let category = shell.api.create_category(&CategoryInput::named(name)).await?;
    info!("Created category {} [{}]", category.name, category.id);
    Ok(())
}

/// Rename a category.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn rename_category(
    shell: &Shell,
    id: &str,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let category = shell
        .api
        .update_category(&CategoryId::new(id), &CategoryInput::named(name))
        .await?;
    info!("Renamed category {} to {}", category.id, category.name);
    Ok(())
}

/// Delete a category.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn delete_category(shell: &Shell, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    shell.api.delete_category(&CategoryId::new(id)).await?;
    info!("Deleted category {id}");
    Ok(())
}

/// Show dashboard statistics for the whole catalog.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn stats(shell: &Shell) -> Result<(), Box<dyn std::error::Error>> {
    let products = shell.api.products().await?;
    let stats = ProductStats::from_products(&products);

    info!("Catalog Statistics");
    info!("==================");
    info!("Total products: {}", stats.total_products);
    info!("Top selling:    {}", stats.top_selling);
    info!("Low stock:      {}", stats.low_stock);
    info!("Stock value:    {}", format_price(stats.total_revenue));
    Ok(())
}

fn print_products<'a>(shell: &Shell, products: impl Iterator<Item = &'a Product>) {
    let mut count = 0_usize;
    for product in products {
        count += 1;
        let in_cart = if shell.ctx.cart().contains(&product.id) {
            " (in cart)"
        } else {
            ""
        };
        info!(
            "{:<24} {:>10} stock {:>4}  [{}]{in_cart}",
            product.name,
            format_price(product.price),
            product.quantity,
            product.id
        );
        if let Some(image) = &product.image_url {
            info!("    image: {}", shell.api.image_url(image));
        }
    }
    info!("{count} product(s)");
}
