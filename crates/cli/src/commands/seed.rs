//! Seed the catalog and about page from a YAML file.
//!
//! Seeding is repeatable: categories and products that already exist (same
//! slug) are left untouched.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use tsitsi_core::slug::slugify;
use tsitsi_storefront::db::catalog::NewProduct;
use tsitsi_storefront::db::{AboutRepository, CatalogRepository, RepositoryError};

use super::connect;

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    pub about: Option<SeedAbout>,
}

/// A category and its products.
#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// A product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    pub stock: i32,
    #[serde(default = "default_reorder_point")]
    pub reorder_point: i32,
}

const fn default_reorder_point() -> i32 {
    5
}

/// About page content, in Markdown.
#[derive(Debug, Deserialize)]
pub struct SeedAbout {
    pub title: String,
    #[serde(default)]
    pub story: String,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub vision: String,
}

/// Counts reported after seeding.
#[derive(Debug, Default)]
struct SeedSummary {
    categories: usize,
    products: usize,
    skipped: usize,
}

/// Load `file_path` into the database.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or a query fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed data");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let pool = connect().await?;
    let catalog = CatalogRepository::new(&pool);
    let mut summary = SeedSummary::default();

    for entry in &seed.categories {
        let slug = slugify(&entry.name);
        let category = match catalog.get_category_by_slug(&slug).await? {
            Some(existing) => existing,
            None => {
                summary.categories += 1;
                catalog
                    .create_category(&entry.name, &slug, &entry.description)
                    .await?
            }
        };

        for product in &entry.products {
            let new_product = NewProduct {
                category_id: category.id,
                name: product.name.clone(),
                slug: slugify(&product.name),
                description: product.description.clone(),
                price: product.price,
                image: product.image.clone(),
                stock: product.stock,
                reorder_point: product.reorder_point,
                is_available: true,
            };
            match catalog.create_product(&new_product).await {
                Ok(_) => summary.products += 1,
                Err(RepositoryError::Conflict(_)) => {
                    warn!(product = %product.name, "Product exists, skipped");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    if let Some(about) = &seed.about {
        AboutRepository::new(&pool)
            .save(&about.title, &about.story, &about.mission, &about.vision)
            .await?;
        info!("About page saved");
    }

    info!("Seeding complete!");
    info!("  Categories created: {}", summary.categories);
    info!("  Products created: {}", summary.products);
    info!("  Products skipped (already exist): {}", summary.skipped);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_seed_file_parses() {
        let content = include_str!("../../seed/catalog.yaml");
        let seed: SeedFile = serde_yaml::from_str(content).unwrap();
        assert!(!seed.categories.is_empty());
        assert!(seed.about.is_some());
        for category in &seed.categories {
            for product in &category.products {
                assert!(product.price > Decimal::ZERO, "{}", product.name);
                assert!(product.stock >= 0, "{}", product.name);
            }
        }
    }

    #[test]
    fn test_reorder_point_defaults() {
        let product: SeedProduct =
            serde_yaml::from_str("name: Satroka\nprice: 25000\nstock: 4\n").unwrap();
        assert_eq!(product.reorder_point, 5);
        assert!(product.image.is_empty());
    }
}
