//! `init-categories`: load categories from a JSON seed file.

use anyhow::{Context, Result};
use magazine_storage::ContentStore;

use crate::config::CategoriesSeedFile;

/// Summary of one seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

pub fn load_seed_file(path: &str) -> Result<CategoriesSeedFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {path}"))?;
    let seed: CategoriesSeedFile =
        serde_json::from_str(&content).with_context(|| format!("Invalid seed file: {path}"))?;
    Ok(seed)
}

/// Create every category that does not exist yet. Existing names are left untouched.
pub async fn init_categories(store: &ContentStore, seed: &CategoriesSeedFile) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    for item in &seed.categories {
        let name = item.name.trim();
        if name.is_empty() {
            tracing::warn!("Skipping seed category with empty name");
            report.skipped += 1;
            continue;
        }
        let created = store
            .ensure_category(name, item.slug.as_deref(), item.description.clone())
            .await
            .with_context(|| format!("Failed to seed category '{name}'"))?;
        if created {
            tracing::info!(name, "Category created");
            report.created += 1;
        } else {
            report.skipped += 1;
        }
    }
    Ok(report)
}
