use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating the restaurant catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}

/// Upstream source kind for a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    StructuredFeed,
    HtmlScrape,
    RssFeed,
}

impl Provider {
    /// Stable key used in cache keys and log fields.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Provider::StructuredFeed => "structured-feed",
            Provider::HtmlScrape => "html-scrape",
            Provider::RssFeed => "rss-feed",
        }
    }

    /// Whether the fetched payload varies with the requested language.
    /// Scraped pages are language-invariant, so their cache slot is shared.
    #[must_use]
    pub fn is_language_variant(self) -> bool {
        match self {
            Provider::StructuredFeed | Provider::RssFeed => true,
            Provider::HtmlScrape => false,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// One row of the static restaurant catalog. Immutable for the process
/// lifetime; the catalog is configuration, loaded once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantEntry {
    /// Unique key, also the cache/state key.
    pub code: String,
    /// Fallback display name, used until a payload supplies one.
    pub name: String,
    pub provider: Provider,
    /// Feed cost number for the structured-feed and rss-feed providers.
    #[serde(default)]
    pub cost_number: Option<String>,
    /// Page slug for the html-scrape provider.
    #[serde(default)]
    pub page_slug: Option<String>,
    /// Public homepage, surfaced to the collaborator as `restaurant_url`.
    #[serde(default)]
    pub url: Option<String>,
    /// Catalog membership default; the engine can toggle this at runtime.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    restaurants: Vec<RestaurantEntry>,
}

/// Load and validate the restaurant catalog from a YAML file.
///
/// Provider-specific request fields (`cost_number`, `page_slug`) are not
/// required here; a missing field surfaces at fetch time as an
/// unsupported-provider error so that one bad row cannot block startup.
///
/// # Errors
///
/// Returns [`CatalogError`] if the file cannot be read or parsed, or if
/// codes/names are empty or duplicated.
pub fn load_catalog(path: &Path) -> Result<Vec<RestaurantEntry>, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: CatalogFile = serde_yaml::from_str(&content)?;
    validate(&file.restaurants)?;
    Ok(file.restaurants)
}

fn validate(entries: &[RestaurantEntry]) -> Result<(), CatalogError> {
    if entries.is_empty() {
        return Err(CatalogError::Validation(
            "catalog must contain at least one restaurant".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in entries {
        if entry.code.trim().is_empty() {
            return Err(CatalogError::Validation(
                "restaurant code must be non-empty".to_string(),
            ));
        }
        if entry.name.trim().is_empty() {
            return Err(CatalogError::Validation(format!(
                "restaurant '{}' must have a non-empty name",
                entry.code
            )));
        }
        if !seen.insert(entry.code.clone()) {
            return Err(CatalogError::Validation(format!(
                "duplicate restaurant code: '{}'",
                entry.code
            )));
        }
    }
    Ok(())
}
