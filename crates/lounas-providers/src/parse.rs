//! Provider dispatch: one entry point from raw response text to the
//! provider-agnostic intermediate record.

use chrono::NaiveDate;

use lounas_core::catalog::{Provider, RestaurantEntry};

use crate::error::ProviderError;
use crate::types::RawProviderPayload;
use crate::{rss, scrape, structured};

/// Parse a raw response body for a catalog entry against a reference date.
///
/// Pure: same inputs, same output. Every upstream surprise is either a
/// typed error or a "no data for today" payload; parsers never panic.
///
/// # Errors
///
/// Propagates the provider parser's [`ProviderError`].
pub fn parse(
    entry: &RestaurantEntry,
    raw_text: &str,
    reference: NaiveDate,
) -> Result<RawProviderPayload, ProviderError> {
    match entry.provider {
        Provider::StructuredFeed => structured::parse(entry, raw_text, reference),
        Provider::HtmlScrape => scrape::parse(entry, raw_text, reference),
        Provider::RssFeed => rss::parse(entry, raw_text, reference),
    }
}
