//! HTTP fetch client for all three providers.
//!
//! One GET per restaurant per attempt; the body is opaque text handed to
//! the parsers. Base URLs are constructor parameters so tests can point at
//! a mock server.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, Url};

use lounas_core::catalog::{Provider, RestaurantEntry};
use lounas_core::dates::weekday_token;

use crate::error::FetchError;

/// Which timeout budget a request runs under: background refreshes fail
/// fast, user-triggered manual refreshes get longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Background,
    Manual,
}

/// Menu fetch client with one underlying HTTP client per timeout class.
pub struct MenuClient {
    background: Client,
    manual: Client,
    feed_base_url: String,
    scrape_base_url: String,
}

impl MenuClient {
    /// Creates a client with the given API bases and timeout budgets.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if an underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        feed_base_url: &str,
        scrape_base_url: &str,
        background_timeout_secs: u64,
        manual_timeout_secs: u64,
    ) -> Result<Self, FetchError> {
        let build = |timeout_secs: u64| -> Result<Client, reqwest::Error> {
            Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .user_agent("lounas/0.1 (lunch-menu-engine)")
                .build()
        };
        Ok(Self {
            background: build(background_timeout_secs)?,
            manual: build(manual_timeout_secs)?,
            feed_base_url: feed_base_url.trim_end_matches('/').to_string(),
            scrape_base_url: scrape_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches the raw menu payload for a catalog entry.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Unsupported`] when the entry lacks the field its
    ///   provider needs to build a URL.
    /// - [`FetchError::Status`] on a non-2xx response.
    /// - [`FetchError::Http`] on network failure or timeout.
    pub async fn fetch(
        &self,
        entry: &RestaurantEntry,
        language: &str,
        reference: NaiveDate,
        class: TimeoutClass,
    ) -> Result<String, FetchError> {
        let url = self.request_url(entry, language, reference)?;
        let client = match class {
            TimeoutClass::Background => &self.background,
            TimeoutClass::Manual => &self.manual,
        };

        let response = client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    /// Builds the provider-specific request URL for an entry.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Unsupported`] when the entry is missing its
    /// provider's request field, or when the configured base does not parse.
    pub fn request_url(
        &self,
        entry: &RestaurantEntry,
        language: &str,
        reference: NaiveDate,
    ) -> Result<Url, FetchError> {
        let unsupported = |reason: &str| FetchError::Unsupported {
            code: entry.code.clone(),
            reason: reason.to_string(),
        };

        match entry.provider {
            Provider::StructuredFeed | Provider::RssFeed => {
                let cost_number = entry
                    .cost_number
                    .as_deref()
                    .ok_or_else(|| unsupported("missing cost number"))?;
                let format = if entry.provider == Provider::StructuredFeed {
                    "json"
                } else {
                    "rss"
                };
                let mut url = Url::parse(&format!("{}/feed/{format}", self.feed_base_url))
                    .map_err(|e| unsupported(&format!("invalid feed base URL: {e}")))?;
                url.query_pairs_mut()
                    .append_pair("costNumber", cost_number)
                    .append_pair("language", language);
                Ok(url)
            }
            Provider::HtmlScrape => {
                let slug = entry
                    .page_slug
                    .as_deref()
                    .ok_or_else(|| unsupported("missing page slug"))?;
                let mut url = Url::parse(&format!("{}/{slug}/", self.scrape_base_url))
                    .map_err(|e| unsupported(&format!("invalid scrape base URL: {e}")))?;
                url.query_pairs_mut()
                    .append_pair("print_lunch_day", weekday_token(reference))
                    .append_pair("print_lunch_list_day", "1");
                Ok(url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MenuClient {
        MenuClient::new("https://menu.example.test/menuapi/", "https://scrape.example.test/lounas", 10, 30)
            .expect("client construction should not fail")
    }

    fn entry(provider: Provider) -> RestaurantEntry {
        RestaurantEntry {
            code: "0437".to_string(),
            name: "Snellmania".to_string(),
            provider,
            cost_number: Some("0437".to_string()),
            page_slug: Some("highway".to_string()),
            url: None,
            enabled: true,
        }
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 19).expect("valid date")
    }

    #[test]
    fn structured_feed_url_has_cost_and_language() {
        let url = client()
            .request_url(&entry(Provider::StructuredFeed), "fi", reference())
            .expect("url builds");
        assert_eq!(
            url.as_str(),
            "https://menu.example.test/menuapi/feed/json?costNumber=0437&language=fi"
        );
    }

    #[test]
    fn rss_url_uses_the_rss_endpoint() {
        let url = client()
            .request_url(&entry(Provider::RssFeed), "en", reference())
            .expect("url builds");
        assert_eq!(
            url.as_str(),
            "https://menu.example.test/menuapi/feed/rss?costNumber=0437&language=en"
        );
    }

    #[test]
    fn scrape_url_carries_the_weekday() {
        let url = client()
            .request_url(&entry(Provider::HtmlScrape), "fi", reference())
            .expect("url builds");
        assert_eq!(
            url.as_str(),
            "https://scrape.example.test/lounas/highway/?print_lunch_day=thursday&print_lunch_list_day=1"
        );
    }

    #[test]
    fn missing_cost_number_is_unsupported() {
        let mut e = entry(Provider::StructuredFeed);
        e.cost_number = None;
        let err = client().request_url(&e, "fi", reference()).unwrap_err();
        assert!(matches!(err, FetchError::Unsupported { .. }));
        assert!(err.to_string().contains("cost number"));
    }

    #[test]
    fn missing_slug_is_unsupported() {
        let mut e = entry(Provider::HtmlScrape);
        e.page_slug = None;
        let err = client().request_url(&e, "fi", reference()).unwrap_err();
        assert!(matches!(err, FetchError::Unsupported { .. }));
    }
}
