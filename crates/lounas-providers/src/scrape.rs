//! Parser for the html-scrape provider: a printable lunch page with one
//! location header, one menu-date header, and repeated menu sections.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use lounas_core::catalog::RestaurantEntry;
use lounas_core::dates::{date_key, infer_year};

use crate::error::ProviderError;
use crate::text::clean_fragment;
use crate::types::{RawProviderPayload, RawSection};

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*\bmenu-location\b[^"]*"[^>]*>(.*?)</div>"#)
        .expect("valid regex")
});
static MENU_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*\bmenu-date\b[^"]*"[^>]*>(.*?)</div>"#)
        .expect("valid regex")
});
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<section[^>]*class="[^"]*\bmenu-section\b[^"]*"[^>]*>(.*?)</section>"#)
        .expect("valid regex")
});
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<h2[^>]*class="[^"]*\bmenu-title\b[^"]*"[^>]*>(.*?)</h2>"#)
        .expect("valid regex")
});
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<h2[^>]*class="[^"]*\bmenu-price\b[^"]*"[^>]*>(.*?)</h2>"#)
        .expect("valid regex")
});
static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)</li>").expect("valid regex"));

static DAY_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})(?:\.(\d{2,4}))?").expect("valid regex"));

/// Parse a scraped lunch page against a reference date.
///
/// The page always "parses": a missing or malformed date simply yields an
/// invalid provider date (and therefore no menu for today), never an error.
///
/// # Errors
///
/// Currently infallible; the `Result` keeps the parser signature uniform
/// across providers.
pub fn parse(
    entry: &RestaurantEntry,
    raw_text: &str,
    reference: NaiveDate,
) -> Result<RawProviderPayload, ProviderError> {
    let location = LOCATION_RE
        .captures(raw_text)
        .map(|c| clean_fragment(&c[1]))
        .unwrap_or_default();
    let date_text = MENU_DATE_RE
        .captures(raw_text)
        .map(|c| clean_fragment(&c[1]))
        .unwrap_or_default();

    let menu_date = parse_menu_date(&date_text, reference);
    let provider_date_valid = menu_date == Some(reference);

    let sections = if provider_date_valid {
        Some(parse_sections(raw_text))
    } else {
        None
    };

    Ok(RawProviderPayload {
        provider: entry.provider,
        raw_text: raw_text.to_string(),
        menu_date_iso: menu_date.map(date_key).unwrap_or_default(),
        provider_date_valid,
        restaurant_name: if location.is_empty() {
            entry.name.clone()
        } else {
            location
        },
        restaurant_url: entry.url.clone().unwrap_or_default(),
        lunch_time: String::new(),
        sections,
    })
}

/// Parse `D.M`, `D.M.YY`, or `D.M.YYYY` from the menu-date text.
///
/// A missing year is inferred as the candidate year (previous, current,
/// next) closest to the reference date. Out-of-range day/month pairs fail
/// the calendar round-trip inside [`infer_year`] / `from_ymd_opt` and yield
/// `None`.
fn parse_menu_date(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let caps = DAY_MONTH_RE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    match caps.get(3) {
        Some(year_match) => {
            let mut year: i32 = year_match.as_str().parse().ok()?;
            if year < 100 {
                year += 2000;
            }
            NaiveDate::from_ymd_opt(year, month, day)
        }
        None => infer_year(day, month, reference),
    }
}

fn parse_sections(raw_text: &str) -> Vec<RawSection> {
    SECTION_RE
        .captures_iter(raw_text)
        .filter_map(|section| {
            let body = &section[1];
            let components: Vec<String> = ITEM_RE
                .captures_iter(body)
                .map(|item| clean_fragment(&item[1]))
                .filter(|text| !text.is_empty())
                .collect();
            if components.is_empty() {
                return None;
            }
            let name = TITLE_RE
                .captures(body)
                .map(|c| clean_fragment(&c[1]))
                .unwrap_or_default();
            let price = PRICE_RE
                .captures(body)
                .map(|c| clean_fragment(&c[1]))
                .unwrap_or_default();
            Some((name, price, components))
        })
        .enumerate()
        .map(|(idx, (name, price, components))| RawSection {
            sort_order: i64::try_from(idx).unwrap_or(i64::MAX),
            name,
            price,
            components,
        })
        .collect()
}
