//! Parser for the rss-feed provider: one menu per feed item, with the menu
//! date embedded in the item title (or guid) and the components written as
//! description paragraphs.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use lounas_core::catalog::RestaurantEntry;
use lounas_core::dates::date_key;

use crate::allergen::reformat_component;
use crate::error::ProviderError;
use crate::text::{clean_fragment, decode_entities};
use crate::types::{RawProviderPayload, RawSection};

static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").expect("valid regex"));

static ITEM_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[-./](\d{1,2})[-./](\d{2,4})").expect("valid regex"));

/// Extract the inner text of the first `<tag>…</tag>` occurrence.
///
/// Case-insensitive, first match only; attributes on the opening tag are
/// ignored. This is the single extractor every RSS field goes through.
fn extract_tag<'a>(src: &'a str, tag: &str) -> Option<&'a str> {
    let pattern = format!(r"(?is)<{0}(?:\s[^>]*)?>(.*?)</{0}>", regex::escape(tag));
    let re = Regex::new(&pattern).expect("valid tag regex");
    re.captures(src)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Parse an RSS payload against a reference date.
///
/// Uses the first `<item>` inside the `<channel>` (or, absent either, the
/// whole document). The date comes from the item title, falling back to the
/// guid; two-digit years are normalized to the 2000s. Description
/// paragraphs become component lines, each run through the allergen
/// reformatter.
///
/// # Errors
///
/// Returns [`ProviderError::Shape`] when the document contains neither a
/// title nor a description — nothing recognizable as a feed item.
pub fn parse(
    entry: &RestaurantEntry,
    raw_text: &str,
    reference: NaiveDate,
) -> Result<RawProviderPayload, ProviderError> {
    let channel = extract_tag(raw_text, "channel").unwrap_or(raw_text);
    let channel_title = extract_tag(channel, "title").map(clean_fragment);
    let item = extract_tag(channel, "item").unwrap_or(channel);

    let title = extract_tag(item, "title").map(clean_fragment);
    let guid = extract_tag(item, "guid").map(clean_fragment);
    let link = extract_tag(item, "link").map(clean_fragment);
    let description = extract_tag(item, "description");

    if title.is_none() && description.is_none() {
        return Err(ProviderError::Shape {
            provider: entry.provider.key().to_string(),
            reason: "no recognizable feed item".to_string(),
        });
    }

    let menu_date = title
        .as_deref()
        .and_then(parse_item_date)
        .or_else(|| guid.as_deref().and_then(parse_item_date));
    let provider_date_valid = menu_date == Some(reference);

    let sections = if provider_date_valid {
        let components = description.map(parse_components).unwrap_or_default();
        Some(vec![RawSection {
            sort_order: 0,
            name: title.clone().unwrap_or_default(),
            price: String::new(),
            components,
        }])
    } else {
        None
    };

    Ok(RawProviderPayload {
        provider: entry.provider,
        raw_text: raw_text.to_string(),
        menu_date_iso: menu_date.map(date_key).unwrap_or_default(),
        provider_date_valid,
        restaurant_name: channel_title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| entry.name.clone()),
        restaurant_url: link
            .filter(|l| !l.is_empty())
            .or_else(|| entry.url.clone())
            .unwrap_or_default(),
        lunch_time: String::new(),
        sections,
    })
}

/// `D[-./]M[-./]YY[YY]` anywhere in the text; two-digit years are 2000s.
fn parse_item_date(text: &str) -> Option<NaiveDate> {
    let caps = ITEM_DATE_RE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Description paragraphs as component lines; when the description has no
/// `<p>` markup at all, the whole stripped description is one fallback
/// line. The description arrives entity-escaped more often than not, so it
/// is decoded before paragraph extraction.
fn parse_components(description: &str) -> Vec<String> {
    let decoded = decode_entities(description);
    let mut lines: Vec<String> = PARAGRAPH_RE
        .captures_iter(&decoded)
        .map(|c| reformat_component(&clean_fragment(&c[1])))
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        let fallback = reformat_component(&clean_fragment(&decoded));
        if !fallback.is_empty() {
            lines.push(fallback);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use lounas_core::catalog::Provider;

    fn rss_entry() -> RestaurantEntry {
        RestaurantEntry {
            code: "snellari-rss".to_string(),
            name: "Snellari".to_string(),
            provider: Provider::RssFeed,
            cost_number: Some("0437".to_string()),
            page_slug: None,
            url: None,
            enabled: true,
        }
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 19).expect("valid date")
    }

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Snellari - lounaslista</title>
    <link>https://example.test/snellari</link>
    <item>
      <title>Lounas 19.2.2026</title>
      <guid isPermaLink="false">menu-2026-02-19</guid>
      <link>https://example.test/snellari/lounas</link>
      <description>&lt;p&gt;Juustoista herkkusienikeittoa *, A, G, ILM, L&lt;/p&gt;&lt;p&gt;Broileria riisill&#228; L, G&lt;/p&gt;</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_item_and_reformats_components() {
        let payload = parse(&rss_entry(), FEED, reference()).expect("parses");
        assert!(payload.provider_date_valid);
        assert_eq!(payload.menu_date_iso, "2026-02-19");
        assert_eq!(payload.restaurant_name, "Snellari - lounaslista");
        assert_eq!(payload.restaurant_url, "https://example.test/snellari/lounas");
        let sections = payload.sections.expect("valid day");
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0].components,
            vec![
                "Juustoista herkkusienikeittoa (*, A, G, ILM, L)",
                "Broileria riisillä (L, G)",
            ]
        );
    }

    #[test]
    fn date_falls_back_to_the_guid() {
        let feed = FEED.replace("Lounas 19.2.2026", "Lounas");
        let payload = parse(&rss_entry(), &feed, reference()).expect("parses");
        // guid "menu-2026-02-19" does not carry a D.M.Y date for today.
        assert!(!payload.provider_date_valid);

        let feed = FEED.replace("menu-2026-02-19", "lounas-19.2.26");
        let feed = feed.replace("Lounas 19.2.2026", "Lounas");
        let payload = parse(&rss_entry(), &feed, reference()).expect("parses");
        assert!(payload.provider_date_valid, "guid date should be used");
        assert_eq!(payload.menu_date_iso, "2026-02-19");
    }

    #[test]
    fn date_mismatch_yields_no_sections() {
        let earlier = NaiveDate::from_ymd_opt(2026, 2, 18).expect("valid date");
        let payload = parse(&rss_entry(), FEED, earlier).expect("parses");
        assert!(!payload.provider_date_valid);
        assert!(payload.sections.is_none());
        assert_eq!(payload.menu_date_iso, "2026-02-19");
    }

    #[test]
    fn description_without_paragraphs_is_one_fallback_line() {
        let feed = FEED.replace(
            "&lt;p&gt;Juustoista herkkusienikeittoa *, A, G, ILM, L&lt;/p&gt;&lt;p&gt;Broileria riisill&#228; L, G&lt;/p&gt;",
            "Kalakeittoa ja leip&#228;&#228; L",
        );
        let payload = parse(&rss_entry(), &feed, reference()).expect("parses");
        let sections = payload.sections.expect("valid day");
        assert_eq!(sections[0].components, vec!["Kalakeittoa ja leipää (L)"]);
    }

    #[test]
    fn document_without_channel_still_parses() {
        let bare = r#"<item><title>Lounas 19.2.2026</title><description>Keittoa</description></item>"#;
        let payload = parse(&rss_entry(), bare, reference()).expect("parses");
        assert!(payload.provider_date_valid);
    }

    #[test]
    fn unrecognizable_document_is_a_shape_error() {
        let err = parse(&rss_entry(), "<html><body>502</body></html>", reference()).unwrap_err();
        assert!(matches!(err, ProviderError::Shape { .. }));
    }
}
