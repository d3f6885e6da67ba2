//! Parser for the structured-feed provider: a JSON document with a
//! `MenusForDays` array, one entry per published day.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use lounas_core::catalog::RestaurantEntry;
use lounas_core::dates::date_key;
use lounas_core::format::collapse_ws;

use crate::error::ProviderError;
use crate::types::{RawProviderPayload, RawSection};

#[derive(Debug, Deserialize)]
struct FeedDocument {
    #[serde(rename = "RestaurantName")]
    restaurant_name: Option<String>,
    #[serde(rename = "RestaurantUrl")]
    restaurant_url: Option<String>,
    #[serde(rename = "MenusForDays")]
    menus_for_days: Option<Vec<FeedDay>>,
    #[serde(rename = "ErrorText")]
    error_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedDay {
    #[serde(rename = "Date")]
    date: Option<String>,
    #[serde(rename = "LunchTime")]
    lunch_time: Option<String>,
    #[serde(rename = "SetMenus")]
    set_menus: Option<Vec<FeedSetMenu>>,
}

#[derive(Debug, Deserialize)]
struct FeedSetMenu {
    #[serde(rename = "SortOrder", default, deserialize_with = "lenient_i64")]
    sort_order: Option<i64>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Price")]
    price: Option<String>,
    #[serde(rename = "Components")]
    components: Option<Vec<String>>,
}

/// Accept a JSON number, a numeric string, or anything else (as absent).
/// Upstream has been observed switching `SortOrder` between all three.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// Parse a structured-feed JSON payload against a reference date.
///
/// Selects the day whose `Date` (truncated at `T`) equals the reference
/// date. A payload without that day is a valid "no data for today" outcome,
/// not an error; `menu_date_iso` then carries the maximum day-date present
/// so the caller can still see what the payload covers.
///
/// # Errors
///
/// - [`ProviderError::Deserialize`] when the body is not parseable JSON.
/// - [`ProviderError::Shape`] when the feed declares an error text or the
///   `MenusForDays` array is missing.
pub fn parse(
    entry: &RestaurantEntry,
    raw_text: &str,
    reference: NaiveDate,
) -> Result<RawProviderPayload, ProviderError> {
    let doc: FeedDocument =
        serde_json::from_str(raw_text).map_err(|e| ProviderError::Deserialize {
            context: format!("structured feed for '{}'", entry.code),
            source: e,
        })?;

    let error_text = collapse_ws(doc.error_text.as_deref().unwrap_or_default());
    if !error_text.is_empty() {
        return Err(ProviderError::Shape {
            provider: entry.provider.key().to_string(),
            reason: error_text,
        });
    }

    let Some(days) = doc.menus_for_days else {
        return Err(ProviderError::Shape {
            provider: entry.provider.key().to_string(),
            reason: "MenusForDays array is missing".to_string(),
        });
    };

    let reference_key = date_key(reference);
    let mut max_date_seen = String::new();
    let mut matched: Option<FeedDay> = None;

    for day in days {
        let day_key = collapse_ws(day.date.as_deref().unwrap_or_default())
            .split('T')
            .next()
            .unwrap_or_default()
            .to_string();
        if !day_key.is_empty() && day_key > max_date_seen {
            max_date_seen.clone_from(&day_key);
        }
        if day_key == reference_key && matched.is_none() {
            matched = Some(day);
        }
    }

    let restaurant_name = collapse_ws(doc.restaurant_name.as_deref().unwrap_or_default());
    let restaurant_url = collapse_ws(doc.restaurant_url.as_deref().unwrap_or_default());

    let payload = match matched {
        Some(day) => RawProviderPayload {
            provider: entry.provider,
            raw_text: raw_text.to_string(),
            menu_date_iso: reference_key,
            provider_date_valid: true,
            restaurant_name,
            restaurant_url,
            lunch_time: collapse_ws(day.lunch_time.as_deref().unwrap_or_default()),
            sections: Some(sections_for_day(day.set_menus.unwrap_or_default())),
        },
        None => RawProviderPayload {
            provider: entry.provider,
            raw_text: raw_text.to_string(),
            menu_date_iso: max_date_seen,
            provider_date_valid: false,
            restaurant_name,
            restaurant_url,
            lunch_time: String::new(),
            sections: None,
        },
    };
    Ok(payload)
}

/// Sort set menus ascending by `SortOrder` (missing/non-numeric as 0,
/// original order as tiebreak) and convert them to raw sections.
fn sections_for_day(set_menus: Vec<FeedSetMenu>) -> Vec<RawSection> {
    let mut menus: Vec<FeedSetMenu> = set_menus;
    // Stable sort keeps the feed's original order for equal keys.
    menus.sort_by_key(|m| m.sort_order.unwrap_or(0));
    menus
        .into_iter()
        .map(|m| RawSection {
            sort_order: m.sort_order.unwrap_or(0),
            name: m.name.unwrap_or_default(),
            price: m.price.unwrap_or_default(),
            components: m.components.unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lounas_core::catalog::Provider;

    fn feed_entry() -> RestaurantEntry {
        RestaurantEntry {
            code: "0437".to_string(),
            name: "Snellmania".to_string(),
            provider: Provider::StructuredFeed,
            cost_number: Some("0437".to_string()),
            page_slug: None,
            url: None,
            enabled: true,
        }
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 19).expect("valid date")
    }

    const FEED: &str = r#"{
        "RestaurantName": "Snellmania",
        "RestaurantUrl": "https://example.test/snellmania",
        "MenusForDays": [
            {
                "Date": "2026-02-19T00:00:00+02:00",
                "LunchTime": "10:30–14:30",
                "SetMenus": [
                    {"SortOrder": 2, "Name": "Vegan", "Price": "2,95 €", "Components": ["Paahdettua kukkakaalia (Veg)"]},
                    {"SortOrder": 1, "Name": "Lunch", "Price": "5,60 €", "Components": ["Broileria (L, G)", "Riisiä (Veg)"]}
                ]
            },
            {
                "Date": "2026-02-20T00:00:00+02:00",
                "LunchTime": "",
                "SetMenus": []
            }
        ]
    }"#;

    #[test]
    fn selects_the_day_matching_the_reference_date() {
        let payload = parse(&feed_entry(), FEED, reference()).expect("parses");
        assert!(payload.provider_date_valid);
        assert_eq!(payload.menu_date_iso, "2026-02-19");
        assert_eq!(payload.restaurant_name, "Snellmania");
        let sections = payload.sections.expect("day matched");
        assert_eq!(sections.len(), 2);
        // Sorted ascending by SortOrder, not feed order.
        assert_eq!(sections[0].name, "Lunch");
        assert_eq!(sections[1].name, "Vegan");
    }

    #[test]
    fn absent_day_is_a_valid_no_data_outcome() {
        let later = NaiveDate::from_ymd_opt(2026, 2, 23).expect("valid date");
        let payload = parse(&feed_entry(), FEED, later).expect("parses");
        assert!(!payload.provider_date_valid);
        assert!(payload.sections.is_none());
        assert_eq!(payload.menu_date_iso, "2026-02-20", "max date seen");
    }

    #[test]
    fn invalid_json_is_a_deserialize_error() {
        let err = parse(&feed_entry(), "<html>offline</html>", reference()).unwrap_err();
        assert!(matches!(err, ProviderError::Deserialize { .. }));
    }

    #[test]
    fn provider_error_text_is_a_shape_error() {
        let body = r#"{"ErrorText": "Cost center not found", "MenusForDays": []}"#;
        let err = parse(&feed_entry(), body, reference()).unwrap_err();
        assert!(err.to_string().contains("Cost center not found"));
    }

    #[test]
    fn missing_menus_array_is_a_shape_error() {
        let body = r#"{"RestaurantName": "Snellmania"}"#;
        let err = parse(&feed_entry(), body, reference()).unwrap_err();
        assert!(err.to_string().contains("MenusForDays"));
    }

    #[test]
    fn sort_order_tolerates_strings_and_junk() {
        let body = r#"{
            "MenusForDays": [{
                "Date": "2026-02-19T00:00:00",
                "SetMenus": [
                    {"SortOrder": "10", "Name": "Last"},
                    {"SortOrder": {"bogus": true}, "Name": "First"},
                    {"Name": "Also first"}
                ]
            }]
        }"#;
        let payload = parse(&feed_entry(), body, reference()).expect("parses");
        let sections = payload.sections.expect("day matched");
        assert_eq!(sections[0].name, "First");
        assert_eq!(sections[1].name, "Also first");
        assert_eq!(sections[2].name, "Last");
        assert_eq!(sections[2].sort_order, 10);
    }

    #[test]
    fn empty_set_menus_is_a_confirmed_empty_day() {
        let tomorrow = NaiveDate::from_ymd_opt(2026, 2, 20).expect("valid date");
        let payload = parse(&feed_entry(), FEED, tomorrow).expect("parses");
        assert!(payload.provider_date_valid);
        assert_eq!(payload.sections.expect("day matched").len(), 0);
    }
}
