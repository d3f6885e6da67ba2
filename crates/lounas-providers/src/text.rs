//! Shared text extraction helpers for the scrape and rss parsers.

use std::sync::LazyLock;

use regex::Regex;

pub use lounas_core::format::collapse_ws;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// Remove every HTML/XML tag, leaving the text content. Tags are replaced
/// with a space so that adjacent elements do not run together.
#[must_use]
pub fn strip_tags(value: &str) -> String {
    TAG_RE.replace_all(value, " ").into_owned()
}

/// Decode HTML entities (`&amp;`, `&#228;`, …) into characters.
#[must_use]
pub fn decode_entities(value: &str) -> String {
    html_escape::decode_html_entities(value).into_owned()
}

/// The full cleanup pipeline for a markup fragment: strip tags, decode
/// entities, collapse whitespace.
#[must_use]
pub fn clean_fragment(value: &str) -> String {
    collapse_ws(&decode_entities(&strip_tags(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_tags_leaves_text() {
        assert_eq!(
            collapse_ws(&strip_tags("<p>Soup <b>of</b> the day</p>")),
            "Soup of the day"
        );
    }

    #[test]
    fn decode_entities_handles_named_and_numeric() {
        assert_eq!(decode_entities("Fish &amp; chips"), "Fish & chips");
        assert_eq!(decode_entities("Lohikeitto &#228;"), "Lohikeitto ä");
    }

    #[test]
    fn clean_fragment_composes_all_three() {
        assert_eq!(
            clean_fragment("  <li> Kanaa &amp;\n riisi&#228; </li> "),
            "Kanaa & riisiä"
        );
    }

    #[test]
    fn clean_fragment_separates_adjacent_elements() {
        assert_eq!(clean_fragment("<td>10:30</td><td>14:30</td>"), "10:30 14:30");
    }
}
