//! Allergen-token reformatter for rss-feed component lines.
//!
//! Upstream writes diet/allergen marks as a loose comma tail
//! (`"Juustokeittoa *, A, G, ILM, L"`) instead of the parenthesized group
//! the other providers use. This module rewrites such tails into a
//! normalized trailing `(…)` group so every provider's components read the
//! same downstream.

/// Bare-word tokens recognized while scanning a trailing segment list.
const WORD_TOKENS: &[&str] = &["VEG", "VS", "ILM"];

/// Two-letter codes accepted inside an already-formed trailing group.
const TWO_LETTER_CODES: &[&str] = &["VL", "VS", "VE"];

/// Most trailing bare words (no comma separators) that will be peeled.
const MAX_BARE_TOKENS: usize = 4;

const TRAILING_PUNCT: &[char] = &[' ', '.', ',', ';'];

/// Rewrite a component line so recognized trailing allergen tokens sit in a
/// single normalized `(…)` group.
///
/// Lines already ending in a well-formed group are left alone; lines with
/// no recognizable tokens are returned unchanged apart from trailing
/// punctuation.
#[must_use]
pub fn reformat_component(line: &str) -> String {
    let line = line.trim();
    if ends_with_token_group(line) {
        return line.to_string();
    }

    let stripped = line.trim_end_matches(TRAILING_PUNCT);
    if stripped.is_empty() {
        return String::new();
    }

    let mut rest = stripped;
    let mut tokens_rev: Vec<String> = Vec::new();

    // Comma-separated segments, scanned from the right until one fails to
    // normalize as a token.
    while let Some((head, tail)) = rest.rsplit_once(',') {
        let Some(token) = normalize_token(tail.trim()) else {
            break;
        };
        if head.trim().is_empty() {
            break;
        }
        tokens_rev.push(token);
        rest = head.trim_end();
    }

    // A standalone trailing `*` and a few trailing bare words, not comma
    // separated.
    let mut bare_peeled = 0usize;
    loop {
        let trimmed = rest.trim_end();
        let Some((head, word)) = trimmed.rsplit_once(char::is_whitespace) else {
            break;
        };
        if head.trim().is_empty() {
            break;
        }
        let Some(token) = normalize_token(word.trim()) else {
            break;
        };
        if token != "*" {
            if bare_peeled >= MAX_BARE_TOKENS {
                break;
            }
            bare_peeled += 1;
        }
        tokens_rev.push(token);
        rest = head.trim_end();
    }

    if tokens_rev.is_empty() {
        return stripped.to_string();
    }

    let main = rest.trim_end_matches(TRAILING_PUNCT).trim();
    if main.is_empty() {
        return stripped.to_string();
    }

    tokens_rev.reverse();
    format!("{main} ({})", tokens_rev.join(", "))
}

/// Normalize one scanned segment into a token: `*`, a single letter
/// (uppercased), or one of the fixed word vocabulary (`VEG` → `Veg`).
fn normalize_token(segment: &str) -> Option<String> {
    if segment == "*" {
        return Some("*".to_string());
    }
    let mut chars = segment.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_alphabetic() {
            return Some(ch.to_uppercase().to_string());
        }
        return None;
    }
    let upper = segment.to_uppercase();
    if upper == "VEG" {
        return Some("Veg".to_string());
    }
    if WORD_TOKENS.contains(&upper.as_str()) {
        return Some(upper);
    }
    None
}

/// True when the line already ends in a well-formed token group with a
/// non-empty main text before it.
fn ends_with_token_group(line: &str) -> bool {
    if !line.ends_with(')') {
        return false;
    }
    let Some(open) = line.rfind('(') else {
        return false;
    };
    if line[..open].trim().is_empty() {
        return false;
    }
    let inner = &line[open + 1..line.len() - 1];
    if inner.trim().is_empty() {
        return false;
    }
    inner.split(',').all(|t| is_group_token(t.trim()))
}

fn is_group_token(token: &str) -> bool {
    if token == "*" {
        return true;
    }
    let count = token.chars().count();
    if count == 1 {
        return token.chars().all(char::is_alphabetic);
    }
    let upper = token.to_uppercase();
    if count == 2 {
        return TWO_LETTER_CODES.contains(&upper.as_str());
    }
    // Accept this module's own normalized output on a second pass.
    upper == "VEG" || upper == "ILM"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_tail_becomes_a_group() {
        assert_eq!(
            reformat_component("Juustoista herkkusienikeittoa *, A, G, ILM, L"),
            "Juustoista herkkusienikeittoa (*, A, G, ILM, L)"
        );
    }

    #[test]
    fn existing_group_is_left_alone() {
        assert_eq!(
            reformat_component("Broileria (L, G)"),
            "Broileria (L, G)"
        );
        assert_eq!(
            reformat_component("Kukkakaalia (Veg)"),
            "Kukkakaalia (Veg)"
        );
    }

    #[test]
    fn trailing_parens_that_are_not_tokens_are_not_a_group() {
        // "(kala)" is a description, not a token group; the line has no
        // loose tail either, so it passes through.
        assert_eq!(
            reformat_component("Keittoa (kala)"),
            "Keittoa (kala)"
        );
    }

    #[test]
    fn bare_words_without_commas_are_peeled() {
        assert_eq!(reformat_component("Kalakeitto L G"), "Kalakeitto (L, G)");
        assert_eq!(reformat_component("Pastaa VEG"), "Pastaa (Veg)");
    }

    #[test]
    fn standalone_star_is_peeled() {
        assert_eq!(reformat_component("Keittoa *"), "Keittoa (*)");
    }

    #[test]
    fn mixed_comma_and_bare_tail() {
        assert_eq!(
            reformat_component("Kanaa riisillä L, G"),
            "Kanaa riisillä (L, G)"
        );
    }

    #[test]
    fn no_tokens_drops_only_trailing_punctuation() {
        assert_eq!(
            reformat_component("Jälkiruoaksi kiisseliä."),
            "Jälkiruoaksi kiisseliä"
        );
        assert_eq!(reformat_component("Perunaa, riisiä"), "Perunaa, riisiä");
    }

    #[test]
    fn vocabulary_words_normalize_case() {
        assert_eq!(
            reformat_component("Linssikeittoa veg, ilm"),
            "Linssikeittoa (Veg, ILM)"
        );
    }

    #[test]
    fn main_text_is_never_consumed_entirely() {
        assert_eq!(reformat_component("*"), "*");
        assert_eq!(reformat_component("G"), "G");
    }

    #[test]
    fn empty_line_stays_empty() {
        assert_eq!(reformat_component("   "), "");
    }
}
