//! Text formatting shared between the engine and display collaborators.

use crate::model::{MenuSection, TodayMenu};

/// Collapse runs of whitespace to single spaces and trim the ends.
#[must_use]
pub fn collapse_ws(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_space = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// Render an ISO date for display: `d.m.yyyy` for Finnish, `m/d/yyyy`
/// otherwise. Unparseable input is returned as-is.
#[must_use]
pub fn format_display_date(date_iso: &str, language: &str) -> String {
    let iso = collapse_ws(date_iso);
    let parts: Vec<&str> = iso.split('-').collect();
    if parts.len() != 3 {
        return iso;
    }
    let year = parts[0];
    let Ok(month) = parts[1].parse::<u32>() else {
        return iso;
    };
    let Ok(day) = parts[2].parse::<u32>() else {
        return iso;
    };
    if language == "fi" {
        format!("{day}.{month}.{year}")
    } else {
        format!("{month}/{day}/{year}")
    }
}

/// One-line date-plus-lunch-time header for a menu, or empty when there is
/// no menu to describe.
#[must_use]
pub fn date_and_time_line(today_menu: Option<&TodayMenu>, language: &str) -> String {
    let Some(menu) = today_menu else {
        return String::new();
    };
    let date_part = format_display_date(&menu.date_iso, language);
    let time_part = collapse_ws(&menu.lunch_time);
    match (date_part.is_empty(), time_part.is_empty()) {
        (false, false) => format!("{date_part} {time_part}"),
        (false, true) => date_part,
        _ => time_part,
    }
}

/// Section heading, falling back to `"Menu"` for unnamed sections, with an
/// optional price suffix.
#[must_use]
pub fn menu_heading(section: &MenuSection, show_prices: bool) -> String {
    let mut heading = collapse_ws(&section.name);
    if heading.is_empty() {
        heading = "Menu".to_string();
    }
    let price = collapse_ws(&section.price);
    if show_prices && !price.is_empty() {
        format!("{heading} - {price}")
    } else {
        heading
    }
}

/// Split a trailing parenthesized group off a component line.
///
/// Returns `(main, suffix)`; the suffix is empty unless the line ends with
/// exactly one balanced `(...)` group and a non-empty main text precedes it.
#[must_use]
pub fn split_component_suffix(component: &str) -> (String, String) {
    let text = collapse_ws(component);
    if text.is_empty() {
        return (String::new(), String::new());
    }
    if let Some(idx) = text.rfind('(') {
        if text.ends_with(')') {
            let (main, suffix) = text.split_at(idx);
            let main = main.trim();
            let suffix = suffix.trim();
            let opens = suffix.chars().filter(|c| *c == '(').count();
            let closes = suffix.chars().filter(|c| *c == ')').count();
            if opens == 1 && closes == 1 && !main.is_empty() {
                return (main.to_string(), suffix.to_string());
            }
        }
    }
    (text, String::new())
}
