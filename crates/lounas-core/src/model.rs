use serde::{Deserialize, Serialize};

/// One named set menu within a day's offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSection {
    /// Provider-declared sort key, or the positional index when the
    /// upstream declares none.
    pub sort_order: i64,
    pub name: String,
    /// Free text; formatting is provider-specific and passed through as-is.
    pub price: String,
    pub components: Vec<String>,
}

/// The normalized menu for one confirmed calendar day.
///
/// Absence of a `TodayMenu` means "no data could be associated with today";
/// an empty `menus` list means "a real, confirmed day with zero set menus"
/// (for example, the restaurant is closed). Callers must preserve that
/// distinction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayMenu {
    /// `YYYY-MM-DD` local calendar day this menu describes.
    pub date_iso: String,
    /// Free text, may be empty.
    pub lunch_time: String,
    pub menus: Vec<MenuSection>,
}
