use lounas_core::catalog::Provider;

/// Provider-agnostic intermediate record produced by every parser, one per
/// successfully interpreted fetch.
#[derive(Debug, Clone)]
pub struct RawProviderPayload {
    pub provider: Provider,
    /// The raw response body, retained verbatim for the cache.
    pub raw_text: String,
    /// ISO calendar date the payload claims to describe; empty when no
    /// well-formed date could be extracted.
    pub menu_date_iso: String,
    /// True only when the upstream yielded a well-formed date equal to the
    /// caller's reference date.
    pub provider_date_valid: bool,
    pub restaurant_name: String,
    pub restaurant_url: String,
    /// Free text, may be empty; only the structured feed supplies one.
    pub lunch_time: String,
    /// `None` means "no data could be associated with today";
    /// `Some(vec![])` means "a confirmed day with zero set menus".
    pub sections: Option<Vec<RawSection>>,
}

/// One set menu as extracted by a parser, before normalization.
#[derive(Debug, Clone)]
pub struct RawSection {
    pub sort_order: i64,
    pub name: String,
    pub price: String,
    pub components: Vec<String>,
}
