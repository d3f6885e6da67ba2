use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Application configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Requested feed language (`fi` or `en`).
    pub language: String,
    /// Periodic refresh interval in minutes; `0` disables the timer.
    pub refresh_minutes: u32,
    /// Code of the restaurant the collaborator displays initially.
    pub active_code: Option<String>,
    pub catalog_path: PathBuf,
    pub cache_path: PathBuf,
    /// Base URL of the structured-feed / rss-feed menu API.
    pub feed_base_url: String,
    /// Base URL under which scrape pages live, one slug per restaurant.
    pub scrape_base_url: String,
    /// Request timeout for background refreshes.
    pub background_timeout_secs: u64,
    /// Request timeout for user-triggered manual refreshes.
    pub manual_timeout_secs: u64,
    /// How often the retry poller wakes while retries are pending.
    pub retry_poll_secs: u64,
    pub log_level: String,
}

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading.
///
/// # Errors
///
/// Returns [`ConfigError`] if a set variable holds an unparseable value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(|key| std::env::var(key))
}

/// Build configuration from the provided env-var lookup function.
///
/// The core parsing logic is decoupled from the process environment so it
/// can be tested with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    Ok(AppConfig {
        language: or_default("LOUNAS_LANGUAGE", "fi"),
        refresh_minutes: parse_u32("LOUNAS_REFRESH_MINUTES", "30")?,
        active_code: lookup("LOUNAS_ACTIVE_CODE").ok(),
        catalog_path: PathBuf::from(or_default("LOUNAS_CATALOG_PATH", "./config/restaurants.yaml")),
        cache_path: PathBuf::from(or_default("LOUNAS_CACHE_PATH", "./cache/payloads.json")),
        feed_base_url: or_default("LOUNAS_FEED_BASE_URL", "https://www.compass-group.fi/menuapi"),
        scrape_base_url: or_default("LOUNAS_SCRAPE_BASE_URL", "https://antell.fi/lounas/kuopio"),
        background_timeout_secs: parse_u64("LOUNAS_BACKGROUND_TIMEOUT_SECS", "10")?,
        manual_timeout_secs: parse_u64("LOUNAS_MANUAL_TIMEOUT_SECS", "30")?,
        retry_poll_secs: parse_u64("LOUNAS_RETRY_POLL_SECS", "30")?,
        log_level: or_default("LOUNAS_LOG_LEVEL", "info"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let map = HashMap::new();
        let config = build_app_config(lookup_from_map(&map)).expect("defaults are valid");
        assert_eq!(config.language, "fi");
        assert_eq!(config.refresh_minutes, 30);
        assert_eq!(config.background_timeout_secs, 10);
        assert_eq!(config.manual_timeout_secs, 30);
        assert!(config.active_code.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let map = HashMap::from([
            ("LOUNAS_LANGUAGE", "en"),
            ("LOUNAS_REFRESH_MINUTES", "0"),
            ("LOUNAS_ACTIVE_CODE", "0437"),
        ]);
        let config = build_app_config(lookup_from_map(&map)).expect("valid overrides");
        assert_eq!(config.language, "en");
        assert_eq!(config.refresh_minutes, 0);
        assert_eq!(config.active_code.as_deref(), Some("0437"));
    }

    #[test]
    fn invalid_numeric_value_is_an_error() {
        let map = HashMap::from([("LOUNAS_REFRESH_MINUTES", "soon")]);
        let err = build_app_config(lookup_from_map(&map)).unwrap_err();
        assert!(err.to_string().contains("LOUNAS_REFRESH_MINUTES"));
    }
}
