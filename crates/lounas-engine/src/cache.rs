//! Durable payload cache: one JSON blob mapping cache keys to the last
//! successfully fetched raw payload, independent of freshness.
//!
//! The cache is read once at startup and rewritten after every successful
//! network fetch. It is strictly best-effort — a corrupt or missing file
//! degrades to an empty cache, and a failed write leaves the previous blob
//! intact; the in-memory state stays authoritative either way.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lounas_core::catalog::Provider;

/// Cache slot for one restaurant/variant pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: String,
    pub last_updated_epoch_ms: i64,
}

/// Pure cache-key function: two fetches for the same restaurant and
/// language always read and write the same slot. Feed payloads vary by
/// language; scraped pages do not and share a fixed `static` variant.
#[must_use]
pub fn cache_key(code: &str, provider: Provider, language: &str) -> String {
    let variant = if provider.is_language_variant() {
        language
    } else {
        "static"
    };
    format!(
        "{}__{}__{}",
        sanitize_segment(provider.key()),
        sanitize_segment(code),
        sanitize_segment(variant)
    )
}

fn sanitize_segment(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// The payload cache, grown monotonically and never pruned.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheStore {
    /// Load the cache blob from `path`. Missing or corrupt data degrades to
    /// an empty cache with a warning; it never fails startup.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cache blob is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: String, payload: String, now_ms: i64) {
        self.entries.insert(
            key,
            CacheEntry {
                payload,
                last_updated_epoch_ms: now_ms,
            },
        );
    }

    /// Write the blob back to disk, best-effort. A failure is logged and
    /// swallowed; the previous persisted blob stays intact.
    pub fn persist(&self) {
        let serialized = match serde_json::to_string(&self.entries) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "cache serialization failed, keeping previous blob");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "cache dir creation failed");
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, serialized) {
            tracing::warn!(path = %self.path.display(), error = %e, "cache write failed");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
impl CacheStore {
    pub(crate) fn path_for_tests(&self) -> PathBuf {
        self.path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lounas-cache-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn cache_key_is_pure_and_variant_aware() {
        let a = cache_key("0437", Provider::StructuredFeed, "fi");
        let b = cache_key("0437", Provider::StructuredFeed, "fi");
        assert_eq!(a, b);
        assert_eq!(a, "structured-feed__0437__fi");

        // Language matters for feeds, not for scrapes.
        assert_ne!(a, cache_key("0437", Provider::StructuredFeed, "en"));
        assert_eq!(
            cache_key("antell-highway", Provider::HtmlScrape, "fi"),
            cache_key("antell-highway", Provider::HtmlScrape, "en"),
        );
    }

    #[test]
    fn cache_key_sanitizes_odd_characters() {
        assert_eq!(
            cache_key("ca fé/1", Provider::RssFeed, "fi"),
            "rss-feed__ca_f__1__fi"
        );
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = CacheStore::load(Path::new("/nonexistent/lounas/cache.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_blob_loads_empty() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json").expect("test file writes");
        let store = CacheStore::load(&path);
        assert!(store.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn put_persist_load_round_trip() {
        let path = temp_path("roundtrip");
        std::fs::remove_file(&path).ok();

        let mut store = CacheStore::load(&path);
        let key = cache_key("0437", Provider::StructuredFeed, "fi");
        store.put(key.clone(), "{\"MenusForDays\":[]}".to_string(), 1_000);
        store.persist();

        let reloaded = CacheStore::load(&path);
        assert_eq!(reloaded.len(), 1);
        let entry = reloaded.get(&key).expect("entry persisted");
        assert_eq!(entry.payload, "{\"MenusForDays\":[]}");
        assert_eq!(entry.last_updated_epoch_ms, 1_000);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn put_overwrites_the_same_slot() {
        let path = temp_path("overwrite");
        let mut store = CacheStore::load(&path);
        let key = cache_key("0437", Provider::StructuredFeed, "fi");
        store.put(key.clone(), "old".to_string(), 1);
        store.put(key.clone(), "new".to_string(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key).expect("slot exists").payload, "new");
    }
}
