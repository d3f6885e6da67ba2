//! Per-restaurant fetch state machine.
//!
//! One [`RestaurantState`] per catalog code, owned exclusively by the
//! engine. Transitions: `Idle → Loading → {Ok, Stale, Error}`, back to
//! `Loading` on the next attempt only while no payload is retained, and
//! `Stale ⇄ Ok` as freshness is re-evaluated against the reference date.

use lounas_core::model::TodayMenu;

/// Retry delay ladder, keyed by consecutive-failure count: 5, 10, then
/// 15 minutes for every failure beyond the second.
#[must_use]
pub fn retry_delay_ms(consecutive_failures: u32) -> i64 {
    match consecutive_failures {
        0 | 1 => 5 * 60_000,
        2 => 10 * 60_000,
        _ => 15 * 60_000,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Ok,
    Stale,
    Error,
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FetchStatus::Idle => "idle",
            FetchStatus::Loading => "loading",
            FetchStatus::Ok => "ok",
            FetchStatus::Stale => "stale",
            FetchStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Where an applied payload came from. Cache replays never touch the
/// failure bookkeeping; network attempts always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    Network,
    Cache,
}

/// A successfully parsed and normalized fetch, ready to apply.
#[derive(Debug, Clone)]
pub struct ParsedFetch {
    pub raw_text: String,
    pub menu_date_iso: String,
    pub provider_date_valid: bool,
    pub today_menu: Option<TodayMenu>,
    pub restaurant_name: String,
    pub restaurant_url: String,
}

#[derive(Debug, Clone)]
pub struct RestaurantState {
    pub status: FetchStatus,
    pub error_message: String,
    pub last_updated_epoch_ms: i64,
    /// Last successfully fetched raw payload, any age. Empty exactly when
    /// the restaurant has never produced a payload — which is also the only
    /// situation in which `status` may be `Error`.
    pub payload_text: String,
    pub today_menu: Option<TodayMenu>,
    pub menu_date_iso: String,
    pub provider_date_valid: bool,
    pub is_today_fresh: bool,
    pub consecutive_failures: u32,
    /// Epoch ms of the next scheduled retry; 0 means none pending.
    pub next_retry_epoch_ms: i64,
    pub restaurant_name: String,
    pub restaurant_url: String,
}

impl RestaurantState {
    #[must_use]
    pub fn new(fallback_name: &str, fallback_url: &str) -> Self {
        Self {
            status: FetchStatus::Idle,
            error_message: String::new(),
            last_updated_epoch_ms: 0,
            payload_text: String::new(),
            today_menu: None,
            menu_date_iso: String::new(),
            provider_date_valid: false,
            is_today_fresh: false,
            consecutive_failures: 0,
            next_retry_epoch_ms: 0,
            restaurant_name: fallback_name.to_string(),
            restaurant_url: fallback_url.to_string(),
        }
    }

    /// A fetch is being issued. Only a restaurant with no retained payload
    /// shows `Loading` — anything cached, however stale, keeps displaying.
    pub fn begin_fetch(&mut self) {
        if self.payload_text.is_empty() {
            self.status = FetchStatus::Loading;
            self.error_message.clear();
        }
    }

    /// Apply a successfully parsed payload.
    ///
    /// `timestamp_ms` is the moment the payload was obtained: now for
    /// network fetches, the cached `last_updated_epoch_ms` for replays.
    pub fn apply_payload(
        &mut self,
        fetch: ParsedFetch,
        source: PayloadSource,
        reference_key: &str,
        timestamp_ms: i64,
        now_ms: i64,
    ) {
        let fresh = fetch.provider_date_valid && fetch.menu_date_iso == reference_key;

        self.payload_text = fetch.raw_text;
        self.today_menu = fetch.today_menu;
        self.menu_date_iso = fetch.menu_date_iso;
        self.provider_date_valid = fetch.provider_date_valid;
        self.is_today_fresh = fresh;
        self.last_updated_epoch_ms = timestamp_ms;
        if !fetch.restaurant_name.is_empty() {
            self.restaurant_name = fetch.restaurant_name;
        }
        if !fetch.restaurant_url.is_empty() {
            self.restaurant_url = fetch.restaurant_url;
        }

        if fresh {
            self.status = FetchStatus::Ok;
            self.error_message.clear();
            self.consecutive_failures = 0;
            self.next_retry_epoch_ms = 0;
            return;
        }

        // A parse can nominally succeed over an empty body (scrape of a
        // blank page); without any retained payload that is still `Error`.
        self.status = if self.payload_text.is_empty() {
            FetchStatus::Error
        } else {
            FetchStatus::Stale
        };
        self.error_message = if self.menu_date_iso.is_empty() {
            format!("no menu published for {reference_key}")
        } else {
            format!(
                "menu date {} does not match today {reference_key}",
                self.menu_date_iso
            )
        };
        if source == PayloadSource::Network {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            self.next_retry_epoch_ms = now_ms + retry_delay_ms(self.consecutive_failures);
        }
    }

    /// Apply a transport or payload-shape failure from a network attempt.
    ///
    /// A restaurant that is already fresh-for-today silently reconfirms
    /// `Ok` and resets its failure bookkeeping — a transient failure must
    /// not regress a confirmed-fresh state.
    pub fn apply_failure(&mut self, message: &str, now_ms: i64) {
        if self.is_today_fresh {
            self.status = FetchStatus::Ok;
            self.consecutive_failures = 0;
            self.next_retry_epoch_ms = 0;
            return;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.error_message = message.to_string();
        self.status = if self.payload_text.is_empty() {
            FetchStatus::Error
        } else {
            FetchStatus::Stale
        };
        self.next_retry_epoch_ms = now_ms + retry_delay_ms(self.consecutive_failures);
    }

    /// Whether the retry poller should fetch this restaurant now.
    #[must_use]
    pub fn retry_due(&self, now_ms: i64) -> bool {
        !self.is_today_fresh && self.next_retry_epoch_ms > 0 && now_ms >= self.next_retry_epoch_ms
    }
}
