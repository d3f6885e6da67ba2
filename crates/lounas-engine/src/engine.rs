//! The fetch orchestrator.
//!
//! One task owns every `RestaurantState`, the request serials, and the
//! cache store; timers and network completions are interleaved through a
//! single `select!` loop, so no locks are involved. In-flight requests are
//! never aborted — a completion is simply discarded when its captured
//! serial no longer matches the restaurant's current serial, which is what
//! guarantees that a superseded response can never overwrite newer state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::{mpsc, watch};

use lounas_core::catalog::RestaurantEntry;
use lounas_core::config::AppConfig;
use lounas_core::dates::{date_key, local_today, now_epoch_ms};
use lounas_core::model::TodayMenu;
use lounas_providers::error::FetchError;
use lounas_providers::{normalize, parse, MenuClient, TimeoutClass};

use crate::cache::{cache_key, CacheStore};
use crate::state::{FetchStatus, ParsedFetch, PayloadSource, RestaurantState};

/// Inbound configuration changes and triggers from the collaborator.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Select the restaurant whose state the snapshot channel describes.
    SetRestaurant(String),
    SetLanguage(String),
    /// Periodic refresh interval in minutes; 0 disables the timer.
    SetRefreshMinutes(u32),
    /// Toggle catalog membership for one entry.
    SetEntryEnabled { code: String, enabled: bool },
    /// Manual refresh: force-fetch every enabled restaurant.
    RefreshAll,
    Shutdown,
}

/// Snapshot of the active restaurant, published on every state mutation.
/// The collaborator re-renders whenever `model_version` changes.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub model_version: u64,
    pub code: String,
    pub status: FetchStatus,
    pub error_message: String,
    pub last_updated_epoch_ms: i64,
    pub today_menu: Option<TodayMenu>,
    pub restaurant_name: String,
    pub restaurant_url: String,
    pub is_today_fresh: bool,
}

/// A finished network attempt, tagged with the serial captured at issue
/// time and the language the request was built with.
#[derive(Debug)]
struct FetchCompletion {
    code: String,
    serial: u64,
    language: String,
    result: Result<String, FetchError>,
}

pub struct Engine {
    entries: HashMap<String, RestaurantEntry>,
    /// Catalog order, kept for deterministic fetch passes.
    order: Vec<String>,
    enabled: HashMap<String, bool>,
    active_code: String,
    language: String,
    refresh_minutes: u32,
    retry_poll_secs: u64,
    states: HashMap<String, RestaurantState>,
    serials: HashMap<String, u64>,
    cache: CacheStore,
    client: Arc<MenuClient>,
    completions_tx: Option<mpsc::Sender<FetchCompletion>>,
    snapshot_tx: watch::Sender<EngineSnapshot>,
    model_version: u64,
}

impl Engine {
    /// Build an engine over a validated catalog. Returns the engine and the
    /// snapshot channel the collaborator watches.
    #[must_use]
    pub fn new(
        catalog: Vec<RestaurantEntry>,
        config: &AppConfig,
        client: MenuClient,
        cache: CacheStore,
    ) -> (Self, watch::Receiver<EngineSnapshot>) {
        let order: Vec<String> = catalog.iter().map(|e| e.code.clone()).collect();
        let active_code = config
            .active_code
            .clone()
            .filter(|code| order.contains(code))
            .or_else(|| order.first().cloned())
            .unwrap_or_default();

        let mut entries = HashMap::new();
        let mut enabled = HashMap::new();
        let mut states = HashMap::new();
        for entry in catalog {
            enabled.insert(entry.code.clone(), entry.enabled);
            states.insert(
                entry.code.clone(),
                RestaurantState::new(&entry.name, entry.url.as_deref().unwrap_or_default()),
            );
            entries.insert(entry.code.clone(), entry);
        }

        let initial = EngineSnapshot {
            model_version: 0,
            code: active_code.clone(),
            status: FetchStatus::Idle,
            error_message: String::new(),
            last_updated_epoch_ms: 0,
            today_menu: None,
            restaurant_name: states
                .get(&active_code)
                .map(|s| s.restaurant_name.clone())
                .unwrap_or_default(),
            restaurant_url: String::new(),
            is_today_fresh: false,
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let engine = Self {
            entries,
            order,
            enabled,
            active_code,
            language: config.language.clone(),
            refresh_minutes: config.refresh_minutes,
            retry_poll_secs: config.retry_poll_secs.max(1),
            states,
            serials: HashMap::new(),
            cache,
            client: Arc::new(client),
            completions_tx: None,
            snapshot_tx,
            model_version: 0,
        };
        (engine, snapshot_rx)
    }

    /// Run the orchestrator until `Shutdown` arrives or the command channel
    /// closes. All four triggers — periodic refresh, retry poll, midnight
    /// rollover, manual refresh — route through the same fetch entry point.
    pub async fn run(mut self, mut commands: mpsc::Receiver<EngineCommand>) {
        let (tx, mut completions) = mpsc::channel::<FetchCompletion>(64);
        self.completions_tx = Some(tx);

        self.bootstrap_from_cache();
        self.publish();
        self.refresh_pass(TimeoutClass::Background);

        let mut refresh_tick = refresh_interval(self.refresh_minutes);
        let mut retry_tick = tokio::time::interval(Duration::from_secs(self.retry_poll_secs));
        retry_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut midnight = Box::pin(tokio::time::sleep(until_next_midnight()));

        loop {
            tokio::select! {
                maybe_cmd = commands.recv() => {
                    match maybe_cmd {
                        None | Some(EngineCommand::Shutdown) => {
                            tracing::info!("engine shutting down");
                            break;
                        }
                        Some(EngineCommand::SetRefreshMinutes(minutes)) => {
                            self.refresh_minutes = minutes;
                            refresh_tick = refresh_interval(minutes);
                            tracing::info!(minutes, "refresh interval changed");
                        }
                        Some(cmd) => self.handle_command(cmd),
                    }
                }
                Some(done) = completions.recv() => {
                    self.apply_completion(done);
                }
                _ = refresh_tick.tick(), if self.refresh_minutes > 0 => {
                    tracing::debug!("periodic refresh pass");
                    self.refresh_pass(TimeoutClass::Background);
                }
                _ = retry_tick.tick(), if self.has_pending_retry() => {
                    self.retry_pass();
                }
                () = &mut midnight => {
                    self.rollover();
                    midnight.set(tokio::time::sleep(until_next_midnight()));
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::SetRestaurant(code) => {
                if !self.entries.contains_key(&code) {
                    tracing::warn!(code = %code, "ignoring selection of unknown restaurant");
                    return;
                }
                self.active_code = code.clone();
                self.publish();
                // A selection change is a user action; fetch eagerly unless
                // the selection is already confirmed fresh.
                let fresh = self.states.get(&code).is_some_and(|s| s.is_today_fresh);
                if !fresh {
                    self.issue_fetch(&code, TimeoutClass::Manual);
                    self.publish();
                }
            }
            EngineCommand::SetLanguage(language) => {
                if language == self.language {
                    return;
                }
                tracing::info!(language = %language, "language changed, rebuilding state from cache");
                self.language = language;
                for code in self.order.clone() {
                    let Some(entry) = self.entries.get(&code) else {
                        continue;
                    };
                    if !entry.provider.is_language_variant() {
                        continue;
                    }
                    let fallback_url = entry.url.clone().unwrap_or_default();
                    let fallback_name = entry.name.clone();
                    self.states
                        .insert(code.clone(), RestaurantState::new(&fallback_name, &fallback_url));
                    self.bootstrap_entry(&code);
                }
                self.publish();
                self.refresh_pass(TimeoutClass::Background);
            }
            EngineCommand::SetEntryEnabled { code, enabled } => {
                if !self.entries.contains_key(&code) {
                    return;
                }
                self.enabled.insert(code.clone(), enabled);
                if enabled {
                    let fresh = self.states.get(&code).is_some_and(|s| s.is_today_fresh);
                    if !fresh {
                        self.issue_fetch(&code, TimeoutClass::Background);
                    }
                }
                self.publish();
            }
            EngineCommand::RefreshAll => {
                tracing::info!("manual refresh pass");
                self.refresh_pass(TimeoutClass::Manual);
            }
            // Handled in the run loop (needs the interval), listed here for
            // exhaustiveness.
            EngineCommand::SetRefreshMinutes(_) | EngineCommand::Shutdown => {}
        }
    }

    /// Apply cached payloads at startup. Cache-sourced applications carry
    /// the cached timestamp and never touch failure bookkeeping.
    fn bootstrap_from_cache(&mut self) {
        for code in self.order.clone() {
            self.bootstrap_entry(&code);
        }
    }

    fn bootstrap_entry(&mut self, code: &str) {
        let Some(entry) = self.entries.get(code).cloned() else {
            return;
        };
        let key = cache_key(&entry.code, entry.provider, &self.language);
        let Some(cached) = self.cache.get(&key).cloned() else {
            return;
        };
        let reference = local_today();
        match parse(&entry, &cached.payload, reference) {
            Ok(payload) => {
                let today_menu = normalize(&payload);
                if let Some(state) = self.states.get_mut(code) {
                    state.apply_payload(
                        ParsedFetch {
                            raw_text: payload.raw_text,
                            menu_date_iso: payload.menu_date_iso,
                            provider_date_valid: payload.provider_date_valid,
                            today_menu,
                            restaurant_name: payload.restaurant_name,
                            restaurant_url: payload.restaurant_url,
                        },
                        PayloadSource::Cache,
                        &date_key(reference),
                        cached.last_updated_epoch_ms,
                        now_epoch_ms(),
                    );
                    tracing::info!(code, fresh = state.is_today_fresh, "cache hit");
                }
            }
            Err(e) => {
                tracing::warn!(code, error = %e, "cached payload no longer parses, ignoring");
            }
        }
    }

    /// Fetch every enabled restaurant.
    fn refresh_pass(&mut self, class: TimeoutClass) {
        for code in self.order.clone() {
            if self.is_enabled(&code) {
                self.issue_fetch(&code, class);
            }
        }
        self.publish();
    }

    /// Fetch only enabled restaurants whose retry deadline has elapsed and
    /// which are not yet fresh-for-today.
    fn retry_pass(&mut self) {
        let now = now_epoch_ms();
        let due: Vec<String> = self
            .order
            .iter()
            .filter(|code| {
                self.is_enabled(code)
                    && self
                        .states
                        .get(code.as_str())
                        .is_some_and(|s| s.retry_due(now))
            })
            .cloned()
            .collect();
        if due.is_empty() {
            return;
        }
        tracing::debug!(count = due.len(), "retry pass");
        for code in due {
            self.issue_fetch(&code, TimeoutClass::Background);
        }
        self.publish();
    }

    /// Midnight rollover: re-derive every state from its retained payload
    /// under the new day's reference date — flagging yesterday's data stale
    /// immediately — then force a network refresh pass.
    fn rollover(&mut self) {
        let reference = local_today();
        let reference_key = date_key(reference);
        tracing::info!(day = %reference_key, "midnight rollover");

        for code in self.order.clone() {
            let Some(entry) = self.entries.get(&code).cloned() else {
                continue;
            };
            let (payload_text, last_updated) = match self.states.get(&code) {
                Some(s) if !s.payload_text.is_empty() => {
                    (s.payload_text.clone(), s.last_updated_epoch_ms)
                }
                _ => continue,
            };
            match parse(&entry, &payload_text, reference) {
                Ok(payload) => {
                    let today_menu = normalize(&payload);
                    if let Some(state) = self.states.get_mut(&code) {
                        state.apply_payload(
                            ParsedFetch {
                                raw_text: payload.raw_text,
                                menu_date_iso: payload.menu_date_iso,
                                provider_date_valid: payload.provider_date_valid,
                                today_menu,
                                restaurant_name: payload.restaurant_name,
                                restaurant_url: payload.restaurant_url,
                            },
                            PayloadSource::Cache,
                            &reference_key,
                            last_updated,
                            now_epoch_ms(),
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(code = %code, error = %e, "retained payload no longer parses");
                }
            }
        }
        self.publish();
        self.refresh_pass(TimeoutClass::Background);
    }

    /// Issue one fetch: bump the serial first, then spawn the request with
    /// the bumped value captured. Completions racing an even newer issue
    /// will fail the serial check and be dropped.
    fn issue_fetch(&mut self, code: &str, class: TimeoutClass) {
        let Some(entry) = self.entries.get(code).cloned() else {
            return;
        };
        let serial = self.bump_serial(code);
        if let Some(state) = self.states.get_mut(code) {
            state.begin_fetch();
        }

        let Some(tx) = self.completions_tx.clone() else {
            return;
        };
        let client = Arc::clone(&self.client);
        let language = self.language.clone();
        let reference = local_today();
        tokio::spawn(async move {
            let result = client.fetch(&entry, &language, reference, class).await;
            let completion = FetchCompletion {
                code: entry.code,
                serial,
                language,
                result,
            };
            // The engine dropping its receiver just means shutdown.
            let _ = tx.send(completion).await;
        });
    }

    fn bump_serial(&mut self, code: &str) -> u64 {
        let serial = self.serials.entry(code.to_string()).or_insert(0);
        *serial += 1;
        *serial
    }

    /// Apply a network completion, unless it has been superseded.
    fn apply_completion(&mut self, done: FetchCompletion) {
        let current = self.serials.get(&done.code).copied().unwrap_or(0);
        if done.serial != current {
            tracing::debug!(
                code = %done.code,
                serial = done.serial,
                current,
                "discarding superseded response"
            );
            return;
        }

        let Some(entry) = self.entries.get(&done.code).cloned() else {
            return;
        };
        let reference = local_today();
        let reference_key = date_key(reference);
        let now = now_epoch_ms();

        match done.result {
            Ok(body) => match parse(&entry, &body, reference) {
                Ok(payload) => {
                    let today_menu = normalize(&payload);
                    let raw_text = payload.raw_text.clone();
                    if let Some(state) = self.states.get_mut(&done.code) {
                        state.apply_payload(
                            ParsedFetch {
                                raw_text: payload.raw_text,
                                menu_date_iso: payload.menu_date_iso,
                                provider_date_valid: payload.provider_date_valid,
                                today_menu,
                                restaurant_name: payload.restaurant_name,
                                restaurant_url: payload.restaurant_url,
                            },
                            PayloadSource::Network,
                            &reference_key,
                            now,
                            now,
                        );
                        tracing::info!(
                            code = %done.code,
                            fresh = state.is_today_fresh,
                            status = %state.status,
                            "refresh applied"
                        );
                    }
                    // Every successful fetch refreshes the cache slot, fresh
                    // for today or not.
                    let key = cache_key(&entry.code, entry.provider, &done.language);
                    self.cache.put(key, raw_text, now);
                    self.cache.persist();
                }
                Err(e) => {
                    if let Some(state) = self.states.get_mut(&done.code) {
                        state.apply_failure(&e.to_string(), now);
                        tracing::warn!(code = %done.code, error = %e, "payload rejected");
                    }
                }
            },
            Err(e) => {
                if let Some(state) = self.states.get_mut(&done.code) {
                    state.apply_failure(&e.to_string(), now);
                    tracing::warn!(code = %done.code, error = %e, "fetch failed");
                }
            }
        }
        self.publish();
    }

    fn is_enabled(&self, code: &str) -> bool {
        self.enabled.get(code).copied().unwrap_or(false)
    }

    fn has_pending_retry(&self) -> bool {
        self.order.iter().any(|code| {
            self.is_enabled(code)
                && self
                    .states
                    .get(code.as_str())
                    .is_some_and(|s| !s.is_today_fresh && s.next_retry_epoch_ms > 0)
        })
    }

    /// Bump the model version and publish the active restaurant's state.
    fn publish(&mut self) {
        self.model_version += 1;
        let snapshot = match self.states.get(&self.active_code) {
            Some(state) => EngineSnapshot {
                model_version: self.model_version,
                code: self.active_code.clone(),
                status: state.status,
                error_message: state.error_message.clone(),
                last_updated_epoch_ms: state.last_updated_epoch_ms,
                today_menu: state.today_menu.clone(),
                restaurant_name: state.restaurant_name.clone(),
                restaurant_url: state.restaurant_url.clone(),
                is_today_fresh: state.is_today_fresh,
            },
            None => EngineSnapshot {
                model_version: self.model_version,
                code: self.active_code.clone(),
                status: FetchStatus::Idle,
                error_message: String::new(),
                last_updated_epoch_ms: 0,
                today_menu: None,
                restaurant_name: String::new(),
                restaurant_url: String::new(),
                is_today_fresh: false,
            },
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}

/// The periodic refresh interval. With refresh disabled the interval still
/// exists (the select branch is gated off); an hour keeps it inert.
fn refresh_interval(minutes: u32) -> tokio::time::Interval {
    let period = if minutes == 0 {
        Duration::from_secs(3600)
    } else {
        Duration::from_secs(u64::from(minutes) * 60)
    };
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval
}

/// Time remaining until the next local midnight, floored at one second so
/// a rollover firing exactly at 00:00:00 cannot rearm itself in a loop.
fn until_next_midnight() -> Duration {
    let now = Local::now().naive_local();
    let next = now
        .date()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0));
    let Some(next) = next else {
        return Duration::from_secs(3600);
    };
    next.signed_duration_since(now)
        .to_std()
        .unwrap_or(Duration::from_secs(1))
        .max(Duration::from_secs(1))
}


#[cfg(test)]
impl Engine {
    fn cache_path_for_tests(&self) -> std::path::PathBuf {
        // The cache store owns its path; expose it for test cleanup only.
        self.cache.path_for_tests()
    }
}
