//! Persistence gateway: debounced remote saves with local fallback.
//!
//! RULES:
//!   - A local snapshot is written synchronously on every scheduled save,
//!     before any remote call, so a later load can always recover.
//!   - At most one remote save is pending. A new schedule replaces the
//!     pending payload and restarts the debounce window.
//!   - Remote failures are logged and swallowed. They never reach the player.
//!   - Load order: requested key, then "default", then the local snapshot,
//!     then a fresh empty city.

use crate::{
    economy::EconomyState,
    error::{CityError, CityResult},
    event::{CityEvent, EventLogEntry},
    grid::GridStore,
    snapshot::{RestoredCity, SaveRequest, SaveSnapshot},
    store::CityStore,
    types::{MapKey, DEFAULT_MAP_KEY},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Answer of a remote load that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResponse {
    Found(SaveSnapshot),
    Missing,
}

/// The remote key/value map service.
///
/// `Err` covers both transport failures and `success: false` answers.
pub trait MapService {
    fn load(&self, map_key: &str) -> CityResult<LoadResponse>;
    fn save(&self, request: &SaveRequest) -> CityResult<()>;
}

/// Map service backed by the `map_save` table of a [`CityStore`].
pub struct StoreMapService {
    store: CityStore,
}

impl StoreMapService {
    pub fn new(store: CityStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CityStore {
        &self.store
    }
}

impl MapService for StoreMapService {
    fn load(&self, map_key: &str) -> CityResult<LoadResponse> {
        match self.store.map(map_key)? {
            Some(row) => Ok(LoadResponse::Found(serde_json::from_str(&row.payload)?)),
            None => Ok(LoadResponse::Missing),
        }
    }

    fn save(&self, request: &SaveRequest) -> CityResult<()> {
        let payload = serde_json::to_string(&request.snapshot)?;
        self.store.upsert_map(
            &request.map_key,
            request.snapshot.n,
            &payload,
            request.snapshot.last_modified.timestamp_millis(),
            Utc::now().timestamp_millis(),
        )
    }
}

/// Trailing-edge debounce holding at most one pending save.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    window:   Duration,
    pending:  Option<SaveRequest>,
    deadline: Option<DateTime<Utc>>,
}

impl SaveScheduler {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None, deadline: None }
    }

    /// Replace the pending payload and restart the window.
    pub fn schedule(&mut self, request: SaveRequest, now: DateTime<Utc>) {
        self.pending = Some(request);
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn pending(&self) -> Option<&SaveRequest> {
        self.pending.as_ref()
    }

    /// Take the pending payload once its window has elapsed.
    pub fn due(&mut self, now: DateTime<Utc>) -> Option<SaveRequest> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Take the pending payload regardless of the window.
    pub fn flush(&mut self) -> Option<SaveRequest> {
        self.deadline = None;
        self.pending.take()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    /// The requested key.
    Remote,
    /// The requested key was missing; the shared default map was used.
    DefaultKey,
    /// The remote service failed; the latest local snapshot was used.
    LocalSnapshot,
    /// Nothing stored anywhere.
    Fresh,
}

impl LoadSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Remote        => "remote",
            Self::DefaultKey    => "default_key",
            Self::LocalSnapshot => "local_snapshot",
            Self::Fresh         => "fresh",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub city:   RestoredCity,
    pub source: LoadSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    /// Nothing was due.
    Idle,
    Sent,
    /// The remote call failed; the local snapshot remains the fallback.
    Failed,
}

pub struct PersistenceGateway {
    map_key:   MapKey,
    remote:    Box<dyn MapService>,
    local:     CityStore,
    scheduler: SaveScheduler,
}

impl PersistenceGateway {
    pub fn new(
        map_key: impl Into<MapKey>,
        remote:  Box<dyn MapService>,
        local:   CityStore,
        window:  Duration,
    ) -> Self {
        Self {
            map_key: map_key.into(),
            remote,
            local,
            scheduler: SaveScheduler::new(window),
        }
    }

    pub fn map_key(&self) -> &str {
        &self.map_key
    }

    pub fn scheduler(&self) -> &SaveScheduler {
        &self.scheduler
    }

    pub fn local_store(&self) -> &CityStore {
        &self.local
    }

    /// Write the local snapshot now and queue the remote save.
    pub fn schedule_save(&mut self, snapshot: SaveSnapshot, now: DateTime<Utc>) {
        if let Err(e) = self.write_local(&snapshot, now) {
            log::warn!("local snapshot for '{}' failed: {e}", self.map_key);
        }
        self.scheduler.schedule(SaveRequest { map_key: self.map_key.clone(), snapshot }, now);
    }

    fn write_local(&self, snapshot: &SaveSnapshot, now: DateTime<Utc>) -> CityResult<()> {
        let payload = serde_json::to_string(snapshot)?;
        self.local.insert_local_snapshot(
            &self.map_key,
            &payload,
            snapshot.last_modified.timestamp_millis(),
            now.timestamp_millis(),
        )
    }

    /// Send the pending save if its window has elapsed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> SaveOutcome {
        match self.scheduler.due(now) {
            Some(request) => self.send(&request),
            None => SaveOutcome::Idle,
        }
    }

    /// Send the pending save immediately.
    pub fn flush(&mut self) -> SaveOutcome {
        match self.scheduler.flush() {
            Some(request) => self.send(&request),
            None => SaveOutcome::Idle,
        }
    }

    fn send(&self, request: &SaveRequest) -> SaveOutcome {
        match self.remote.save(request) {
            Ok(()) => {
                log::debug!("saved '{}' (n={})", request.map_key, request.snapshot.n);
                SaveOutcome::Sent
            }
            Err(e) => {
                log::warn!("remote save for '{}' failed, keeping local snapshot: {e}", request.map_key);
                SaveOutcome::Failed
            }
        }
    }

    /// Load the city for this gateway's key. Never fails: every error path
    /// degrades to the next fallback.
    pub fn load(&self, base: usize, initial_balance: i64, now: DateTime<Utc>) -> LoadOutcome {
        let (snapshot, source) = match self.load_remote() {
            Ok(Some(found)) => found,
            Ok(None) | Err(_) => match self.load_local() {
                Some(snapshot) => (snapshot, LoadSource::LocalSnapshot),
                None => {
                    log::info!("no saved city for '{}', starting fresh", self.map_key);
                    let city = RestoredCity {
                        grid:        GridStore::new(base),
                        economy:     EconomyState::new(initial_balance, 0, now),
                        reprojected: false,
                    };
                    return LoadOutcome { city, source: LoadSource::Fresh };
                }
            },
        };
        log::info!("loaded '{}' from {} (n={})", self.map_key, source.label(), snapshot.n);
        LoadOutcome { city: snapshot.restore(base), source }
    }

    /// `Ok(None)` when neither the key nor "default" exists.
    fn load_remote(&self) -> CityResult<Option<(SaveSnapshot, LoadSource)>> {
        let first = self.remote.load(&self.map_key).map_err(|e| {
            log::warn!("remote load for '{}' failed: {e}", self.map_key);
            e
        })?;
        if let LoadResponse::Found(snapshot) = first {
            return Ok(Some((snapshot, LoadSource::Remote)));
        }
        if self.map_key == DEFAULT_MAP_KEY {
            return Ok(None);
        }
        match self.remote.load(DEFAULT_MAP_KEY) {
            Ok(LoadResponse::Found(snapshot)) => Ok(Some((snapshot, LoadSource::DefaultKey))),
            Ok(LoadResponse::Missing) => Ok(None),
            Err(e) => {
                log::warn!("remote load for '{DEFAULT_MAP_KEY}' failed: {e}");
                Err(e)
            }
        }
    }

    fn load_local(&self) -> Option<SaveSnapshot> {
        let payload = match self.local.latest_local_snapshot(&self.map_key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("local snapshot read for '{}' failed: {e}", self.map_key);
                return None;
            }
        };
        match serde_json::from_str(&payload) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("local snapshot for '{}' is unreadable: {e}", self.map_key);
                None
            }
        }
    }

    /// Append to the activity journal. Best-effort.
    pub fn record_event(&self, event: &CityEvent, now: DateTime<Utc>) {
        let entry = match serde_json::to_string(event) {
            Ok(payload) => EventLogEntry {
                id:          None,
                map_key:     self.map_key.clone(),
                recorded_at: now.timestamp_millis(),
                event_type:  event.type_name().to_string(),
                payload,
            },
            Err(e) => {
                log::warn!("cannot serialize {} event: {e}", event.type_name());
                return;
            }
        };
        if let Err(e) = self.local.append_event(&entry) {
            log::warn!("event log append failed: {e}");
        }
    }
}

/// A map service that is always down. Used when no remote is configured.
pub struct OfflineMapService;

impl MapService for OfflineMapService {
    fn load(&self, _map_key: &str) -> CityResult<LoadResponse> {
        Err(CityError::RemoteUnavailable { reason: "offline".into() })
    }

    fn save(&self, _request: &SaveRequest) -> CityResult<()> {
        Err(CityError::RemoteUnavailable { reason: "offline".into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tile;

    fn ts(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
    }

    fn request(balance: i64) -> SaveRequest {
        let economy = EconomyState::new(balance, 0, ts(0));
        SaveRequest {
            map_key:  "k".into(),
            snapshot: SaveSnapshot::capture(&GridStore::new(16), &economy),
        }
    }

    #[test]
    fn scheduler_waits_for_window() {
        let mut s = SaveScheduler::new(Duration::milliseconds(1_000));
        s.schedule(request(1), ts(0));
        assert!(s.due(ts(999)).is_none());
        assert_eq!(s.due(ts(1_000)), Some(request(1)));
        assert!(!s.is_pending());
        assert!(s.due(ts(5_000)).is_none());
    }

    #[test]
    fn scheduler_coalesces_and_restarts_window() {
        let mut s = SaveScheduler::new(Duration::milliseconds(1_000));
        s.schedule(request(1), ts(0));
        s.schedule(request(2), ts(800));
        assert!(s.due(ts(1_200)).is_none());
        assert_eq!(s.deadline(), Some(ts(1_800)));
        assert_eq!(s.due(ts(1_800)), Some(request(2)));
    }

    #[test]
    fn scheduler_flush_ignores_window() {
        let mut s = SaveScheduler::new(Duration::milliseconds(1_000));
        assert!(s.flush().is_none());
        s.schedule(request(3), ts(0));
        assert_eq!(s.flush(), Some(request(3)));
        assert!(s.deadline().is_none());
    }

    #[test]
    fn store_service_round_trips() {
        let service = StoreMapService::new(CityStore::in_memory_migrated().unwrap());
        let mut grid = GridStore::new(16);
        grid.set(2, 3, Tile(0, 1)).unwrap();
        let snapshot = SaveSnapshot::capture(&grid, &EconomyState::new(42, 3, ts(77)));

        assert_eq!(service.load("k").unwrap(), LoadResponse::Missing);
        service
            .save(&SaveRequest { map_key: "k".into(), snapshot: snapshot.clone() })
            .unwrap();
        assert_eq!(service.load("k").unwrap(), LoadResponse::Found(snapshot));
    }

    #[test]
    fn offline_service_always_fails() {
        assert!(OfflineMapService.load("k").is_err());
        assert!(OfflineMapService.save(&request(0)).is_err());
    }
}
