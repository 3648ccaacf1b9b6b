//! Best-effort player state persistence
//!
//! Stores a small JSON snapshot (volume, mode, track index, position) under a
//! single key in a host key-value store (`localStorage` in a browser).
//! Persistence is an optimization: save failures are logged and swallowed,
//! and anything unreadable on load is treated as "nothing saved".
//!
//! A session opened with [`PersistenceAdapter::open`] holds the saved
//! snapshot until it is taken for restore; change-driven saves stay off until
//! then so setting up the queue can't overwrite it.

use crate::error::{PlayerError, Result};
use crate::events::PlayerEvent;
use crate::types::PlayMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Host key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store for tests and headless use
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Position-only progress smaller than this is not written
pub const POSITION_SAVE_STEP_SECS: f64 = 5.0;

/// Snapshot written on save
///
/// No current track is stored as index `-1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub volume: f32,
    pub mode: PlayMode,
    #[serde(with = "track_index")]
    pub current_track_index: Option<usize>,
    pub current_time: f64,
}

/// Snapshot read back on load; any field may be missing
///
/// Callers apply defaults for missing fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialPlayerState {
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub mode: Option<PlayMode>,
    #[serde(default, with = "track_index")]
    pub current_track_index: Option<usize>,
    #[serde(default)]
    pub current_time: Option<f64>,
}

mod track_index {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(index: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match index {
            Some(index) => serializer.serialize_u64(*index as u64),
            None => serializer.serialize_i64(-1),
        }
    }

    /// Negative, fractional or non-numeric indices read as "no track"
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_u64().and_then(|index| usize::try_from(index).ok()))
    }
}

impl PartialPlayerState {
    /// Drop values that can't be applied (non-finite or out-of-range numbers)
    fn sanitized(mut self) -> Self {
        self.volume = self
            .volume
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0));
        self.current_time = self.current_time.filter(|t| t.is_finite() && *t >= 0.0);
        self
    }
}

/// Saves and restores [`PlayerSnapshot`]s under one key
pub struct PersistenceAdapter<S: KeyValueStore> {
    store: S,
    key: String,

    // Read at open, waiting to be restored
    held: Option<PartialPlayerState>,

    last_saved: Option<PlayerSnapshot>,
    closed: bool,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            held: None,
            last_saved: None,
            closed: false,
        }
    }

    /// Start a session: read the saved snapshot once and hold it
    ///
    /// [`Self::record`] saves nothing while the snapshot is held.
    pub fn open(store: S, key: impl Into<String>) -> Self {
        let mut adapter = Self::new(store, key);
        adapter.held = adapter.load_snapshot();
        adapter
    }

    /// Hand over the held snapshot for restore and resume saving
    pub fn take_saved(&mut self) -> Option<PartialPlayerState> {
        self.held.take()
    }

    pub fn has_saved(&self) -> bool {
        self.held.is_some()
    }

    /// Write the snapshot; failures are logged, never returned
    pub fn save_snapshot(&mut self, snapshot: &PlayerSnapshot) {
        match self.try_save(snapshot) {
            Ok(()) => self.last_saved = Some(snapshot.clone()),
            Err(e) => tracing::warn!("Failed to save player state: {}", e),
        }
    }

    /// Save after a controller update, depending on what changed
    ///
    /// Playback progress alone is written only once it has moved
    /// [`POSITION_SAVE_STEP_SECS`] from the last save.
    pub fn record(&mut self, events: &[PlayerEvent], snapshot: &PlayerSnapshot) {
        if self.closed || self.held.is_some() || events.is_empty() {
            return;
        }
        if self.is_minor_progress(events, snapshot) {
            return;
        }
        self.save_snapshot(snapshot);
    }

    /// Final save for the session; later updates are not recorded
    pub fn close(&mut self, snapshot: &PlayerSnapshot) {
        if self.closed {
            return;
        }
        if self.held.is_none() {
            self.save_snapshot(snapshot);
        }
        self.closed = true;
    }

    fn is_minor_progress(&self, events: &[PlayerEvent], snapshot: &PlayerSnapshot) -> bool {
        let progress_only = events
            .iter()
            .all(|e| matches!(e, PlayerEvent::PositionChanged { .. }));
        progress_only
            && self.last_saved.as_ref().is_some_and(|last| {
                last.current_track_index == snapshot.current_track_index
                    && (snapshot.current_time - last.current_time).abs() < POSITION_SAVE_STEP_SECS
            })
    }

    fn try_save(&mut self, snapshot: &PlayerSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        self.store.set(&self.key, &json)
    }

    /// Read the snapshot back
    ///
    /// Returns `None` when the key is missing, the store fails, or the stored
    /// value doesn't match the schema.
    pub fn load_snapshot(&self) -> Option<PartialPlayerState> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to load player state: {}", e);
                return None;
            }
        };

        match Self::parse(&raw) {
            Ok(state) => Some(state.sanitized()),
            Err(e) => {
                tracing::warn!("Ignoring unreadable player state: {}", e);
                None
            }
        }
    }

    fn parse(raw: &str) -> Result<PartialPlayerState> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(PlayerError::Storage(
                "player state is not an object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
