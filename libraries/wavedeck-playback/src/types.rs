//! Core types for playback control

use crate::error::{PlaybackError, PlayerError, Result};
use serde::{Deserialize, Serialize};

/// A single playable item in the queue
///
/// Immutable once queued; identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Unique track identifier
    pub id: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name (optional)
    pub album: Option<String>,

    /// Duration from metadata, in seconds (0 when unknown)
    pub duration_secs: f64,

    /// Opaque reference the engine can load (object URL, remote URL, path)
    pub source: String,

    /// Optional cover art reference
    pub cover_art: Option<String>,
}

impl Track {
    /// Create a track with no album or cover art
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration_secs: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_secs,
            source: source.into(),
            cover_art: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_cover_art(mut self, cover_art: impl Into<String>) -> Self {
        self.cover_art = Some(cover_art.into());
        self
    }

    /// Reject tracks the controller cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(PlayerError::InvalidTrack("empty id".to_string()));
        }
        if self.source.is_empty() {
            return Err(PlayerError::InvalidTrack(format!(
                "track {} has no source",
                self.id
            )));
        }
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(PlayerError::InvalidTrack(format!(
                "track {} has invalid duration {}",
                self.id, self.duration_secs
            )));
        }
        Ok(())
    }
}

/// Policy for automatic track advancement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayMode {
    /// Play through the queue once, then stop
    #[default]
    Normal,

    /// Loop the current track
    RepeatOne,

    /// Loop the whole queue
    RepeatAll,

    /// Traverse a random permutation of the queue, looping
    Shuffle,
}

impl PlayMode {
    /// Next mode in the UI toggle order: Normal → RepeatAll → RepeatOne → Shuffle
    pub fn cycle(self) -> Self {
        match self {
            PlayMode::Normal => PlayMode::RepeatAll,
            PlayMode::RepeatAll => PlayMode::RepeatOne,
            PlayMode::RepeatOne => PlayMode::Shuffle,
            PlayMode::Shuffle => PlayMode::Normal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayMode::Normal => "normal",
            PlayMode::RepeatOne => "repeat-one",
            PlayMode::RepeatAll => "repeat-all",
            PlayMode::Shuffle => "shuffle",
        }
    }

    /// Parse the kebab-case name used by the UI and the persisted snapshot
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "normal" => Some(PlayMode::Normal),
            "repeat-one" => Some(PlayMode::RepeatOne),
            "repeat-all" => Some(PlayMode::RepeatAll),
            "shuffle" => Some(PlayMode::Shuffle),
            _ => None,
        }
    }
}

/// Playback status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    /// No track selected
    #[default]
    Idle,

    /// Source handed to the engine, waiting for "ready"
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track (or ready without a play request)
    Paused,

    /// Reached the natural end of the media
    Ended,

    /// External capability failed; recover with a new load
    Errored,
}

impl PlaybackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Ended => "ended",
            PlaybackStatus::Errored => "errored",
        }
    }
}

/// Snapshot of controller-owned playback state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub status: PlaybackStatus,

    /// Index into the queue; `None` while idle or when the queue is empty
    pub current_index: Option<usize>,

    /// Playback position, clamped to `0..=duration_secs`
    pub position_secs: f64,

    /// Duration reported by the engine once loading completes
    pub duration_secs: f64,

    /// Requested volume in `0.0..=1.0`, preserved while muted
    pub volume: f32,

    pub muted: bool,

    pub last_error: Option<PlaybackError>,
}

impl PlaybackState {
    pub(crate) fn new(volume: f32) -> Self {
        Self {
            status: PlaybackStatus::Idle,
            current_index: None,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume,
            muted: false,
            last_error: None,
        }
    }

    /// Volume actually applied to the output
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Smallest analysis window the host accepts
pub const MIN_FFT_SIZE: usize = 32;

/// Largest analysis window the host accepts
pub const MAX_FFT_SIZE: usize = 32768;

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Analysis window size; snapshots hold `fft_size / 2` bins (default: 256)
    pub fft_size: usize,

    /// Initial volume in `0.0..=1.0` (default: 1.0)
    pub initial_volume: f32,

    /// Initial play mode (default: Normal)
    pub initial_mode: PlayMode,

    /// Past this position, "previous" restarts the track instead (default: 3s)
    pub restart_threshold_secs: f64,

    /// Default step for skip forward/backward (default: 10s)
    pub skip_step_secs: f64,

    /// Key the snapshot is stored under (default: "mp3-player-state")
    pub storage_key: String,
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(PlayerError::InvalidConfig(format!(
                "fft_size must be a power of two in {}..={}, got {}",
                MIN_FFT_SIZE, MAX_FFT_SIZE, self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlayerError::InvalidConfig(format!(
                "initial_volume must be in 0.0..=1.0, got {}",
                self.initial_volume
            )));
        }
        if !self.restart_threshold_secs.is_finite() || self.restart_threshold_secs < 0.0 {
            return Err(PlayerError::InvalidConfig(format!(
                "restart_threshold_secs must be non-negative, got {}",
                self.restart_threshold_secs
            )));
        }
        if !self.skip_step_secs.is_finite() || self.skip_step_secs <= 0.0 {
            return Err(PlayerError::InvalidConfig(format!(
                "skip_step_secs must be positive, got {}",
                self.skip_step_secs
            )));
        }
        if self.storage_key.is_empty() {
            return Err(PlayerError::InvalidConfig(
                "storage_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of frequency bins per snapshot
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            initial_volume: 1.0,
            initial_mode: PlayMode::Normal,
            restart_threshold_secs: 3.0,
            skip_step_secs: 10.0,
            storage_key: "mp3-player-state".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.fft_size, 256);
        assert_eq!(config.bin_count(), 128);
        assert_eq!(config.initial_volume, 1.0);
        assert_eq!(config.initial_mode, PlayMode::Normal);
        assert_eq!(config.restart_threshold_secs, 3.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_fft_size() {
        let config = PlayerConfig {
            fft_size: 300,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PlayerError::InvalidConfig(_))
        ));

        let config = PlayerConfig {
            fft_size: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_partial_json_uses_defaults() {
        let config: PlayerConfig = serde_json::from_str(r#"{"fftSize": 512}"#).unwrap();
        assert_eq!(config.fft_size, 512);
        assert_eq!(config.storage_key, "mp3-player-state");
    }

    #[test]
    fn track_validation() {
        let track = Track::new("t1", "Song", "Artist", 180.0, "blob:1");
        assert!(track.validate().is_ok());

        let mut bad = track.clone();
        bad.duration_secs = f64::NAN;
        assert!(matches!(bad.validate(), Err(PlayerError::InvalidTrack(_))));

        let mut bad = track.clone();
        bad.id.clear();
        assert!(bad.validate().is_err());

        let mut bad = track;
        bad.source.clear();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn play_mode_names_round_trip_through_serde() {
        for mode in [
            PlayMode::Normal,
            PlayMode::RepeatOne,
            PlayMode::RepeatAll,
            PlayMode::Shuffle,
        ] {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
            assert_eq!(PlayMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(PlayMode::parse("loop"), None);
    }

    #[test]
    fn play_mode_cycle_visits_every_mode() {
        let mut mode = PlayMode::Normal;
        let mut seen = vec![mode];
        for _ in 0..3 {
            mode = mode.cycle();
            seen.push(mode);
        }
        assert_eq!(mode.cycle(), PlayMode::Normal);
        assert_eq!(
            seen,
            vec![
                PlayMode::Normal,
                PlayMode::RepeatAll,
                PlayMode::RepeatOne,
                PlayMode::Shuffle
            ]
        );
    }

    #[test]
    fn muted_state_has_zero_effective_volume() {
        let mut state = PlaybackState::new(0.6);
        assert_eq!(state.effective_volume(), 0.6);
        state.muted = true;
        assert_eq!(state.effective_volume(), 0.0);
        assert_eq!(state.volume, 0.6);
    }
}
