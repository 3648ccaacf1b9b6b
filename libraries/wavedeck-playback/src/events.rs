//! Player events
//!
//! Event-based communication for UI synchronization. The controller queues
//! events as state changes and the UI drains them after each command or
//! engine event:
//! - Status changes (loading/playing/paused/ended/errored)
//! - Track changes
//! - Position updates
//! - Volume, mode and queue changes
//! - Errors caught at the capability boundary

use crate::error::PlaybackError;
use crate::types::{PlayMode, PlaybackStatus};
use serde::{Deserialize, Serialize};

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// Status changed
    StateChanged {
        status: PlaybackStatus,
    },

    /// Current track changed (or cleared)
    #[serde(rename_all = "camelCase")]
    TrackChanged {
        index: Option<usize>,
        track_id: Option<String>,
    },

    /// Position or duration changed
    #[serde(rename_all = "camelCase")]
    PositionChanged {
        position_secs: f64,
        duration_secs: f64,
    },

    /// Volume or mute changed
    VolumeChanged {
        volume: f32,
        muted: bool,
    },

    /// Play mode changed
    ModeChanged {
        mode: PlayMode,
    },

    /// Queue contents changed
    QueueChanged {
        length: usize,
    },

    /// A capability call failed; state holds the same error as `last_error`
    Error {
        error: PlaybackError,
    },
}
