//! Platform-agnostic playback engine trait
//!
//! Abstracts the host's media decode/transport engine (an HTML media element in
//! the browser, a native player elsewhere). The engine reports asynchronous
//! progress as [`EngineEvent`]s which the host feeds back into the controller
//! one at a time.

use crate::error::EngineError;

/// Identifies one `load` call
///
/// Every load bumps the generation; events tagged with an older generation
/// belong to a superseded load and are dropped by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LoadGeneration(pub u64);

impl LoadGeneration {
    pub(crate) fn next(self) -> Self {
        LoadGeneration(self.0.wrapping_add(1))
    }
}

/// Host media engine
///
/// Implementors own the actual decoding and output. All calls happen on the
/// controller's thread; results of asynchronous work come back as events.
pub trait PlaybackEngine {
    /// Handle the analysis host attaches to (the media element in a browser)
    type Source;

    /// Start loading a new source, superseding any in-flight load
    ///
    /// Events produced for this load must carry `generation`.
    fn load(&mut self, source: &str, generation: LoadGeneration) -> Result<(), EngineError>;

    /// Start or resume output
    fn play(&mut self) -> Result<(), EngineError>;

    /// Pause output
    fn pause(&mut self) -> Result<(), EngineError>;

    /// Current position in seconds
    fn position(&self) -> f64;

    /// Move the playback position (already clamped by the caller)
    fn set_position(&mut self, seconds: f64) -> Result<(), EngineError>;

    /// Duration of the loaded media, if known
    fn duration(&self) -> Option<f64>;

    /// Output volume in `0.0..=1.0`
    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32) -> Result<(), EngineError>;

    /// Handle for attaching frequency analysis
    fn media_source(&self) -> &Self::Source;
}

/// Asynchronous notification from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Metadata loaded, media can play
    Ready {
        generation: LoadGeneration,
        /// Duration in seconds (NaN or infinite when the host doesn't know)
        duration: f64,
    },

    /// Periodic position update
    TimeUpdate {
        generation: LoadGeneration,
        position: f64,
    },

    /// Natural end of media
    Ended { generation: LoadGeneration },

    /// Load or playback failed
    Error {
        generation: LoadGeneration,
        error: EngineError,
    },
}

impl EngineEvent {
    pub fn generation(&self) -> LoadGeneration {
        match self {
            EngineEvent::Ready { generation, .. }
            | EngineEvent::TimeUpdate { generation, .. }
            | EngineEvent::Ended { generation }
            | EngineEvent::Error { generation, .. } => *generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase() {
        let first = LoadGeneration::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.next(), LoadGeneration(2));
    }

    #[test]
    fn event_generation_accessor() {
        let generation = LoadGeneration(4);
        let events = [
            EngineEvent::Ready {
                generation,
                duration: 10.0,
            },
            EngineEvent::TimeUpdate {
                generation,
                position: 1.0,
            },
            EngineEvent::Ended { generation },
            EngineEvent::Error {
                generation,
                error: EngineError::Decode("x".into()),
            },
        ];
        assert!(events.iter().all(|e| e.generation() == generation));
    }
}
