//! Wavedeck - Playback Control
//!
//! Platform-agnostic playback controller for the Wavedeck browser player.
//!
//! This crate provides:
//! - Playback state machine (idle/loading/playing/paused/ended/errored)
//! - Queue navigation policy (Normal, RepeatOne, RepeatAll, Shuffle)
//! - Volume control (0.0-1.0, mute/unmute with level restore)
//! - Seek and skip with clamping
//! - Frequency sampling and a per-frame spectrum loop
//! - Best-effort state persistence
//! - Track import from uploaded file metadata
//!
//! # Architecture
//!
//! The controller never decodes audio or computes an FFT itself. Those are
//! host capabilities expressed as traits:
//! - [`PlaybackEngine`] - load/play/pause/seek/volume, reporting [`EngineEvent`]s
//! - [`AnalysisHost`] - attaches a [`FrequencyAnalyser`] to the engine's media
//! - [`FrameScheduler`] - per-frame callbacks for the visualizer
//! - [`KeyValueStore`] - where the persisted snapshot lives
//!
//! The `wasm` feature implements all four on top of the browser (HTML media
//! element, Web Audio, `requestAnimationFrame`, `localStorage`).
//!
//! # Example: Navigation Policy
//!
//! ```rust
//! use wavedeck_playback::{navigation, PlayMode};
//!
//! assert_eq!(navigation::next_index(2, 3, PlayMode::Normal, &[]), None);
//! assert_eq!(navigation::next_index(2, 3, PlayMode::RepeatAll, &[]), Some(0));
//!
//! // Shuffle walks a fixed permutation and wraps around
//! let order = [2, 0, 1];
//! assert_eq!(navigation::next_index(1, 3, PlayMode::Shuffle, &order), Some(2));
//! ```
//!
//! # Example: Platform Integration
//!
//! ```rust
//! use wavedeck_playback::{
//!     EngineError, EngineEvent, FrameId, FrameScheduler, LoadGeneration, NoAnalysis,
//!     PlaybackController, PlaybackEngine, PlaybackStatus, PlayerConfig, Track,
//! };
//!
//! // Implement PlaybackEngine for your platform
//! #[derive(Default)]
//! struct MyEngine {
//!     position: f64,
//!     volume: f32,
//! }
//!
//! impl PlaybackEngine for MyEngine {
//!     type Source = ();
//!
//!     fn load(&mut self, _source: &str, _generation: LoadGeneration) -> Result<(), EngineError> {
//!         // Start fetching and decoding; report Ready later
//!         Ok(())
//!     }
//!     fn play(&mut self) -> Result<(), EngineError> { Ok(()) }
//!     fn pause(&mut self) -> Result<(), EngineError> { Ok(()) }
//!     fn position(&self) -> f64 { self.position }
//!     fn set_position(&mut self, seconds: f64) -> Result<(), EngineError> {
//!         self.position = seconds;
//!         Ok(())
//!     }
//!     fn duration(&self) -> Option<f64> { None }
//!     fn volume(&self) -> f32 { self.volume }
//!     fn set_volume(&mut self, volume: f32) -> Result<(), EngineError> {
//!         self.volume = volume;
//!         Ok(())
//!     }
//!     fn media_source(&self) -> &() { &() }
//! }
//!
//! #[derive(Default)]
//! struct NoFrames(u64);
//!
//! impl FrameScheduler for NoFrames {
//!     fn request_frame(&mut self) -> FrameId {
//!         self.0 += 1;
//!         FrameId(self.0)
//!     }
//!     fn cancel_frame(&mut self, _id: FrameId) {}
//! }
//!
//! let mut player = PlaybackController::new(
//!     PlayerConfig::default(),
//!     MyEngine::default(),
//!     NoAnalysis::new(),
//!     NoFrames::default(),
//! )?;
//!
//! player.set_queue(vec![
//!     Track::new("a", "Midnight Dreams", "Luna Echo", 222.0, "blob:a"),
//!     Track::new("b", "Neon Lights", "Cyber Pulse", 178.0, "blob:b"),
//! ])?;
//!
//! player.play();
//! assert_eq!(player.status(), PlaybackStatus::Loading);
//!
//! // The engine reports readiness asynchronously
//! let generation = player.load_generation();
//! player.handle_engine_event(EngineEvent::Ready { generation, duration: 222.0 });
//! assert_eq!(player.status(), PlaybackStatus::Playing);
//! # Ok::<(), wavedeck_playback::PlayerError>(())
//! ```

pub mod analysis;
mod controller;
pub mod engine;
mod error;
pub mod events;
pub mod format;
pub mod library;
pub mod navigation;
pub mod persistence;
pub mod types;
pub mod visualizer;
mod volume;

#[cfg(feature = "wasm")]
pub mod wasm;

// Public exports
pub use analysis::{AnalysisHost, FrequencyAnalyser, FrequencySampler, FrequencySnapshot, NoAnalysis};
pub use controller::PlaybackController;
pub use engine::{EngineEvent, LoadGeneration, PlaybackEngine};
pub use error::{EngineError, ErrorKind, PlaybackError, PlayerError, Result};
pub use events::PlayerEvent;
pub use library::{is_supported_audio_file, tracks_from_metadata, TrackMetadata};
pub use persistence::{KeyValueStore, MemoryStore, PartialPlayerState, PersistenceAdapter, PlayerSnapshot};
pub use types::{PlayMode, PlaybackState, PlaybackStatus, PlayerConfig, Track};
pub use visualizer::{FrameId, FrameScheduler, SubscriptionId, VisualizationLoop};
pub use volume::Volume;
