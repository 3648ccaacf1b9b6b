//! Browser bindings
//!
//! Implements the host capabilities on top of web APIs and exposes the
//! controller to JavaScript as [`WasmPlayer`].

pub mod analysis;
pub mod engine;
pub mod frames;
pub mod player;
pub mod storage;

pub use analysis::{WebAnalyser, WebAnalysisHost};
pub use engine::WebAudioEngine;
pub use frames::AnimationFrames;
pub use player::WasmPlayer;
pub use storage::WebStorage;
