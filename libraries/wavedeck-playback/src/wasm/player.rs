//! JavaScript-facing player
//!
//! Wraps [`PlaybackController`] with the browser capabilities and a
//! callback-based API. All controller access goes through [`Shared::update`],
//! which applies queued engine events first and only calls back into
//! JavaScript after the controller borrow has been released. Exported methods
//! take `&self`, so callbacks may call back into the player; a call that
//! would mutate the controller while an update is still running is ignored.
//!
//! The saved snapshot is read once at construction and held until
//! `restoreState`, so filling the queue first doesn't overwrite it.

use super::analysis::WebAnalysisHost;
use super::engine::{EngineEventQueue, WebAudioEngine};
use super::frames::AnimationFrames;
use super::storage::WebStorage;
use crate::{
    tracks_from_metadata, FrameId, FrequencySnapshot, PersistenceAdapter, PlayMode, PlaybackController,
    PlayerConfig, PlayerError, PlayerEvent, Track, TrackMetadata,
};
use js_sys::Function;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;

type WebController = PlaybackController<WebAudioEngine, WebAnalysisHost, AnimationFrames>;

struct Session {
    controller: WebController,
    persistence: Option<PersistenceAdapter<WebStorage>>,
}

#[derive(Clone, Default)]
struct Callbacks {
    on_state_change: Option<Function>,
    on_track_change: Option<Function>,
    on_position_change: Option<Function>,
    on_spectrum: Option<Function>,
    on_error: Option<Function>,
    on_event: Option<Function>,
}

/// What to report to JavaScript once the controller is released
struct Outbox {
    events: Vec<PlayerEvent>,
    current_track: Option<Track>,
    spectrum: Option<FrequencySnapshot>,
    released_sources: Vec<String>,
}

struct Shared {
    session: RefCell<Option<Session>>,
    callbacks: RefCell<Callbacks>,
    engine_events: EngineEventQueue,
    spectrum: Rc<RefCell<Option<FrequencySnapshot>>>,
}

impl Shared {
    /// Run `f` against the controller, then notify JavaScript
    ///
    /// Returns `None` when called re-entrantly from a callback; the pending
    /// engine events stay queued for the next update.
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let (result, outbox) = {
            let Ok(mut guard) = self.session.try_borrow_mut() else {
                tracing::warn!("Player called re-entrantly from a callback; ignored");
                return None;
            };
            let session = guard.as_mut()?;

            loop {
                let next = self.engine_events.borrow_mut().pop_front();
                match next {
                    Some(event) => session.controller.handle_engine_event(event),
                    None => break,
                }
            }

            let result = f(session);

            let events = session.controller.drain_events();
            if let Some(persistence) = session.persistence.as_mut() {
                persistence.record(&events, &session.controller.snapshot());
            }
            let outbox = Outbox {
                current_track: session.controller.current_track().cloned(),
                spectrum: self.spectrum.borrow_mut().take(),
                released_sources: session.controller.drain_released_sources(),
                events,
            };
            (result, outbox)
        };

        self.dispatch(outbox);
        Some(result)
    }

    fn dispatch(&self, outbox: Outbox) {
        for source in outbox.released_sources.iter().filter(|s| s.starts_with("blob:")) {
            if let Err(e) = web_sys::Url::revoke_object_url(source) {
                tracing::warn!("Failed to revoke {}: {:?}", source, e);
            }
        }

        // Cloned so callbacks may register other callbacks
        let callbacks = self.callbacks.borrow().clone();

        for event in &outbox.events {
            match event {
                PlayerEvent::StateChanged { status } => {
                    call1(&callbacks.on_state_change, &JsValue::from_str(status.as_str()));
                }
                PlayerEvent::TrackChanged { .. } => {
                    let track = outbox
                        .current_track
                        .as_ref()
                        .and_then(|t| serde_wasm_bindgen::to_value(t).ok())
                        .unwrap_or(JsValue::NULL);
                    call1(&callbacks.on_track_change, &track);
                }
                PlayerEvent::PositionChanged {
                    position_secs,
                    duration_secs,
                } => {
                    if let Some(cb) = &callbacks.on_position_change {
                        let result = cb.call2(
                            &JsValue::NULL,
                            &JsValue::from_f64(*position_secs),
                            &JsValue::from_f64(*duration_secs),
                        );
                        if let Err(e) = result {
                            tracing::warn!("Player callback threw: {:?}", e);
                        }
                    }
                }
                PlayerEvent::Error { error } => {
                    if let Ok(value) = serde_wasm_bindgen::to_value(error) {
                        call1(&callbacks.on_error, &value);
                    }
                }
                PlayerEvent::VolumeChanged { .. }
                | PlayerEvent::ModeChanged { .. }
                | PlayerEvent::QueueChanged { .. } => {}
            }

            if callbacks.on_event.is_some() {
                if let Ok(value) = serde_wasm_bindgen::to_value(event) {
                    call1(&callbacks.on_event, &value);
                }
            }
        }

        if let Some(snapshot) = outbox.spectrum {
            let bins = js_sys::Uint8Array::from(snapshot.bins());
            call1(&callbacks.on_spectrum, &bins);
        }
    }
}

fn call1(callback: &Option<Function>, value: &JsValue) {
    if let Some(cb) = callback {
        if let Err(e) = cb.call1(&JsValue::NULL, value) {
            tracing::warn!("Player callback threw: {:?}", e);
        }
    }
}

fn to_js_error(error: PlayerError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Browser music player
#[wasm_bindgen]
pub struct WasmPlayer {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl WasmPlayer {
    /// Create a player; `config` is an optional partial `PlayerConfig` object
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WasmPlayer, JsValue> {
        // Enable panic hooks for better error messages in console
        console_error_panic_hook::set_once();

        let config: PlayerConfig = if config.is_undefined() || config.is_null() {
            PlayerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?
        };

        let shared = Rc::new(Shared {
            session: RefCell::new(None),
            callbacks: RefCell::new(Callbacks::default()),
            engine_events: EngineEventQueue::default(),
            spectrum: Rc::new(RefCell::new(None)),
        });

        // Engine and frame callbacks reach the controller through a weak handle
        let weak: Weak<Shared> = Rc::downgrade(&shared);
        let wake = {
            let weak = weak.clone();
            Rc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.update(|_| ());
                }
            })
        };
        let tick = Rc::new(move |id: FrameId| {
            if let Some(shared) = weak.upgrade() {
                shared.update(|session| session.controller.on_animation_frame(id));
            }
        });

        let engine = WebAudioEngine::new(Rc::clone(&shared.engine_events), wake)?;
        let frames = AnimationFrames::new(tick)?;
        let mut controller = PlaybackController::new(config, engine, WebAnalysisHost, frames)
            .map_err(to_js_error)?;

        let slot = Rc::clone(&shared.spectrum);
        controller.subscribe_spectrum(move |snapshot| {
            *slot.borrow_mut() = Some(snapshot.clone());
        });

        let storage_key = controller.config().storage_key.clone();
        let persistence = match WebStorage::local() {
            Ok(storage) => Some(PersistenceAdapter::open(storage, storage_key)),
            Err(e) => {
                tracing::warn!("Player state will not be saved: {}", e);
                None
            }
        };

        *shared.session.borrow_mut() = Some(Session {
            controller,
            persistence,
        });
        Ok(Self { shared })
    }

    // ===== Queue Management =====

    /// Replace the queue with an array of tracks
    #[wasm_bindgen(js_name = setQueue)]
    pub fn set_queue(&self, tracks: JsValue) -> Result<(), JsValue> {
        let tracks: Vec<Track> = serde_wasm_bindgen::from_value(tracks)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse tracks: {}", e)))?;
        self.try_update(|session| session.controller.set_queue(tracks))
    }

    /// Append an array of tracks
    #[wasm_bindgen(js_name = addTracks)]
    pub fn add_tracks(&self, tracks: JsValue) -> Result<(), JsValue> {
        let tracks: Vec<Track> = serde_wasm_bindgen::from_value(tracks)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse tracks: {}", e)))?;
        self.try_update(|session| session.controller.add_tracks(tracks))
    }

    /// Append uploaded files (`{name, duration, size, type, url}` objects)
    ///
    /// Unsupported files are skipped. Returns the number of tracks added.
    #[wasm_bindgen(js_name = importFiles)]
    pub fn import_files(&self, files: JsValue) -> Result<usize, JsValue> {
        let files: Vec<TrackMetadata> = serde_wasm_bindgen::from_value(files)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse files: {}", e)))?;
        let tracks = tracks_from_metadata(files, js_sys::Date::now() as u64);
        let added = tracks.len();
        self.try_update(|session| session.controller.add_tracks(tracks))?;
        Ok(added)
    }

    /// Remove the track at `index` and return it
    #[wasm_bindgen(js_name = removeTrack)]
    pub fn remove_track(&self, index: usize) -> Result<JsValue, JsValue> {
        let removed = self.try_update(|session| session.controller.remove_track(index))?;
        serde_wasm_bindgen::to_value(&removed)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = clearQueue)]
    pub fn clear_queue(&self) {
        self.shared.update(|session| session.controller.clear_queue());
    }

    /// All queued tracks
    #[wasm_bindgen(js_name = getQueue)]
    pub fn get_queue(&self) -> JsValue {
        self.shared
            .update(|session| serde_wasm_bindgen::to_value(session.controller.queue()).ok())
            .flatten()
            .unwrap_or(JsValue::NULL)
    }

    #[wasm_bindgen(js_name = currentTrack)]
    pub fn current_track(&self) -> JsValue {
        self.shared
            .update(|session| {
                session
                    .controller
                    .current_track()
                    .and_then(|t| serde_wasm_bindgen::to_value(t).ok())
            })
            .flatten()
            .unwrap_or(JsValue::NULL)
    }

    // ===== Playback Control =====

    /// Load a track paused
    #[wasm_bindgen(js_name = loadTrack)]
    pub fn load_track(&self, index: usize) -> Result<(), JsValue> {
        self.try_update(|session| session.controller.load_track(index))
    }

    /// Load a track and play it (playlist click)
    #[wasm_bindgen(js_name = selectTrack)]
    pub fn select_track(&self, index: usize) -> Result<(), JsValue> {
        self.try_update(|session| session.controller.select_track(index))
    }

    pub fn play(&self) {
        self.shared.update(|session| session.controller.play());
    }

    pub fn pause(&self) {
        self.shared.update(|session| session.controller.pause());
    }

    pub fn stop(&self) {
        self.shared.update(|session| session.controller.stop());
    }

    #[wasm_bindgen(js_name = togglePlayPause)]
    pub fn toggle_play_pause(&self) {
        self.shared
            .update(|session| session.controller.toggle_play_pause());
    }

    #[wasm_bindgen(js_name = skipNext)]
    pub fn skip_next(&self) {
        self.shared.update(|session| session.controller.skip_next());
    }

    #[wasm_bindgen(js_name = skipPrevious)]
    pub fn skip_previous(&self) {
        self.shared
            .update(|session| session.controller.skip_previous());
    }

    // ===== Seeking =====

    /// Seek to position in seconds
    #[wasm_bindgen(js_name = seekTo)]
    pub fn seek_to(&self, position_secs: f64) {
        self.shared
            .update(|session| session.controller.seek_to(position_secs));
    }

    /// Jump forward (default step when `delta_secs` is omitted)
    #[wasm_bindgen(js_name = skipForward)]
    pub fn skip_forward(&self, delta_secs: Option<f64>) {
        self.shared.update(|session| {
            let delta = delta_secs.unwrap_or(session.controller.config().skip_step_secs);
            session.controller.skip_forward(delta);
        });
    }

    /// Jump backward (default step when `delta_secs` is omitted)
    #[wasm_bindgen(js_name = skipBackward)]
    pub fn skip_backward(&self, delta_secs: Option<f64>) {
        self.shared.update(|session| {
            let delta = delta_secs.unwrap_or(session.controller.config().skip_step_secs);
            session.controller.skip_backward(delta);
        });
    }

    // ===== Volume Control =====

    /// Set volume (0.0-1.0)
    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, volume: f32) {
        self.shared
            .update(|session| session.controller.set_volume(volume));
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&self) {
        self.shared
            .update(|session| session.controller.toggle_mute());
    }

    // ===== Play Mode =====

    /// Set play mode ("normal" | "repeat-one" | "repeat-all" | "shuffle")
    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&self, mode: &str) -> Result<(), JsValue> {
        let mode = PlayMode::parse(mode).ok_or_else(|| {
            JsValue::from_str(
                "Invalid play mode. Use 'normal', 'repeat-one', 'repeat-all', or 'shuffle'",
            )
        })?;
        self.shared.update(|session| session.controller.set_mode(mode));
        Ok(())
    }

    /// Advance to the next play mode and return its name
    #[wasm_bindgen(js_name = cycleMode)]
    pub fn cycle_mode(&self) -> String {
        self.shared
            .update(|session| session.controller.cycle_mode())
            .unwrap_or_default()
            .as_str()
            .to_string()
    }

    #[wasm_bindgen(js_name = getMode)]
    pub fn get_mode(&self) -> String {
        self.shared
            .update(|session| session.controller.mode())
            .unwrap_or_default()
            .as_str()
            .to_string()
    }

    // ===== State Queries =====

    /// Full playback state object
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> JsValue {
        self.shared
            .update(|session| serde_wasm_bindgen::to_value(session.controller.state()).ok())
            .flatten()
            .unwrap_or(JsValue::NULL)
    }

    /// Current waveform samples (128 is silence)
    pub fn waveform(&self) -> Vec<u8> {
        self.shared
            .update(|session| session.controller.sample_waveform())
            .unwrap_or_default()
    }

    /// Latest spectrum bins
    #[wasm_bindgen(js_name = latestSpectrum)]
    pub fn latest_spectrum(&self) -> Vec<u8> {
        self.shared
            .update(|session| session.controller.latest_spectrum().bins().to_vec())
            .unwrap_or_default()
    }

    // ===== Persistence =====

    /// Apply the snapshot saved by the previous session
    ///
    /// Call once, after the queue is populated. Saving resumes afterwards.
    #[wasm_bindgen(js_name = restoreState)]
    pub fn restore_state(&self) -> bool {
        self.shared
            .update(|session| {
                let saved = session
                    .persistence
                    .as_mut()
                    .and_then(PersistenceAdapter::take_saved);
                match saved {
                    Some(saved) => {
                        session.controller.restore(saved);
                        true
                    }
                    None => false,
                }
            })
            .unwrap_or(false)
    }

    // ===== Event Listeners =====

    /// Register state change callback (receives the status name)
    #[wasm_bindgen(js_name = onStateChange)]
    pub fn on_state_change(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_state_change = Some(callback);
    }

    /// Register track change callback (receives the track or null)
    #[wasm_bindgen(js_name = onTrackChange)]
    pub fn on_track_change(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_track_change = Some(callback);
    }

    /// Register position callback (receives position and duration)
    #[wasm_bindgen(js_name = onPositionChange)]
    pub fn on_position_change(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_position_change = Some(callback);
    }

    /// Register spectrum callback (receives a `Uint8Array` per frame)
    #[wasm_bindgen(js_name = onSpectrum)]
    pub fn on_spectrum(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_spectrum = Some(callback);
    }

    /// Register error callback (receives `{kind, message}`)
    #[wasm_bindgen(js_name = onError)]
    pub fn on_error(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_error = Some(callback);
    }

    /// Register a catch-all callback receiving every event object
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_event = Some(callback);
    }

    // ===== Lifecycle =====

    /// Save the session, release the audio graph and stop playback
    pub fn teardown(&self) {
        self.shared.update(|session| {
            let snapshot = session.controller.snapshot();
            if let Some(persistence) = session.persistence.as_mut() {
                persistence.close(&snapshot);
            }
            session.controller.teardown();
        });
    }
}

impl WasmPlayer {
    fn try_update<R>(
        &self,
        f: impl FnOnce(&mut Session) -> crate::Result<R>,
    ) -> Result<R, JsValue> {
        self.shared
            .update(f)
            .ok_or_else(|| JsValue::from_str("Player is busy"))?
            .map_err(to_js_error)
    }
}
