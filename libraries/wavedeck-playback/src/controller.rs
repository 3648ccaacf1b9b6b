//! Playback controller - core orchestration
//!
//! Owns the queue, play mode, volume and [`PlaybackState`], and drives the
//! host engine, the frequency sampler and the visualization loop.
//!
//! The host feeds asynchronous engine notifications back through
//! [`PlaybackController::handle_engine_event`] and frame callbacks through
//! [`PlaybackController::on_animation_frame`]. Everything runs on one thread;
//! no two operations overlap.

use crate::{
    analysis::{AnalysisHost, FrequencySampler, FrequencySnapshot},
    engine::{EngineEvent, LoadGeneration, PlaybackEngine},
    error::{ErrorKind, PlaybackError, PlayerError, Result},
    events::PlayerEvent,
    navigation::{first_index, generate_shuffle_order, next_index, previous_index},
    persistence::{PartialPlayerState, PlayerSnapshot},
    types::{PlayMode, PlaybackState, PlaybackStatus, PlayerConfig, Track},
    visualizer::{FrameId, FrameScheduler, SubscriptionId, VisualizationLoop},
    volume::Volume,
};

/// Main playback controller
///
/// Generic over the three host capabilities so the same state machine runs
/// against the browser and against test fakes.
pub struct PlaybackController<E, H, F>
where
    E: PlaybackEngine,
    H: AnalysisHost<Source = E::Source>,
    F: FrameScheduler,
{
    config: PlayerConfig,

    // Host capabilities
    engine: E,
    sampler: FrequencySampler<H>,
    visualizer: VisualizationLoop<F>,

    // Queue and traversal
    queue: Vec<Track>,
    mode: PlayMode,
    shuffle_order: Vec<usize>,

    volume: Volume,
    state: PlaybackState,

    // Tags the in-flight load; engine events from older loads are dropped
    generation: LoadGeneration,

    // Play once the engine reports ready
    play_when_ready: bool,

    // Position to apply once the engine reports ready (restore)
    pending_seek: Option<f64>,

    // Analysis attach failed or the session was torn down; don't retry
    analysis_disabled: bool,

    // Event queue for UI synchronization
    pending_events: Vec<PlayerEvent>,

    // Sources of tracks that left the queue, for the host to free
    released_sources: Vec<String>,
}

impl<E, H, F> PlaybackController<E, H, F>
where
    E: PlaybackEngine,
    H: AnalysisHost<Source = E::Source>,
    F: FrameScheduler,
{
    /// Create a controller with an empty queue
    ///
    /// Analysis is attached lazily on the first successful play, since hosts
    /// usually require a user gesture before audio processing may start.
    pub fn new(config: PlayerConfig, engine: E, analysis: H, frames: F) -> Result<Self> {
        config.validate()?;

        let bins = config.bin_count();
        let volume = Volume::new(config.initial_volume);
        let mut controller = Self {
            sampler: FrequencySampler::new(analysis, config.fft_size),
            visualizer: VisualizationLoop::new(frames, bins),
            engine,
            queue: Vec::new(),
            mode: config.initial_mode,
            shuffle_order: Vec::new(),
            state: PlaybackState::new(volume.level()),
            volume,
            generation: LoadGeneration::default(),
            play_when_ready: false,
            pending_seek: None,
            analysis_disabled: false,
            pending_events: Vec::new(),
            released_sources: Vec::new(),
            config,
        };

        if let Err(e) = controller.engine.set_volume(controller.volume.effective()) {
            tracing::warn!("Failed to apply initial volume: {}", e);
        }
        Ok(controller)
    }

    // ===== Queue Management =====

    /// Replace the queue; playback returns to Idle
    ///
    /// Fails without touching anything if a track is invalid.
    pub fn set_queue(&mut self, tracks: Vec<Track>) -> Result<()> {
        validate_tracks(&tracks)?;

        self.stop();
        let previous = std::mem::replace(&mut self.queue, tracks);
        self.release(previous);
        self.queue_changed();
        Ok(())
    }

    /// Append tracks to the end of the queue
    pub fn add_tracks(&mut self, tracks: Vec<Track>) -> Result<()> {
        validate_tracks(&tracks)?;
        if tracks.is_empty() {
            return Ok(());
        }

        self.queue.extend(tracks);
        self.queue_changed();
        Ok(())
    }

    /// Remove the track at `index`
    ///
    /// Removing the current track stops playback. Removing an earlier track
    /// keeps the current one selected at its new index.
    pub fn remove_track(&mut self, index: usize) -> Result<Track> {
        if index >= self.queue.len() {
            return Err(PlayerError::IndexOutOfBounds {
                index,
                len: self.queue.len(),
            });
        }

        match self.state.current_index {
            Some(current) if current == index => self.stop(),
            Some(current) if current > index => {
                self.state.current_index = Some(current - 1);
                let track_id = self.queue.get(current).map(|t| t.id.clone());
                self.pending_events.push(PlayerEvent::TrackChanged {
                    index: Some(current - 1),
                    track_id,
                });
            }
            _ => {}
        }

        let removed = self.queue.remove(index);
        self.release(vec![removed.clone()]);
        self.queue_changed();
        Ok(removed)
    }

    /// Empty the queue; playback returns to Idle
    pub fn clear_queue(&mut self) {
        self.stop();
        let previous = std::mem::take(&mut self.queue);
        self.release(previous);
        self.queue_changed();
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.state.current_index.and_then(|i| self.queue.get(i))
    }

    /// Sources no longer referenced by the queue
    ///
    /// Uploaded files are `blob:` URLs the host must revoke once their
    /// tracks are gone.
    pub fn drain_released_sources(&mut self) -> Vec<String> {
        std::mem::take(&mut self.released_sources)
    }

    fn release(&mut self, tracks: Vec<Track>) {
        for track in tracks {
            let still_queued = self.queue.iter().any(|t| t.source == track.source);
            if !still_queued && !self.released_sources.contains(&track.source) {
                self.released_sources.push(track.source);
            }
        }
    }

    fn queue_changed(&mut self) {
        self.refresh_shuffle_order();
        self.pending_events.push(PlayerEvent::QueueChanged {
            length: self.queue.len(),
        });
    }

    fn refresh_shuffle_order(&mut self) {
        if self.mode == PlayMode::Shuffle {
            self.shuffle_order = generate_shuffle_order(self.queue.len());
        } else {
            self.shuffle_order.clear();
        }
    }

    // ===== Loading =====

    /// Load the track at `index` without starting playback
    ///
    /// Supersedes any load still in flight. Works from every status,
    /// including Errored.
    pub fn load_track(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.begin_load(index, false);
        Ok(())
    }

    /// Load the track at `index` and play it once ready (playlist click)
    pub fn select_track(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.begin_load(index, true);
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.queue.len() {
            Ok(())
        } else {
            Err(PlayerError::IndexOutOfBounds {
                index,
                len: self.queue.len(),
            })
        }
    }

    /// Hand the track to the engine; `index` must be in bounds
    fn begin_load(&mut self, index: usize, autoplay: bool) {
        let Some(track) = self.queue.get(index) else {
            tracing::error!("Load requested for missing queue index {}", index);
            return;
        };
        let source = track.source.clone();
        let track_id = track.id.clone();

        self.generation = self.generation.next();
        self.play_when_ready = autoplay;
        self.pending_seek = None;

        self.state.current_index = Some(index);
        self.state.position_secs = 0.0;
        self.state.duration_secs = 0.0;
        self.state.last_error = None;
        self.pending_events.push(PlayerEvent::TrackChanged {
            index: Some(index),
            track_id: Some(track_id.clone()),
        });
        self.set_status(PlaybackStatus::Loading);

        tracing::debug!(
            "Loading track {} ({}) generation {}",
            index,
            track_id,
            self.generation.0
        );
        if let Err(e) = self.engine.load(&source, self.generation) {
            self.fail(PlaybackError::new(ErrorKind::LoadFailure, e.to_string()));
        }
    }

    // ===== Playback Control =====

    /// Start or resume playback
    ///
    /// From Idle this starts the first track of the traversal order. While
    /// Loading it only records the intent to play once ready. Engine refusals
    /// end up in `last_error`, never as a returned error.
    pub fn play(&mut self) {
        match self.state.status {
            PlaybackStatus::Idle => {
                match first_index(self.queue.len(), self.mode, &self.shuffle_order) {
                    Some(index) => self.begin_load(index, true),
                    None => tracing::debug!("Play ignored: queue is empty"),
                }
            }
            PlaybackStatus::Loading => self.play_when_ready = true,
            PlaybackStatus::Playing => {}
            PlaybackStatus::Paused => self.resume(),
            PlaybackStatus::Ended => {
                if self.rewind() {
                    self.resume();
                }
            }
            PlaybackStatus::Errored => {
                // Recovery needs a fresh load
                if let Some(index) = self.state.current_index {
                    self.begin_load(index, true);
                }
            }
        }
    }

    /// Pause playback (cancels a pending autoplay while loading)
    pub fn pause(&mut self) {
        match self.state.status {
            PlaybackStatus::Playing => match self.engine.pause() {
                Ok(()) => self.set_status(PlaybackStatus::Paused),
                Err(e) => self.fail(e.into()),
            },
            PlaybackStatus::Loading => self.play_when_ready = false,
            _ => {}
        }
    }

    /// Flip between playing and paused; no-op without a current track
    pub fn toggle_play_pause(&mut self) {
        if self.state.current_index.is_none() {
            return;
        }
        match self.state.status {
            PlaybackStatus::Playing => self.pause(),
            PlaybackStatus::Loading => self.play_when_ready = !self.play_when_ready,
            _ => self.play(),
        }
    }

    /// Stop playback and deselect the current track (queue is kept)
    pub fn stop(&mut self) {
        if self.state.status == PlaybackStatus::Playing {
            if let Err(e) = self.engine.pause() {
                tracing::warn!("Engine refused to pause on stop: {}", e);
            }
        }

        // Late events for whatever was loaded are now stale
        self.generation = self.generation.next();
        self.play_when_ready = false;
        self.pending_seek = None;

        let had_track = self.state.current_index.take().is_some();
        self.state.position_secs = 0.0;
        self.state.duration_secs = 0.0;
        self.set_status(PlaybackStatus::Idle);
        self.visualizer.clear();

        if had_track {
            self.pending_events.push(PlayerEvent::TrackChanged {
                index: None,
                track_id: None,
            });
        }
    }

    fn resume(&mut self) {
        self.ensure_analysis();
        self.sampler.resume();
        match self.engine.play() {
            Ok(()) => self.set_status(PlaybackStatus::Playing),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Move the engine back to 0; false if the engine failed
    fn rewind(&mut self) -> bool {
        match self.engine.set_position(0.0) {
            Ok(()) => {
                self.set_position(0.0);
                true
            }
            Err(e) => {
                self.fail(e.into());
                false
            }
        }
    }

    // ===== Seek =====

    /// Seek within the current track
    ///
    /// Clamped to `0..=duration`. Only applies while Playing or Paused.
    pub fn seek_to(&mut self, seconds: f64) {
        if !matches!(
            self.state.status,
            PlaybackStatus::Playing | PlaybackStatus::Paused
        ) {
            tracing::debug!("Seek ignored while {}", self.state.status.as_str());
            return;
        }

        let target = clamp_position(seconds, self.state.duration_secs);
        match self.engine.set_position(target) {
            Ok(()) => self.set_position(target),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Jump forward by `delta_secs`
    pub fn skip_forward(&mut self, delta_secs: f64) {
        self.seek_to(self.state.position_secs + delta_secs);
    }

    /// Jump backward by `delta_secs`
    pub fn skip_backward(&mut self, delta_secs: f64) {
        self.seek_to(self.state.position_secs - delta_secs);
    }

    fn set_position(&mut self, position: f64) {
        self.state.position_secs = position;
        self.pending_events.push(PlayerEvent::PositionChanged {
            position_secs: position,
            duration_secs: self.state.duration_secs,
        });
    }

    // ===== Volume =====

    /// Set volume, clamped to 0.0-1.0; mute state is unchanged
    pub fn set_volume(&mut self, volume: f32) {
        self.volume.set_level(volume);
        self.apply_volume();
    }

    /// Flip mute; unmuting restores the last audible volume
    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.apply_volume();
    }

    fn apply_volume(&mut self) {
        self.state.volume = self.volume.level();
        self.state.muted = self.volume.is_muted();
        self.pending_events.push(PlayerEvent::VolumeChanged {
            volume: self.state.volume,
            muted: self.state.muted,
        });

        if let Err(e) = self.engine.set_volume(self.volume.effective()) {
            self.fail(e.into());
        }
    }

    // ===== Play Mode =====

    /// Switch play mode; entering Shuffle draws a new shuffle order
    pub fn set_mode(&mut self, mode: PlayMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.refresh_shuffle_order();
        tracing::debug!("Play mode set to {}", mode.as_str());
        self.pending_events.push(PlayerEvent::ModeChanged { mode });
    }

    /// Advance to the next mode in the UI toggle order
    pub fn cycle_mode(&mut self) -> PlayMode {
        self.set_mode(self.mode.cycle());
        self.mode
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    /// Current shuffle permutation (empty outside Shuffle)
    pub fn shuffle_order(&self) -> &[usize] {
        &self.shuffle_order
    }

    // ===== Navigation =====

    /// Skip to the next track according to the play mode
    ///
    /// Keeps playing if playback was active; from Paused the new track loads
    /// paused. In RepeatOne this restarts the current track.
    pub fn skip_next(&mut self) {
        let Some(current) = self.state.current_index else {
            self.play();
            return;
        };

        match next_index(current, self.queue.len(), self.mode, &self.shuffle_order) {
            Some(index) if index == current && self.mode == PlayMode::RepeatOne => {
                self.restart_current();
            }
            Some(index) => {
                let autoplay = self.wants_playback();
                self.begin_load(index, autoplay);
            }
            None => tracing::debug!("Skip next ignored: end of queue"),
        }
    }

    /// Go to the previous track, or restart the current one
    ///
    /// Past the restart threshold (3s by default) the current track restarts
    /// instead, so repeated presses don't skip two tracks at once.
    pub fn skip_previous(&mut self) {
        let Some(current) = self.state.current_index else {
            return;
        };

        if self.state.position_secs > self.config.restart_threshold_secs {
            self.restart_current();
            return;
        }

        match previous_index(current, self.queue.len(), self.mode, &self.shuffle_order) {
            Some(index) if index != current => {
                let autoplay = self.wants_playback();
                self.begin_load(index, autoplay);
            }
            _ => self.restart_current(),
        }
    }

    /// Natural end of the current track
    ///
    /// Normally invoked through [`Self::handle_engine_event`].
    pub fn on_track_ended(&mut self) {
        let Some(current) = self.state.current_index else {
            return;
        };

        if self.state.duration_secs > 0.0 {
            self.state.position_secs = self.state.duration_secs;
        }
        self.play_when_ready = false;
        self.set_status(PlaybackStatus::Ended);

        match next_index(current, self.queue.len(), self.mode, &self.shuffle_order) {
            None => tracing::debug!("Queue finished"),
            Some(_) if self.mode == PlayMode::RepeatOne => {
                if self.rewind() {
                    self.resume();
                }
            }
            Some(index) => self.begin_load(index, true),
        }
    }

    fn restart_current(&mut self) {
        match self.state.status {
            PlaybackStatus::Playing | PlaybackStatus::Paused => self.seek_to(0.0),
            PlaybackStatus::Ended => {
                if self.rewind() {
                    self.resume();
                }
            }
            PlaybackStatus::Errored => {
                if let Some(index) = self.state.current_index {
                    self.begin_load(index, true);
                }
            }
            PlaybackStatus::Idle | PlaybackStatus::Loading => {}
        }
    }

    /// Whether a track change should keep playing
    fn wants_playback(&self) -> bool {
        match self.state.status {
            PlaybackStatus::Playing | PlaybackStatus::Ended | PlaybackStatus::Errored => true,
            PlaybackStatus::Loading => self.play_when_ready,
            PlaybackStatus::Idle | PlaybackStatus::Paused => false,
        }
    }

    // ===== Engine Events =====

    /// Apply an asynchronous engine notification
    ///
    /// Events tagged with a superseded load generation are dropped.
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        if event.generation() != self.generation {
            tracing::debug!(
                "Dropping stale engine event (generation {}, current {})",
                event.generation().0,
                self.generation.0
            );
            return;
        }

        match event {
            EngineEvent::Ready { duration, .. } => self.on_ready(duration),
            EngineEvent::TimeUpdate { position, .. } => self.on_time_update(position),
            EngineEvent::Ended { .. } => self.on_track_ended(),
            EngineEvent::Error { error, .. } => self.fail(error.into()),
        }
    }

    fn on_ready(&mut self, duration: f64) {
        if self.state.status != PlaybackStatus::Loading {
            return;
        }

        // Streams and some containers report no duration; fall back to metadata
        self.state.duration_secs = if duration.is_finite() && duration >= 0.0 {
            duration
        } else {
            self.current_track().map_or(0.0, |t| t.duration_secs)
        };

        if let Some(saved) = self.pending_seek.take() {
            let target = clamp_position(saved, self.state.duration_secs);
            if let Err(e) = self.engine.set_position(target) {
                self.fail(e.into());
                return;
            }
            self.state.position_secs = target;
        }
        self.pending_events.push(PlayerEvent::PositionChanged {
            position_secs: self.state.position_secs,
            duration_secs: self.state.duration_secs,
        });

        if std::mem::take(&mut self.play_when_ready) {
            self.resume();
        } else {
            self.set_status(PlaybackStatus::Paused);
        }
    }

    fn on_time_update(&mut self, position: f64) {
        if matches!(
            self.state.status,
            PlaybackStatus::Playing | PlaybackStatus::Paused
        ) {
            let position = clamp_position(position, self.state.duration_secs);
            self.set_position(position);
        }
    }

    // ===== Visualization =====

    /// Frame callback from the host scheduler
    ///
    /// Returns `false` for frames that were cancelled or superseded.
    pub fn on_animation_frame(&mut self, id: FrameId) -> bool {
        self.visualizer.on_frame(id, &mut self.sampler)
    }

    /// Register the spectrum consumer, replacing any previous one
    pub fn subscribe_spectrum(
        &mut self,
        callback: impl FnMut(&FrequencySnapshot) + 'static,
    ) -> SubscriptionId {
        self.visualizer.subscribe(callback)
    }

    pub fn unsubscribe_spectrum(&mut self, id: SubscriptionId) -> bool {
        self.visualizer.unsubscribe(id)
    }

    /// Last published spectrum (silent before the first frame)
    pub fn latest_spectrum(&self) -> &FrequencySnapshot {
        self.visualizer.latest()
    }

    /// Current waveform; flat (128) while no analyser is attached
    pub fn sample_waveform(&mut self) -> Vec<u8> {
        self.sampler.sample_waveform()
    }

    pub fn is_visualizing(&self) -> bool {
        self.visualizer.is_running()
    }

    pub fn frame_scheduler(&self) -> &F {
        self.visualizer.scheduler()
    }

    fn ensure_analysis(&mut self) {
        if self.analysis_disabled || self.sampler.is_initialized() {
            return;
        }
        if let Err(e) = self.sampler.initialize(self.engine.media_source()) {
            tracing::warn!("Frequency analysis unavailable, spectrum stays silent: {}", e);
            self.analysis_disabled = true;
        }
    }

    // ===== State =====

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Generation of the most recent load; the host tags engine events with it
    pub fn load_generation(&self) -> LoadGeneration {
        self.generation
    }

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.state.status != status {
            tracing::trace!(
                "Status {} -> {}",
                self.state.status.as_str(),
                status.as_str()
            );
            self.state.status = status;
            self.pending_events.push(PlayerEvent::StateChanged { status });
        }

        // Frames only run while playing
        if status == PlaybackStatus::Playing {
            self.visualizer.start();
        } else {
            self.visualizer.stop();
        }
    }

    fn fail(&mut self, error: PlaybackError) {
        if self.state.current_index.is_none() {
            // Nothing loaded to fail; Idle stays Idle
            tracing::warn!("Engine call failed with no track loaded: {}", error);
            self.pending_events.push(PlayerEvent::Error { error });
            return;
        }

        tracing::warn!("Playback failed: {}", error);
        self.play_when_ready = false;
        self.pending_seek = None;
        self.state.last_error = Some(error.clone());
        self.set_status(PlaybackStatus::Errored);
        self.pending_events.push(PlayerEvent::Error { error });
    }

    // ===== Persistence =====

    /// Snapshot to persist (volume, mode, track index, position)
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            volume: self.volume.level(),
            mode: self.mode,
            current_track_index: self.state.current_index,
            current_time: self.state.position_secs,
        }
    }

    /// Apply a previously saved snapshot
    ///
    /// Volume and mode apply immediately. A saved index that fits the current
    /// queue is loaded paused, and the saved position is applied once the
    /// engine reports ready.
    pub fn restore(&mut self, saved: PartialPlayerState) {
        if let Some(volume) = saved.volume {
            self.set_volume(volume);
        }
        if let Some(mode) = saved.mode {
            self.set_mode(mode);
        }

        match saved.current_track_index {
            Some(index) if index < self.queue.len() => {
                self.begin_load(index, false);
                if self.state.status == PlaybackStatus::Loading {
                    self.pending_seek = saved.current_time;
                }
            }
            Some(index) => tracing::debug!(
                "Saved track index {} no longer in queue of {}",
                index,
                self.queue.len()
            ),
            None => {}
        }
    }

    // ===== Lifecycle =====

    /// End the session
    ///
    /// Cancels the pending frame before releasing the analysis graph, then
    /// pauses the engine. Safe to call more than once; the controller stays
    /// usable afterwards but without a spectrum.
    pub fn teardown(&mut self) {
        self.visualizer.stop();
        self.sampler.teardown();
        self.analysis_disabled = true;
        self.stop();
        tracing::debug!("Playback session torn down");
    }
}

impl<E, H, F> Drop for PlaybackController<E, H, F>
where
    E: PlaybackEngine,
    H: AnalysisHost<Source = E::Source>,
    F: FrameScheduler,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

fn validate_tracks(tracks: &[Track]) -> Result<()> {
    tracks.iter().try_for_each(Track::validate)
}

/// Clamp to `0..=duration`; NaN becomes 0
fn clamp_position(seconds: f64, duration: f64) -> f64 {
    if seconds.is_nan() {
        return 0.0;
    }
    seconds.min(duration.max(0.0)).max(0.0)
}
