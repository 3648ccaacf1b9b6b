//! Shared fakes for integration tests
//!
//! Hand-written host capabilities recording every call, so tests can drive
//! the controller without a browser.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use wavedeck_playback::{
    AnalysisHost, EngineError, EngineEvent, FrameId, FrameScheduler, FrequencyAnalyser,
    LoadGeneration, PlaybackController, PlaybackEngine, PlayerConfig, PlayerError, Track,
};

/// Shared, ordered log of host calls across all fakes
pub type CallLog = Rc<RefCell<Vec<String>>>;

// ===== Engine =====

#[derive(Default)]
pub struct FakeEngine {
    pub loads: Vec<(String, LoadGeneration)>,
    pub playing: bool,
    pub position: f64,
    pub volume: f32,
    pub fail_play: Option<EngineError>,
    pub fail_load: Option<EngineError>,
    pub fail_volume: Option<EngineError>,
    pub log: CallLog,
}

impl FakeEngine {
    pub fn with_log(log: CallLog) -> Self {
        Self {
            volume: 1.0,
            log,
            ..Default::default()
        }
    }

    pub fn last_generation(&self) -> Option<LoadGeneration> {
        self.loads.last().map(|(_, generation)| *generation)
    }
}

impl PlaybackEngine for FakeEngine {
    type Source = String;

    fn load(&mut self, source: &str, generation: LoadGeneration) -> Result<(), EngineError> {
        self.log.borrow_mut().push(format!("load {}", source));
        if let Some(error) = self.fail_load.clone() {
            return Err(error);
        }
        self.loads.push((source.to_string(), generation));
        self.playing = false;
        self.position = 0.0;
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.log.borrow_mut().push("play".to_string());
        if let Some(error) = self.fail_play.clone() {
            return Err(error);
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.log.borrow_mut().push("pause".to_string());
        self.playing = false;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, seconds: f64) -> Result<(), EngineError> {
        self.log.borrow_mut().push(format!("seek {}", seconds));
        self.position = seconds;
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), EngineError> {
        if let Some(error) = self.fail_volume.clone() {
            return Err(error);
        }
        self.volume = volume;
        Ok(())
    }

    fn media_source(&self) -> &String {
        static SOURCE: String = String::new();
        &SOURCE
    }
}

// ===== Analysis =====

pub struct FakeAnalyser {
    level: u8,
    log: CallLog,
}

impl FrequencyAnalyser for FakeAnalyser {
    fn read_magnitudes(&mut self, buffer: &mut [u8]) {
        buffer.fill(self.level);
    }

    fn read_waveform(&mut self, buffer: &mut [u8]) {
        for (i, sample) in buffer.iter_mut().enumerate() {
            *sample = if i % 2 == 0 { self.level } else { 255 - self.level };
        }
    }

    fn resume(&mut self) {
        self.log.borrow_mut().push("analyser resume".to_string());
    }

    fn close(&mut self) {
        self.log.borrow_mut().push("analyser close".to_string());
    }
}

pub struct FakeAnalysisHost {
    pub supported: bool,
    pub level: u8,
    log: CallLog,
}

impl FakeAnalysisHost {
    pub fn new(log: CallLog) -> Self {
        Self {
            supported: true,
            level: 128,
            log,
        }
    }

    pub fn unsupported(log: CallLog) -> Self {
        Self {
            supported: false,
            ..Self::new(log)
        }
    }
}

impl AnalysisHost for FakeAnalysisHost {
    type Source = String;
    type Analyser = FakeAnalyser;

    fn attach_to(&mut self, _source: &String, fft_size: usize) -> wavedeck_playback::Result<FakeAnalyser> {
        self.log.borrow_mut().push(format!("analyser attach {}", fft_size));
        if !self.supported {
            return Err(PlayerError::UnsupportedEnvironment("no Web Audio".to_string()));
        }
        Ok(FakeAnalyser {
            level: self.level,
            log: Rc::clone(&self.log),
        })
    }
}

// ===== Frames =====

pub struct FakeFrames {
    next: u64,
    pub requested: Vec<FrameId>,
    pub cancelled: Vec<FrameId>,
    log: CallLog,
}

impl FakeFrames {
    pub fn new(log: CallLog) -> Self {
        Self {
            next: 0,
            requested: Vec::new(),
            cancelled: Vec::new(),
            log,
        }
    }

    pub fn last_requested(&self) -> Option<FrameId> {
        self.requested.last().copied()
    }
}

impl FrameScheduler for FakeFrames {
    fn request_frame(&mut self) -> FrameId {
        self.next += 1;
        let id = FrameId(self.next);
        self.requested.push(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.log.borrow_mut().push(format!("cancel frame {}", id.0));
        self.cancelled.push(id);
    }
}

// ===== Controller Helpers =====

pub type TestController = PlaybackController<FakeEngine, FakeAnalysisHost, FakeFrames>;

pub fn track(id: &str, duration_secs: f64) -> Track {
    Track::new(
        id,
        format!("Title {}", id),
        "Test Artist",
        duration_secs,
        format!("blob:{}", id),
    )
}

/// Queue of tracks A, B, C (50s each)
pub fn abc() -> Vec<Track> {
    vec![track("A", 50.0), track("B", 50.0), track("C", 50.0)]
}

pub fn controller_with_log(tracks: Vec<Track>, log: CallLog) -> TestController {
    let mut controller = PlaybackController::new(
        PlayerConfig::default(),
        FakeEngine::with_log(Rc::clone(&log)),
        FakeAnalysisHost::new(Rc::clone(&log)),
        FakeFrames::new(log),
    )
    .unwrap();
    controller.set_queue(tracks).unwrap();
    controller
}

pub fn controller(tracks: Vec<Track>) -> TestController {
    controller_with_log(tracks, CallLog::default())
}

/// Deliver "ready" for the current load
pub fn ready(controller: &mut TestController, duration: f64) {
    let generation = controller.load_generation();
    controller.handle_engine_event(EngineEvent::Ready {
        generation,
        duration,
    });
}

/// Deliver a position update for the current load
pub fn time_update(controller: &mut TestController, position: f64) {
    let generation = controller.load_generation();
    controller.handle_engine_event(EngineEvent::TimeUpdate {
        generation,
        position,
    });
}

/// Deliver natural end-of-media for the current load
pub fn ended(controller: &mut TestController) {
    let generation = controller.load_generation();
    controller.handle_engine_event(EngineEvent::Ended { generation });
}

/// Select `index`, let it load and start playing
pub fn play_index(controller: &mut TestController, index: usize, duration: f64) {
    controller.select_track(index).unwrap();
    ready(controller, duration);
}
