//! Frequency sampling for the spectrum visualizer
//!
//! The host supplies the FFT (a Web Audio `AnalyserNode` in the browser). This
//! module only attaches it to the engine's media source, pulls magnitude
//! snapshots, and releases it again.

use crate::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};

/// One frame of spectral magnitudes (0-255 per bin)
///
/// Length is half the configured analysis window.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrequencySnapshot(Vec<u8>);

impl FrequencySnapshot {
    /// All-zero snapshot with `bins` entries
    pub fn silent(bins: usize) -> Self {
        Self(vec![0; bins])
    }

    pub fn from_bins(bins: Vec<u8>) -> Self {
        Self(bins)
    }

    pub fn bins(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_silent(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Mean magnitude over all bins (0.0-255.0)
    pub fn average(&self) -> f32 {
        mean(&self.0)
    }

    /// Mean magnitude of the lowest 10% of bins
    pub fn bass(&self) -> f32 {
        let end = self.0.len() / 10;
        mean(&self.0[..end])
    }

    /// Mean magnitude of the highest 30% of bins
    pub fn treble(&self) -> f32 {
        let start = self.0.len() * 7 / 10;
        mean(&self.0[start..])
    }

    /// Overall level normalized to 0.0-1.0
    pub fn level(&self) -> f32 {
        (self.average() / 255.0).min(1.0)
    }

    /// Average bins into at most `max_bars` buckets, normalized to 0.0-1.0
    ///
    /// Trailing bins that don't fill a whole bucket are dropped, so bars are
    /// equally wide.
    pub fn bars(&self, max_bars: usize) -> Vec<f32> {
        if max_bars == 0 || self.0.is_empty() {
            return Vec::new();
        }
        let step = (self.0.len() / max_bars).max(1);
        self.0
            .chunks_exact(step)
            .take(max_bars)
            .map(|chunk| (mean(chunk) / 255.0).min(1.0))
            .collect()
    }
}

fn mean(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| u32::from(b)).sum();
    sum as f32 / bins.len() as f32
}

/// Attached analysis graph
pub trait FrequencyAnalyser {
    /// Fill `buffer` with the current magnitudes
    fn read_magnitudes(&mut self, buffer: &mut [u8]);

    /// Fill `buffer` with the current waveform (128 is the zero line)
    fn read_waveform(&mut self, buffer: &mut [u8]) {
        buffer.fill(WAVEFORM_CENTER);
    }

    /// Wake the analysis graph before output starts
    ///
    /// Hosts suspend audio processing until a user gesture; the controller
    /// calls this on every play.
    fn resume(&mut self) {}

    /// Release host resources; called once on teardown
    fn close(&mut self) {}
}

/// Byte value of a silent waveform sample
pub const WAVEFORM_CENTER: u8 = 128;

/// Host capability that creates analysers
pub trait AnalysisHost {
    /// What the analyser taps (matches [`crate::PlaybackEngine::Source`])
    type Source;
    type Analyser: FrequencyAnalyser;

    /// Attach analysis to `source` with the given FFT window
    ///
    /// Fails with [`PlayerError::UnsupportedEnvironment`] when the host has no
    /// analysis support.
    fn attach_to(&mut self, source: &Self::Source, fft_size: usize) -> Result<Self::Analyser>;
}

/// Host without any analysis support
///
/// Useful for headless setups; the visualizer receives silent snapshots.
#[derive(Debug)]
pub struct NoAnalysis<S> {
    _source: std::marker::PhantomData<fn(&S)>,
}

impl<S> NoAnalysis<S> {
    pub fn new() -> Self {
        Self {
            _source: std::marker::PhantomData,
        }
    }
}

impl<S> Default for NoAnalysis<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyser type for [`NoAnalysis`]; never constructed
#[derive(Debug)]
pub enum NoAnalyser {}

impl FrequencyAnalyser for NoAnalyser {
    fn read_magnitudes(&mut self, _buffer: &mut [u8]) {
        match *self {}
    }
}

impl<S> AnalysisHost for NoAnalysis<S> {
    type Source = S;
    type Analyser = NoAnalyser;

    fn attach_to(&mut self, _source: &S, _fft_size: usize) -> Result<NoAnalyser> {
        Err(PlayerError::UnsupportedEnvironment(
            "no frequency analysis available".to_string(),
        ))
    }
}

/// Pulls fixed-size snapshots from the host analyser
pub struct FrequencySampler<H: AnalysisHost> {
    host: H,
    analyser: Option<H::Analyser>,
    fft_size: usize,
    buffer: Vec<u8>,
    waveform: Vec<u8>,
}

impl<H: AnalysisHost> FrequencySampler<H> {
    pub fn new(host: H, fft_size: usize) -> Self {
        Self {
            host,
            analyser: None,
            fft_size,
            buffer: vec![0; fft_size / 2],
            waveform: vec![WAVEFORM_CENTER; fft_size],
        }
    }

    /// Attach to `source`; a no-op returning the existing analyser if already attached
    pub fn initialize(&mut self, source: &H::Source) -> Result<&mut H::Analyser> {
        if self.analyser.is_none() {
            let analyser = self.host.attach_to(source, self.fft_size)?;
            tracing::debug!("Frequency analysis attached (fft size {})", self.fft_size);
            self.analyser = Some(analyser);
        }
        match self.analyser.as_mut() {
            Some(analyser) => Ok(analyser),
            None => Err(PlayerError::UnsupportedEnvironment(
                "analyser unavailable".to_string(),
            )),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.analyser.is_some()
    }

    /// Number of bins per snapshot
    pub fn bin_count(&self) -> usize {
        self.buffer.len()
    }

    /// Most recent magnitudes; all zeros before initialization or after teardown
    pub fn sample(&mut self) -> FrequencySnapshot {
        match self.analyser.as_mut() {
            Some(analyser) => {
                analyser.read_magnitudes(&mut self.buffer);
                FrequencySnapshot(self.buffer.clone())
            }
            None => FrequencySnapshot::silent(self.buffer.len()),
        }
    }

    /// Time-domain samples, one per FFT window slot; flat before initialization
    pub fn sample_waveform(&mut self) -> Vec<u8> {
        match self.analyser.as_mut() {
            Some(analyser) => {
                analyser.read_waveform(&mut self.waveform);
                self.waveform.clone()
            }
            None => vec![WAVEFORM_CENTER; self.waveform.len()],
        }
    }

    /// Wake the attached analyser, if any
    pub fn resume(&mut self) {
        if let Some(analyser) = self.analyser.as_mut() {
            analyser.resume();
        }
    }

    /// Release the analysis graph; safe to call repeatedly
    pub fn teardown(&mut self) {
        if let Some(mut analyser) = self.analyser.take() {
            analyser.close();
            self.buffer.fill(0);
            self.waveform.fill(WAVEFORM_CENTER);
            tracing::debug!("Frequency analysis released");
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: AnalysisHost> Drop for FrequencySampler<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
