//! Web Audio `AnalyserNode` frequency analysis

use crate::analysis::{AnalysisHost, FrequencyAnalyser};
use crate::error::{PlayerError, Result};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AnalyserNode, AudioContext, AudioContextState, HtmlAudioElement, MediaElementAudioSourceNode,
};

/// Creates one `AudioContext` per attach
///
/// A media element can only be routed into a single context, so the
/// controller attaches at most once per session.
#[derive(Debug, Default)]
pub struct WebAnalysisHost;

impl AnalysisHost for WebAnalysisHost {
    type Source = HtmlAudioElement;
    type Analyser = WebAnalyser;

    fn attach_to(&mut self, source: &HtmlAudioElement, fft_size: usize) -> Result<WebAnalyser> {
        let context = AudioContext::new().map_err(unsupported)?;
        let analyser = context.create_analyser().map_err(unsupported)?;
        analyser.set_fft_size(fft_size as u32);

        // Media element -> analyser -> speakers
        let source = context
            .create_media_element_source(source)
            .map_err(unsupported)?;
        source
            .connect_with_audio_node(&analyser)
            .map_err(unsupported)?;
        analyser
            .connect_with_audio_node(&context.destination())
            .map_err(unsupported)?;

        Ok(WebAnalyser {
            context,
            analyser,
            source,
        })
    }
}

/// Live analysis graph
pub struct WebAnalyser {
    context: AudioContext,
    analyser: AnalyserNode,
    source: MediaElementAudioSourceNode,
}

impl FrequencyAnalyser for WebAnalyser {
    fn read_magnitudes(&mut self, buffer: &mut [u8]) {
        self.analyser.get_byte_frequency_data(buffer);
    }

    fn read_waveform(&mut self, buffer: &mut [u8]) {
        self.analyser.get_byte_time_domain_data(buffer);
    }

    fn resume(&mut self) {
        // The element is routed through the context, so a suspended context is silence
        if self.context.state() != AudioContextState::Suspended {
            return;
        }
        match self.context.resume() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    tracing::warn!("Failed to resume audio context: {:?}", e);
                }
            }),
            Err(e) => tracing::warn!("Failed to resume audio context: {:?}", e),
        }
    }

    fn close(&mut self) {
        self.source.disconnect().ok();
        self.analyser.disconnect().ok();
        if let Err(e) = self.context.close() {
            tracing::warn!("Failed to close audio context: {:?}", e);
        }
    }
}

fn unsupported(error: JsValue) -> PlayerError {
    PlayerError::UnsupportedEnvironment(format!("Web Audio unavailable: {:?}", error))
}
