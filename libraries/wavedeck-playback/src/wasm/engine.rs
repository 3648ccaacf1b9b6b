//! `HTMLAudioElement`-backed playback engine

use crate::engine::{EngineEvent, LoadGeneration, PlaybackEngine};
use crate::error::EngineError;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{DomException, Event, HtmlAudioElement, HtmlMediaElement};

/// Engine events waiting to be applied to the controller
pub type EngineEventQueue = Rc<RefCell<VecDeque<EngineEvent>>>;

/// Called after an event has been queued
pub type Wake = Rc<dyn Fn()>;

type Listener = Closure<dyn FnMut(Event)>;

/// Playback engine driving a detached `<audio>` element
///
/// Media element events are translated into [`EngineEvent`]s tagged with the
/// generation of the load they belong to and pushed onto a shared queue.
pub struct WebAudioEngine {
    element: HtmlAudioElement,
    generation: Rc<Cell<LoadGeneration>>,
    events: EngineEventQueue,
    wake: Wake,
    listeners: Vec<(&'static str, Listener)>,
}

impl WebAudioEngine {
    pub fn new(events: EngineEventQueue, wake: Wake) -> Result<Self, JsValue> {
        let element = HtmlAudioElement::new()?;
        element.set_preload("metadata");

        let mut engine = Self {
            element,
            generation: Rc::new(Cell::new(LoadGeneration::default())),
            events,
            wake,
            listeners: Vec::new(),
        };

        engine.listen("loadedmetadata", |element, generation| {
            Some(EngineEvent::Ready {
                generation,
                duration: element.duration(),
            })
        })?;
        engine.listen("timeupdate", |element, generation| {
            Some(EngineEvent::TimeUpdate {
                generation,
                position: element.current_time(),
            })
        })?;
        engine.listen("ended", |_, generation| Some(EngineEvent::Ended { generation }))?;
        engine.listen("error", |element, generation| {
            Some(EngineEvent::Error {
                generation,
                error: media_error(element),
            })
        })?;

        Ok(engine)
    }

    fn listen(
        &mut self,
        name: &'static str,
        translate: fn(&HtmlMediaElement, LoadGeneration) -> Option<EngineEvent>,
    ) -> Result<(), JsValue> {
        let element: HtmlMediaElement = self.element.clone().unchecked_into();
        let generation = Rc::clone(&self.generation);
        let events = Rc::clone(&self.events);
        let wake = Rc::clone(&self.wake);

        let listener = Closure::wrap(Box::new(move |_event: Event| {
            if let Some(event) = translate(&element, generation.get()) {
                events.borrow_mut().push_back(event);
                wake();
            }
        }) as Box<dyn FnMut(Event)>);

        self.element
            .add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())?;
        self.listeners.push((name, listener));
        Ok(())
    }
}

impl PlaybackEngine for WebAudioEngine {
    type Source = HtmlAudioElement;

    fn load(&mut self, source: &str, generation: LoadGeneration) -> Result<(), EngineError> {
        self.generation.set(generation);
        self.element.set_src(source);
        self.element.load();
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        let promise = self.element.play().map_err(play_error)?;

        // Autoplay refusals arrive as a rejected promise
        let generation = self.generation.get();
        let events = Rc::clone(&self.events);
        let wake = Rc::clone(&self.wake);
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                if is_abort(&e) {
                    // Interrupted by a newer load or pause
                    return;
                }
                events.borrow_mut().push_back(EngineEvent::Error {
                    generation,
                    error: play_error(e),
                });
                wake();
            }
        });
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.element
            .pause()
            .map_err(|e| EngineError::Other(describe(&e)))
    }

    fn position(&self) -> f64 {
        self.element.current_time()
    }

    fn set_position(&mut self, seconds: f64) -> Result<(), EngineError> {
        self.element.set_current_time(seconds);
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        let duration = self.element.duration();
        duration.is_finite().then_some(duration)
    }

    fn volume(&self) -> f32 {
        self.element.volume() as f32
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), EngineError> {
        self.element.set_volume(f64::from(volume));
        Ok(())
    }

    fn media_source(&self) -> &HtmlAudioElement {
        &self.element
    }
}

impl Drop for WebAudioEngine {
    fn drop(&mut self) {
        for (name, listener) in self.listeners.drain(..) {
            if let Err(e) = self
                .element
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
            {
                tracing::warn!("Failed to remove {} listener: {}", name, describe(&e));
            }
        }
        self.element.remove_attribute("src").ok();
        self.element.load();
    }
}

fn media_error(element: &HtmlMediaElement) -> EngineError {
    let Some(error) = element.error() else {
        return EngineError::Other("unknown media error".to_string());
    };
    let message = error.message();
    match error.code() {
        web_sys::MediaError::MEDIA_ERR_NETWORK => EngineError::Network(message),
        web_sys::MediaError::MEDIA_ERR_DECODE => EngineError::Decode(message),
        web_sys::MediaError::MEDIA_ERR_SRC_NOT_SUPPORTED => EngineError::Unsupported(message),
        _ => EngineError::Other(message),
    }
}

fn play_error(error: JsValue) -> EngineError {
    match error.dyn_ref::<DomException>().map(DomException::name) {
        Some(name) if name == "NotAllowedError" => EngineError::NotAllowed(describe(&error)),
        Some(name) if name == "NotSupportedError" => EngineError::Unsupported(describe(&error)),
        _ => EngineError::Other(describe(&error)),
    }
}

fn is_abort(error: &JsValue) -> bool {
    error
        .dyn_ref::<DomException>()
        .is_some_and(|e| e.name() == "AbortError")
}

fn describe(error: &JsValue) -> String {
    if let Some(exception) = error.dyn_ref::<DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    error.as_string().unwrap_or_else(|| format!("{:?}", error))
}
