//! `requestAnimationFrame` scheduler

use crate::visualizer::{FrameId, FrameScheduler};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

/// Receives the id of the frame being delivered
pub type FrameTick = Rc<dyn Fn(FrameId)>;

/// Frame pacing from the browser's animation loop
///
/// One persistent callback serves every request; at most one frame is
/// pending, so the callback knows which id it is delivering.
pub struct AnimationFrames {
    window: Window,
    callback: Closure<dyn FnMut(f64)>,
    pending: Rc<Cell<Option<i32>>>,
}

impl AnimationFrames {
    pub fn new(tick: FrameTick) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or("No window")?;
        let pending: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

        let delivered = Rc::clone(&pending);
        let callback = Closure::wrap(Box::new(move |_timestamp: f64| {
            if let Some(handle) = delivered.take() {
                tick(FrameId(handle as u64));
            }
        }) as Box<dyn FnMut(f64)>);

        Ok(Self {
            window,
            callback,
            pending,
        })
    }
}

impl FrameScheduler for AnimationFrames {
    fn request_frame(&mut self) -> FrameId {
        match self
            .window
            .request_animation_frame(self.callback.as_ref().unchecked_ref())
        {
            Ok(handle) => {
                self.pending.set(Some(handle));
                FrameId(handle as u64)
            }
            Err(e) => {
                // Never delivered; the loop just stalls until the next start
                tracing::warn!("requestAnimationFrame failed: {:?}", e);
                FrameId(0)
            }
        }
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if let Some(handle) = self.pending.take() {
            if handle as u64 == id.0 {
                self.window.cancel_animation_frame(handle).ok();
            } else {
                self.pending.set(Some(handle));
            }
        }
    }
}

impl Drop for AnimationFrames {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.window.cancel_animation_frame(handle).ok();
        }
    }
}
