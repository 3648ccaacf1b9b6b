//! Per-frame spectrum publishing
//!
//! A cooperative loop on top of the host's frame callback
//! (`requestAnimationFrame` in a browser). At most one frame is pending at a
//! time; each frame samples once and hands the snapshot to the single
//! subscriber. Only the latest snapshot is kept.

use crate::analysis::{AnalysisHost, FrequencySampler, FrequencySnapshot};

/// Handle for a scheduled frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// Host frame pacing
pub trait FrameScheduler {
    /// Ask the host to call back on the next frame
    fn request_frame(&mut self) -> FrameId;

    /// Cancel a pending callback
    fn cancel_frame(&mut self, id: FrameId);
}

/// Handle returned by [`VisualizationLoop::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&FrequencySnapshot)>;

/// Frame-driven sampler loop
pub struct VisualizationLoop<F: FrameScheduler> {
    scheduler: F,
    pending: Option<FrameId>,
    subscriber: Option<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    latest: FrequencySnapshot,
}

impl<F: FrameScheduler> VisualizationLoop<F> {
    pub fn new(scheduler: F, bins: usize) -> Self {
        Self {
            scheduler,
            pending: None,
            subscriber: None,
            next_subscription: 0,
            latest: FrequencySnapshot::silent(bins),
        }
    }

    /// Schedule the first frame; no-op while already running
    pub fn start(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.scheduler.request_frame());
            tracing::trace!("Visualization loop started");
        }
    }

    /// Cancel the pending frame; no-op when not running
    pub fn stop(&mut self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel_frame(id);
            tracing::trace!("Visualization loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Frame callback from the host
    ///
    /// Returns `false` (and does nothing) for a frame that was cancelled or
    /// superseded.
    pub fn on_frame<H: AnalysisHost>(
        &mut self,
        id: FrameId,
        sampler: &mut FrequencySampler<H>,
    ) -> bool {
        if self.pending != Some(id) {
            return false;
        }

        self.latest = sampler.sample();
        if let Some((_, callback)) = self.subscriber.as_mut() {
            callback(&self.latest);
        }

        self.pending = Some(self.scheduler.request_frame());
        true
    }

    /// Register the snapshot consumer, replacing any previous one
    pub fn subscribe(&mut self, callback: impl FnMut(&FrequencySnapshot) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriber = Some((id, Box::new(callback)));
        id
    }

    /// Remove the subscriber if `id` is still the current one
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.subscriber {
            Some((current, _)) if current == id => {
                self.subscriber = None;
                true
            }
            _ => false,
        }
    }

    /// Last published snapshot
    pub fn latest(&self) -> &FrequencySnapshot {
        &self.latest
    }

    /// Reset the published snapshot to silence
    pub fn clear(&mut self) {
        let bins = self.latest.len();
        self.latest = FrequencySnapshot::silent(bins);
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NoAnalysis;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct ManualFrames {
        next: u64,
        requested: Vec<FrameId>,
        cancelled: Vec<FrameId>,
    }

    impl FrameScheduler for ManualFrames {
        fn request_frame(&mut self) -> FrameId {
            self.next += 1;
            let id = FrameId(self.next);
            self.requested.push(id);
            id
        }

        fn cancel_frame(&mut self, id: FrameId) {
            self.cancelled.push(id);
        }
    }

    fn silent_sampler() -> FrequencySampler<NoAnalysis<()>> {
        FrequencySampler::new(NoAnalysis::new(), 64)
    }

    #[test]
    fn start_is_idempotent() {
        let mut viz = VisualizationLoop::new(ManualFrames::default(), 32);
        viz.start();
        viz.start();
        assert!(viz.is_running());
        assert_eq!(viz.scheduler().requested.len(), 1);
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let mut viz = VisualizationLoop::new(ManualFrames::default(), 32);
        viz.stop();
        assert!(viz.scheduler().cancelled.is_empty());
    }

    #[test]
    fn frame_publishes_and_reschedules() {
        let mut viz = VisualizationLoop::new(ManualFrames::default(), 32);
        let mut sampler = silent_sampler();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        viz.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.len()));

        viz.start();
        assert!(viz.on_frame(FrameId(1), &mut sampler));
        assert!(viz.on_frame(FrameId(2), &mut sampler));

        assert_eq!(*received.borrow(), vec![32, 32]);
        assert_eq!(viz.scheduler().requested.len(), 3);
    }

    #[test]
    fn cancelled_frame_is_ignored() {
        let mut viz = VisualizationLoop::new(ManualFrames::default(), 32);
        let mut sampler = silent_sampler();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        viz.subscribe(move |_| *sink.borrow_mut() += 1);

        viz.start();
        viz.stop();
        assert!(!viz.on_frame(FrameId(1), &mut sampler));
        assert_eq!(*count.borrow(), 0);
        assert_eq!(viz.scheduler().cancelled, vec![FrameId(1)]);
    }

    #[test]
    fn subscribe_replaces_previous_subscriber() {
        let mut viz = VisualizationLoop::new(ManualFrames::default(), 32);
        let mut sampler = silent_sampler();
        let first = Rc::new(RefCell::new(0));
        let second = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&first);
        let old = viz.subscribe(move |_| *sink.borrow_mut() += 1);
        let sink = Rc::clone(&second);
        let new = viz.subscribe(move |_| *sink.borrow_mut() += 1);

        viz.start();
        viz.on_frame(FrameId(1), &mut sampler);
        assert_eq!(*first.borrow(), 0);
        assert_eq!(*second.borrow(), 1);

        assert!(!viz.unsubscribe(old));
        assert!(viz.unsubscribe(new));
        viz.on_frame(FrameId(2), &mut sampler);
        assert_eq!(*second.borrow(), 1);
    }
}
