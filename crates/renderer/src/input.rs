//! Pointer and scroll state for the hero.
//!
//! Host event handlers push raw samples through an [`InputSender`]. Each
//! kind of sample has a one-slot mailbox: a new pointer sample replaces a
//! pointer sample the render loop has not picked up yet, and the same goes
//! for scroll. The loop drains both slots once per frame and smoothing then
//! eases the shader's pointer toward the raw sample.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Per-frame damping applied to the smoothed pointer.
pub const SMOOTHING: f32 = 0.08;

/// Upper bound on scroll progress, in viewport heights.
pub const SCROLL_CEILING: f32 = 1.4;

/// Raw sample produced by the host's event handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMove {
        client_x: f64,
        client_y: f64,
        viewport_width: f64,
        viewport_height: f64,
    },
    Scroll {
        scroll_y: f64,
        viewport_height: f64,
    },
}

/// Single-slot, last-write-wins mailbox.
#[derive(Debug, Clone)]
struct Slot {
    tx: Sender<InputEvent>,
    rx: Receiver<InputEvent>,
}

impl Slot {
    fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Stores `event`, evicting whatever sample is still waiting.
    fn replace(&self, mut event: InputEvent) {
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.rx.try_recv();
                    event = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    fn take(&self) -> Option<InputEvent> {
        self.rx.try_recv().ok()
    }

    fn pending(&self) -> usize {
        self.rx.len()
    }
}

/// Producer handle given to the host surface.
#[derive(Debug, Clone)]
pub struct InputSender {
    pointer: Slot,
    scroll: Slot,
}

impl InputSender {
    pub fn pointer_moved(&self, client_x: f64, client_y: f64, viewport: (f64, f64)) {
        self.send(InputEvent::PointerMove {
            client_x,
            client_y,
            viewport_width: viewport.0,
            viewport_height: viewport.1,
        });
    }

    pub fn scrolled(&self, scroll_y: f64, viewport_height: f64) {
        self.send(InputEvent::Scroll {
            scroll_y,
            viewport_height,
        });
    }

    pub fn send(&self, event: InputEvent) {
        match event {
            InputEvent::PointerMove { .. } => self.pointer.replace(event),
            InputEvent::Scroll { .. } => self.scroll.replace(event),
        }
    }
}

/// Snapshot of the pointer and scroll state consumed by a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputState {
    /// Latest raw pointer, normalised with a bottom-left origin.
    pub raw: [f32; 2],
    /// Pointer after exponential smoothing; this is what the shader sees.
    pub smoothed: [f32; 2],
    /// Scroll progress in `[0, SCROLL_CEILING]`.
    pub scroll: f32,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            raw: [0.5, 0.5],
            smoothed: [0.5, 0.5],
            scroll: 0.0,
        }
    }
}

/// Owns [`InputState`] and the consumer end of the sample slots.
#[derive(Debug)]
pub struct InputTracker {
    state: InputState,
    pointer: Slot,
    scroll: Slot,
}

impl InputTracker {
    pub fn new() -> Self {
        Self {
            state: InputState::default(),
            pointer: Slot::new(),
            scroll: Slot::new(),
        }
    }

    /// A new producer handle for the host's event callbacks.
    pub fn sender(&self) -> InputSender {
        InputSender {
            pointer: self.pointer.clone(),
            scroll: self.scroll.clone(),
        }
    }

    /// Samples waiting to be drained; never more than one per kind.
    pub fn pending(&self) -> usize {
        self.pointer.pending() + self.scroll.pending()
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    pub fn on_pointer_move(
        &mut self,
        client_x: f64,
        client_y: f64,
        viewport_width: f64,
        viewport_height: f64,
    ) {
        let width = nonzero(viewport_width);
        let height = nonzero(viewport_height);
        self.state.raw = [
            (client_x / width) as f32,
            (1.0 - client_y / height) as f32,
        ];
    }

    pub fn on_scroll(&mut self, scroll_y: f64, viewport_height: f64) {
        let progress = scroll_y.max(0.0) / viewport_height.max(1.0);
        self.state.scroll = (progress as f32).min(SCROLL_CEILING);
    }

    /// Eases the smoothed pointer one frame toward the raw sample.
    pub fn advance_smoothing(&mut self) {
        let InputState { raw, smoothed, .. } = &mut self.state;
        for axis in 0..2 {
            smoothed[axis] += (raw[axis] - smoothed[axis]) * SMOOTHING;
        }
    }

    /// Applies the latest pointer and scroll samples, if any; returns how
    /// many were applied.
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        for event in [self.pointer.take(), self.scroll.take()].into_iter().flatten() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMove {
                client_x,
                client_y,
                viewport_width,
                viewport_height,
            } => self.on_pointer_move(client_x, client_y, viewport_width, viewport_height),
            InputEvent::Scroll {
                scroll_y,
                viewport_height,
            } => self.on_scroll(scroll_y, viewport_height),
        }
    }
}

impl Default for InputTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn nonzero(value: f64) -> f64 {
    if value == 0.0 {
        1.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_centred() {
        let tracker = InputTracker::new();
        assert_eq!(tracker.state(), InputState::default());
        assert_eq!(tracker.state().smoothed, [0.5, 0.5]);
        assert_eq!(tracker.state().scroll, 0.0);
    }

    #[test]
    fn pointer_is_normalised_bottom_up() {
        let mut tracker = InputTracker::new();
        tracker.on_pointer_move(200.0, 150.0, 800.0, 600.0);
        assert_eq!(tracker.state().raw, [0.25, 0.75]);
        // Raw assignment does not move the smoothed pointer.
        assert_eq!(tracker.state().smoothed, [0.5, 0.5]);
    }

    #[test]
    fn zero_viewport_does_not_divide_by_zero() {
        let mut tracker = InputTracker::new();
        tracker.on_pointer_move(0.5, 0.25, 0.0, 0.0);
        assert_eq!(tracker.state().raw, [0.5, 0.75]);
    }

    #[test]
    fn smoothing_converges_to_raw() {
        let mut tracker = InputTracker::new();
        tracker.on_pointer_move(100.0, 0.0, 100.0, 100.0);
        for _ in 0..50 {
            tracker.advance_smoothing();
        }
        // Residual after n frames is 0.5 * 0.92^n.
        let expected = 0.5 * (1.0 - SMOOTHING).powi(50);
        let state = tracker.state();
        assert!(((1.0 - state.smoothed[0]) - expected).abs() < 1e-4);
        for _ in 0..30 {
            tracker.advance_smoothing();
        }
        let state = tracker.state();
        assert!((state.smoothed[0] - 1.0).abs() < 1e-3);
        assert!((state.smoothed[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn single_step_uses_fixed_damping() {
        let mut tracker = InputTracker::new();
        tracker.on_pointer_move(100.0, 100.0, 100.0, 100.0);
        tracker.advance_smoothing();
        let state = tracker.state();
        assert!((state.smoothed[0] - 0.54).abs() < 1e-6);
        assert!((state.smoothed[1] - 0.46).abs() < 1e-6);
    }

    #[test]
    fn scroll_is_clamped() {
        let mut tracker = InputTracker::new();
        tracker.on_scroll(10_000.0, 500.0);
        assert_eq!(tracker.state().scroll, 1.4);
        tracker.on_scroll(-50.0, 500.0);
        assert_eq!(tracker.state().scroll, 0.0);
        tracker.on_scroll(250.0, 500.0);
        assert_eq!(tracker.state().scroll, 0.5);
        tracker.on_scroll(500.0, 500.0);
        assert_eq!(tracker.state().scroll, 1.0);
        tracker.on_scroll(20.0, 0.0);
        assert_eq!(tracker.state().scroll, 1.4);
    }

    #[test]
    fn drain_applies_last_sample_per_kind() {
        let mut tracker = InputTracker::new();
        let sender = tracker.sender();
        sender.pointer_moved(0.0, 0.0, (100.0, 100.0));
        sender.scrolled(100.0, 100.0);
        sender.pointer_moved(50.0, 25.0, (100.0, 100.0));
        sender.scrolled(50.0, 100.0);

        assert_eq!(tracker.pending(), 2);
        assert_eq!(tracker.drain_pending(), 2);
        let state = tracker.state();
        assert_eq!(state.raw, [0.5, 0.75]);
        assert_eq!(state.scroll, 0.5);
        assert_eq!(tracker.drain_pending(), 0);
    }

    #[test]
    fn bursts_never_queue_more_than_one_sample_per_kind() {
        let mut tracker = InputTracker::new();
        let sender = tracker.sender();
        for step in 0..10_000u32 {
            sender.pointer_moved(f64::from(step % 64), 0.0, (128.0, 128.0));
            assert!(tracker.pending() <= 1);
        }
        for step in 0..1_000u32 {
            sender.scrolled(f64::from(step), 1_024.0);
        }
        assert_eq!(tracker.pending(), 2);

        tracker.drain_pending();
        let state = tracker.state();
        // 9_999 % 64 = 15 and 999 / 1024 are both exact in f32.
        assert_eq!(state.raw, [15.0 / 128.0, 1.0]);
        assert_eq!(state.scroll, 999.0 / 1_024.0);
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn sender_outliving_tracker_is_harmless() {
        let tracker = InputTracker::new();
        let sender = tracker.sender();
        drop(tracker);
        sender.pointer_moved(1.0, 1.0, (2.0, 2.0));
    }
}
