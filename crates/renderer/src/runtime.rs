use std::time::{Duration, Instant};

/// Snapshot of the clock handed to the render loop each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed seconds since the first tick.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Wall-clock source. The origin is pinned on the first sample, so time
/// starts at zero on the first frame and keeps running while the loop is
/// suspended.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource {
    origin: Option<Instant>,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        let origin = *self.origin.get_or_insert_with(Instant::now);
        let sample = TimeSample::new(origin.elapsed().as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Deterministic source advancing by a fixed step per sample; used for
/// reproducible runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct SteppedTimeSource {
    step: f32,
    frame: u64,
}

impl SteppedTimeSource {
    pub fn new(step: f32) -> Self {
        Self { step, frame: 0 }
    }
}

impl TimeSource for SteppedTimeSource {
    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.step * self.frame as f32, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Paces redraw requests for the window host.
///
/// Without a cap every vsync callback may render. With a cap the scheduler
/// hands out one frame per interval and reports the next deadline so the
/// event loop can sleep until then.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last_frame: Option<Instant>,
}

impl FrameScheduler {
    /// `target_fps` of `None`, zero, or a non-finite value means uncapped.
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            last_frame: None,
        }
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }

    pub fn mark_rendered(&mut self) {
        self.mark_rendered_at(Instant::now());
    }

    pub fn mark_rendered_at(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(None)
    }
}
