//! Per-frame driver for the hero background.
//!
//! ```text
//!   Building ──build ok──▶ Running ◀──start/stop──▶ Suspended
//!       │
//!       └──build failed──▶ Fallback (terminal, no frames)
//! ```
//!
//! Each running tick samples the clock, drains and smooths input, reads the
//! theme, writes the five uniforms and issues one draw. The host decides
//! when the next tick happens.

use std::time::{Duration, Instant};

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::backend::GpuBackend;
use crate::error::{DrawError, RenderError};
use crate::input::{InputSender, InputState, InputTracker};
use crate::program::{self, ShaderSources, UniformBlock, UniformLocation, UniformTable};
use crate::runtime::BoxedTimeSource;
use crate::shading::ShadingInputs;
use crate::surface::SurfaceManager;
use crate::theme::ThemeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Building,
    Running,
    Suspended,
    Fallback,
}

/// Everything one frame fed to the shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub time: f32,
    pub frame_index: u64,
    pub resolution: [f32; 2],
    pub mouse: [f32; 2],
    pub scroll: f32,
    pub theme: f32,
}

impl FrameState {
    pub fn shading_inputs(&self) -> ShadingInputs {
        ShadingInputs {
            time: self.time,
            resolution: self.resolution.into(),
            mouse: self.mouse.into(),
            scroll: self.scroll,
            theme: self.theme,
        }
    }
}

/// Uniform locations resolved once after link.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct UniformSlots {
    time: Option<UniformLocation>,
    resolution: Option<UniformLocation>,
    mouse: Option<UniformLocation>,
    scroll: Option<UniformLocation>,
    theme: Option<UniformLocation>,
}

impl UniformSlots {
    fn resolve(table: &UniformTable) -> Self {
        Self {
            time: table.location("time"),
            resolution: table.location("resolution"),
            mouse: table.location("mouse"),
            scroll: table.location("scroll"),
            theme: table.location("theme"),
        }
    }

    fn write(&self, block: &mut UniformBlock, frame: &FrameState) {
        block.set_float(self.time, frame.time);
        block.set_vec2(self.resolution, frame.resolution);
        block.set_vec2(self.mouse, frame.mouse);
        block.set_float(self.scroll, frame.scroll);
        block.set_float(self.theme, frame.theme);
    }
}

struct FrameStats {
    frames: u64,
    since_report: u32,
    last_report: Instant,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frames: 0,
            since_report: 0,
            last_report: Instant::now(),
        }
    }

    fn record(&mut self, frame: &FrameState) {
        self.frames += 1;
        self.since_report += 1;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_report);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.since_report as f32 / elapsed.as_secs_f32();
            tracing::debug!(
                fps = fps.round(),
                frame_count = self.frames,
                time = frame.time,
                "render stats"
            );
            self.since_report = 0;
            self.last_report = now;
        }
    }
}

pub struct RenderLoop<B: GpuBackend> {
    state: LoopState,
    failure: Option<RenderError>,
    backend: B,
    surface: SurfaceManager,
    input: InputTracker,
    theme: Box<dyn ThemeSource>,
    clock: BoxedTimeSource,
    slots: UniformSlots,
    block: UniformBlock,
    stats: FrameStats,
}

impl<B: GpuBackend> RenderLoop<B> {
    /// A loop in the `Building` state. The backend is configured to the
    /// surface's current size straight away.
    pub fn new(
        mut backend: B,
        surface: SurfaceManager,
        theme: Box<dyn ThemeSource>,
        clock: BoxedTimeSource,
    ) -> Self {
        backend.configure(surface.physical_size());
        Self {
            state: LoopState::Building,
            failure: None,
            backend,
            surface,
            input: InputTracker::new(),
            theme,
            clock,
            slots: UniformSlots::default(),
            block: UniformBlock::for_table(&UniformTable::default()),
            stats: FrameStats::new(),
        }
    }

    /// Builds the program and installs it. Leaves `Building` exactly once:
    /// for `Running` on success, for `Fallback` on any failure.
    pub fn build(&mut self, sources: &ShaderSources) -> Result<(), RenderError> {
        match self.state {
            LoopState::Building => {}
            LoopState::Fallback => {
                return Err(self.failure.clone().unwrap_or_else(|| {
                    RenderError::LinkFailure {
                        log: "program already failed to build".to_string(),
                    }
                }))
            }
            LoopState::Running | LoopState::Suspended => return Ok(()),
        }

        let result = program::build(sources).and_then(|linked| {
            self.backend.install_program(&linked)?;
            Ok(linked)
        });
        match result {
            Ok(linked) => {
                self.slots = UniformSlots::resolve(linked.uniforms());
                self.block = UniformBlock::for_table(linked.uniforms());
                self.state = LoopState::Running;
                tracing::info!(
                    width = self.surface.physical_size().width,
                    height = self.surface.physical_size().height,
                    "hero program running"
                );
                Ok(())
            }
            Err(err) => {
                self.state = LoopState::Fallback;
                self.failure = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Resumes a suspended loop. No-op in any other state.
    pub fn start(&mut self) {
        if self.state == LoopState::Suspended {
            self.state = LoopState::Running;
            tracing::debug!("render loop resumed");
        }
    }

    /// Suspends a running loop. No-op in any other state.
    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            self.state = LoopState::Suspended;
            tracing::debug!("render loop suspended");
        }
    }

    /// Producer handle for host input callbacks.
    pub fn input_sender(&self) -> InputSender {
        self.input.sender()
    }

    pub fn input_state(&self) -> InputState {
        self.input.state()
    }

    pub fn surface(&self) -> &SurfaceManager {
        &self.surface
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Recomputes the buffer size and reconfigures the backend.
    pub fn resize(&mut self, layout: LogicalSize<f64>, device_pixel_ratio: f64) -> PhysicalSize<u32> {
        let size = self.surface.resize(layout, device_pixel_ratio);
        if self.state != LoopState::Fallback {
            self.backend.configure(size);
        }
        size
    }

    /// Reconfigures at the current size, e.g. after a lost swapchain.
    pub fn reconfigure(&mut self) {
        if self.state != LoopState::Fallback {
            self.backend.configure(self.surface.physical_size());
        }
    }

    /// Runs one frame. Returns `Ok(None)` without touching the GPU unless
    /// the loop is running.
    pub fn tick(&mut self) -> Result<Option<FrameState>, DrawError> {
        if self.state != LoopState::Running {
            return Ok(None);
        }

        let sample = self.clock.sample();
        self.input.drain_pending();
        self.input.advance_smoothing();
        let theme = self.theme.theme().scalar();
        let input = self.input.state();

        let frame = FrameState {
            time: sample.seconds,
            frame_index: sample.frame_index,
            resolution: self.surface.resolution(),
            mouse: input.smoothed,
            scroll: input.scroll,
            theme,
        };

        self.slots.write(&mut self.block, &frame);
        self.backend.upload_uniforms(&self.block);
        self.backend.draw()?;
        self.stats.record(&frame);
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::SteppedTimeSource;
    use crate::testing::RecordingBackend;
    use crate::theme::{FixedTheme, Theme, ThemeAttribute};

    fn running_loop(theme: Box<dyn ThemeSource>) -> RenderLoop<RecordingBackend> {
        let mut render_loop = RenderLoop::new(
            RecordingBackend::default(),
            SurfaceManager::new(LogicalSize::new(800.0, 600.0), 3.0),
            theme,
            Box::new(SteppedTimeSource::new(0.5)),
        );
        render_loop
            .build(&ShaderSources::embedded())
            .expect("embedded program builds");
        render_loop
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    #[test]
    fn successful_build_runs() {
        let render_loop = running_loop(Box::new(FixedTheme::default()));
        assert_eq!(render_loop.state(), LoopState::Running);
        assert!(render_loop.is_running());
        let log = render_loop.backend().log.borrow();
        assert_eq!(log.installs, 1);
        assert_eq!(log.configured, vec![PhysicalSize::new(1600, 1200)]);
    }

    #[test]
    fn tick_writes_all_uniforms() {
        let theme = ThemeAttribute::new(Some("light"));
        let mut render_loop = running_loop(Box::new(theme));
        render_loop
            .input_sender()
            .pointer_moved(800.0, 0.0, (800.0, 600.0));
        render_loop.input_sender().scrolled(300.0, 600.0);

        render_loop.tick().expect("first frame");
        let frame = render_loop.tick().expect("second frame").expect("running");
        assert_eq!(frame.time, 0.5);
        assert_eq!(frame.resolution, [1600.0, 1200.0]);
        assert_eq!(frame.scroll, 0.5);
        assert_eq!(frame.theme, 1.0);
        // Two smoothing steps from 0.5 toward 1.0.
        let expected = 1.0 - 0.5 * 0.92f32 * 0.92;
        assert!((frame.mouse[0] - expected).abs() < 1e-5);
        assert!((frame.mouse[1] - expected).abs() < 1e-5);

        let log = render_loop.backend().log.borrow();
        assert_eq!(log.draws, 2);
        let uniforms = floats(log.uploads.last().expect("uploaded"));
        assert_eq!(uniforms[0], 0.5);
        assert_eq!(&uniforms[2..4], &[1600.0, 1200.0]);
        assert!((uniforms[4] - expected).abs() < 1e-5);
        assert_eq!(uniforms[6], 0.5);
        assert_eq!(uniforms[7], 1.0);
    }

    #[test]
    fn theme_is_read_every_frame() {
        let theme = ThemeAttribute::new(None);
        let mut render_loop = running_loop(Box::new(theme.clone()));
        let dark = render_loop.tick().unwrap().unwrap();
        theme.toggle();
        let light = render_loop.tick().unwrap().unwrap();
        assert_eq!(dark.theme, Theme::Dark.scalar());
        assert_eq!(light.theme, Theme::Light.scalar());
    }

    #[test]
    fn stop_and_start_gate_frames() {
        let mut render_loop = running_loop(Box::new(FixedTheme::default()));
        render_loop.stop();
        assert_eq!(render_loop.state(), LoopState::Suspended);
        assert!(!render_loop.is_running());
        assert_eq!(render_loop.tick().unwrap(), None);
        assert_eq!(render_loop.backend().log.borrow().draws, 0);

        render_loop.start();
        assert!(render_loop.is_running());
        assert!(render_loop.tick().unwrap().is_some());
        assert_eq!(render_loop.backend().log.borrow().draws, 1);
    }

    #[test]
    fn suspended_loop_keeps_only_latest_input() {
        let mut render_loop = running_loop(Box::new(FixedTheme::default()));
        render_loop.stop();
        let sender = render_loop.input_sender();
        for step in 0..200_000u32 {
            sender.pointer_moved(f64::from(step % 1_024), 0.0, (1_024.0, 600.0));
            if step % 1_000 == 0 {
                sender.scrolled(f64::from(step), 600.0);
                assert_eq!(render_loop.tick().unwrap(), None);
            }
        }
        assert_eq!(render_loop.input.pending(), 2);

        render_loop.start();
        let frame = render_loop.tick().unwrap().expect("running");
        assert_eq!(render_loop.input.pending(), 0);
        // 199_999 % 1_024 = 319.
        assert_eq!(render_loop.input_state().raw[0], 319.0 / 1_024.0);
        assert_eq!(frame.scroll, 1.4);
    }

    #[test]
    fn invalid_fragment_moves_to_fallback() {
        let mut render_loop = RenderLoop::new(
            RecordingBackend::default(),
            SurfaceManager::new(LogicalSize::new(100.0, 100.0), 1.0),
            Box::new(FixedTheme::default()),
            Box::new(SteppedTimeSource::new(0.1)),
        );
        let err = render_loop
            .build(&ShaderSources::with_fragment("not a shader"))
            .expect_err("must fail");
        assert!(matches!(err, RenderError::CompileFailure { .. }));
        assert_eq!(render_loop.state(), LoopState::Fallback);

        // Terminal: start() does nothing, ticks never draw, rebuilding reports the same error.
        render_loop.start();
        assert_eq!(render_loop.tick().unwrap(), None);
        assert_eq!(
            render_loop.build(&ShaderSources::embedded()).unwrap_err(),
            err
        );
        let log = render_loop.backend().log.borrow();
        assert_eq!(log.draws, 0);
        assert_eq!(log.installs, 0);
    }

    #[test]
    fn pipeline_rejection_moves_to_fallback() {
        let backend = RecordingBackend {
            fail_install: Some(RenderError::LinkFailure {
                log: "pipeline validation".into(),
            }),
            ..Default::default()
        };
        let mut render_loop = RenderLoop::new(
            backend,
            SurfaceManager::new(LogicalSize::new(100.0, 100.0), 1.0),
            Box::new(FixedTheme::default()),
            Box::new(SteppedTimeSource::new(0.1)),
        );
        assert!(render_loop.build(&ShaderSources::embedded()).is_err());
        assert_eq!(render_loop.state(), LoopState::Fallback);
    }

    #[test]
    fn resize_updates_resolution_uniform() {
        let mut render_loop = running_loop(Box::new(FixedTheme::default()));
        let size = render_loop.resize(LogicalSize::new(400.0, 300.0), 1.0);
        assert_eq!(size, PhysicalSize::new(400, 300));
        let frame = render_loop.tick().unwrap().unwrap();
        assert_eq!(frame.resolution, [400.0, 300.0]);
        assert_eq!(
            render_loop.backend().log.borrow().configured.last(),
            Some(&PhysicalSize::new(400, 300))
        );
    }

    #[test]
    fn zero_area_surface_still_ticks() {
        let mut render_loop = running_loop(Box::new(FixedTheme::default()));
        render_loop.resize(LogicalSize::new(0.0, 0.0), 1.0);
        assert!(render_loop.surface().is_empty());
        let frame = render_loop.tick().expect("no error on empty surface");
        assert_eq!(frame.map(|f| f.resolution), Some([0.0, 0.0]));
    }

    #[test]
    fn draw_errors_surface_to_the_host() {
        let mut render_loop = running_loop(Box::new(FixedTheme::default()));
        render_loop.backend_mut().fail_draw = true;
        let err = render_loop.tick().expect_err("draw fails");
        assert!(matches!(
            err.as_surface_error(),
            Some(wgpu::SurfaceError::Timeout)
        ));
    }
}
