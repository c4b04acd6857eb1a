use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use tracing::{error, info, warn};

use crate::backend::HostSurface;
use crate::fallback::FallbackBackground;
use crate::gpu::WgpuBackend;
use crate::hero::{mount, HeroOptions, Mounted};
use crate::input::InputSender;
use crate::render_loop::RenderLoop;
use crate::runtime::FrameScheduler;
use crate::theme::ThemeAttribute;
use crate::types::{RendererConfig, ScrollSettings};

/// The winit window as seen by [`mount`].
struct WindowHost {
    window: Arc<Window>,
    fallback: Option<FallbackBackground>,
    input: Option<InputSender>,
}

impl WindowHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            fallback: None,
            input: None,
        }
    }
}

impl HostSurface for WindowHost {
    fn layout_size(&self) -> LogicalSize<f64> {
        self.window.inner_size().to_logical(self.window.scale_factor())
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn apply_fallback(&mut self, background: &FallbackBackground) {
        self.fallback = Some(background.clone());
        self.window.request_redraw();
    }

    fn subscribe_input(&mut self, sender: InputSender) {
        self.input = Some(sender);
    }
}

/// Paints the static fallback through a CPU framebuffer once the GPU path
/// has been abandoned.
struct FallbackPainter {
    surface: softbuffer::Surface<Arc<Window>, Arc<Window>>,
    _context: softbuffer::Context<Arc<Window>>,
    background: FallbackBackground,
    cached: Option<(PhysicalSize<u32>, Vec<u32>)>,
}

impl FallbackPainter {
    fn new(window: Arc<Window>, background: FallbackBackground) -> Result<Self> {
        let context = softbuffer::Context::new(window.clone())
            .map_err(|err| anyhow!("failed to create fallback context: {err}"))?;
        let surface = softbuffer::Surface::new(&context, window)
            .map_err(|err| anyhow!("failed to create fallback surface: {err}"))?;
        Ok(Self {
            surface,
            _context: context,
            background,
            cached: None,
        })
    }

    fn paint(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(());
        };
        self.surface
            .resize(width, height)
            .map_err(|err| anyhow!("failed to resize fallback surface: {err}"))?;

        let stale = self.cached.as_ref().map_or(true, |(cached, _)| *cached != size);
        if stale {
            let pixels = pack_pixels(&self.background.rasterize(size.width, size.height));
            self.cached = Some((size, pixels));
        }

        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|err| anyhow!("failed to map fallback buffer: {err}"))?;
        if let Some((_, pixels)) = self.cached.as_ref() {
            buffer.copy_from_slice(pixels);
        }
        buffer
            .present()
            .map_err(|err| anyhow!("failed to present fallback buffer: {err}"))?;
        Ok(())
    }
}

enum HeroDriver {
    Running(Box<RenderLoop<WgpuBackend>>),
    Fallback(FallbackPainter),
}

/// Everything the event loop owns. Field order matters: the driver holds a
/// surface onto `window` and has to drop first.
struct HeroWindow {
    driver: HeroDriver,
    input: Option<InputSender>,
    theme: ThemeAttribute,
    scheduler: FrameScheduler,
    scroll: ScrollSettings,
    scroll_offset: f64,
    window: Arc<Window>,
}

impl HeroWindow {
    fn logical_size(&self) -> LogicalSize<f64> {
        self.window.inner_size().to_logical(self.window.scale_factor())
    }

    fn resize(&mut self) {
        let scale = self.window.scale_factor();
        let layout = self.logical_size();
        match &mut self.driver {
            HeroDriver::Running(render_loop) => {
                let size = render_loop.resize(layout, scale);
                tracing::debug!(width = size.width, height = size.height, scale, "resized");
            }
            HeroDriver::Fallback(_) => self.window.request_redraw(),
        }
        // Keep the virtual page offset inside the new page length.
        let clamped = self.scroll.scroll_by(self.scroll_offset, 0.0, layout.height);
        if clamped != self.scroll_offset {
            self.scroll_offset = clamped;
            if let Some(input) = self.input.as_ref() {
                input.scrolled(clamped, layout.height);
            }
        }
    }

    fn cursor_moved(&self, position: PhysicalPosition<f64>) {
        if let Some(input) = self.input.as_ref() {
            let size = self.window.inner_size();
            input.pointer_moved(
                position.x,
                position.y,
                (f64::from(size.width), f64::from(size.height)),
            );
        }
    }

    fn mouse_wheel(&mut self, delta: MouseScrollDelta) {
        let Some(input) = self.input.as_ref() else {
            return;
        };
        let layout = self.logical_size();
        let delta_px = wheel_delta_pixels(delta, self.scroll.line_height, self.window.scale_factor());
        self.scroll_offset = self.scroll.scroll_by(self.scroll_offset, delta_px, layout.height);
        input.scrolled(self.scroll_offset, layout.height);
    }

    fn set_occluded(&mut self, occluded: bool) {
        if let HeroDriver::Running(render_loop) = &mut self.driver {
            if occluded {
                render_loop.stop();
            } else {
                render_loop.start();
                self.window.request_redraw();
            }
        }
    }

    /// Returns `false` when the window should close.
    fn keyboard(&mut self, event: &KeyEvent) -> bool {
        if event.state != ElementState::Pressed || event.repeat {
            return true;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => false,
            Key::Character(value) if value.eq_ignore_ascii_case("t") => {
                self.theme.toggle();
                true
            }
            _ => true,
        }
    }

    fn redraw(&mut self, elwt: &EventLoopWindowTarget<()>) {
        match &mut self.driver {
            HeroDriver::Running(render_loop) => match render_loop.tick() {
                Ok(Some(_)) => self.scheduler.mark_rendered(),
                Ok(None) => {}
                Err(err) => match err.as_surface_error() {
                    Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        render_loop.reconfigure();
                    }
                    Some(wgpu::SurfaceError::OutOfMemory) => {
                        error!("surface out of memory; exiting");
                        elwt.exit();
                    }
                    Some(wgpu::SurfaceError::Timeout) => {
                        warn!("surface timeout; retrying next frame");
                    }
                    _ => {
                        warn!(error = %err, "surface error; retrying next frame");
                    }
                },
            },
            HeroDriver::Fallback(painter) => {
                if let Err(err) = painter.paint(self.window.inner_size()) {
                    error!("failed to paint fallback background: {err:#}");
                }
            }
        }
    }

    fn about_to_wait(&mut self, elwt: &EventLoopWindowTarget<()>) {
        let running = matches!(&self.driver, HeroDriver::Running(render_loop) if render_loop.is_running());
        if !running {
            elwt.set_control_flow(ControlFlow::Wait);
            return;
        }

        let now = Instant::now();
        if self.scheduler.ready_for_frame(now) {
            tracing::trace!("scheduler: issuing redraw now");
            self.window.request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        } else if let Some(deadline) = self.scheduler.next_deadline() {
            let ms = deadline.saturating_duration_since(now).as_millis();
            tracing::trace!(deadline_ms = ms, "scheduler: waiting until next frame");
            elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
        } else {
            elwt.set_control_flow(ControlFlow::Wait);
        }
    }
}

/// Opens a window, mounts the hero background into it and runs until the
/// window is closed.
pub fn run(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(config.window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let theme = ThemeAttribute::new(Some(config.initial_theme.as_attribute()));
    let options = HeroOptions::new(Box::new(theme.clone())).with_sources(config.sources.clone());
    let antialiasing = config.antialiasing;

    let mut host = WindowHost::new(window.clone());
    let mounted = mount(
        Some(&mut host),
        |size| WgpuBackend::new(window.as_ref(), size, antialiasing),
        options,
    );

    let driver = match mounted {
        Mounted::Running(render_loop) => {
            info!(
                sample_count = render_loop.backend().sample_count(),
                format = ?render_loop.backend().surface_format(),
                "procedural background mounted"
            );
            HeroDriver::Running(Box::new(render_loop))
        }
        Mounted::Fallback(_) => {
            let background = host.fallback.take().unwrap_or_default();
            info!(css = %background, "static background mounted");
            HeroDriver::Fallback(
                FallbackPainter::new(window.clone(), background)
                    .context("failed to initialise fallback painter")?,
            )
        }
        Mounted::Detached => return Ok(()),
    };

    let mut state = HeroWindow {
        driver,
        input: host.input.take(),
        theme,
        scheduler: FrameScheduler::new(config.target_fps),
        scroll: config.scroll,
        scroll_offset: 0.0,
        window,
    };
    state.window.request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::KeyboardInput { event, .. } => {
                        if !state.keyboard(&event) {
                            elwt.exit();
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => state.cursor_moved(position),
                    WindowEvent::MouseWheel { delta, .. } => state.mouse_wheel(delta),
                    WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                        state.resize()
                    }
                    WindowEvent::Occluded(occluded) => state.set_occluded(occluded),
                    WindowEvent::RedrawRequested => state.redraw(elwt),
                    _ => {}
                }
            }
            Event::AboutToWait => state.about_to_wait(elwt),
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Converts a wheel event to a page scroll delta in logical pixels,
/// positive when the content should move up (wheel towards the user is
/// negative, as winit reports it).
fn wheel_delta_pixels(delta: MouseScrollDelta, line_height: f64, scale_factor: f64) -> f64 {
    match delta {
        MouseScrollDelta::LineDelta(_, lines) => f64::from(lines) * line_height,
        MouseScrollDelta::PixelDelta(position) => position.y / scale_factor.max(f64::EPSILON),
    }
}

/// `0x00RRGGBB` words as softbuffer expects them.
fn pack_pixels(image: &RgbaImage) -> Vec<u32> {
    image
        .pixels()
        .map(|pixel| {
            let [r, g, b, _] = pixel.0;
            (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
        })
        .collect()
}
