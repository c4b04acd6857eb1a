//! Start-up sequence for the hero background.
//!
//! `mount` either hands back a running [`RenderLoop`], or paints the static
//! fallback once and does nothing further, or (with no host surface) does
//! nothing at all. Every failure is final for the session.

use winit::dpi::PhysicalSize;

use crate::backend::{GpuBackend, HostSurface};
use crate::error::RenderError;
use crate::fallback::FallbackBackground;
use crate::program::ShaderSources;
use crate::render_loop::RenderLoop;
use crate::runtime::{BoxedTimeSource, SystemTimeSource};
use crate::surface::SurfaceManager;
use crate::theme::ThemeSource;

/// Outcome of mounting the hero onto a host.
pub enum Mounted<B: GpuBackend> {
    /// No host surface; nothing was rendered and nothing was painted.
    Detached,
    /// The fallback background was applied; no frames will be produced.
    Fallback(RenderError),
    /// The procedural pipeline is running.
    Running(RenderLoop<B>),
}

impl<B: GpuBackend> Mounted<B> {
    pub fn is_running(&self) -> bool {
        matches!(self, Mounted::Running(_))
    }
}

impl<B: GpuBackend> std::fmt::Debug for Mounted<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mounted::Detached => f.write_str("Detached"),
            Mounted::Fallback(err) => f.debug_tuple("Fallback").field(err).finish(),
            Mounted::Running(render_loop) => f
                .debug_tuple("Running")
                .field(&render_loop.state())
                .finish(),
        }
    }
}

/// Inputs to [`mount`] besides the host and the GPU.
pub struct HeroOptions {
    pub sources: ShaderSources,
    pub theme: Box<dyn ThemeSource>,
    pub clock: BoxedTimeSource,
    pub fallback: FallbackBackground,
}

impl HeroOptions {
    pub fn new(theme: Box<dyn ThemeSource>) -> Self {
        Self {
            sources: ShaderSources::embedded(),
            theme,
            clock: Box::new(SystemTimeSource::new()),
            fallback: FallbackBackground::hero(),
        }
    }

    pub fn with_sources(mut self, sources: ShaderSources) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_clock(mut self, clock: BoxedTimeSource) -> Self {
        self.clock = clock;
        self
    }
}

/// Mounts the hero.
///
/// `acquire` obtains the GPU context for the initial physical size; its
/// failure maps to [`RenderError::ContextUnavailable`] handling. Input is only
/// subscribed once the program is running.
pub fn mount<H, B, F>(host: Option<&mut H>, acquire: F, options: HeroOptions) -> Mounted<B>
where
    H: HostSurface + ?Sized,
    B: GpuBackend,
    F: FnOnce(PhysicalSize<u32>) -> Result<B, RenderError>,
{
    let Some(host) = host else {
        tracing::debug!(error = %RenderError::MissingSurface, "hero not mounted");
        return Mounted::Detached;
    };

    let HeroOptions {
        sources,
        theme,
        clock,
        fallback,
    } = options;

    let surface = SurfaceManager::new(host.layout_size(), host.device_pixel_ratio());
    let backend = match acquire(surface.physical_size()) {
        Ok(backend) => backend,
        Err(err) => return engage_fallback(host, &fallback, err),
    };

    let mut render_loop = RenderLoop::new(backend, surface, theme, clock);
    if let Err(err) = render_loop.build(&sources) {
        drop(render_loop);
        return engage_fallback(host, &fallback, err);
    }

    host.subscribe_input(render_loop.input_sender());
    Mounted::Running(render_loop)
}

fn engage_fallback<H, B>(host: &mut H, fallback: &FallbackBackground, err: RenderError) -> Mounted<B>
where
    H: HostSurface + ?Sized,
    B: GpuBackend,
{
    if err.engages_fallback() {
        tracing::warn!(error = %err, "procedural background unavailable; using fallback");
        host.apply_fallback(fallback);
        Mounted::Fallback(err)
    } else {
        Mounted::Detached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_loop::LoopState;
    use crate::runtime::SteppedTimeSource;
    use crate::testing::{RecordingBackend, RecordingHost};
    use crate::theme::FixedTheme;

    fn options() -> HeroOptions {
        HeroOptions::new(Box::new(FixedTheme::default()))
            .with_clock(Box::new(SteppedTimeSource::new(1.0 / 60.0)))
    }

    #[test]
    fn mounts_running_loop_and_subscribes_input() {
        let mut host = RecordingHost::new(800.0, 600.0, 3.0);
        let backend = RecordingBackend::default();
        let log = backend.log.clone();

        let mounted = mount(Some(&mut host), |size| {
            assert_eq!(size, PhysicalSize::new(1600, 1200));
            Ok(backend)
        }, options());

        let Mounted::Running(mut render_loop) = mounted else {
            panic!("expected a running loop");
        };
        assert_eq!(render_loop.state(), LoopState::Running);
        assert!(host.fallbacks.is_empty());
        assert_eq!(host.subscribers.len(), 1);

        host.subscribers[0].pointer_moved(0.0, 600.0, (800.0, 600.0));
        render_loop.tick().expect("frame");
        assert_eq!(render_loop.input_state().raw, [0.0, 0.0]);
        assert_eq!(log.borrow().draws, 1);
    }

    #[test]
    fn missing_context_paints_fallback_without_input() {
        let mut host = RecordingHost::new(800.0, 600.0, 1.0);
        let mounted: Mounted<RecordingBackend> = mount(
            Some(&mut host),
            |_| Err(RenderError::ContextUnavailable("no adapter".into())),
            options(),
        );
        assert!(matches!(mounted, Mounted::Fallback(RenderError::ContextUnavailable(_))));
        assert_eq!(host.fallbacks, vec![FallbackBackground::hero().css()]);
        assert!(host.subscribers.is_empty());
    }

    #[test]
    fn build_failure_paints_fallback_once_and_never_draws() {
        let mut host = RecordingHost::new(320.0, 200.0, 1.0);
        let backend = RecordingBackend::default();
        let log = backend.log.clone();

        let mounted = mount(
            Some(&mut host),
            |_| Ok(backend),
            options().with_sources(ShaderSources::with_fragment("void main( {")),
        );

        match mounted {
            Mounted::Fallback(RenderError::CompileFailure { stage, .. }) => {
                assert_eq!(stage, crate::error::ShaderKind::Fragment)
            }
            other => panic!("unexpected mount outcome: {other:?}"),
        }
        assert_eq!(host.fallbacks.len(), 1);
        assert!(host.subscribers.is_empty());
        let log = log.borrow();
        assert_eq!(log.draws, 0);
        assert!(log.uploads.is_empty());
    }

    #[test]
    fn no_host_is_detached() {
        let mut acquired = false;
        let mounted: Mounted<RecordingBackend> = mount::<RecordingHost, _, _>(
            None,
            |_| {
                acquired = true;
                Ok(RecordingBackend::default())
            },
            options(),
        );
        assert!(matches!(mounted, Mounted::Detached));
        assert!(!acquired);
    }
}
