//! Renderer crate for nebshade, an animated procedural hero background.
//!
//! The crate turns a window into a full-screen shader canvas that reacts to
//! the pointer, the page scroll offset and the light/dark theme. The overall
//! flow is:
//!
//! ```text
//!   host callbacks ──▶ InputSender ──▶ InputTracker (smoothing)
//!                                              │
//!   mount() ──▶ program::build ──▶ RenderLoop::tick ──▶ UniformBlock ──▶ GpuBackend::draw
//!      │
//!      └─▶ FallbackBackground (no GPU, or the program failed to build)
//! ```
//!
//! The core ([`RenderLoop`], [`program`], [`input`], [`surface`]) talks to
//! the GPU and the windowing system only through the traits in [`backend`],
//! so it runs under test without either. [`gpu`] and [`window`] provide the
//! `wgpu`/`winit` implementations, and [`shading`] is a CPU evaluation of the
//! same shading function used for still export.

pub mod backend;
pub mod error;
pub mod fallback;
pub mod gpu;
pub mod hero;
pub mod input;
pub mod program;
pub mod render_loop;
pub mod runtime;
pub mod shading;
pub mod surface;
pub mod theme;
pub mod types;
pub mod window;

#[cfg(test)]
mod testing;

pub use backend::{GpuBackend, HostSurface};
pub use error::{DrawError, RenderError, ShaderKind};
pub use fallback::FallbackBackground;
pub use hero::{mount, HeroOptions, Mounted};
pub use input::{InputEvent, InputSender, InputState, InputTracker};
pub use program::{LinkedProgram, ShaderSources, UniformBlock, UniformTable};
pub use render_loop::{FrameState, LoopState, RenderLoop};
pub use runtime::{FrameScheduler, SystemTimeSource, TimeSample, TimeSource};
pub use shading::ShadingInputs;
pub use surface::SurfaceManager;
pub use theme::{FixedTheme, Theme, ThemeAttribute, ThemeSource};
pub use types::{Antialiasing, RendererConfig, ScrollSettings};
pub use winit::dpi::{LogicalSize, PhysicalSize};

/// Opens the hero window described by `config` and blocks until it closes.
pub fn run(config: RendererConfig) -> anyhow::Result<()> {
    window::run(config)
}
