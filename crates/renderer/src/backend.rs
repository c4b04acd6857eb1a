//! Seams between the core and the outside world.
//!
//! The render loop only speaks to the GPU through [`GpuBackend`] and to the
//! page/window through [`HostSurface`], which keeps the lifecycle testable
//! with recording doubles and lets the `wgpu` and `winit` pieces live in
//! their own modules.

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::error::{DrawError, RenderError};
use crate::fallback::FallbackBackground;
use crate::input::InputSender;
use crate::program::{LinkedProgram, UniformBlock};

/// GPU operations the core needs.
pub trait GpuBackend {
    /// Sizes the drawable buffer and sets the viewport to `(0, 0, w, h)`.
    /// A zero-area size must be accepted; later draws then do nothing.
    fn configure(&mut self, size: PhysicalSize<u32>);

    /// Creates the pipeline, quad buffer and uniform storage for `program`.
    fn install_program(&mut self, program: &LinkedProgram) -> Result<(), RenderError>;

    /// Copies the staged uniform block to the GPU.
    fn upload_uniforms(&mut self, block: &UniformBlock);

    /// Draws the 4-vertex full-screen triangle strip and presents it.
    fn draw(&mut self) -> Result<(), DrawError>;
}

impl<B: GpuBackend + ?Sized> GpuBackend for Box<B> {
    fn configure(&mut self, size: PhysicalSize<u32>) {
        (**self).configure(size)
    }

    fn install_program(&mut self, program: &LinkedProgram) -> Result<(), RenderError> {
        (**self).install_program(program)
    }

    fn upload_uniforms(&mut self, block: &UniformBlock) {
        (**self).upload_uniforms(block)
    }

    fn draw(&mut self) -> Result<(), DrawError> {
        (**self).draw()
    }
}

/// The surface the hero is mounted into.
pub trait HostSurface {
    /// Layout size in logical pixels.
    fn layout_size(&self) -> LogicalSize<f64>;

    /// Device pixel ratio (scale factor) of the display.
    fn device_pixel_ratio(&self) -> f64;

    /// Paints the static fallback. Called at most once per mount.
    fn apply_fallback(&mut self, background: &FallbackBackground);

    /// Hands the host the producer end of the input channel.
    fn subscribe_input(&mut self, sender: InputSender);
}
