//! Recording doubles for the GPU and host seams.

use std::cell::RefCell;
use std::rc::Rc;

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::backend::{GpuBackend, HostSurface};
use crate::error::{DrawError, RenderError};
use crate::fallback::FallbackBackground;
use crate::input::InputSender;
use crate::program::{LinkedProgram, UniformBlock};

#[derive(Debug, Default)]
pub(crate) struct BackendLog {
    pub configured: Vec<PhysicalSize<u32>>,
    pub installs: usize,
    pub uploads: Vec<Vec<u8>>,
    pub draws: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingBackend {
    pub log: Rc<RefCell<BackendLog>>,
    pub fail_install: Option<RenderError>,
    pub fail_draw: bool,
}

impl GpuBackend for RecordingBackend {
    fn configure(&mut self, size: PhysicalSize<u32>) {
        self.log.borrow_mut().configured.push(size);
    }

    fn install_program(&mut self, _program: &LinkedProgram) -> Result<(), RenderError> {
        if let Some(err) = self.fail_install.clone() {
            return Err(err);
        }
        self.log.borrow_mut().installs += 1;
        Ok(())
    }

    fn upload_uniforms(&mut self, block: &UniformBlock) {
        self.log.borrow_mut().uploads.push(block.as_bytes().to_vec());
    }

    fn draw(&mut self) -> Result<(), DrawError> {
        if self.fail_draw {
            return Err(DrawError::Surface(wgpu::SurfaceError::Timeout));
        }
        self.log.borrow_mut().draws += 1;
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct RecordingHost {
    pub layout: LogicalSize<f64>,
    pub dpr: f64,
    pub fallbacks: Vec<String>,
    pub subscribers: Vec<InputSender>,
}

impl RecordingHost {
    pub fn new(width: f64, height: f64, dpr: f64) -> Self {
        Self {
            layout: LogicalSize::new(width, height),
            dpr,
            fallbacks: Vec::new(),
            subscribers: Vec::new(),
        }
    }
}

impl HostSurface for RecordingHost {
    fn layout_size(&self) -> LogicalSize<f64> {
        self.layout
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }

    fn apply_fallback(&mut self, background: &FallbackBackground) {
        self.fallbacks.push(background.css());
    }

    fn subscribe_input(&mut self, sender: InputSender) {
        self.subscribers.push(sender);
    }
}
