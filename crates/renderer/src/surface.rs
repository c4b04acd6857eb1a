use winit::dpi::{LogicalSize, PhysicalSize};

/// Highest device pixel ratio the surface is rendered at.
pub const MAX_DEVICE_PIXEL_RATIO: f64 = 2.0;

/// Owns the physical pixel dimensions of the drawable surface.
///
/// The layout size comes from the host in logical units; the backing buffer
/// is sized at `floor(logical × dpr)` with the ratio capped at
/// [`MAX_DEVICE_PIXEL_RATIO`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceManager {
    device_pixel_ratio: f64,
    physical: PhysicalSize<u32>,
}

impl SurfaceManager {
    pub fn new(layout: LogicalSize<f64>, device_pixel_ratio: f64) -> Self {
        let mut manager = Self {
            device_pixel_ratio: 1.0,
            physical: PhysicalSize::new(0, 0),
        };
        manager.resize(layout, device_pixel_ratio);
        manager
    }

    /// Recomputes the buffer size and returns it.
    pub fn resize(
        &mut self,
        layout: LogicalSize<f64>,
        device_pixel_ratio: f64,
    ) -> PhysicalSize<u32> {
        let dpr = effective_pixel_ratio(device_pixel_ratio);
        let physical = PhysicalSize::new(
            scaled_dimension(layout.width, dpr),
            scaled_dimension(layout.height, dpr),
        );
        if physical != self.physical {
            tracing::debug!(
                width = physical.width,
                height = physical.height,
                dpr,
                "resized drawable surface"
            );
        }
        self.device_pixel_ratio = dpr;
        self.physical = physical;
        physical
    }

    pub fn physical_size(&self) -> PhysicalSize<u32> {
        self.physical
    }

    /// Ratio actually applied after clamping.
    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Whether the buffer has no pixels; draws are skipped in that case.
    pub fn is_empty(&self) -> bool {
        self.physical.width == 0 || self.physical.height == 0
    }

    /// `[width, height]` as written to the `resolution` uniform.
    pub fn resolution(&self) -> [f32; 2] {
        [self.physical.width as f32, self.physical.height as f32]
    }
}

fn effective_pixel_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio.min(MAX_DEVICE_PIXEL_RATIO)
    } else {
        1.0
    }
}

/// Slack for hosts that derive the logical size from a physical one; the
/// division and the multiplication back can land a hair under an integer.
const ROUND_TRIP_EPSILON: f64 = 1e-6;

fn scaled_dimension(logical: f64, dpr: f64) -> u32 {
    let scaled = (logical * dpr + ROUND_TRIP_EPSILON).floor();
    if scaled.is_finite() && scaled > 0.0 {
        scaled.min(u32::MAX as f64) as u32
    } else {
        0
    }
}
