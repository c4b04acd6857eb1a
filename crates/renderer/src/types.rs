use std::fmt;
use std::str::FromStr;

use winit::dpi::LogicalSize;

use crate::program::ShaderSources;
use crate::theme::Theme;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl fmt::Display for Antialiasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Antialiasing::Auto => f.write_str("auto"),
            Antialiasing::Off => f.write_str("off"),
            Antialiasing::Samples(count) => write!(f, "{count}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid antialias setting '{0}' (expected auto, off, or 1/2/4/8/16)")]
pub struct ParseAntialiasingError(String);

impl FromStr for Antialiasing {
    type Err = ParseAntialiasingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "auto" | "max" => Ok(Antialiasing::Auto),
            "off" | "none" | "0" => Ok(Antialiasing::Off),
            other => match other.parse::<u32>() {
                Ok(1) => Ok(Antialiasing::Off),
                Ok(count @ (2 | 4 | 8 | 16)) => Ok(Antialiasing::Samples(count)),
                _ => Err(ParseAntialiasingError(trimmed.to_string())),
            },
        }
    }
}

/// Mapping from mouse-wheel input to the virtual page scroll offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSettings {
    /// Logical pixels scrolled per wheel line.
    pub line_height: f64,
    /// Length of the virtual page in viewport heights.
    pub page_height: f64,
}

impl ScrollSettings {
    /// Applies a wheel delta (positive = up, as winit reports it) to `offset`.
    pub fn scroll_by(&self, offset: f64, delta_y: f64, viewport_height: f64) -> f64 {
        let max = ((self.page_height - 1.0) * viewport_height).max(0.0);
        (offset - delta_y).clamp(0.0, max)
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            line_height: 48.0,
            page_height: 3.0,
        }
    }
}

/// Immutable configuration passed to the window host at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub title: String,
    /// Initial window size in logical pixels.
    pub window_size: LogicalSize<f64>,
    /// Optional FPS cap; `None` renders every vsync.
    pub target_fps: Option<f32>,
    pub antialiasing: Antialiasing,
    pub initial_theme: Theme,
    pub sources: ShaderSources,
    pub scroll: ScrollSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "nebshade".to_string(),
            window_size: LogicalSize::new(1280.0, 720.0),
            target_fps: None,
            antialiasing: Antialiasing::default(),
            initial_theme: Theme::default(),
            sources: ShaderSources::embedded(),
            scroll: ScrollSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_antialias_settings() {
        assert_eq!("auto".parse(), Ok(Antialiasing::Auto));
        assert_eq!("OFF".parse(), Ok(Antialiasing::Off));
        assert_eq!("1".parse(), Ok(Antialiasing::Off));
        assert_eq!("4".parse(), Ok(Antialiasing::Samples(4)));
        assert!("3".parse::<Antialiasing>().is_err());
        assert!("lots".parse::<Antialiasing>().is_err());
    }

    #[test]
    fn wheel_scroll_is_bounded_by_page() {
        let scroll = ScrollSettings::default();
        // Scrolling up at the top stays at zero.
        assert_eq!(scroll.scroll_by(0.0, 48.0, 600.0), 0.0);
        // Scrolling down moves the page.
        assert_eq!(scroll.scroll_by(0.0, -96.0, 600.0), 96.0);
        // The page ends two viewports down.
        assert_eq!(scroll.scroll_by(1150.0, -480.0, 600.0), 1200.0);
    }
}
