//! Static background shown when the procedural pipeline cannot run.
//!
//! The description is CSS-shaped (two radial glows over a solid base) so it
//! can be handed to a web host verbatim, and it can also be evaluated per
//! pixel for native hosts that paint it themselves.

use std::fmt;

use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};

/// A `radial-gradient(circle at X% Y%, rgba(..), transparent STOP%)` layer.
///
/// The circle uses the CSS default `farthest-corner` extent, and colour is
/// interpolated with premultiplied alpha, so the glow keeps its hue and only
/// its opacity falls off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialGlow {
    pub color: [u8; 3],
    pub alpha: f32,
    /// Centre in fractions of the surface size.
    pub center: [f32; 2],
    /// Distance to the transparent stop, as a fraction of the gradient ray.
    pub fade: f32,
}

impl RadialGlow {
    /// Opacity of the glow at `point` on a `size` surface.
    pub fn coverage(&self, point: Vec2, size: Vec2) -> f32 {
        let center = Vec2::from(self.center) * size;
        let ray = farthest_corner(center, size);
        let stop = ray * self.fade;
        if stop <= 0.0 {
            return 0.0;
        }
        let t = (point.distance(center) / stop).clamp(0.0, 1.0);
        self.alpha * (1.0 - t)
    }
}

/// Layered fallback background; the first glow paints on top.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackBackground {
    pub glows: Vec<RadialGlow>,
    pub base: [u8; 3],
}

impl FallbackBackground {
    /// The hero's fallback: a blue glow top-left and a teal glow bottom-right
    /// over near-black.
    pub fn hero() -> Self {
        Self {
            glows: vec![
                RadialGlow {
                    color: [103, 182, 255],
                    alpha: 0.18,
                    center: [0.2, 0.2],
                    fade: 0.45,
                },
                RadialGlow {
                    color: [128, 244, 210],
                    alpha: 0.15,
                    center: [0.8, 0.9],
                    fade: 0.42,
                },
            ],
            base: [0x0b, 0x0b, 0x0b],
        }
    }

    /// CSS `background` value.
    pub fn css(&self) -> String {
        let mut layers: Vec<String> = self
            .glows
            .iter()
            .map(|glow| {
                format!(
                    "radial-gradient(circle at {}% {}%, rgba({}, {}, {}, {}), transparent {}%)",
                    percent(glow.center[0]),
                    percent(glow.center[1]),
                    glow.color[0],
                    glow.color[1],
                    glow.color[2],
                    glow.alpha,
                    percent(glow.fade),
                )
            })
            .collect();
        layers.push(format!(
            "#{:02x}{:02x}{:02x}",
            self.base[0], self.base[1], self.base[2]
        ));
        layers.join(", ")
    }

    /// Colour at pixel `(x, y)` (top-left origin) of a `width × height` surface.
    pub fn sample(&self, x: f32, y: f32, width: f32, height: f32) -> [u8; 4] {
        let size = Vec2::new(width.max(1.0), height.max(1.0));
        let point = Vec2::new(x, y);
        let mut color = rgb(self.base);
        for glow in self.glows.iter().rev() {
            let alpha = glow.coverage(point, size);
            color = rgb(glow.color) * alpha + color * (1.0 - alpha);
        }
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [to_byte(color.x), to_byte(color.y), to_byte(color.z), 255]
    }

    /// Fills an opaque image, sampling at pixel centres.
    pub fn rasterize(&self, width: u32, height: u32) -> RgbaImage {
        let (w, h) = (width as f32, height as f32);
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba(self.sample(x as f32 + 0.5, y as f32 + 0.5, w, h))
        })
    }
}

impl Default for FallbackBackground {
    fn default() -> Self {
        Self::hero()
    }
}

impl fmt::Display for FallbackBackground {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css())
    }
}

fn farthest_corner(center: Vec2, size: Vec2) -> f32 {
    [
        Vec2::ZERO,
        Vec2::new(size.x, 0.0),
        Vec2::new(0.0, size.y),
        size,
    ]
    .into_iter()
    .map(|corner| corner.distance(center))
    .fold(0.0, f32::max)
}

fn percent(fraction: f32) -> String {
    format!("{}", (fraction * 100.0).round() as i32)
}

fn rgb(color: [u8; 3]) -> Vec3 {
    Vec3::new(color[0] as f32, color[1] as f32, color[2] as f32) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_matches_hero_declaration() {
        assert_eq!(
            FallbackBackground::hero().css(),
            "radial-gradient(circle at 20% 20%, rgba(103, 182, 255, 0.18), transparent 45%), \
             radial-gradient(circle at 80% 90%, rgba(128, 244, 210, 0.15), transparent 42%), \
             #0b0b0b"
        );
    }

    #[test]
    fn glow_centres_are_tinted() {
        let background = FallbackBackground::hero();
        let [r, g, b, a] = background.sample(200.0, 100.0, 1000.0, 500.0);
        assert_eq!(a, 255);
        // rgb(103,182,255) at 18% over #0b0b0b.
        assert_eq!([r, g, b], [28, 42, 55]);
        let [r, g, b, _] = background.sample(800.0, 450.0, 1000.0, 500.0);
        assert!(g > r && g > 11 && b > 11, "{r} {g} {b}");
    }

    #[test]
    fn far_from_glows_is_base_colour() {
        let background = FallbackBackground::hero();
        // Top-right corner lies outside both fade radii.
        assert_eq!(background.sample(999.5, 0.5, 1000.0, 1000.0), [11, 11, 11, 255]);
    }

    #[test]
    fn rasterize_is_opaque() {
        let image = FallbackBackground::hero().rasterize(40, 20);
        assert_eq!(image.dimensions(), (40, 20));
        assert!(image.pixels().all(|px| px.0[3] == 255));
        assert_eq!(image.get_pixel(8, 4).0, FallbackBackground::hero().sample(8.5, 4.5, 40.0, 20.0));
    }
}
