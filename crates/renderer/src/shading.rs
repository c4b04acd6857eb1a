//! CPU reference of the hero fragment shader.
//!
//! Mirrors `shaders/hero.frag` step for step so frames can be evaluated
//! without a GPU (still export, tests). Everything here is a pure function
//! of its inputs.

use glam::{Vec2, Vec3, Vec4};
use image::{Rgba, RgbaImage};

const SIMPLEX_C: Vec4 = Vec4::new(
    0.211_324_865_405,
    0.366_025_403_784,
    -0.577_350_269_189,
    0.024_390_243_902,
);

const DARK_PALETTE: [Vec3; 5] = [
    Vec3::new(0.02, 0.03, 0.06),
    Vec3::new(0.06, 0.10, 0.16),
    Vec3::new(0.10, 0.22, 0.30),
    Vec3::new(0.20, 0.42, 0.55),
    Vec3::new(0.35, 0.55, 0.70),
];

const LIGHT_PALETTE: [Vec3; 5] = [
    Vec3::new(0.96, 0.97, 0.98),
    Vec3::new(0.92, 0.94, 0.97),
    Vec3::new(0.82, 0.87, 0.94),
    Vec3::new(0.68, 0.78, 0.88),
    Vec3::new(0.55, 0.68, 0.82),
];

/// Animation speed applied to the `time` uniform.
const TIME_SCALE: f32 = 0.18;

/// Base radius of the pointer-following metaball, before its wobble.
const PRIMARY_RADIUS: f32 = 0.22;

/// Radii of the four orbiting metaballs: two around the pointer, two around the origin.
const ORBIT_RADII: [f32; 4] = [0.18, 0.16, 0.14, 0.12];

/// Field strengths mapped to `0` and `1` by the blob threshold.
const BLOB_EDGES: (f32, f32) = (0.9, 2.2);

/// Brightness lost per viewport height scrolled.
const SCROLL_DIMMING: f32 = 0.18;

/// Uniform values for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingInputs {
    pub time: f32,
    pub resolution: Vec2,
    pub mouse: Vec2,
    pub scroll: f32,
    pub theme: f32,
}

impl Default for ShadingInputs {
    fn default() -> Self {
        Self {
            time: 0.0,
            resolution: Vec2::new(1.0, 1.0),
            mouse: Vec2::splat(0.5),
            scroll: 0.0,
            theme: 0.0,
        }
    }
}

/// Colour of the pixel at `frag_coord` (bottom-left origin), each channel in `[0, 1]`.
pub fn shade(frag_coord: Vec2, inputs: &ShadingInputs) -> Vec3 {
    let resolution = inputs.resolution;
    let uv = frag_coord / resolution;
    let aspect = resolution.x / resolution.y;
    let aspect_scale = Vec2::new(aspect, 1.0);
    let p = (uv - 0.5) * aspect_scale;

    let t = inputs.time * TIME_SCALE;
    let m_pos = (inputs.mouse - 0.5) * aspect_scale;
    let scroll = inputs.scroll;

    let mut meta = 0.0;
    meta += metaball(p, m_pos * 0.6, PRIMARY_RADIUS + 0.04 * (t * 1.2).sin());
    meta += metaball(
        p,
        m_pos * 0.3 + 0.35 * Vec2::new((t * 0.7).cos(), (t * 0.9).sin()),
        ORBIT_RADII[0],
    );
    meta += metaball(
        p,
        m_pos * 0.2 + 0.4 * Vec2::new((t * 0.5 + 1.5).sin(), (t * 0.6 + 2.0).cos()),
        ORBIT_RADII[1],
    );
    meta += metaball(
        p,
        Vec2::new((t * 0.3).sin() * 0.5, (t * 0.4).cos() * 0.35),
        ORBIT_RADII[2],
    );
    meta += metaball(
        p,
        Vec2::new((t * 0.25 + 3.0).cos() * 0.6, (t * 0.35 + 1.0).sin() * 0.4),
        ORBIT_RADII[3],
    );
    let blob = smoothstep(BLOB_EDGES.0, BLOB_EDGES.1, meta);

    let warp_p = p * 1.8 + scroll * 0.15;
    let warp1 = warped_fbm(warp_p, t);
    let warp2 = warped_fbm(warp_p * 0.7 + 3.0, t * 0.8);
    let flow = (warp1 * 0.6 + warp2 * 0.4) * 0.5 + 0.5;

    let mut aurora = 0.0;
    for i in 0..3 {
        let fi = i as f32;
        let offset = fi * 0.4 + scroll * 0.1;
        let wave = (p.x * (2.5 + fi * 0.8)
            + t * (0.4 + fi * 0.15)
            + snoise(p * 1.5 + t * 0.1) * 1.5)
            .sin();
        let streak = smoothstep(0.12, 0.0, (p.y - wave * 0.25 - offset + 0.1).abs());
        aurora += streak * (0.3 - fi * 0.08);
    }
    aurora *= smoothstep(0.0, 0.3, 1.0 - p.y.abs());

    let [c1, c2, c3, c4, c5] = palette(inputs.theme);

    let mut color = mix(c1, c2, flow);
    color = mix(color, c3, smoothstep(0.3, 0.7, flow + blob * 0.3));
    color = mix(color, c4, blob * 0.55);
    color = mix(color, c5, blob * blob * 0.3);

    let aurora_color = mix(c4, c5, 0.5 + 0.5 * (t * 0.3).sin());
    color += aurora_color * aurora * (0.25 + blob * 0.15);

    let cursor_glow = smoothstep(0.6, 0.0, (p - m_pos * 0.6).length());
    color = mix(color, c5, cursor_glow * 0.12);

    let grain = (snoise(frag_coord * 0.8) * 0.5 + 0.5) * 0.025;
    color += Vec3::splat(grain - 0.0125);

    color *= smoothstep(1.3, 0.25, p.length());
    color *= 1.0 - scroll * SCROLL_DIMMING;

    color.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Evaluates a whole frame into an image. Row 0 is the top of the image;
/// `inputs.resolution` is replaced by `width × height`.
pub fn render_frame(inputs: &ShadingInputs, width: u32, height: u32) -> RgbaImage {
    let inputs = ShadingInputs {
        resolution: Vec2::new(width.max(1) as f32, height.max(1) as f32),
        ..*inputs
    };
    RgbaImage::from_fn(width, height, |x, row| {
        let frag_coord = Vec2::new(x as f32 + 0.5, (height - row) as f32 - 0.5);
        let color = shade(frag_coord, &inputs);
        Rgba([to_byte(color.x), to_byte(color.y), to_byte(color.z), 255])
    })
}

/// Theme-blended palette stops, darkest first.
pub fn palette(theme: f32) -> [Vec3; 5] {
    std::array::from_fn(|i| mix(DARK_PALETTE[i], LIGHT_PALETTE[i], theme))
}

/// 2-D simplex noise over the `mod 289` permutation polynomial, roughly in `[-1, 1]`.
pub fn snoise(v: Vec2) -> f32 {
    let c = SIMPLEX_C;
    let mut i = (v + v.dot(Vec2::splat(c.y))).floor();
    let x0 = v - i + i.dot(Vec2::splat(c.x));
    let i1 = if x0.x > x0.y {
        Vec2::new(1.0, 0.0)
    } else {
        Vec2::new(0.0, 1.0)
    };
    let x1 = x0 + c.x - i1;
    let x2 = x0 + c.z;

    i = mod289_2(i);
    let p = permute(
        permute(i.y + Vec3::new(0.0, i1.y, 1.0)) + i.x + Vec3::new(0.0, i1.x, 1.0),
    );

    let mut m = (Vec3::splat(0.5) - Vec3::new(x0.dot(x0), x1.dot(x1), x2.dot(x2))).max(Vec3::ZERO);
    m = m * m;
    m = m * m;

    let x = 2.0 * fract(p * c.w) - 1.0;
    let h = x.abs() - 0.5;
    let ox = (x + 0.5).floor();
    let a0 = x - ox;
    m *= 1.792_842_914_001_59 - 0.853_734_720_953_14 * (a0 * a0 + h * h);

    let g = Vec3::new(
        a0.x * x0.x + h.x * x0.y,
        a0.y * x1.x + h.y * x1.y,
        a0.z * x2.x + h.z * x2.y,
    );
    130.0 * m.dot(g)
}

/// Two layers of domain warping over simplex noise.
pub fn warped_fbm(p: Vec2, t: f32) -> f32 {
    let q = Vec2::new(
        snoise(p + Vec2::new(0.0, 0.0) + t * 0.15),
        snoise(p + Vec2::new(5.2, 1.3) - t * 0.12),
    );
    let r = Vec2::new(
        snoise(p + 3.8 * q + Vec2::new(1.7, 9.2) + t * 0.08),
        snoise(p + 3.8 * q + Vec2::new(8.3, 2.8) - t * 0.1),
    );
    snoise(p + 3.2 * r)
}

pub fn metaball(p: Vec2, center: Vec2, radius: f32) -> f32 {
    let d = (p - center).length();
    radius * radius / (d * d + 0.001)
}

/// GLSL `smoothstep`, including the reversed-edge form used for fades.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// GLSL `mix`.
pub fn mix(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

// GLSL fract (x - floor(x)); glam's `fract` truncates toward zero instead.
fn fract(x: Vec3) -> Vec3 {
    x - x.floor()
}

fn mod289_3(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn mod289_2(x: Vec2) -> Vec2 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute(x: Vec3) -> Vec3 {
    mod289_3((x * 34.0 + 1.0) * x)
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}
