//! `wgpu` backend: device acquisition, pipeline creation and per-frame draws.

mod context;
mod pipeline;
mod state;

pub use state::WgpuBackend;
