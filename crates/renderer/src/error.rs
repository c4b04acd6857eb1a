use std::fmt;

/// Which stage of the program a shader belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub(crate) fn naga_stage(self) -> wgpu::naga::ShaderStage {
        match self {
            ShaderKind::Vertex => wgpu::naga::ShaderStage::Vertex,
            ShaderKind::Fragment => wgpu::naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderKind::Vertex => f.write_str("vertex"),
            ShaderKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Start-up failures. Every variant is terminal for the session: the hero
/// either runs the full procedural pipeline or the static fallback.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("no GPU context available: {0}")]
    ContextUnavailable(String),
    #[error("{stage} shader failed to compile:\n{log}")]
    CompileFailure { stage: ShaderKind, log: String },
    #[error("shader program failed to link:\n{log}")]
    LinkFailure { log: String },
    #[error("host surface is missing")]
    MissingSurface,
}

impl RenderError {
    /// Whether the failure should paint the fallback background.
    pub fn engages_fallback(&self) -> bool {
        !matches!(self, RenderError::MissingSurface)
    }
}

/// Per-frame failure reported by a GPU backend.
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

impl DrawError {
    pub fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            DrawError::Surface(err) => Some(err),
        }
    }
}
