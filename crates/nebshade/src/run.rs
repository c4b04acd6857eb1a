//! Interactive mode: resolves CLI flags over the configuration file into a
//! [`RendererConfig`] and hands it to the window host.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use heroconfig::{AntialiasSetting, HeroConfig, ThemeSetting, WindowSize};
use renderer::{Antialiasing, LogicalSize, RendererConfig, ScrollSettings, ShaderSources, Theme};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;

const DEFAULT_FILTER: &str =
    "warn,nebshade=info,renderer=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";

pub const DEFAULT_SIZE: WindowSize = WindowSize {
    width: 1280,
    height: 720,
};

pub fn run(config: &HeroConfig, args: RunArgs) -> Result<()> {
    let renderer_config = renderer_config(config, args)?;
    tracing::info!(
        size = %format!("{}x{}", renderer_config.window_size.width, renderer_config.window_size.height),
        fps = ?renderer_config.target_fps,
        antialias = %renderer_config.antialiasing,
        theme = %renderer_config.initial_theme,
        "starting nebshade"
    );
    renderer::run(renderer_config)
}

/// `RUST_LOG` wins over the configured filter, which wins over the default.
pub fn initialise_tracing(configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        configured
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn renderer_config(config: &HeroConfig, args: RunArgs) -> Result<RendererConfig> {
    let defaults = RendererConfig::default();
    let size = args.size.or(config.window.size).unwrap_or(DEFAULT_SIZE);
    let target_fps = match args.fps {
        Some(fps) if fps > 0.0 => Some(fps),
        Some(_) => None,
        None => config.fps_cap(),
    };
    let antialiasing = args
        .antialias
        .or_else(|| config.render.antialias.map(antialiasing_from_setting))
        .unwrap_or_default();
    let initial_theme = args
        .theme
        .or_else(|| config.theme.initial.map(theme_from_setting))
        .unwrap_or_default();
    let sources = match args.fragment.as_deref() {
        Some(path) => load_fragment(path)?,
        None => ShaderSources::embedded(),
    };

    Ok(RendererConfig {
        title: config.window.title.clone().unwrap_or(defaults.title),
        window_size: LogicalSize::new(f64::from(size.width), f64::from(size.height)),
        target_fps,
        antialiasing,
        initial_theme,
        sources,
        scroll: ScrollSettings {
            line_height: config.scroll.line_height,
            page_height: config.scroll.page_height,
        },
    })
}

pub fn load_fragment(path: &Path) -> Result<ShaderSources> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read fragment shader {}", path.display()))?;
    tracing::info!(path = %path.display(), "using fragment shader override");
    Ok(ShaderSources::with_fragment(source))
}

pub fn antialiasing_from_setting(setting: AntialiasSetting) -> Antialiasing {
    match setting.samples() {
        None => Antialiasing::Auto,
        Some(1) => Antialiasing::Off,
        Some(samples) => Antialiasing::Samples(samples),
    }
}

pub fn theme_from_setting(setting: ThemeSetting) -> Theme {
    match setting {
        ThemeSetting::Dark => Theme::Dark,
        ThemeSetting::Light => Theme::Light,
    }
}
