//! PNG export of a single CPU-evaluated frame and of the static fallback.

use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec2;
use heroconfig::{HeroConfig, WindowSize};
use image::RgbaImage;
use renderer::input::SCROLL_CEILING;
use renderer::shading::{self, ShadingInputs};
use renderer::FallbackBackground;

use crate::cli::{FallbackArgs, StillArgs};
use crate::run::{theme_from_setting, DEFAULT_SIZE};

pub fn still(config: &HeroConfig, args: StillArgs) -> Result<()> {
    let size = export_size(config, args.size);
    let theme = args
        .theme
        .or_else(|| config.theme.initial.map(theme_from_setting))
        .unwrap_or_default();
    let inputs = ShadingInputs {
        time: args.time,
        resolution: Vec2::new(size.width as f32, size.height as f32),
        mouse: Vec2::from(args.mouse),
        scroll: args.scroll.clamp(0.0, SCROLL_CEILING),
        theme: theme.scalar(),
    };

    tracing::info!(
        size = %size,
        time = inputs.time,
        theme = %theme,
        "rendering still frame"
    );
    let image = shading::render_frame(&inputs, size.width, size.height);
    save(&image, &args.output)?;
    println!("{}", args.output.display());
    Ok(())
}

pub fn fallback(config: &HeroConfig, args: FallbackArgs) -> Result<()> {
    let size = export_size(config, args.size);
    let background = FallbackBackground::hero();
    let image = background.rasterize(size.width, size.height);
    save(&image, &args.output)?;
    println!("{background}");
    Ok(())
}

fn export_size(config: &HeroConfig, requested: Option<WindowSize>) -> WindowSize {
    requested.or(config.window.size).unwrap_or(DEFAULT_SIZE)
}

fn save(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote png");
    Ok(())
}
