use std::path::PathBuf;

use clap::{Parser, Subcommand};
use heroconfig::WindowSize;
use renderer::{Antialiasing, Theme};

#[derive(Parser, Debug)]
#[command(
    name = "nebshade",
    author,
    version,
    about = "Animated procedural hero background",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Configuration file (defaults to `<config_dir>/nebshade/config.toml`).
    #[arg(long, value_name = "FILE", global = true, env = "NEBSHADE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Logical window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<WindowSize>,

    /// Optional FPS cap (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Initial document theme: `dark` or `light`.
    #[arg(long, value_name = "THEME", value_parser = parse_theme)]
    pub theme: Option<Theme>,

    /// Replace the built-in fragment shader with the GLSL file at PATH.
    #[arg(long, value_name = "PATH")]
    pub fragment: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the window and mount the hero background (the default).
    Run(RunArgs),
    /// Evaluate one frame on the CPU and write it as a PNG.
    Still(StillArgs),
    /// Compile and link the shader program without a GPU.
    Check(CheckArgs),
    /// Rasterise the static fallback background to a PNG.
    Fallback(FallbackArgs),
}

#[derive(Parser, Debug)]
pub struct StillArgs {
    /// Destination PNG path.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,

    /// Shader time in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub time: f32,

    /// Image size in pixels (defaults to the configured window size).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<WindowSize>,

    /// Theme to render: `dark` or `light`.
    #[arg(long, value_name = "THEME", value_parser = parse_theme)]
    pub theme: Option<Theme>,

    /// Normalised pointer position, bottom-left origin (e.g. `0.5,0.5`).
    #[arg(long, value_name = "X,Y", value_parser = parse_mouse, default_value = "0.5,0.5")]
    pub mouse: [f32; 2],

    /// Scroll progress in viewport heights.
    #[arg(long, value_name = "PROGRESS", default_value_t = 0.0)]
    pub scroll: f32,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Check this fragment shader instead of the built-in one.
    #[arg(long, value_name = "PATH")]
    pub fragment: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct FallbackArgs {
    /// Destination PNG path.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,

    /// Image size in pixels (defaults to the configured window size).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<WindowSize>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<WindowSize, String> {
    value.parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    if value.trim().is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    value.parse().map_err(|err| format!("{err}"))
}

pub fn parse_theme(value: &str) -> Result<Theme, String> {
    value.parse().map_err(|err| format!("{err}"))
}

pub fn parse_mouse(value: &str) -> Result<[f32; 2], String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| "expected X,Y".to_string())?;
    let x = x
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid pointer x in '{value}'"))?;
    let y = y
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid pointer y in '{value}'"))?;
    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        return Err("pointer coordinates must be within 0..1".into());
    }
    Ok([x, y])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pointer_positions() {
        assert_eq!(parse_mouse("0.25, 0.75").unwrap(), [0.25, 0.75]);
        assert!(parse_mouse("0.25").is_err());
        assert!(parse_mouse("1.5,0.5").is_err());
    }

    #[test]
    fn defaults_to_run_without_subcommand() {
        let cli = Cli::try_parse_from(["nebshade", "--theme", "light", "--fps", "30"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.theme, Some(Theme::Light));
        assert_eq!(cli.run.fps, Some(30.0));
    }

    #[test]
    fn parses_still_subcommand() {
        let cli = Cli::try_parse_from([
            "nebshade", "still", "--output", "frame.png", "--size", "64x32", "--mouse", "0,1",
        ])
        .unwrap();
        let Some(Command::Still(args)) = cli.command else {
            panic!("expected still subcommand");
        };
        assert_eq!(args.output, PathBuf::from("frame.png"));
        assert_eq!(
            args.size,
            Some(WindowSize {
                width: 64,
                height: 32
            })
        );
        assert_eq!(args.mouse, [0.0, 1.0]);
        assert_eq!(args.time, 0.0);
    }

    #[test]
    fn rejects_bad_antialias() {
        assert!(Cli::try_parse_from(["nebshade", "--antialias", "3"]).is_err());
        assert!(Cli::try_parse_from(["nebshade", "--antialias", ""]).is_err());
    }
}
