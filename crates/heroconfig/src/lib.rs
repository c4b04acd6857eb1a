//! TOML configuration for nebshade.
//!
//! A file is optional. When one is named explicitly it must exist; the
//! per-user default (`<config_dir>/nebshade/config.toml`) is read only if
//! present. Every section and key may be omitted.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories_next::ProjectDirs;
use serde::de::{self, Deserializer};
use serde::Deserialize;

pub const ENV_CONFIG_DIR: &str = "NEBSHADE_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "config.toml";

const QUALIFIER: &str = "";
const ORGANISATION: &str = "";
const APPLICATION: &str = "nebshade";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HeroConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub theme: ThemeSection,
    #[serde(default)]
    pub scroll: ScrollSection,
    #[serde(default)]
    pub log: LogSection,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            window: WindowSection::default(),
            render: RenderSection::default(),
            theme: ThemeSection::default(),
            scroll: ScrollSection::default(),
            log: LogSection::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size_opt")]
    pub size: Option<WindowSize>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RenderSection {
    pub fps: Option<f32>,
    #[serde(default, deserialize_with = "deserialize_antialias_opt")]
    pub antialias: Option<AntialiasSetting>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThemeSection {
    pub initial: Option<ThemeSetting>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScrollSection {
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    #[serde(default = "default_page_height")]
    pub page_height: f64,
}

impl Default for ScrollSection {
    fn default() -> Self {
        Self {
            line_height: default_line_height(),
            page_height: default_page_height(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSetting {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    /// MSAA sample count, or `None` for `auto`.
    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

/// Logical window size, written `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for WindowSize {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        let (width, height) = normalized
            .split_once('x')
            .ok_or_else(|| format!("invalid size '{raw}' (expected WIDTHxHEIGHT)"))?;
        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in '{raw}'"))?;
        let height: u32 = height
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in '{raw}'"))?;
        if width == 0 || height == 0 {
            return Err(format!("size '{raw}' must be non-zero"));
        }
        Ok(Self { width, height })
    }
}

fn default_version() -> u32 {
    1
}

fn default_line_height() -> f64 {
    48.0
}

fn default_page_height() -> f64 {
    3.0
}

fn deserialize_size_opt<'de, D>(deserializer: D) -> Result<Option<WindowSize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|raw| raw.parse().map_err(de::Error::custom))
        .transpose()
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            let raw = value.to_string();
            Some(parse_antialias(&raw).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl HeroConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: HeroConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads `explicit` if given, otherwise the per-user default file if it
    /// exists, otherwise the built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            Some(path) => {
                tracing::debug!(path = %path.display(), "no configuration file; using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::invalid(
                "version",
                format!("unsupported config version {}; expected 1", self.version),
            ));
        }

        if let Some(title) = &self.window.title {
            if title.trim().is_empty() {
                return Err(ConfigError::invalid("window.title", "must not be empty"));
            }
        }

        if let Some(fps) = self.render.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::invalid("render.fps", "must be >= 0"));
            }
        }

        if !self.scroll.line_height.is_finite() || self.scroll.line_height <= 0.0 {
            return Err(ConfigError::invalid("scroll.line_height", "must be > 0"));
        }

        if !self.scroll.page_height.is_finite() || self.scroll.page_height < 1.0 {
            return Err(ConfigError::invalid("scroll.page_height", "must be >= 1"));
        }

        if let Some(filter) = &self.log.filter {
            if filter.trim().is_empty() {
                return Err(ConfigError::invalid("log.filter", "must not be empty"));
            }
        }

        Ok(())
    }

    /// The fps cap, with `0` meaning uncapped.
    pub fn fps_cap(&self) -> Option<f32> {
        self.render.fps.filter(|fps| *fps > 0.0)
    }
}

/// Directory holding the configuration file. `NEBSHADE_CONFIG_DIR` wins over
/// the platform default.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(ENV_CONFIG_DIR).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(value));
    }
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}
