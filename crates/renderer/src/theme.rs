use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Document-level colour scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Maps the theme attribute: only `"light"` selects the light palette.
    pub fn from_attribute(attribute: Option<&str>) -> Self {
        match attribute {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    /// Value written to the `theme` uniform.
    pub fn scalar(self) -> f32 {
        match self {
            Theme::Dark => 0.0,
            Theme::Light => 1.0,
        }
    }

    pub fn as_attribute(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_attribute())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme '{0}' (expected 'light' or 'dark')")]
pub struct ParseThemeError(String);

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ParseThemeError(other.to_string())),
        }
    }
}

/// Collaborator that reports the current theme; read once per frame.
pub trait ThemeSource {
    fn theme(&self) -> Theme;
}

/// A theme that never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTheme(pub Theme);

impl ThemeSource for FixedTheme {
    fn theme(&self) -> Theme {
        self.0
    }
}

/// Shared, mutable theme attribute. Clones observe the same value, so the
/// host can flip it from an input handler while the loop reads it.
#[derive(Debug, Clone, Default)]
pub struct ThemeAttribute {
    value: Arc<Mutex<Option<String>>>,
}

impl ThemeAttribute {
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial.map(str::to_owned))),
        }
    }

    pub fn get(&self) -> Option<String> {
        match self.value.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, attribute: Option<&str>) {
        let mut guard = match self.value.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = attribute.map(str::to_owned);
    }

    /// Flips between light and dark and returns the new theme.
    pub fn toggle(&self) -> Theme {
        let next = self.theme().toggled();
        self.set(Some(next.as_attribute()));
        tracing::info!(theme = %next, "theme toggled");
        next
    }
}

impl ThemeSource for ThemeAttribute {
    fn theme(&self) -> Theme {
        Theme::from_attribute(self.get().as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_light_maps_to_one() {
        assert_eq!(Theme::from_attribute(Some("light")).scalar(), 1.0);
        assert_eq!(Theme::from_attribute(Some("dark")).scalar(), 0.0);
        assert_eq!(Theme::from_attribute(Some("Light")).scalar(), 0.0);
        assert_eq!(Theme::from_attribute(Some("")).scalar(), 0.0);
        assert_eq!(Theme::from_attribute(None).scalar(), 0.0);
    }

    #[test]
    fn attribute_is_shared_between_clones() {
        let attribute = ThemeAttribute::new(None);
        let reader = attribute.clone();
        assert_eq!(reader.theme(), Theme::Dark);
        assert_eq!(attribute.toggle(), Theme::Light);
        assert_eq!(reader.theme(), Theme::Light);
        assert_eq!(reader.get().as_deref(), Some("light"));
        attribute.toggle();
        assert_eq!(reader.theme(), Theme::Dark);
    }

    #[test]
    fn parses_cli_values() {
        assert_eq!("LIGHT".parse::<Theme>(), Ok(Theme::Light));
        assert_eq!(" dark ".parse::<Theme>(), Ok(Theme::Dark));
        assert!("sepia".parse::<Theme>().is_err());
    }
}
