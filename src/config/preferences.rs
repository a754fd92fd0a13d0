use crate::i18n::Language;
use log::{ info, warn };
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::fs;
use std::path::{ Path, PathBuf };
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Preferences file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Preferences JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Light,
    Dark,
    Contrast,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Theme::Default),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "contrast" => Ok(Theme::Contrast),
            _ => Err(format!("Unsupported theme: {}", s)),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::Default => "default",
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Contrast => "contrast",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Preferences {
    pub theme: Theme,
    pub language: Language,
}

// Stored values are kept as plain strings so that an unknown code in the
// file degrades to the default instead of failing the whole load.
#[derive(Deserialize, Default)]
struct StoredPreferences {
    theme: Option<String>,
    language: Option<String>,
}

impl From<StoredPreferences> for Preferences {
    fn from(stored: StoredPreferences) -> Self {
        Self {
            theme: stored.theme.and_then(|t| t.parse().ok()).unwrap_or_default(),
            language: Language::from_code_or_default(stored.language.as_deref()),
        }
    }
}

/// Theme and language persisted to a JSON file. A setter writes the file
/// first and only then updates the in-memory copy.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    current: Preferences,
}

impl PreferenceStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PreferenceError> {
        let path = path.as_ref().to_path_buf();
        let current = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Preferences::default()
            } else {
                let stored: StoredPreferences = serde_json::from_str(&text)?;
                stored.into()
            }
        } else {
            info!("No preferences file at {}, using defaults", path.display());
            Preferences::default()
        };
        Ok(Self { path, current })
    }

    /// Like `load`, but a corrupt file is replaced by defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    "Ignoring unreadable preferences file {}: {}",
                    path.as_ref().display(),
                    e
                );
                Self { path: path.as_ref().to_path_buf(), current: Preferences::default() }
            }
        }
    }

    pub fn get(&self) -> Preferences {
        self.current
    }

    pub fn language(&self) -> Language {
        self.current.language
    }

    pub fn theme(&self) -> Theme {
        self.current.theme
    }

    pub fn set_language(&mut self, language: Language) -> Result<(), PreferenceError> {
        self.persist(Preferences { language, ..self.current })
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), PreferenceError> {
        self.persist(Preferences { theme, ..self.current })
    }

    // `current` only changes once the file write succeeded.
    fn persist(&mut self, next: Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&next)?;
        fs::write(&self.path, json)?;
        self.current = next;
        Ok(())
    }
}
