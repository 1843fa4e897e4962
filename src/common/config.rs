//! Configuration loading and validation.
//!
//! Settings live in a TOML file under the user's config directory, e.g.
//!
//! ```toml
//! [activation]
//! hotkey = ["control", "space"]
//! alphabet = "ASDFGHJKL"
//!
//! [overlay]
//! font_size = 42.0
//! opacity = 0.3
//! ```
//!
//! A missing file means defaults; a malformed one is a hard error.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::common::collections::HashSet;
use crate::labels::LabelAlphabet;
use crate::sys::keycode::KeyCode;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown key name {0:?} in hotkey")]
    UnknownKey(String),
    #[error("hotkey must name at least one key")]
    EmptyHotkey,
    #[error("alphabet character {0:?} has no key mapping")]
    UntypeableAlphabet(char),
    #[error("alphabet character {0:?} appears more than once")]
    DuplicateAlphabet(char),
}

/// Raw file contents before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConfigFile {
    pub activation: ActivationSettings,
    pub overlay: OverlaySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ActivationSettings {
    /// Key names forming the hotkey chord; all must be held at once.
    pub hotkey: Vec<String>,
    /// Characters used to spell window labels, in assignment order.
    pub alphabet: String,
}

impl Default for ActivationSettings {
    fn default() -> Self {
        ActivationSettings {
            hotkey: vec!["control".to_string(), "space".to_string()],
            alphabet: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OverlaySettings {
    pub font_family: String,
    pub font_size: f64,
    /// `#RRGGBB`.
    pub border_color: String,
    pub border_width: f64,
    /// Background opacity of the overlay box, 0.0..=1.0.
    pub opacity: f64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        OverlaySettings {
            font_family: "Menlo".to_string(),
            font_size: 42.0,
            border_color: "#4F9CF9".to_string(),
            border_width: 3.0,
            opacity: 0.3,
        }
    }
}

impl OverlaySettings {
    /// Border color as normalized rgb components, or `None` when the
    /// configured string is not `#RRGGBB`.
    pub fn border_rgb(&self) -> Option<(f64, f64, f64)> {
        let hex = self.border_color.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some((r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0))
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub hotkey: HashSet<KeyCode>,
    pub alphabet: LabelAlphabet,
    pub overlay: OverlaySettings,
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("keyhop").join("keyhop.toml"))
}

impl Config {
    /// Loads from `override_path` when given (the file must exist), else
    /// from the default location, else falls back to defaults.
    pub fn load(override_path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match override_path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("no configuration file found; using defaults");
                    return Config::resolve(ConfigFile::default());
                }
            },
        };
        let text = fs::read_to_string(&path)
            .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        Config::parse(&text, &path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Config, ConfigError> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        Config::resolve(file)
    }

    fn resolve(file: ConfigFile) -> Result<Config, ConfigError> {
        if file.activation.hotkey.is_empty() {
            return Err(ConfigError::EmptyHotkey);
        }
        let mut hotkey = HashSet::default();
        for name in &file.activation.hotkey {
            let key = KeyCode::from_str(name)
                .map_err(|_| ConfigError::UnknownKey(name.clone()))?;
            hotkey.insert(key);
        }

        let letters: Vec<char> = file
            .activation
            .alphabet
            .chars()
            .map(|ch| ch.to_ascii_uppercase())
            .collect();
        let mut seen = HashSet::default();
        for &ch in &letters {
            if KeyCode::for_label_char(ch).is_none() {
                return Err(ConfigError::UntypeableAlphabet(ch));
            }
            if !seen.insert(ch) {
                return Err(ConfigError::DuplicateAlphabet(ch));
            }
        }
        if letters.len() == 1 {
            warn!("alphabet needs at least two characters; using the default");
        }

        Ok(Config {
            hotkey,
            alphabet: LabelAlphabet::new(letters),
            overlay: file.overlay,
        })
    }
}
