use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::{Error, Result};

/// Label text used when the caller does not supply one
pub const DEFAULT_LABEL_TEXT: &str = "Made in China";
/// Anchor name used when the caller does not supply one
pub const DEFAULT_POSITION: &str = "top-right";
/// Default font size in points
pub const DEFAULT_FONT_SIZE: u32 = 8;
/// Default label color
pub const DEFAULT_COLOR: &str = "#FF0000";

/// Accepted font sizes (points)
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 6..=20;
/// Accepted horizontal/vertical nudges (points)
pub const OFFSET_RANGE: RangeInclusive<i32> = -50..=50;

/// 50 MiB
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Fill color for the label, each channel in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn red() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Parse `#RRGGBB` (the `#` is optional).
    ///
    /// Anything other than exactly six hex digits is an [`Error::Encoding`].
    pub fn from_hex(value: &str) -> Result<Self> {
        let digits = value.strip_prefix('#').unwrap_or(value);

        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Encoding(format!(
                "color must be 6 hex digits, got {value:?}"
            )));
        }

        let channel = |range: std::ops::Range<usize>| -> Result<f32> {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| f32::from(v) / 255.0)
                .map_err(|e| Error::Encoding(format!("invalid color {value:?}: {e}")))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::red()
    }
}

/// Label settings applied when a request leaves a field out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDefaults {
    #[serde(default = "default_text")]
    pub text: String,

    #[serde(default = "default_position")]
    pub position: String,

    #[serde(default = "default_font_size")]
    pub font_size: u32,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub x_offset: i32,

    #[serde(default)]
    pub y_offset: i32,
}

fn default_text() -> String {
    DEFAULT_LABEL_TEXT.to_string()
}

fn default_position() -> String {
    DEFAULT_POSITION.to_string()
}

const fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Default for LabelDefaults {
    fn default() -> Self {
        Self {
            text: default_text(),
            position: default_position(),
            font_size: default_font_size(),
            color: default_color(),
            x_offset: 0,
            y_offset: 0,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upper bound on a whole upload request, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Defaults for omitted label fields
    #[serde(default)]
    pub label: LabelDefaults,
}

const fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            label: LabelDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))
    }

    /// Load from default locations (~/.config/pdf-labeler/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-labeler").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }
}
