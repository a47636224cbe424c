//! Configuration management
//!
//! Values are layered: compiled defaults (overridable at build time), then the TOML
//! file, then `XRANDR_SPLIT_*` environment variables. The result is fixed for the
//! lifetime of the process.

use crate::error::{Result, SplitError};
use crate::id::DEFAULT_TAG;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use x11::xlib::XID;

pub const DEFAULT_WIDTH: u32 = 3840;
pub const DEFAULT_HEIGHT: u32 = 1080;
pub const DEFAULT_REAL_LIBRARY: &str = "libXrandr.so.2";
/// Upper bound of outputs/CRTCs the RandR protocol lets a screen report here.
pub const MAX_ENTITIES: usize = 255;

pub const CONFIG_ENV: &str = "XRANDR_SPLIT_CONFIG";
pub const WIDTH_ENV: &str = "XRANDR_SPLIT_WIDTH";
pub const HEIGHT_ENV: &str = "XRANDR_SPLIT_HEIGHT";
pub const TAG_ENV: &str = "XRANDR_SPLIT_TAG";
pub const REAL_LIB_ENV: &str = "XRANDR_SPLIT_REAL_LIB";
pub const LOG_ENV: &str = "XRANDR_SPLIT_LOG";

/// The geometry that marks a CRTC as split-worthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SplitSignature {
    pub width: u32,
    pub height: u32,
}

impl Default for SplitSignature {
    fn default() -> Self {
        Self {
            width: build_default(option_env!("XRANDR_SPLIT_WIDTH"), DEFAULT_WIDTH),
            height: build_default(option_env!("XRANDR_SPLIT_HEIGHT"), DEFAULT_HEIGHT),
        }
    }
}

impl SplitSignature {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        width == self.width && height == self.height
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// flexi_logger spec string, `off` disables logging entirely.
    pub level: String,
    pub directory: PathBuf,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            directory: PathBuf::from("/tmp"),
            max_file_size: 10_000_000, // 10MB
            max_files: 3,
        }
    }
}

impl LoggingConfig {
    pub fn is_enabled(&self) -> bool {
        !self.level.trim().eq_ignore_ascii_case("off")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub signature: SplitSignature,
    pub tag: XID,
    pub real_library: String,
    pub max_entities: usize,
    pub logging: LoggingConfig,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            signature: SplitSignature::default(),
            tag: DEFAULT_TAG,
            real_library: option_env!("XRANDR_SPLIT_REAL_LIB")
                .unwrap_or(DEFAULT_REAL_LIBRARY)
                .to_string(),
            max_entities: MAX_ENTITIES,
            logging: LoggingConfig::default(),
        }
    }
}

impl SplitConfig {
    /// Load the file (if any), apply the process environment, validate.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `$XRANDR_SPLIT_CONFIG`, else `<config_dir>/xrandr-split/config.toml`.
    pub fn config_file_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("xrandr-split").join("config.toml"))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(width) = lookup(WIDTH_ENV) {
            self.signature.width = parse_u32(WIDTH_ENV, &width)?;
        }
        if let Some(height) = lookup(HEIGHT_ENV) {
            self.signature.height = parse_u32(HEIGHT_ENV, &height)?;
        }
        if let Some(tag) = lookup(TAG_ENV) {
            self.tag = parse_xid(&tag)?;
        }
        if let Some(path) = lookup(REAL_LIB_ENV) {
            self.real_library = path;
        }
        if let Some(level) = lookup(LOG_ENV) {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&mut self) -> Result<()> {
        if self.tag == 0 {
            return Err(SplitError::config("split tag must not be zero"));
        }
        if self.signature.width == 0 || self.signature.height == 0 {
            return Err(SplitError::config(format!(
                "invalid split signature {}x{}",
                self.signature.width, self.signature.height
            )));
        }
        if self.real_library.trim().is_empty() {
            return Err(SplitError::config("real library path is empty"));
        }
        self.max_entities = self.max_entities.clamp(1, MAX_ENTITIES);
        self.logging.max_files = self.logging.max_files.clamp(1, 20);
        Ok(())
    }
}

fn build_default(value: Option<&str>, fallback: u32) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(fallback)
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|e| SplitError::config(format!("{}={:?}: {}", key, value, e)))
}

/// Accepts `0xf00000` as well as plain decimal.
fn parse_xid(value: &str) -> Result<XID> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => XID::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| SplitError::config(format!("{}={:?}: {}", TAG_ENV, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SplitConfig::from_toml("[signature]\nwidth = 5120\n").unwrap();
        assert_eq!(config.signature.width, 5120);
        assert_eq!(config.signature.height, SplitSignature::default().height);
        assert_eq!(config.tag, DEFAULT_TAG);
        assert_eq!(config.max_entities, MAX_ENTITIES);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = SplitConfig::from_toml("tag = 4096\n").unwrap();
        config
            .apply_overrides(env(&[
                (WIDTH_ENV, "2560"),
                (HEIGHT_ENV, " 720 "),
                (TAG_ENV, "0x800000"),
                (LOG_ENV, "debug"),
            ]))
            .unwrap();
        assert_eq!(config.signature, SplitSignature::new(2560, 720));
        assert_eq!(config.tag, 0x80_0000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_bad_env_value_is_config_error() {
        let mut config = SplitConfig::default();
        let err = config
            .apply_overrides(env(&[(WIDTH_ENV, "wide")]))
            .unwrap_err();
        assert!(matches!(err, SplitError::Config { .. }));
    }

    #[test]
    fn test_validate() {
        let mut config = SplitConfig {
            max_entities: 10_000,
            ..SplitConfig::default()
        };
        config.validate().unwrap();
        assert_eq!(config.max_entities, MAX_ENTITIES);

        config.tag = 0;
        assert!(config.validate().is_err());

        let mut config = SplitConfig {
            signature: SplitSignature::new(0, 1080),
            ..SplitConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "real_library = \"/opt/lib/libXrandr.so.2\"\n[logging]\nlevel = \"off\"\n",
        )
        .unwrap();
        let config = SplitConfig::from_file(&path).unwrap();
        assert_eq!(config.real_library, "/opt/lib/libXrandr.so.2");
        assert!(!config.logging.is_enabled());

        std::fs::write(&path, "max_entities = \"many\"\n").unwrap();
        assert!(matches!(
            SplitConfig::from_file(&path),
            Err(SplitError::Parse { .. })
        ));
    }
}
