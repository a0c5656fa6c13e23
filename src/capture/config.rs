//! Camera configuration.
//!
//! Acquisition defaults mirror what the host software configures per
//! microscope: a default exposure and binning, the binnings the camera
//! supports, and the full-frame size used when the camera cannot report
//! it.

use crate::acquisition::Dimensions;
use crate::session::DEFAULT_MAGIC;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which driver backs the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// In-process simulator, no hardware.
    #[default]
    Simulated,
    /// CCDCOM2 library connected to the Gatan software.
    Gatan,
    /// The vendor's CCDCOM2 simulation library.
    SimulateDll,
}

/// Driver selection and connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Driver implementation.
    pub kind: DriverKind,
    /// Directory holding the CCDCOM2 libraries.
    pub library_dir: PathBuf,
    /// Compatibility token presented on open.
    pub magic: i32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: DriverKind::default(),
            library_dir: PathBuf::from("."),
            magic: DEFAULT_MAGIC,
        }
    }
}

/// Acquisition defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Exposure in seconds when none is given.
    pub default_exposure: f64,
    /// Binning when none is given.
    pub default_binsize: u32,
    /// Binnings the camera accepts.
    pub possible_binsizes: Vec<u32>,
    /// Full-frame size as `[width, height]`.
    pub dimensions: [u32; 2],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_exposure: 0.1,
            default_binsize: 1,
            possible_binsizes: vec![1, 2, 4],
            dimensions: [2048, 2048],
        }
    }
}

impl CameraConfig {
    /// Full-frame size.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.dimensions[0], self.dimensions[1])
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimensions[0] == 0 || self.dimensions[1] == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !(self.default_exposure.is_finite() && self.default_exposure > 0.0) {
            return Err(ConfigError::InvalidExposure);
        }
        if self.possible_binsizes.is_empty() || self.possible_binsizes.contains(&0) {
            return Err(ConfigError::InvalidBinsizes);
        }
        if !self.possible_binsizes.contains(&self.default_binsize) {
            return Err(ConfigError::UnsupportedDefaultBinsize(self.default_binsize));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid default exposure (must be positive seconds)")]
    InvalidExposure,
    #[error("possible binsizes must be non-empty and positive")]
    InvalidBinsizes,
    #[error("default binsize {0} is not among the possible binsizes")]
    UnsupportedDefaultBinsize(u32),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Driver selection.
    #[serde(default)]
    pub driver: DriverConfig,
    /// Acquisition defaults.
    #[serde(default)]
    pub camera: CameraConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.camera.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CameraConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CameraConfig::default();
        config.dimensions = [0, 2048];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_default_binsize_must_be_possible() {
        let config = CameraConfig {
            default_binsize: 3,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedDefaultBinsize(3))
        ));
    }

    #[test]
    fn test_parse_file_config() {
        let config = FileConfig::from_toml(
            r#"
            [driver]
            kind = "simulate_dll"
            library_dir = "C:/Program Files/CCDCOM2"
            magic = 20120101

            [camera]
            default_exposure = 0.5
            default_binsize = 2
            possible_binsizes = [1, 2, 4]
            dimensions = [4096, 4096]
            "#,
        )
        .unwrap();

        assert_eq!(config.driver.kind, DriverKind::SimulateDll);
        assert_eq!(config.camera.default_binsize, 2);
        assert_eq!(config.camera.dimensions(), Dimensions::new(4096, 4096));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.driver.kind, DriverKind::Simulated);
        assert_eq!(config.driver.magic, DEFAULT_MAGIC);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = FileConfig::from_toml("[driver]\nkind = \"orius\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
