use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OUTPUT_DIR_ENV: &str = "CHRONOCHAT_OUTPUT_DIR";
pub const CHART_WIDTH_ENV: &str = "CHRONOCHAT_CHART_WIDTH";
pub const CHART_HEIGHT_ENV: &str = "CHRONOCHAT_CHART_HEIGHT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },
    #[error("{field} must be a positive number of pixels")]
    InvalidDimension { field: &'static str },
}

/// Where and how large exported artifacts are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("exports"),
            chart_width: 1000,
            chart_height: 600,
        }
    }
}

impl ExportConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chart_width == 0 {
            return Err(ConfigError::InvalidDimension {
                field: "chart_width",
            });
        }
        if self.chart_height == 0 {
            return Err(ConfigError::InvalidDimension {
                field: "chart_height",
            });
        }
        Ok(())
    }

    /// Defaults, then the optional TOML file, then `CHRONOCHAT_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.with_env_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(OUTPUT_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(width) = parse_dimension(&lookup, CHART_WIDTH_ENV)? {
            self.chart_width = width;
        }
        if let Some(height) = parse_dimension(&lookup, CHART_HEIGHT_ENV)? {
            self.chart_height = height;
        }
        Ok(self)
    }
}

fn parse_dimension<F>(lookup: &F, name: &'static str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match value.trim().parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
        _ => Err(ConfigError::InvalidEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_fills_unset_fields_with_defaults() {
        let config = ExportConfig::from_toml_str("chart_width = 1280\n").expect("valid toml");
        assert_eq!(config.chart_width, 1280);
        assert_eq!(config.chart_height, 600);
        assert_eq!(config.output_dir, PathBuf::from("exports"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let config = ExportConfig::default()
            .with_env_overrides(|name| match name {
                OUTPUT_DIR_ENV => Some("/tmp/chronochat".to_string()),
                CHART_HEIGHT_ENV => Some("720".to_string()),
                _ => None,
            })
            .expect("valid overrides");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/chronochat"));
        assert_eq!(config.chart_width, 1000);
        assert_eq!(config.chart_height, 720);
    }

    #[test]
    fn toml_rejects_zero_dimensions() {
        let err = ExportConfig::from_toml_str("chart_width = 0\n").expect_err("zero width");
        assert!(matches!(
            err,
            ConfigError::InvalidDimension {
                field: "chart_width"
            }
        ));

        let err = ExportConfig::from_toml_str("chart_height = 0\n").expect_err("zero height");
        assert!(matches!(
            err,
            ConfigError::InvalidDimension {
                field: "chart_height"
            }
        ));
    }

    #[test]
    fn load_rejects_zero_dimensions_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        std::io::Write::write_all(&mut file, b"chart_height = 0\n").expect("write config");

        let err = ExportConfig::load(Some(file.path())).expect_err("zero height");
        assert!(matches!(err, ConfigError::InvalidDimension { .. }));
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let err = ExportConfig::default()
            .with_env_overrides(|name| (name == CHART_WIDTH_ENV).then(|| "0".to_string()))
            .expect_err("zero width should be rejected");
        assert!(matches!(err, ConfigError::InvalidEnv { name: CHART_WIDTH_ENV, .. }));
    }
}
