//! Configuration file support
//!
//! An optional TOML file supplies defaults for the global options:
//!
//! ```toml
//! programmer = "linux_gpio:dev=/dev/gpiochip0,clk=23,data=24,mclr=18"
//! family = "pic18fxxk80"
//! ```
//!
//! Command line flags take precedence over file values.

use std::fs;
use std::path::{Path, PathBuf};

use picflasher_core::family::FamilyKind;
use serde::Deserialize;
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "picflasher.toml";

/// Errors reading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown family '{0}' in configuration file")]
    UnknownFamily(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    programmer: Option<String>,
    family: Option<String>,
}

/// Settings resolved from the configuration file
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// Programmer string
    pub programmer: Option<String>,
    /// Device family
    pub family: Option<FamilyKind>,
}

impl Settings {
    /// Parse settings from TOML text
    fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let family = match file.family {
            Some(name) => Some(FamilyKind::from_name(&name).ok_or(ConfigError::UnknownFamily(name))?),
            None => None,
        };

        Ok(Self {
            programmer: file.programmer,
            family,
        })
    }

    /// Load settings
    ///
    /// An explicit path must exist. Without one, `./picflasher.toml` is read
    /// if present and empty settings are returned otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !path.is_file() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let settings = Self::from_toml_str(&content, &path)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Settings, ConfigError> {
        Settings::from_toml_str(content, Path::new("test.toml"))
    }

    #[test]
    fn test_full_file() {
        let settings = parse(
            r#"
            programmer = "dummy:device=PIC18F46K80"
            family = "PIC18FXXK80"
            "#,
        )
        .unwrap();
        assert_eq!(
            settings,
            Settings {
                programmer: Some("dummy:device=PIC18F46K80".to_string()),
                family: Some(FamilyKind::Pic18FxxK80),
            }
        );
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(parse("").unwrap(), Settings::default());
    }

    #[test]
    fn test_rejects_unknown_keys_and_families() {
        assert!(matches!(parse("speed = 3"), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            parse("family = \"pic16f8x\""),
            Err(ConfigError::UnknownFamily(name)) if name == "pic16f8x"
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Settings::load(Some(Path::new("/nonexistent/picflasher.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
