use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "aqi-dashboard.json";
/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "AQI_DASHBOARD_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 1280.0,
            height: 860.0,
        }
    }
}

/// Startup settings. Every field is optional in the file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dataset loaded at startup.
    pub data_path: PathBuf,
    /// Cities preselected when they occur in the dataset.
    pub default_cities: Vec<String>,
    pub window: WindowConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            data_path: PathBuf::from("city_day.csv"),
            default_cities: vec!["Delhi".into(), "Mumbai".into(), "Chennai".into()],
            window: WindowConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config from `$AQI_DASHBOARD_CONFIG`, else `./aqi-dashboard.json`,
    /// else defaults. A broken file is reported and replaced by defaults.
    pub fn discover() -> Self {
        let (path, explicit) = match std::env::var_os(CONFIG_ENV) {
            Some(p) => (PathBuf::from(p), true),
            None => (PathBuf::from(CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            log::debug!("No {CONFIG_FILE} found, using defaults");
            return DashboardConfig::default();
        }
        match DashboardConfig::load(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                DashboardConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{ "data_path": "data/city_hour.csv" }"#).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/city_hour.csv"));
        assert_eq!(config.default_cities, ["Delhi", "Mumbai", "Chennai"]);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn test_config_overrides_cities_and_window() {
        let config: DashboardConfig = serde_json::from_str(
            r#"{ "default_cities": ["Kolkata"], "window": { "width": 800.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.default_cities, ["Kolkata"]);
        assert_eq!(config.window.width, 800.0);
        assert_eq!(config.window.height, WindowConfig::default().height);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = DashboardConfig::load(Path::new("/no/such/aqi-dashboard.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
