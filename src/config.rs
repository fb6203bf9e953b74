use crate::constants;
use crate::error::{ImportError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub import: ImportSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Path to the CSV dataset.
    pub csv_path: String,
    /// Cap on the number of unique events admitted per run.
    pub limit: Option<usize>,
    /// Directory for JSON run reports.
    pub report_dir: Option<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            csv_path: constants::DEFAULT_CSV_FILE.to_string(),
            limit: None,
            report_dir: None,
        }
    }
}

impl Config {
    /// Load config.toml from the working directory. The file is optional;
    /// built-in defaults apply when it is absent.
    pub fn load() -> Result<Self> {
        let config_path = constants::CONFIG_FILE;
        if !Path::new(config_path).exists() {
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ImportError::Config(format!("Failed to read config file '{config_path}': {e}"))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_bundled_dataset() {
        let config = Config::default();
        assert_eq!(config.import.csv_path, constants::DEFAULT_CSV_FILE);
        assert!(config.import.limit.is_none());
    }

    #[test]
    fn test_partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str("[import]\nlimit = 25\n").unwrap();
        assert_eq!(config.import.limit, Some(25));
        assert_eq!(config.import.csv_path, constants::DEFAULT_CSV_FILE);
    }
}
