//! Configuration loading
//!
//! Settings resolve in priority order: command-line argument, environment
//! variable, TOML config file, compiled defaults.

use crate::error::{AnalysisError, AnalysisResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub results_dir: PathBuf,
    pub genre_profiles_path: PathBuf,
    /// Optional JSON file overriding the built-in English advisory text
    pub advisories_path: Option<PathBuf>,
    pub max_upload_mb: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "mixmentor".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5005,
            uploads_dir: PathBuf::from("data/uploads"),
            results_dir: PathBuf::from("data/results"),
            genre_profiles_path: PathBuf::from("config/genre_profiles.json"),
            advisories_path: None,
            max_upload_mb: 500,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> AnalysisResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| AnalysisError::Configuration(format!("Invalid config file: {}", e)))
    }

    /// Resolve settings following the priority order:
    /// 1. Explicit path from the command line
    /// 2. `MIXMENTOR_CONFIG` environment variable
    /// 3. Platform config directory (`<config_dir>/mixmentor/config.toml`)
    /// 4. Compiled defaults
    pub fn resolve(cli_path: Option<&Path>) -> AnalysisResult<Self> {
        if let Some(path) = cli_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var("MIXMENTOR_CONFIG") {
            return Self::from_file(Path::new(&path));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("mixmentor").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Maximum upload size in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.port, 5005);
        assert!(settings.advisories_path.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str("port = 8080").unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.uploads_dir, PathBuf::from("data/uploads"));
    }
}
