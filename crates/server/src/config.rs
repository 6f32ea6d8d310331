use std::path::{Path, PathBuf};

use serde::Deserialize;
use splitbill_ocr::ScanConfig;
use thiserror::Error;

/// Env var naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "SPLITBILL_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Cap on any request body, uploads included.
    pub max_upload_bytes: usize,
    pub recognizer: RecognizerConfig,
    pub scan: ScanConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            recognizer: RecognizerConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub tessdata_path: Option<String>,
    pub lang: String,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            tessdata_path: None,
            lang: "eng".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Defaults, then the file named by `SPLITBILL_CONFIG`, then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("SPLITBILL_BIND") {
            self.bind = v;
        }
        if let Some(v) = lookup("SPLITBILL_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_env("SPLITBILL_MAX_UPLOAD_BYTES", v)?;
        }
        if let Some(v) = lookup("SPLITBILL_TESSDATA") {
            self.recognizer.tessdata_path = Some(v);
        }
        if let Some(v) = lookup("SPLITBILL_LANG") {
            self.recognizer.lang = v;
        }
        if let Some(v) = lookup("SPLITBILL_REGION_TIMEOUT_MS") {
            self.scan.region_timeout_ms = parse_env("SPLITBILL_REGION_TIMEOUT_MS", v)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.bind, "127.0.0.1:5000");
        assert_eq!(config.recognizer.lang, "eng");
        assert_eq!(config.scan.min_region_width, 50);
        assert_eq!(config.scan.line_mode_min_width, 300);
        assert!(config.scan.full_page_fallback);
    }

    #[test]
    fn toml_overrides_nested_tables() {
        let config = ServerConfig::from_toml(
            r#"
            bind = "0.0.0.0:8080"
            max_upload_bytes = 1024

            [recognizer]
            lang = "deu"

            [scan]
            region_timeout_ms = 500
            full_page_fallback = false
            "#,
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.recognizer.lang, "deu");
        assert_eq!(config.scan.region_timeout_ms, 500);
        assert!(!config.scan.full_page_fallback);
        assert_eq!(config.scan.min_region_height, 10);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            ServerConfig::from_toml("bind = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("SPLITBILL_BIND", "0.0.0.0:9000"),
            ("SPLITBILL_TESSDATA", "/usr/share/tessdata"),
            ("SPLITBILL_REGION_TIMEOUT_MS", "250"),
        ]
        .into_iter()
        .collect();
        let mut config = ServerConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.recognizer.tessdata_path.as_deref(), Some("/usr/share/tessdata"));
        assert_eq!(config.scan.region_timeout_ms, 250);
    }

    #[test]
    fn invalid_numeric_env_is_rejected() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env(|k| (k == "SPLITBILL_MAX_UPLOAD_BYTES").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "SPLITBILL_MAX_UPLOAD_BYTES", .. }));
    }
}
