//! Configuration management using the prefer crate.
//!
//! Config files are discovered by prefer under the name `earnings-ocr`
//! (e.g. `~/.config/earnings-ocr/config.toml`). An explicit path can be given
//! instead; its format is chosen from the extension.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ocr::{OcrBackendType, OcrConfig};

/// Environment variable overriding `ocr.language`.
pub const LANGUAGE_ENV: &str = "EARNINGS_OCR_LANGUAGE";

/// Environment variable overriding `ocr.backend`.
pub const BACKEND_ENV: &str = "EARNINGS_OCR_BACKEND";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
}

/// What to do when a single image in a batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and continue with the next image.
    #[default]
    Skip,
    /// Stop the run and return the error.
    Abort,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Skip => "skip",
            FailurePolicy::Abort => "abort",
        }
    }
}

impl prefer::FromValue for FailurePolicy {
    fn from_value(value: &prefer::ConfigValue) -> prefer::Result<Self> {
        match value.as_str() {
            Some("skip") => Ok(FailurePolicy::Skip),
            Some("abort") => Ok(FailurePolicy::Abort),
            Some(other) => Err(prefer::Error::ConversionError {
                key: String::new(),
                type_name: "FailurePolicy".to_string(),
                source: format!("unknown failure policy: {}", other).into(),
            }),
            None => Err(prefer::Error::ConversionError {
                key: String::new(),
                type_name: "FailurePolicy".to_string(),
                source: "expected string".into(),
            }),
        }
    }
}

impl prefer::FromValue for OcrBackendType {
    fn from_value(value: &prefer::ConfigValue) -> prefer::Result<Self> {
        match value.as_str() {
            Some(name) => OcrBackendType::from_str(name).ok_or_else(|| {
                prefer::Error::ConversionError {
                    key: String::new(),
                    type_name: "OcrBackendType".to_string(),
                    source: format!("unknown OCR backend: {}", name).into(),
                }
            }),
            None => Err(prefer::Error::ConversionError {
                key: String::new(),
                type_name: "OcrBackendType".to_string(),
                source: "expected string".into(),
            }),
        }
    }
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_true() -> bool {
    true
}

/// Recognizer settings (`[ocr]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct OcrSettings {
    #[serde(default)]
    #[prefer(default)]
    pub backend: OcrBackendType,
    /// Tesseract language code(s), e.g. "eng" or "eng+deu".
    #[serde(default = "default_language")]
    #[prefer(default = "eng")]
    pub language: String,
    /// Explicit tesseract binary. Falls back to PATH lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[prefer(default)]
    pub tesseract_path: Option<String>,
    /// Directory holding OCRS models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[prefer(default)]
    pub model_path: Option<String>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: OcrBackendType::default(),
            language: default_language(),
            tesseract_path: None,
            model_path: None,
        }
    }
}

impl OcrSettings {
    /// Backend configuration with `~` expanded in paths.
    pub fn backend_config(&self) -> OcrConfig {
        OcrConfig {
            language: self.language.clone(),
            binary_path: self.tesseract_path.as_deref().map(expand_path),
            model_path: self.model_path.as_deref().map(expand_path),
        }
    }
}

/// Batch behaviour (`[pipeline]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct PipelineSettings {
    #[serde(default)]
    #[prefer(default)]
    pub on_error: FailurePolicy,
    /// Check type and size of each image before decoding.
    #[serde(default = "default_true")]
    #[prefer(default = "true")]
    pub validate_input: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            on_error: FailurePolicy::default(),
            validate_input: true,
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    #[serde(default)]
    #[prefer(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    #[prefer(default)]
    pub pipeline: PipelineSettings,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery.
    /// Falls back to defaults (plus env overrides) when nothing is found.
    pub async fn load() -> Self {
        let discovered = match prefer::load("earnings-ocr").await {
            Ok(pref_config) => pref_config.source_path().cloned(),
            Err(_) => None,
        };

        let Some(path) = discovered else {
            return Self::default().with_env_overrides();
        };

        match Self::load_from_path(&path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file: {}", e);
                Self::default().with_env_overrides()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Supports TOML, YAML and JSON based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_err = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_err("TOML", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| parse_err("YAML", e.to_string()))
            }
            _ => serde_json::from_str(contents).map_err(|e| parse_err("JSON", e.to_string())),
        }
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(language) = std::env::var(LANGUAGE_ENV) {
            if !language.trim().is_empty() {
                self.ocr.language = language.trim().to_string();
            }
        }
        if let Ok(backend) = std::env::var(BACKEND_ENV) {
            match OcrBackendType::from_str(backend.trim()) {
                Some(b) => self.ocr.backend = b,
                None => tracing::warn!("Unknown {} value: {}", BACKEND_ENV, backend),
            }
        }
        self
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Load from an explicit path, or discover one.
pub async fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(p) => Config::load_from_path(p).await,
        None => Ok(Config::load().await),
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ocr.backend, OcrBackendType::Tesseract);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.pipeline.on_error, FailurePolicy::Skip);
        assert!(config.pipeline.validate_input);
    }

    #[test]
    fn test_parse_toml() {
        let body = r#"
[ocr]
backend = "ocrs"
model_path = "/opt/models"

[pipeline]
on_error = "abort"
validate_input = false
"#;
        let config = Config::parse(Path::new("c.toml"), body).unwrap();
        assert_eq!(config.ocr.backend, OcrBackendType::Ocrs);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.ocr.model_path.as_deref(), Some("/opt/models"));
        assert_eq!(config.pipeline.on_error, FailurePolicy::Abort);
        assert!(!config.pipeline.validate_input);
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = Config::parse(Path::new("c.yml"), "ocr:\n  language: deu\n").unwrap();
        assert_eq!(yaml.ocr.language, "deu");

        let json = Config::parse(
            Path::new("c.json"),
            r#"{"pipeline": {"on_error": "skip"}}"#,
        )
        .unwrap();
        assert_eq!(json.pipeline.on_error, FailurePolicy::Skip);
        assert!(json.pipeline.validate_input);
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let err = Config::parse(Path::new("c.toml"), "[ocr]\nbackend = \"paddle\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "TOML", .. }));
    }

    #[tokio::test]
    async fn test_load_from_path_records_source() {
        let file = write_config(".toml", "[pipeline]\non_error = \"abort\"\n");
        let config = Config::load_from_path(file.path()).await.unwrap();
        assert_eq!(config.source_path.as_deref(), Some(file.path()));
        assert_eq!(config.pipeline.on_error, FailurePolicy::Abort);
    }

    #[tokio::test]
    async fn test_load_without_explicit_path_never_fails() {
        let config = load_config(None).await.unwrap();
        assert!(!config.ocr.language.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let err = Config::load_from_path(Path::new("/nonexistent/earnings-ocr.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_backend_config_expands_tilde() {
        let settings = OcrSettings {
            tesseract_path: Some("~/bin/tesseract".to_string()),
            ..OcrSettings::default()
        };
        let backend = settings.backend_config();
        let path = backend.binary_path.unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("bin/tesseract"));
    }

    #[test]
    fn test_toml_round_trip_omits_source_path() {
        let mut config = Config::default();
        config.source_path = Some(PathBuf::from("/tmp/x.toml"));
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("backend = \"tesseract\""));
        assert!(rendered.contains("on_error = \"skip\""));
        assert!(!rendered.contains("source_path"));
    }
}
