//! Resolved pipeline configuration.
//!
//! Every stage receives this value through its constructor. Loading it from
//! files, the environment, or flags is the binary's job.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default local model name.
pub const DEFAULT_LOCAL_MODEL: &str = "llama2";

/// Default remote model name.
pub const DEFAULT_REMOTE_MODEL: &str = "gpt-3.5-turbo";

/// Default local backend URL.
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";

/// Default remote backend URL.
pub const DEFAULT_REMOTE_URL: &str = "https://api.openai.com/v1";

/// Which model backend restructures the slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiService {
    /// Local generate endpoint (Ollama-compatible).
    #[default]
    #[serde(alias = "ollama")]
    Local,
    /// Remote chat-completions endpoint (OpenAI-compatible).
    #[serde(alias = "openai")]
    Remote,
}

impl AiService {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiService::Local => "local",
            AiService::Remote => "remote",
        }
    }
}

impl FromStr for AiService {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "ollama" => Ok(Self::Local),
            "remote" | "openai" => Ok(Self::Remote),
            other => Err(Error::ConfigError(format!("unknown ai_service '{}'", other))),
        }
    }
}

/// Which document the renderer writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Word processing document (`.docx`).
    #[default]
    #[serde(alias = "docx")]
    Document,
    /// Markdown text (`.md`).
    #[serde(alias = "markdown", alias = "md")]
    Markup,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Document => "docx",
            OutputFormat::Markup => "md",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "document" | "docx" => Ok(Self::Document),
            "markup" | "markdown" | "md" => Ok(Self::Markup),
            other => Err(Error::ConfigError(format!("unsupported output_format '{}'", other))),
        }
    }
}

/// Configuration shared by all pipeline stages.
///
/// Empty `model` and `base_url` fall back to the selected service's defaults;
/// use [`PipelineConfig::model`] and [`PipelineConfig::base_url`] to read the
/// effective values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ai_service: AiService,
    #[serde(rename = "model")]
    pub model_name: String,
    #[serde(rename = "base_url")]
    pub base_url_override: String,
    pub api_key: String,
    pub output_format: OutputFormat,
    pub enable_ocr: bool,
    pub tesseract_path: Option<PathBuf>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Threads used to restructure slides concurrently.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ai_service: AiService::Local,
            model_name: String::new(),
            base_url_override: String::new(),
            api_key: String::new(),
            output_format: OutputFormat::Document,
            enable_ocr: false,
            tesseract_path: None,
            max_tokens: 2000,
            temperature: 0.3,
            workers: 4,
        }
    }
}

impl PipelineConfig {
    /// Effective model name.
    pub fn model(&self) -> &str {
        if !self.model_name.trim().is_empty() {
            return self.model_name.trim();
        }
        match self.ai_service {
            AiService::Local => DEFAULT_LOCAL_MODEL,
            AiService::Remote => DEFAULT_REMOTE_MODEL,
        }
    }

    /// Effective backend base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        let url = self.base_url_override.trim().trim_end_matches('/');
        if !url.is_empty() {
            return url;
        }
        match self.ai_service {
            AiService::Local => DEFAULT_LOCAL_URL,
            AiService::Remote => DEFAULT_REMOTE_URL,
        }
    }

    /// Check the configuration.
    ///
    /// Returns the list of warnings when usable, or a [`Error::ConfigError`]
    /// listing every problem that makes it unusable.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if !is_http_url(self.base_url()) {
            errors.push(format!("base_url '{}' is not an http(s) URL", self.base_url()));
        }

        if self.ai_service == AiService::Remote {
            let key = self.api_key.trim();
            if key.is_empty() {
                errors.push("the remote service requires an api_key".to_string());
            } else if key.len() < 10 {
                warnings.push("api_key looks too short to be valid".to_string());
            }
        }

        if self.max_tokens == 0 {
            errors.push("max_tokens must be greater than zero".to_string());
        }

        if !self.temperature.is_finite() {
            errors.push("temperature must be a number".to_string());
        } else if !(0.0..=2.0).contains(&self.temperature) {
            warnings.push(format!(
                "temperature {} is outside the usual 0.0-2.0 range",
                self.temperature
            ));
        }

        if self.workers == 0 {
            errors.push("workers must be at least 1".to_string());
        }

        if self.enable_ocr {
            if let Some(path) = &self.tesseract_path {
                if path.components().count() > 1 && !path.exists() {
                    warnings.push(format!("tesseract_path {} does not exist", path.display()));
                }
            }
        }

        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(Error::ConfigError(errors.join("; ")))
        }
    }
}

impl fmt::Display for PipelineConfig {
    /// Human-readable listing with the API key masked.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = "*".repeat(self.api_key.chars().count());
        writeln!(f, "ai_service: {}", self.ai_service.as_str())?;
        writeln!(f, "model: {}", self.model())?;
        writeln!(f, "base_url: {}", self.base_url())?;
        writeln!(f, "api_key: {}", masked_key)?;
        writeln!(f, "output_format: {}", self.output_format.extension())?;
        writeln!(f, "enable_ocr: {}", self.enable_ocr)?;
        writeln!(
            f,
            "tesseract_path: {}",
            self.tesseract_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        )?;
        writeln!(f, "max_tokens: {}", self.max_tokens)?;
        writeln!(f, "temperature: {}", self.temperature)?;
        write!(f, "workers: {}", self.workers)
    }
}

/// Check that a string looks like `http(s)://host...`.
fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));

    match rest {
        Some(rest) => rest
            .split(['/', '?', '#'])
            .next()
            .map(|host| !host.is_empty())
            .unwrap_or(false),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.model(), DEFAULT_LOCAL_MODEL);
        assert_eq!(config.base_url(), DEFAULT_LOCAL_URL);

        let remote = PipelineConfig {
            ai_service: AiService::Remote,
            ..PipelineConfig::default()
        };
        assert_eq!(remote.model(), DEFAULT_REMOTE_MODEL);
        assert_eq!(remote.base_url(), DEFAULT_REMOTE_URL);
    }

    #[test]
    fn test_overrides_win_and_trailing_slash_is_dropped() {
        let config = PipelineConfig {
            model_name: "mistral".into(),
            base_url_override: "http://gpu-box:11434/".into(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.model(), "mistral");
        assert_eq!(config.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("ollama".parse::<AiService>().unwrap(), AiService::Local);
        assert_eq!("OpenAI".parse::<AiService>().unwrap(), AiService::Remote);
        assert_eq!("docx".parse::<OutputFormat>().unwrap(), OutputFormat::Document);
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markup);
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert!("claude".parse::<AiService>().is_err());
    }

    #[test]
    fn test_deserialize_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"ai_service": "openai", "output_format": "markdown", "model": "gpt-4o"}"#)
                .unwrap();
        assert_eq!(config.ai_service, AiService::Remote);
        assert_eq!(config.output_format, OutputFormat::Markup);
        assert_eq!(config.model(), "gpt-4o");
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_remote_without_key_is_invalid() {
        let config = PipelineConfig {
            ai_service: AiService::Remote,
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_invalid_url_and_zero_tokens_are_both_reported() {
        let config = PipelineConfig {
            base_url_override: "localhost:11434".into(),
            max_tokens: 0,
            ..PipelineConfig::default()
        };
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("base_url"));
        assert!(message.contains("max_tokens"));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let config = PipelineConfig {
            ai_service: AiService::Remote,
            api_key: "short".into(),
            temperature: 3.5,
            ..PipelineConfig::default()
        };
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_missing_tesseract_path_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            enable_ocr: true,
            tesseract_path: Some(dir.path().join("bin").join("tesseract")),
            ..PipelineConfig::default()
        };
        let warnings = config.validate().unwrap();
        assert!(warnings[0].contains("tesseract_path"));
    }

    #[test]
    fn test_display_masks_api_key() {
        let config = PipelineConfig {
            api_key: "sk-secret".into(),
            ..PipelineConfig::default()
        };
        let shown = config.to_string();
        assert!(shown.contains("api_key: *********"));
        assert!(!shown.contains("sk-secret"));
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("http://localhost:11434"));
        assert!(is_http_url("https://api.openai.com/v1"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("ftp://example.com"));
    }
}
