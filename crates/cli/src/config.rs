//! Configuration loading: defaults, then a JSON file, then the environment,
//! then command-line flags.

use anyhow::{Context, Result};
use deck_core::{AiService, OutputFormat, PipelineConfig};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File looked up in the working directory, then under the home directory.
const CONFIG_FILE_NAME: &str = "config.json";
const HOME_CONFIG_DIR: &str = ".deck-convert";

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub ai_service: Option<AiService>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub enable_ocr: Option<bool>,
    pub tesseract_path: Option<PathBuf>,
    pub workers: Option<usize>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(service) = self.ai_service {
            config.ai_service = service;
        }
        if let Some(model) = &self.model {
            config.model_name = model.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url_override = url.clone();
        }
        if let Some(key) = &self.api_key {
            config.api_key = key.clone();
        }
        if let Some(format) = self.output_format {
            config.output_format = format;
        }
        if let Some(enable) = self.enable_ocr {
            config.enable_ocr = enable;
        }
        if let Some(path) = &self.tesseract_path {
            config.tesseract_path = Some(path.clone());
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }
}

/// Resolve the configuration from every layer.
///
/// An explicit `--config` file must exist; the default locations are optional.
pub fn load(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<PipelineConfig> {
    let mut config = match explicit {
        Some(path) => read_file(path)?,
        None => match default_file() {
            Some(path) => read_file(&path)?,
            None => PipelineConfig::default(),
        },
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    overrides.apply(&mut config);

    Ok(config)
}

/// Read a JSON config file. Missing keys keep their defaults.
pub fn read_file(path: &Path) -> Result<PipelineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// First existing default config file.
fn default_file() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        candidates.push(PathBuf::from(home).join(HOME_CONFIG_DIR).join(CONFIG_FILE_NAME));
    }
    candidates.into_iter().find(|path| path.is_file())
}

/// Overlay environment variables read through `lookup`.
///
/// Empty values are ignored.
pub fn apply_env<F>(config: &mut PipelineConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = var("AI_SERVICE") {
        config.ai_service = parse_var("AI_SERVICE", &value)?;
    }
    if let Some(value) = var("MODEL") {
        config.model_name = value;
    }
    if let Some(value) = var("BASE_URL") {
        config.base_url_override = value;
    }
    if let Some(value) = var("API_KEY") {
        config.api_key = value;
    }
    if let Some(value) = var("OUTPUT_FORMAT") {
        config.output_format = parse_var("OUTPUT_FORMAT", &value)?;
    }
    if let Some(value) = var("ENABLE_OCR") {
        config.enable_ocr = parse_flag("ENABLE_OCR", &value)?;
    }
    if let Some(value) = var("TESSERACT_PATH") {
        config.tesseract_path = Some(PathBuf::from(value));
    }
    if let Some(value) = var("MAX_TOKENS") {
        config.max_tokens = parse_var("MAX_TOKENS", &value)?;
    }
    if let Some(value) = var("TEMPERATURE") {
        config.temperature = parse_var("TEMPERATURE", &value)?;
    }
    if let Some(value) = var("WORKERS") {
        config.workers = parse_var("WORKERS", &value)?;
    }

    Ok(())
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value '{}' for {}", value, key))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("Invalid value '{}' for {}", value, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_env_overlays_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"ai_service": "local", "model": "mistral", "workers": 2}"#).unwrap();

        let mut config = read_file(&path).unwrap();
        let vars = env(&[("AI_SERVICE", "openai"), ("API_KEY", "sk-0123456789"), ("ENABLE_OCR", "yes")]);
        apply_env(&mut config, |key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.ai_service, AiService::Remote);
        assert_eq!(config.model(), "mistral");
        assert_eq!(config.api_key, "sk-0123456789");
        assert!(config.enable_ocr);
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn test_flags_overlay_env() {
        let mut config = PipelineConfig::default();
        let vars = env(&[("OUTPUT_FORMAT", "markdown"), ("MODEL", "llama3"), ("WORKERS", "8")]);
        apply_env(&mut config, |key| vars.get(key).cloned()).unwrap();

        let overrides = ConfigOverrides {
            output_format: Some(OutputFormat::Document),
            workers: Some(1),
            ..ConfigOverrides::default()
        };
        overrides.apply(&mut config);

        assert_eq!(config.output_format, OutputFormat::Document);
        assert_eq!(config.model(), "llama3");
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = PipelineConfig::default();
        let vars = env(&[("MODEL", "  "), ("TEMPERATURE", "")]);
        apply_env(&mut config, |key| vars.get(key).cloned()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_invalid_env_value_names_the_variable() {
        let mut config = PipelineConfig::default();
        let vars = env(&[("MAX_TOKENS", "lots")]);
        let err = apply_env(&mut config, |key| vars.get(key).cloned()).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));

        let vars = env(&[("ENABLE_OCR", "maybe")]);
        assert!(apply_env(&mut config, |key| vars.get(key).cloned()).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("nope.json")), &ConfigOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(read_file(&path).is_err());
    }
}
