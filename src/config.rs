//! Application-level configuration loading, including the evaluator settings.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MATH_RUSH_BACK_CONFIG_PATH";

/// Default base URL of the remote expression-evaluation service.
const DEFAULT_EVALUATOR_URL: &str = "https://api.mathjs.org/v4/";
/// Default remote evaluation timeout in milliseconds.
const DEFAULT_EVALUATOR_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Remote expression-evaluation settings.
    pub evaluator: EvaluatorConfig,
}

#[derive(Debug, Clone)]
/// Settings for the remote expression-evaluation service.
pub struct EvaluatorConfig {
    /// Base URL the evaluation requests are sent to.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// When false, skip the remote call and evaluate locally only.
    pub remote_enabled: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EVALUATOR_URL.to_string(),
            timeout_ms: DEFAULT_EVALUATOR_TIMEOUT_MS,
            remote_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in
    /// defaults when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    evaluator: RawEvaluator,
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the evaluator section; absent fields keep defaults.
struct RawEvaluator {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    remote_enabled: Option<bool>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = EvaluatorConfig::default();
        Self {
            evaluator: EvaluatorConfig {
                base_url: value.evaluator.base_url.unwrap_or(defaults.base_url),
                timeout_ms: value.evaluator.timeout_ms.unwrap_or(defaults.timeout_ms),
                remote_enabled: value
                    .evaluator
                    .remote_enabled
                    .unwrap_or(defaults.remote_enabled),
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_public_evaluator() {
        let config = AppConfig::default();
        assert_eq!(config.evaluator.base_url, DEFAULT_EVALUATOR_URL);
        assert_eq!(config.evaluator.timeout_ms, DEFAULT_EVALUATOR_TIMEOUT_MS);
        assert!(config.evaluator.remote_enabled);
    }

    #[test]
    fn partial_files_keep_defaults_for_absent_fields() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"evaluator": {"remote_enabled": false}}"#).unwrap();
        let config: AppConfig = raw.into();
        assert!(!config.evaluator.remote_enabled);
        assert_eq!(config.evaluator.base_url, DEFAULT_EVALUATOR_URL);
    }

    #[test]
    fn empty_files_fall_back_entirely() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        let config: AppConfig = raw.into();
        assert!(config.evaluator.remote_enabled);
    }
}
