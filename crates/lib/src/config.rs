//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.sift/config.json`) and environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::nlu::{NluConfig, DEFAULT_ENDPOINT};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// NLU provider settings.
    #[serde(default)]
    pub nlu: NluSettings,
}

/// Dialogflow agent settings as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NluSettings {
    /// Path to a token file or an inline token. Overridden by SIFT_NLU_CREDENTIALS, then GOOGLE_APPLICATION_CREDENTIALS.
    pub credentials: Option<String>,

    /// Dialogflow agent project id. Overridden by SIFT_NLU_PROJECT_ID.
    pub project_id: Option<String>,

    /// Query language code (default "en").
    #[serde(default = "default_language")]
    pub language: String,

    /// Match handler patterns against the detected action instead of message text.
    #[serde(default)]
    pub listen_for_action: bool,

    /// Provider base URL (default the global Dialogflow endpoint).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for NluSettings {
    fn default() -> Self {
        Self {
            credentials: None,
            project_id: None,
            language: default_language(),
            listen_for_action: false,
            endpoint: default_endpoint(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the credential reference: env SIFT_NLU_CREDENTIALS, then GOOGLE_APPLICATION_CREDENTIALS, then config.
pub fn resolve_credentials(config: &Config) -> Option<String> {
    non_empty_env("SIFT_NLU_CREDENTIALS")
        .or_else(|| non_empty_env("GOOGLE_APPLICATION_CREDENTIALS"))
        .or_else(|| {
            config
                .nlu
                .credentials
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the project id: env SIFT_NLU_PROJECT_ID overrides config.
pub fn resolve_project_id(config: &Config) -> Option<String> {
    non_empty_env("SIFT_NLU_PROJECT_ID").or_else(|| {
        config
            .nlu
            .project_id
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Build the middleware configuration. Fails when credentials or project id are missing.
pub fn nlu_config(config: &Config) -> Result<NluConfig> {
    let credentials = resolve_credentials(config).context(
        "nlu credentials not configured (set nlu.credentials or SIFT_NLU_CREDENTIALS)",
    )?;
    let project_id = resolve_project_id(config)
        .context("nlu project id not configured (set nlu.projectId or SIFT_NLU_PROJECT_ID)")?;
    Ok(NluConfig {
        language: config.nlu.language.trim().to_string(),
        listen_for_action: config.nlu.listen_for_action,
        endpoint: config.nlu.endpoint.trim().to_string(),
        ..NluConfig::new(credentials, project_id)
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SIFT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".sift").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or SIFT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let n = NluSettings::default();
        assert_eq!(n.language, "en");
        assert!(!n.listen_for_action);
        assert_eq!(n.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn parses_camel_case_and_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"nlu": {"credentials": "/etc/sift/token", "projectId": "pizza-bot", "listenForAction": true}}"#,
        )
        .unwrap();
        assert_eq!(config.nlu.project_id.as_deref(), Some("pizza-bot"));
        assert!(config.nlu.listen_for_action);
        assert_eq!(config.nlu.language, "en");
        assert_eq!(config.nlu.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn empty_object_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.nlu.credentials.is_none());
    }

    #[test]
    fn nlu_config_carries_settings() {
        let mut config = Config::default();
        config.nlu.credentials = Some("ya29.inline".to_string());
        config.nlu.project_id = Some("pizza-bot".to_string());
        config.nlu.language = " de ".to_string();
        config.nlu.listen_for_action = true;
        let nlu = nlu_config(&config).unwrap();
        assert_eq!(nlu.language, "de");
        assert!(nlu.listen_for_action);
        assert_eq!(nlu.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("sift-missing-{}.json", uuid::Uuid::new_v4()));
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert!(config.nlu.project_id.is_none());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("sift-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config(Some(path.clone())).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
        let _ = std::fs::remove_file(path);
    }
}
