//! Configuration loading.
//!
//! ```toml
//! [extraction]
//! api_key = "${GEMINI_API_KEY}"
//! model = "gemini-2.5-flash"
//! base_url = "https://generativelanguage.googleapis.com/v1beta"
//! ```
//!
//! `GEMINI_API_KEY` (then `API_KEY`) in the environment overrides the file.

use medtrack_llm::ClientConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variables checked for the API credential, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
pub struct MedTrackConfig {
    pub extraction: Option<ExtractionConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
pub struct ExtractionConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl MedTrackConfig {
    /// `<config dir>/medtrack/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("medtrack").join("config.toml"))
    }

    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> ConfigResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Extraction client settings, with process environment overrides.
    pub fn client_config(&self) -> ClientConfig {
        self.client_config_with(|var| std::env::var(var).ok())
    }

    /// Extraction client settings, resolving variables through `lookup`.
    pub fn client_config_with<F>(&self, lookup: F) -> ClientConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();
        let section = self.extraction.clone().unwrap_or_default();

        if let Some(model) = section.model.filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(base_url) = section.base_url.filter(|u| !u.trim().is_empty()) {
            config.base_url = base_url;
        }

        let from_env = API_KEY_ENV_VARS
            .iter()
            .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()));
        let from_file = section
            .api_key
            .map(|key| expand_env_vars_with(&key, &lookup))
            .filter(|key| !key.trim().is_empty());
        config.api_key = from_env.or(from_file);

        config
    }
}

/// Expand `${VAR}` references from the process environment.
pub fn expand_env_vars(value: &str) -> String {
    expand_env_vars_with(value, |var| std::env::var(var).ok())
}

/// Expand `${VAR}` references through `lookup`. Unset variables expand to "".
pub fn expand_env_vars_with<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&lookup(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated reference stays literal
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_expand_env_vars() {
        let lookup = env(&[("KEY", "secret")]);
        assert_eq!(expand_env_vars_with("${KEY}", &lookup), "secret");
        assert_eq!(expand_env_vars_with("a-${KEY}-b", &lookup), "a-secret-b");
        assert_eq!(expand_env_vars_with("${MISSING}", &lookup), "");
        assert_eq!(expand_env_vars_with("${}x", &lookup), "x");
        assert_eq!(expand_env_vars_with("${KEY", &lookup), "${KEY");
        assert_eq!(expand_env_vars_with("plain", &lookup), "plain");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = MedTrackConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, MedTrackConfig::default());
    }

    #[test]
    fn test_load_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[extraction]
api_key = "${MY_KEY}"
model = "gemini-2.5-pro"
"#,
        )
        .unwrap();

        let config = MedTrackConfig::load_from(&path).unwrap();
        let client = config.client_config_with(env(&[("MY_KEY", "from-file")]));

        assert_eq!(client.api_key.as_deref(), Some("from-file"));
        assert_eq!(client.model, "gemini-2.5-pro");
        assert_eq!(client.base_url, medtrack_llm::GEMINI_API_BASE_URL);
    }

    #[test]
    fn test_env_overrides_file() {
        let config = MedTrackConfig {
            extraction: Some(ExtractionConfig {
                api_key: Some("file-key".into()),
                ..ExtractionConfig::default()
            }),
        };

        let client = config.client_config_with(env(&[("API_KEY", "legacy")]));
        assert_eq!(client.api_key.as_deref(), Some("legacy"));

        let client = config.client_config_with(env(&[("API_KEY", "legacy"), ("GEMINI_API_KEY", "gemini")]));
        assert_eq!(client.api_key.as_deref(), Some("gemini"));

        let client = config.client_config_with(env(&[]));
        assert_eq!(client.api_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_no_key_anywhere() {
        let client = MedTrackConfig::default().client_config_with(env(&[]));
        assert_eq!(client.api_key, None);
        assert_eq!(client.model, medtrack_llm::DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[extraction\napi_key = 1").unwrap();

        assert!(matches!(
            MedTrackConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
