//! Configuration loading from eatlog.toml and the environment.

use runtime::providers::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use runtime::{DEFAULT_MAX_ITERATIONS, ToolFidelity};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub sessions: SessionsConfig,
    pub agent: AgentConfig,
    pub database: DatabaseConfig,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

/// Model provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// Usually supplied through `EATLOG_API_KEY` rather than the file.
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// `full` or `schemaless`.
    pub tool_fidelity: ToolFidelity,
    pub disable_thinking: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_tokens: 1000,
            temperature: 0.1,
            tool_fidelity: ToolFidelity::Full,
            disable_thinking: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub max_sessions: usize,
    pub session_timeout_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            session_timeout_secs: 3600,
        }
    }
}

impl SessionsConfig {
    pub fn to_runtime(&self) -> runtime::SessionConfig {
        runtime::SessionConfig {
            max_sessions: self.max_sessions,
            session_timeout: Duration::from_secs(self.session_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Defaults to `agent_records.db` in the data directory.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `EATLOG_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("EATLOG_API_KEY").or_else(|| lookup("ZHIPUAI_API_KEY")) {
            self.model.api_key = Some(key);
        }
        if let Some(model) = lookup("EATLOG_MODEL") {
            self.model.model = model;
        }
        if let Some(value) = lookup("EATLOG_MAX_TOKENS") {
            self.model.max_tokens = parse_env("EATLOG_MAX_TOKENS", &value)?;
        }
        if let Some(value) = lookup("EATLOG_TEMPERATURE") {
            self.model.temperature = parse_env("EATLOG_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("EATLOG_MAX_SESSIONS") {
            self.sessions.max_sessions = parse_env("EATLOG_MAX_SESSIONS", &value)?;
        }
        if let Some(value) = lookup("EATLOG_SESSION_TIMEOUT") {
            self.sessions.session_timeout_secs = parse_env("EATLOG_SESSION_TIMEOUT", &value)?;
        }
        if let Some(path) = lookup("EATLOG_DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// The API key, which must be configured before chatting.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.model
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Database path, resolved against `data_dir` when not configured.
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join("agent_records.db"))
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("API key not configured: set EATLOG_API_KEY or model.api_key in eatlog.toml")]
    MissingApiKey,
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.model.model, DEFAULT_MODEL);
        assert_eq!(config.model.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model.max_tokens, 1000);
        assert_eq!(config.sessions.max_sessions, 100);
        assert_eq!(config.sessions.session_timeout_secs, 3600);
        assert_eq!(config.agent.max_iterations, 10);
        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
        assert_eq!(config.model.tool_fidelity, ToolFidelity::Full);
    }

    #[test]
    fn parse_partial_file() {
        let config = Config::parse(
            r#"
            log_level = "debug"

            [model]
            model = "glm-4-plus"
            tool_fidelity = "schemaless"

            [sessions]
            max_sessions = 5

            [database]
            path = "/tmp/meals.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.model.model, "glm-4-plus");
        assert_eq!(config.model.temperature, 0.1);
        assert_eq!(config.model.tool_fidelity, ToolFidelity::Schemaless);
        assert_eq!(config.sessions.max_sessions, 5);
        assert_eq!(config.sessions.session_timeout_secs, 3600);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(
            config.database_path(Path::new("/data")),
            PathBuf::from("/tmp/meals.db")
        );
    }

    #[test]
    fn parse_error() {
        let err = Config::parse("[model\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_fidelity_is_a_parse_error() {
        let err = Config::parse("[model]\ntool_fidelity = \"rich\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("rich"));
    }

    #[test]
    fn env_overrides() {
        let config = Config::default()
            .with_overrides(env(&[
                ("EATLOG_API_KEY", "secret"),
                ("EATLOG_MODEL", "glm-4-air"),
                ("EATLOG_MAX_TOKENS", "2048"),
                ("EATLOG_TEMPERATURE", "0.7"),
                ("EATLOG_MAX_SESSIONS", "3"),
                ("EATLOG_SESSION_TIMEOUT", "60"),
                ("EATLOG_DATABASE_PATH", "/var/eatlog.db"),
            ]))
            .unwrap();

        assert_eq!(config.api_key().unwrap(), "secret");
        assert_eq!(config.model.model, "glm-4-air");
        assert_eq!(config.model.max_tokens, 2048);
        assert_eq!(config.model.temperature, 0.7);
        assert_eq!(config.sessions.to_runtime().max_sessions, 3);
        assert_eq!(
            config.sessions.to_runtime().session_timeout,
            Duration::from_secs(60)
        );
        assert_eq!(config.database.path, Some(PathBuf::from("/var/eatlog.db")));
    }

    #[test]
    fn zhipuai_key_is_a_fallback() {
        let config = Config::default()
            .with_overrides(env(&[("ZHIPUAI_API_KEY", "zp")]))
            .unwrap();
        assert_eq!(config.api_key().unwrap(), "zp");

        let config = Config::default()
            .with_overrides(env(&[("ZHIPUAI_API_KEY", "zp"), ("EATLOG_API_KEY", "el")]))
            .unwrap();
        assert_eq!(config.api_key().unwrap(), "el");
    }

    #[test]
    fn bad_env_number_is_rejected() {
        let err = Config::default()
            .with_overrides(env(&[("EATLOG_MAX_SESSIONS", "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                var: "EATLOG_MAX_SESSIONS",
                ..
            }
        ));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = Config::default()
            .with_overrides(env(&[("EATLOG_MODEL", "  ")]))
            .unwrap();
        assert_eq!(config.model.model, DEFAULT_MODEL);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("eatlog.toml")).unwrap();
        assert_eq!(config.model.model, DEFAULT_MODEL);
        assert_eq!(
            config.database_path(dir.path()),
            dir.path().join("agent_records.db")
        );
    }
}
