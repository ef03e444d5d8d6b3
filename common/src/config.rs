// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};
use thiserror::Error;
use url::Url;

/// Server-only variable naming the backend origin
pub const BACKEND_URL_VAR: &str = "BACKEND_URL";
/// Public fallback for the backend origin
pub const PUBLIC_BACKEND_URL_VAR: &str = "PUBLIC_BACKEND_URL";

/// Errors raised when required configuration is absent or unusable
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Backend URL is not configured (set BACKEND_URL or PUBLIC_BACKEND_URL)")]
    MissingBackendUrl,
    #[error("Backend URL '{value}' is invalid: {source}")]
    InvalidBackendUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Central configuration for the web server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,
    pub backend: BackendConfig,
    pub auth_gate: AuthGateConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Server-only backend origin, preferred when set
    pub url: Option<String>,
    /// Public-exposed origin, used when `url` is absent
    pub public_url: Option<String>,
    pub timeout_secs: u64,
    pub max_body_bytes: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthGateConfig {
    pub protected_paths: Vec<String>,
    pub login_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            backend: BackendConfig::default(),
            auth_gate: AuthGateConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            public_url: None,
            timeout_secs: 30,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for AuthGateConfig {
    fn default() -> Self {
        Self {
            protected_paths: vec![
                "/dashboard".to_string(),
                "/assets".to_string(),
                "/inspections".to_string(),
                "/organizations".to_string(),
            ],
            login_path: "/login".to_string(),
        }
    }
}

impl BackendConfig {
    /// Resolve the backend origin, preferring the server-only value.
    /// Blank values count as unset.
    pub fn base_url(&self) -> Result<Url, ConfigurationError> {
        let raw = [self.url.as_deref(), self.public_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .ok_or(ConfigurationError::MissingBackendUrl)?;

        Url::parse(raw).map_err(|source| ConfigurationError::InvalidBackendUrl {
            value: raw.to_string(),
            source,
        })
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let mut config: Self = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Environment variables with prefix "APP", e.g. APP__BACKEND__TIMEOUT_SECS
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        config.apply_backend_env();
        Ok(config)
    }

    /// Load from files and environment, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let defaults = Self::default();

                let web_server_addr = env::var("WEB_SERVER_ADDR")
                    .unwrap_or(defaults.web_server_addr);

                let timeout_secs = env::var("BACKEND_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(defaults.backend.timeout_secs);

                let max_body_bytes = env::var("BACKEND_MAX_BODY_BYTES")
                    .ok()
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(defaults.backend.max_body_bytes);

                let protected_paths = env::var("AUTH_GATE_PROTECTED_PATHS")
                    .map(|v| {
                        v.split(',')
                            .map(str::trim)
                            .filter(|p| !p.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or(defaults.auth_gate.protected_paths);

                let login_path = env::var("AUTH_GATE_LOGIN_PATH")
                    .unwrap_or(defaults.auth_gate.login_path);

                let mut config = Self {
                    web_server_addr,
                    backend: BackendConfig {
                        url: None,
                        public_url: None,
                        timeout_secs,
                        max_body_bytes,
                    },
                    auth_gate: AuthGateConfig {
                        protected_paths,
                        login_path,
                    },
                };
                config.apply_backend_env();
                config
            }
        }
    }

    /// The two well-known backend variables override whatever the files said.
    fn apply_backend_env(&mut self) {
        if let Ok(url) = env::var(BACKEND_URL_VAR) {
            self.backend.url = Some(url);
        }
        if let Ok(url) = env::var(PUBLIC_BACKEND_URL_VAR) {
            self.backend.public_url = Some(url);
        }
    }
}
