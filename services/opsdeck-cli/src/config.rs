//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The login password
//! is loaded from the OPSDECK_PASSWORD env var only, never stored in the
//! TOML, to keep secrets out of config files.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Platform API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Credential file settings
#[derive(Debug, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_credentials_path")]
    pub path: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("opsdeck-credentials.json")
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: default_credentials_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables. A missing file is not an error; defaults apply.
    pub fn load(path: &Path) -> common::Result<Self> {
        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            Config {
                api: ApiConfig::default(),
                credentials: CredentialsConfig::default(),
            }
        };

        if let Ok(url) = std::env::var("OPSDECK_API_URL") {
            config.api.base_url = url;
        }
        if let Ok(credentials_path) = std::env::var("OPSDECK_CREDENTIALS") {
            config.credentials.path = PathBuf::from(credentials_path);
        }

        Ok(config)
    }

    /// Resolve the config file path: `--config` arg, then OPSDECK_CONFIG,
    /// then the default filename in the working directory.
    pub fn resolve_path(cli_arg: Option<&str>) -> PathBuf {
        if let Some(p) = cli_arg {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("OPSDECK_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("opsdeck.toml")
    }

    /// The login password, from OPSDECK_PASSWORD only.
    pub fn password() -> Option<Secret<String>> {
        std::env::var("OPSDECK_PASSWORD").ok().map(Secret::new)
    }
}
