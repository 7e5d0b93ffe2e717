use config::{Config, ConfigError, Environment, File, Map};
use dropbox_api::{OAuthClient, AUTHORIZE_URL, TOKEN_URL};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::FlowError;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Where the token files are written; defaults to the executable's directory
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Env file the user is told to paste the snippet into
    #[serde(default = "default_env_file")]
    pub env_file: String,
}

fn default_authorize_url() -> String {
    AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    TOKEN_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_env_file() -> String {
    ".env.local".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("DROPBOX_TOKEN_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        Self::load(&config_path)
    }

    /// Layer the optional TOML file at `config_path` under `DROPBOX_TOKEN_*` env vars
    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        Self::load_with(config_path, None)
    }

    /// Like [`Settings::load`], reading env vars from `env` instead of the process when given
    pub fn load_with(
        config_path: &str,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix("DROPBOX_TOKEN")
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        for (key, value) in [
            ("authorize_url", &self.authorize_url),
            ("token_url", &self.token_url),
        ] {
            if value.is_empty() {
                return Err(format!("{} is required", key));
            }
            let scheme = Url::parse(value)
                .map(|url| url.scheme().to_string())
                .unwrap_or_default();
            if scheme != "http" && scheme != "https" {
                return Err(format!("{} must be a valid HTTP(S) URL", key));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured output directory, or the directory holding the running executable
    pub fn output_dir(&self) -> Result<PathBuf, FlowError> {
        if let Some(dir) = &self.output_dir {
            return Ok(dir.clone());
        }

        let exe = std::env::current_exe()?;
        exe.parent().map(PathBuf::from).ok_or_else(|| {
            FlowError::Configuration(format!(
                "Could not determine directory of {}",
                exe.display()
            ))
        })
    }

    pub fn oauth_client(&self) -> Result<OAuthClient, FlowError> {
        Ok(OAuthClient::new(
            &self.authorize_url,
            &self.token_url,
            self.request_timeout(),
        )?)
    }
}
