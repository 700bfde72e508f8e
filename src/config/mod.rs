//! Server configuration.
//!
//! Configuration is environment-sourced (with `.env` loaded by `main`
//! before this runs). The upstream endpoint is overridable so tests can
//! point the relay at a local fake.

use thiserror::Error;

use crate::core::live::{self, LiveConfig};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `GEMINI_API_KEY` is not set.
    #[error("missing GEMINI_API_KEY in environment")]
    MissingApiKey,

    /// A numeric variable did not parse.
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Upstream Live session parameters.
    pub live: LiveConfig,
    /// Directory served as the client bundle.
    pub static_dir: String,
    /// CORS allowed origins ("*" for all).
    pub cors_allowed_origins: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `8080` |
    /// | `GEMINI_API_KEY` | required |
    /// | `MODEL` | native audio dialog model |
    /// | `SYSTEM_INSTRUCTION` | "Rev" persona |
    /// | `GEMINI_LIVE_URL` | production Live endpoint |
    /// | `STATIC_DIR` | `public` |
    /// | `CORS_ALLOWED_ORIGINS` | `*` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_var("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let port = match env_var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw,
            })?,
            None => 8080,
        };

        let mut live = LiveConfig::new(api_key);
        if let Some(url) = env_var("GEMINI_LIVE_URL") {
            live.url = url;
        }
        if let Some(model) = env_var("MODEL") {
            live.model = model;
        }
        if let Some(instruction) = env_var("SYSTEM_INSTRUCTION") {
            live.system_instruction = instruction;
        }

        Ok(Self {
            host: env_var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            live,
            static_dir: env_var("STATIC_DIR").unwrap_or_else(|| "public".to_string()),
            cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string()),
        })
    }

    /// Socket address string for binding.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
