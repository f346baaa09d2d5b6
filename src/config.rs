//! Process-wide configuration, read once at startup.
//!
//! Everything downstream receives configuration explicitly —
//! [`Generator`](crate::generator::Generator) is built from an [`AppConfig`]
//! (or a builder in tests) and never touches the environment at call time.

use crate::backend::groq::GROQ_BASE_URL;
use crate::error::{GenerateError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default completion model identifier.
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";

/// Startup configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Completion API credential. `None` lets the server boot; every
    /// `/generate/` call then fails with the provider's own auth error.
    pub api_key: Option<String>,
    /// Completion provider base URL.
    pub base_url: String,
    /// Completion model identifier.
    pub model: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Static document served at `/`.
    pub index_path: PathBuf,
    /// HTTP client timeout for completion calls.
    pub timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: GROQ_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            index_path: PathBuf::from("index.html"),
            timeout: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    /// Build configuration from the environment.
    ///
    /// `GROQ_API_KEY` carries the credential; `FLOWPIPER_*` variables
    /// override the rest. Unset variables fall back to defaults; variables
    /// that fail to parse are configuration errors, not silent fallbacks.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("FLOWPIPER_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| GenerateError::InvalidConfig(format!("FLOWPIPER_PORT: {raw}")))?,
            Err(_) => defaults.port,
        };
        let timeout = match std::env::var("FLOWPIPER_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                GenerateError::InvalidConfig(format!("FLOWPIPER_TIMEOUT_SECS: {raw}"))
            })?),
            Err(_) => defaults.timeout,
        };

        Ok(Self {
            api_key: std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env_or("FLOWPIPER_BASE_URL", defaults.base_url),
            model: env_or("FLOWPIPER_MODEL", defaults.model),
            host: env_or("FLOWPIPER_HOST", defaults.host),
            port,
            index_path: PathBuf::from(env_or(
                "FLOWPIPER_INDEX",
                defaults.index_path.to_string_lossy().into_owned(),
            )),
            timeout,
        })
    }

    /// The bind address as `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The test harness runs in parallel; environment mutation needs a lock.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url, GROQ_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.addr(), "127.0.0.1:8000");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("FLOWPIPER_MODEL", "mixtral-8x7b-32768");
        std::env::set_var("FLOWPIPER_PORT", "9100");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.model, "mixtral-8x7b-32768");
        assert_eq!(config.port, 9100);
        std::env::remove_var("FLOWPIPER_MODEL");
        std::env::remove_var("FLOWPIPER_PORT");
    }

    #[test]
    fn test_from_env_rejects_bad_port() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("FLOWPIPER_PORT", "not-a-port");
        let err = AppConfig::from_env().unwrap_err();
        std::env::remove_var("FLOWPIPER_PORT");
        assert!(matches!(err, GenerateError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_api_key_treated_as_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("GROQ_API_KEY", "");
        let config = AppConfig::from_env().unwrap();
        std::env::remove_var("GROQ_API_KEY");
        assert!(config.api_key.is_none());
    }
}
