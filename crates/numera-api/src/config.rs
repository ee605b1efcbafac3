//! Server configuration.

use numera_core::{Error, Redacted, Result};

/// CORS settings.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins; `["*"]` means any (debug only).
    pub allowed_origins: Vec<String>,
    /// Preflight cache lifetime in seconds.
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age_seconds: 3600,
        }
    }
}

/// API server configuration, environment-driven.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP listen port.
    pub http_port: u16,
    /// Debug mode: identity comes from `X-Actor-*` headers and CORS may be
    /// wide open.
    pub debug: bool,
    /// CORS settings.
    pub cors: CorsConfig,
    /// Static bearer token required on every API call outside debug mode.
    pub api_token: Option<Redacted<String>>,
    /// Shared secret the webhook peer must echo in
    /// `X-Telegram-Bot-Api-Secret-Token`.
    pub webhook_secret: Option<Redacted<String>>,
}

impl Config {
    /// Builds a config from the environment.
    ///
    /// Recognized variables:
    /// - `NUMERA_HTTP_PORT`
    /// - `NUMERA_DEBUG`
    /// - `NUMERA_CORS_ALLOWED_ORIGINS` (comma-separated, or `*`)
    /// - `NUMERA_CORS_MAX_AGE_SECONDS`
    /// - `NUMERA_API_TOKEN`
    /// - `NUMERA_WEBHOOK_SECRET`
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            http_port: 8080,
            ..Self::default()
        };

        if let Some(port) = env_u16("NUMERA_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("NUMERA_DEBUG")? {
            config.debug = debug;
        }
        if let Some(origins) = env_string("NUMERA_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(max_age) = env_u64("NUMERA_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }
        if let Some(token) = env_string("NUMERA_API_TOKEN") {
            config.api_token = Some(Redacted::new(token));
        }
        if let Some(secret) = env_string("NUMERA_WEBHOOK_SECRET") {
            config.webhook_secret = Some(Redacted::new(secret));
        }

        Ok(config)
    }

    /// Enforces production guardrails.
    ///
    /// # Errors
    ///
    /// Returns an error when debug-only settings leak into a non-debug
    /// deployment.
    pub fn validate(&self) -> Result<()> {
        if !self.debug {
            if self.cors.allowed_origins.iter().any(|o| o == "*") {
                return Err(Error::validation(
                    "NUMERA_CORS_ALLOWED_ORIGINS cannot include '*' when debug is off",
                ));
            }
            if self.api_token.is_none() {
                return Err(Error::validation(
                    "NUMERA_API_TOKEN is required when debug is off",
                ));
            }
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    env_string(name)
        .map(|v| match v.trim() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(Error::validation(format!(
                "{name} must be a boolean, got {other:?}"
            ))),
        })
        .transpose()
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    env_string(name)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| Error::validation(format!("{name} must be a port number")))
        })
        .transpose()
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    env_string(name)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| Error::validation(format!("{name} must be an integer")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_cors_is_debug_only() {
        let mut config = Config {
            debug: false,
            api_token: Some(Redacted::new("token".to_string())),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.cors.allowed_origins = vec!["https://numera.example".to_string()];
        assert!(config.validate().is_ok());

        config.debug = true;
        config.cors.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn api_token_required_outside_debug() {
        let config = Config {
            debug: false,
            cors: CorsConfig {
                allowed_origins: vec!["https://numera.example".to_string()],
                max_age_seconds: 60,
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn secrets_do_not_leak_in_debug_output() {
        let config = Config {
            api_token: Some(Redacted::new("super-secret".to_string())),
            ..Config::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
    }
}
