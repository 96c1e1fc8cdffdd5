use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::Duration;

use crate::models::consent::{CONSENT_COOKIE_NAME, CONSENT_MAX_AGE_DAYS};

/// Upper bound for `CONSENT_MAX_AGE_DAYS` (ten years).
pub const MAX_CONSENT_MAX_AGE_DAYS: i64 = 3650;

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The address the server listens on.
    pub bind_addr: SocketAddr,
    /// Whether the consent cookie is restricted to secure transport.
    pub secure_cookies: bool,
    /// The name of the consent cookie.
    pub consent_cookie_name: String,
    /// How long a consent decision is retained, in days.
    pub consent_max_age_days: i64,
    /// Origins allowed to call the API with credentials.
    pub cors_origins: Vec<String>,
    /// Whether consent-mode commands are produced for the tag manager.
    pub consent_mode_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            secure_cookies: true,
            consent_cookie_name: CONSENT_COOKIE_NAME.to_string(),
            consent_max_age_days: CONSENT_MAX_AGE_DAYS,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            consent_mode_enabled: true,
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be a boolean, got {:?}", name, other),
    }
}

fn parse_max_age_days(value: &str) -> Result<i64> {
    let days: i64 = value
        .trim()
        .parse()
        .context("Invalid CONSENT_MAX_AGE_DAYS")?;

    if !(1..=MAX_CONSENT_MAX_AGE_DAYS).contains(&days) {
        anyhow::bail!(
            "CONSENT_MAX_AGE_DAYS must be between 1 and {}, got {}",
            MAX_CONSENT_MAX_AGE_DAYS,
            days
        );
    }

    Ok(days)
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        // Only an explicit opt-out drops the Secure attribute.
        let secure_cookies = match env::var("CONSENT_SECURE_COOKIE") {
            Ok(value) => parse_bool("CONSENT_SECURE_COOKIE", &value)?,
            Err(_) => defaults.secure_cookies,
        };

        let consent_max_age_days = parse_max_age_days(
            &env::var("CONSENT_MAX_AGE_DAYS").unwrap_or_else(|_| CONSENT_MAX_AGE_DAYS.to_string()),
        )?;

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(value) => value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => defaults.cors_origins,
        };

        let consent_mode_enabled = match env::var("CONSENT_MODE_ENABLED") {
            Ok(value) => parse_bool("CONSENT_MODE_ENABLED", &value)?,
            Err(_) => true,
        };

        Ok(Self {
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| defaults.bind_addr.to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            secure_cookies,
            consent_cookie_name: env::var("CONSENT_COOKIE_NAME")
                .unwrap_or(defaults.consent_cookie_name),
            consent_max_age_days,
            cors_origins,
            consent_mode_enabled,
        })
    }

    /// The consent retention period. Out-of-range values clamp to the
    /// accepted bounds instead of overflowing.
    pub fn consent_max_age(&self) -> Duration {
        Duration::days(self.consent_max_age_days.clamp(1, MAX_CONSENT_MAX_AGE_DAYS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", " ON ").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.secure_cookies);
        assert_eq!(config.consent_cookie_name, "cookie-consent");
        assert_eq!(config.consent_max_age(), Duration::days(365));
    }

    #[test]
    fn test_from_env_defaults_to_secure_cookies() {
        // SAFETY: no other test in this crate touches this variable.
        unsafe {
            env::remove_var("CONSENT_SECURE_COOKIE");
        }
        let config = Config::from_env().unwrap();
        assert!(config.secure_cookies);
    }

    #[test]
    fn test_parse_max_age_days_bounds() {
        assert_eq!(parse_max_age_days("365").unwrap(), 365);
        assert_eq!(parse_max_age_days(" 3650 ").unwrap(), 3650);
        assert!(parse_max_age_days("0").is_err());
        assert!(parse_max_age_days("-5").is_err());
        assert!(parse_max_age_days("3651").is_err());
        assert!(parse_max_age_days("200000000000000").is_err());
        assert!(parse_max_age_days("a year").is_err());
    }

    #[test]
    fn test_consent_max_age_never_overflows() {
        let config = Config {
            consent_max_age_days: 200_000_000_000_000,
            ..Config::default()
        };
        assert_eq!(config.consent_max_age(), Duration::days(MAX_CONSENT_MAX_AGE_DAYS));
    }
}
