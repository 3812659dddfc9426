//! Runtime settings read from the environment (and a `.env` file, if present).

use anyhow::{bail, Context, Result};
use rand::{distributions::Alphanumeric, Rng};
use std::{net::SocketAddr, str::FromStr, time::Duration};

use crate::core::{
    StoreConfig, ALLOWED_TEAM_SIZES, COMPLETED_ROOM_GRACE_SECONDS, DEFAULT_TEAM_SIZE,
    IDLE_ROOM_TIMEOUT_SECONDS, MAX_CODE_ATTEMPTS, MAX_DELIVERY_FAILURES, MIN_PLAYERS,
    SUBSCRIBER_BUFFER, SWEEP_INTERVAL_SECONDS,
};

#[derive(Debug, Clone)]
pub struct Settings {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// "development" or "production"
    pub environment: String,
    /// Key seat tokens are signed with
    pub secret_key: String,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    pub min_players: usize,
    pub default_team_size: usize,
    pub idle_room_timeout: Duration,
    pub completed_room_grace: Duration,
    pub sweep_interval: Duration,
    pub subscriber_buffer: usize,
    pub max_delivery_failures: u32,
    pub request_timeout: Duration,
    /// Requests per second per client IP on the API routes
    pub rate_limit_per_second: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: "production".to_string(),
            secret_key: generate_secret_key(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            min_players: MIN_PLAYERS,
            default_team_size: DEFAULT_TEAM_SIZE,
            idle_room_timeout: Duration::from_secs(IDLE_ROOM_TIMEOUT_SECONDS),
            completed_room_grace: Duration::from_secs(COMPLETED_ROOM_GRACE_SECONDS),
            sweep_interval: Duration::from_secs(SWEEP_INTERVAL_SECONDS),
            subscriber_buffer: SUBSCRIBER_BUFFER,
            max_delivery_failures: MAX_DELIVERY_FAILURES,
            request_timeout: Duration::from_secs(10),
            rate_limit_per_second: 50,
        }
    }
}

/// Random 64 character key, used when `SECRET_KEY` is unset
///
/// Tokens then only survive as long as the process, which matches the
/// lifetime of the rooms they point into.
pub fn generate_secret_key() -> String {
    rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Read and parse `key`, keeping `default` when it is unset or blank
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}: {}", key, e))
            .with_context(|| format!("invalid value {:?} for {}", raw, key)),
        _ => Ok(default),
    }
}

fn env_secs(key: &str, default: Duration) -> Result<Duration> {
    env_or(key, default.as_secs()).map(Duration::from_secs)
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        // .env is optional
        let _ = dotenvy::dotenv();

        let defaults = Settings::default();

        let secret_key = match std::env::var("SECRET_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => {
                tracing::info!("SECRET_KEY not set, generated a per-process key");
                defaults.secret_key
            }
        };

        let allowed_origins = match std::env::var("ALLOWED_ORIGINS") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => defaults.allowed_origins,
        };

        let settings = Self {
            host: env_or("HOST", defaults.host)?,
            port: env_or("PORT", defaults.port)?,
            environment: env_or("ENVIRONMENT", defaults.environment)?,
            secret_key,
            allowed_origins,
            min_players: env_or("TABOO_MIN_PLAYERS", defaults.min_players)?,
            default_team_size: env_or("TABOO_DEFAULT_TEAM_SIZE", defaults.default_team_size)?,
            idle_room_timeout: env_secs(
                "TABOO_IDLE_ROOM_TIMEOUT_SECS",
                defaults.idle_room_timeout,
            )?,
            completed_room_grace: env_secs(
                "TABOO_COMPLETED_ROOM_GRACE_SECS",
                defaults.completed_room_grace,
            )?,
            sweep_interval: env_secs("TABOO_SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
            subscriber_buffer: env_or("TABOO_SUBSCRIBER_BUFFER", defaults.subscriber_buffer)?,
            max_delivery_failures: env_or(
                "TABOO_MAX_DELIVERY_FAILURES",
                defaults.max_delivery_failures,
            )?,
            request_timeout: env_secs("TABOO_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            rate_limit_per_second: env_or(
                "TABOO_RATE_LIMIT_PER_SECOND",
                defaults.rate_limit_per_second,
            )?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_TEAM_SIZES.contains(&self.default_team_size) {
            bail!(
                "TABOO_DEFAULT_TEAM_SIZE must be one of {:?}, got {}",
                ALLOWED_TEAM_SIZES,
                self.default_team_size
            );
        }
        // Creators may pick any allowed team size, so the smallest room must
        // still be able to start
        let smallest_room = ALLOWED_TEAM_SIZES.iter().min().copied().unwrap_or(0) * 2;
        if self.min_players == 0 || self.min_players > smallest_room {
            bail!(
                "TABOO_MIN_PLAYERS must be between 1 and {}, got {}",
                smallest_room,
                self.min_players
            );
        }
        if self.subscriber_buffer == 0 {
            bail!("TABOO_SUBSCRIBER_BUFFER must be positive");
        }
        if self.max_delivery_failures == 0 {
            bail!("TABOO_MAX_DELIVERY_FAILURES must be positive");
        }
        if self.sweep_interval.is_zero() {
            bail!("TABOO_SWEEP_INTERVAL_SECS must be positive");
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment.to_ascii_lowercase().as_str(), "development" | "dev")
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            min_players: self.min_players,
            default_team_size: self.default_team_size,
            max_code_attempts: MAX_CODE_ATTEMPTS,
            idle_timeout: self.idle_room_timeout,
            completed_grace: self.completed_room_grace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();

        assert!(settings.validate().is_ok());
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.secret_key.len(), 64);
        assert!(!settings.is_development());
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(generate_secret_key(), generate_secret_key());
    }

    #[test]
    fn test_validate_rejects_bad_team_size() {
        let settings = Settings {
            default_team_size: 5,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unreachable_min_players() {
        let settings = Settings {
            min_players: 9,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_min_players_against_smallest_team_size() {
        let too_many = Settings {
            min_players: 7,
            ..Settings::default()
        };
        assert!(too_many.validate().is_err());

        let fits = Settings {
            min_players: 6,
            ..Settings::default()
        };
        assert!(fits.validate().is_ok());
    }

    #[test]
    fn test_bind_addr() {
        let settings = Settings {
            host: "127.0.0.1".to_string(),
            port: 9000,
            ..Settings::default()
        };
        assert_eq!(settings.bind_addr().unwrap().port(), 9000);
    }

    #[test]
    fn test_store_config_mirrors_settings() {
        let settings = Settings {
            min_players: 4,
            idle_room_timeout: Duration::from_secs(60),
            ..Settings::default()
        };
        let config = settings.store_config();

        assert_eq!(config.min_players, 4);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_env_or_uses_default_when_unset() {
        let value: u16 = env_or("TABOO_TEST_SURELY_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
