//! Environment-driven server configuration.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_ROOM_ID_LEN: usize = 8;
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub bind_addr: SocketAddr,
    pub room_id_len: usize,
    pub ping_interval: Duration,
    pub cors_origins: CorsOrigins,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            room_id_len: DEFAULT_ROOM_ID_LEN,
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            cors_origins: CorsOrigins::Any,
        }
    }
}

impl SignalConfig {
    /// Reads `SIGNAL_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_var(&lookup, "SIGNAL_BIND_ADDR", DEFAULT_BIND_ADDR)?;

        let room_id_len: usize = parse_var(
            &lookup,
            "SIGNAL_ROOM_ID_LEN",
            &DEFAULT_ROOM_ID_LEN.to_string(),
        )?;
        if room_id_len == 0 {
            return Err(invalid("SIGNAL_ROOM_ID_LEN", "0", "must be at least 1"));
        }

        let ping_secs: u64 = parse_var(
            &lookup,
            "SIGNAL_PING_INTERVAL_SECS",
            &DEFAULT_PING_INTERVAL_SECS.to_string(),
        )?;
        if ping_secs == 0 {
            return Err(invalid("SIGNAL_PING_INTERVAL_SECS", "0", "must be at least 1"));
        }

        let cors_origins = parse_origins(lookup("SIGNAL_CORS_ORIGINS").as_deref().unwrap_or("*"));

        Ok(Self {
            bind_addr,
            room_id_len,
            ping_interval: Duration::from_secs(ping_secs),
            cors_origins,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, &raw, &e.to_string()))
}

fn parse_origins(raw: &str) -> CorsOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
