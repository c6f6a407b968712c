//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::worker::activity::FailureWrites;
use crate::worker::retry::RetryPolicy;

/// Shot count used when `QT_SHOTS` is unset.
pub const DEFAULT_SHOTS: u32 = 1024;

/// Largest accepted circuit payload (1 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1_048_576;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

/// Service configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    /// Samples per circuit execution; result counts sum to this.
    pub shots: u32,
    pub max_payload_bytes: usize,
    /// Largest circuit the built-in simulator accepts.
    pub max_qubits: usize,
    pub retry: RetryPolicy,
    /// How long submission waits for a run to acknowledge its start.
    pub start_timeout: Duration,
    pub failure_writes: FailureWrites,
    pub cors_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            db_path: PathBuf::from("./data/quantum-tasks.db"),
            shots: DEFAULT_SHOTS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_qubits: 20,
            retry: RetryPolicy::default(),
            start_timeout: Duration::from_secs(5),
            failure_writes: FailureWrites::default(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let retry = RetryPolicy {
            max_attempts: parse_or(&lookup, "QT_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
            initial_interval: Duration::from_millis(parse_or(
                &lookup,
                "QT_RETRY_INITIAL_MS",
                defaults.retry.initial_interval.as_millis() as u64,
            )?),
            backoff_coefficient: parse_or(
                &lookup,
                "QT_RETRY_BACKOFF",
                defaults.retry.backoff_coefficient,
            )?,
            max_interval: parse_opt::<u64>(&lookup, "QT_RETRY_MAX_INTERVAL_MS")?
                .map(Duration::from_millis),
            start_to_close_timeout: Duration::from_secs(parse_or(
                &lookup,
                "QT_RUN_TIMEOUT_SECS",
                defaults.retry.start_to_close_timeout.as_secs(),
            )?),
        };

        if retry.max_attempts == 0 {
            return Err(invalid("QT_MAX_ATTEMPTS", "must be at least 1"));
        }
        if !retry.backoff_coefficient.is_finite() || retry.backoff_coefficient < 1.0 {
            return Err(invalid("QT_RETRY_BACKOFF", "must be a finite number >= 1.0"));
        }

        let shots: u32 = parse_or(&lookup, "QT_SHOTS", defaults.shots)?;
        if shots == 0 {
            return Err(invalid("QT_SHOTS", "must be at least 1"));
        }

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            bind_addr: parse_or(&lookup, "QT_BIND_ADDR", defaults.bind_addr)?,
            db_path: lookup("QT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            shots,
            max_payload_bytes: parse_or(
                &lookup,
                "QT_MAX_PAYLOAD_BYTES",
                defaults.max_payload_bytes,
            )?,
            max_qubits: parse_or(&lookup, "QT_MAX_QUBITS", defaults.max_qubits)?,
            retry,
            start_timeout: Duration::from_millis(parse_or(
                &lookup,
                "QT_START_TIMEOUT_MS",
                defaults.start_timeout.as_millis() as u64,
            )?),
            failure_writes: parse_or(&lookup, "QT_FAILURE_WRITES", defaults.failure_writes)?,
            cors_origins,
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_opt<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| invalid(key, format!("'{raw}': {e}"))),
        _ => Ok(None),
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}
