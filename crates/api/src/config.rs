//! Process configuration, read from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `POSTS_PER_PAGE` | `25` |
//! | `TASK_TIMEOUT_SECS` | `600` |
//! | `STALE_TASK_SECS` | `3600` (at least `TASK_TIMEOUT_SECS`, at most ten years) |
//! | `REAPER_INTERVAL_SECS` | `60` |
//! | `LOG_FORMAT` | `json` (`json` or `pretty`) |

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use haulboard_observability::LogFormat;

const MAX_STALE_TASK_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {var}='{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Page size for timelines, explore, user pages, search and the inbox.
    pub posts_per_page: usize,
    /// Upper bound on a single background job.
    pub task_timeout: Duration,
    /// Active tasks older than this are failed as abandoned.
    pub stale_task_after: Duration,
    pub reaper_interval: Duration,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            posts_per_page: 25,
            task_timeout: Duration::from_secs(600),
            stale_task_after: Duration::from_secs(3600),
            reaper_interval: Duration::from_secs(60),
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables
    /// take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            posts_per_page: positive_or(&lookup, "POSTS_PER_PAGE", defaults.posts_per_page as u64)? as usize,
            task_timeout: secs_or(&lookup, "TASK_TIMEOUT_SECS", defaults.task_timeout)?,
            stale_task_after: secs_or(&lookup, "STALE_TASK_SECS", defaults.stale_task_after)?,
            reaper_interval: secs_or(&lookup, "REAPER_INTERVAL_SECS", defaults.reaper_interval)?,
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks: the reaper must never abandon a task its runner
    /// may still finish, and its cutoff must stay inside the calendar.
    fn validate(&self) -> Result<(), ConfigError> {
        let stale = self.stale_task_after.as_secs();
        let invalid = |reason: String| ConfigError {
            var: "STALE_TASK_SECS",
            value: stale.to_string(),
            reason,
        };
        if stale > MAX_STALE_TASK_SECS {
            return Err(invalid(format!("must be at most {MAX_STALE_TASK_SECS}")));
        }
        if self.stale_task_after < self.task_timeout {
            return Err(invalid(format!(
                "must be at least TASK_TIMEOUT_SECS ({})",
                self.task_timeout.as_secs()
            )));
        }
        Ok(())
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        _ => Ok(default),
    }
}

fn positive_or(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: u64) -> Result<u64, ConfigError> {
    let value: u64 = parse_or(lookup, var, default)?;
    if value == 0 {
        return Err(ConfigError {
            var,
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn secs_or(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    positive_or(lookup, var, default.as_secs()).map(Duration::from_secs)
}
