//! Hub configuration loaded from environment variables
//!
//! | Variable                  | Default           |
//! |---------------------------|-------------------|
//! | `PINMAP_HOST`             | `0.0.0.0`         |
//! | `PINMAP_PORT`             | `5000`            |
//! | `PINMAP_SEND_QUEUE`       | `64`              |
//! | `PINMAP_WRITE_TIMEOUT_MS` | `5000`            |
//! | `PINMAP_LOG` / `RUST_LOG` | `pinmap_hub=info` |
//! | `PINMAP_JSON_LOGS`        | `false`           |

use std::str::FromStr;
use std::time::Duration;

use crate::api::websocket::registry::DEFAULT_SEND_QUEUE;
use crate::types::{HubError, HubResult};

const DEFAULT_LOG_FILTER: &str = "pinmap_hub=info,pinmap_server=info,tower_http=warn";

#[derive(Clone, Debug)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    /// Frames buffered per connection before it counts as too slow
    pub send_queue: usize,
    /// Upper bound on a single socket write
    pub write_timeout: Duration,
    pub log_filter: String,
    pub json_logs: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            send_queue: DEFAULT_SEND_QUEUE,
            write_timeout: Duration::from_millis(5000),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            json_logs: false,
        }
    }
}

impl HubConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> HubResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> HubResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("PINMAP_HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);
        let port = parse_var(&lookup, "PINMAP_PORT", defaults.port)?;
        let send_queue: usize = parse_var(&lookup, "PINMAP_SEND_QUEUE", defaults.send_queue)?;
        if send_queue == 0 {
            return Err(HubError::Config {
                key: "PINMAP_SEND_QUEUE".to_string(),
                value: "0".to_string(),
            });
        }
        let write_timeout_ms = parse_var(
            &lookup,
            "PINMAP_WRITE_TIMEOUT_MS",
            defaults.write_timeout.as_millis() as u64,
        )?;
        if write_timeout_ms == 0 {
            return Err(HubError::Config {
                key: "PINMAP_WRITE_TIMEOUT_MS".to_string(),
                value: "0".to_string(),
            });
        }
        let log_filter = lookup("PINMAP_LOG")
            .or_else(|| lookup("RUST_LOG"))
            .unwrap_or(defaults.log_filter);
        let json_logs = match lookup("PINMAP_JSON_LOGS") {
            Some(raw) => parse_bool("PINMAP_JSON_LOGS", &raw)?,
            None => defaults.json_logs,
        };

        Ok(Self {
            host,
            port,
            send_queue,
            write_timeout: Duration::from_millis(write_timeout_ms),
            log_filter,
            json_logs,
        })
    }

    /// `host:port` string suitable for `TcpListener::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> HubResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| HubError::Config {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> HubResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(HubError::Config {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
