//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::HubConfig;

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(config: &HubConfig) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|e| {
        eprintln!("[Logging] invalid filter {:?} ({e}), falling back to info", config.log_filter);
        EnvFilter::new("info")
    });

    let result = if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        let config = HubConfig {
            log_filter: "not a [valid filter".to_string(),
            ..HubConfig::default()
        };
        init_logging(&config);
        init_logging(&HubConfig::default());
    }
}
