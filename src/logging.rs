//! Log output setup.
//!
//! Code logs through the `log` macros; a `tracing-subscriber` formatter on
//! stderr picks those records up through its `log` bridge.

use crate::error::AppError;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise `default_level`.
pub fn env_filter(default_level: &str) -> Result<EnvFilter, AppError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level).map_err(|e| {
            AppError::config_field(format!("Invalid log level '{}': {}", default_level, e), "log_level")
        }),
    }
}

/// Install the global subscriber.
pub fn init(default_level: &str) -> Result<(), AppError> {
    let filter = env_filter(default_level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::internal(format!("Failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = env_filter("review_reminder=notalevel").unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
    }

    #[test]
    fn test_valid_level_accepted() {
        assert!(env_filter("debug").is_ok());
    }
}
