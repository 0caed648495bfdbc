// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty identities, positive pool sizes, and known log levels.

use tracing::debug;

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

/// Log levels accepted by `[logging] level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.identity.user_id.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "identity.user_id must not be empty".to_string(),
        });
    }

    if config.dispatch.worker_threads < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.worker_threads must be at least 1, got {}",
                config.dispatch.worker_threads
            ),
        });
    }

    if config.dispatch.signal_pool_capacity < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.signal_pool_capacity must be at least 1, got {}",
                config.dispatch.signal_pool_capacity
            ),
        });
    }

    if config.compose.max_attachments < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "compose.max_attachments must be at least 1, got {}",
                config.compose.max_attachments
            ),
        });
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        debug!(count = errors.len(), "configuration failed validation");
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ParleyConfig::default();
        config.identity.user_id = "  ".to_string();
        config.dispatch.worker_threads = 0;
        config.dispatch.signal_pool_capacity = 0;
        config.compose.max_attachments = 0;
        config.logging.level = "loud".to_string();

        let errors = validate_config(&config).expect_err("should fail");
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = ParleyConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
