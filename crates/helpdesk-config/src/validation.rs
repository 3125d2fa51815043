// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as page-size bounds, log levels, and permission names.

use helpdesk_core::types::MAX_PAGE_SIZE;

use crate::diagnostic::ConfigError;
use crate::model::HelpdeskConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HelpdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.busy_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "storage.busy_timeout_ms must be at least 1".to_string(),
        });
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    let listing = &config.listing;
    if listing.max_page_size == 0 || listing.max_page_size > MAX_PAGE_SIZE {
        errors.push(ConfigError::Validation {
            message: format!(
                "listing.max_page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                listing.max_page_size
            ),
        });
    }

    if listing.default_page_size == 0 || listing.default_page_size > listing.max_page_size {
        errors.push(ConfigError::Validation {
            message: format!(
                "listing.default_page_size must be between 1 and listing.max_page_size ({}), got {}",
                listing.max_page_size, listing.default_page_size
            ),
        });
    }

    if config.operations.timeout_ms == Some(0) {
        errors.push(ConfigError::Validation {
            message: "operations.timeout_ms must be at least 1 when set".to_string(),
        });
    }

    if let Err(permission_errors) = config.permissions.build_table() {
        errors.extend(permission_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
