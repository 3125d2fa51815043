// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./helpdesk.toml` > `~/.config/helpdesk/helpdesk.toml` > `/etc/helpdesk/helpdesk.toml`
//! with environment variable overrides via `HELPDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::HelpdeskConfig;

/// Top-level sections that env vars may target.
const SECTIONS: &[&str] = &["storage", "logging", "listing", "operations", "permissions"];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/helpdesk/helpdesk.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "helpdesk.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("helpdesk/helpdesk.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/helpdesk/helpdesk.toml` (system-wide)
/// 3. `~/.config/helpdesk/helpdesk.toml` (user XDG config)
/// 4. `./helpdesk.toml` (local directory)
/// 5. `HELPDESK_*` environment variables
pub fn load_config() -> Result<HelpdeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<HelpdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HelpdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HelpdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HelpdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HelpdeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: key names contain
/// underscores, so `HELPDESK_STORAGE_BUSY_TIMEOUT_MS` must become
/// `storage.busy_timeout_ms`, not `storage.busy.timeout.ms`.
fn env_provider() -> Env {
    Env::prefixed("HELPDESK_").map(|key| map_env_key(key.as_str()).into())
}

/// `storage_database_path` -> `storage.database_path`. Keys outside a known
/// section pass through unchanged and are rejected by `deny_unknown_fields`.
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}
