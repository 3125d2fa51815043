// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the helpdesk backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use helpdesk_core::types::MAX_PAGE_SIZE;
use helpdesk_core::{Permission, PermissionTable, UserRole};
use serde::{Deserialize, Serialize};

use crate::diagnostic::{ConfigError, closest};

/// Top-level helpdesk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HelpdeskConfig {
    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log filter settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Ticket listing defaults and limits.
    #[serde(default)]
    pub listing: ListingConfig,

    /// Per-operation deadline.
    #[serde(default)]
    pub operations: OperationsConfig,

    /// Per-role permission overrides.
    #[serde(default)]
    pub permissions: PermissionsConfig,
}

/// SQLite storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a writer waits for the database lock before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("helpdesk").join("helpdesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("helpdesk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Ticket listing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ListingConfig {
    /// Page size used when a listing request asks for page size 0.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Largest page size a caller may request. Never above 100.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    MAX_PAGE_SIZE
}

/// Per-operation limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OperationsConfig {
    /// Deadline applied to each store or service call. Unset means none.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl OperationsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Per-role permission overrides. A role that is set replaces its default
/// grant set entirely; unset roles keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub end_user: Option<Vec<String>>,

    #[serde(default)]
    pub support_agent: Option<Vec<String>>,

    #[serde(default)]
    pub manager: Option<Vec<String>>,

    #[serde(default)]
    pub administrator: Option<Vec<String>>,
}

impl PermissionsConfig {
    fn overrides(&self) -> [(&'static str, UserRole, Option<&Vec<String>>); 4] {
        [
            ("end_user", UserRole::EndUser, self.end_user.as_ref()),
            ("support_agent", UserRole::SupportAgent, self.support_agent.as_ref()),
            ("manager", UserRole::Manager, self.manager.as_ref()),
            ("administrator", UserRole::Administrator, self.administrator.as_ref()),
        ]
    }

    /// Build the permission table: defaults with these overrides applied.
    ///
    /// Every unknown permission name is reported, not just the first.
    pub fn build_table(&self) -> Result<PermissionTable, Vec<ConfigError>> {
        let valid = Permission::names();

        let mut table = PermissionTable::defaults();
        let mut errors = Vec::new();

        for (section_key, role, names) in self.overrides() {
            let Some(names) = names else { continue };
            let mut granted = Vec::with_capacity(names.len());
            for name in names {
                match name.parse::<Permission>() {
                    Ok(permission) => granted.push(permission),
                    Err(_) => errors.push(ConfigError::UnknownPermission {
                        role: section_key.to_string(),
                        name: name.clone(),
                        suggestion: closest(name, valid.iter().map(String::as_str))
                            .map(str::to_owned),
                    }),
                }
            }
            table = table.with_role(role, granted);
        }

        if errors.is_empty() {
            Ok(table)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_all_sections() {
        let config = HelpdeskConfig::default();
        assert!(config.storage.wal_mode);
        assert_eq!(config.storage.busy_timeout_ms, 5000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.listing.default_page_size, 20);
        assert_eq!(config.listing.max_page_size, 100);
        assert!(config.operations.timeout().is_none());
        assert!(config.permissions.end_user.is_none());
    }

    #[test]
    fn default_database_path_ends_in_helpdesk_db() {
        assert!(default_database_path().ends_with("helpdesk.db"));
    }

    #[test]
    fn empty_overrides_yield_default_table() {
        let table = PermissionsConfig::default().build_table().unwrap();
        assert_eq!(table, PermissionTable::defaults());
    }

    #[test]
    fn override_replaces_role_grants() {
        let perms = PermissionsConfig {
            end_user: Some(vec!["ticket:create".into(), "ticket:read".into()]),
            ..Default::default()
        };
        let table = perms.build_table().unwrap();
        assert!(table.allows(UserRole::EndUser, Permission::TicketRead));
        assert!(!table.allows(UserRole::EndUser, Permission::TicketUpdateOwn));
    }

    #[test]
    fn unknown_permission_names_are_all_reported() {
        let perms = PermissionsConfig {
            manager: Some(vec!["ticket:delet".into(), "bogus".into()]),
            ..Default::default()
        };
        let errors = perms.build_table().unwrap_err();
        assert_eq!(errors.len(), 2);
        match &errors[0] {
            ConfigError::UnknownPermission {
                role, suggestion, ..
            } => {
                assert_eq!(role, "manager");
                assert_eq!(suggestion.as_deref(), Some("ticket:delete"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
