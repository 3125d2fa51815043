// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use helpdesk_config::model::StorageConfig;
use helpdesk_core::{HealthStatus, HelpdeskError, StorageAdapter};

use crate::database::{self, Database, DatabaseOptions};
use crate::queries::categories::CategoryStore;
use crate::queries::tickets::TicketStore;
use crate::queries::users::UserStore;

/// SQLite-backed storage adapter.
///
/// Owns the [`Database`] handle and hands out stores bound to it. The
/// database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, HelpdeskError> {
        self.db.get().ok_or_else(|| HelpdeskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    pub fn ticket_store(&self) -> Result<TicketStore, HelpdeskError> {
        Ok(TicketStore::new(self.database()?.clone()))
    }

    pub fn users(&self) -> Result<UserStore, HelpdeskError> {
        Ok(UserStore::new(self.database()?.clone()))
    }

    pub fn categories(&self) -> Result<CategoryStore, HelpdeskError> {
        Ok(CategoryStore::new(self.database()?.clone()))
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn initialize(&self) -> Result<(), HelpdeskError> {
        if self.db.initialized() {
            return Err(HelpdeskError::Storage {
                source: "storage already initialized".into(),
            });
        }
        let db = Database::open_with(
            &self.config.database_path,
            DatabaseOptions::from(&self.config),
        )
        .await?;
        self.db.set(db).map_err(|_| HelpdeskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Unhealthy when SQLite's quick integrity check reports damage;
    /// degraded when WAL was configured but the file is in another journal
    /// mode.
    async fn health_check(&self) -> Result<HealthStatus, HelpdeskError> {
        let db = self.database()?;
        let (integrity, journal_mode) = db
            .connection()
            .call(|conn| -> Result<(String, String), rusqlite::Error> {
                let integrity = conn.query_row("PRAGMA quick_check", [], |r| r.get(0))?;
                let mode = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?;
                Ok((integrity, mode))
            })
            .await
            .map_err(database::map_tr_err)?;

        if integrity != "ok" {
            warn!(path = %db.path(), %integrity, "integrity check failed");
            return Ok(HealthStatus::Unhealthy(integrity));
        }
        if self.config.wal_mode && !journal_mode.eq_ignore_ascii_case("wal") {
            return Ok(HealthStatus::Degraded(format!(
                "journal mode is {journal_mode}, expected wal"
            )));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), HelpdeskError> {
        let db = self.database()?;
        database::checkpoint(db.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
