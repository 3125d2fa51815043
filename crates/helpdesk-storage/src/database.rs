// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements for one database file are serialized through
//! tokio-rusqlite's single background thread. Stores hold clones of the
//! same [`Database`] handle rather than opening their own connections.

use std::path::Path;
use std::time::Duration;

use helpdesk_config::model::StorageConfig;
use helpdesk_core::HelpdeskError;
use tracing::{debug, info};

use crate::migrations;

/// Connection options applied on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub wal_mode: bool,
    pub busy_timeout: Duration,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            wal_mode: true,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl From<&StorageConfig> for DatabaseOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            wal_mode: config.wal_mode,
            busy_timeout: config.busy_timeout(),
        }
    }
}

/// Handle to the single-writer SQLite connection.
///
/// Cloning is cheap; every clone talks to the same background thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (creating if needed) the database at `path` with default options.
    pub async fn open(path: &str) -> Result<Self, HelpdeskError> {
        Self::open_with(path, DatabaseOptions::default()).await
    }

    /// Open the database at `path`, apply pragmas, and run pending migrations.
    pub async fn open_with(path: &str, options: DatabaseOptions) -> Result<Self, HelpdeskError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| HelpdeskError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| HelpdeskError::Storage {
                source: Box::new(e),
            })?;

        let DatabaseOptions {
            wal_mode,
            busy_timeout,
        } = options;

        conn.call(
            move |conn| -> Result<Result<(), HelpdeskError>, rusqlite::Error> {
                conn.busy_timeout(busy_timeout)?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                if wal_mode {
                    let mode: String = conn.pragma_update_and_check(
                        None,
                        "journal_mode",
                        "WAL",
                        |row| row.get(0),
                    )?;
                    debug!(journal_mode = %mode, "journal mode set");
                }
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                Ok(migrations::run_migrations(conn))
            },
        )
        .await
        .map_err(map_tr_err)??;

        info!(path = %path, wal_mode, "database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checkpoint the WAL and close the connection.
    ///
    /// Other clones of this handle fail with a storage error afterwards.
    pub async fn close(self) -> Result<(), HelpdeskError> {
        checkpoint(&self.conn).await?;
        self.conn.close().await.map_err(|e| HelpdeskError::Storage {
            source: Box::new(e),
        })?;
        debug!(path = %self.path, "database closed");
        Ok(())
    }
}

/// Fold the WAL back into the main database file.
pub(crate) async fn checkpoint(conn: &tokio_rusqlite::Connection) -> Result<(), HelpdeskError> {
    conn.call(|conn| -> Result<(), rusqlite::Error> {
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    })
    .await
    .map_err(map_tr_err)
}

/// Map a tokio-rusqlite error into the storage error variant.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> HelpdeskError {
    HelpdeskError::Storage {
        source: Box::new(e),
    }
}
