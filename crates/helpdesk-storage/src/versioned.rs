// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic expire-then-insert store for versioned entities.
//!
//! Every change to a logical entity runs in one write transaction: the
//! current row is looked up, its successor is built and mutated, the current
//! row is expired, and the successor is inserted. Either all of it commits or
//! none of it does.

use std::marker::PhantomData;

use helpdesk_core::{CallContext, HelpdeskError, VersionId, VersionedEntity, utc_now};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::codec;
use crate::database::Database;
use crate::writer::{self, TxError};

/// Table mapping for a versioned entity.
///
/// The table must have `id` (version id), `creation_time`, and
/// `expiration_time` columns in addition to [`Self::KEY_COLUMN`].
pub trait VersionedTable: VersionedEntity {
    /// Entity name used in not-found errors and logs.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    /// Column holding the logical key.
    const KEY_COLUMN: &'static str;
    /// Select list, in the order [`Self::from_row`] reads it.
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()>;
}

/// Versioned store over one entity table.
pub struct VersionedStore<T> {
    db: Database,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for VersionedStore<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: VersionedTable> VersionedStore<T> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn not_found(key: impl ToString) -> HelpdeskError {
        HelpdeskError::NotFound {
            entity: T::ENTITY,
            id: key.to_string(),
        }
    }

    /// Insert a new row as given. A second current row for the same key
    /// violates the current-version index and fails with a storage error.
    pub async fn create(&self, ctx: &CallContext, entity: T) -> Result<T, HelpdeskError> {
        let entity = writer::write(&self.db, ctx, move |tx| {
            entity.insert(tx)?;
            Ok(entity)
        })
        .await?;
        info!(
            entity = T::ENTITY,
            key = %entity.key(),
            version_id = %entity.version_id(),
            "version created"
        );
        Ok(entity)
    }

    /// The current version of `key`.
    pub async fn get_current(&self, ctx: &CallContext, key: T::Key) -> Result<T, HelpdeskError> {
        let key_text = codec::id(key);
        let found = writer::read(&self.db, ctx, move |conn| select_current::<T>(conn, &key_text))
            .await?;
        debug!(entity = T::ENTITY, key = %key, found = found.is_some(), "get current");
        found.ok_or_else(|| Self::not_found(key))
    }

    /// The exact version row `version_id`, current or expired.
    pub async fn get_by_version_id(
        &self,
        ctx: &CallContext,
        version_id: VersionId,
    ) -> Result<T, HelpdeskError> {
        let id_text = codec::id(version_id);
        let sql = format!("SELECT {} FROM {} WHERE id = ?1", T::COLUMNS, T::TABLE);
        writer::read(&self.db, ctx, move |conn| {
            conn.query_row(&sql, params![id_text], T::from_row).optional()
        })
        .await?
        .ok_or_else(|| HelpdeskError::NotFound {
            entity: "version",
            id: version_id.to_string(),
        })
    }

    /// Every version of `key`, oldest first. Unknown keys yield an empty list.
    pub async fn get_history(
        &self,
        ctx: &CallContext,
        key: T::Key,
    ) -> Result<Vec<T>, HelpdeskError> {
        let key_text = codec::id(key);
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY creation_time ASC, rowid ASC",
            T::COLUMNS,
            T::TABLE,
            T::KEY_COLUMN
        );
        let history = writer::read(&self.db, ctx, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map(params![key_text], T::from_row)?
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;
        debug!(entity = T::ENTITY, key = %key, versions = history.len(), "get history");
        Ok(history)
    }

    /// Produce a new current version of `key` by applying `mutator` to a
    /// copy of the current one.
    ///
    /// If the mutator fails, or the context trips before commit, nothing is
    /// written and the current version stays current.
    pub async fn update<F>(&self, ctx: &CallContext, key: T::Key, mutator: F) -> Result<T, HelpdeskError>
    where
        F: FnOnce(&mut T) -> Result<(), HelpdeskError> + Send + 'static,
    {
        let key_text = codec::id(key);
        let next = writer::write(&self.db, ctx, move |tx| {
            let current = select_current::<T>(tx, &key_text)?
                .ok_or_else(|| Self::not_found(key))?;

            // Never earlier than the version being replaced, even if the
            // clock stepped backwards.
            let now = utc_now().max(current.creation_time());
            let mut next = current.next_version(now);
            mutator(&mut next)?;

            if next.key() != key || !next.is_current() || !next.preserves_lineage(&current) {
                return Err(TxError::Rejected(HelpdeskError::Validation(format!(
                    "update of {} {key} changed immutable fields",
                    T::ENTITY
                ))));
            }

            expire(tx, &current, now)?;
            next.insert(tx)?;
            Ok(next)
        })
        .await?;

        info!(
            entity = T::ENTITY,
            key = %key,
            version_id = %next.version_id(),
            "version committed"
        );
        Ok(next)
    }

    /// Expire the current version of `key` without a successor.
    /// Returns the now-expired version.
    pub async fn archive(&self, ctx: &CallContext, key: T::Key) -> Result<T, HelpdeskError> {
        self.archive_where(ctx, key, |_| Ok(())).await
    }

    /// Like [`Self::archive`], but `guard` inspects the current version inside
    /// the transaction and may veto the archive.
    pub async fn archive_where<G>(
        &self,
        ctx: &CallContext,
        key: T::Key,
        guard: G,
    ) -> Result<T, HelpdeskError>
    where
        G: FnOnce(&T) -> Result<(), HelpdeskError> + Send + 'static,
    {
        let key_text = codec::id(key);
        let archived = writer::write(&self.db, ctx, move |tx| {
            let mut current = select_current::<T>(tx, &key_text)?
                .ok_or_else(|| Self::not_found(key))?;
            guard(&current)?;

            let now = utc_now().max(current.creation_time());
            expire(tx, &current, now)?;
            current.set_expiration_time(now);
            Ok(current)
        })
        .await?;

        info!(
            entity = T::ENTITY,
            key = %key,
            version_id = %archived.version_id(),
            "archived"
        );
        Ok(archived)
    }

    /// Remove every version of `key`. Returns the number of rows removed.
    pub async fn hard_delete(&self, ctx: &CallContext, key: T::Key) -> Result<usize, HelpdeskError> {
        let key_text = codec::id(key);
        let sql = format!("DELETE FROM {} WHERE {} = ?1", T::TABLE, T::KEY_COLUMN);
        let removed = writer::write(&self.db, ctx, move |tx| {
            Ok(tx.execute(&sql, params![key_text])?)
        })
        .await?;
        info!(entity = T::ENTITY, key = %key, removed, "hard deleted");
        Ok(removed)
    }
}

pub(crate) fn select_current<T: VersionedTable>(
    conn: &Connection,
    key_text: &str,
) -> rusqlite::Result<Option<T>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1 AND expiration_time IS NULL",
        T::COLUMNS,
        T::TABLE,
        T::KEY_COLUMN
    );
    conn.query_row(&sql, params![key_text], T::from_row)
        .optional()
}

/// Expire exactly the row that was read as current.
fn expire<T: VersionedTable>(
    conn: &Connection,
    current: &T,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<(), TxError> {
    let sql = format!(
        "UPDATE {} SET expiration_time = ?1 WHERE id = ?2 AND expiration_time IS NULL",
        T::TABLE
    );
    let changed = conn.execute(
        &sql,
        params![codec::ts(&at), codec::id(current.version_id())],
    )?;
    if changed != 1 {
        return Err(TxError::Rejected(HelpdeskError::Conflict {
            source: format!(
                "{} version {} is no longer current ({changed} rows matched)",
                T::ENTITY,
                current.version_id()
            )
            .into(),
        }));
    }
    Ok(())
}
