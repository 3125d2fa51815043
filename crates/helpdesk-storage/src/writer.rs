// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write transactions.
//!
//! Every multi-statement write runs through [`write`]: the context is checked,
//! a `BEGIN IMMEDIATE` transaction takes SQLite's write lock before anything
//! is read, the body runs, the context is checked again, and only then does
//! the transaction commit. Any early return drops the transaction, which
//! rolls it back.
//!
//! Within one [`Database`] handle all calls are already serialized on the
//! tokio-rusqlite thread. `BEGIN IMMEDIATE` plus `busy_timeout` extends that
//! to other handles and processes on the same file; a writer that still
//! cannot get the lock fails with [`HelpdeskError::Conflict`].

use helpdesk_core::{CallContext, HelpdeskError};
use rusqlite::{ErrorCode, Transaction, TransactionBehavior};

use crate::database::{Database, map_tr_err};

/// Failure inside a transaction body: either SQL or a domain rejection.
#[derive(Debug)]
pub(crate) enum TxError {
    Sql(rusqlite::Error),
    Rejected(HelpdeskError),
}

impl From<rusqlite::Error> for TxError {
    fn from(e: rusqlite::Error) -> Self {
        TxError::Sql(e)
    }
}

impl From<HelpdeskError> for TxError {
    fn from(e: HelpdeskError) -> Self {
        TxError::Rejected(e)
    }
}

impl From<TxError> for HelpdeskError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::Sql(e) => classify(e),
            TxError::Rejected(e) => e,
        }
    }
}

/// Busy and locked mean another writer holds the lock: retryable conflict.
pub(crate) fn classify(e: rusqlite::Error) -> HelpdeskError {
    let contended = matches!(
        &e,
        rusqlite::Error::SqliteFailure(f, _)
            if matches!(f.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    );
    if contended {
        HelpdeskError::Conflict {
            source: Box::new(e),
        }
    } else {
        HelpdeskError::Storage {
            source: Box::new(e),
        }
    }
}

/// Run `body` in an immediate write transaction bound to `ctx`.
pub(crate) async fn write<T, F>(db: &Database, ctx: &CallContext, body: F) -> Result<T, HelpdeskError>
where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T, TxError> + Send + 'static,
{
    ctx.check()?;
    let ctx = ctx.clone();
    db.connection()
        .call(
            move |conn| -> Result<Result<T, HelpdeskError>, rusqlite::Error> {
                Ok(run(conn, &ctx, body))
            },
        )
        .await
        .map_err(map_tr_err)?
}

fn run<T, F>(conn: &mut rusqlite::Connection, ctx: &CallContext, body: F) -> Result<T, HelpdeskError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, TxError>,
{
    ctx.check()?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(classify)?;
    let out = body(&tx)?;
    ctx.check()?;
    tx.commit().map_err(classify)?;
    Ok(out)
}

/// Run a read-only `body` bound to `ctx`. Reads take no write lock.
pub(crate) async fn read<T, F>(db: &Database, ctx: &CallContext, body: F) -> Result<T, HelpdeskError>
where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T, rusqlite::Error> + Send + 'static,
{
    ctx.check()?;
    db.connection().call(body).await.map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("writer.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn count_users(db: &Database) -> i64 {
        read(db, &CallContext::default(), |conn| {
            conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
        })
        .await
        .unwrap()
    }

    fn insert_user(tx: &Transaction<'_>, email: &str) -> Result<(), rusqlite::Error> {
        tx.execute(
            "INSERT INTO users (id, email, first_name, last_name, role, created_at)
             VALUES (?1, ?2, 'A', 'B', 'END_USER', '2026-01-01T00:00:00.000000Z')",
            rusqlite::params![uuid::Uuid::new_v4().to_string(), email],
        )?;
        Ok(())
    }

    #[tokio::test]
    async fn committed_body_is_visible() {
        let (db, _dir) = setup_db().await;
        write(&db, &CallContext::default(), |tx| {
            insert_user(tx, "a@example.com")?;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(count_users(&db).await, 1);
    }

    #[tokio::test]
    async fn rejected_body_rolls_back() {
        let (db, _dir) = setup_db().await;
        let result: Result<(), _> = write(&db, &CallContext::default(), |tx| {
            insert_user(tx, "a@example.com")?;
            Err(HelpdeskError::Validation("nope".into()).into())
        })
        .await;
        assert!(matches!(result, Err(HelpdeskError::Validation(_))));
        assert_eq!(count_users(&db).await, 0);
    }

    #[tokio::test]
    async fn cancellation_during_body_rolls_back() {
        let (db, _dir) = setup_db().await;
        let ctx = CallContext::background();
        let inner = ctx.clone();
        let result = write(&db, &ctx, move |tx| {
            insert_user(tx, "a@example.com")?;
            inner.cancel();
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(HelpdeskError::Cancelled)));
        assert_eq!(count_users(&db).await, 0);
    }

    #[tokio::test]
    async fn constraint_violation_is_storage_error() {
        let (db, _dir) = setup_db().await;
        let result = write(&db, &CallContext::default(), |tx| {
            insert_user(tx, "dup@example.com")?;
            insert_user(tx, "dup@example.com")?;
            Ok(())
        })
        .await;
        match result {
            Err(e @ HelpdeskError::Storage { .. }) => assert!(!e.is_retryable()),
            other => panic!("expected storage error, got {other:?}"),
        }
        assert_eq!(count_users(&db).await, 0);
    }

    #[tokio::test]
    async fn lock_held_elsewhere_is_conflict() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("locked.db");
        let path = db_path.to_str().unwrap().to_string();
        let db = Database::open_with(
            &path,
            crate::database::DatabaseOptions {
                wal_mode: true,
                busy_timeout: std::time::Duration::from_millis(50),
            },
        )
        .await
        .unwrap();

        let mut holder = rusqlite::Connection::open(&path).unwrap();
        let held = holder
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();

        let result = write(&db, &CallContext::default(), |tx| {
            insert_user(tx, "late@example.com")?;
            Ok(())
        })
        .await;
        drop(held);

        match result {
            Err(e @ HelpdeskError::Conflict { .. }) => assert!(e.is_retryable()),
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
