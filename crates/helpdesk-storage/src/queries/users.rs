// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User directory backed by the `users` table.

use async_trait::async_trait;
use helpdesk_core::{CallContext, HelpdeskError, User, UserDirectory, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::codec;
use crate::database::Database;
use crate::writer;

const USER_COLUMNS: &str = "id, email, first_name, last_name, role, is_active, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: codec::get_id(row, 0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        role: codec::get_enum(row, 4)?,
        is_active: row.get(5)?,
        created_at: codec::get_ts(row, 6)?,
    })
}

pub(crate) fn insert_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, first_name, last_name, role, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            codec::id(user.id),
            user.email,
            user.first_name,
            user.last_name,
            user.role.to_string(),
            user.is_active,
            codec::ts(&user.created_at),
        ],
    )?;
    Ok(())
}

/// Users table access.
#[derive(Clone)]
pub struct UserStore {
    db: Database,
}

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, ctx: &CallContext, user: User) -> Result<User, HelpdeskError> {
        if user.email.trim().is_empty() {
            return Err(HelpdeskError::Validation("email must not be empty".into()));
        }
        let user = writer::write(&self.db, ctx, move |tx| {
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                params![user.email],
                |r| r.get(0),
            )?;
            if taken {
                return Err(HelpdeskError::Validation(format!(
                    "email {} is already registered",
                    user.email
                ))
                .into());
            }
            insert_user(tx, &user)?;
            Ok(user)
        })
        .await?;
        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn get(&self, ctx: &CallContext, id: UserId) -> Result<Option<User>, HelpdeskError> {
        let id_text = codec::id(id);
        writer::read(&self.db, ctx, move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id_text],
                user_from_row,
            )
            .optional()
        })
        .await
    }

    pub async fn get_by_email(
        &self,
        ctx: &CallContext,
        email: &str,
    ) -> Result<Option<User>, HelpdeskError> {
        let email = email.to_string();
        writer::read(&self.db, ctx, move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()
        })
        .await
    }

    /// All users, oldest first.
    pub async fn list(&self, ctx: &CallContext) -> Result<Vec<User>, HelpdeskError> {
        let users = writer::read(&self.db, ctx, |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, email ASC"
            ))?;
            stmt.query_map([], user_from_row)?
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;
        debug!(count = users.len(), "users listed");
        Ok(users)
    }

    pub async fn set_active(
        &self,
        ctx: &CallContext,
        id: UserId,
        active: bool,
    ) -> Result<User, HelpdeskError> {
        let id_text = codec::id(id);
        let user = writer::write(&self.db, ctx, move |tx| {
            let changed = tx.execute(
                "UPDATE users SET is_active = ?1 WHERE id = ?2",
                params![active, id_text],
            )?;
            if changed == 0 {
                return Err(HelpdeskError::NotFound {
                    entity: "user",
                    id: id_text,
                }
                .into());
            }
            Ok(tx.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id_text],
                user_from_row,
            )?)
        })
        .await?;
        info!(user_id = %id, active, "user activation changed");
        Ok(user)
    }
}

#[async_trait]
impl UserDirectory for UserStore {
    async fn get_user(&self, ctx: &CallContext, id: UserId) -> Result<Option<User>, HelpdeskError> {
        self.get(ctx, id).await
    }
}
