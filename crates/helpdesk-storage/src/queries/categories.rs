// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Category directory backed by the `categories` table.

use async_trait::async_trait;
use helpdesk_core::{Category, CategoryDirectory, CategoryId, CallContext, HelpdeskError};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use crate::codec;
use crate::database::Database;
use crate::writer;

const CATEGORY_COLUMNS: &str = "id, name, description, parent_id, is_active, created_at";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: codec::get_id(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        parent_id: codec::get_opt_id(row, 3)?,
        is_active: row.get(4)?,
        created_at: codec::get_ts(row, 5)?,
    })
}

pub(crate) fn insert_category(conn: &Connection, category: &Category) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO categories (id, name, description, parent_id, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            codec::id(category.id),
            category.name,
            category.description,
            codec::opt_id(category.parent_id),
            category.is_active,
            codec::ts(&category.created_at),
        ],
    )?;
    Ok(())
}

fn select_category(conn: &Connection, id_text: &str) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
        params![id_text],
        category_from_row,
    )
    .optional()
}

/// Categories table access.
#[derive(Clone)]
pub struct CategoryStore {
    db: Database,
}

impl CategoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a category. Names are unique; a parent, if given, must exist.
    pub async fn create(
        &self,
        ctx: &CallContext,
        category: Category,
    ) -> Result<Category, HelpdeskError> {
        if category.name.trim().is_empty() {
            return Err(HelpdeskError::Validation(
                "category name must not be empty".into(),
            ));
        }
        let category = writer::write(&self.db, ctx, move |tx| {
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1)",
                params![category.name],
                |r| r.get(0),
            )?;
            if taken {
                return Err(HelpdeskError::Validation(format!(
                    "category {} already exists",
                    category.name
                ))
                .into());
            }
            if let Some(parent) = category.parent_id
                && select_category(tx, &codec::id(parent))?.is_none()
            {
                return Err(HelpdeskError::Validation(format!(
                    "parent category {parent} does not exist"
                ))
                .into());
            }
            insert_category(tx, &category)?;
            Ok(category)
        })
        .await?;
        info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn get(
        &self,
        ctx: &CallContext,
        id: CategoryId,
    ) -> Result<Option<Category>, HelpdeskError> {
        let id_text = codec::id(id);
        writer::read(&self.db, ctx, move |conn| select_category(conn, &id_text)).await
    }

    /// Categories ordered by name; inactive ones only when asked for.
    pub async fn list(
        &self,
        ctx: &CallContext,
        include_inactive: bool,
    ) -> Result<Vec<Category>, HelpdeskError> {
        writer::read(&self.db, ctx, move |conn| {
            let sql = if include_inactive {
                format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC")
            } else {
                format!(
                    "SELECT {CATEGORY_COLUMNS} FROM categories WHERE is_active = 1 ORDER BY name ASC"
                )
            };
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map([], category_from_row)?
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    /// Enable or disable a category. Tickets already referencing it are untouched.
    pub async fn set_active(
        &self,
        ctx: &CallContext,
        id: CategoryId,
        active: bool,
    ) -> Result<Category, HelpdeskError> {
        let id_text = codec::id(id);
        let category = writer::write(&self.db, ctx, move |tx| {
            let changed = tx.execute(
                "UPDATE categories SET is_active = ?1 WHERE id = ?2",
                params![active, id_text],
            )?;
            if changed == 0 {
                return Err(HelpdeskError::NotFound {
                    entity: "category",
                    id: id_text,
                }
                .into());
            }
            select_category(tx, &id_text)?.ok_or_else(|| {
                HelpdeskError::Internal(format!("category {id_text} vanished")).into()
            })
        })
        .await?;
        info!(category_id = %id, active, "category activation changed");
        Ok(category)
    }
}

#[async_trait]
impl CategoryDirectory for CategoryStore {
    async fn get_category(
        &self,
        ctx: &CallContext,
        id: CategoryId,
    ) -> Result<Option<Category>, HelpdeskError> {
        self.get(ctx, id).await
    }
}
