// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First-run seed data: an administrator and the default categories.

use helpdesk_core::{CallContext, Category, HelpdeskError, User, UserRole};
use tracing::info;

use crate::database::Database;
use crate::queries::categories::insert_category;
use crate::queries::users::insert_user;
use crate::writer;

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@helpdesk.local";

const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Technical Support", "Technical issues and troubleshooting"),
    ("Account Management", "Account-related issues and requests"),
    ("Billing & Payments", "Billing and payment-related issues"),
    ("Feature Requests", "Requests for new features or improvements"),
    ("Bug Reports", "Bug reports and software issues"),
];

/// What a seeding run inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub admin: User,
    pub categories: Vec<Category>,
}

/// Insert the default administrator and categories, only if the users table
/// is empty. Returns `None` when the database was already seeded.
pub async fn seed_defaults(
    db: &Database,
    ctx: &CallContext,
) -> Result<Option<SeedReport>, HelpdeskError> {
    let report = writer::write(db, ctx, |tx| {
        let users: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        if users > 0 {
            return Ok(None);
        }

        let admin = User::new(DEFAULT_ADMIN_EMAIL, "Admin", "User", UserRole::Administrator);
        insert_user(tx, &admin)?;

        let mut categories = Vec::with_capacity(DEFAULT_CATEGORIES.len());
        for (name, description) in DEFAULT_CATEGORIES {
            let category = Category::new(*name, *description);
            insert_category(tx, &category)?;
            categories.push(category);
        }
        Ok(Some(SeedReport { admin, categories }))
    })
    .await?;

    if let Some(report) = &report {
        info!(
            admin_id = %report.admin.id,
            categories = report.categories.len(),
            "seeded default data"
        );
    }
    Ok(report)
}
