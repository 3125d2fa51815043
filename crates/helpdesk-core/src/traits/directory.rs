// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookups the ticket service performs against users and categories.

use async_trait::async_trait;

use crate::context::CallContext;
use crate::error::HelpdeskError;
use crate::types::{Category, CategoryId, User, UserId};

/// Read access to users, used for role and active-flag checks.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` when no such user exists.
    async fn get_user(&self, ctx: &CallContext, id: UserId)
        -> Result<Option<User>, HelpdeskError>;
}

/// Read access to categories, used for the active-flag check.
#[async_trait]
pub trait CategoryDirectory: Send + Sync {
    /// `Ok(None)` when no such category exists.
    async fn get_category(
        &self,
        ctx: &CallContext,
        id: CategoryId,
    ) -> Result<Option<Category>, HelpdeskError>;
}
