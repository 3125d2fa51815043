// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role to permission mapping.
//!
//! A [`PermissionTable`] is built once at startup (defaults plus any
//! configured per-role overrides) and shared by reference. There is no
//! global table.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::types::UserRole;

/// A named capability checked by the ticket service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum Permission {
    #[strum(serialize = "ticket:create")]
    #[serde(rename = "ticket:create")]
    TicketCreate,
    #[strum(serialize = "ticket:read")]
    #[serde(rename = "ticket:read")]
    TicketRead,
    #[strum(serialize = "ticket:read:own")]
    #[serde(rename = "ticket:read:own")]
    TicketReadOwn,
    #[strum(serialize = "ticket:update")]
    #[serde(rename = "ticket:update")]
    TicketUpdate,
    #[strum(serialize = "ticket:update:own")]
    #[serde(rename = "ticket:update:own")]
    TicketUpdateOwn,
    #[strum(serialize = "ticket:delete")]
    #[serde(rename = "ticket:delete")]
    TicketDelete,
    #[strum(serialize = "ticket:assign")]
    #[serde(rename = "ticket:assign")]
    TicketAssign,
    #[strum(serialize = "ticket:status:update")]
    #[serde(rename = "ticket:status:update")]
    TicketStatusUpdate,
    #[strum(serialize = "ticket:escalate")]
    #[serde(rename = "ticket:escalate")]
    TicketEscalate,
    #[strum(serialize = "ticket:stats:read")]
    #[serde(rename = "ticket:stats:read")]
    TicketStatsRead,
    #[strum(serialize = "user:manage")]
    #[serde(rename = "user:manage")]
    UserManage,
    #[strum(serialize = "system:admin")]
    #[serde(rename = "system:admin")]
    SystemAdmin,
}

impl Permission {
    /// Every permission name, in declaration order.
    pub fn names() -> Vec<String> {
        Permission::iter().map(|p| p.to_string()).collect()
    }
}

/// Immutable role to permission-set map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    grants: HashMap<UserRole, HashSet<Permission>>,
}

impl PermissionTable {
    /// The default grants.
    ///
    /// END_USER works on its own tickets, SUPPORT_AGENT handles the queue,
    /// MANAGER adds deletion and user management, ADMINISTRATOR adds
    /// system administration.
    pub fn defaults() -> Self {
        use Permission::*;

        let end_user: HashSet<Permission> =
            [TicketCreate, TicketReadOwn, TicketUpdateOwn].into_iter().collect();

        let agent: HashSet<Permission> = [
            TicketCreate,
            TicketRead,
            TicketUpdate,
            TicketAssign,
            TicketStatusUpdate,
            TicketEscalate,
            TicketStatsRead,
        ]
        .into_iter()
        .collect();

        let mut manager = agent.clone();
        manager.extend([TicketDelete, UserManage]);

        let mut admin = manager.clone();
        admin.insert(SystemAdmin);

        let grants = HashMap::from([
            (UserRole::EndUser, end_user),
            (UserRole::SupportAgent, agent),
            (UserRole::Manager, manager),
            (UserRole::Administrator, admin),
        ]);
        Self { grants }
    }

    /// Replace the grant set of one role.
    pub fn with_role(
        mut self,
        role: UserRole,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        self.grants.insert(role, permissions.into_iter().collect());
        self
    }

    pub fn allows(&self, role: UserRole, permission: Permission) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|set| set.contains(&permission))
    }

    /// Permissions granted to `role`, sorted by name.
    pub fn granted(&self, role: UserRole) -> Vec<Permission> {
        let mut out: Vec<Permission> = self
            .grants
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        out.sort_by_key(|p| p.to_string());
        out
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::defaults()
    }
}
