// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the helpdesk ticket backend.
//!
//! This crate provides the error taxonomy, domain types, the versioned
//! entity capability, collaborator traits, the role permission table, and
//! the per-call context used throughout the workspace.

pub mod context;
pub mod error;
pub mod permissions;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use context::CallContext;
pub use error::HelpdeskError;
pub use permissions::{Permission, PermissionTable};
pub use types::{
    Category, CategoryId, HealthStatus, PageRequest, SortDirection, Ticket, TicketDraft,
    TicketFilter, TicketId, TicketPage, TicketPriority, TicketQuery, TicketSort, TicketSortField,
    TicketStats, TicketStatus, User, UserId, UserRole, VersionId, storable_instant, utc_now, MAX_PAGE_SIZE,
};

pub use traits::{CategoryDirectory, StorageAdapter, UserDirectory, VersionedEntity};
