// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the helpdesk backend.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, a generic expire-then-insert store
//! for versioned entities, and the ticket, user, and category stores built
//! on it.

pub mod adapter;
mod codec;
pub mod database;
pub mod migrations;
pub mod queries;
pub mod seed;
pub mod versioned;
mod writer;

pub use adapter::SqliteStorage;
pub use database::{Database, DatabaseOptions};
pub use queries::categories::CategoryStore;
pub use queries::tickets::TicketStore;
pub use queries::users::UserStore;
pub use seed::{DEFAULT_ADMIN_EMAIL, SeedReport, seed_defaults};
pub use versioned::{VersionedStore, VersionedTable};
