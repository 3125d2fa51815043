// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits at the seams between the domain service, the stores,
//! and their collaborators.
//!
//! Async traits use `#[async_trait]` so they can be held as trait objects.

pub mod directory;
pub mod storage;
pub mod versioned;

pub use directory::{CategoryDirectory, UserDirectory};
pub use storage::StorageAdapter;
pub use versioned::VersionedEntity;
