// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use async_trait::async_trait;

use crate::error::HelpdeskError;
use crate::types::HealthStatus;

/// Lifecycle of a storage backend.
///
/// Storage adapters own the database connection. Stores and directories
/// handed out by an adapter are only usable between `initialize` and `close`.
#[async_trait]
pub trait StorageAdapter: Send + Sync + 'static {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// Opens the backend and applies migrations. Calling it twice is an error.
    async fn initialize(&self) -> Result<(), HelpdeskError>;

    /// Reports whether the backend can serve queries.
    async fn health_check(&self) -> Result<HealthStatus, HelpdeskError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), HelpdeskError>;
}
