// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for service-level integration testing.

use std::sync::Arc;

use helpdesk_config::model::{ListingConfig, StorageConfig};
use helpdesk_core::{
    CallContext, Category, HelpdeskError, PermissionTable, StorageAdapter, Ticket, TicketId,
    TicketPriority, User, UserRole,
};
use helpdesk_storage::{CategoryStore, SqliteStorage, UserStore};
use helpdesk_tickets::{CreateTicketRequest, TicketService};
use tracing::debug;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    permissions: PermissionTable,
    listing: ListingConfig,
    wal_mode: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            permissions: PermissionTable::defaults(),
            listing: ListingConfig::default(),
            wal_mode: true,
        }
    }

    /// Replace the permission table.
    pub fn with_permissions(mut self, permissions: PermissionTable) -> Self {
        self.permissions = permissions;
        self
    }

    /// Set listing defaults and limits.
    pub fn with_listing(mut self, listing: ListingConfig) -> Self {
        self.listing = listing;
        self
    }

    /// Use the rollback journal instead of WAL.
    pub fn without_wal(mut self) -> Self {
        self.wal_mode = false;
        self
    }

    /// Build the harness: temp database, seeded people and categories, service.
    pub async fn build(self) -> Result<TestHarness, HelpdeskError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| HelpdeskError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: self.wal_mode,
            busy_timeout_ms: 5000,
        });
        storage.initialize().await?;

        let ctx = CallContext::default();
        let users = storage.users()?;
        let categories = storage.categories()?;

        let admin = users
            .create(&ctx, User::new("admin@test.local", "Ada", "Admin", UserRole::Administrator))
            .await?;
        let manager = users
            .create(&ctx, User::new("manager@test.local", "Mia", "Manager", UserRole::Manager))
            .await?;
        let manager2 = users
            .create(&ctx, User::new("manager2@test.local", "Max", "Manager", UserRole::Manager))
            .await?;
        let agent = users
            .create(&ctx, User::new("agent@test.local", "Sam", "Agent", UserRole::SupportAgent))
            .await?;
        let end_user = users
            .create(&ctx, User::new("user@test.local", "Eve", "User", UserRole::EndUser))
            .await?;
        let inactive_agent = users
            .create(
                &ctx,
                User::new("former@test.local", "Fay", "Former", UserRole::SupportAgent),
            )
            .await?;
        let inactive_agent = users.set_active(&ctx, inactive_agent.id, false).await?;

        let category = categories
            .create(&ctx, Category::new("Technical Support", "Hardware and software"))
            .await?;
        let inactive_category = categories
            .create(&ctx, Category::new("Legacy", "Retired queue"))
            .await?;
        let inactive_category = categories
            .set_active(&ctx, inactive_category.id, false)
            .await?;

        let service = TicketService::from_storage(&storage, self.permissions, self.listing)?;
        debug!(path = %db_path.display(), "test harness ready");

        Ok(TestHarness {
            service,
            users,
            categories,
            admin,
            manager,
            manager2,
            agent,
            end_user,
            inactive_agent,
            category,
            inactive_category,
            storage: Arc::new(storage),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete service environment over a temp database.
pub struct TestHarness {
    pub service: TicketService,
    pub storage: Arc<SqliteStorage>,
    pub users: UserStore,
    pub categories: CategoryStore,
    pub admin: User,
    pub manager: User,
    /// A second escalation target.
    pub manager2: User,
    pub agent: User,
    pub end_user: User,
    pub inactive_agent: User,
    pub category: Category,
    pub inactive_category: Category,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Default harness.
    pub async fn new() -> Result<Self, HelpdeskError> {
        Self::builder().build().await
    }

    pub fn ctx(&self) -> CallContext {
        CallContext::default()
    }

    /// Open a MEDIUM ticket as the end user.
    pub async fn open_ticket(&self, title: &str) -> Result<Ticket, HelpdeskError> {
        self.open_ticket_with(title, TicketPriority::Medium).await
    }

    pub async fn open_ticket_with(
        &self,
        title: &str,
        priority: TicketPriority,
    ) -> Result<Ticket, HelpdeskError> {
        let mut request = CreateTicketRequest::new(title, format!("{title} description"));
        request.priority = priority;
        self.service
            .create_ticket(&self.ctx(), request, self.end_user.id)
            .await
    }

    /// Number of stored versions of `id`.
    pub async fn history_len(&self, id: TicketId) -> Result<usize, HelpdeskError> {
        Ok(self.service.store().get_history(&self.ctx(), id).await?.len())
    }
}
