// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ticket domain service.
//!
//! Business rules (workflow transitions, category and target eligibility,
//! deletion rights) are checked here before the store is asked to produce a
//! version. The store re-checks the rules that depend on ticket state inside
//! its write transaction, so a concurrent change between the check and the
//! write cannot slip through.

use std::sync::Arc;

use helpdesk_config::model::ListingConfig;
use helpdesk_core::{
    CallContext, CategoryDirectory, CategoryId, HelpdeskError, PageRequest, Permission,
    PermissionTable, Ticket, TicketId, TicketPage, TicketQuery, TicketStats, TicketStatus, User,
    UserDirectory, UserId, UserRole, VersionId, utc_now,
};
use helpdesk_storage::{SqliteStorage, TicketStore};
use tracing::{debug, info, warn};

use crate::history::{self, TicketChange};
use crate::requests::{CreateTicketRequest, EscalateTicketRequest, UpdateTicketRequest};

fn log_rejection(op: &'static str, err: &HelpdeskError) {
    if err.is_rejection() {
        warn!(op, error = %err, "ticket operation rejected");
    }
}

/// Ticket operations for the outer (HTTP or CLI) layer. The caller has
/// already authenticated the acting user; [`TicketService::authorize`] is
/// available for permission checks.
#[derive(Clone)]
pub struct TicketService {
    tickets: TicketStore,
    users: Arc<dyn UserDirectory>,
    categories: Arc<dyn CategoryDirectory>,
    permissions: Arc<PermissionTable>,
    listing: ListingConfig,
}

impl TicketService {
    pub fn new(
        tickets: TicketStore,
        users: Arc<dyn UserDirectory>,
        categories: Arc<dyn CategoryDirectory>,
        permissions: Arc<PermissionTable>,
    ) -> Self {
        Self {
            tickets,
            users,
            categories,
            permissions,
            listing: ListingConfig::default(),
        }
    }

    /// Wire the service to an initialized SQLite storage.
    pub fn from_storage(
        storage: &SqliteStorage,
        permissions: PermissionTable,
        listing: ListingConfig,
    ) -> Result<Self, HelpdeskError> {
        Ok(Self::new(
            storage.ticket_store()?,
            Arc::new(storage.users()?),
            Arc::new(storage.categories()?),
            Arc::new(permissions),
        )
        .with_listing(listing))
    }

    pub fn with_listing(mut self, listing: ListingConfig) -> Self {
        self.listing = listing;
        self
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    pub fn store(&self) -> &TicketStore {
        &self.tickets
    }

    // --- authorization ---

    /// Resolve `user_id` and require `permission`. Unknown and inactive
    /// users are unauthorized.
    pub async fn authorize(
        &self,
        ctx: &CallContext,
        user_id: UserId,
        permission: Permission,
    ) -> Result<User, HelpdeskError> {
        let user = self.active_user(ctx, user_id).await?;
        if !self.permissions.allows(user.role, permission) {
            warn!(user_id = %user_id, role = %user.role, %permission, "permission denied");
            return Err(HelpdeskError::Unauthorized);
        }
        Ok(user)
    }

    /// Like [`Self::authorize`], but `own` suffices when the user created
    /// `ticket`.
    pub async fn authorize_ticket(
        &self,
        ctx: &CallContext,
        user_id: UserId,
        ticket: &Ticket,
        any: Permission,
        own: Permission,
    ) -> Result<User, HelpdeskError> {
        let user = self.active_user(ctx, user_id).await?;
        let allowed = self.permissions.allows(user.role, any)
            || (ticket.created_by_id == user.id && self.permissions.allows(user.role, own));
        if !allowed {
            warn!(
                user_id = %user_id,
                ticket_id = %ticket.ticket_id,
                %any,
                "ticket access denied"
            );
            return Err(HelpdeskError::Unauthorized);
        }
        Ok(user)
    }

    async fn active_user(&self, ctx: &CallContext, user_id: UserId) -> Result<User, HelpdeskError> {
        match self.users.get_user(ctx, user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => {
                warn!(user_id = %user_id, "unknown or inactive user");
                Err(HelpdeskError::Unauthorized)
            }
        }
    }

    // --- eligibility checks ---

    async fn require_active_category(
        &self,
        ctx: &CallContext,
        id: CategoryId,
    ) -> Result<(), HelpdeskError> {
        match self.categories.get_category(ctx, id).await? {
            None => Err(HelpdeskError::Validation(format!(
                "category {id} does not exist"
            ))),
            Some(category) if !category.is_active => Err(HelpdeskError::Validation(format!(
                "category {} is not active",
                category.name
            ))),
            Some(_) => Ok(()),
        }
    }

    /// An active user whose role passes `eligible`.
    async fn require_target(
        &self,
        ctx: &CallContext,
        id: UserId,
        eligible: fn(UserRole) -> bool,
        describe: &str,
    ) -> Result<User, HelpdeskError> {
        match self.users.get_user(ctx, id).await? {
            None => Err(HelpdeskError::Validation(format!("user {id} does not exist"))),
            Some(user) if !user.is_active => {
                Err(HelpdeskError::Validation(format!("user {id} is not active")))
            }
            Some(user) if !eligible(user.role) => Err(HelpdeskError::Validation(format!(
                "user {id} is not {describe}"
            ))),
            Some(user) => Ok(user),
        }
    }

    fn page_request(&self, page: u32, page_size: u32) -> Result<PageRequest, HelpdeskError> {
        let page = page.max(1);
        let page_size = if page_size == 0 {
            self.listing.default_page_size
        } else {
            page_size
        };
        if page_size > self.listing.max_page_size {
            return Err(HelpdeskError::Validation(format!(
                "page_size must be at most {}, got {page_size}",
                self.listing.max_page_size
            )));
        }
        PageRequest::new(page, page_size)
    }

    // --- operations ---

    /// Open a ticket. The first version is always OPEN.
    pub async fn create_ticket(
        &self,
        ctx: &CallContext,
        request: CreateTicketRequest,
        creator: UserId,
    ) -> Result<Ticket, HelpdeskError> {
        let result: Result<Ticket, HelpdeskError> = async {
            request.validate()?;
            if let Some(category_id) = request.category_id {
                self.require_active_category(ctx, category_id).await?;
            }
            let ticket = Ticket::open(request.into_draft(), creator, utc_now());
            self.tickets.create(ctx, ticket).await
        }
        .await;
        result.inspect_err(|e| log_rejection("create_ticket", e))
    }

    /// Current version of a ticket.
    pub async fn get_ticket(&self, ctx: &CallContext, id: TicketId) -> Result<Ticket, HelpdeskError> {
        self.tickets.get_current(ctx, id).await
    }

    /// One exact version, current or expired.
    pub async fn get_ticket_version(
        &self,
        ctx: &CallContext,
        version_id: VersionId,
    ) -> Result<Ticket, HelpdeskError> {
        self.tickets.get_by_version_id(ctx, version_id).await
    }

    /// All versions of a ticket, oldest first.
    pub async fn get_ticket_history(
        &self,
        ctx: &CallContext,
        id: TicketId,
    ) -> Result<Vec<Ticket>, HelpdeskError> {
        let history = self.tickets.get_history(ctx, id).await?;
        if history.is_empty() {
            return Err(HelpdeskError::ticket_not_found(id));
        }
        Ok(history)
    }

    /// Field-level change log derived from the history.
    pub async fn get_ticket_changes(
        &self,
        ctx: &CallContext,
        id: TicketId,
    ) -> Result<Vec<TicketChange>, HelpdeskError> {
        let history = self.get_ticket_history(ctx, id).await?;
        Ok(history::diff_history(&history))
    }

    /// Partial edit. Only fields present in `request` change.
    pub async fn update_ticket(
        &self,
        ctx: &CallContext,
        id: TicketId,
        request: UpdateTicketRequest,
        editor: UserId,
    ) -> Result<Ticket, HelpdeskError> {
        let result: Result<Ticket, HelpdeskError> = async {
            request.validate()?;
            self.tickets.get_current(ctx, id).await?;
            if let Some(category_id) = request.category_id {
                self.require_active_category(ctx, category_id).await?;
            }
            self.tickets
                .update(ctx, id, move |ticket| {
                    request.apply(ticket);
                    Ok(())
                })
                .await
        }
        .await;
        let ticket = result.inspect_err(|e| log_rejection("update_ticket", e))?;
        info!(ticket_id = %id, editor = %editor, version_id = %ticket.id, "ticket updated");
        Ok(ticket)
    }

    /// Archive an OPEN ticket. Requires `ticket:delete`.
    pub async fn delete_ticket(
        &self,
        ctx: &CallContext,
        id: TicketId,
        requester: UserId,
    ) -> Result<(), HelpdeskError> {
        let result: Result<Ticket, HelpdeskError> = async {
            self.authorize(ctx, requester, Permission::TicketDelete).await?;
            self.tickets
                .archive_where(ctx, id, |current| {
                    if current.status != TicketStatus::Open {
                        return Err(HelpdeskError::InvalidState(format!(
                            "only OPEN tickets can be deleted, ticket is {}",
                            current.status
                        )));
                    }
                    Ok(())
                })
                .await
        }
        .await;
        result.inspect_err(|e| log_rejection("delete_ticket", e))?;
        info!(ticket_id = %id, requester = %requester, "ticket deleted");
        Ok(())
    }

    /// One page of current tickets. Page 0 is the first page and page size
    /// 0 is the configured default.
    pub async fn list_tickets(
        &self,
        ctx: &CallContext,
        query: TicketQuery,
    ) -> Result<TicketPage, HelpdeskError> {
        let page = query
            .filter
            .validate()
            .and_then(|()| self.page_request(query.page, query.page_size))
            .inspect_err(|e| log_rejection("list_tickets", e))?;
        let sort = query.sort.unwrap_or_default();
        self.tickets.list(ctx, &query.filter, sort, page).await
    }

    /// Tickets opened by `creator`.
    pub async fn list_tickets_by_creator(
        &self,
        ctx: &CallContext,
        creator: UserId,
        mut query: TicketQuery,
    ) -> Result<TicketPage, HelpdeskError> {
        query.filter.created_by = Some(creator);
        self.list_tickets(ctx, query).await
    }

    /// Tickets assigned to `agent`.
    pub async fn list_tickets_by_agent(
        &self,
        ctx: &CallContext,
        agent: UserId,
        mut query: TicketQuery,
    ) -> Result<TicketPage, HelpdeskError> {
        query.filter.assigned_to = Some(agent);
        self.list_tickets(ctx, query).await
    }

    /// Assign to an active support agent, manager, or administrator. Any
    /// status may be reassigned.
    pub async fn assign_ticket(
        &self,
        ctx: &CallContext,
        id: TicketId,
        agent: UserId,
        assigner: UserId,
    ) -> Result<Ticket, HelpdeskError> {
        let result: Result<Ticket, HelpdeskError> = async {
            self.tickets.get_current(ctx, id).await?;
            self.require_target(ctx, agent, UserRole::is_agent_or_higher, "a support agent")
                .await?;
            self.tickets.assign_to_agent(ctx, id, agent).await
        }
        .await;
        let ticket = result.inspect_err(|e| log_rejection("assign_ticket", e))?;
        info!(ticket_id = %id, agent = %agent, assigner = %assigner, "ticket assigned");
        Ok(ticket)
    }

    /// Move through the workflow. Illegal transitions write nothing.
    pub async fn update_ticket_status(
        &self,
        ctx: &CallContext,
        id: TicketId,
        status: TicketStatus,
        editor: UserId,
    ) -> Result<Ticket, HelpdeskError> {
        let result: Result<Ticket, HelpdeskError> = async {
            let current = self.tickets.get_current(ctx, id).await?;
            if !current.status.can_transition_to(status) {
                return Err(HelpdeskError::InvalidTransition {
                    from: current.status,
                    to: status,
                });
            }
            self.tickets.update_status(ctx, id, status).await
        }
        .await;
        let ticket = result.inspect_err(|e| log_rejection("update_ticket_status", e))?;
        info!(ticket_id = %id, %status, editor = %editor, "ticket status changed");
        Ok(ticket)
    }

    /// One-shot escalation to a manager or administrator.
    pub async fn escalate_ticket(
        &self,
        ctx: &CallContext,
        id: TicketId,
        request: EscalateTicketRequest,
        escalator: UserId,
    ) -> Result<Ticket, HelpdeskError> {
        let result: Result<Ticket, HelpdeskError> = async {
            request.validate()?;
            let current = self.tickets.get_current(ctx, id).await?;
            if current.is_escalated() {
                return Err(HelpdeskError::AlreadyEscalated {
                    ticket_id: id.to_string(),
                });
            }
            self.require_target(
                ctx,
                request.target,
                UserRole::is_manager_or_admin,
                "a manager or administrator",
            )
            .await?;
            self.tickets
                .escalate(ctx, id, request.target, request.reason)
                .await
        }
        .await;
        let ticket = result.inspect_err(|e| log_rejection("escalate_ticket", e))?;
        debug!(ticket_id = %id, escalator = %escalator, "escalation recorded");
        Ok(ticket)
    }

    pub async fn get_ticket_stats(&self, ctx: &CallContext) -> Result<TicketStats, HelpdeskError> {
        self.tickets.stats(ctx).await
    }
}
