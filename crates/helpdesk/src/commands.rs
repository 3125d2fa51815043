// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand dispatch.

use std::time::Duration;

use helpdesk_config::HelpdeskConfig;
use helpdesk_core::{
    CallContext, Category, HelpdeskError, Permission, PermissionTable, StorageAdapter,
    Ticket, TicketFilter, TicketQuery, TicketSort, User, UserId,
};
use helpdesk_storage::{CategoryStore, SqliteStorage, UserStore, seed_defaults};
use helpdesk_tickets::history::diff_history;
use helpdesk_tickets::{
    CreateTicketRequest, EscalateTicketRequest, TicketService, UpdateTicketRequest,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::output::{print_json, print_stats};
use crate::{CategoryCommand, Commands, ListArgs, TicketCommand, UserCommand};

/// Everything a command needs: the opened storage, the service, and the
/// acting user as given on the command line.
pub struct App {
    storage: SqliteStorage,
    service: TicketService,
    users: UserStore,
    categories: CategoryStore,
    root: CallContext,
    timeout: Option<Duration>,
    actor: Option<String>,
    plain: bool,
}

impl App {
    pub async fn open(
        config: HelpdeskConfig,
        permissions: PermissionTable,
        actor: Option<String>,
        plain: bool,
    ) -> Result<Self, HelpdeskError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let service = TicketService::from_storage(&storage, permissions, config.listing.clone())?;
        Ok(Self {
            users: storage.users()?,
            categories: storage.categories()?,
            service,
            storage,
            root: CallContext::background(),
            timeout: config.operations.timeout(),
            actor,
            plain,
        })
    }

    /// Cancelling this token aborts whatever operation is in flight.
    pub fn cancel_token(&self) -> CancellationToken {
        self.root.token().clone()
    }

    fn ctx(&self) -> CallContext {
        self.root.child().timeout(self.timeout)
    }

    pub async fn close(&self) -> Result<(), HelpdeskError> {
        self.storage.close().await
    }

    /// Resolve `--as` to a user id. Accepts an id or an email address.
    async fn actor_id(&self, ctx: &CallContext) -> Result<UserId, HelpdeskError> {
        let Some(actor) = self.actor.as_deref() else {
            return Err(HelpdeskError::Validation(
                "this command needs an acting user: pass --as <USER>".into(),
            ));
        };
        if let Ok(id) = actor.parse::<UserId>() {
            return Ok(id);
        }
        match self.users.get_by_email(ctx, actor).await? {
            Some(user) => Ok(user.id),
            None => Err(HelpdeskError::Validation(format!("unknown user {actor}"))),
        }
    }

    async fn authorize(
        &self,
        ctx: &CallContext,
        permission: Permission,
    ) -> Result<User, HelpdeskError> {
        let actor = self.actor_id(ctx).await?;
        self.service.authorize(ctx, actor, permission).await
    }
}

pub async fn run(app: &App, command: Commands) -> Result<(), HelpdeskError> {
    match command {
        Commands::Init => init(app).await,
        Commands::User { action } => user(app, action).await,
        Commands::Category { action } => category(app, action).await,
        Commands::Ticket { action } => ticket(app, action).await,
        Commands::Stats => {
            let ctx = app.ctx();
            app.authorize(&ctx, Permission::TicketStatsRead).await?;
            let stats = app.service.get_ticket_stats(&ctx).await?;
            print_stats(&stats, app.plain);
            Ok(())
        }
    }
}

async fn init(app: &App) -> Result<(), HelpdeskError> {
    let ctx = app.ctx();
    match seed_defaults(app.storage.database()?, &ctx).await? {
        Some(report) => print_json(&json!({
            "seeded": true,
            "admin": report.admin,
            "categories": report.categories,
        })),
        None => {
            debug!("database already seeded");
            print_json(&json!({ "seeded": false }))
        }
    }
}

async fn user(app: &App, action: UserCommand) -> Result<(), HelpdeskError> {
    let ctx = app.ctx();
    app.authorize(&ctx, Permission::UserManage).await?;
    match action {
        UserCommand::Add {
            email,
            first_name,
            last_name,
            role,
        } => {
            let user = app
                .users
                .create(&ctx, User::new(email, first_name, last_name, role))
                .await?;
            print_json(&user)
        }
        UserCommand::List => print_json(&app.users.list(&ctx).await?),
    }
}

async fn category(app: &App, action: CategoryCommand) -> Result<(), HelpdeskError> {
    let ctx = app.ctx();
    match action {
        CategoryCommand::List { all } => print_json(&app.categories.list(&ctx, all).await?),
        CategoryCommand::Add {
            name,
            description,
            parent,
        } => {
            app.authorize(&ctx, Permission::SystemAdmin).await?;
            let mut category = Category::new(name, description);
            category.parent_id = parent;
            print_json(&app.categories.create(&ctx, category).await?)
        }
        CategoryCommand::Disable { id } => {
            app.authorize(&ctx, Permission::SystemAdmin).await?;
            print_json(&app.categories.set_active(&ctx, id, false).await?)
        }
        CategoryCommand::Enable { id } => {
            app.authorize(&ctx, Permission::SystemAdmin).await?;
            print_json(&app.categories.set_active(&ctx, id, true).await?)
        }
    }
}

async fn ticket(app: &App, action: TicketCommand) -> Result<(), HelpdeskError> {
    let ctx = app.ctx();
    let svc = &app.service;
    match action {
        TicketCommand::Create {
            title,
            description,
            priority,
            category,
            due,
        } => {
            let user = app.authorize(&ctx, Permission::TicketCreate).await?;
            let mut request = CreateTicketRequest::new(title, description);
            request.priority = priority;
            request.category_id = category;
            request.due_date = due;
            print_json(&svc.create_ticket(&ctx, request, user.id).await?)
        }
        TicketCommand::Show { id, version } => {
            let ticket = match version {
                Some(version_id) => {
                    let ticket = svc.get_ticket_version(&ctx, version_id).await?;
                    if ticket.ticket_id != id {
                        return Err(HelpdeskError::NotFound {
                            entity: "version",
                            id: version_id.to_string(),
                        });
                    }
                    ticket
                }
                None => svc.get_ticket(&ctx, id).await?,
            };
            authorize_read(app, &ctx, &ticket).await?;
            print_json(&ticket)
        }
        TicketCommand::History { id } => {
            let history = svc.get_ticket_history(&ctx, id).await?;
            if let Some(latest) = history.last() {
                authorize_read(app, &ctx, latest).await?;
            }
            print_json(&history)
        }
        TicketCommand::Changes { id } => {
            let history = svc.get_ticket_history(&ctx, id).await?;
            if let Some(latest) = history.last() {
                authorize_read(app, &ctx, latest).await?;
            }
            print_json(&diff_history(&history))
        }
        TicketCommand::List(args) => list(app, &ctx, args).await,
        TicketCommand::Update {
            id,
            title,
            description,
            priority,
            category,
            due,
        } => {
            let current = svc.get_ticket(&ctx, id).await?;
            let actor = app.actor_id(&ctx).await?;
            svc.authorize_ticket(
                &ctx,
                actor,
                &current,
                Permission::TicketUpdate,
                Permission::TicketUpdateOwn,
            )
            .await?;
            let request = UpdateTicketRequest {
                title,
                description,
                priority,
                category_id: category,
                due_date: due,
            };
            print_json(&svc.update_ticket(&ctx, id, request, actor).await?)
        }
        TicketCommand::Status { id, status } => {
            let user = app.authorize(&ctx, Permission::TicketStatusUpdate).await?;
            print_json(&svc.update_ticket_status(&ctx, id, status, user.id).await?)
        }
        TicketCommand::Assign { id, agent } => {
            let user = app.authorize(&ctx, Permission::TicketAssign).await?;
            print_json(&svc.assign_ticket(&ctx, id, agent, user.id).await?)
        }
        TicketCommand::Escalate { id, to, reason } => {
            let user = app.authorize(&ctx, Permission::TicketEscalate).await?;
            let request = EscalateTicketRequest { target: to, reason };
            print_json(&svc.escalate_ticket(&ctx, id, request, user.id).await?)
        }
        TicketCommand::Delete { id } => {
            let actor = app.actor_id(&ctx).await?;
            svc.delete_ticket(&ctx, id, actor).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

async fn authorize_read(
    app: &App,
    ctx: &CallContext,
    ticket: &Ticket,
) -> Result<(), HelpdeskError> {
    let actor = app.actor_id(ctx).await?;
    app.service
        .authorize_ticket(
            ctx,
            actor,
            ticket,
            Permission::TicketRead,
            Permission::TicketReadOwn,
        )
        .await?;
    Ok(())
}

fn query_from_args(args: ListArgs) -> TicketQuery {
    let sort = match (args.sort, args.direction) {
        (None, None) => None,
        (field, direction) => Some(TicketSort {
            field: field.unwrap_or_default(),
            direction: direction.unwrap_or_default(),
        }),
    };
    TicketQuery {
        filter: TicketFilter {
            status: args.status,
            priority: args.priority,
            category_id: args.category,
            assigned_to: args.assigned_to,
            created_by: args.created_by,
            is_escalated: args.escalated,
            is_overdue: args.overdue,
            created_from: args.from,
            created_to: args.to,
            search: args.search,
        },
        sort,
        page: args.page,
        page_size: args.page_size,
    }
}

/// Users with `ticket:read` see every ticket; users with only
/// `ticket:read:own` see the tickets they opened.
async fn list(app: &App, ctx: &CallContext, args: ListArgs) -> Result<(), HelpdeskError> {
    let actor = app.actor_id(ctx).await?;
    let user = app
        .users
        .get(ctx, actor)
        .await?
        .filter(|u| u.is_active)
        .ok_or(HelpdeskError::Unauthorized)?;
    let permissions = app.service.permissions();
    let query = query_from_args(args);

    let page = if permissions.allows(user.role, Permission::TicketRead) {
        app.service.list_tickets(ctx, query).await?
    } else if permissions.allows(user.role, Permission::TicketReadOwn) {
        app.service
            .list_tickets_by_creator(ctx, user.id, query)
            .await?
    } else {
        return Err(HelpdeskError::Unauthorized);
    };
    print_json(&page)
}
