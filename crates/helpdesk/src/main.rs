// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! helpdesk - command-line front end for the ticket backend.
//!
//! Every subcommand opens the configured database, runs one service
//! operation as the `--as` user, and prints the result as JSON.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod output;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use helpdesk_core::{
    CategoryId, SortDirection, TicketId, TicketPriority, TicketSortField, TicketStatus, UserId,
    UserRole, VersionId,
};

/// helpdesk - versioned ticket management.
#[derive(Parser, Debug)]
#[command(name = "helpdesk", version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Acting user: a user id or an email address.
    #[arg(long = "as", global = true, value_name = "USER")]
    actor: Option<String>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database, run migrations, and seed defaults.
    Init,
    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Manage ticket categories.
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Work with tickets.
    Ticket {
        #[command(subcommand)]
        action: TicketCommand,
    },
    /// Show ticket counts.
    Stats,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Add a user.
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, default_value = "END_USER")]
        role: UserRole,
    },
    /// List users.
    List,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// Add a category.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        parent: Option<CategoryId>,
    },
    /// List categories.
    List {
        /// Include disabled categories.
        #[arg(long)]
        all: bool,
    },
    /// Stop accepting new tickets in a category.
    Disable { id: CategoryId },
    /// Re-enable a category.
    Enable { id: CategoryId },
}

#[derive(Subcommand, Debug)]
enum TicketCommand {
    /// Open a ticket.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "MEDIUM")]
        priority: TicketPriority,
        #[arg(long)]
        category: Option<CategoryId>,
        /// Due date, RFC 3339.
        #[arg(long)]
        due: Option<DateTime<Utc>>,
    },
    /// Show the current version, or one exact version.
    Show {
        id: TicketId,
        #[arg(long)]
        version: Option<VersionId>,
    },
    /// Show every stored version, oldest first.
    History { id: TicketId },
    /// Show the field-level change log.
    Changes { id: TicketId },
    /// List current tickets.
    List(ListArgs),
    /// Edit fields of a ticket.
    Update {
        id: TicketId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<TicketPriority>,
        #[arg(long)]
        category: Option<CategoryId>,
        #[arg(long)]
        due: Option<DateTime<Utc>>,
    },
    /// Move a ticket through the workflow.
    Status { id: TicketId, status: TicketStatus },
    /// Assign a ticket to an agent.
    Assign { id: TicketId, agent: UserId },
    /// Escalate a ticket to a manager or administrator.
    Escalate {
        id: TicketId,
        #[arg(long)]
        to: UserId,
        #[arg(long)]
        reason: String,
    },
    /// Delete (archive) an open ticket.
    Delete { id: TicketId },
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    #[arg(long)]
    status: Option<TicketStatus>,
    #[arg(long)]
    priority: Option<TicketPriority>,
    #[arg(long)]
    category: Option<CategoryId>,
    #[arg(long)]
    assigned_to: Option<UserId>,
    #[arg(long)]
    created_by: Option<UserId>,
    #[arg(long)]
    escalated: Option<bool>,
    #[arg(long)]
    overdue: Option<bool>,
    #[arg(long)]
    from: Option<DateTime<Utc>>,
    #[arg(long)]
    to: Option<DateTime<Utc>>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    sort: Option<TicketSortField>,
    #[arg(long)]
    direction: Option<SortDirection>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// 0 uses the configured default.
    #[arg(long, default_value_t = 0)]
    page_size: u32,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => helpdesk_config::load_and_validate_path(path),
        None => helpdesk_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            helpdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let permissions = match config.permissions.build_table() {
        Ok(table) => table,
        Err(errors) => {
            helpdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let app = match commands::App::open(config, permissions, cli.actor, cli.plain).await {
        Ok(app) => app,
        Err(e) => {
            output::print_error(&e, cli.plain);
            std::process::exit(2);
        }
    };

    let cancel = app.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = commands::run(&app, cli.command).await;
    if let Err(e) = app.close().await {
        tracing::warn!(error = %e, "failed to close storage cleanly");
    }
    if let Err(e) = result {
        output::print_error(&e, cli.plain);
        std::process::exit(if e.is_rejection() { 1 } else { 2 });
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("helpdesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
