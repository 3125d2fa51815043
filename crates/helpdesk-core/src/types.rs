// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the stores, the ticket service, and the binary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::error::HelpdeskError;

/// Hard upper bound on page size regardless of configuration.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Current UTC time at the precision the store persists (microseconds).
pub fn utc_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Check that `t` lies in years 0000 through 9999, the range persisted
/// timestamps can hold, and truncate it to microseconds.
pub fn storable_instant(field: &str, t: DateTime<Utc>) -> Result<DateTime<Utc>, HelpdeskError> {
    if !(0..=9999).contains(&t.year()) {
        return Err(HelpdeskError::Validation(format!(
            "{field} must fall between years 0000 and 9999, got {t}"
        )));
    }
    Ok(t.trunc_subsecs(6))
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Stable identifier of a logical ticket, shared by all of its versions.
    TicketId
);
uuid_id!(
    /// Identifier of one stored version row.
    VersionId
);
uuid_id!(
    /// Identifier of a user in the user directory.
    UserId
);
uuid_id!(
    /// Identifier of a category in the category directory.
    CategoryId
);

/// Health status reported by storage health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

/// Ticket workflow status.
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
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Statuses reachable from `self` in one step.
    pub fn allowed_transitions(self) -> &'static [TicketStatus] {
        use TicketStatus::*;
        match self {
            Open => &[InProgress, Resolved, Closed],
            InProgress => &[Open, Resolved, Closed],
            Resolved => &[InProgress, Closed],
            Closed => &[Open, InProgress],
        }
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: TicketStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// RESOLVED and CLOSED carry a resolution timestamp.
    pub fn is_resolution(self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }

    /// Position in the workflow, used for sorting.
    pub fn rank(self) -> u8 {
        match self {
            TicketStatus::Open => 0,
            TicketStatus::InProgress => 1,
            TicketStatus::Resolved => 2,
            TicketStatus::Closed => 3,
        }
    }
}

/// Ticket priority.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TicketPriority {
    /// Severity rank, used for sorting.
    pub fn rank(self) -> u8 {
        match self {
            TicketPriority::Low => 0,
            TicketPriority::Medium => 1,
            TicketPriority::High => 2,
            TicketPriority::Critical => 3,
        }
    }
}

/// Role held by a user.
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
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    EndUser,
    SupportAgent,
    Manager,
    Administrator,
}

impl UserRole {
    /// Support agent or any role above it.
    pub fn is_agent_or_higher(self) -> bool {
        !matches!(self, UserRole::EndUser)
    }

    /// Eligible escalation target.
    pub fn is_manager_or_admin(self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Administrator)
    }
}

/// A user as seen through the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A new active user created now.
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
            is_active: true,
            created_at: utc_now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A ticket category as seen through the category directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// A new active top-level category created now.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            description: description.into(),
            parent_id: None,
            is_active: true,
            created_at: utc_now(),
        }
    }
}

/// Business fields supplied when opening a new ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub category_id: Option<CategoryId>,
    pub due_date: Option<DateTime<Utc>>,
}

/// One stored version of a ticket.
///
/// `id` identifies this version row; `ticket_id` identifies the logical
/// ticket across all of its versions. `created_at` is the creation time of
/// the first version and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: VersionId,
    pub ticket_id: TicketId,
    pub creation_time: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,

    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category_id: Option<CategoryId>,
    pub assigned_agent_id: Option<UserId>,
    pub created_by_id: UserId,
    pub escalated_at: Option<DateTime<Utc>>,
    pub escalated_to: Option<UserId>,
    pub escalation_reason: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Ticket {
    /// First version of a new logical ticket. Status is always OPEN.
    pub fn open(draft: TicketDraft, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: VersionId::new(),
            ticket_id: TicketId::new(),
            creation_time: now,
            expiration_time: None,
            created_at: now,
            title: draft.title,
            description: draft.description,
            status: TicketStatus::Open,
            priority: draft.priority,
            category_id: draft.category_id,
            assigned_agent_id: None,
            created_by_id: created_by,
            escalated_at: None,
            escalated_to: None,
            escalation_reason: None,
            resolved_at: None,
            due_date: draft.due_date,
        }
    }

    pub fn is_escalated(&self) -> bool {
        self.escalated_at.is_some()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_some_and(|due| due < now)
    }

    /// Set the status and maintain `resolved_at`: stamped on entering
    /// RESOLVED/CLOSED, cleared on reopening.
    pub fn apply_status(&mut self, status: TicketStatus, now: DateTime<Utc>) {
        self.status = status;
        if status.is_resolution() {
            self.resolved_at = Some(now);
        } else {
            self.resolved_at = None;
        }
    }
}

/// Filter predicates for ticket listings. All present predicates are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category_id: Option<CategoryId>,
    pub assigned_to: Option<UserId>,
    pub created_by: Option<UserId>,
    pub is_escalated: Option<bool>,
    pub is_overdue: Option<bool>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn validate(&self) -> Result<(), HelpdeskError> {
        if let Some(from) = self.created_from {
            storable_instant("created_from", from)?;
        }
        if let Some(to) = self.created_to {
            storable_instant("created_to", to)?;
        }
        Ok(())
    }
}

/// Sortable ticket fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketSortField {
    /// Creation time of the logical ticket.
    #[default]
    CreatedAt,
    /// Creation time of the current version.
    UpdatedAt,
    Priority,
    Status,
    Title,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSort {
    pub field: TicketSortField,
    pub direction: SortDirection,
}

/// A complete listing request before paging defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketQuery {
    pub filter: TicketFilter,
    pub sort: Option<TicketSort>,
    /// 1-indexed; 0 means "first page".
    pub page: u32,
    /// 0 means "configured default".
    pub page_size: u32,
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Build a page window. `page` must be at least 1 and `page_size` within
    /// `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Result<Self, HelpdeskError> {
        if page == 0 {
            return Err(HelpdeskError::Validation(
                "page must be at least 1".to_string(),
            ));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(HelpdeskError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// `ceil(total / page_size)`.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }
}

/// One page of current tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// Aggregate counts over current ticket versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStats {
    pub total: u64,
    pub open: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub closed: u64,
    pub escalated: u64,
    pub overdue: u64,
}
