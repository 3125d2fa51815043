// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-supplied request payloads and their field rules.

use chrono::{DateTime, SubsecRound, Utc};
use helpdesk_core::{
    CategoryId, HelpdeskError, Ticket, TicketDraft, TicketPriority, TicketStatus, UserId,
    storable_instant,
};
use serde::{Deserialize, Serialize};

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 255;

fn check_title(title: &str) -> Result<(), HelpdeskError> {
    if title.trim().is_empty() {
        return Err(HelpdeskError::Validation("title must not be empty".into()));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(HelpdeskError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), HelpdeskError> {
    if description.trim().is_empty() {
        return Err(HelpdeskError::Validation(
            "description must not be empty".into(),
        ));
    }
    Ok(())
}

/// Payload for opening a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: TicketPriority,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Accepted for wire compatibility and ignored: new tickets start OPEN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
}

impl CreateTicketRequest {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: TicketPriority::default(),
            category_id: None,
            due_date: None,
            status: None,
        }
    }

    pub fn validate(&self) -> Result<(), HelpdeskError> {
        check_title(&self.title)?;
        check_description(&self.description)?;
        if let Some(due) = self.due_date {
            storable_instant("due_date", due)?;
        }
        Ok(())
    }

    /// The draft for the first version. Call after [`Self::validate`].
    pub fn into_draft(self) -> TicketDraft {
        TicketDraft {
            title: self.title,
            description: self.description,
            priority: self.priority,
            category_id: self.category_id,
            due_date: self.due_date.map(|d| d.trunc_subsecs(6)),
        }
    }
}

/// Partial edit of a ticket's business fields. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTicketRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateTicketRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.category_id.is_none()
            && self.due_date.is_none()
    }

    pub fn validate(&self) -> Result<(), HelpdeskError> {
        if self.is_empty() {
            return Err(HelpdeskError::Validation("no fields to update".into()));
        }
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        if let Some(due) = self.due_date {
            storable_instant("due_date", due)?;
        }
        Ok(())
    }

    /// Copy the present fields onto `ticket`.
    pub fn apply(self, ticket: &mut Ticket) {
        if let Some(title) = self.title {
            ticket.title = title;
        }
        if let Some(description) = self.description {
            ticket.description = description;
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
        if let Some(category_id) = self.category_id {
            ticket.category_id = Some(category_id);
        }
        if let Some(due_date) = self.due_date {
            ticket.due_date = Some(due_date.trunc_subsecs(6));
        }
    }
}

/// Hand a ticket to a manager or administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalateTicketRequest {
    pub target: UserId,
    pub reason: String,
}

impl EscalateTicketRequest {
    pub fn validate(&self) -> Result<(), HelpdeskError> {
        if self.reason.trim().is_empty() {
            return Err(HelpdeskError::Validation(
                "escalation reason must not be empty".into(),
            ));
        }
        Ok(())
    }
}
