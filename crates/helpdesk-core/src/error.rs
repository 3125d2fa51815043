// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the helpdesk ticket backend.

use thiserror::Error;

use crate::types::TicketStatus;

/// The primary error type used across stores, directories, and the ticket service.
#[derive(Debug, Error)]
pub enum HelpdeskError {
    /// Configuration errors (invalid TOML, bad permission names, out-of-range limits).
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller-supplied data failed a precondition (bad category, bad target user, bad field value).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced logical entity or version does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requested status change is not in the transition table.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    /// The entity is in a state that forbids the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The caller lacks the required privilege. Never carries detail.
    #[error("insufficient permission")]
    Unauthorized,

    /// Escalation is one-shot per logical ticket.
    #[error("ticket {ticket_id} is already escalated")]
    AlreadyEscalated { ticket_id: String },

    /// Storage backend errors (connection, constraint violation, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transient write contention. The transaction was rolled back and the
    /// operation may be retried as-is.
    #[error("storage conflict: {source}")]
    Conflict {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The caller's deadline passed before the operation committed.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The caller cancelled the operation before it committed.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HelpdeskError {
    /// Shorthand for a missing ticket.
    pub fn ticket_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "ticket",
            id: id.to_string(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the error was produced by a business rule rather than by
    /// storage or the caller's context.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::InvalidTransition { .. }
                | Self::InvalidState(_)
                | Self::Unauthorized
                | Self::AlreadyEscalated { .. }
        )
    }
}
