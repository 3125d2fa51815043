// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The versioned entity capability.
//!
//! A versioned entity is stored as a chain of immutable version rows that
//! share one logical key. At most one row per key is current (no expiration).
//! A change never edits a row: the current row is expired and a successor,
//! produced by [`VersionedEntity::next_version`], is inserted in the same
//! transaction.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{Ticket, TicketId, VersionId};

pub trait VersionedEntity: Clone + Send + Sync + 'static {
    /// Stable logical identity shared by every version.
    type Key: Copy + Eq + fmt::Display + Into<Uuid> + Send + Sync + 'static;

    fn key(&self) -> Self::Key;

    /// Identity of this version row.
    fn version_id(&self) -> VersionId;

    fn creation_time(&self) -> DateTime<Utc>;

    fn expiration_time(&self) -> Option<DateTime<Utc>>;

    fn set_expiration_time(&mut self, at: DateTime<Utc>);

    fn is_current(&self) -> bool {
        self.expiration_time().is_none()
    }

    /// Successor version: every business field carried forward, fresh
    /// version id, `creation_time = now`, no expiration.
    fn next_version(&self, now: DateTime<Utc>) -> Self;

    /// Whether `self` may follow `previous` in the same chain. Fields that
    /// are fixed for the lifetime of the logical entity must match.
    fn preserves_lineage(&self, previous: &Self) -> bool {
        let _ = previous;
        true
    }
}

impl VersionedEntity for Ticket {
    type Key = TicketId;

    fn key(&self) -> TicketId {
        self.ticket_id
    }

    fn version_id(&self) -> VersionId {
        self.id
    }

    fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.expiration_time
    }

    fn set_expiration_time(&mut self, at: DateTime<Utc>) {
        self.expiration_time = Some(at);
    }

    fn next_version(&self, now: DateTime<Utc>) -> Self {
        Self {
            id: VersionId::new(),
            creation_time: now,
            expiration_time: None,
            ..self.clone()
        }
    }

    fn preserves_lineage(&self, previous: &Self) -> bool {
        self.created_by_id == previous.created_by_id && self.created_at == previous.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{utc_now, TicketDraft, TicketPriority, UserId};
    use chrono::Duration;

    fn ticket() -> Ticket {
        let mut t = Ticket::open(
            TicketDraft {
                title: "A".to_string(),
                description: "body".to_string(),
                priority: TicketPriority::Low,
                category_id: None,
                due_date: Some(utc_now() + Duration::days(3)),
            },
            UserId::new(),
            utc_now(),
        );
        t.assigned_agent_id = Some(UserId::new());
        t.escalation_reason = Some("vip".to_string());
        t
    }

    #[test]
    fn next_version_carries_every_business_field() {
        let prev = ticket();
        let now = prev.creation_time + Duration::seconds(1);
        let next = prev.next_version(now);

        assert_ne!(next.id, prev.id);
        assert_eq!(next.key(), prev.key());
        assert_eq!(next.creation_time, now);
        assert!(next.is_current());

        let mut normalized = next.clone();
        normalized.id = prev.id;
        normalized.creation_time = prev.creation_time;
        assert_eq!(normalized, prev);
    }

    #[test]
    fn next_version_of_expired_row_is_current() {
        let mut prev = ticket();
        prev.set_expiration_time(utc_now());
        assert!(!prev.is_current());
        assert!(prev.next_version(utc_now()).is_current());
    }

    #[test]
    fn lineage_rejects_creator_change() {
        let prev = ticket();
        let mut next = prev.next_version(utc_now());
        assert!(next.preserves_lineage(&prev));

        next.created_by_id = UserId::new();
        assert!(!next.preserves_lineage(&prev));
    }
}
