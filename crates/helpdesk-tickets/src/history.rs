// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change log derived from a ticket's version history.
//!
//! Nothing here is stored: each entry is computed by comparing a version
//! with its predecessor, so the log can never drift from the history.

use chrono::{DateTime, SecondsFormat, Utc};
use helpdesk_core::{Ticket, VersionId};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    StatusChanged,
    Assigned,
    Escalated,
    Archived,
}

/// One field-level change between two consecutive versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketChange {
    /// Version that introduced the change (the archived version for
    /// [`ChangeAction::Archived`]).
    pub version_id: VersionId,
    pub at: DateTime<Utc>,
    pub action: ChangeAction,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

fn render<T: ToString>(value: &Option<T>) -> Option<String> {
    value.as_ref().map(ToString::to_string)
}

fn render_time(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Diff `history` (oldest first) into a flat change list.
pub fn diff_history(history: &[Ticket]) -> Vec<TicketChange> {
    let Some(first) = history.first() else {
        return Vec::new();
    };

    let mut changes = vec![TicketChange {
        version_id: first.id,
        at: first.creation_time,
        action: ChangeAction::Created,
        field: None,
        old_value: None,
        new_value: Some(first.title.clone()),
    }];

    for pair in history.windows(2) {
        changes.extend(diff_versions(&pair[0], &pair[1]));
    }

    if let Some(last) = history.last()
        && let Some(expired) = last.expiration_time
    {
        changes.push(TicketChange {
            version_id: last.id,
            at: expired,
            action: ChangeAction::Archived,
            field: None,
            old_value: Some(last.status.to_string()),
            new_value: None,
        });
    }
    changes
}

/// Changes that turn `prev` into `next`.
pub fn diff_versions(prev: &Ticket, next: &Ticket) -> Vec<TicketChange> {
    let mut out = Vec::new();
    let mut push = |action, field: &str, old: Option<String>, new: Option<String>| {
        if old != new {
            out.push(TicketChange {
                version_id: next.id,
                at: next.creation_time,
                action,
                field: Some(field.to_string()),
                old_value: old,
                new_value: new,
            });
        }
    };

    push(
        ChangeAction::StatusChanged,
        "status",
        Some(prev.status.to_string()),
        Some(next.status.to_string()),
    );
    push(
        ChangeAction::Assigned,
        "assigned_agent_id",
        render(&prev.assigned_agent_id),
        render(&next.assigned_agent_id),
    );
    push(
        ChangeAction::Escalated,
        "escalated_to",
        render(&prev.escalated_to),
        render(&next.escalated_to),
    );
    push(
        ChangeAction::Updated,
        "title",
        Some(prev.title.clone()),
        Some(next.title.clone()),
    );
    push(
        ChangeAction::Updated,
        "description",
        Some(prev.description.clone()),
        Some(next.description.clone()),
    );
    push(
        ChangeAction::Updated,
        "priority",
        Some(prev.priority.to_string()),
        Some(next.priority.to_string()),
    );
    push(
        ChangeAction::Updated,
        "category_id",
        render(&prev.category_id),
        render(&next.category_id),
    );
    push(
        ChangeAction::Updated,
        "due_date",
        render_time(&prev.due_date),
        render_time(&next.due_date),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::{
        TicketDraft, TicketPriority, TicketStatus, UserId, VersionedEntity, utc_now,
    };

    fn first() -> Ticket {
        Ticket::open(
            TicketDraft {
                title: "Printer on fire".into(),
                description: "third floor".into(),
                priority: TicketPriority::Low,
                category_id: None,
                due_date: None,
            },
            UserId::new(),
            utc_now(),
        )
    }

    fn successor(prev: &mut Ticket) -> Ticket {
        let now = utc_now().max(prev.creation_time);
        prev.expiration_time = Some(now);
        prev.next_version(now)
    }

    #[test]
    fn empty_history_has_no_changes() {
        assert!(diff_history(&[]).is_empty());
    }

    #[test]
    fn single_version_is_created_only() {
        let v1 = first();
        let changes = diff_history(std::slice::from_ref(&v1));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, ChangeAction::Created);
        assert_eq!(changes[0].version_id, v1.id);
    }

    #[test]
    fn status_and_priority_changes_are_separate_entries() {
        let mut v1 = first();
        let mut v2 = successor(&mut v1);
        v2.apply_status(TicketStatus::InProgress, v2.creation_time);
        v2.priority = TicketPriority::High;

        let changes = diff_versions(&v1, &v2);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].action, ChangeAction::StatusChanged);
        assert_eq!(changes[0].old_value.as_deref(), Some("OPEN"));
        assert_eq!(changes[0].new_value.as_deref(), Some("IN_PROGRESS"));
        assert_eq!(changes[1].action, ChangeAction::Updated);
        assert_eq!(changes[1].field.as_deref(), Some("priority"));
        assert!(changes.iter().all(|c| c.version_id == v2.id));
    }

    #[test]
    fn escalation_and_assignment_are_labelled() {
        let mut v1 = first();
        let agent = UserId::new();
        let manager = UserId::new();
        let mut v2 = successor(&mut v1);
        v2.assigned_agent_id = Some(agent);
        let mut v3 = successor(&mut v2);
        v3.escalated_at = Some(v3.creation_time);
        v3.escalated_to = Some(manager);
        v3.escalation_reason = Some("vip".into());

        let changes = diff_history(&[v1, v2, v3]);
        let actions: Vec<ChangeAction> = changes.iter().map(|c| c.action).collect();
        assert_eq!(
            actions,
            vec![
                ChangeAction::Created,
                ChangeAction::Assigned,
                ChangeAction::Escalated
            ]
        );
        assert_eq!(changes[1].new_value, Some(agent.to_string()));
        assert_eq!(changes[2].new_value, Some(manager.to_string()));
    }

    #[test]
    fn expired_tail_reports_archive() {
        let mut v1 = first();
        let at = utc_now();
        v1.expiration_time = Some(at);
        let changes = diff_history(&[v1]);
        let last = changes.last().unwrap();
        assert_eq!(last.action, ChangeAction::Archived);
        assert_eq!(last.at, at);
    }

    #[test]
    fn action_names_are_snake_case() {
        assert_eq!(ChangeAction::StatusChanged.to_string(), "status_changed");
        assert_eq!(
            serde_json::to_string(&ChangeAction::Archived).unwrap(),
            "\"archived\""
        );
    }
}
