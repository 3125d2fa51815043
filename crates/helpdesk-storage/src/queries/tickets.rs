// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket table mapping and the ticket store.

use chrono::{DateTime, Utc};
use helpdesk_core::{
    CallContext, HelpdeskError, PageRequest, SortDirection, Ticket, TicketFilter, TicketId,
    TicketPage, TicketSort, TicketSortField, TicketStats, TicketStatus, UserId, VersionId,
    utc_now,
};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::{debug, info};

use crate::codec;
use crate::database::Database;
use crate::versioned::{VersionedStore, VersionedTable};
use crate::writer;

impl VersionedTable for Ticket {
    const ENTITY: &'static str = "ticket";
    const TABLE: &'static str = "tickets";
    const KEY_COLUMN: &'static str = "ticket_id";
    const COLUMNS: &'static str = "id, ticket_id, creation_time, expiration_time, created_at, \
        title, description, status, priority, category_id, assigned_agent_id, created_by_id, \
        escalated_at, escalated_to, escalation_reason, resolved_at, due_date";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Ticket {
            id: codec::get_id(row, 0)?,
            ticket_id: codec::get_id(row, 1)?,
            creation_time: codec::get_ts(row, 2)?,
            expiration_time: codec::get_opt_ts(row, 3)?,
            created_at: codec::get_ts(row, 4)?,
            title: row.get(5)?,
            description: row.get(6)?,
            status: codec::get_enum(row, 7)?,
            priority: codec::get_enum(row, 8)?,
            category_id: codec::get_opt_id(row, 9)?,
            assigned_agent_id: codec::get_opt_id(row, 10)?,
            created_by_id: codec::get_id(row, 11)?,
            escalated_at: codec::get_opt_ts(row, 12)?,
            escalated_to: codec::get_opt_id(row, 13)?,
            escalation_reason: row.get(14)?,
            resolved_at: codec::get_opt_ts(row, 15)?,
            due_date: codec::get_opt_ts(row, 16)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO tickets (id, ticket_id, creation_time, expiration_time, created_at,
                 title, description, status, priority, category_id, assigned_agent_id,
                 created_by_id, escalated_at, escalated_to, escalation_reason, resolved_at,
                 due_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                codec::id(self.id),
                codec::id(self.ticket_id),
                codec::ts(&self.creation_time),
                codec::opt_ts(&self.expiration_time),
                codec::ts(&self.created_at),
                self.title,
                self.description,
                self.status.to_string(),
                self.priority.to_string(),
                codec::opt_id(self.category_id),
                codec::opt_id(self.assigned_agent_id),
                codec::id(self.created_by_id),
                codec::opt_ts(&self.escalated_at),
                codec::opt_id(self.escalated_to),
                self.escalation_reason,
                codec::opt_ts(&self.resolved_at),
                codec::opt_ts(&self.due_date),
            ],
        )?;
        Ok(())
    }
}

/// Ticket persistence: the versioned protocol plus listing and statistics
/// over current versions.
#[derive(Clone)]
pub struct TicketStore {
    versions: VersionedStore<Ticket>,
}

impl TicketStore {
    pub fn new(db: Database) -> Self {
        Self {
            versions: VersionedStore::new(db),
        }
    }

    /// The generic versioned store backing this ticket store.
    pub fn versions(&self) -> &VersionedStore<Ticket> {
        &self.versions
    }

    pub async fn create(&self, ctx: &CallContext, ticket: Ticket) -> Result<Ticket, HelpdeskError> {
        self.versions.create(ctx, ticket).await
    }

    pub async fn get_current(&self, ctx: &CallContext, id: TicketId) -> Result<Ticket, HelpdeskError> {
        self.versions.get_current(ctx, id).await
    }

    pub async fn get_by_version_id(
        &self,
        ctx: &CallContext,
        version_id: VersionId,
    ) -> Result<Ticket, HelpdeskError> {
        self.versions.get_by_version_id(ctx, version_id).await
    }

    pub async fn get_history(
        &self,
        ctx: &CallContext,
        id: TicketId,
    ) -> Result<Vec<Ticket>, HelpdeskError> {
        self.versions.get_history(ctx, id).await
    }

    pub async fn update<F>(&self, ctx: &CallContext, id: TicketId, mutator: F) -> Result<Ticket, HelpdeskError>
    where
        F: FnOnce(&mut Ticket) -> Result<(), HelpdeskError> + Send + 'static,
    {
        self.versions.update(ctx, id, mutator).await
    }

    pub async fn archive(&self, ctx: &CallContext, id: TicketId) -> Result<Ticket, HelpdeskError> {
        self.versions.archive(ctx, id).await
    }

    pub async fn archive_where<G>(
        &self,
        ctx: &CallContext,
        id: TicketId,
        guard: G,
    ) -> Result<Ticket, HelpdeskError>
    where
        G: FnOnce(&Ticket) -> Result<(), HelpdeskError> + Send + 'static,
    {
        self.versions.archive_where(ctx, id, guard).await
    }

    pub async fn hard_delete(&self, ctx: &CallContext, id: TicketId) -> Result<usize, HelpdeskError> {
        self.versions.hard_delete(ctx, id).await
    }

    /// New version with `assigned_agent_id` set. Eligibility of the agent is
    /// checked by the caller.
    pub async fn assign_to_agent(
        &self,
        ctx: &CallContext,
        id: TicketId,
        agent: UserId,
    ) -> Result<Ticket, HelpdeskError> {
        self.update(ctx, id, move |ticket| {
            ticket.assigned_agent_id = Some(agent);
            Ok(())
        })
        .await
    }

    /// New version with `status` set. The transition is re-checked against
    /// the version read inside the transaction.
    pub async fn update_status(
        &self,
        ctx: &CallContext,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<Ticket, HelpdeskError> {
        self.update(ctx, id, move |ticket| {
            let from = ticket.status;
            if !from.can_transition_to(status) {
                return Err(HelpdeskError::InvalidTransition { from, to: status });
            }
            // The successor's creation time is the transition instant.
            let now = ticket.creation_time;
            ticket.apply_status(status, now);
            Ok(())
        })
        .await
    }

    /// New version with the escalation fields set. Fails if the version read
    /// inside the transaction is already escalated.
    pub async fn escalate(
        &self,
        ctx: &CallContext,
        id: TicketId,
        target: UserId,
        reason: String,
    ) -> Result<Ticket, HelpdeskError> {
        let ticket = self
            .update(ctx, id, move |ticket| {
                if ticket.is_escalated() {
                    return Err(HelpdeskError::AlreadyEscalated {
                        ticket_id: ticket.ticket_id.to_string(),
                    });
                }
                ticket.escalated_at = Some(ticket.creation_time);
                ticket.escalated_to = Some(target);
                ticket.escalation_reason = Some(reason);
                Ok(())
            })
            .await?;
        info!(ticket_id = %id, escalated_to = %target, "ticket escalated");
        Ok(ticket)
    }

    /// One page of current tickets matching `filter`, with the total count
    /// taken from the same snapshot.
    pub async fn list(
        &self,
        ctx: &CallContext,
        filter: &TicketFilter,
        sort: TicketSort,
        page: PageRequest,
    ) -> Result<TicketPage, HelpdeskError> {
        let (where_sql, mut values) = build_where(filter, utc_now());
        let count_sql = format!("SELECT COUNT(*) FROM tickets WHERE {where_sql}");
        let page_sql = format!(
            "SELECT {} FROM tickets WHERE {where_sql} ORDER BY {} LIMIT ? OFFSET ?",
            Ticket::COLUMNS,
            order_by(sort)
        );
        let count_values = values.clone();
        values.push(Value::Integer(i64::from(page.page_size())));
        values.push(Value::Integer(
            i64::try_from(page.offset()).unwrap_or(i64::MAX),
        ));

        let (total, tickets) = writer::read(self.versions.database(), ctx, move |conn| {
            let tx = conn.transaction()?;
            let total: i64 =
                tx.query_row(&count_sql, params_from_iter(count_values.iter()), |r| r.get(0))?;
            let tickets = {
                let mut stmt = tx.prepare(&page_sql)?;
                stmt.query_map(params_from_iter(values.iter()), Ticket::from_row)?
                    .collect::<Result<Vec<_>, _>>()?
            };
            tx.commit()?;
            Ok((total, tickets))
        })
        .await?;

        let total = u64::try_from(total).unwrap_or_default();
        debug!(
            total,
            returned = tickets.len(),
            page = page.page(),
            page_size = page.page_size(),
            "tickets listed"
        );
        Ok(TicketPage {
            tickets,
            total,
            page: page.page(),
            page_size: page.page_size(),
            total_pages: page.total_pages(total),
        })
    }

    /// Counts over current versions.
    pub async fn stats(&self, ctx: &CallContext) -> Result<TicketStats, HelpdeskError> {
        let now = codec::ts(&utc_now());
        let stats = writer::read(self.versions.database(), ctx, move |conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN status = 'OPEN' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN status = 'IN_PROGRESS' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN status = 'RESOLVED' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN status = 'CLOSED' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN escalated_at IS NOT NULL THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN due_date IS NOT NULL AND due_date < ?1
                                          THEN 1 ELSE 0 END), 0)
                 FROM tickets
                 WHERE expiration_time IS NULL",
                params![now],
                |row| {
                    let count = |idx: usize| -> rusqlite::Result<u64> {
                        row.get::<_, i64>(idx).map(|n| n.max(0) as u64)
                    };
                    Ok(TicketStats {
                        total: count(0)?,
                        open: count(1)?,
                        in_progress: count(2)?,
                        resolved: count(3)?,
                        closed: count(4)?,
                        escalated: count(5)?,
                        overdue: count(6)?,
                    })
                },
            )
        })
        .await?;
        debug!(total = stats.total, "ticket stats computed");
        Ok(stats)
    }
}

/// `WHERE` clause over current versions plus its positional values.
fn build_where(filter: &TicketFilter, now: DateTime<Utc>) -> (String, Vec<Value>) {
    let mut clauses = vec!["expiration_time IS NULL".to_string()];
    let mut values = Vec::new();

    let mut eq = |column: &str, value: String| {
        clauses.push(format!("{column} = ?"));
        values.push(Value::Text(value));
    };
    if let Some(status) = filter.status {
        eq("status", status.to_string());
    }
    if let Some(priority) = filter.priority {
        eq("priority", priority.to_string());
    }
    if let Some(category) = filter.category_id {
        eq("category_id", codec::id(category));
    }
    if let Some(agent) = filter.assigned_to {
        eq("assigned_agent_id", codec::id(agent));
    }
    if let Some(creator) = filter.created_by {
        eq("created_by_id", codec::id(creator));
    }

    match filter.is_escalated {
        Some(true) => clauses.push("escalated_at IS NOT NULL".to_string()),
        Some(false) => clauses.push("escalated_at IS NULL".to_string()),
        None => {}
    }

    match filter.is_overdue {
        Some(true) => {
            clauses.push("(due_date IS NOT NULL AND due_date < ?)".to_string());
            values.push(Value::Text(codec::ts(&now)));
        }
        Some(false) => {
            clauses.push("(due_date IS NULL OR due_date >= ?)".to_string());
            values.push(Value::Text(codec::ts(&now)));
        }
        None => {}
    }

    if let Some(from) = filter.created_from {
        clauses.push("created_at >= ?".to_string());
        values.push(Value::Text(codec::ts(&from)));
    }
    if let Some(to) = filter.created_to {
        clauses.push("created_at <= ?".to_string());
        values.push(Value::Text(codec::ts(&to)));
    }

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        clauses.push("(title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')".to_string());
        values.push(Value::Text(pattern.clone()));
        values.push(Value::Text(pattern));
    }

    (clauses.join(" AND "), values)
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn order_by(sort: TicketSort) -> String {
    let key = match sort.field {
        TicketSortField::CreatedAt => "created_at",
        TicketSortField::UpdatedAt => "creation_time",
        TicketSortField::Priority => {
            "CASE priority WHEN 'LOW' THEN 0 WHEN 'MEDIUM' THEN 1 WHEN 'HIGH' THEN 2 ELSE 3 END"
        }
        TicketSortField::Status => {
            "CASE status WHEN 'OPEN' THEN 0 WHEN 'IN_PROGRESS' THEN 1 WHEN 'RESOLVED' THEN 2 ELSE 3 END"
        }
        TicketSortField::Title => "title COLLATE NOCASE",
    };
    let direction = match sort.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    format!("{key} {direction}, ticket_id ASC")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use helpdesk_core::{TicketDraft, TicketPriority, VersionedEntity};
    use tempfile::tempdir;

    async fn setup() -> (TicketStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tickets.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (TicketStore::new(db), dir)
    }

    fn ctx() -> CallContext {
        CallContext::default()
    }

    fn draft(title: &str, priority: TicketPriority) -> TicketDraft {
        TicketDraft {
            title: title.to_string(),
            description: format!("{title} description"),
            priority,
            category_id: None,
            due_date: None,
        }
    }

    async fn open(store: &TicketStore, title: &str, priority: TicketPriority) -> Ticket {
        store
            .create(&ctx(), Ticket::open(draft(title, priority), UserId::new(), utc_now()))
            .await
            .unwrap()
    }

    async fn count_current(store: &TicketStore, id: TicketId) -> i64 {
        let id_text = codec::id(id);
        writer::read(store.versions().database(), &ctx(), move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM tickets WHERE ticket_id = ?1 AND expiration_time IS NULL",
                params![id_text],
                |r| r.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_current_round_trips() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Medium).await;
        let fetched = store.get_current(&ctx(), created.ticket_id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn get_current_unknown_is_not_found() {
        let (store, _dir) = setup().await;
        let err = store.get_current(&ctx(), TicketId::new()).await.unwrap_err();
        assert!(matches!(err, HelpdeskError::NotFound { entity: "ticket", .. }));
    }

    #[tokio::test]
    async fn second_current_row_for_same_ticket_is_rejected() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;
        let duplicate = created.next_version(utc_now());
        let err = store.create(&ctx(), duplicate).await.unwrap_err();
        assert!(matches!(err, HelpdeskError::Storage { .. }));
        assert_eq!(count_current(&store, created.ticket_id).await, 1);
    }

    #[tokio::test]
    async fn update_keeps_single_current_version_and_appends_history() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;

        for i in 0..5 {
            store
                .update(&ctx(), created.ticket_id, move |t| {
                    t.title = format!("T1 rev {i}");
                    Ok(())
                })
                .await
                .unwrap();
            assert_eq!(count_current(&store, created.ticket_id).await, 1);
            let history = store.get_history(&ctx(), created.ticket_id).await.unwrap();
            assert_eq!(history.len(), i + 2);
        }
    }

    #[tokio::test]
    async fn update_changes_only_mutated_fields() {
        let (store, _dir) = setup().await;
        let due = utc_now() + Duration::days(2);
        let mut d = draft("A", TicketPriority::Low);
        d.due_date = Some(due);
        let created = store
            .create(&ctx(), Ticket::open(d, UserId::new(), utc_now()))
            .await
            .unwrap();

        let updated = store
            .update(&ctx(), created.ticket_id, |t| {
                t.priority = TicketPriority::High;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(updated.title, "A");
        assert_eq!(updated.due_date, Some(due));
        assert_eq!(updated.priority, TicketPriority::High);
        assert_eq!(updated.created_by_id, created.created_by_id);
        assert_eq!(updated.created_at, created.created_at);
        assert_ne!(updated.id, created.id);
    }

    #[tokio::test]
    async fn expired_version_closes_at_successor_creation() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;
        let updated = store
            .update(&ctx(), created.ticket_id, |t| {
                t.description = "more detail".into();
                Ok(())
            })
            .await
            .unwrap();

        let old = store.get_by_version_id(&ctx(), created.id).await.unwrap();
        assert_eq!(old.expiration_time, Some(updated.creation_time));
        assert!(updated.creation_time >= created.creation_time);

        let history = store.get_history(&ctx(), created.ticket_id).await.unwrap();
        assert_eq!(history[0].id, created.id);
        assert_eq!(history[1].id, updated.id);
    }

    #[tokio::test]
    async fn failing_mutator_leaves_current_untouched() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;

        let err = store
            .update(&ctx(), created.ticket_id, |t| {
                t.title = "half-applied".into();
                Err(HelpdeskError::Validation("rejected".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::Validation(_)));

        let current = store.get_current(&ctx(), created.ticket_id).await.unwrap();
        assert_eq!(current, created);
        let history = store.get_history(&ctx(), created.ticket_id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn mutator_may_not_change_creator() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;
        let err = store
            .update(&ctx(), created.ticket_id, |t| {
                t.created_by_id = UserId::new();
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::Validation(_)));
        assert_eq!(
            store.get_history(&ctx(), created.ticket_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn cancelled_context_writes_nothing() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;

        let cancelled = CallContext::background();
        cancelled.cancel();
        let err = store
            .update_status(&cancelled, created.ticket_id, TicketStatus::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::Cancelled));

        let expired = CallContext::with_timeout(std::time::Duration::ZERO);
        let err = store.archive(&expired, created.ticket_id).await.unwrap_err();
        assert!(matches!(err, HelpdeskError::Timeout { .. }));

        let current = store.get_current(&ctx(), created.ticket_id).await.unwrap();
        assert_eq!(current, created);
    }

    #[tokio::test]
    async fn cancellation_before_commit_rolls_back_update() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;

        let call = CallContext::background();
        let trip = call.clone();
        let err = store
            .update(&call, created.ticket_id, move |t| {
                t.title = "never committed".into();
                trip.cancel();
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::Cancelled));
        assert_eq!(
            store.get_history(&ctx(), created.ticket_id).await.unwrap().len(),
            1
        );
        assert_eq!(count_current(&store, created.ticket_id).await, 1);
    }

    #[tokio::test]
    async fn archive_leaves_no_current_version() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;

        let archived = store.archive(&ctx(), created.ticket_id).await.unwrap();
        assert_eq!(archived.id, created.id);
        assert!(archived.expiration_time.is_some());
        assert_eq!(count_current(&store, created.ticket_id).await, 0);

        let history = store.get_history(&ctx(), created.ticket_id).await.unwrap();
        assert_eq!(history.len(), 1);

        let err = store.archive(&ctx(), created.ticket_id).await.unwrap_err();
        assert!(matches!(err, HelpdeskError::NotFound { .. }));
        let err = store
            .update(&ctx(), created.ticket_id, |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::NotFound { .. }));
    }

    #[tokio::test]
    async fn archive_guard_can_veto() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;
        let err = store
            .archive_where(&ctx(), created.ticket_id, |t| {
                Err(HelpdeskError::InvalidState(format!("status is {}", t.status)))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidState(_)));
        assert_eq!(count_current(&store, created.ticket_id).await, 1);
    }

    #[tokio::test]
    async fn hard_delete_removes_every_version() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;
        store
            .update_status(&ctx(), created.ticket_id, TicketStatus::InProgress)
            .await
            .unwrap();

        let removed = store.hard_delete(&ctx(), created.ticket_id).await.unwrap();
        assert_eq!(removed, 2);
        assert!(
            store
                .get_history(&ctx(), created.ticket_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn update_status_stamps_and_clears_resolved_at() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;

        let resolved = store
            .update_status(&ctx(), created.ticket_id, TicketStatus::Resolved)
            .await
            .unwrap();
        assert_eq!(resolved.resolved_at, Some(resolved.creation_time));

        let closed = store
            .update_status(&ctx(), created.ticket_id, TicketStatus::Closed)
            .await
            .unwrap();
        assert_eq!(closed.resolved_at, Some(closed.creation_time));

        let reopened = store
            .update_status(&ctx(), created.ticket_id, TicketStatus::Open)
            .await
            .unwrap();
        assert!(reopened.resolved_at.is_none());
    }

    #[tokio::test]
    async fn update_status_rechecks_transition() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;
        store
            .update_status(&ctx(), created.ticket_id, TicketStatus::Closed)
            .await
            .unwrap();
        let err = store
            .update_status(&ctx(), created.ticket_id, TicketStatus::Resolved)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HelpdeskError::InvalidTransition {
                from: TicketStatus::Closed,
                to: TicketStatus::Resolved
            }
        ));
        assert_eq!(
            store.get_history(&ctx(), created.ticket_id).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn escalate_is_one_shot() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;
        let manager = UserId::new();
        let escalated = store
            .escalate(&ctx(), created.ticket_id, manager, "vip".into())
            .await
            .unwrap();
        assert_eq!(escalated.escalated_to, Some(manager));
        assert_eq!(escalated.escalated_at, Some(escalated.creation_time));

        let err = store
            .escalate(&ctx(), created.ticket_id, UserId::new(), "again".into())
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::AlreadyEscalated { .. }));

        let current = store.get_current(&ctx(), created.ticket_id).await.unwrap();
        assert_eq!(current.escalated_to, Some(manager));
        assert_eq!(current.escalated_at, escalated.escalated_at);
        assert_eq!(current.escalation_reason.as_deref(), Some("vip"));
    }

    #[tokio::test]
    async fn assign_sets_agent() {
        let (store, _dir) = setup().await;
        let created = open(&store, "T1", TicketPriority::Low).await;
        let agent = UserId::new();
        let assigned = store
            .assign_to_agent(&ctx(), created.ticket_id, agent)
            .await
            .unwrap();
        assert_eq!(assigned.assigned_agent_id, Some(agent));
    }

    #[tokio::test]
    async fn pagination_arithmetic() {
        let (store, _dir) = setup().await;
        for i in 0..25 {
            open(&store, &format!("ticket {i:02}"), TicketPriority::Medium).await;
        }

        let first = store
            .list(
                &ctx(),
                &TicketFilter::default(),
                TicketSort::default(),
                PageRequest::new(1, 10).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.total, 25);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.tickets.len(), 10);

        let last = store
            .list(
                &ctx(),
                &TicketFilter::default(),
                TicketSort::default(),
                PageRequest::new(3, 10).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(last.tickets.len(), 5);
        assert_eq!(last.page, 3);
    }

    #[tokio::test]
    async fn list_sees_only_current_versions() {
        let (store, _dir) = setup().await;
        let a = open(&store, "alpha", TicketPriority::Low).await;
        let b = open(&store, "beta", TicketPriority::Low).await;
        for _ in 0..3 {
            store
                .update(&ctx(), a.ticket_id, |t| {
                    t.priority = TicketPriority::High;
                    Ok(())
                })
                .await
                .unwrap();
        }
        store.archive(&ctx(), b.ticket_id).await.unwrap();

        let page = store
            .list(
                &ctx(),
                &TicketFilter::default(),
                TicketSort::default(),
                PageRequest::new(1, 100).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].ticket_id, a.ticket_id);
        assert_eq!(page.tickets[0].priority, TicketPriority::High);
    }

    #[tokio::test]
    async fn filters_are_anded() {
        let (store, _dir) = setup().await;
        let a = open(&store, "printer jam", TicketPriority::High).await;
        open(&store, "printer toner", TicketPriority::Low).await;
        open(&store, "vpn down", TicketPriority::High).await;
        store
            .update_status(&ctx(), a.ticket_id, TicketStatus::InProgress)
            .await
            .unwrap();

        let filter = TicketFilter {
            priority: Some(TicketPriority::High),
            search: Some("printer".into()),
            ..Default::default()
        };
        let page = store
            .list(&ctx(), &filter, TicketSort::default(), PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].ticket_id, a.ticket_id);

        let filter = TicketFilter {
            status: Some(TicketStatus::Open),
            priority: Some(TicketPriority::High),
            ..Default::default()
        };
        let page = store
            .list(&ctx(), &filter, TicketSort::default(), PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].title, "vpn down");
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let (store, _dir) = setup().await;
        open(&store, "disk 100% full", TicketPriority::Low).await;
        open(&store, "disk 1000 errors", TicketPriority::Low).await;

        let filter = TicketFilter {
            search: Some("100%".into()),
            ..Default::default()
        };
        let page = store
            .list(&ctx(), &filter, TicketSort::default(), PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].title, "disk 100% full");
    }

    #[tokio::test]
    async fn sort_by_priority_uses_severity_rank() {
        let (store, _dir) = setup().await;
        open(&store, "m", TicketPriority::Medium).await;
        open(&store, "c", TicketPriority::Critical).await;
        open(&store, "l", TicketPriority::Low).await;
        open(&store, "h", TicketPriority::High).await;

        let sort = TicketSort {
            field: TicketSortField::Priority,
            direction: SortDirection::Desc,
        };
        let page = store
            .list(&ctx(), &TicketFilter::default(), sort, PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        let order: Vec<TicketPriority> = page.tickets.iter().map(|t| t.priority).collect();
        assert_eq!(
            order,
            vec![
                TicketPriority::Critical,
                TicketPriority::High,
                TicketPriority::Medium,
                TicketPriority::Low
            ]
        );
    }

    #[tokio::test]
    async fn sort_by_update_time_follows_latest_version() {
        let (store, _dir) = setup().await;
        let first = open(&store, "first", TicketPriority::Low).await;
        let second = open(&store, "second", TicketPriority::Low).await;
        store
            .update(&ctx(), first.ticket_id, |t| {
                t.description = "touched".into();
                Ok(())
            })
            .await
            .unwrap();

        let sort = TicketSort {
            field: TicketSortField::UpdatedAt,
            direction: SortDirection::Desc,
        };
        let page = store
            .list(&ctx(), &TicketFilter::default(), sort, PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.tickets[0].ticket_id, first.ticket_id);
        assert_eq!(page.tickets[1].ticket_id, second.ticket_id);
    }

    #[tokio::test]
    async fn stats_count_current_versions_only() {
        let (store, _dir) = setup().await;
        let a = open(&store, "a", TicketPriority::Low).await;
        let b = open(&store, "b", TicketPriority::Low).await;
        let c = open(&store, "c", TicketPriority::Low).await;
        let mut overdue = draft("d", TicketPriority::Low);
        overdue.due_date = Some(utc_now() - Duration::hours(1));
        store
            .create(&ctx(), Ticket::open(overdue, UserId::new(), utc_now()))
            .await
            .unwrap();

        store
            .update_status(&ctx(), a.ticket_id, TicketStatus::InProgress)
            .await
            .unwrap();
        store
            .update_status(&ctx(), b.ticket_id, TicketStatus::Resolved)
            .await
            .unwrap();
        store
            .escalate(&ctx(), b.ticket_id, UserId::new(), "urgent".into())
            .await
            .unwrap();
        store.archive(&ctx(), c.ticket_id).await.unwrap();

        let stats = store.stats(&ctx()).await.unwrap();
        assert_eq!(
            stats,
            TicketStats {
                total: 3,
                open: 1,
                in_progress: 1,
                resolved: 1,
                closed: 0,
                escalated: 1,
                overdue: 1,
            }
        );
    }

    #[tokio::test]
    async fn overdue_filter_splits_on_now() {
        let (store, _dir) = setup().await;
        let mut late = draft("late", TicketPriority::Low);
        late.due_date = Some(utc_now() - Duration::minutes(5));
        store
            .create(&ctx(), Ticket::open(late, UserId::new(), utc_now()))
            .await
            .unwrap();
        open(&store, "no due date", TicketPriority::Low).await;

        let only_overdue = TicketFilter {
            is_overdue: Some(true),
            ..Default::default()
        };
        let page = store
            .list(&ctx(), &only_overdue, TicketSort::default(), PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].title, "late");

        let not_overdue = TicketFilter {
            is_overdue: Some(false),
            ..Default::default()
        };
        let page = store
            .list(&ctx(), &not_overdue, TicketSort::default(), PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].title, "no due date");
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
