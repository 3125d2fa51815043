// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioning guarantees under concurrent writers.

use std::time::Duration;

use helpdesk_core::{
    CallContext, HelpdeskError, Ticket, TicketDraft, TicketId, TicketPriority, UserId, utc_now,
};
use helpdesk_storage::{Database, DatabaseOptions, TicketStore};
use tempfile::TempDir;

async fn open_handles(n: usize) -> (Vec<TicketStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let path = path.to_str().unwrap().to_string();
    let options = DatabaseOptions {
        wal_mode: true,
        busy_timeout: Duration::from_secs(10),
    };
    let mut stores = Vec::with_capacity(n);
    for _ in 0..n {
        let db = Database::open_with(&path, options).await.unwrap();
        stores.push(TicketStore::new(db));
    }
    (stores, dir)
}

async fn seed_ticket(store: &TicketStore) -> Ticket {
    let draft = TicketDraft {
        title: "contended".into(),
        description: "many writers".into(),
        priority: TicketPriority::Medium,
        category_id: None,
        due_date: None,
    };
    store
        .create(&CallContext::default(), Ticket::open(draft, UserId::new(), utc_now()))
        .await
        .unwrap()
}

/// Retry transient conflicts the way a caller is expected to.
async fn update_with_retry(store: &TicketStore, id: TicketId, rev: usize) -> Ticket {
    loop {
        let result = store
            .update(&CallContext::default(), id, move |t| {
                t.title = format!("rev {rev}");
                Ok(())
            })
            .await;
        match result {
            Ok(ticket) => return ticket,
            Err(e) if e.is_retryable() => tokio::task::yield_now().await,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}

fn assert_unbroken_chain(history: &[Ticket]) {
    let (last, rest) = history.split_last().unwrap();
    assert!(last.expiration_time.is_none(), "newest version must be current");
    for pair in history.windows(2) {
        assert_eq!(
            pair[0].expiration_time,
            Some(pair[1].creation_time),
            "each version must expire exactly when its successor begins"
        );
        assert!(pair[1].creation_time >= pair[0].creation_time);
    }
    assert!(rest.iter().all(|v| v.expiration_time.is_some()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_on_one_handle_never_lose_a_version() {
    let (stores, _dir) = open_handles(1).await;
    let store = stores[0].clone();
    let ticket = seed_ticket(&store).await;

    let mut tasks = Vec::new();
    for rev in 0..16 {
        let store = store.clone();
        let id = ticket.ticket_id;
        tasks.push(tokio::spawn(async move { update_with_retry(&store, id, rev).await }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let history = store
        .get_history(&CallContext::default(), ticket.ticket_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 17);
    assert_unbroken_chain(&history);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_across_handles_serialize() {
    let (stores, _dir) = open_handles(3).await;
    let ticket = seed_ticket(&stores[0]).await;

    let mut tasks = Vec::new();
    for rev in 0..24 {
        let store = stores[rev % stores.len()].clone();
        let id = ticket.ticket_id;
        tasks.push(tokio::spawn(async move { update_with_retry(&store, id, rev).await }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let ctx = CallContext::default();
    let history = stores[1].get_history(&ctx, ticket.ticket_id).await.unwrap();
    assert_eq!(history.len(), 25);
    assert_unbroken_chain(&history);

    let current = stores[2].get_current(&ctx, ticket.ticket_id).await.unwrap();
    assert_eq!(current.id, history.last().unwrap().id);
    assert_eq!(current.created_by_id, ticket.created_by_id);
}

#[tokio::test]
async fn updates_on_different_tickets_are_independent() {
    let (stores, _dir) = open_handles(1).await;
    let store = &stores[0];
    let a = seed_ticket(store).await;
    let b = seed_ticket(store).await;

    let ctx = CallContext::default();
    let err = store
        .update(&ctx, a.ticket_id, |_| {
            Err(HelpdeskError::Validation("only a fails".into()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HelpdeskError::Validation(_)));

    update_with_retry(store, b.ticket_id, 1).await;
    assert_eq!(store.get_history(&ctx, a.ticket_id).await.unwrap().len(), 1);
    assert_eq!(store.get_history(&ctx, b.ticket_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn history_of_unknown_ticket_is_empty() {
    let (stores, _dir) = open_handles(1).await;
    let history = stores[0]
        .get_history(&CallContext::default(), TicketId::new())
        .await
        .unwrap();
    assert!(history.is_empty());
}
