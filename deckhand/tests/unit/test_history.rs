//! Event store tests

use std::sync::Arc;

use deckhand::errors::DeckhandError;
use deckhand::history::store::{EventStore, StatusUpdate, NO_LOGS_PLACEHOLDER};
use deckhand::models::event::{DeploymentStatus, NewEvent};
use deckhand::storage::layout::StorageLayout;
use tokio_test::{assert_err, assert_ok};

use crate::common::temp_dir;

fn new_event(repository: &str) -> NewEvent {
    NewEvent {
        name: Some("release".to_string()),
        repository: repository.to_string(),
        script: None,
    }
}

#[tokio::test]
async fn test_empty_history_is_not_an_error() {
    let dir = temp_dir();
    let store = EventStore::new(StorageLayout::new(dir.path()));

    let history = assert_ok!(store.list_history("host1").await);
    assert!(history.is_empty());
    assert!(!dir.path().join("history").join("host1.json").exists());
}

#[tokio::test]
async fn test_append_inserts_pending_at_head() {
    let dir = temp_dir();
    let store = EventStore::new(StorageLayout::new(dir.path()));

    let first = store.append_event("host1", new_event("repo1")).await.unwrap();
    let second = store.append_event("host1", new_event("repo2")).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(second.status, DeploymentStatus::Pending);
    assert!(second.logs.is_empty());
    assert_eq!(second.host_id, "host1");
    assert_eq!(
        second.log_file.as_deref(),
        Some(format!("host1_{}.log", second.id).as_str())
    );

    let history = store.list_history("host1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], second);
    assert_eq!(history[1], first);
}

#[tokio::test]
async fn test_histories_are_per_host() {
    let dir = temp_dir();
    let store = EventStore::new(StorageLayout::new(dir.path()));

    store.append_event("host1", new_event("repo1")).await.unwrap();
    store.append_event("host2", new_event("repo1")).await.unwrap();

    assert_eq!(store.list_history("host1").await.unwrap().len(), 1);
    assert_eq!(store.list_history("host2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_sets_status_and_appends_logs() {
    let dir = temp_dir();
    let store = EventStore::new(StorageLayout::new(dir.path()));
    let event = store.append_event("host1", new_event("repo1")).await.unwrap();

    let outcome = store
        .update_status("host1", &event.id, DeploymentStatus::Pending, vec!["step 1".to_string()])
        .await
        .unwrap();
    assert_eq!(outcome, StatusUpdate::Applied);

    let outcome = store
        .update_status("host1", &event.id, DeploymentStatus::Success, vec!["line".to_string()])
        .await
        .unwrap();
    assert_eq!(outcome, StatusUpdate::Applied);

    let stored = store.get_event("host1", &event.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DeploymentStatus::Success);
    assert_eq!(stored.logs, vec!["step 1", "line"]);
}

#[tokio::test]
async fn test_terminal_status_is_final() {
    let dir = temp_dir();
    let store = EventStore::new(StorageLayout::new(dir.path()));
    let event = store.append_event("host1", new_event("repo1")).await.unwrap();

    store
        .update_status("host1", &event.id, DeploymentStatus::Success, vec!["done".to_string()])
        .await
        .unwrap();
    let outcome = store
        .update_status("host1", &event.id, DeploymentStatus::Failed, vec!["late".to_string()])
        .await
        .unwrap();
    assert_eq!(outcome, StatusUpdate::AlreadyTerminal);

    let stored = store.get_event("host1", &event.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DeploymentStatus::Success);
    assert_eq!(stored.logs, vec!["done"]);
}

#[tokio::test]
async fn test_update_unknown_event_is_a_no_op() {
    let dir = temp_dir();
    let store = EventStore::new(StorageLayout::new(dir.path()));
    store.append_event("host1", new_event("repo1")).await.unwrap();
    let before = store.list_history("host1").await.unwrap();

    let outcome = assert_ok!(
        store
            .update_status("host1", "missing", DeploymentStatus::Failed, vec!["x".to_string()])
            .await
    );
    assert_eq!(outcome, StatusUpdate::MissingEvent);
    assert_eq!(store.list_history("host1").await.unwrap(), before);

    let outcome = store
        .update_status("ghost", "missing", DeploymentStatus::Failed, vec![])
        .await
        .unwrap();
    assert_eq!(outcome, StatusUpdate::MissingEvent);
}

#[tokio::test]
async fn test_get_logs_placeholder() {
    let dir = temp_dir();
    let store = EventStore::new(StorageLayout::new(dir.path()));

    assert_eq!(
        store.get_logs("host1", "nope").await.unwrap(),
        vec![NO_LOGS_PLACEHOLDER]
    );

    let event = store.append_event("host1", new_event("repo1")).await.unwrap();
    assert_eq!(
        store.get_logs("host1", "nope").await.unwrap(),
        vec![NO_LOGS_PLACEHOLDER]
    );
    store
        .update_status("host1", &event.id, DeploymentStatus::Failed, vec!["boom".to_string()])
        .await
        .unwrap();
    assert_eq!(store.get_logs("host1", &event.id).await.unwrap(), vec!["boom"]);
}

#[tokio::test]
async fn test_round_trip_preserves_order_ids_and_logs() {
    let dir = temp_dir();
    let layout = StorageLayout::new(dir.path());
    let store = EventStore::new(layout.clone());

    let mut written = Vec::new();
    for i in 0..5 {
        let event = store.append_event("host1", new_event("repo1")).await.unwrap();
        let lines = vec![format!("run {i}"), format!("line with \"quotes\" {i}")];
        store
            .update_status("host1", &event.id, DeploymentStatus::Success, lines.clone())
            .await
            .unwrap();
        written.push((event.id, lines));
    }

    // A fresh store reads only what is on disk
    let reopened = EventStore::new(layout);
    let history = reopened.list_history("host1").await.unwrap();
    assert_eq!(history.len(), 5);
    for (event, (id, lines)) in history.iter().zip(written.iter().rev()) {
        assert_eq!(&event.id, id);
        assert_eq!(&event.logs, lines);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_are_not_lost() {
    let dir = temp_dir();
    let store = Arc::new(EventStore::new(StorageLayout::new(dir.path())));

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append_event("shared", new_event(&format!("repo{i}")))
                .await
                .map(|e| e.id)
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }

    let history = store.list_history("shared").await.unwrap();
    assert_eq!(history.len(), 20);
    for id in ids {
        assert!(history.iter().any(|e| e.id == id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_are_not_lost() {
    let dir = temp_dir();
    let store = Arc::new(EventStore::new(StorageLayout::new(dir.path())));

    let mut ids = Vec::new();
    for _ in 0..10 {
        ids.push(store.append_event("shared", new_event("repo1")).await.unwrap().id);
    }

    let mut handles = Vec::new();
    for id in ids.clone() {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .update_status("shared", &id, DeploymentStatus::Success, vec![id.clone()])
                .await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), StatusUpdate::Applied);
    }

    let history = store.list_history("shared").await.unwrap();
    for event in history {
        assert_eq!(event.status, DeploymentStatus::Success);
        assert_eq!(event.logs, vec![event.id.clone()]);
    }
}

#[tokio::test]
async fn test_delete_event_removes_event_and_transcript() {
    let dir = temp_dir();
    let layout = StorageLayout::new(dir.path());
    let store = EventStore::new(layout.clone());

    let keep = store.append_event("host1", new_event("repo1")).await.unwrap();
    let removed = store.append_event("host1", new_event("repo1")).await.unwrap();
    let transcript = layout.transcript_file("host1", &removed.id);
    transcript.write_string("Deployment started\n").await.unwrap();

    assert!(store.delete_event("host1", &removed.id).await.unwrap());
    assert!(!transcript.exists().await);
    assert!(!store.delete_event("host1", &removed.id).await.unwrap());

    let history = store.list_history("host1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, keep.id);
}

#[tokio::test]
async fn test_corrupt_history_is_a_persistence_error() {
    let dir = temp_dir();
    let layout = StorageLayout::new(dir.path());
    layout
        .history_file("host1")
        .write_string("{not json")
        .await
        .unwrap();
    let store = EventStore::new(layout);

    let err = assert_err!(store.list_history("host1").await);
    assert!(matches!(err, DeckhandError::PersistenceError(_)));
    let err = assert_err!(store.append_event("host1", new_event("repo1")).await);
    assert!(matches!(err, DeckhandError::PersistenceError(_)));
}

#[tokio::test]
async fn test_host_ids_that_do_not_name_a_file_are_rejected() {
    let dir = temp_dir();
    let store = EventStore::new(StorageLayout::new(dir.path()));

    for host_id in ["web 1", "a/b", "..", ""] {
        let err = assert_err!(store.append_event(host_id, new_event("repo1")).await);
        assert!(matches!(err, DeckhandError::ValidationError(_)), "{host_id:?}");
        let err = assert_err!(store.list_history(host_id).await);
        assert!(matches!(err, DeckhandError::ValidationError(_)), "{host_id:?}");
    }

    let err = assert_err!(
        store
            .update_status("web 1", "x", DeploymentStatus::Success, vec![])
            .await
    );
    assert!(matches!(err, DeckhandError::ValidationError(_)));
    assert!(assert_ok!(store.list_history("web_1").await).is_empty());
    assert!(!dir.path().join("history").exists());
}

#[tokio::test]
async fn test_events_of_other_hosts_are_not_listed() {
    let dir = temp_dir();
    let layout = StorageLayout::new(dir.path());
    let store = EventStore::new(layout.clone());

    let own = store.append_event("web_1", new_event("repo1")).await.unwrap();
    let mut history = store.list_history("web_1").await.unwrap();
    let mut stray = own.clone();
    stray.id = "stray".to_string();
    stray.host_id = "web-2".to_string();
    history.push(stray);
    layout.history_file("web_1").write_json(&history).await.unwrap();

    let listed = store.list_history("web_1").await.unwrap();
    assert_eq!(listed, vec![own]);
    assert!(store.get_event("web_1", "stray").await.unwrap().is_none());
}
