//! Template refresh-then-refetch cycle.

use std::sync::Arc;

use crossterm::event::KeyCode;
use serde_json::json;

use taskdeck::config::FetchPolicy;
use taskdeck::tea::{update, Command, Message, NotificationLevel};
use taskdeck::Error;

use crate::fixtures::{key, sample_tasks, sample_templates, Harness, MockService};

async fn started(service: Arc<MockService>) -> Harness {
    let mut h = Harness::new(service);
    h.start().await;
    h
}

/// Given a refresh that produces content
/// When R is pressed
/// Then exactly one template refetch follows and the new set is shown
#[tokio::test]
async fn test_refresh_success_refetches_once() {
    let service = Arc::new(MockService::new(sample_tasks(), sample_templates()));
    let mut h = started(service.clone()).await;

    service.push_refresh(Ok(json!({"content": {"new.md": "x"}, "file_count": 1})));
    service.push_templates(Ok(json!({"new.md": "# New"})));
    h.press(KeyCode::Char('R')).await;

    assert_eq!(service.calls(), (1, 2, 1));
    let state = h.model.snapshot();
    assert_eq!(state.templates.len(), 1);
    assert_eq!(state.templates[0].key, "new.md");
    assert!(!state.refreshing_templates);
    assert_eq!(h.model.notification.as_ref().unwrap().message, "Refreshed 1 templates");
}

/// Given a refresh the backend rejects
/// When R is pressed
/// Then no refetch happens and the error is shown
#[tokio::test]
async fn test_refresh_rejected_keeps_templates() {
    let service = Arc::new(MockService::new(sample_tasks(), sample_templates()));
    let mut h = started(service.clone()).await;

    service.push_refresh(Ok(json!({"error": "Templates folder not found"})));
    h.press(KeyCode::Char('R')).await;

    assert_eq!(service.calls(), (1, 1, 1));
    let note = h.model.notification.clone().unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert!(note.message.contains("Templates folder not found"));
    assert_eq!(h.model.snapshot().templates.len(), 3);
}

/// Given a refresh request that fails in transport
/// When R is pressed
/// Then the refresh flag clears and a later refresh is allowed
#[tokio::test]
async fn test_refresh_transport_failure_allows_retry() {
    let service = Arc::new(MockService::new(sample_tasks(), sample_templates()));
    let mut h = started(service.clone()).await;

    service.push_refresh(Err(Error::Refresh("HTTP 502".to_string())));
    h.press(KeyCode::Char('R')).await;
    assert!(!h.model.refreshing);
    assert!(h.model.notification.as_ref().unwrap().message.contains("HTTP 502"));

    service.push_refresh(Ok(json!({"content": "ok"})));
    h.press(KeyCode::Char('R')).await;
    assert_eq!(service.calls(), (1, 2, 2));
}

/// Given a refresh that answers with neither content nor error
/// Then nothing is refetched
#[tokio::test]
async fn test_empty_refresh_response() {
    let service = Arc::new(MockService::new(sample_tasks(), sample_templates()));
    let mut h = started(service.clone()).await;

    service.push_refresh(Ok(json!({})));
    h.press(KeyCode::Char('R')).await;
    assert_eq!(service.calls(), (1, 1, 1));
}

/// Given a refresh already running
/// When R is pressed again
/// Then the second press is ignored
#[tokio::test]
async fn test_refresh_not_doubled() {
    let service = Arc::new(MockService::new(sample_tasks(), sample_templates()));
    let mut h = started(service).await;

    let first = update(&mut h.model, Message::Key(key(KeyCode::Char('R'))));
    let second = update(&mut h.model, Message::Key(key(KeyCode::Char('R'))));
    assert_eq!(first, vec![Command::RefreshTemplates]);
    assert!(second.is_empty());
}

/// Given the coalescing fetch policy
/// When a refetch is requested while one is in flight
/// Then no second fetch is issued
#[tokio::test]
async fn test_coalesced_refetch() {
    let service = Arc::new(MockService::new(sample_tasks(), sample_templates()));
    let mut h = Harness::with_policy(service, FetchPolicy::Coalesce);
    h.start().await;

    let first = update(&mut h.model, Message::Key(key(KeyCode::Char('r'))));
    let second = update(&mut h.model, Message::Key(key(KeyCode::Char('r'))));
    assert_eq!(first, vec![Command::FetchTasks]);
    assert!(second.is_empty());
}
