//! The local directory backend driven through the full update loop.

use std::fs;
use std::sync::Arc;

use crossterm::event::KeyCode;
use tempfile::TempDir;

use taskdeck::present::DisplayPlan;
use taskdeck::service::{LocalTaskService, TASKS_FILE, TEMPLATES_FILE, TEMPLATE_SOURCE_DIR};

use crate::fixtures::Harness;

fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(TASKS_FILE),
        r#"[
            {"taskMetadata": {"runId": "r-1", "taskName": "Scan", "taskType": "security",
                              "createdAt": "2024-05-01T00:00:00Z"},
             "summary": {"status": "completed"}},
            "not a record"
        ]"#,
    )
    .unwrap();
    let templates = dir.path().join(TEMPLATE_SOURCE_DIR);
    fs::create_dir(&templates).unwrap();
    fs::write(templates.join("security.md"), "# Security\n```html\n<b>x</b>\n```").unwrap();
    fs::write(templates.join("notes.txt"), "ignored").unwrap();
    dir
}

/// Given a data directory without a template collection
/// When the app starts and the user refreshes
/// Then the collection is generated from the markdown sources and loaded
#[tokio::test]
async fn test_refresh_generates_collection() {
    let dir = data_dir();
    let mut h = Harness::new(Arc::new(LocalTaskService::new(dir.path())));
    h.start().await;

    assert!(h.model.templates.collection().is_empty());
    assert_eq!(h.model.tasks.all_tasks.len(), 1, "non-object record skipped");

    h.press(KeyCode::Char('R')).await;

    assert!(dir.path().join(TEMPLATES_FILE).exists());
    let state = h.model.snapshot();
    assert_eq!(state.templates.len(), 1);
    assert_eq!(state.templates[0].key, "security.md");
    // The first non-empty load auto-selects.
    assert!(matches!(state.plan, DisplayPlan::Template(ref v) if v.key == "security.md"));
}

/// Given a data directory without a templates folder
/// When the user refreshes
/// Then the backend error is surfaced
#[tokio::test]
async fn test_refresh_without_sources() {
    let dir = TempDir::new().unwrap();
    let mut h = Harness::new(Arc::new(LocalTaskService::new(dir.path())));
    h.start().await;
    h.press(KeyCode::Char('R')).await;

    let note = h.model.notification.clone().unwrap();
    assert!(note.message.contains("Could not read templates folder"));
}

/// Given tasks on disk
/// When the user opens the task category
/// Then the task plan is composed from the file
#[tokio::test]
async fn test_local_task_view() {
    let dir = data_dir();
    let mut h = Harness::new(Arc::new(LocalTaskService::new(dir.path())));
    h.start().await;
    h.press(KeyCode::Tab).await;

    match h.model.plan() {
        DisplayPlan::Task(view) => {
            assert_eq!(view.header.task_name, "Scan");
            assert_eq!(view.header.status_label, "completed");
        }
        other => panic!("expected task plan, got {:?}", other),
    }
}
