//! Startup, category switching and task selection driven end to end
//! through `update` and the mock service.

use std::sync::Arc;

use crossterm::event::KeyCode;
use serde_json::json;

use taskdeck::diagram::DiagramPhase;
use taskdeck::nav::Category;
use taskdeck::present::{Block, DisplayPlan};
use taskdeck::tea::{update, Command, Message};
use taskdeck::Error;

use crate::fixtures::{key, sample_tasks, sample_templates, Harness, MockService};

fn harness() -> (Arc<MockService>, Harness) {
    let service = Arc::new(MockService::new(sample_tasks(), sample_templates()));
    let harness = Harness::new(service.clone());
    (service, harness)
}

/// Given a service with tasks and templates
/// When the app starts
/// Then tasks load first, templates second, and the first template is selected
#[tokio::test]
async fn test_startup_loads_tasks_then_templates() {
    let (service, mut h) = harness();
    h.start().await;

    assert_eq!(h.executed[0], Command::FetchTasks);
    assert_eq!(h.executed[1], Command::FetchTemplates);
    assert_eq!(service.calls(), (1, 1, 0));

    let state = h.model.snapshot();
    assert_eq!(state.categories.len(), 3);
    assert_eq!(state.active_category, Category::Templates);
    assert_eq!(state.selected_template.as_deref(), Some("bug-hunt.md"));
    assert!(matches!(state.plan, DisplayPlan::Template(ref v) if v.display_name == "bug-hunt"));
    assert!(!state.loading_tasks);
    assert!(!state.loading_templates);
}

/// Given a failing task endpoint
/// When the app starts
/// Then templates still load and the error is shown
#[tokio::test]
async fn test_startup_survives_task_failure() {
    let (service, mut h) = harness();
    service.push_tasks(Err(Error::Fetch("HTTP 500".to_string())));
    h.start().await;

    assert_eq!(service.calls(), (1, 1, 0));
    let state = h.model.snapshot();
    assert_eq!(state.categories.len(), 1);
    assert!(state.tasks_error.as_deref().unwrap().contains("HTTP 500"));
    assert_eq!(state.templates.len(), 3);
}

/// Given loaded data
/// When the user tabs into a task category
/// Then the newest task is shown and its diagrams settle
#[tokio::test]
async fn test_tab_into_category_renders_diagrams() {
    let (_, mut h) = harness();
    h.start().await;
    h.press(KeyCode::Tab).await;

    let state = h.model.snapshot();
    assert_eq!(state.active_category, Category::Custom("bug-hunt".into()));
    assert_eq!(state.selected_task.as_deref(), Some("bug-run-0002"));
    assert_eq!(state.task_cards.len(), 2);
    assert_eq!(state.task_cards[0].more_findings, 1);
    assert_eq!(state.templates.len(), 1, "related templates listed");

    assert_eq!(state.diagrams.len(), 2);
    assert!(matches!(state.diagrams[0], DiagramPhase::Rendered(_)));
    assert!(matches!(
        state.diagrams[1],
        DiagramPhase::Errored { ref source, .. } if source == "notadiagram"
    ));

    let DisplayPlan::Task(view) = state.plan else {
        panic!("expected a task plan");
    };
    let titles: Vec<_> = view.blocks.iter().map(Block::title).collect();
    assert_eq!(titles, ["Summary", "Visualizations"]);
}

/// Given a selected task with diagrams
/// When the user moves to a task without diagrams and back
/// Then earlier renders are not repeated
#[tokio::test]
async fn test_moving_between_tasks() {
    let (_, mut h) = harness();
    h.start().await;
    h.press(KeyCode::Tab).await;
    let renders = h.count(|c| matches!(c, Command::RenderDiagram { .. }));
    assert_eq!(renders, 2);

    h.press(KeyCode::Char('j')).await;
    assert_eq!(h.model.nav.selected_task(), Some("bug-run-0001"));
    assert!(h.model.snapshot().diagrams.is_empty());

    h.press(KeyCode::Char('j')).await;
    assert_eq!(h.model.nav.selected_task(), Some("bug-run-0001"), "clamped at the end");

    h.press(KeyCode::Char('k')).await;
    assert_eq!(h.model.nav.selected_task(), Some("bug-run-0002"));
    let state = h.model.snapshot();
    assert_eq!(state.diagrams.len(), 2);
    assert!(matches!(state.diagrams[0], DiagramPhase::Rendered(_)));
}

/// Given diagram renders still running for the selected task
/// When the user moves away before they land and then comes back
/// Then the finished renders are shown without rendering again
#[tokio::test]
async fn test_renders_landing_while_away_are_kept() {
    let (_, mut h) = harness();
    h.start().await;

    let pending: Vec<Command> = update(&mut h.model, Message::Key(key(KeyCode::Tab)))
        .into_iter()
        .filter(|c| matches!(c, Command::RenderDiagram { .. }))
        .collect();
    assert_eq!(pending.len(), 2);

    h.press(KeyCode::Char('j')).await;
    assert!(h.model.snapshot().diagrams.is_empty());
    for cmd in pending {
        let reply = h.execute(cmd).await.unwrap();
        h.send(reply).await;
    }

    h.press(KeyCode::Char('k')).await;
    let state = h.model.snapshot();
    assert!(matches!(state.diagrams[0], DiagramPhase::Rendered(_)));
    assert!(matches!(state.diagrams[1], DiagramPhase::Errored { .. }));
    assert_eq!(h.count(|c| matches!(c, Command::RenderDiagram { .. })), 0);
}

/// Given the user in a task category
/// When a reload drops that category
/// Then the view falls back to templates
#[tokio::test]
async fn test_reload_drops_active_category() {
    let (service, mut h) = harness();
    h.start().await;
    h.press(KeyCode::Tab).await;
    h.press(KeyCode::Tab).await;
    assert_eq!(
        *h.model.nav.active_category(),
        Category::Custom("perf-audit".into())
    );

    service.push_tasks(Ok(json!({"tasks": [
        {"taskMetadata": {"runId": "x", "taskType": "bug-hunt"}}
    ]})));
    h.press(KeyCode::Char('r')).await;

    assert_eq!(*h.model.nav.active_category(), Category::Templates);
    assert_eq!(service.calls(), (2, 1, 0), "reload does not refetch templates");
}

/// Given two overlapping reloads
/// When they complete out of order
/// Then the last completion wins
#[tokio::test]
async fn test_overlapping_reloads_last_completion_wins() {
    let (service, mut h) = harness();
    h.start().await;

    service.push_tasks(Ok(json!({"tasks": [
        {"taskMetadata": {"runId": "first", "taskType": "alpha"}}
    ]})));
    service.push_tasks(Ok(json!({"tasks": [
        {"taskMetadata": {"runId": "second", "taskType": "beta"}}
    ]})));

    let first = update(&mut h.model, Message::Key(key(KeyCode::Char('r'))));
    let second = update(&mut h.model, Message::Key(key(KeyCode::Char('r'))));
    assert_eq!(first, vec![Command::FetchTasks]);
    assert_eq!(second, vec![Command::FetchTasks]);
    assert!(h.model.snapshot().loading_tasks);

    let reply_a = h.execute(Command::FetchTasks).await.unwrap();
    let reply_b = h.execute(Command::FetchTasks).await.unwrap();
    h.send(reply_b).await;
    h.send(reply_a).await;

    assert_eq!(h.model.tasks.custom_types, ["alpha"]);
    assert!(!h.model.snapshot().loading_tasks);
}

/// Given the templates category with a selection
/// When the user copies
/// Then the copy command carries the raw template text
#[tokio::test]
async fn test_copy_selected_template() {
    let (_, mut h) = harness();
    h.start().await;
    h.press(KeyCode::Char('j')).await;
    h.press(KeyCode::Char('c')).await;

    assert!(h.executed.contains(&Command::CopyToClipboard {
        key: "perf-audit.md".into(),
        content: "# Perf\nMeasure `Vec<T>` growth.".into(),
    }));
    let note = h.model.notification.clone().unwrap();
    assert_eq!(note.message, "Copied perf-audit.md to clipboard");
}
