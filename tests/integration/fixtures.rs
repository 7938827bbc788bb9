//! Test fixtures for integration tests.
//!
//! Provides:
//! - `MockService`: a scripted task data service with call counters
//! - `Harness`: drives `update` and executes its commands in-process
//! - Sample task and template payloads

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde_json::{json, Value};

use taskdeck::aggregate::fetch_tasks;
use taskdeck::config::{Config, FetchPolicy};
use taskdeck::diagram::{render_deferred, DiagramTheme, RendererInit, TextDiagramRenderer};
use taskdeck::service::TaskDataService;
use taskdeck::tea::{update, Command, Message, Model};
use taskdeck::templates::{fetch_templates, refresh_templates};
use taskdeck::{Error, Result};

type Script = Mutex<VecDeque<Result<Value>>>;

/// Task data service answering from per-endpoint queues.
///
/// When a queue runs dry the last scripted default is returned again.
pub struct MockService {
    tasks: Script,
    templates: Script,
    refresh: Script,
    default_tasks: Value,
    default_templates: Value,
    pub task_calls: AtomicUsize,
    pub template_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

impl MockService {
    pub fn new(tasks: Value, templates: Value) -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            templates: Mutex::new(VecDeque::new()),
            refresh: Mutex::new(VecDeque::new()),
            default_tasks: tasks,
            default_templates: templates,
            task_calls: AtomicUsize::new(0),
            template_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_tasks(&self, response: Result<Value>) {
        self.tasks.lock().unwrap().push_back(response);
    }

    pub fn push_templates(&self, response: Result<Value>) {
        self.templates.lock().unwrap().push_back(response);
    }

    pub fn push_refresh(&self, response: Result<Value>) {
        self.refresh.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.task_calls.load(Ordering::SeqCst),
            self.template_calls.load(Ordering::SeqCst),
            self.refresh_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl TaskDataService for MockService {
    async fn get_all_tasks(&self) -> Result<Value> {
        self.task_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.tasks.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.default_tasks.clone()))
    }

    async fn get_task_templates(&self) -> Result<Value> {
        self.template_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.templates.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.default_templates.clone()))
    }

    async fn refresh_templates(&self) -> Result<Value> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.refresh.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(Error::Refresh("no scripted response".to_string())))
    }

    async fn save_result(&self, record: Value) -> Result<String> {
        taskdeck::service::validate_result(&record)?;
        Ok(format!("saved-{}", record["taskMetadata"]["runId"].as_str().unwrap_or_default()))
    }
}

/// Runs the update loop against a service without threads or a terminal.
pub struct Harness {
    pub model: Model,
    pub service: Arc<dyn TaskDataService>,
    renderer_init: Arc<RendererInit>,
    /// Commands seen, in execution order.
    pub executed: Vec<Command>,
}

impl Harness {
    pub fn new(service: Arc<dyn TaskDataService>) -> Self {
        Self::with_policy(service, FetchPolicy::Overlap)
    }

    pub fn with_policy(service: Arc<dyn TaskDataService>, fetch_policy: FetchPolicy) -> Self {
        let renderer_init = Arc::new(RendererInit::new());
        let config = Config {
            fetch_policy,
            ..Default::default()
        };
        Self {
            model: Model::new(config, renderer_init.clone()),
            service,
            renderer_init,
            executed: Vec::new(),
        }
    }

    /// Run startup and settle every follow-up command.
    pub async fn start(&mut self) {
        let cmds = self.model.init();
        self.settle(cmds).await;
    }

    /// Feed one message and settle every follow-up command.
    pub async fn send(&mut self, msg: Message) {
        let cmds = update(&mut self.model, msg);
        self.settle(cmds).await;
    }

    pub async fn press(&mut self, code: KeyCode) {
        self.send(Message::Key(key(code))).await;
    }

    /// Execute commands breadth-first until nothing is left.
    pub async fn settle(&mut self, cmds: Vec<Command>) {
        let mut queue: VecDeque<Command> = cmds.into();
        while let Some(cmd) = queue.pop_front() {
            self.executed.push(cmd.clone());
            if let Some(reply) = self.execute(cmd).await {
                queue.extend(update(&mut self.model, reply));
            }
        }
    }

    /// Execute one command and return its reply without applying it.
    pub async fn execute(&self, cmd: Command) -> Option<Message> {
        match cmd {
            Command::FetchTasks => Some(match fetch_tasks(self.service.as_ref()).await {
                Ok(c) => Message::TasksLoaded(c),
                Err(e) => Message::TasksLoadFailed(e.to_string()),
            }),
            Command::FetchTemplates => Some(match fetch_templates(self.service.as_ref()).await {
                Ok(c) => Message::TemplatesLoaded(c),
                Err(e) => Message::TemplatesLoadFailed(e.to_string()),
            }),
            Command::RefreshTemplates => {
                Some(match refresh_templates(self.service.as_ref()).await {
                    Ok(outcome) => Message::TemplatesRefreshed(outcome),
                    Err(e) => Message::TemplatesRefreshFailed(e.to_string()),
                })
            }
            Command::RenderDiagram { index, ticket } => {
                let (generation, outcome) = render_deferred(
                    Arc::new(TextDiagramRenderer::new()),
                    self.renderer_init.clone(),
                    DiagramTheme::Dark,
                    ticket,
                )
                .await;
                Some(Message::DiagramRendered {
                    index,
                    generation,
                    outcome,
                })
            }
            // The clipboard is a terminal side effect; report success.
            Command::CopyToClipboard { key, .. } => Some(Message::TemplateCopied(key)),
            Command::Quit => None,
        }
    }

    pub fn count(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.executed.iter().filter(|c| pred(c)).count()
    }
}

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

/// Two task types: `bug-hunt` (two runs) and `perf-audit` (one run).
pub fn sample_tasks() -> Value {
    json!({"tasks": [
        {
            "taskMetadata": {
                "runId": "bug-run-0001",
                "taskName": "Bug hunt (older)",
                "taskType": "bug-hunt",
                "createdAt": "2024-03-01T10:00:00Z"
            },
            "summary": {"status": "completed", "keyFindings": ["none"]}
        },
        {
            "taskMetadata": {
                "runId": "bug-run-0002",
                "taskName": "Bug hunt (newer)",
                "taskType": "bug-hunt",
                "createdAt": "2024-03-02T10:00:00Z"
            },
            "summary": {
                "status": "issues-found",
                "metrics": {"filesScanned": 42},
                "keyFindings": ["null deref", "leak", "race"]
            },
            "visualizations": [
                {"title": "Flow", "content": "graph TD\nA --> B"},
                {"title": "Broken", "content": "notadiagram"}
            ]
        },
        {
            "taskMetadata": {
                "runId": "perf-run-0001",
                "taskName": "Perf audit",
                "taskType": "perf-audit",
                "createdAt": "2024-02-01T10:00:00Z"
            },
            "summary": {"status": "needs-attention"}
        }
    ]})
}

pub fn sample_templates() -> Value {
    json!({"templates": {
        "bug-hunt.md": "# Bug hunt\nFind bugs.",
        "perf-audit.md": "# Perf\nMeasure `Vec<T>` growth.",
        "security.md": "# Security"
    }})
}
