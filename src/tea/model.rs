//! Model for the TEA (The Elm Architecture) pattern.
//!
//! The Model is pure application state - no channels, no handles, no runtime
//! infrastructure. The shared renderer-init guard is the one exception: slots
//! read it to decide between `Initializing` and `Ready`.

use std::sync::Arc;

use crate::aggregate::TaskCollection;
use crate::config::{Config, FetchPolicy};
use crate::diagram::{DiagramBoard, RendererInit};
use crate::dlog_debug;
use crate::nav::{categories, Category, Navigation};
use crate::present::{compose, task_card, DisplayPlan};
use crate::render::{next_version, CategoryView, RenderState, TemplateItem};
use crate::templates::{display_name, TemplateStore};

use super::command::Command;

/// Level of a notification message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Error notification - displayed in red with "Error:" prefix
    Error,
    /// Informational notification - displayed in green
    Info,
}

/// A notification message to display to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Pure application state - the single source of truth.
pub struct Model {
    // Data
    pub tasks: TaskCollection,
    pub templates: TemplateStore,

    // Selection and derived render slots
    pub nav: Navigation,
    pub diagrams: DiagramBoard,
    pub renderer_init: Arc<RendererInit>,

    // Fetch bookkeeping
    pub tasks_in_flight: usize,
    pub templates_in_flight: usize,
    pub refreshing: bool,
    /// Templates are first requested once the first task load settles.
    pub templates_requested: bool,
    pub tasks_error: Option<String>,

    // UI state
    pub notification: Option<Notification>,
    /// Whether the keymap legend is expanded (toggled by '?')
    pub show_keymap: bool,
    /// Detail pane scroll offset in lines
    pub scroll: u16,

    // Dirty flag - set when state changes and render is needed
    pub dirty: bool,

    // Config (immutable after init)
    pub config: Config,
}

impl Model {
    pub fn new(config: Config, renderer_init: Arc<RendererInit>) -> Self {
        Self {
            tasks: TaskCollection::default(),
            templates: TemplateStore::new(),
            nav: Navigation::new(),
            diagrams: DiagramBoard::new(),
            renderer_init,
            tasks_in_flight: 0,
            templates_in_flight: 0,
            refreshing: false,
            templates_requested: false,
            tasks_error: None,
            notification: None,
            show_keymap: false,
            scroll: 0,
            dirty: true,
            config,
        }
    }

    /// Commands to run once at startup.
    pub fn init(&mut self) -> Vec<Command> {
        self.request_tasks().into_iter().collect()
    }

    /// Issue a task fetch unless the fetch policy drops it.
    pub fn request_tasks(&mut self) -> Option<Command> {
        if self.config.fetch_policy == FetchPolicy::Coalesce && self.tasks_in_flight > 0 {
            dlog_debug!("Task fetch coalesced ({} in flight)", self.tasks_in_flight);
            return None;
        }
        self.tasks_in_flight += 1;
        Some(Command::FetchTasks)
    }

    /// Issue a template fetch unless the fetch policy drops it.
    pub fn request_templates(&mut self) -> Option<Command> {
        if self.config.fetch_policy == FetchPolicy::Coalesce && self.templates_in_flight > 0 {
            dlog_debug!("Template fetch coalesced ({} in flight)", self.templates_in_flight);
            return None;
        }
        self.templates_requested = true;
        self.templates_in_flight += 1;
        Some(Command::FetchTemplates)
    }

    pub fn plan(&self) -> DisplayPlan {
        compose(&self.nav, &self.tasks, self.templates.collection())
    }

    /// Diagram sources of the displayed task, by visualization index.
    pub fn diagram_sources(&self) -> Vec<String> {
        match self.plan() {
            DisplayPlan::Task(view) => view
                .blocks
                .into_iter()
                .find_map(|block| match block {
                    crate::present::Block::Visualizations(list) => {
                        Some(list.into_iter().map(|v| v.content).collect())
                    }
                    _ => None,
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Where task data comes from, for the header line.
    pub fn source_label(&self) -> String {
        match self.config.effective_data_dir() {
            Some(dir) => dir.display().to_string(),
            None => self.config.effective_base_url().to_string(),
        }
    }

    /// Create an immutable snapshot for the render thread.
    ///
    /// Each snapshot gets a monotonically increasing version number so the
    /// render thread can skip redundant frames.
    pub fn snapshot(&self) -> RenderState {
        let collection = self.templates.collection();

        let category_views = categories(&self.tasks)
            .into_iter()
            .map(|category| {
                let count = match &category {
                    Category::Templates => collection.len(),
                    Category::Custom(task_type) => self.tasks.tasks_of(task_type).len(),
                };
                CategoryView {
                    label: match &category {
                        Category::Templates => "Task Templates".to_string(),
                        Category::Custom(t) => crate::present::category_label(t),
                    },
                    category,
                    count,
                }
            })
            .collect();

        let (task_cards, template_keys): (Vec<_>, Vec<&str>) = match self.nav.active_category() {
            Category::Templates => (Vec::new(), collection.keys().collect()),
            Category::Custom(task_type) => (
                self.tasks.tasks_of(task_type).iter().map(task_card).collect(),
                collection.for_task_type(task_type),
            ),
        };

        RenderState {
            version: next_version(),
            source: self.source_label(),
            categories: category_views,
            active_category: self.nav.active_category().clone(),
            task_cards,
            selected_task: self.nav.selected_task().map(str::to_string),
            templates: template_keys
                .into_iter()
                .map(|key| TemplateItem {
                    key: key.to_string(),
                    display_name: display_name(key).to_string(),
                })
                .collect(),
            selected_template: self.nav.selected_template().map(str::to_string),
            plan: self.plan(),
            diagrams: self
                .diagrams
                .slots()
                .iter()
                .map(|slot| slot.phase().clone())
                .collect(),
            loading_tasks: self.tasks_in_flight > 0,
            loading_templates: self.templates_in_flight > 0,
            refreshing_templates: self.refreshing,
            tasks_error: self.tasks_error.clone(),
            notification: self.notification.clone(),
            show_keymap: self.show_keymap,
            scroll: self.scroll,
        }
    }
}
