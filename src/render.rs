use std::sync::atomic::{AtomicU64, Ordering};

use crate::diagram::DiagramPhase;
use crate::nav::Category;
use crate::present::{DisplayPlan, TaskCard};
use crate::tea::Notification;

/// One entry of the category tab bar.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryView {
    pub category: Category,
    pub label: String,
    /// Templates for the Templates category, tasks otherwise.
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateItem {
    pub key: String,
    pub display_name: String,
}

// 0 is reserved for RenderState::default().
static VERSION_COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn next_version() -> u64 {
    VERSION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
pub struct RenderState {
    pub version: u64,
    /// Base URL or data directory the tasks come from.
    pub source: String,
    pub categories: Vec<CategoryView>,
    pub active_category: Category,
    /// Task list of the active custom category.
    pub task_cards: Vec<TaskCard>,
    pub selected_task: Option<String>,
    /// All templates in Templates, related templates in a custom category.
    pub templates: Vec<TemplateItem>,
    pub selected_template: Option<String>,
    pub plan: DisplayPlan,
    /// Phase of each diagram slot of the displayed task.
    pub diagrams: Vec<DiagramPhase>,
    pub loading_tasks: bool,
    pub loading_templates: bool,
    pub refreshing_templates: bool,
    pub tasks_error: Option<String>,
    pub notification: Option<Notification>,
    /// Whether the keymap legend is expanded (toggled by '?')
    pub show_keymap: bool,
    pub scroll: u16,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            version: 0,
            source: String::new(),
            categories: Vec::new(),
            active_category: Category::Templates,
            task_cards: Vec::new(),
            selected_task: None,
            templates: Vec::new(),
            selected_template: None,
            plan: DisplayPlan::Empty {
                hint: String::new(),
            },
            diagrams: Vec::new(),
            loading_tasks: false,
            loading_templates: false,
            refreshing_templates: false,
            tasks_error: None,
            notification: None,
            show_keymap: false,
            scroll: 0,
        }
    }
}
