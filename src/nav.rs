//! Single-selection navigation: active category → selected task → selected
//! template.
//!
//! The Templates category (the core `"tasks"` type) shows templates, so
//! only `selected_template` means anything there. A custom category shows
//! its task list, so only `selected_task` does. Every transition keeps the
//! unused side cleared.

use crate::aggregate::{TaskCollection, CORE_TYPE};
use crate::templates::TemplateCollection;
use crate::dlog_debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Category {
    /// The core category. Lists templates.
    #[default]
    Templates,
    /// A task type other than the core one.
    Custom(String),
}

impl Category {
    pub fn from_key(key: &str) -> Self {
        if key == CORE_TYPE {
            Self::Templates
        } else {
            Self::Custom(key.to_string())
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Templates => CORE_TYPE,
            Self::Custom(task_type) => task_type,
        }
    }
}

/// Categories in display order: Templates first, then the custom types.
pub fn categories(tasks: &TaskCollection) -> Vec<Category> {
    std::iter::once(Category::Templates)
        .chain(tasks.custom_types.iter().map(|t| Category::Custom(t.clone())))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Navigation {
    active: Category,
    selected_task: Option<String>,
    selected_template: Option<String>,
    template_auto_selected: bool,
}

impl Navigation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_category(&self) -> &Category {
        &self.active
    }

    pub fn selected_task(&self) -> Option<&str> {
        self.selected_task.as_deref()
    }

    pub fn selected_template(&self) -> Option<&str> {
        self.selected_template.as_deref()
    }

    /// Switch category. Selecting the active one changes nothing and
    /// returns false.
    pub fn select_category(&mut self, category: Category, tasks: &TaskCollection) -> bool {
        if category == self.active {
            return false;
        }
        dlog_debug!("nav: category {} -> {}", self.active.key(), category.key());
        self.active = category;
        self.enter(tasks);
        true
    }

    /// Move to the next or previous category, wrapping around.
    pub fn step_category(&mut self, delta: isize, tasks: &TaskCollection) -> bool {
        let all = categories(tasks);
        let current = all.iter().position(|c| *c == self.active).unwrap_or(0);
        let next = wrap(current, delta, all.len());
        self.select_category(all[next].clone(), tasks)
    }

    /// Select a task of the active custom category. Run ids outside that
    /// category, and any selection while in Templates, are rejected.
    pub fn select_task(&mut self, run_id: &str, tasks: &TaskCollection) -> bool {
        let Category::Custom(task_type) = &self.active else {
            return false;
        };
        if !tasks.tasks_of(task_type).iter().any(|r| r.run_id() == run_id) {
            dlog_debug!("nav: rejected task {} outside '{}'", run_id, task_type);
            return false;
        }
        self.selected_task = Some(run_id.to_string());
        self.selected_template = None;
        true
    }

    /// Move the task selection within the active category, clamping at
    /// both ends.
    pub fn step_task(&mut self, delta: isize, tasks: &TaskCollection) -> bool {
        let Category::Custom(task_type) = &self.active else {
            return false;
        };
        let list = tasks.tasks_of(task_type);
        if list.is_empty() {
            return false;
        }
        let current = self
            .selected_task
            .as_deref()
            .and_then(|id| list.iter().position(|r| r.run_id() == id));
        let next = match current {
            Some(i) => clamp(i, delta, list.len()),
            None => 0,
        };
        let run_id = list[next].run_id().to_string();
        self.select_task(&run_id, tasks)
    }

    /// Select a template while in the Templates category.
    pub fn select_template(&mut self, key: &str, templates: &TemplateCollection) -> bool {
        if self.active != Category::Templates || !templates.contains(key) {
            return false;
        }
        self.selected_template = Some(key.to_string());
        self.selected_task = None;
        true
    }

    pub fn step_template(&mut self, delta: isize, templates: &TemplateCollection) -> bool {
        if self.active != Category::Templates {
            return false;
        }
        let keys: Vec<&str> = templates.keys().collect();
        if keys.is_empty() {
            return false;
        }
        let current = self
            .selected_template
            .as_deref()
            .and_then(|k| keys.iter().position(|key| *key == k));
        let next = match current {
            Some(i) => clamp(i, delta, keys.len()),
            None => 0,
        };
        self.select_template(keys[next], templates)
    }

    /// Reconcile the selection with a freshly fetched task collection.
    /// `previous_custom_types` is the custom type list before the refetch.
    pub fn on_tasks_replaced(&mut self, previous_custom_types: &[String], tasks: &TaskCollection) {
        if previous_custom_types != tasks.custom_types.as_slice() {
            if let Category::Custom(task_type) = &self.active {
                if !tasks.custom_types.contains(task_type) {
                    dlog_debug!("nav: category '{}' vanished, back to templates", task_type);
                    self.active = Category::Templates;
                }
            }
            self.enter(tasks);
            return;
        }

        let Some(run_id) = self.selected_task.as_deref() else {
            return;
        };
        let still_there = tasks
            .tasks_of(self.active.key())
            .iter()
            .any(|r| r.run_id() == run_id);
        if !still_there {
            dlog_debug!("nav: selected task {} no longer present", run_id);
            self.selected_task = None;
        }
    }

    /// Reconcile the selection with a freshly fetched template collection.
    pub fn on_templates_loaded(&mut self, templates: &TemplateCollection) {
        if let Some(key) = self.selected_template.as_deref() {
            if !templates.contains(key) {
                dlog_debug!("nav: selected template {} no longer present", key);
                self.selected_template = None;
            }
        }

        if self.template_auto_selected
            || self.active != Category::Templates
            || self.selected_template.is_some()
        {
            return;
        }
        if let Some(first) = templates.first_key() {
            self.selected_template = Some(first.to_string());
            self.template_auto_selected = true;
        }
    }

    fn enter(&mut self, tasks: &TaskCollection) {
        match &self.active {
            Category::Templates => {
                self.selected_task = None;
                self.selected_template = None;
            }
            Category::Custom(task_type) => {
                self.selected_task = tasks
                    .tasks_of(task_type)
                    .first()
                    .map(|r| r.run_id().to_string());
                self.selected_template = None;
            }
        }
    }
}

fn wrap(index: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (index as isize + delta).rem_euclid(len as isize) as usize
}

fn clamp(index: usize, delta: isize, len: usize) -> usize {
    (index as isize + delta).clamp(0, len as isize - 1) as usize
}
