//! Pure display-plan building.
//!
//! Nothing here touches the terminal. The UI and the headless `show`
//! command both turn a [`DisplayPlan`] into output.

use crate::aggregate::TaskCollection;
use crate::model::{scalar_text, ActionPriority, Reference, StatusKind, TaskRecord};
use crate::nav::{Category, Navigation};
use crate::templates::{display_name, TemplateCollection};

/// Number of key findings shown on a task card.
pub const FINDINGS_PREVIEW: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayPlan {
    /// Nothing selected; the hint says what to do next.
    Empty { hint: String },
    Task(TaskView),
    Template(TemplateView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskHeader {
    pub task_name: String,
    pub run_id: String,
    pub short_run_id: String,
    pub task_type: String,
    pub created_at: String,
    pub status: StatusKind,
    pub status_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskView {
    pub header: TaskHeader,
    /// Summary → visualizations → sections → actions → references, empty
    /// ones left out.
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationView {
    pub title: String,
    pub description: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionView {
    pub title: String,
    pub description: String,
    pub priority: Option<ActionPriority>,
    pub impact: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Summary {
        status: StatusKind,
        status_label: String,
        /// Humanized metric name and value text, in pipeline order.
        metrics: Vec<(String, String)>,
        key_findings: Vec<String>,
    },
    Visualizations(Vec<VisualizationView>),
    Sections(Vec<SectionView>),
    Actions(Vec<ActionView>),
    References(Vec<Reference>),
}

impl Block {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Summary { .. } => "Summary",
            Self::Visualizations(_) => "Visualizations",
            Self::Sections(_) => "Analysis Details",
            Self::Actions(_) => "Recommended Actions",
            Self::References(_) => "References",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateView {
    pub key: String,
    pub display_name: String,
    /// Raw text. Sanitize before markdown rendering; copy as-is.
    pub content: String,
}

/// One entry of a category's task list.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCard {
    pub run_id: String,
    pub task_name: String,
    pub short_run_id: String,
    pub created_at: String,
    pub status: StatusKind,
    pub status_label: String,
    pub findings: Vec<String>,
    /// Findings beyond the preview.
    pub more_findings: usize,
}

/// Build the display plan for the current selection.
pub fn compose(nav: &Navigation, tasks: &TaskCollection, templates: &TemplateCollection) -> DisplayPlan {
    match nav.active_category() {
        Category::Templates => match nav.selected_template().and_then(|k| templates.get(k).map(|c| (k, c))) {
            Some((key, content)) => DisplayPlan::Template(TemplateView {
                key: key.to_string(),
                display_name: display_name(key).to_string(),
                content: content.to_string(),
            }),
            None if templates.is_empty() => DisplayPlan::Empty {
                hint: "No templates available. Press R to refresh templates.".to_string(),
            },
            None => DisplayPlan::Empty {
                hint: "Select a template to view its content.".to_string(),
            },
        },
        Category::Custom(task_type) => {
            let list = tasks.tasks_of(task_type);
            let selected = nav
                .selected_task()
                .and_then(|id| list.iter().find(|r| r.run_id() == id));
            match selected {
                Some(record) => DisplayPlan::Task(task_view(record)),
                None if list.is_empty() => DisplayPlan::Empty {
                    hint: format!("No {} tasks yet.", category_label(task_type)),
                },
                None => DisplayPlan::Empty {
                    hint: "Select a task to view its results.".to_string(),
                },
            }
        }
    }
}

pub fn task_view(record: &TaskRecord) -> TaskView {
    let meta = &record.metadata;
    let status = StatusKind::classify(record.status());
    let header = TaskHeader {
        task_name: meta.task_name.clone(),
        run_id: meta.run_id.clone(),
        short_run_id: short_run_id(&meta.run_id),
        task_type: meta.task_type.clone(),
        created_at: meta.created_at.clone(),
        status,
        status_label: status_label(record.status()),
    };

    let mut blocks = Vec::new();

    if let Some(summary) = &record.summary {
        blocks.push(Block::Summary {
            status,
            status_label: status_label(summary.status.as_deref()),
            metrics: summary
                .metrics
                .iter()
                .map(|(k, v)| (humanize_metric_key(k), scalar_text(v).unwrap_or_else(|| v.to_string())))
                .collect(),
            key_findings: summary.key_findings.clone(),
        });
    }

    if !record.visualizations.is_empty() {
        blocks.push(Block::Visualizations(
            record
                .visualizations
                .iter()
                .map(|v| VisualizationView {
                    title: v.title.clone(),
                    description: v.description.clone(),
                    content: v.content.clone(),
                })
                .collect(),
        ));
    }

    if !record.sections.is_empty() {
        let mut sections: Vec<_> = record.sections.iter().collect();
        // Stable: equal priorities keep their original order.
        sections.sort_by_key(|s| (s.priority.is_none(), s.priority));
        blocks.push(Block::Sections(
            sections
                .into_iter()
                .map(|s| SectionView {
                    title: s.title.clone(),
                    content: s.content.clone(),
                })
                .collect(),
        ));
    }

    if !record.actions.is_empty() {
        blocks.push(Block::Actions(
            record
                .actions
                .iter()
                .map(|a| ActionView {
                    title: a.title.clone(),
                    description: a.description.clone(),
                    priority: a.priority,
                    impact: a.impact.clone(),
                })
                .collect(),
        ));
    }

    if !record.references.is_empty() {
        blocks.push(Block::References(record.references.clone()));
    }

    TaskView { header, blocks }
}

pub fn task_card(record: &TaskRecord) -> TaskCard {
    let findings = record.key_findings();
    TaskCard {
        run_id: record.run_id().to_string(),
        task_name: record.metadata.task_name.clone(),
        short_run_id: short_run_id(record.run_id()),
        created_at: record.metadata.created_at.clone(),
        status: StatusKind::classify(record.status()),
        status_label: status_label(record.status()),
        findings: findings.iter().take(FINDINGS_PREVIEW).cloned().collect(),
        more_findings: findings.len().saturating_sub(FINDINGS_PREVIEW),
    }
}

/// `filesScanned` → `Files Scanned`.
pub fn humanize_metric_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }
    let spaced = spaced.trim_start();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `bug-hunt` → `bug hunt`.
pub fn category_label(task_type: &str) -> String {
    task_type.replace('-', " ")
}

/// First eight characters followed by `...`.
pub fn short_run_id(run_id: &str) -> String {
    let head: String = run_id.chars().take(8).collect();
    format!("{}...", head)
}

pub fn status_label(status: Option<&str>) -> String {
    match status {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "Unknown".to_string(),
    }
}
