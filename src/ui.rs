//! Terminal UI rendering for taskdeck.
//!
//! Minimal chrome: no box drawing, whitespace and a single separator give
//! the structure. Selection uses the REVERSED modifier so it adapts to the
//! terminal theme.
//!
//! This module renders from RenderState (immutable snapshot) - it never
//! mutates application state.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};

use crate::diagram::DiagramPhase;
use crate::markdown;
use crate::model::{ActionPriority, StatusKind};
use crate::nav::Category;
use crate::present::{Block, DisplayPlan, TaskCard, TaskView, TemplateView};
use crate::render::RenderState;
use crate::sanitize::sanitize;
use crate::tea::{Notification, NotificationLevel};

// Color tokens
const COLOR_TEXT_DIMMED: Color = Color::Gray;
const COLOR_TEXT_MUTED: Color = Color::DarkGray;
const COLOR_SEPARATOR: Color = Color::White;
const COLOR_TITLE: Color = Color::Cyan;
const COLOR_ERROR: Color = Color::Red;

// Status color coding (uses terminal palette)
const COLOR_STATUS_COMPLETED: Color = Color::Green;
const COLOR_STATUS_ISSUES: Color = Color::Red;
const COLOR_STATUS_ATTENTION: Color = Color::Yellow;
const COLOR_STATUS_PROGRESS: Color = Color::Blue;
const COLOR_STATUS_CLARIFY: Color = Color::Magenta;

// Layout constants
const LIST_WIDTH: u16 = 38;
const MIN_SPLIT_WIDTH: u16 = 60;

/// A single keybinding entry for display.
struct Keybinding(&'static str, &'static str);

/// A group of related keybindings (separated by │).
struct KeybindingGroup(Vec<Keybinding>);

fn keybindings(state: &RenderState) -> Vec<KeybindingGroup> {
    let mut actions = vec![Keybinding("r", "reload"), Keybinding("R", "refresh templates")];
    if matches!(state.plan, DisplayPlan::Template(_)) {
        actions.push(Keybinding("c", "copy"));
    }

    vec![
        KeybindingGroup(vec![
            Keybinding("Tab", "category"),
            Keybinding("j/k", "select"),
            Keybinding("J/K", "scroll"),
        ]),
        KeybindingGroup(actions),
        KeybindingGroup(vec![Keybinding("q", "quit")]),
    ]
}

/// Main render function - entry point for all UI drawing.
pub fn draw(frame: &mut Frame, state: &RenderState) {
    let area = frame.area();

    if area.height < 4 {
        render_detail(frame, state, area);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .split(area);

    render_header(frame, state, chunks[0]);
    render_tabs(frame, state, chunks[1]);
    render_separator(frame, chunks[2]);
    render_body(frame, state, chunks[3]);
    render_statusbar(frame, state, chunks[4]);

    if let Some(ref notification) = state.notification {
        render_notification(frame, notification, area);
    }
}

/// Title, data source and activity indicators.
fn render_header(frame: &mut Frame, state: &RenderState, area: Rect) {
    let mut spans = vec![
        Span::styled("taskdeck", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled("  ", Style::default()),
        Span::styled(
            truncate(&state.source, (area.width as usize).saturating_sub(40)),
            Style::default().fg(COLOR_TEXT_MUTED),
        ),
    ];

    let activity: Vec<&str> = [
        (state.loading_tasks, "loading tasks"),
        (state.loading_templates, "loading templates"),
        (state.refreshing_templates, "refreshing templates"),
    ]
    .into_iter()
    .filter_map(|(on, label)| on.then_some(label))
    .collect();

    if !activity.is_empty() {
        spans.push(Span::styled(
            format!("  {}...", activity.join(", ")),
            Style::default().fg(COLOR_TEXT_DIMMED),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Category tab bar with counts. The active tab is reversed.
fn render_tabs(frame: &mut Frame, state: &RenderState, area: Rect) {
    let sep_style = Style::default().fg(COLOR_TEXT_MUTED);
    let mut spans: Vec<Span> = Vec::new();

    for (idx, view) in state.categories.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" │ ", sep_style));
        }
        let style = if view.category == state.active_category {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(COLOR_TEXT_DIMMED)
        };
        spans.push(Span::styled(format!(" {} ({}) ", view.label, view.count), style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_separator(frame: &mut Frame, area: Rect) {
    let solid = "─".repeat(area.width as usize);
    let line = Line::from(Span::styled(solid, Style::default().fg(COLOR_SEPARATOR)));
    frame.render_widget(Paragraph::new(line), area);
}

fn render_body(frame: &mut Frame, state: &RenderState, area: Rect) {
    if area.width < MIN_SPLIT_WIDTH {
        render_detail(frame, state, area);
        return;
    }

    let chunks = Layout::horizontal([
        Constraint::Length(LIST_WIDTH),
        Constraint::Length(2),
        Constraint::Fill(1),
    ])
    .split(area);

    let list = list_lines(state, chunks[0].width as usize);
    let selected_row = selected_row(state);
    let height = chunks[0].height as usize;
    // Scrolloff: keep the selection in view, centered when possible.
    let start = selected_row
        .map(|row| row.saturating_sub(height / 2))
        .unwrap_or(0)
        .min(list.len().saturating_sub(height));
    let visible: Vec<Line> = list.into_iter().skip(start).take(height).collect();

    frame.render_widget(Paragraph::new(visible), chunks[0]);
    render_detail(frame, state, chunks[2]);
}

fn render_detail(frame: &mut Frame, state: &RenderState, area: Rect) {
    let paragraph = Paragraph::new(plan_lines(&state.plan, &state.diagrams))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll, 0));
    frame.render_widget(paragraph, area);
}

/// Render the bottom line: "?" toggle, followed by the legend when expanded.
fn render_statusbar(frame: &mut Frame, state: &RenderState, area: Rect) {
    let key_style = Style::default().fg(COLOR_TEXT_DIMMED);
    let desc_style = Style::default().fg(COLOR_TEXT_MUTED);
    let sep_style = Style::default().fg(COLOR_TEXT_MUTED);

    let help_style = if state.show_keymap {
        Style::default()
    } else {
        Style::default().fg(COLOR_TEXT_MUTED)
    };
    let mut spans = vec![Span::styled("?", help_style)];

    if state.show_keymap {
        for group in keybindings(state) {
            spans.push(Span::styled(" │ ", sep_style));
            for (key_idx, keybinding) in group.0.iter().enumerate() {
                if key_idx > 0 {
                    spans.push(Span::styled(" • ", sep_style));
                }
                spans.push(Span::styled(keybinding.0, key_style));
                spans.push(Span::styled(format!(" {}", keybinding.1), desc_style));
            }
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render notification message on the bottom line of the screen.
///
/// Errors are red with a bold "Error:" prefix, info messages green.
fn render_notification(frame: &mut Frame, notification: &Notification, area: Rect) {
    let notification_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    frame.render_widget(Clear, notification_area);

    let line = match notification.level {
        NotificationLevel::Error => Line::from(vec![
            Span::styled(
                "Error: ",
                Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD),
            ),
            Span::styled(notification.message.clone(), Style::default().fg(COLOR_ERROR)),
        ]),
        NotificationLevel::Info => Line::from(Span::styled(
            notification.message.clone(),
            Style::default().fg(Color::Green),
        )),
    };

    frame.render_widget(Paragraph::new(line), notification_area);
}

// -----------------------------------------------------------------------------
// Left list
// -----------------------------------------------------------------------------

fn list_lines(state: &RenderState, width: usize) -> Vec<Line<'static>> {
    let dimmed = Style::default().fg(COLOR_TEXT_DIMMED);
    let mut lines = Vec::new();

    match &state.active_category {
        Category::Templates => {
            if state.templates.is_empty() {
                let msg = if state.loading_templates {
                    "Loading templates..."
                } else {
                    "No templates."
                };
                lines.push(Line::from(Span::styled(msg, dimmed)));
            }
            for item in &state.templates {
                let selected = state.selected_template.as_deref() == Some(item.key.as_str());
                lines.push(Line::from(Span::styled(
                    format!("{:<width$}", truncate(&item.display_name, width), width = width),
                    if selected {
                        Style::default().add_modifier(Modifier::REVERSED)
                    } else {
                        Style::default()
                    },
                )));
            }
        }
        Category::Custom(_) => {
            if let Some(err) = &state.tasks_error {
                lines.push(Line::from(Span::styled(
                    truncate(err, width),
                    Style::default().fg(COLOR_ERROR),
                )));
            }
            for card in &state.task_cards {
                let selected = state.selected_task.as_deref() == Some(card.run_id.as_str());
                lines.extend(card_lines(card, selected, width));
                lines.push(Line::default());
            }
            if !state.templates.is_empty() {
                lines.push(Line::from(Span::styled(
                    "Related templates",
                    Style::default().fg(COLOR_TEXT_MUTED).add_modifier(Modifier::BOLD),
                )));
                for item in &state.templates {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", truncate(&item.display_name, width.saturating_sub(2))),
                        dimmed,
                    )));
                }
            }
        }
    }

    if state.categories.len() <= 1 && state.loading_tasks {
        lines.push(Line::from(Span::styled("Loading tasks...", dimmed)));
    } else if state.categories.len() <= 1 {
        if let Some(err) = &state.tasks_error {
            lines.push(Line::from(Span::styled(
                truncate(err, width),
                Style::default().fg(COLOR_ERROR),
            )));
        }
    }

    lines
}

/// Row of the current selection within `list_lines`.
fn selected_row(state: &RenderState) -> Option<usize> {
    match &state.active_category {
        Category::Templates => {
            let key = state.selected_template.as_deref()?;
            state.templates.iter().position(|t| t.key == key)
        }
        Category::Custom(_) => {
            let run_id = state.selected_task.as_deref()?;
            let offset = usize::from(state.tasks_error.is_some());
            let mut row = offset;
            for card in &state.task_cards {
                if card.run_id == run_id {
                    return Some(row);
                }
                row += card_height(card) + 1;
            }
            None
        }
    }
}

fn card_height(card: &TaskCard) -> usize {
    2 + card.findings.len() + usize::from(card.more_findings > 0)
}

/// A task card: name with status, run id and date, finding preview.
fn card_lines(card: &TaskCard, selected: bool, width: usize) -> Vec<Line<'static>> {
    let status_width = card.status_label.chars().count() + 1;
    let name_width = width.saturating_sub(status_width);
    let name = format!("{:<w$}", truncate(&card.task_name, name_width), w = name_width);

    let (name_style, status_style) = if selected {
        let reversed = Style::default().add_modifier(Modifier::REVERSED);
        (reversed, reversed)
    } else {
        (
            Style::default().add_modifier(Modifier::BOLD),
            Style::default().fg(status_color(card.status)),
        )
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(name, name_style),
            Span::styled(format!(" {}", card.status_label), status_style),
        ]),
        Line::from(Span::styled(
            truncate(&format!("{}  {}", card.short_run_id, card.created_at), width),
            Style::default().fg(COLOR_TEXT_MUTED),
        )),
    ];

    for finding in &card.findings {
        lines.push(Line::from(Span::styled(
            truncate(&format!("• {}", finding), width),
            Style::default().fg(COLOR_TEXT_DIMMED),
        )));
    }
    if card.more_findings > 0 {
        lines.push(Line::from(Span::styled(
            format!("  {} more...", card.more_findings),
            Style::default().fg(COLOR_TEXT_MUTED),
        )));
    }

    lines
}

// -----------------------------------------------------------------------------
// Detail pane
// -----------------------------------------------------------------------------

/// Lines of the detail pane for a display plan. `diagrams` holds the phase
/// of each visualization slot, by index.
pub fn plan_lines(plan: &DisplayPlan, diagrams: &[DiagramPhase]) -> Vec<Line<'static>> {
    match plan {
        DisplayPlan::Empty { hint } => vec![Line::from(Span::styled(
            hint.clone(),
            Style::default().fg(COLOR_TEXT_DIMMED),
        ))],
        DisplayPlan::Task(view) => task_lines(view, diagrams),
        DisplayPlan::Template(view) => template_lines(view),
    }
}

fn task_lines(view: &TaskView, diagrams: &[DiagramPhase]) -> Vec<Line<'static>> {
    let header = &view.header;
    let muted = Style::default().fg(COLOR_TEXT_MUTED);

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                header.task_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                header.status_label.clone(),
                Style::default().fg(status_color(header.status)),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                "{}  {}  {}",
                header.short_run_id, header.task_type, header.created_at
            ),
            muted,
        )),
    ];

    for block in &view.blocks {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            block.title(),
            Style::default().fg(COLOR_TITLE).add_modifier(Modifier::BOLD),
        )));
        block_lines(block, diagrams, &mut lines);
    }

    lines
}

fn block_lines(block: &Block, diagrams: &[DiagramPhase], lines: &mut Vec<Line<'static>>) {
    let dimmed = Style::default().fg(COLOR_TEXT_DIMMED);
    let muted = Style::default().fg(COLOR_TEXT_MUTED);

    match block {
        Block::Summary {
            status,
            status_label,
            metrics,
            key_findings,
        } => {
            lines.push(Line::from(vec![
                Span::styled("Status: ", dimmed),
                Span::styled(status_label.clone(), Style::default().fg(status_color(*status))),
            ]));
            for (name, value) in metrics {
                lines.push(Line::from(vec![
                    Span::styled(format!("{}: ", name), dimmed),
                    Span::raw(value.clone()),
                ]));
            }
            if !key_findings.is_empty() {
                lines.push(Line::from(Span::styled("Key findings", dimmed)));
                for finding in key_findings {
                    lines.push(Line::from(format!("• {}", finding)));
                }
            }
        }

        Block::Visualizations(list) => {
            for (idx, viz) in list.iter().enumerate() {
                if idx > 0 {
                    lines.push(Line::default());
                }
                lines.push(Line::from(Span::styled(
                    viz.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                if let Some(description) = &viz.description {
                    lines.push(Line::from(Span::styled(description.clone(), dimmed)));
                }
                match diagrams.get(idx) {
                    Some(DiagramPhase::Rendered(diagram)) => {
                        lines.extend(diagram.lines.iter().map(|l| Line::from(l.clone())));
                    }
                    Some(DiagramPhase::Errored { message, source }) => {
                        lines.push(Line::from(Span::styled(
                            message.clone(),
                            Style::default().fg(COLOR_ERROR),
                        )));
                        lines.extend(
                            source
                                .lines()
                                .map(|l| Line::from(Span::styled(format!("  {}", l), muted))),
                        );
                    }
                    _ => lines.push(Line::from(Span::styled("Rendering diagram...", muted))),
                }
            }
        }

        Block::Sections(sections) => {
            for section in sections {
                lines.push(Line::from(Span::styled(
                    section.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.extend(markdown::render(&sanitize(&section.content)));
                lines.push(Line::default());
            }
        }

        Block::Actions(actions) => {
            for action in actions {
                let mut spans = Vec::new();
                if let Some(priority) = action.priority {
                    spans.push(Span::styled(
                        format!("[{}] ", priority.as_str().to_uppercase()),
                        Style::default()
                            .fg(priority_color(priority))
                            .add_modifier(Modifier::BOLD),
                    ));
                }
                spans.push(Span::styled(
                    action.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                lines.push(Line::from(spans));
                if !action.description.is_empty() {
                    lines.push(Line::from(format!("  {}", action.description)));
                }
                if let Some(impact) = &action.impact {
                    lines.push(Line::from(Span::styled(format!("  Impact: {}", impact), dimmed)));
                }
            }
        }

        Block::References(references) => {
            for reference in references {
                let mut spans = vec![Span::raw("• ")];
                if !reference.kind.is_empty() {
                    spans.push(Span::styled(format!("[{}] ", reference.kind), muted));
                }
                spans.push(Span::styled(
                    reference.path.clone(),
                    Style::default().add_modifier(Modifier::UNDERLINED),
                ));
                if !reference.description.is_empty() {
                    spans.push(Span::styled(format!("  {}", reference.description), dimmed));
                }
                lines.push(Line::from(spans));
            }
        }
    }
}

fn template_lines(view: &TemplateView) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            view.display_name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            view.key.clone(),
            Style::default().fg(COLOR_TEXT_MUTED),
        )),
        Line::default(),
    ];
    lines.extend(markdown::render(&sanitize(&view.content)));
    lines
}

// Helper functions

fn status_color(status: StatusKind) -> Color {
    match status {
        StatusKind::Completed => COLOR_STATUS_COMPLETED,
        StatusKind::IssuesFound => COLOR_STATUS_ISSUES,
        StatusKind::NeedsAttention => COLOR_STATUS_ATTENTION,
        StatusKind::InProgress => COLOR_STATUS_PROGRESS,
        StatusKind::SeekClarification => COLOR_STATUS_CLARIFY,
        StatusKind::Unknown => COLOR_TEXT_DIMMED,
    }
}

fn priority_color(priority: ActionPriority) -> Color {
    match priority {
        ActionPriority::High => COLOR_STATUS_ISSUES,
        ActionPriority::Medium => COLOR_STATUS_ATTENTION,
        ActionPriority::Low => COLOR_TEXT_DIMMED,
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 1).collect();
        format!("{}~", truncated)
    }
}
