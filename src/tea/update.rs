//! Pure update function for the TEA (The Elm Architecture) pattern.
//!
//! The update function takes a model and a message, mutates the model,
//! and returns a list of commands to execute.

use crossterm::event::{KeyCode, KeyEvent};

use crate::nav::Category;
use crate::present::DisplayPlan;
use crate::templates::RefreshOutcome;
use crate::{dlog, dlog_debug, dlog_warn, Error};

use super::command::Command;
use super::message::Message;
use super::model::{Model, Notification, NotificationLevel};

const PAGE_SCROLL: u16 = 10;

/// Helper to set an error notification and mark model as dirty.
fn set_error(model: &mut Model, message: String) {
    dlog_warn!("UI Error: {}", message);
    model.notification = Some(Notification {
        level: NotificationLevel::Error,
        message,
    });
    model.dirty = true;
}

fn set_info(model: &mut Model, message: String) {
    model.notification = Some(Notification {
        level: NotificationLevel::Info,
        message,
    });
    model.dirty = true;
}

/// Pure update function: Model + Message → Commands
///
/// All I/O happens via the returned Commands. Every call ends by lining
/// the diagram slots up with the displayed task, which may add
/// `RenderDiagram` commands.
pub fn update(model: &mut Model, msg: Message) -> Vec<Command> {
    let mut cmds = Vec::new();

    match msg {
        Message::Key(key) => {
            model.notification = None; // Clear notification on any key press
            model.dirty = true;
            update_key(model, key, &mut cmds);
        }

        Message::Resize(_, _) => {
            model.dirty = true;
        }

        Message::TasksLoaded(collection) => {
            model.tasks_in_flight = model.tasks_in_flight.saturating_sub(1);
            dlog!(
                "Message::TasksLoaded tasks={} custom_types={:?}",
                collection.all_tasks.len(),
                collection.custom_types
            );
            let previous_types = std::mem::take(&mut model.tasks.custom_types);
            model.tasks = collection;
            model.nav.on_tasks_replaced(&previous_types, &model.tasks);
            model.tasks_error = None;
            model.dirty = true;
            request_initial_templates(model, &mut cmds);
        }

        Message::TasksLoadFailed(err) => {
            model.tasks_in_flight = model.tasks_in_flight.saturating_sub(1);
            dlog_warn!("Message::TasksLoadFailed err={}", err);
            model.tasks_error = Some(err.clone());
            set_error(model, format!("Failed to load tasks: {}", err));
            request_initial_templates(model, &mut cmds);
        }

        Message::TemplatesLoaded(collection) => {
            model.templates_in_flight = model.templates_in_flight.saturating_sub(1);
            dlog!("Message::TemplatesLoaded templates={}", collection.len());
            if let Ok(loaded) = model.templates.apply_fetch(Ok(collection)) {
                model.nav.on_templates_loaded(loaded);
            }
            model.dirty = true;
        }

        Message::TemplatesLoadFailed(err) => {
            model.templates_in_flight = model.templates_in_flight.saturating_sub(1);
            dlog_warn!("Message::TemplatesLoadFailed err={}", err);
            let result = model.templates.apply_fetch(Err(Error::Fetch(err))).map(|_| ());
            if let Err(e) = result {
                set_error(model, format!("Failed to load templates: {}", e));
            }
        }

        Message::TemplatesRefreshed(outcome) => {
            model.refreshing = false;
            dlog!("Message::TemplatesRefreshed outcome={:?}", outcome);
            match &outcome {
                RefreshOutcome::Refreshed { file_count } => {
                    let message = match file_count {
                        Some(n) => format!("Refreshed {} templates", n),
                        None => "Templates refreshed".to_string(),
                    };
                    set_info(model, message);
                }
                RefreshOutcome::Rejected { error } => {
                    set_error(model, format!("Template refresh failed: {}", error));
                }
                RefreshOutcome::Empty => {
                    set_info(model, "Template refresh returned nothing".to_string());
                }
            }
            if outcome.needs_refetch() {
                cmds.extend(model.request_templates());
            }
        }

        Message::TemplatesRefreshFailed(err) => {
            model.refreshing = false;
            set_error(model, format!("Template refresh failed: {}", err));
        }

        Message::DiagramRendered {
            index,
            generation,
            outcome,
        } => {
            if model.diagrams.commit(index, generation, outcome) {
                model.dirty = true;
            }
        }

        Message::TemplateCopied(key) => {
            dlog_debug!("Message::TemplateCopied key={}", key);
            set_info(model, format!("Copied {} to clipboard", key));
        }

        Message::TemplateCopyFailed(err) => {
            set_error(model, format!("Copy failed: {}", err));
        }
    }

    sync_diagrams(model, &mut cmds);
    cmds
}

fn update_key(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    match key.code {
        KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => {
            if model.nav.step_category(1, &model.tasks) {
                model.scroll = 0;
            }
        }

        KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => {
            if model.nav.step_category(-1, &model.tasks) {
                model.scroll = 0;
            }
        }

        KeyCode::Char('j') | KeyCode::Down => step_selection(model, 1),
        KeyCode::Char('k') | KeyCode::Up => step_selection(model, -1),

        KeyCode::PageDown | KeyCode::Char('J') => {
            model.scroll = model.scroll.saturating_add(PAGE_SCROLL);
        }

        KeyCode::PageUp | KeyCode::Char('K') => {
            model.scroll = model.scroll.saturating_sub(PAGE_SCROLL);
        }

        KeyCode::Char('r') => {
            cmds.extend(model.request_tasks());
        }

        KeyCode::Char('R') => {
            if model.refreshing {
                dlog_debug!("Template refresh already running");
            } else {
                model.refreshing = true;
                cmds.push(Command::RefreshTemplates);
            }
        }

        KeyCode::Char('c') => match model.plan() {
            DisplayPlan::Template(view) => cmds.push(Command::CopyToClipboard {
                key: view.key,
                content: view.content,
            }),
            _ => set_error(model, "Select a template to copy".to_string()),
        },

        KeyCode::Char('q') | KeyCode::Esc => {
            cmds.push(Command::Quit);
        }

        KeyCode::Char('?') => {
            model.show_keymap = !model.show_keymap;
        }

        _ => {}
    }
}

fn step_selection(model: &mut Model, delta: isize) {
    let changed = if *model.nav.active_category() == Category::Templates {
        model.nav.step_template(delta, model.templates.collection())
    } else {
        model.nav.step_task(delta, &model.tasks)
    };
    if changed {
        model.scroll = 0;
    }
}

fn request_initial_templates(model: &mut Model, cmds: &mut Vec<Command>) {
    if !model.templates_requested {
        cmds.extend(model.request_templates());
    }
}

/// Point the diagram slots at the displayed task's visualizations.
fn sync_diagrams(model: &mut Model, cmds: &mut Vec<Command>) {
    let sources = model.diagram_sources();
    let refs: Vec<&str> = sources.iter().map(String::as_str).collect();
    for (index, ticket) in model.diagrams.sync(&refs, &model.renderer_init) {
        dlog_debug!("Scheduling diagram render index={} generation={}", index, ticket.generation);
        cmds.push(Command::RenderDiagram { index, ticket });
        model.dirty = true;
    }
}
