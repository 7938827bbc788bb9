//! Messages for the TEA (The Elm Architecture) pattern.
//!
//! Messages are inputs to the update function - they come from keyboard
//! events or from command completion callbacks.

use crossterm::event::KeyEvent;

use crate::aggregate::TaskCollection;
use crate::diagram::{RenderError, RenderedDiagram};
use crate::templates::{RefreshOutcome, TemplateCollection};

/// Input messages to the update function.
#[derive(Debug)]
pub enum Message {
    // Keyboard/terminal events
    Key(KeyEvent),
    Resize(u16, u16),

    // Command completion callbacks
    TasksLoaded(TaskCollection),
    TasksLoadFailed(String),
    TemplatesLoaded(TemplateCollection),
    TemplatesLoadFailed(String),
    TemplatesRefreshed(RefreshOutcome),
    TemplatesRefreshFailed(String),
    DiagramRendered {
        index: usize,
        generation: u64,
        outcome: Result<RenderedDiagram, RenderError>,
    },
    TemplateCopied(String),
    TemplateCopyFailed(String),
}
