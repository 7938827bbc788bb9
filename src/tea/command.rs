//! Commands for the TEA (The Elm Architecture) pattern.
//!
//! Commands are outputs from the update function - they represent side effects
//! to be executed by the runtime.

use crate::diagram::RenderTicket;

/// Output commands from the update function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Task data service calls (spawn async tasks)
    FetchTasks,
    FetchTemplates,
    RefreshTemplates,

    // Deferred diagram render for one visualization slot
    RenderDiagram {
        index: usize,
        ticket: RenderTicket,
    },

    // Copy raw template text via OSC 52
    CopyToClipboard {
        key: String,
        content: String,
    },

    // App lifecycle
    Quit,
}
