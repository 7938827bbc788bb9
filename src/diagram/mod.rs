//! Diagram render adapter.
//!
//! Each visualization of the displayed task owns a [`DiagramSlot`]. A slot
//! moves `Uninitialized → Initializing → Ready → {Rendered | Errored}` and
//! re-enters `Initializing`/`Ready` whenever its content changes. Every
//! content change bumps the slot generation and hands out a
//! [`RenderTicket`]; a finished render is committed only when its ticket
//! generation is still current, so the newest content wins no matter
//! which render finishes last.
//!
//! Renderer initialization is guarded by [`RendererInit`], shared by all
//! slots of the process. The theme is picked when initialization first
//! succeeds and is not revisited afterwards.

pub mod text;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::{dlog_debug, dlog_warn};

pub use text::TextDiagramRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramTheme {
    /// Light terminal background.
    Default,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Failed to initialize diagram rendering: {0}")]
    Init(String),
    #[error("Failed to render diagram: {0}")]
    Render(String),
}

/// Output of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub lines: Vec<String>,
    pub theme: DiagramTheme,
}

/// External renderer turning a diagram description into display lines.
pub trait DiagramRenderer: Send + Sync {
    fn initialize(&self, theme: DiagramTheme) -> Result<(), String>;
    fn render(&self, source: &str, theme: DiagramTheme) -> Result<Vec<String>, String>;
}

/// Init-once guard for the diagram renderer.
///
/// One instance lives for the whole process and is shared through `Arc`.
/// A failed initialization leaves the guard uninitialized so the next
/// render tries again.
#[derive(Debug, Default)]
pub struct RendererInit {
    theme: Mutex<Option<DiagramTheme>>,
}

impl RendererInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.theme().is_some()
    }

    /// Theme chosen at initialization, if it happened.
    pub fn theme(&self) -> Option<DiagramTheme> {
        *self.theme.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Initialize the renderer unless that already happened, returning the
    /// theme in effect. `ambient` is only consulted on the first success.
    pub fn ensure(
        &self,
        renderer: &dyn DiagramRenderer,
        ambient: DiagramTheme,
    ) -> Result<DiagramTheme, RenderError> {
        let mut guard = self.theme.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(theme) = *guard {
            return Ok(theme);
        }
        renderer.initialize(ambient).map_err(RenderError::Init)?;
        dlog_debug!("Diagram renderer initialized theme={:?}", ambient);
        *guard = Some(ambient);
        Ok(ambient)
    }

    /// Forget the initialization. Tests use this between cases.
    pub fn reset(&self) {
        *self.theme.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramPhase {
    Uninitialized,
    /// Waiting for the renderer to be initialized, then rendered.
    Initializing,
    /// Renderer is up; the render for the current content is pending.
    Ready,
    Rendered(RenderedDiagram),
    /// Human-readable message plus the raw source to show instead.
    Errored { message: String, source: String },
}

/// Identity of one render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTicket {
    pub generation: u64,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct DiagramSlot {
    content: String,
    generation: u64,
    phase: DiagramPhase,
}

impl Default for DiagramSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramSlot {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            generation: 0,
            phase: DiagramPhase::Uninitialized,
        }
    }

    pub fn phase(&self) -> &DiagramPhase {
        &self.phase
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Assign content. Returns a ticket when a render must be scheduled.
    ///
    /// Unchanged content is a no-op. Blank content settles as an error
    /// without rendering.
    pub fn set_content(&mut self, content: &str, init: &RendererInit) -> Option<RenderTicket> {
        if self.phase != DiagramPhase::Uninitialized && self.content == content {
            return None;
        }
        self.generation += 1;
        self.content = content.to_string();

        if content.trim().is_empty() {
            self.phase = DiagramPhase::Errored {
                message: RenderError::Render("diagram source is empty".to_string()).to_string(),
                source: self.content.clone(),
            };
            return None;
        }

        self.phase = if init.is_initialized() {
            DiagramPhase::Ready
        } else {
            DiagramPhase::Initializing
        };
        Some(RenderTicket {
            generation: self.generation,
            content: self.content.clone(),
        })
    }

    /// Commit a finished render. Returns false (and changes nothing) when
    /// the ticket was superseded or the slot already settled.
    pub fn commit(
        &mut self,
        generation: u64,
        outcome: Result<RenderedDiagram, RenderError>,
    ) -> bool {
        if generation != self.generation {
            dlog_debug!(
                "Dropping stale diagram render generation={} current={}",
                generation,
                self.generation
            );
            return false;
        }
        if !matches!(self.phase, DiagramPhase::Initializing | DiagramPhase::Ready) {
            return false;
        }
        self.phase = match outcome {
            Ok(rendered) => DiagramPhase::Rendered(rendered),
            Err(err) => {
                dlog_warn!("Diagram render failed: {}", err);
                DiagramPhase::Errored {
                    message: err.to_string(),
                    source: self.content.clone(),
                }
            }
        };
        true
    }
}

/// Slots for the visualizations currently on screen, keyed by position.
///
/// Slots are never dropped, only hidden, so a slot's generation keeps
/// counting up across task switches and a late result from an earlier
/// task can never match a newer ticket. Hidden slots still accept results
/// for their current ticket; showing the same content again reuses them.
#[derive(Debug, Clone, Default)]
pub struct DiagramBoard {
    slots: Vec<DiagramSlot>,
    active: usize,
}

impl DiagramBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the board at a new list of diagram sources. Returns the
    /// renders to schedule as `(slot index, ticket)`.
    pub fn sync(&mut self, contents: &[&str], init: &RendererInit) -> Vec<(usize, RenderTicket)> {
        while self.slots.len() < contents.len() {
            self.slots.push(DiagramSlot::new());
        }
        self.active = contents.len();
        contents
            .iter()
            .enumerate()
            .filter_map(|(index, content)| {
                self.slots[index]
                    .set_content(content, init)
                    .map(|ticket| (index, ticket))
            })
            .collect()
    }

    pub fn commit(
        &mut self,
        index: usize,
        generation: u64,
        outcome: Result<RenderedDiagram, RenderError>,
    ) -> bool {
        self.slots
            .get_mut(index)
            .map(|slot| slot.commit(generation, outcome))
            .unwrap_or(false)
    }

    /// Currently visible slots.
    pub fn slots(&self) -> &[DiagramSlot] {
        &self.slots[..self.active]
    }

    pub fn slot(&self, index: usize) -> Option<&DiagramSlot> {
        self.slots().get(index)
    }
}

/// Run one render after yielding to the scheduler at least once.
///
/// Initialization and render failures, including renderer panics, come
/// back as `RenderError`; this never fails outright.
pub async fn render_deferred(
    renderer: Arc<dyn DiagramRenderer>,
    init: Arc<RendererInit>,
    ambient: DiagramTheme,
    ticket: RenderTicket,
) -> (u64, Result<RenderedDiagram, RenderError>) {
    tokio::task::yield_now().await;

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let theme = init.ensure(renderer.as_ref(), ambient)?;
        renderer
            .render(&ticket.content, theme)
            .map(|lines| RenderedDiagram { lines, theme })
            .map_err(RenderError::Render)
    }))
    .unwrap_or_else(|_| Err(RenderError::Render("renderer panicked".to_string())));

    (ticket.generation, outcome)
}
