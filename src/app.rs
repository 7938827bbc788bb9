use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::aggregate::fetch_tasks;
use crate::clipboard::copy_to_clipboard;
use crate::config::Config;
use crate::diagram::{render_deferred, DiagramRenderer, DiagramTheme, RendererInit, TextDiagramRenderer};
use crate::render::RenderState;
use crate::service::{self, TaskDataService};
use crate::tea::{update, Command, Message, Model};
use crate::templates::{fetch_templates, refresh_templates};
use crate::util::{blocking, with_timeout};
use crate::{dlog, dlog_debug, dlog_error, Result};

const MAX_BG_MESSAGES: usize = 50;

pub struct LogicThread;

impl LogicThread {
    pub fn run(config: Config, state_tx: Sender<RenderState>, shutdown: Arc<AtomicBool>) -> Result<()> {
        Runtime::new()?.block_on(Self::run_async(config, state_tx, shutdown))
    }

    async fn run_async(
        config: Config,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        dlog_debug!(
            "LogicThread::run_async source={} fetch_policy={:?}",
            config
                .effective_data_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| config.effective_base_url().to_string()),
            config.fetch_policy
        );

        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Message>();
        let renderer_init = Arc::new(RendererInit::new());
        let effects = Effects {
            service: service::from_config(&config)?,
            renderer: Arc::new(TextDiagramRenderer::new()),
            renderer_init: renderer_init.clone(),
            ambient_theme: config.diagram_theme(),
            timeout: config.request_timeout(),
            msg_tx,
            cancel: CancellationToken::new(),
        };
        let mut model = Model::new(config, renderer_init);

        for cmd in model.init() {
            execute_command(cmd, &effects);
        }
        if send_state(&state_tx, &model) {
            model.dirty = false;
        }

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Keyboard input (priority)
            while event::poll(Duration::ZERO)? {
                let msg = match event::read()? {
                    Event::Key(key) => Message::Key(key),
                    Event::Resize(w, h) => Message::Resize(w, h),
                    _ => continue,
                };
                if Self::dispatch(&mut model, msg, &effects) {
                    shutdown.store(true, Ordering::Relaxed);
                    effects.cancel.cancel();
                    return Ok(());
                }
                if model.dirty && send_state(&state_tx, &model) {
                    model.dirty = false;
                }
            }

            // Background messages (bounded)
            for _ in 0..MAX_BG_MESSAGES {
                let Ok(msg) = msg_rx.try_recv() else { break };
                if Self::dispatch(&mut model, msg, &effects) {
                    shutdown.store(true, Ordering::Relaxed);
                    effects.cancel.cancel();
                    return Ok(());
                }
            }

            // A full channel keeps the model dirty; the next pass retries.
            if model.dirty && send_state(&state_tx, &model) {
                model.dirty = false;
            }

            tokio::time::sleep(Duration::from_micros(500)).await;
        }

        effects.cancel.cancel();
        Ok(())
    }

    /// Run one message through `update` and execute its commands. Returns
    /// true when the app should quit.
    fn dispatch(model: &mut Model, msg: Message, effects: &Effects) -> bool {
        update(model, msg)
            .into_iter()
            .fold(false, |quit, cmd| execute_command(cmd, effects) || quit)
    }
}

/// Shared handles for spawned side effects.
struct Effects {
    service: Arc<dyn TaskDataService>,
    renderer: Arc<dyn DiagramRenderer>,
    renderer_init: Arc<RendererInit>,
    ambient_theme: DiagramTheme,
    timeout: Duration,
    msg_tx: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

impl Effects {
    /// Spawn work that reports back with one message. Abandoned on shutdown.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = Message> + Send + 'static,
    {
        let tx = self.msg_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                msg = fut => {
                    let _ = tx.send(msg);
                }
            }
        });
    }
}

fn execute_command(cmd: Command, effects: &Effects) -> bool {
    match cmd {
        Command::FetchTasks => {
            dlog_debug!("Command::FetchTasks");
            let service = effects.service.clone();
            let limit = effects.timeout;
            effects.spawn(async move {
                match with_timeout(limit, fetch_tasks(service.as_ref())).await {
                    Ok(collection) => Message::TasksLoaded(collection),
                    Err(e) => {
                        dlog_error!("Task fetch failed: {}", e);
                        Message::TasksLoadFailed(e.to_string())
                    }
                }
            });
        }

        Command::FetchTemplates => {
            dlog_debug!("Command::FetchTemplates");
            let service = effects.service.clone();
            let limit = effects.timeout;
            effects.spawn(async move {
                match with_timeout(limit, fetch_templates(service.as_ref())).await {
                    Ok(collection) => Message::TemplatesLoaded(collection),
                    Err(e) => {
                        dlog_error!("Template fetch failed: {}", e);
                        Message::TemplatesLoadFailed(e.to_string())
                    }
                }
            });
        }

        Command::RefreshTemplates => {
            dlog_debug!("Command::RefreshTemplates");
            let service = effects.service.clone();
            let limit = effects.timeout;
            effects.spawn(async move {
                match with_timeout(limit, refresh_templates(service.as_ref())).await {
                    Ok(outcome) => Message::TemplatesRefreshed(outcome),
                    Err(e) => {
                        dlog_error!("Template refresh failed: {}", e);
                        Message::TemplatesRefreshFailed(e.to_string())
                    }
                }
            });
        }

        Command::RenderDiagram { index, ticket } => {
            let renderer = effects.renderer.clone();
            let init = effects.renderer_init.clone();
            let theme = effects.ambient_theme;
            effects.spawn(async move {
                let (generation, outcome) = render_deferred(renderer, init, theme, ticket).await;
                Message::DiagramRendered {
                    index,
                    generation,
                    outcome,
                }
            });
        }

        Command::CopyToClipboard { key, content } => {
            dlog_debug!("Command::CopyToClipboard key={} bytes={}", key, content.len());
            effects.spawn(async move {
                match blocking(move || copy_to_clipboard(&content)).await {
                    Ok(()) => Message::TemplateCopied(key),
                    Err(e) => Message::TemplateCopyFailed(e.to_string()),
                }
            });
        }

        Command::Quit => {
            dlog!("Command::Quit");
            return true;
        }
    }

    false
}

/// Offer a snapshot to the render thread. Returns false when the channel
/// still holds an undrawn frame.
fn send_state(state_tx: &Sender<RenderState>, model: &Model) -> bool {
    state_tx.try_send(model.snapshot()).is_ok()
}
