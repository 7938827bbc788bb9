use std::io::{self, stdout, Stdout};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, TryRecvError};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;

use taskdeck::aggregate::fetch_tasks;
use taskdeck::app::LogicThread;
use taskdeck::config::{Config, ThemeSetting};
use taskdeck::diagram::{render_deferred, DiagramPhase, RenderTicket, RendererInit, TextDiagramRenderer};
use taskdeck::markdown::to_plain;
use taskdeck::present::{category_label, task_card, task_view, Block, DisplayPlan};
use taskdeck::render::RenderState;
use taskdeck::service::{self, TaskDataService};
use taskdeck::templates::{display_name, fetch_templates, refresh_templates, RefreshOutcome};
use taskdeck::{dlog, ui, Error, Result};

const FRAME_DURATION: Duration = Duration::from_micros(16_666); // 60fps

/// taskdeck - browse task results and task templates
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    TASKDECK_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Task data service base URL
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Read tasks and templates from a local directory instead
    #[arg(long, conflicts_with = "url")]
    pub dir: Option<String>,

    /// Diagram theme: auto, light or dark
    #[arg(long)]
    pub theme: Option<String>,

    /// Enable debug logging (writes to ~/.taskdeck/taskdeck.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print task categories and their tasks
    List,

    /// Print the results of one task
    Show {
        /// Run id of the task
        run_id: String,
    },

    /// Print the available task templates
    Templates,

    /// Regenerate templates on the backend and reload them
    RefreshTemplates,

    /// Store a task result read from a JSON file
    SaveResult {
        /// JSON file holding one task record
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    taskdeck::log::init(cli.debug);

    let config = apply_overrides(Config::load()?, &cli)?;

    match cli.command {
        Some(Command::List) => return run_headless(run_list(&config)),
        Some(Command::Show { run_id }) => return run_headless(run_show(&config, &run_id)),
        Some(Command::Templates) => return run_headless(run_templates(&config)),
        Some(Command::RefreshTemplates) => return run_headless(run_refresh(&config)),
        Some(Command::SaveResult { file }) => return run_headless(run_save(&config, &file)),
        None => {}
    }

    if cli.debug {
        dlog!("taskdeck starting (debug mode enabled)");
    } else {
        dlog!("taskdeck starting");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let (state_tx, state_rx) = crossbeam_channel::bounded::<RenderState>(1);

    let shutdown_clone = shutdown.clone();
    let logic_handle = thread::spawn(move || LogicThread::run(config, state_tx, shutdown_clone));

    let mut terminal = setup_terminal()?;
    let result = render_loop(&mut terminal, state_rx, &shutdown);

    shutdown.store(true, Ordering::SeqCst);
    let logic_result = logic_handle
        .join()
        .unwrap_or_else(|_| Err(Error::TaskJoin("logic thread panicked".to_string())));
    restore_terminal(&mut terminal)?;
    dlog!("taskdeck stopped");
    result.and(logic_result)
}

/// CLI flags take precedence over the config file.
fn apply_overrides(mut config: Config, cli: &Cli) -> Result<Config> {
    if let Some(url) = &cli.url {
        config.base_url = Some(url.clone());
        config.data_dir = None;
    }
    if let Some(dir) = &cli.dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(theme) = &cli.theme {
        config.theme = ThemeSetting::parse(theme)?;
    }
    Ok(config)
}

fn run_headless<F>(fut: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    Runtime::new()?.block_on(fut)
}

async fn run_list(config: &Config) -> Result<()> {
    let service = service::from_config(config)?;
    let tasks = fetch_tasks(service.as_ref()).await?;

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    for task_type in &tasks.custom_types {
        let records = tasks.tasks_of(task_type);
        println!("{} ({})", category_label(task_type), records.len());
        for record in records {
            let card = task_card(record);
            println!(
                "  {:<12} {:<32} {:<18} {}",
                card.short_run_id, card.task_name, card.status_label, card.created_at
            );
        }
        println!();
    }
    Ok(())
}

async fn run_show(config: &Config, run_id: &str) -> Result<()> {
    let service = service::from_config(config)?;
    let tasks = fetch_tasks(service.as_ref()).await?;
    let record = tasks
        .find(run_id)
        .ok_or_else(|| Error::TaskNotFound(run_id.to_string()))?;

    let view = task_view(record);
    let sources: Vec<String> = view
        .blocks
        .iter()
        .find_map(|block| match block {
            Block::Visualizations(list) => Some(list.iter().map(|v| v.content.clone()).collect()),
            _ => None,
        })
        .unwrap_or_default();

    let renderer = Arc::new(TextDiagramRenderer::new());
    let init = Arc::new(RendererInit::new());
    let theme = config.diagram_theme();
    let mut diagrams = Vec::with_capacity(sources.len());
    for (idx, content) in sources.into_iter().enumerate() {
        let ticket = RenderTicket {
            generation: idx as u64,
            content: content.clone(),
        };
        let (_, outcome) = render_deferred(renderer.clone(), init.clone(), theme, ticket).await;
        diagrams.push(match outcome {
            Ok(diagram) => DiagramPhase::Rendered(diagram),
            Err(e) => DiagramPhase::Errored {
                message: e.to_string(),
                source: content,
            },
        });
    }

    for line in to_plain(&ui::plan_lines(&DisplayPlan::Task(view), &diagrams)) {
        println!("{}", line);
    }
    Ok(())
}

async fn run_templates(config: &Config) -> Result<()> {
    let service = service::from_config(config)?;
    print_templates(service.as_ref()).await
}

async fn run_refresh(config: &Config) -> Result<()> {
    let service = service::from_config(config)?;
    let outcome = refresh_templates(service.as_ref()).await?;

    match &outcome {
        RefreshOutcome::Refreshed { file_count } => match file_count {
            Some(n) => println!("Refreshed {} templates", n),
            None => println!("Templates refreshed"),
        },
        RefreshOutcome::Rejected { error } => return Err(Error::Refresh(error.clone())),
        RefreshOutcome::Empty => println!("Template refresh returned nothing"),
    }

    if outcome.needs_refetch() {
        print_templates(service.as_ref()).await?;
    }
    Ok(())
}

async fn run_save(config: &Config, file: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(file).await?;
    let record: serde_json::Value = serde_json::from_str(&text)?;
    let service = service::from_config(config)?;
    let task_id = service.save_result(record).await?;
    println!("Saved {}", task_id);
    Ok(())
}

async fn print_templates(service: &dyn TaskDataService) -> Result<()> {
    let templates = fetch_templates(service).await?;
    if templates.is_empty() {
        println!("No templates.");
    }
    for key in templates.keys() {
        println!("{:<32} {}", display_name(key), key);
    }
    Ok(())
}

fn render_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: Receiver<RenderState>,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut state = RenderState::default();
    let mut last_version: u64 = 0;
    let mut last_frame = Instant::now();
    let mut dirty = true;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match state_rx.try_recv() {
            Ok(s) => {
                dirty = dirty || s.version != last_version;
                state = s;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        if last_frame.elapsed() < FRAME_DURATION {
            thread::sleep(Duration::from_micros(500));
            continue;
        }
        last_frame = Instant::now();

        if dirty {
            terminal.draw(|f| ui::draw(f, &state))?;
            last_version = state.version;
            dirty = false;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(disable_raw_mode()?)
}
