use std::{
    io::{self, Write},
    panic,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor::Show,
    execute,
    style::ResetColor,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use tracing::info;
use tuirealm::{
    PollStrategy,
    terminal::{CrosstermTerminalAdapter, TerminalBridge},
};

use taskboard::{
    app::App,
    cli::{self, RootCommand},
    db::Database,
    keybindings::Keybindings,
    logging::{init_logging, print_log_location},
    realm::init_application,
    settings::Settings,
    ui,
};

#[derive(Parser, Debug)]
#[command(
    name = "taskboard",
    about = "Terminal kanban board with To Do, In Progress and Done columns",
    version
)]
struct Cli {
    /// SQLite database file; overrides `database_path` from settings.toml
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<RootCommand>,
}

enum RunOutcome {
    Continue,
    Exit(i32),
}

static TERMINAL_RESTORED: AtomicBool = AtomicBool::new(false);

fn main() -> Result<()> {
    let log_path = match init_logging() {
        Ok(path) => Some(path),
        Err(err) => {
            eprintln!("warning: failed to initialize logging: {err:#}");
            None
        }
    };
    install_panic_hook(log_path.clone());

    match run_app() {
        Ok(RunOutcome::Continue) => {
            if let Some(path) = log_path.as_ref() {
                print_log_location(path);
            }
            Ok(())
        }
        Ok(RunOutcome::Exit(code)) => std::process::exit(code),
        Err(err) => {
            if let Some(path) = log_path.as_ref() {
                print_log_location(path);
            }
            Err(err)
        }
    }
}

fn run_app() -> Result<RunOutcome> {
    let cli = Cli::parse();
    let settings = Settings::load();
    let db_path = settings.resolve_database_path(cli.db.as_deref())?;

    if let Some(command) = cli.command {
        let code = cli::run(&db_path, command, cli.json, cli.quiet);
        return Ok(RunOutcome::Exit(code));
    }

    let db = Database::open(&db_path)?;
    info!(path = %db_path.display(), "opened task database");
    let mut app = App::new(db, Keybindings::from_config(&settings.keybindings));

    let _guard = TerminalGuard;
    let mut terminal = setup_terminal()?;
    let mut realm = init_application()?;

    let mut redraw = true;
    while !app.should_quit() {
        if redraw {
            terminal
                .draw(|frame| ui::render(frame, &app))
                .context("failed to render frame")?;
            redraw = false;
        }

        let messages = realm
            .tick(PollStrategy::Once)
            .context("failed to process tui-realm tick")?;

        for message in messages {
            app.update(message)?;
            redraw = true;
        }
    }

    let _ = terminal.disable_raw_mode();
    let _ = terminal.leave_alternate_screen();
    let _ = terminal.clear_screen();
    TERMINAL_RESTORED.store(true, Ordering::SeqCst);

    Ok(RunOutcome::Continue)
}

fn setup_terminal() -> Result<TerminalBridge<CrosstermTerminalAdapter>> {
    TERMINAL_RESTORED.store(false, Ordering::SeqCst);

    let mut terminal =
        TerminalBridge::new_crossterm().context("failed to initialize terminal bridge")?;

    terminal
        .enable_raw_mode()
        .context("failed to enable raw mode")?;
    terminal
        .enter_alternate_screen()
        .context("failed to enter alternate screen")?;

    Ok(terminal)
}

fn install_panic_hook(log_path: Option<PathBuf>) {
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        if let Some(path) = log_path.as_ref() {
            print_log_location(path);
        }
        previous_hook(panic_info);
    }));
}

fn restore_terminal() -> Result<()> {
    if TERMINAL_RESTORED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let _ = disable_raw_mode();

    let mut stderr = io::stderr();
    let _ = execute!(stderr, LeaveAlternateScreen, Show, ResetColor);
    let _ = stderr.flush();

    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = restore_terminal();
    }
}
