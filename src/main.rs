mod app;
mod bootstrap;
mod entry;
mod error;
mod info;
mod model;
mod msg;
mod resource;
mod sequencer;
mod splash;
mod terminal;

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::App;
use bootstrap::{
    INSTALLER_STEM, InstallerLauncher, LaunchOptions, PackageManager, Pip, SpawnPolicy,
};
use entry::PythonEntry;
use info::ProgramInfo;
use model::config::{self, Settings};
use model::launch::LaunchConfig;
use msg::Msg;
use resource::ResourceArchive;
use sequencer::Sequencer;
use splash::PySideToolkit;
use terminal::{CrosstermMode, with_terminal_mode};

const INSTALL_LOG: &str = "install.log";

#[derive(Parser)]
#[command(name = "preflight", version, about = "Install what a Python program needs, then run it")]
struct Cli {
    /// Program directory or packed .pyz (default: next to this executable)
    #[arg(long, global = true, value_name = "PATH")]
    app: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check requirements, install the missing ones, run the program (default)
    Run,
    /// Ask for confirmation and install the given packages
    Install {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Print program name, description, license and notices
    Info,
}

fn main() {
    // Initialize logging to file (never stdout)
    let guard = match init_logging() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("preflight: logging disabled: {e:#}");
            None
        }
    };

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("preflight error: {e:?}");
            1
        }
    };

    tracing::info!(code, "preflight exiting");
    drop(guard);
    std::process::exit(code);
}

fn init_logging() -> Result<WorkerGuard> {
    let log_dir = config::data_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "preflight.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("preflight=info"));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn run() -> Result<i32> {
    let settings = Settings::load()?;

    // The staged copy of this binary is the installer.
    let mut args = std::env::args_os();
    if args.next().as_deref().is_some_and(is_installer_name) {
        let packages = args.map(|arg| arg.to_string_lossy().into_owned()).collect();
        return run_installer(&settings, packages);
    }

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_launch(&settings, cli.app.as_deref()),
        Commands::Install { packages } => run_installer(&settings, packages),
        Commands::Info => show_info(&settings, cli.app.as_deref()),
    }
}

fn is_installer_name(arg0: &OsStr) -> bool {
    Path::new(arg0)
        .file_stem()
        .is_some_and(|stem| stem == INSTALLER_STEM)
}

fn resolve_program(settings: &Settings, app: Option<&Path>) -> Result<ResourceArchive> {
    let explicit = app.map(Path::to_path_buf).or_else(|| settings.app_path());
    let archive = ResourceArchive::resolve(explicit.as_deref())?;
    tracing::info!(
        program = %archive.root().display(),
        packed = archive.is_packed(),
        "resolved program"
    );
    Ok(archive)
}

fn run_launch(settings: &Settings, app: Option<&Path>) -> Result<i32> {
    let archive = resolve_program(settings, app)?;
    let config = LaunchConfig::load(&archive)?;

    let policy = SpawnPolicy::detect();
    let interpreter = settings.interpreter();
    let interpreter_info = interpreter.query(policy)?;
    tracing::info!(%interpreter, version = %interpreter_info, "interpreter ready");

    let pip = Pip::new(interpreter.clone(), policy);
    let launcher = InstallerLauncher::new(
        &archive,
        &pip,
        &interpreter,
        policy,
        config.installer_source(),
        LaunchOptions::from_settings(settings),
    );
    let entry = PythonEntry::new(
        interpreter.clone(),
        policy,
        archive.root(),
        &config.main_module,
        &config.main_func,
    );
    let toolkit = PySideToolkit::new(interpreter.clone(), policy, &config.toolkit);

    Sequencer::new(&archive, &launcher, &entry, &toolkit).run(&config, &interpreter_info)
}

fn show_info(settings: &Settings, app: Option<&Path>) -> Result<i32> {
    let archive = resolve_program(settings, app)?;
    print!("{}", ProgramInfo::load(&archive)?);
    Ok(0)
}

fn run_installer(settings: &Settings, packages: Vec<String>) -> Result<i32> {
    if packages.is_empty() {
        return Ok(0);
    }
    tracing::info!(?packages, "installer started");

    let log_dir = config::data_dir();
    std::fs::create_dir_all(&log_dir)?;
    let pip = Pip::new(settings.interpreter(), SpawnPolicy::detect());

    install_interactively(&pip, packages, settings, log_dir.join(INSTALL_LOG))
}

fn install_interactively(
    manager: &dyn PackageManager,
    packages: Vec<String>,
    settings: &Settings,
    log_path: PathBuf,
) -> Result<i32> {
    let mut app = App::new(packages, manager, settings.installer.wrap_margin, Some(log_path));
    let interval = settings.poll_interval();

    with_terminal_mode(&mut CrosstermMode, || {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        drive(&mut terminal, &mut app, interval)
    })
}

/// Draw, wait for input until the next tick is due, repeat until done.
fn drive<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, interval: Duration) -> Result<i32> {
    let mut last_tick = Instant::now();

    // ── Main event loop ──
    loop {
        terminal.draw(|f| app.view(f))?;
        if let Some(status) = app.exit_status() {
            return Ok(status);
        }

        let timeout = interval.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            let msg = match event::read()? {
                Event::Key(k) => Some(Msg::Key(k)),
                Event::Resize(w, h) => Some(Msg::Resize(w, h)),
                _ => None,
            };
            if let Some(msg) = msg {
                app.update(msg)?;
            }
        }

        if last_tick.elapsed() >= interval {
            app.update(Msg::Tick)?;
            last_tick = Instant::now();
        }
    }
}
