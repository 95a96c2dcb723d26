// src/main.rs

mod cache;
mod cli;
mod contributors;
mod engine;
mod error;
mod headless;
mod history;
mod input;
mod model;
mod playback;
mod runtime;
mod terminal;
mod view;

use clap::Parser;
use cli::{Args, Session};
use engine::{Engine, EngineConfig, Mode};
use error::AppError;
use headless::Headless;
use history::GitSource;
use indicatif::ProgressBar;
use runtime::Runtime;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;
use terminal::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use view::Context;

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(args.log_file.as_deref(), args.headless) {
        eprintln!("Error opening log file: {}", e);
        return ExitCode::FAILURE;
    }

    let session = match args.into_session() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let start_time = Instant::now();
    let engine = match play(&session) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(elapsed = ?start_time.elapsed(), cached = engine.cache().len(), "session finished");

    if let Mode::Unavailable { reason } = engine.mode() {
        eprintln!("Error loading history: {}", reason);
        return ExitCode::FAILURE;
    }
    if session.headless {
        println!(
            "Played {} of {} commits on {} in {:.2?}.",
            engine.cursor().map_or(0, |c| c + 1),
            engine.history().len(),
            session.branch,
            start_time.elapsed()
        );
    }
    ExitCode::SUCCESS
}

fn play(session: &Session) -> Result<Engine, AppError> {
    let source = GitSource::new(&session.root, &session.branch, session.max_count);
    let config = EngineConfig {
        initial_author: session.author.clone(),
        autoplay: session.autoplay,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config);
    let mut runtime = Runtime::new(source);

    if session.headless {
        let mut frontend = Headless::new(io::stdout(), ProgressBar::new(0));
        runtime.run(&mut engine, &mut frontend)?;
    } else {
        let context = Context {
            repo: session.root.display().to_string(),
            branch: session.branch.clone(),
        };
        let mut frontend = Terminal::enter(context)?;
        terminal::spawn_input(runtime.sender());
        runtime.run(&mut engine, &mut frontend)?;
    }
    Ok(engine)
}

/// Logs go to `log_file` when given. Without one, only headless runs log,
/// since the interactive view owns the terminal.
fn init_logging(log_file: Option<&Path>, headless: bool) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None if headless => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("warn"))
                .with_writer(io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}
