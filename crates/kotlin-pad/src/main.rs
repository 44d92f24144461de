//! kpad - Terminal scratchpad for Kotlin scripts
//!
//! Usage:
//!   kpad                    # Start with the sample script
//!   kpad hello.kts          # Edit a file (Ctrl+S saves it)
//!
//! Keys:
//!   Ctrl+R, F5              # Run the buffer
//!   Ctrl+L                  # Clear the console
//!   Ctrl+S                  # Save
//!   Ctrl+Q, Ctrl+C          # Quit

use clap::Parser as ClapParser;
use kotlin_pad::app::App;
use kotlin_pad::config::Config;
use kotlin_pad::engine::KotlinEngine;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

#[derive(ClapParser)]
#[command(name = "kpad")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal scratchpad for Kotlin scripts", long_about = None)]
struct Args {
    /// Kotlin script to edit (starts from a sample script if not specified)
    file: Option<PathBuf>,

    /// Config file (default: ~/.config/kpad/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (default: ~/.local/share/kpad/kpad.log)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn default_log_path() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".local/share/kpad/kpad.log"))
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create log directory {}: {}", parent.display(), e))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?;
    let directive = "kotlin_pad=info"
        .parse::<Directive>()
        .map_err(|e| format!("Invalid log directive: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(args: Args) -> Result<(), String> {
    let config = Config::load(args.config.as_deref()).map_err(|e| e.to_string())?;

    match args.log_file.or_else(default_log_path) {
        Some(path) => {
            if let Err(e) = init_logging(&path) {
                eprintln!("Warning: {}", e);
            }
        }
        None => eprintln!("Warning: no home directory, logging disabled"),
    }
    info!(timeout_secs = config.engine.timeout_secs, compiler = %config.engine.compiler, "starting kpad");

    let engine = Arc::new(KotlinEngine::new(config.engine.clone()));
    let app = match args.file {
        Some(path) => App::with_file(engine, &config, path)?,
        None => App::new(engine, &config),
    };

    kotlin_pad::run(app).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
