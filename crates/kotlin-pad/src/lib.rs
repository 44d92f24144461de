//! Terminal scratchpad for Kotlin scripts
//!
//! Provides a stacked terminal interface with:
//! - An editor whose highlighted backdrop tracks the input surface exactly
//! - A console that streams `kotlinc -script` output while the script runs
//! - One run at a time; further submissions are rejected until it finishes

pub mod app;
pub mod config;
pub mod editor;
pub mod engine;
pub mod keys;
pub mod session;
pub mod ui;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, EventStream},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, stdout};
use tracing::info;

/// Run the TUI until the user quits
pub async fn run(app: app::App) -> Result<(), String> {
    // Setup terminal
    enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .map_err(|e| format!("Failed to enter alternate screen: {}", e))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("Failed to create terminal: {}", e))?;

    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    let _ = disable_raw_mode();
    let _ = execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    );
    let _ = terminal.show_cursor();

    result.map_err(|e| format!("Application error: {}", e))
}

/// Internal run loop: terminal events and session progress, one at a time
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: app::App,
) -> io::Result<()> {
    let mut events = EventStream::new();
    info!("event loop started");

    loop {
        terminal.draw(|frame| app.render(frame))?;

        if app.should_quit {
            break;
        }

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => app.handle_event(event).await,
                Some(Err(e)) => return Err(e),
                None => break,
            },
            update = app.controller.pump() => app.on_session_update(update),
        }
    }

    info!("event loop finished");
    Ok(())
}
