//! TUI Application
//!
//! Main application state: the dual-layer editor, the execution session
//! and the status bar. Key and mouse events are routed here by the event
//! loop in `lib.rs`; the backdrop never sees them.

use crate::config::Config;
use crate::editor::{EditCommand, Editor, Viewport};
use crate::engine::ExecutionEngine;
use crate::keys::{KeyAction, convert_key};
use crate::session::{ExecutionController, Outcome, Phase, SessionUpdate};
use crate::ui::console_pane::ConsolePane;
use crate::ui::editor_pane::EditorPane;
use crate::ui::highlight::Theme;
use crate::ui::layout::{ComputedLayout, LayoutConfig, StatusContent};
use crossterm::event::{Event, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Position, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Buffer contents for a fresh scratchpad
pub const SAMPLE_SCRIPT: &str = "println(\"Wake up.\")\nThread.sleep(1000)\nprintln(\"Time to die.\")";

/// Lines moved per mouse wheel notch
const WHEEL_LINES: i32 = 3;

/// Main application state
pub struct App {
    pub editor: Editor,
    pub controller: ExecutionController,
    pub layout_config: LayoutConfig,
    pub theme: Theme,
    /// Current filename (display name)
    pub filename: String,
    /// Where Ctrl+S writes, if a file was given
    pub file_path: Option<PathBuf>,
    pub should_quit: bool,
    /// Status message (clears after next key)
    pub status_message: Option<String>,
    layout: ComputedLayout,
}

impl App {
    /// Create a scratchpad seeded with the sample script
    pub fn new(engine: Arc<dyn ExecutionEngine>, config: &Config) -> Self {
        Self {
            editor: Editor::new(SAMPLE_SCRIPT, config.editor.tab_width),
            controller: ExecutionController::new(engine),
            layout_config: config.layout.clone(),
            theme: Theme::default(),
            filename: "(scratch)".to_string(),
            file_path: None,
            should_quit: false,
            status_message: None,
            layout: ComputedLayout::default(),
        }
    }

    /// Create application editing `path`. A missing file starts from the
    /// sample script and is created on first save.
    pub fn with_file(
        engine: Arc<dyn ExecutionEngine>,
        config: &Config,
        path: PathBuf,
    ) -> Result<Self, String> {
        let content = if path.exists() {
            fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?
        } else {
            SAMPLE_SCRIPT.to_string()
        };

        let mut app = Self::new(engine, config);
        app.editor.on_text_change(content);
        app.filename = display_name(&path);
        app.file_path = Some(path);
        Ok(app)
    }

    /// Recompute pane areas and the editor viewport for a terminal size
    pub fn resize(&mut self, area: Rect) {
        self.layout = ComputedLayout::compute(area, &self.layout_config);
        let inner = EditorPane::inner(self.layout.editor);
        self.editor.set_viewport(Viewport {
            width: inner.width,
            height: inner.height,
        });
    }

    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key).await,
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => self.resize(Rect::new(0, 0, width, height)),
            _ => {}
        }
    }

    /// Handle a key event
    pub async fn handle_key(&mut self, key: KeyEvent) {
        let action = convert_key(key);
        if action == KeyAction::Ignore {
            return;
        }
        self.status_message = None;

        match action {
            KeyAction::Edit(command) => self.editor.apply(command),
            KeyAction::Submit => self.submit().await,
            KeyAction::ClearConsole => {
                if !self.controller.clear_output() {
                    self.status_message = Some("Cannot clear while running".to_string());
                }
            }
            KeyAction::Save => self.save(),
            KeyAction::Quit => self.should_quit = true,
            KeyAction::Ignore => {}
        }
    }

    /// Wheel over the editor scrolls the input surface; the backdrop follows
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let delta = match mouse.kind {
            MouseEventKind::ScrollUp => -WHEEL_LINES,
            MouseEventKind::ScrollDown => WHEEL_LINES,
            _ => return,
        };
        if self
            .layout
            .editor
            .contains(Position::new(mouse.column, mouse.row))
        {
            self.editor.apply(EditCommand::Scroll(delta));
        }
    }

    /// Submit a snapshot of the buffer
    pub async fn submit(&mut self) {
        let code = self.editor.snapshot();
        if let Err(e) = self.controller.submit(code).await {
            self.status_message = Some(e.to_string());
        }
    }

    /// React to progress reported by the controller
    pub fn on_session_update(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Output => {}
            SessionUpdate::Finished(Outcome::Completed) => {
                self.status_message = Some("Run completed".to_string());
            }
            SessionUpdate::Finished(Outcome::Failed) => {
                self.status_message = Some("Run failed".to_string());
            }
        }
    }

    /// Write the buffer to the file given on the command line
    pub fn save(&mut self) {
        let Some(path) = &self.file_path else {
            self.status_message = Some("No file to save to (start kpad with a FILE)".to_string());
            return;
        };
        match fs::write(path, self.editor.text()) {
            Ok(()) => {
                info!(path = %path.display(), "saved buffer");
                self.status_message = Some(format!("Saved {}", self.filename));
            }
            Err(e) => {
                warn!(path = %path.display(), "save failed: {}", e);
                self.status_message = Some(format!("Save failed: {}", e));
            }
        }
    }

    fn state_label(&self) -> &'static str {
        match (self.controller.phase(), self.controller.last_outcome()) {
            (Phase::Submitting | Phase::Streaming, _) => "Running",
            (Phase::Idle, Some(Outcome::Completed)) => "Done",
            (Phase::Idle, Some(Outcome::Failed)) => "Failed",
            (Phase::Idle, None) => "Idle",
        }
    }

    /// Render the application to a frame
    pub fn render(&mut self, frame: &mut Frame) {
        self.resize(frame.area());
        let layout = self.layout;

        let editor_pane = EditorPane::new(&self.editor, &self.theme)
            .title(&self.filename)
            .running(self.controller.in_flight());
        frame.render_widget(&editor_pane, layout.editor);

        if layout.console_visible() {
            let console_pane = ConsolePane::new(self.controller.output())
                .awaiting(self.controller.awaiting_output());
            frame.render_widget(&console_pane, layout.console);
        }

        self.render_status_bar(frame, layout.status);

        let inner = EditorPane::inner(layout.editor);
        if let Some((x, y)) = self.editor.input().cursor_screen_position() {
            frame.set_cursor_position(Position::new(inner.x + x, inner.y + y));
        }
    }

    /// Render the status bar
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let (line, col) = self.editor.input().cursor_line_col();
        let mut status = StatusContent::new()
            .filename(&self.filename)
            .state(self.state_label())
            .position(line, col);
        if let Some(msg) = &self.status_message {
            status = status.message(msg.clone());
        }

        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        let paragraph = Paragraph::new(Line::from(Span::styled(status.format(area.width), style)));
        frame.render_widget(paragraph, area);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
