//! Layout Manager
//!
//! Stacks the editor above the console, with a status bar at the bottom.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use serde::Deserialize;

/// Layout configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Percentage of height for the editor pane (10-90)
    pub editor_height_percent: u16,
    /// Minimum height for each pane, borders included
    pub min_pane_height: u16,
    /// Height reserved for status bar
    pub status_bar_height: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            editor_height_percent: 60,
            min_pane_height: 3,
            status_bar_height: 1,
        }
    }
}

/// The computed layout areas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputedLayout {
    pub editor: Rect,
    pub console: Rect,
    pub status: Rect,
}

impl ComputedLayout {
    /// Compute the layout for a given terminal area
    pub fn compute(area: Rect, config: &LayoutConfig) -> Self {
        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(config.status_bar_height),
            ])
            .split(area);

        let main_area = vertical_chunks[0];
        let status_area = vertical_chunks[1];

        // Too short to stack: the editor takes everything
        if main_area.height < config.min_pane_height * 2 {
            return Self {
                editor: main_area,
                console: Rect::default(),
                status: status_area,
            };
        }

        let percent = config.editor_height_percent.clamp(10, 90);
        let pane_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(percent),
                Constraint::Percentage(100 - percent),
            ])
            .split(main_area);

        Self {
            editor: pane_chunks[0],
            console: pane_chunks[1],
            status: status_area,
        }
    }

    pub fn console_visible(&self) -> bool {
        self.console.width > 0 && self.console.height > 0
    }
}

/// Status bar content
#[derive(Debug, Clone, Default)]
pub struct StatusContent {
    /// Current filename (or scratch indicator)
    pub filename: String,
    /// Run state, e.g. "Idle" or "Running"
    pub state: String,
    /// Cursor position, 1-based "line:col"
    pub position: String,
    /// Any additional status message
    pub message: Option<String>,
}

impl StatusContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.filename = name.into();
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    /// Set the cursor position from zero-based line and column
    pub fn position(mut self, line: usize, col: usize) -> Self {
        self.position = format!("{}:{}", line + 1, col + 1);
        self
    }

    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Format for display
    pub fn format(&self, width: u16) -> String {
        let left = format!(" {} ", self.filename);
        let middle = self.message.clone().unwrap_or_default();
        let right = format!(" {} | {} ", self.state, self.position);

        let used = left.chars().count() + middle.chars().count() + right.chars().count();
        let padding_needed = (width as usize).saturating_sub(used);

        let left_pad = padding_needed / 2;
        let right_pad = padding_needed - left_pad;

        format!(
            "{}{}{}{}{}",
            left,
            " ".repeat(left_pad),
            middle,
            " ".repeat(right_pad),
            right
        )
    }
}
