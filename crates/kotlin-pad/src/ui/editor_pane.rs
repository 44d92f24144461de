//! Editor Pane Widget
//!
//! Draws the highlighted backdrop inside a bordered block whose top border
//! carries the file name and the run control. The input surface itself has
//! no glyphs; the app places the terminal cursor from its position.

use crate::editor::Editor;
use crate::ui::highlight::{Theme, to_lines};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

pub const RUN_LABEL: &str = "[ Run ]";
pub const RUNNING_LABEL: &str = "[ Running... ]";

/// The editor pane widget
pub struct EditorPane<'a> {
    editor: &'a Editor,
    theme: &'a Theme,
    title: &'a str,
    running: bool,
}

impl<'a> EditorPane<'a> {
    pub fn new(editor: &'a Editor, theme: &'a Theme) -> Self {
        Self {
            editor,
            theme,
            title: "",
            running: false,
        }
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = title;
        self
    }

    /// Show the run control as busy
    pub fn running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    fn block(&self) -> Block<'a> {
        let control = if self.running {
            Span::styled(
                RUNNING_LABEL,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )
        } else {
            Span::styled(
                RUN_LABEL,
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
        };

        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title_top(Line::from(format!(" {} ", self.title)).left_aligned())
            .title_top(Line::from(control).right_aligned())
    }

    /// Area inside the border, where text and cursor live
    pub fn inner(area: Rect) -> Rect {
        Block::default().borders(Borders::ALL).inner(area)
    }
}

impl Widget for &EditorPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = self.block();
        let inner = block.inner(area);
        block.render(area, buf);

        let backdrop = self.editor.backdrop();
        let scroll = backdrop.scroll();
        Paragraph::new(to_lines(backdrop.tokens(), self.theme))
            .scroll((scroll.top, scroll.left))
            .render(inner, buf);
    }
}
