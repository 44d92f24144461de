//! Dual-Layer Editor
//!
//! Two stacked surfaces share one screen area:
//! - [`TextInput`] is the interactive surface. It owns the source buffer,
//!   the cursor and the scroll offsets, and receives every key and wheel
//!   event. It draws no glyphs of its own, only the terminal cursor.
//! - [`Backdrop`] is the styled, read-only surface underneath. It is derived
//!   one way from the input's text and has no input handlers at all.
//!
//! The [`Editor`] keeps them fused: every text change re-tokenizes the whole
//! buffer into the backdrop, and every scroll change on the input is copied
//! onto the backdrop in the same call.
//!
//! Columns and horizontal scroll are measured in terminal cells, the same
//! unit the backdrop is laid out in, so wide glyphs keep caret and text
//! aligned. Tabs are expanded to spaces when text enters the buffer.

use crate::ui::highlight::{Token, highlight};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Clamp a line or cell count into a scroll offset
fn saturate(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

fn expand_tabs(text: String, tab_width: usize) -> String {
    if text.contains('\t') {
        text.replace('\t', &" ".repeat(tab_width))
    } else {
        text
    }
}

/// Scroll position of a surface, in lines and columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollOffset {
    pub top: u16,
    pub left: u16,
}

/// Visible size of the editor surfaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

/// Editing operations understood by the input surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    Insert(char),
    Newline,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    /// Mouse wheel; scrolls without moving the cursor
    Scroll(i32),
}

/// The interactive, plain-text surface
#[derive(Debug, Clone)]
pub struct TextInput {
    text: String,
    /// Byte offset, always on a char boundary
    cursor: usize,
    /// Column to return to when moving vertically through short lines
    goal_column: Option<usize>,
    scroll: ScrollOffset,
    viewport: Viewport,
    tab_width: usize,
}

impl TextInput {
    pub fn new(text: impl Into<String>, tab_width: usize) -> Self {
        let tab_width = tab_width.max(1);
        Self {
            text: expand_tabs(text.into(), tab_width),
            cursor: 0,
            goal_column: None,
            scroll: ScrollOffset::default(),
            viewport: Viewport::default(),
            tab_width,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll(&self) -> ScrollOffset {
        self.scroll
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Number of display lines (a trailing newline opens an empty line)
    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    /// Zero-based line and column (in cells) of the cursor
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before = &self.text[..self.cursor];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |p| p + 1);
        let col = self.text[line_start..self.cursor].width();
        (line, col)
    }

    /// Cursor position relative to the viewport, if it is on screen
    pub fn cursor_screen_position(&self) -> Option<(u16, u16)> {
        let (line, col) = self.cursor_line_col();
        let row = line.checked_sub(usize::from(self.scroll.top))?;
        let column = col.checked_sub(usize::from(self.scroll.left))?;
        let on_screen =
            row < usize::from(self.viewport.height) && column < usize::from(self.viewport.width);
        if on_screen {
            Some((saturate(column), saturate(row)))
        } else {
            None
        }
    }

    /// Replace the whole buffer, clamping the cursor into it
    pub(crate) fn set_text(&mut self, text: String) {
        self.text = expand_tabs(text, self.tab_width);
        self.cursor = self.cursor.min(self.text.len());
        while !self.text.is_char_boundary(self.cursor) {
            self.cursor -= 1;
        }
        self.goal_column = None;
        self.clamp_scroll();
    }

    pub(crate) fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.ensure_cursor_visible();
    }

    /// Apply an edit; returns true if the text changed
    pub(crate) fn apply(&mut self, command: EditCommand) -> bool {
        let vertical = matches!(
            command,
            EditCommand::Up | EditCommand::Down | EditCommand::PageUp | EditCommand::PageDown
        );
        if !vertical {
            self.goal_column = None;
        }

        let changed = match command {
            EditCommand::Insert('\t') | EditCommand::Tab => {
                let spaces = " ".repeat(self.tab_width);
                self.insert_str(&spaces);
                true
            }
            EditCommand::Insert(ch) => {
                self.insert_str(ch.encode_utf8(&mut [0; 4]));
                true
            }
            EditCommand::Newline => {
                self.insert_str("\n");
                true
            }
            EditCommand::Backspace => match self.prev_boundary() {
                Some(start) => {
                    self.text.replace_range(start..self.cursor, "");
                    self.cursor = start;
                    true
                }
                None => false,
            },
            EditCommand::Delete => match self.next_boundary() {
                Some(end) => {
                    self.text.replace_range(self.cursor..end, "");
                    true
                }
                None => false,
            },
            EditCommand::Left => {
                if let Some(p) = self.prev_boundary() {
                    self.cursor = p;
                }
                false
            }
            EditCommand::Right => {
                if let Some(p) = self.next_boundary() {
                    self.cursor = p;
                }
                false
            }
            EditCommand::Up => {
                self.move_lines(-1);
                false
            }
            EditCommand::Down => {
                self.move_lines(1);
                false
            }
            EditCommand::PageUp => {
                self.move_lines(-(self.page_size() as isize));
                false
            }
            EditCommand::PageDown => {
                self.move_lines(self.page_size() as isize);
                false
            }
            EditCommand::Home => {
                self.cursor = self.line_range(self.cursor_line_col().0).start;
                false
            }
            EditCommand::End => {
                self.cursor = self.line_range(self.cursor_line_col().0).end;
                false
            }
            EditCommand::Scroll(delta) => {
                self.scroll_by(delta);
                return false;
            }
        };

        self.ensure_cursor_visible();
        changed
    }

    fn insert_str(&mut self, s: &str) {
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor]
            .chars()
            .next_back()
            .map(|c| self.cursor - c.len_utf8())
    }

    fn next_boundary(&self) -> Option<usize> {
        self.text[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    /// Byte range of a line, excluding its newline
    fn line_range(&self, line: usize) -> std::ops::Range<usize> {
        let mut start = 0;
        for (i, text) in self.text.split('\n').enumerate() {
            if i == line {
                return start..start + text.len();
            }
            start += text.len() + 1;
        }
        self.text.len()..self.text.len()
    }

    fn page_size(&self) -> usize {
        usize::from(self.viewport.height).max(1)
    }

    fn move_lines(&mut self, delta: isize) {
        let (line, col) = self.cursor_line_col();
        let goal = *self.goal_column.get_or_insert(col);
        let last = self.line_count() - 1;
        let target = line.saturating_add_signed(delta).min(last);

        let range = self.line_range(target);
        let line_text = &self.text[range.clone()];
        // Land on the char covering the goal cell, or the line end
        let mut cells = 0;
        let offset = line_text
            .char_indices()
            .find(|&(_, ch)| {
                cells += char_width(ch);
                cells > goal
            })
            .map_or(line_text.len(), |(i, _)| i);
        self.cursor = range.start + offset;
    }

    fn max_scroll_top(&self) -> u16 {
        let lines = self.line_count();
        saturate(lines.saturating_sub(usize::from(self.viewport.height.max(1))))
    }

    fn scroll_by(&mut self, delta: i32) {
        let top = i32::from(self.scroll.top)
            .saturating_add(delta)
            .clamp(0, i32::from(self.max_scroll_top()));
        self.scroll.top = saturate(usize::try_from(top).unwrap_or(0));
    }

    fn clamp_scroll(&mut self) {
        self.scroll.top = self.scroll.top.min(self.max_scroll_top());
    }

    /// Scroll just enough to keep the cursor inside the viewport
    fn ensure_cursor_visible(&mut self) {
        let (line, col) = self.cursor_line_col();
        let cursor_cells = self.text[self.cursor..]
            .chars()
            .next()
            .map_or(1, |ch| char_width(ch).max(1));
        let height = usize::from(self.viewport.height.max(1));
        let width = usize::from(self.viewport.width.max(1));
        let mut top = usize::from(self.scroll.top);
        let mut left = usize::from(self.scroll.left);

        if line < top {
            top = line;
        } else if line >= top + height {
            top = line + 1 - height;
        }
        if col < left {
            left = col;
        } else if col + cursor_cells > left + width {
            left = (col + cursor_cells).saturating_sub(width).min(col);
            left = self.snap_to_glyph(line, left);
        }

        self.scroll = ScrollOffset {
            top: saturate(top),
            left: saturate(left),
        };
    }

    /// Move a left edge that falls inside a wide glyph to the glyph's end
    fn snap_to_glyph(&self, line: usize, left: usize) -> usize {
        let mut cells = 0;
        for ch in self.text[self.line_range(line)].chars() {
            if cells >= left {
                break;
            }
            cells += char_width(ch);
        }
        cells.max(left)
    }
}

/// The styled surface drawn underneath the input
#[derive(Debug, Clone, Default)]
pub struct Backdrop {
    tokens: Vec<Token>,
    scroll: ScrollOffset,
}

impl Backdrop {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn scroll(&self) -> ScrollOffset {
        self.scroll
    }

    fn render(&mut self, source: &str) {
        self.tokens = highlight(source);
    }

    fn sync_scroll(&mut self, offset: ScrollOffset) {
        self.scroll = offset;
    }
}

/// Input surface and backdrop, kept in lockstep
#[derive(Debug, Clone)]
pub struct Editor {
    input: TextInput,
    backdrop: Backdrop,
}

impl Editor {
    pub fn new(text: impl Into<String>, tab_width: usize) -> Self {
        let input = TextInput::new(text, tab_width);
        let mut backdrop = Backdrop::default();
        backdrop.render(input.text());
        Self { input, backdrop }
    }

    /// The source buffer
    pub fn text(&self) -> &str {
        self.input.text()
    }

    /// An owned copy of the buffer for submission
    pub fn snapshot(&self) -> String {
        self.input.text().to_owned()
    }

    pub fn input(&self) -> &TextInput {
        &self.input
    }

    pub fn backdrop(&self) -> &Backdrop {
        &self.backdrop
    }

    /// Route an edit to the input surface and re-sync the backdrop
    pub fn apply(&mut self, command: EditCommand) {
        let before = self.input.scroll();
        if self.input.apply(command) {
            self.backdrop.render(self.input.text());
        }
        if self.input.scroll() != before {
            self.on_scroll(self.input.scroll());
        }
    }

    /// Replace the buffer wholesale and re-render the backdrop
    pub fn on_text_change(&mut self, new_text: impl Into<String>) {
        let before = self.input.scroll();
        self.input.set_text(new_text.into());
        self.backdrop.render(self.input.text());
        if self.input.scroll() != before {
            self.on_scroll(self.input.scroll());
        }
    }

    /// Scroll notification from the input surface
    pub fn on_scroll(&mut self, offset: ScrollOffset) {
        self.backdrop.sync_scroll(offset);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.input.viewport() == viewport {
            return;
        }
        let before = self.input.scroll();
        self.input.set_viewport(viewport);
        if self.input.scroll() != before {
            self.on_scroll(self.input.scroll());
        }
    }
}
