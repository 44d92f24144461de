//! Console Pane Widget
//!
//! Shows the streamed output of the current run, wrapped, always scrolled
//! so the latest line is visible. Lines are wrapped here rather than by the
//! paragraph so the row count used for scrolling is the one drawn.

use crate::engine::STDERR_MARKER;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Shown while a run is in flight and nothing has arrived yet
pub const AWAITING_INDICATOR: &str = "_";

const SYSTEM_ERROR_PREFIX: &str = "System Error";

/// The console pane widget
pub struct ConsolePane<'a> {
    output: &'a str,
    awaiting: bool,
}

impl<'a> ConsolePane<'a> {
    pub fn new(output: &'a str) -> Self {
        Self {
            output,
            awaiting: false,
        }
    }

    /// Show the awaiting-output indicator instead of the (empty) output
    pub fn awaiting(mut self, awaiting: bool) -> Self {
        self.awaiting = awaiting;
        self
    }

    fn line_style(line: &str) -> Style {
        if line.starts_with(SYSTEM_ERROR_PREFIX) || line.starts_with('❌') {
            Style::default().fg(Color::Red)
        } else if line.starts_with(STDERR_MARKER) {
            Style::default().fg(Color::Yellow)
        } else if line.starts_with('✅') {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::White)
        }
    }

    /// Display rows for the output at the given width, styled per source line
    fn build_lines(&self, width: usize) -> Vec<Line<'a>> {
        if self.awaiting {
            return vec![Line::from(Span::styled(
                AWAITING_INDICATOR,
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::SLOW_BLINK),
            ))];
        }
        self.output
            .split('\n')
            .flat_map(|line| {
                let style = Self::line_style(line);
                wrap_line(line, width)
                    .into_iter()
                    .map(move |row| Line::from(Span::styled(row, style)))
            })
            .collect()
    }
}

/// Split a line into rows of at most `width` cells, breaking after spaces
/// where possible and inside a word when it is longer than a row.
fn wrap_line(line: &str, width: usize) -> Vec<&str> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut start = 0;
    let mut cells = 0;
    // Byte offset just past the last space in the current row, and the
    // cells used up to it
    let mut soft_break: Option<(usize, usize)> = None;

    for (i, ch) in line.char_indices() {
        let w = ch.width().unwrap_or(0);
        if cells + w > width && i > start {
            if ch == ' ' {
                rows.push(&line[start..i]);
                start = i + 1;
                cells = 0;
                soft_break = None;
                continue;
            }
            if let Some((at, used)) = soft_break.take() {
                rows.push(&line[start..at]);
                start = at;
                cells -= used;
            }
            if cells + w > width && i > start {
                rows.push(&line[start..i]);
                start = i;
                cells = 0;
            }
        }
        cells += w;
        if ch == ' ' {
            soft_break = Some((i + 1, cells));
        }
    }

    if start < line.len() || rows.is_empty() {
        rows.push(&line[start..]);
    }
    rows
}

impl Widget for &ConsolePane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Console ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines = self.build_lines(usize::from(inner.width));

        // Keep only the rows that fit, latest at the bottom
        let hidden = lines.len().saturating_sub(usize::from(inner.height));
        lines.drain(..hidden);

        Paragraph::new(lines).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(buf: &Buffer) -> Vec<String> {
        (buf.area.y..buf.area.y + buf.area.height)
            .map(|y| {
                (buf.area.x..buf.area.x + buf.area.width)
                    .filter_map(|x| buf.cell((x, y)).map(|c| c.symbol().to_string()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_line_styles() {
        assert_eq!(
            ConsolePane::line_style("System Error: boom").fg,
            Some(Color::Red)
        );
        assert_eq!(ConsolePane::line_style("⚠️ careful").fg, Some(Color::Yellow));
        assert_eq!(
            ConsolePane::line_style("✅ Execution completed").fg,
            Some(Color::Green)
        );
        assert_eq!(ConsolePane::line_style("hello").fg, Some(Color::White));
    }

    #[test]
    fn test_awaiting_indicator() -> Result<(), String> {
        let pane = ConsolePane::new("").awaiting(true);
        let area = Rect::new(0, 0, 20, 4);
        let mut buf = Buffer::empty(area);
        (&pane).render(area, &mut buf);

        let cell = buf.cell((1, 1)).ok_or("cell (1,1) should exist")?;
        assert_eq!(cell.symbol(), AWAITING_INDICATOR);
        assert!(cell.modifier.contains(Modifier::SLOW_BLINK));
        Ok(())
    }

    #[test]
    fn test_auto_scrolls_to_latest() {
        let output = (1..=10)
            .map(|i| format!("out{}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let pane = ConsolePane::new(&output);
        let area = Rect::new(0, 0, 20, 5);
        let mut buf = Buffer::empty(area);
        (&pane).render(area, &mut buf);

        let rows = rows(&buf);
        assert!(rows[0].contains("Console"));
        assert!(rows[1].contains("out8"));
        assert!(rows[3].contains("out10"));
    }

    #[test]
    fn test_wrapped_lines_count_toward_scroll() {
        let output = format!("first\n{}", "x".repeat(36));
        let pane = ConsolePane::new(&output);
        // 18 columns inside the border: the long line takes two rows
        let area = Rect::new(0, 0, 20, 4);
        let mut buf = Buffer::empty(area);
        (&pane).render(area, &mut buf);

        let rows = rows(&buf);
        assert!(!rows[1].contains("first"));
        assert!(rows[1].contains(&"x".repeat(18)));
        assert!(rows[2].contains(&"x".repeat(18)));
    }

    #[test]
    fn test_word_wrapped_output_keeps_latest_line() {
        let output = "aaaaaa bbbbbb cccccc dddddd\nLAST";
        let pane = ConsolePane::new(output);
        // 10x3 inside the border; the first line breaks at words into 4 rows
        let area = Rect::new(0, 0, 12, 5);
        let mut buf = Buffer::empty(area);
        (&pane).render(area, &mut buf);

        let rows = rows(&buf);
        assert!(rows[1].contains("cccccc"));
        assert!(rows[2].contains("dddddd"));
        assert!(rows[3].contains("LAST"));
    }

    #[test]
    fn test_wrap_line_breaks() {
        assert_eq!(wrap_line("", 5), vec![""]);
        assert_eq!(wrap_line("abc", 5), vec!["abc"]);
        assert_eq!(wrap_line("ab cd ef", 5), vec!["ab cd", "ef"]);
        assert_eq!(wrap_line("ab cdef", 5), vec!["ab ", "cdef"]);
        assert_eq!(wrap_line("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_line("abcd efgh", 4), vec!["abcd", "efgh"]);
        // Wide glyphs take two cells
        assert_eq!(wrap_line("中文字", 4), vec!["中文", "字"]);
    }
}
