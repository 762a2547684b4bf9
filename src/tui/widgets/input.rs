//! Question input bar.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Placeholder shown in an empty input.
pub const PLACEHOLDER: &str = "Ask anything from the database";

/// Width taken by the left border and the `> ` prompt.
pub const PROMPT_WIDTH: u16 = 3;

/// Number of characters to skip so the cursor stays visible.
pub fn calculate_scroll_offset(cursor: usize, available_width: usize) -> usize {
    cursor.saturating_sub(available_width)
}

pub struct InputBar<'a> {
    text: &'a str,
    cursor: usize,
    enabled: bool,
}

impl<'a> InputBar<'a> {
    pub fn new(text: &'a str, cursor: usize, enabled: bool) -> Self {
        Self {
            text,
            cursor,
            enabled,
        }
    }

    /// Visible width for text inside an input of `area_width` columns.
    pub fn available_width(area_width: u16) -> usize {
        // Left border and prompt, right border, cursor cell.
        area_width.saturating_sub(PROMPT_WIDTH + 2) as usize
    }
}

impl Widget for InputBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.enabled {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Ask ");

        let prompt_style = Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD);

        let line = if self.text.is_empty() {
            Line::from(vec![
                Span::styled("> ", prompt_style),
                Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)),
            ])
        } else {
            let offset = calculate_scroll_offset(self.cursor, Self::available_width(area.width));
            let visible: String = self.text.chars().skip(offset).collect();
            Line::from(vec![Span::styled("> ", prompt_style), Span::raw(visible)])
        };

        Paragraph::new(line).block(block).render(area, buf);
    }
}
