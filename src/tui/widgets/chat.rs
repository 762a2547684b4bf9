//! Chat panel: the transcript plus the progress of the turn in flight.

use crate::session::turn::ERROR_PREFIX;
use crate::session::{Role, Turn};
use crate::tui::app::Activity;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Tool output lines shown per step.
const MAX_RESULT_LINES: usize = 3;

/// Wraps `text` into lines of at most `width` characters, breaking on spaces
/// where possible.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;
        for word in paragraph.split(' ') {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            let mut chars = word.chars().peekable();
            while chars.peek().is_some() {
                if current_len == width {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                if let Some(c) = chars.next() {
                    current.push(c);
                    current_len += 1;
                }
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

pub struct ChatPanel<'a> {
    turns: &'a [Turn],
    activity: &'a [Activity],
    streaming: &'a str,
    /// Lines scrolled up from the bottom.
    scroll: usize,
}

impl<'a> ChatPanel<'a> {
    pub fn new(turns: &'a [Turn], activity: &'a [Activity], streaming: &'a str, scroll: usize) -> Self {
        Self {
            turns,
            activity,
            streaming,
            scroll,
        }
    }

    fn push_wrapped(lines: &mut Vec<Line<'static>>, text: &str, width: usize, prefix: &str, style: Style) {
        let inner = width.saturating_sub(prefix.chars().count());
        for chunk in wrap_text(text, inner) {
            lines.push(Line::from(Span::styled(format!("{prefix}{chunk}"), style)));
        }
    }

    /// Renders every message to display lines for `width` columns.
    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        for turn in self.turns {
            let (label_style, body_style) = match turn.role {
                Role::User => (
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    Style::default(),
                ),
                Role::Assistant if turn.content.starts_with(ERROR_PREFIX) => (
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    Style::default().fg(Color::Red),
                ),
                Role::Assistant => (
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    Style::default(),
                ),
            };
            lines.push(Line::from(Span::styled(turn.role.label(), label_style)));
            Self::push_wrapped(&mut lines, &turn.content, width, "  ", body_style);
            lines.push(Line::from(""));
        }

        if !self.activity.is_empty() || !self.streaming.is_empty() {
            lines.push(Line::from(Span::styled(
                Role::Assistant.label(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
        }

        let thought_style = Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC);
        for step in self.activity {
            match step {
                Activity::Thought(text) => {
                    Self::push_wrapped(&mut lines, text, width, "  · ", thought_style);
                }
                Activity::ToolCall { tool, input } => {
                    let text = format!("{tool} {input}");
                    Self::push_wrapped(&mut lines, &text, width, "  → ", Style::default().fg(Color::Yellow));
                }
                Activity::ToolResult { output, .. } => {
                    let mut shown: Vec<&str> = output.lines().take(MAX_RESULT_LINES).collect();
                    if output.lines().count() > MAX_RESULT_LINES {
                        shown.push("…");
                    }
                    let text = shown.join("\n");
                    Self::push_wrapped(&mut lines, &text, width, "  ← ", Style::default().fg(Color::DarkGray));
                }
            }
        }

        if !self.streaming.is_empty() {
            Self::push_wrapped(&mut lines, self.streaming, width, "  ", Style::default());
        }

        lines
    }
}

impl Widget for ChatPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Chat ");

        let inner = block.inner(area);
        let lines = self.lines(inner.width as usize);

        let height = inner.height as usize;
        let max_scroll = lines.len().saturating_sub(height);
        let start = max_scroll.saturating_sub(self.scroll.min(max_scroll));
        let visible: Vec<Line> = lines.into_iter().skip(start).take(height).collect();

        Paragraph::new(visible).block(block).render(area, buf);
    }
}
