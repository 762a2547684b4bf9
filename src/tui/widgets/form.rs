//! Setup panel: database selection, connection fields and the API key.

use crate::tui::app::{FormField, SetupForm};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

/// Column where field values start.
pub const VALUE_COLUMN: u16 = 18;

/// Lines above the first field inside the panel border.
pub const FIELDS_TOP: u16 = 2;

pub struct SetupPanel<'a> {
    form: &'a SetupForm,
    error: Option<&'a str>,
}

impl<'a> SetupPanel<'a> {
    pub fn new(form: &'a SetupForm, error: Option<&'a str>) -> Self {
        Self { form, error }
    }

    /// On-screen text for a field value.
    pub fn display_value(form: &SetupForm, field: FormField) -> String {
        match form.field(field) {
            None => format!("< {} >", form.backend.label()),
            Some(input) if field.is_secret() => "•".repeat(input.text.chars().count()),
            Some(input) => input.text.clone(),
        }
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(Span::styled(
                "Connect to a database",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];

        let focused = self.form.focused_field();
        for &field in self.form.fields() {
            let is_focused = field == focused;
            let marker = if is_focused { "▸ " } else { "  " };
            let label_style = if is_focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let label = format!("{marker}{:<width$}", field.label(), width = VALUE_COLUMN as usize - 2);
            lines.push(Line::from(vec![
                Span::styled(label, label_style),
                Span::raw(Self::display_value(self.form, field)),
            ]));
        }

        lines.push(Line::from(""));
        if let Some(error) = self.error {
            lines.push(Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(Color::Red),
            )));
            lines.push(Line::from(""));
        }

        let help = Style::default().fg(Color::DarkGray);
        lines.push(Line::from(Span::styled(
            "Tab/↑↓ move · ←/→ switch database · Enter connect · Esc quit",
            help,
        )));
        lines.push(Line::from(Span::styled(
            "Tip: get a free API key at console.groq.com and keep it out of shared configs.",
            help,
        )));
        lines
    }
}

impl Widget for SetupPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Setup ");

        Paragraph::new(self.lines())
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
