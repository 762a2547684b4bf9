//! Header bar: app name, spinner and connection.

use super::spinner::Spinner;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::Widget,
};

pub struct Header<'a> {
    connection_info: Option<&'a str>,
    spinner: Option<&'a Spinner>,
}

impl<'a> Header<'a> {
    pub fn new(connection_info: Option<&'a str>, spinner: Option<&'a Spinner>) -> Self {
        Self {
            connection_info,
            spinner,
        }
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let style = Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);

        for x in area.left()..area.right() {
            buf[(x, area.y)].set_style(style);
        }

        let left_text = format!(" SQLChat v{}", env!("CARGO_PKG_VERSION"));
        buf.set_span(area.x, area.y, &Span::styled(left_text, style), area.width);

        if let Some(spinner) = self.spinner {
            let text = spinner.display();
            let spinner_style = style.fg(Color::Yellow);
            let width = text.chars().count() as u16;
            let x = area.x + area.width.saturating_sub(width) / 2;
            buf.set_string(x, area.y, &text, spinner_style);
        }

        if let Some(info) = self.connection_info {
            let dot_style = Style::default().bg(Color::Blue).fg(Color::Green);
            let db_text = format!(" [db: {info}] ");
            let right_width = db_text.chars().count() as u16 + 2;
            if right_width < area.width {
                let right_x = area.right().saturating_sub(right_width);
                buf.set_string(right_x, area.y, " ", style);
                buf.set_string(right_x + 1, area.y, "●", dot_style);
                buf.set_string(right_x + 2, area.y, &db_text, style);
            }
        }
    }
}
