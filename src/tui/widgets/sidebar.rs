//! Sidebar panels: recent questions and the schema preview.

use super::table::ResultTable;
use crate::inspect::TablePreview;
use crate::session::{AuditLog, AUDIT_PREVIEW_ENTRIES};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

/// Most recent audit entries, newest first.
pub struct AuditPanel<'a> {
    audit: &'a AuditLog,
}

impl<'a> AuditPanel<'a> {
    pub fn new(audit: &'a AuditLog) -> Self {
        Self { audit }
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        if self.audit.is_empty() {
            return vec![Line::from(Span::styled(
                "No questions yet",
                Style::default().fg(Color::DarkGray),
            ))];
        }

        self.audit
            .recent(AUDIT_PREVIEW_ENTRIES)
            .into_iter()
            .map(|entry| {
                Line::from(vec![
                    Span::styled(
                        format!("[{}] ", entry.timestamp),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(entry.query_preview()),
                ])
            })
            .collect()
    }
}

impl Widget for AuditPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" Query Audit ({}) ", self.audit.len()));

        Paragraph::new(self.lines())
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Table names with a few sample rows each.
pub struct SchemaPanel<'a> {
    previews: &'a [TablePreview],
    error: Option<&'a str>,
    scroll: u16,
}

impl<'a> SchemaPanel<'a> {
    pub fn new(previews: &'a [TablePreview], scroll: u16) -> Self {
        Self {
            previews,
            error: None,
            scroll,
        }
    }

    /// Shows why the table listing failed instead of the previews.
    pub fn with_error(mut self, error: Option<&'a str>) -> Self {
        self.error = error;
        self
    }

    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        if let Some(error) = self.error {
            return vec![Line::from(Span::styled(
                format!("Error loading database information: {error}"),
                Style::default().fg(Color::Red),
            ))];
        }

        if self.previews.is_empty() {
            return vec![Line::from(Span::styled(
                "No tables found",
                Style::default().fg(Color::DarkGray),
            ))];
        }

        let title = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let mut lines = Vec::new();
        for preview in self.previews {
            lines.push(Line::from(Span::styled(preview.table.clone(), title)));
            match &preview.result {
                Ok(result) => lines.extend(ResultTable::new(result).render_to_lines(width)),
                Err(e) => lines.push(Line::from(Span::styled(
                    format!("Error: {}", e.message()),
                    Style::default().fg(Color::Red),
                ))),
            }
            lines.push(Line::from(""));
        }
        lines
    }
}

impl Widget for SchemaPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" Schema Preview ({}) ", self.previews.len()));

        let width = block.inner(area).width as usize;
        Paragraph::new(self.lines(width))
            .block(block)
            .scroll((self.scroll, 0))
            .render(area, buf);
    }
}
