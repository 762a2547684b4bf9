//! Boxed table rendering for sample rows.

use crate::db::{QueryResult, Value};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 24;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 3;

/// Renders a [`QueryResult`] as box-drawn lines.
pub struct ResultTable<'a> {
    result: &'a QueryResult,
}

impl<'a> ResultTable<'a> {
    pub fn new(result: &'a QueryResult) -> Self {
        Self { result }
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .result
            .columns
            .iter()
            .map(|col| col.name.chars().count().max(MIN_COLUMN_WIDTH))
            .collect();

        for row in &self.result.rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.to_display_string().chars().count());
            }
        }

        widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
    }

    /// Shrinks the widest columns until the table fits `available`.
    fn fit_widths(mut widths: Vec<usize>, available: usize) -> Vec<usize> {
        let total = |w: &[usize]| w.iter().sum::<usize>() + w.len() * 3 + 1;
        while total(&widths) > available {
            let Some(widest) = widths
                .iter_mut()
                .filter(|w| **w > MIN_COLUMN_WIDTH)
                .max_by_key(|w| **w)
            else {
                break;
            };
            *widest -= 1;
        }
        widths
    }

    fn truncate(s: &str, max_width: usize) -> String {
        if s.chars().count() <= max_width {
            s.to_string()
        } else if max_width <= 1 {
            s.chars().take(max_width).collect()
        } else {
            let kept: String = s.chars().take(max_width - 1).collect();
            format!("{kept}…")
        }
    }

    pub fn render_to_lines(&self, available_width: usize) -> Vec<Line<'static>> {
        let dim = Style::default().fg(Color::DarkGray);

        if self.result.columns.is_empty() {
            return vec![Line::from(Span::styled("(no columns)", dim))];
        }

        let widths = Self::fit_widths(self.column_widths(), available_width);

        let mut lines = vec![
            Self::border(&widths, '┌', '┬', '┐'),
            self.header_row(&widths),
            Self::border(&widths, '├', '┼', '┤'),
        ];
        for row in &self.result.rows {
            lines.push(Self::data_row(row, &widths));
        }
        lines.push(Self::border(&widths, '└', '┴', '┘'));

        let count = self.result.row_count;
        lines.push(Line::from(Span::styled(
            format!("{count} row{}", if count == 1 { "" } else { "s" }),
            dim,
        )));
        lines
    }

    fn border(widths: &[usize], left: char, mid: char, right: char) -> Line<'static> {
        let inner = widths
            .iter()
            .map(|&w| "─".repeat(w + 2))
            .collect::<Vec<_>>()
            .join(&mid.to_string());
        Line::from(Span::styled(
            format!("{left}{inner}{right}"),
            Style::default().fg(Color::DarkGray),
        ))
    }

    fn header_row(&self, widths: &[usize]) -> Line<'static> {
        let header = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        let cells = self
            .result
            .columns
            .iter()
            .map(|col| (col.name.clone(), header));
        Self::row_line(cells, widths)
    }

    fn data_row(row: &[Value], widths: &[usize]) -> Line<'static> {
        let cells = row.iter().map(|value| {
            let style = if value.is_null() {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC)
            } else {
                Style::default()
            };
            (value.to_display_string(), style)
        });
        Self::row_line(cells, widths)
    }

    fn row_line(cells: impl Iterator<Item = (String, Style)>, widths: &[usize]) -> Line<'static> {
        let sep = Style::default().fg(Color::DarkGray);
        let mut spans = vec![Span::styled("│", sep)];
        for ((text, style), &width) in cells.zip(widths) {
            let text = Self::truncate(&text, width);
            spans.push(Span::styled(format!(" {text:width$} "), style));
            spans.push(Span::styled("│", sep));
        }
        Line::from(spans)
    }
}
