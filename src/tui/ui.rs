//! Screen layout and rendering.

use super::app::{App, FormField, Screen};
use super::widgets::{chat, form, header, input, sidebar};
use crate::session::Session;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

/// Width of the setup panel.
const SETUP_WIDTH: u16 = 72;

/// Renders the whole UI. `session` is `None` until a connection succeeds.
pub fn render(frame: &mut Frame, app: &App, session: Option<&Session>) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let connection = session.map(|s| s.connection().display_string());
    frame.render_widget(
        header::Header::new(connection.as_deref(), app.spinner.as_ref()),
        main_layout[0],
    );

    match (app.screen, session) {
        (Screen::Chat, Some(session)) => render_chat(frame, main_layout[1], app, session),
        _ => render_setup(frame, main_layout[1], app),
    }
}

/// Centers a box of at most `width` x `height` in `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_setup(frame: &mut Frame, area: Rect, app: &App) {
    let panel = form::SetupPanel::new(&app.form, app.setup_error.as_deref());
    let height = panel.lines().len() as u16 + 2;
    let panel_area = centered(area, SETUP_WIDTH, height);
    frame.render_widget(panel, panel_area);

    if app.is_busy() {
        return;
    }

    let focused = app.form.focused_field();
    if focused == FormField::Backend {
        return;
    }
    let Some(field) = app.form.field(focused) else {
        return;
    };
    let cursor_x = panel_area.x + 1 + form::VALUE_COLUMN + field.cursor as u16;
    let cursor_y = panel_area.y + 1 + form::FIELDS_TOP + app.form.focus as u16;
    if cursor_x < panel_area.right() && cursor_y < panel_area.bottom() {
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

fn render_chat(frame: &mut Frame, area: Rect, app: &App, session: &Session) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(columns[1]);

    frame.render_widget(
        chat::ChatPanel::new(
            session.conversation().turns(),
            &app.activity,
            &app.streaming,
            app.chat_scroll,
        ),
        columns[0],
    );
    frame.render_widget(sidebar::AuditPanel::new(session.audit()), side[0]);
    frame.render_widget(
        sidebar::SchemaPanel::new(session.previews(), 0).with_error(session.schema_error()),
        side[1],
    );

    let input_area = rows[1];
    let enabled = !app.is_busy();
    frame.render_widget(
        input::InputBar::new(&app.input.text, app.input.cursor, enabled),
        input_area,
    );

    if enabled {
        let available = input::InputBar::available_width(input_area.width);
        let offset = input::calculate_scroll_offset(app.input.cursor, available);
        let cursor_x = input_area.x + input::PROMPT_WIDTH + (app.input.cursor - offset) as u16;
        frame.set_cursor_position((cursor_x, input_area.y + 1));
    }
}
