//! Application state for the TUI.
//!
//! Holds everything the screens render apart from the [`Session`] itself:
//! the setup form, the chat input, and the progress of the turn in flight.
//!
//! [`Session`]: crate::session::Session

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::widgets::spinner::Spinner;
use crate::agent::AgentEvent;
use crate::db::DatabaseBackend;
use crate::validate::{FormInput, RemoteFields};
use tokio::sync::mpsc;

/// Which screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Setup,
    Chat,
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    Quit,
    Connect(FormInput),
    Submit(String),
    ClearChat,
    ClearAudit,
}

/// Single-line text input with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    pub text: String,
    /// Cursor position in characters.
    pub cursor: usize,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Clears the input and returns the previous text.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Applies an editing key. Returns false if the key is not an editing key.
    fn edit(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => self.insert(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.move_home(),
            KeyCode::End => self.move_end(),
            _ => return false,
        }
        true
    }
}

/// A field of the setup form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Backend,
    SqlitePath,
    Host,
    User,
    Password,
    Database,
    ApiKey,
}

const SQLITE_FIELDS: &[FormField] = &[FormField::Backend, FormField::SqlitePath, FormField::ApiKey];
const MYSQL_FIELDS: &[FormField] = &[
    FormField::Backend,
    FormField::Host,
    FormField::User,
    FormField::Password,
    FormField::Database,
    FormField::ApiKey,
];

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Backend => "Database",
            Self::SqlitePath => "SQLite file",
            Self::Host => "MySQL host",
            Self::User => "MySQL user",
            Self::Password => "MySQL password",
            Self::Database => "MySQL database",
            Self::ApiKey => "Groq API key",
        }
    }

    /// Whether the value is masked on screen.
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Password | Self::ApiKey)
    }
}

/// The configuration panel shown before a session starts.
#[derive(Debug, Clone, Default)]
pub struct SetupForm {
    pub backend: DatabaseBackend,
    pub sqlite_path: InputState,
    pub host: InputState,
    pub user: InputState,
    pub password: InputState,
    pub database: InputState,
    pub api_key: InputState,
    pub focus: usize,
}

impl SetupForm {
    /// Prefills the form.
    pub fn from_input(input: &FormInput) -> Self {
        let mut form = Self {
            backend: input.backend,
            sqlite_path: InputState::with_text(input.sqlite_path.display().to_string()),
            host: InputState::with_text(input.remote.host.clone()),
            user: InputState::with_text(input.remote.user.clone()),
            password: InputState::with_text(input.remote.password.clone()),
            database: InputState::with_text(input.remote.database.clone()),
            api_key: InputState::with_text(input.api_key.clone()),
            focus: 0,
        };
        form.focus = form.first_blank_field();
        form
    }

    /// Fields shown for the selected backend, top to bottom.
    pub fn fields(&self) -> &'static [FormField] {
        match self.backend {
            DatabaseBackend::Sqlite => SQLITE_FIELDS,
            DatabaseBackend::MySql => MYSQL_FIELDS,
        }
    }

    pub fn focused_field(&self) -> FormField {
        let fields = self.fields();
        fields[self.focus.min(fields.len() - 1)]
    }

    pub fn field(&self, field: FormField) -> Option<&InputState> {
        match field {
            FormField::Backend => None,
            FormField::SqlitePath => Some(&self.sqlite_path),
            FormField::Host => Some(&self.host),
            FormField::User => Some(&self.user),
            FormField::Password => Some(&self.password),
            FormField::Database => Some(&self.database),
            FormField::ApiKey => Some(&self.api_key),
        }
    }

    fn field_mut(&mut self, field: FormField) -> Option<&mut InputState> {
        match field {
            FormField::Backend => None,
            FormField::SqlitePath => Some(&mut self.sqlite_path),
            FormField::Host => Some(&mut self.host),
            FormField::User => Some(&mut self.user),
            FormField::Password => Some(&mut self.password),
            FormField::Database => Some(&mut self.database),
            FormField::ApiKey => Some(&mut self.api_key),
        }
    }

    fn first_blank_field(&self) -> usize {
        self.fields()
            .iter()
            .position(|f| self.field(*f).is_some_and(|input| input.text.trim().is_empty()))
            .unwrap_or(0)
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields().len();
    }

    pub fn previous_field(&mut self) {
        let len = self.fields().len();
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn toggle_backend(&mut self) {
        self.backend = self.backend.toggle();
        self.focus = 0;
    }

    /// Reads the form into validator input.
    pub fn to_input(&self) -> FormInput {
        FormInput {
            api_key: self.api_key.text.clone(),
            backend: self.backend,
            sqlite_path: self.sqlite_path.text.trim().into(),
            remote: RemoteFields {
                host: self.host.text.clone(),
                user: self.user.text.clone(),
                password: self.password.text.clone(),
                database: self.database.text.clone(),
            },
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Enter => return Action::Connect(self.to_input()),
            KeyCode::Tab | KeyCode::Down => self.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.previous_field(),
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                if self.focused_field() == FormField::Backend =>
            {
                self.toggle_backend()
            }
            _ => {
                let field = self.focused_field();
                if let Some(input) = self.field_mut(field) {
                    input.edit(key);
                }
            }
        }
        Action::None
    }
}

/// One step of the turn in flight, as shown in the chat panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Thought(String),
    ToolCall { tool: String, input: String },
    ToolResult { tool: String, output: String },
}

/// Main application state.
#[derive(Debug, Default)]
pub struct App {
    pub running: bool,
    pub screen: Screen,
    pub form: SetupForm,
    /// Startup failure shown under the form.
    pub setup_error: Option<String>,
    /// Chat input.
    pub input: InputState,
    /// Chat scroll offset (lines from bottom).
    pub chat_scroll: usize,
    /// Steps of the turn in flight.
    pub activity: Vec<Activity>,
    /// Text streamed since the last tool step.
    pub streaming: String,
    /// Shown while connecting or answering.
    pub spinner: Option<Spinner>,
}

impl App {
    pub fn new(form: &FormInput) -> Self {
        Self {
            running: true,
            form: SetupForm::from_input(form),
            ..Default::default()
        }
    }

    pub fn is_busy(&self) -> bool {
        self.spinner.is_some()
    }

    /// Handles a key press and reports what the event loop should do.
    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => return Action::Quit,
            KeyCode::Esc if self.screen == Screen::Setup => return Action::Quit,
            _ => {}
        }
        if self.is_busy() {
            return Action::None;
        }

        match self.screen {
            Screen::Setup => self.form.handle_key(key),
            Screen::Chat => self.handle_chat_key(key, ctrl),
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent, ctrl: bool) -> Action {
        match key.code {
            KeyCode::Char('l') if ctrl => Action::ClearChat,
            KeyCode::Char('k') if ctrl => Action::ClearAudit,
            KeyCode::Enter => {
                let text = self.input.take();
                if text.trim().is_empty() {
                    Action::None
                } else {
                    Action::Submit(text)
                }
            }
            KeyCode::PageUp => {
                self.chat_scroll = self.chat_scroll.saturating_add(10);
                Action::None
            }
            KeyCode::PageDown => {
                self.chat_scroll = self.chat_scroll.saturating_sub(10);
                Action::None
            }
            KeyCode::Up if ctrl => {
                self.chat_scroll = self.chat_scroll.saturating_add(1);
                Action::None
            }
            KeyCode::Down if ctrl => {
                self.chat_scroll = self.chat_scroll.saturating_sub(1);
                Action::None
            }
            _ => {
                self.input.edit(key);
                Action::None
            }
        }
    }

    pub fn begin_connect(&mut self) {
        self.setup_error = None;
        self.spinner = Some(Spinner::command("Connecting"));
    }

    /// Leaves the setup screen after a session started.
    pub fn connected(&mut self) {
        self.spinner = None;
        self.setup_error = None;
        self.screen = Screen::Chat;
    }

    pub fn connect_failed(&mut self, message: String) {
        self.spinner = None;
        self.setup_error = Some(message);
    }

    pub fn begin_turn(&mut self) {
        self.activity.clear();
        self.streaming.clear();
        self.chat_scroll = 0;
        self.spinner = Some(Spinner::thinking());
    }

    /// Records an agent event for the turn in flight.
    pub fn apply_event(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::Token(text) => self.streaming.push_str(&text),
            AgentEvent::Thought(text) => self.activity.push(Activity::Thought(text)),
            AgentEvent::ToolCall { tool, input } => {
                let thought = std::mem::take(&mut self.streaming);
                if !thought.trim().is_empty() {
                    self.activity.push(Activity::Thought(thought.trim().to_string()));
                }
                self.activity.push(Activity::ToolCall { tool, input });
            }
            AgentEvent::ToolResult { tool, output } => {
                self.activity.push(Activity::ToolResult { tool, output });
            }
        }
        self.chat_scroll = 0;
    }

    /// Applies every event already queued on `events` and returns how many.
    pub fn drain_events(&mut self, events: &mut mpsc::UnboundedReceiver<AgentEvent>) -> usize {
        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            self.apply_event(event);
            applied += 1;
        }
        applied
    }

    pub fn end_turn(&mut self) {
        self.spinner = None;
        self.activity.clear();
        self.streaming.clear();
        self.chat_scroll = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn chat_app() -> App {
        let mut app = App::new(&FormInput::default());
        app.connected();
        app
    }

    #[test]
    fn test_input_editing_is_char_based() {
        let mut input = InputState::with_text("héllo");
        assert_eq!(input.cursor, 5);
        input.move_left();
        input.backspace();
        assert_eq!(input.text, "hélo");
        input.move_home();
        input.delete();
        assert_eq!(input.text, "élo");
        input.insert('x');
        assert_eq!(input.take(), "xélo");
        assert!(input.is_empty());
    }

    #[test]
    fn test_form_prefill_focuses_first_blank_field() {
        let form = SetupForm::from_input(&FormInput {
            sqlite_path: PathBuf::from("student.db"),
            ..Default::default()
        });
        assert_eq!(form.focused_field(), FormField::ApiKey);
    }

    #[test]
    fn test_form_toggle_backend_changes_fields() {
        let mut app = App::new(&FormInput::default());
        app.form.focus = 0;
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.form.backend, DatabaseBackend::MySql);
        assert_eq!(app.form.fields().len(), 6);

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.form.focused_field(), FormField::Host);
        type_text(&mut app, "localhost");
        app.handle_key(key(KeyCode::BackTab));
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.form.backend, DatabaseBackend::Sqlite);
        assert_eq!(app.form.host.text, "localhost");
    }

    #[test]
    fn test_form_enter_requests_connect() {
        let mut app = App::new(&FormInput::default());
        app.form.focus = app.form.fields().len() - 1;
        type_text(&mut app, "gsk_test");
        match app.handle_key(key(KeyCode::Enter)) {
            Action::Connect(input) => assert_eq!(input.api_key, "gsk_test"),
            other => panic!("expected connect, got {other:?}"),
        }
    }

    #[test]
    fn test_chat_submit_and_resets() {
        let mut app = chat_app();
        assert_eq!(app.handle_key(key(KeyCode::Enter)), Action::None);
        type_text(&mut app, "How many students?");
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            Action::Submit("How many students?".to_string())
        );
        assert_eq!(app.handle_key(ctrl('l')), Action::ClearChat);
        assert_eq!(app.handle_key(ctrl('k')), Action::ClearAudit);
        assert_eq!(app.handle_key(ctrl('c')), Action::Quit);
    }

    #[test]
    fn test_keys_ignored_while_busy() {
        let mut app = chat_app();
        app.begin_turn();
        type_text(&mut app, "x");
        assert!(app.input.is_empty());
        assert_eq!(app.handle_key(ctrl('l')), Action::None);
        assert_eq!(app.handle_key(ctrl('c')), Action::Quit);
    }

    #[test]
    fn test_drain_applies_events_queued_after_the_turn() {
        let mut app = chat_app();
        app.begin_turn();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(AgentEvent::ToolCall {
            tool: "sql_db_query".to_string(),
            input: "SELECT COUNT(*) FROM STUDENT".to_string(),
        })
        .unwrap();
        tx.send(AgentEvent::ToolResult {
            tool: "sql_db_query".to_string(),
            output: "(5)".to_string(),
        })
        .unwrap();
        tx.send(AgentEvent::Token("There are 5.".to_string())).unwrap();
        drop(tx);

        assert_eq!(app.drain_events(&mut rx), 3);
        assert_eq!(app.activity.len(), 2);
        assert_eq!(
            app.activity[1],
            Activity::ToolResult {
                tool: "sql_db_query".to_string(),
                output: "(5)".to_string()
            }
        );
        assert_eq!(app.streaming, "There are 5.");
        assert_eq!(app.drain_events(&mut rx), 0);
    }

    #[test]
    fn test_streamed_text_before_tool_call_becomes_thought() {
        let mut app = chat_app();
        app.begin_turn();
        app.apply_event(AgentEvent::Token("Let me check ".to_string()));
        app.apply_event(AgentEvent::Token("the tables.".to_string()));
        app.apply_event(AgentEvent::ToolCall {
            tool: "sql_db_list_tables".to_string(),
            input: "{}".to_string(),
        });
        app.apply_event(AgentEvent::Token("Five".to_string()));

        assert_eq!(
            app.activity,
            vec![
                Activity::Thought("Let me check the tables.".to_string()),
                Activity::ToolCall {
                    tool: "sql_db_list_tables".to_string(),
                    input: "{}".to_string()
                },
            ]
        );
        assert_eq!(app.streaming, "Five");

        app.end_turn();
        assert!(app.activity.is_empty());
        assert!(!app.is_busy());
    }

    #[test]
    fn test_connect_failure_stays_on_setup() {
        let mut app = App::new(&FormInput::default());
        app.begin_connect();
        assert!(app.is_busy());
        app.connect_failed("Please enter your API key".to_string());
        assert_eq!(app.screen, Screen::Setup);
        assert_eq!(app.setup_error.as_deref(), Some("Please enter your API key"));
    }
}
