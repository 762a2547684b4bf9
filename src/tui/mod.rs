//! Terminal user interface for SQLChat.
//!
//! Shows the setup form until a session starts, then the chat screen with the
//! audit log and schema preview alongside. Startup and answers run inside the
//! event loop so the screen keeps redrawing (and Ctrl+C keeps working) while
//! they are in flight.

pub mod app;
mod events;
mod ui;
pub mod widgets;

pub use app::App;
pub use events::{Event, EventHandler};

use crate::agent::AgentEvent;
use crate::app::Orchestrator;
use crate::error::{ChatError, Result};
use crate::session::Session;
use crate::validate::FormInput;
use app::Action;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::future::Future;
use std::io::{self, Stdout};
use std::panic;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Owns the terminal for the lifetime of the UI.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    events: EventHandler,
}

impl Tui {
    pub fn new() -> Result<Self> {
        enable_raw_mode()
            .map_err(|e| ChatError::internal(format!("Failed to enable raw mode: {e}")))?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)
            .map_err(|e| ChatError::internal(format!("Failed to enter alternate screen: {e}")))?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))
            .map_err(|e| ChatError::internal(format!("Failed to create terminal: {e}")))?;

        Ok(Self {
            terminal,
            events: EventHandler::new(),
        })
    }

    fn restore_terminal(&mut self) -> Result<()> {
        disable_raw_mode()
            .map_err(|e| ChatError::internal(format!("Failed to disable raw mode: {e}")))?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| ChatError::internal(format!("Failed to leave alternate screen: {e}")))?;
        self.terminal
            .show_cursor()
            .map_err(|e| ChatError::internal(format!("Failed to show cursor: {e}")))?;
        Ok(())
    }

    fn draw(&mut self, app: &App, session: Option<&Session>) -> Result<()> {
        self.terminal
            .draw(|frame| ui::render(frame, app, session))
            .map_err(|e| ChatError::internal(format!("Failed to draw: {e}")))?;
        Ok(())
    }

    /// Runs until the user quits.
    pub async fn run(&mut self, orchestrator: &Orchestrator, form: &FormInput) -> Result<()> {
        let mut app = App::new(form);
        let mut session: Option<Session> = None;

        while app.running {
            self.draw(&app, session.as_ref())?;

            let Event::Key(key) = self.events.next().await? else {
                continue;
            };

            match app.handle_key(key) {
                Action::None => {}
                Action::Quit => app.running = false,
                Action::Connect(form) => {
                    if let Some(started) = self.connect(&mut app, orchestrator, &form).await? {
                        session = Some(started);
                    }
                }
                Action::Submit(question) => {
                    if let Some(session) = session.as_mut() {
                        self.ask(&mut app, session, &question).await?;
                    }
                }
                Action::ClearChat => {
                    if let Some(session) = session.as_mut() {
                        session.clear_chat();
                    }
                }
                Action::ClearAudit => {
                    if let Some(session) = session.as_mut() {
                        session.clear_audit();
                    }
                }
            }
        }

        info!("TUI closed");
        Ok(())
    }

    async fn connect(
        &mut self,
        app: &mut App,
        orchestrator: &Orchestrator,
        form: &FormInput,
    ) -> Result<Option<Session>> {
        app.begin_connect();
        let (_tx, mut rx) = mpsc::unbounded_channel();

        match self.drive(app, None, orchestrator.start(form), &mut rx).await? {
            Some(Ok(session)) => {
                app.connected();
                Ok(Some(session))
            }
            Some(Err(e)) => {
                warn!(error = %e, "Session start failed");
                app.connect_failed(e.to_string());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn ask(&mut self, app: &mut App, session: &mut Session, question: &str) -> Result<()> {
        let pending = match session.submit(question) {
            Ok(Some(pending)) => pending,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!(error = %e, "Question rejected");
                return Ok(());
            }
        };

        app.begin_turn();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let turn = async move {
            let mut sink = tx;
            pending.run(&mut sink).await
        };

        let outcome = self.drive(app, Some(&*session), turn, &mut rx).await?;
        if let Some(outcome) = outcome {
            session.complete(outcome);
        }
        app.end_turn();
        Ok(())
    }

    /// Polls `work` to completion while redrawing and applying agent events.
    ///
    /// Returns `None` if the user quit first; `work` is dropped in that case.
    async fn drive<F: Future>(
        &mut self,
        app: &mut App,
        session: Option<&Session>,
        work: F,
        events: &mut mpsc::UnboundedReceiver<AgentEvent>,
    ) -> Result<Option<F::Output>> {
        tokio::pin!(work);
        let handler = self.events;

        loop {
            self.draw(app, session)?;

            tokio::select! {
                biased;
                Some(event) = events.recv() => app.apply_event(event),
                output = &mut work => {
                    app.drain_events(events);
                    return Ok(Some(output));
                }
                event = handler.next() => {
                    if let Event::Key(key) = event? {
                        if app.handle_key(key) == Action::Quit {
                            app.running = false;
                            return Ok(None);
                        }
                    }
                }
            }
        }
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

/// Runs the TUI, restoring the terminal on exit and on panic.
pub async fn run(orchestrator: &Orchestrator, form: &FormInput) -> Result<()> {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = match Tui::new() {
        Ok(mut tui) => tui.run(orchestrator, form).await,
        Err(e) => Err(e),
    };

    let _ = panic::take_hook();
    result
}
