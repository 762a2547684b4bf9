//! Terminal event polling.

use crate::error::{ChatError, Result};
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;

/// Default redraw interval.
const TICK_RATE_MS: u64 = 100;

/// Application events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// The terminal was resized.
    Resize(u16, u16),
    /// Nothing happened within the tick rate.
    Tick,
}

/// Polls crossterm events off the async runtime.
#[derive(Debug, Clone, Copy)]
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(TICK_RATE_MS),
        }
    }

    pub fn with_tick_rate(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    /// Waits up to one tick for the next event.
    pub async fn next(&self) -> Result<Event> {
        let tick_rate = self.tick_rate;
        tokio::task::spawn_blocking(move || poll_event(tick_rate))
            .await
            .map_err(|e| ChatError::internal(format!("Event task failed: {e}")))?
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn poll_event(tick_rate: Duration) -> Result<Event> {
    if !event::poll(tick_rate)
        .map_err(|e| ChatError::internal(format!("Failed to poll events: {e}")))?
    {
        return Ok(Event::Tick);
    }

    let event =
        event::read().map_err(|e| ChatError::internal(format!("Failed to read event: {e}")))?;
    Ok(from_crossterm(event))
}

fn from_crossterm(event: CrosstermEvent) -> Event {
    match event {
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
        CrosstermEvent::Resize(width, height) => Event::Resize(width, height),
        _ => Event::Tick,
    }
}
