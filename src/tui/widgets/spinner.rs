//! Animated activity indicator.

use std::time::Instant;

/// Braille spinner frames for long-running startup work.
const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Dot animation frames while the agent works.
const DOT_FRAMES: &[&str] = &["", ".", "..", "..."];

/// Animation speed in milliseconds per frame.
const FRAME_DURATION_MS: u128 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerType {
    Braille,
    Dots,
}

#[derive(Debug, Clone)]
pub struct Spinner {
    spinner_type: SpinnerType,
    start_time: Instant,
    label: String,
}

impl Spinner {
    pub fn new(spinner_type: SpinnerType, label: impl Into<String>) -> Self {
        Self {
            spinner_type,
            start_time: Instant::now(),
            label: label.into(),
        }
    }

    /// Spinner shown while the agent answers.
    pub fn thinking() -> Self {
        Self::new(SpinnerType::Dots, "Thinking")
    }

    /// Spinner for startup steps such as connecting.
    pub fn command(label: impl Into<String>) -> Self {
        Self::new(SpinnerType::Braille, label)
    }

    pub fn frame(&self) -> &'static str {
        let frame_index = (self.start_time.elapsed().as_millis() / FRAME_DURATION_MS) as usize;
        match self.spinner_type {
            SpinnerType::Braille => BRAILLE_FRAMES[frame_index % BRAILLE_FRAMES.len()],
            SpinnerType::Dots => DOT_FRAMES[frame_index % DOT_FRAMES.len()],
        }
    }

    pub fn display(&self) -> String {
        match self.spinner_type {
            SpinnerType::Braille => format!("{} {}", self.frame(), self.label),
            SpinnerType::Dots => format!("{}{}", self.label, self.frame()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
