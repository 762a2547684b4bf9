//! Line-oriented mode for SQLChat.
//!
//! Reads one question per line and writes agent progress and answers as
//! plain text. Lines starting with `/` are commands.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

use crate::agent::{AgentEvent, EventSink};
use crate::error::{ChatError, Result};
use crate::session::{Session, Turn, AUDIT_PREVIEW_ENTRIES};

/// Tool output longer than this is cut when echoed.
const MAX_TOOL_OUTPUT_CHARS: usize = 500;

const HELP_TEXT: &str = "Commands:
  /clear        Clear the chat history
  /clear-audit  Clear the audit log
  /audit        Show recent questions
  /tables       Show the database tables
  /help         Show this help
  /quit         Exit";

fn io_error(e: std::io::Error) -> ChatError {
    ChatError::internal(format!("Failed to write output: {e}"))
}

/// Writes agent events as they arrive.
struct PlainRenderer<'a, W: Write + Send> {
    out: &'a mut W,
    /// Text streamed since the last tool event.
    streamed: String,
}

impl<'a, W: Write + Send> PlainRenderer<'a, W> {
    fn new(out: &'a mut W) -> Self {
        Self {
            out,
            streamed: String::new(),
        }
    }

    fn end_stream(&mut self) {
        if !self.streamed.is_empty() {
            let _ = writeln!(self.out);
            self.streamed.clear();
        }
    }

    /// Prints the assistant turn unless it was already streamed verbatim.
    fn finish(mut self, turn: &Turn) -> std::io::Result<()> {
        let already_shown = self.streamed.trim() == turn.content;
        if already_shown {
            writeln!(self.out)?;
        } else {
            self.end_stream();
            writeln!(self.out, "{}", turn.content)?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl<W: Write + Send> EventSink for PlainRenderer<'_, W> {
    // Sinks cannot fail, so write errors are dropped here.
    fn emit(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::Token(text) => {
                self.streamed.push_str(&text);
                let _ = write!(self.out, "{text}");
                let _ = self.out.flush();
            }
            AgentEvent::Thought(text) => {
                let _ = writeln!(self.out, "  thought: {text}");
            }
            AgentEvent::ToolCall { tool, input } => {
                self.end_stream();
                let _ = writeln!(self.out, "  -> {tool} {input}");
            }
            AgentEvent::ToolResult { output, .. } => {
                let _ = writeln!(self.out, "  <- {}", truncate(&output, MAX_TOOL_OUTPUT_CHARS));
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " | ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars).collect();
    format!("{cut}...")
}

/// Prints the connection, tables and previews shown before the first question.
fn write_banner<W: Write>(session: &Session, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Connected to {}", session.connection().display_string())?;
    write_tables(session, out)?;
    if let Some(turn) = session.conversation().last() {
        writeln!(out, "{}", turn.content)?;
    }
    writeln!(out)?;
    out.flush()
}

fn write_tables<W: Write>(session: &Session, out: &mut W) -> std::io::Result<()> {
    if let Some(error) = session.schema_error() {
        writeln!(out, "Error loading database information: {error}")?;
        return Ok(());
    }
    if session.tables().is_empty() {
        writeln!(out, "No tables found.")?;
        return Ok(());
    }
    writeln!(out, "Tables: {}", session.tables().join(", "))?;
    for preview in session.previews() {
        match &preview.result {
            Ok(result) => {
                let header = result
                    .columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(out, "{} ({header}):", preview.table)?;
                writeln!(out, "{}", result.to_tuple_text())?;
            }
            Err(e) => writeln!(out, "{}: preview failed: {}", preview.table, e.message())?,
        }
    }
    Ok(())
}

fn write_audit<W: Write>(session: &Session, out: &mut W) -> std::io::Result<()> {
    let recent = session.audit().recent(AUDIT_PREVIEW_ENTRIES);
    if recent.is_empty() {
        return writeln!(out, "No questions yet.");
    }
    for entry in recent {
        writeln!(out, "[{}] {}", entry.timestamp, entry.query_preview())?;
    }
    Ok(())
}

/// Answers questions from `input` until it ends or `/quit` is read.
pub async fn run<R, W>(session: &mut Session, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
{
    write_banner(session, out).map_err(io_error)?;

    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| ChatError::internal(format!("Failed to read input: {e}")))?
    {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => writeln!(out, "{HELP_TEXT}").map_err(io_error)?,
            "/clear" => {
                session.clear_chat();
                writeln!(out, "Chat history cleared.").map_err(io_error)?;
            }
            "/clear-audit" => {
                session.clear_audit();
                writeln!(out, "Audit log cleared.").map_err(io_error)?;
            }
            "/audit" => write_audit(session, out).map_err(io_error)?,
            "/tables" => write_tables(session, out).map_err(io_error)?,
            question => {
                let mut renderer = PlainRenderer::new(out);
                if let Some(turn) = session.ask(question, &mut renderer).await? {
                    renderer.finish(&turn).map_err(io_error)?;
                }
            }
        }
    }

    info!(
        turns = session.conversation().len(),
        audited = session.audit().len(),
        "Plain session finished"
    );
    Ok(())
}
