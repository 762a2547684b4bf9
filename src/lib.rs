//! SQLChat: ask questions about a SQLite or MySQL database in plain language.
//!
//! The library exposes the core modules for the binary and integration tests.

pub mod agent;
pub mod app;
pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod inspect;
pub mod llm;
pub mod logging;
pub mod plain;
pub mod session;
pub mod tui;
pub mod validate;
