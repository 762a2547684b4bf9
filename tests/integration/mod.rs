//! Integration tests for SQLChat.

pub mod agent_test;
pub mod common;
pub mod connection_test;
pub mod session_test;
