//! Widgets for the SQLChat terminal UI.

pub mod chat;
pub mod form;
pub mod header;
pub mod input;
pub mod sidebar;
pub mod spinner;
pub mod table;
