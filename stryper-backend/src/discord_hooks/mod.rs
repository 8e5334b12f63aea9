//! Discord-facing surface: chat commands and channel history access

pub mod commands;
pub mod history;
