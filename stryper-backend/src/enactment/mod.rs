//! Detecting whether the weekly ritual was already carried out in chat.
//!
//! History arrives newest-first. [`clumps::build_clumps`] folds it into runs of
//! consecutive messages by one author, tagging each qualifying message with three
//! signals, and [`resolver::resolve`] turns those runs into the action to take.
//! Both are pure; any link lookups happen before analysis starts.

pub mod clumps;
pub mod resolver;

use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub use clumps::{Clump, build_clumps};
pub use resolver::{Enactment, resolve};

/// Chat member identity as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Platform mention markup.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// One message from channel history.
#[derive(Debug, Clone)]
pub struct HistoricalMessage {
    pub author: Author,
    pub content: String,
    pub posted_at: DateTime<Utc>,
}

/// Canonical links the classifier recognized as ritual links.
pub type RecognizedLinks = HashSet<String>;
