//! Chat commands: `.add`, `.update`, `.random` and friends

mod help;
pub mod songs;
pub mod templates;

use crate::catalog::CatalogStore;
use crate::config::TriggerConfig;
use crate::validators::LinkClassifier;

/// Available commands
#[derive(Debug, PartialEq)]
pub enum Command {
    /// Liveness check: `alive`
    Alive,
    /// Show help: `help`
    Help,
    /// Post a random song: `random`
    Random,
    /// Add a song: `add <url> <rating> [notes...]`
    Add {
        url: String,
        rating: String,
        notes: String,
    },
    /// Change rating and notes: `update <url> <rating> [notes...]`
    Update {
        url: String,
        rating: String,
        notes: String,
    },
    /// Remove a song by index: `remove <index>`
    Remove(String),
    /// List songs: `songs`
    Songs,
    /// Add a template: `add_template <text...>`
    AddTemplate(String),
    /// Remove a template by index: `remove_template <index>`
    RemoveTemplate(String),
    /// List templates: `templates`
    Templates,
}

impl Command {
    /// Commands that change or post from the catalog are limited to privileged members.
    pub fn requires_privilege(&self) -> bool {
        !matches!(
            self,
            Command::Alive | Command::Help | Command::Songs | Command::Templates
        )
    }
}

/// Result of running a command: whether it succeeded and the messages to post, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReply {
    pub success: bool,
    pub messages: Vec<String>,
}

impl CommandReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            messages: vec![message.into()],
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![message.into()],
        }
    }
}

/// Parse a command from text starting with `prefix`
pub fn parse(text: &str, prefix: &str) -> Option<Command> {
    let rest = text.trim().strip_prefix(prefix)?;
    let (word, args) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    let args = args.trim();
    let parts: Vec<&str> = args.split_whitespace().collect();

    log::debug!(
        "Discord commands: Parsing '{}' -> '{}' with {} args",
        text,
        word,
        parts.len()
    );

    let command = word.to_lowercase();
    match command.as_str() {
        "alive" => Some(Command::Alive),
        "help" | "?" => Some(Command::Help),
        "random" => Some(Command::Random),
        "add" | "update" => {
            if parts.len() < 2 {
                log::warn!("Discord commands: '{}' needs a url and a rating", command);
                return None;
            }
            let url = parts[0].to_string();
            let rating = parts[1].to_string();
            let notes = parts[2..].join(" ");
            if command == "add" {
                Some(Command::Add { url, rating, notes })
            } else {
                Some(Command::Update { url, rating, notes })
            }
        }
        "remove" => parts.first().map(|i| Command::Remove(i.to_string())),
        "songs" | "list" => Some(Command::Songs),
        "add_template" => {
            if args.is_empty() {
                log::warn!("Discord commands: 'add_template' parsed but no template text found");
                return None;
            }
            Some(Command::AddTemplate(args.to_string()))
        }
        "remove_template" => parts.first().map(|i| Command::RemoveTemplate(i.to_string())),
        "templates" => Some(Command::Templates),
        _ => {
            log::debug!("Discord commands: Unknown command '{}'", command);
            None
        }
    }
}

/// Execute a command and return the reply
pub async fn execute(
    cmd: Command,
    prefix: &str,
    trigger: &TriggerConfig,
    ritual_phrase: &str,
    store: &CatalogStore,
    classifier: &dyn LinkClassifier,
) -> CommandReply {
    let reply = match cmd {
        Command::Alive => CommandReply::ok("*I AM ALIVE!!!*"),
        Command::Help => CommandReply::ok(help::execute(prefix, trigger, ritual_phrase)),
        Command::Random => songs::random_song(store),
        Command::Add { url, rating, notes } => {
            songs::add(store, classifier, prefix, &url, &rating, &notes).await
        }
        Command::Update { url, rating, notes } => {
            songs::update(store, classifier, &url, &rating, &notes).await
        }
        Command::Remove(index) => songs::remove_song(store, &index),
        Command::Songs => songs::list_songs(store),
        Command::AddTemplate(text) => templates::add_template(store, &text),
        Command::RemoveTemplate(index) => templates::remove_template(store, &index),
        Command::Templates => templates::list_templates(store),
    };
    log::info!(
        "Discord commands: success={} reply={:?}",
        reply.success,
        reply.messages
    );
    reply
}

/// Message shown when a user tries to run a privileged command
pub fn permission_denied_message(prefix: &str) -> String {
    format!(
        "You don't have permission to run that command.\n\n\
        **Available commands:**\n\
        - `{p}alive` - Check that the bot is running\n\
        - `{p}songs` - List the song catalog\n\
        - `{p}templates` - List the message templates\n\
        - `{p}help` - Show available commands",
        p = prefix
    )
}

/// Parse a catalog index argument.
pub(crate) fn parse_index(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok()
}
