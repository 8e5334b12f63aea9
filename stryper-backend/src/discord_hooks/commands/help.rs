//! Help command - shows available commands

use crate::config::{TriggerConfig, weekday_name};

/// Execute the help command
pub fn execute(prefix: &str, trigger: &TriggerConfig, ritual_phrase: &str) -> String {
    let commands = "**Stryper Bot Commands**\n\n\
    **For everyone:**\n\
    - `.alive` - Check that the bot is running\n\
    - `.songs` - List the song catalog with indices\n\
    - `.templates` - List the message templates with indices\n\
    - `.help` - Show this help message\n\n\
    **Privileged members:**\n\
    - `.random` - Post a random song\n\
    - `.add <youtube url> <rating 0-10> [notes]` - Add a song\n\
    - `.update <youtube url> <rating 0-10> [notes]` - Change a song's rating and notes\n\
    - `.remove <index>` - Remove a song\n\
    - `.add_template <text>` - Add a template using {title}, {rating}, {url} and optionally {notes}\n\
    - `.remove_template <index>` - Remove a template\n\n"
        .replace("`.", &format!("`{}", prefix));

    format!(
        "{}Every {} at {} the bot checks whether someone already did {}, \
        and posts a pick if nobody did.",
        commands,
        weekday_name(trigger.day),
        trigger.time.format("%H:%M"),
        ritual_phrase
    )
}
