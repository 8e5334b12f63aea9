//! Shared helpers for posting to chat.

/// Discord rejects messages longer than this many characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Split a message into chunks of at most `max_len` characters.
/// Splits on line boundaries; lines exceeding `max_len` are hard-split.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let line_len = line.chars().count();
        let current_len = current.chars().count();
        if current_len + line_len + 1 > max_len {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if line_len > max_len {
                let chars: Vec<char> = line.chars().collect();
                let mut pieces = chars.chunks(max_len).map(|c| c.iter().collect::<String>());
                let mut last = pieces.next();
                for piece in pieces {
                    if let Some(full) = last.replace(piece) {
                        chunks.push(full);
                    }
                }
                current = last.unwrap_or_default();
            } else {
                current = line.to_string();
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
