use super::{Author, HistoricalMessage, RecognizedLinks};
use crate::config::SignalConfig;

/// The three things a ritual message can show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub ritual_phrase: bool,
    pub rating_keyword: bool,
    pub ritual_link: bool,
}

impl Signals {
    pub fn any(&self) -> bool {
        self.ritual_phrase || self.rating_keyword || self.ritual_link
    }

    pub fn all(&self) -> bool {
        self.ritual_phrase && self.rating_keyword && self.ritual_link
    }

    fn or(self, other: Signals) -> Signals {
        Signals {
            ritual_phrase: self.ritual_phrase || other.ritual_phrase,
            rating_keyword: self.rating_keyword || other.rating_keyword,
            ritual_link: self.ritual_link || other.ritual_link,
        }
    }
}

impl From<(bool, bool, bool)> for Signals {
    fn from((ritual_phrase, rating_keyword, ritual_link): (bool, bool, bool)) -> Self {
        Self {
            ritual_phrase,
            rating_keyword,
            ritual_link,
        }
    }
}

/// Consecutive qualifying messages by one author, in retrieval order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clump {
    pub author: Author,
    pub signals: Vec<Signals>,
}

impl Clump {
    fn new(author: Author) -> Self {
        Self {
            author,
            signals: Vec::new(),
        }
    }

    /// Per-signal OR across every message of the clump.
    pub fn column_or(&self) -> Signals {
        self.signals
            .iter()
            .fold(Signals::default(), |acc, s| acc.or(*s))
    }

    /// All three signals appear somewhere in the clump.
    pub fn is_enacted(&self) -> bool {
        self.column_or().all()
    }
}

/// Tag one message's content.
pub fn message_signals(content: &str, config: &SignalConfig, recognized: &RecognizedLinks) -> Signals {
    let lowered = content.to_lowercase();
    Signals {
        ritual_phrase: lowered.contains(&config.ritual_phrase.to_lowercase()),
        rating_keyword: lowered.contains(&config.rating_keyword.to_lowercase()),
        ritual_link: config
            .link_matcher
            .candidates(content)
            .iter()
            .any(|candidate| recognized.contains(candidate)),
    }
}

/// Distinct link candidates in non-bot messages, for classifying ahead of analysis.
pub fn link_candidates(messages: &[HistoricalMessage], bot_id: &str, config: &SignalConfig) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    for msg in messages.iter().filter(|m| m.author.id != bot_id) {
        for candidate in config.link_matcher.candidates(&msg.content) {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

#[derive(Default)]
struct ClumpFold {
    done: Vec<Clump>,
    current: Option<Clump>,
}

impl ClumpFold {
    fn step(mut self, author: &Author, signals: Signals) -> Self {
        let same_author = self
            .current
            .as_ref()
            .is_some_and(|clump| clump.author == *author);
        if !same_author {
            self.flush();
            self.current = Some(Clump::new(author.clone()));
        }
        // Messages without a signal add nothing but keep the run going.
        if signals.any() {
            if let Some(clump) = self.current.as_mut() {
                clump.signals.push(signals);
            }
        }
        self
    }

    fn flush(&mut self) {
        if let Some(clump) = self.current.take() {
            if !clump.signals.is_empty() {
                self.done.push(clump);
            }
        }
    }

    fn finish(mut self) -> Vec<Clump> {
        self.flush();
        self.done
    }
}

/// Group `messages` (kept in the order given) into per-author runs.
///
/// The bot's own messages are removed before grouping, so they never split a run.
/// Any other author's message ends the current run, even one with no signals.
pub fn build_clumps(
    messages: &[HistoricalMessage],
    bot_id: &str,
    config: &SignalConfig,
    recognized: &RecognizedLinks,
) -> Vec<Clump> {
    messages
        .iter()
        .filter(|m| m.author.id != bot_id)
        .fold(ClumpFold::default(), |fold, msg| {
            fold.step(&msg.author, message_signals(&msg.content, config, recognized))
        })
        .finish()
}
