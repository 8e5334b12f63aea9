//! Reading channel history and posting through the Discord HTTP API

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, GetMessages, Http, Message, MessageId};
use std::sync::Arc;

use crate::channels::util::{DISCORD_MESSAGE_LIMIT, split_message};
use crate::enactment::{Author, HistoricalMessage};
use crate::scheduler::{ChannelHistory, ChannelPoster};

/// Milliseconds between the Unix epoch and the first second of 2015 (Discord's epoch).
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Discord returns at most this many messages per request.
const PAGE_SIZE: u8 = 100;

/// Stop paging after this many requests.
const MAX_PAGES: usize = 50;

/// Smallest message id created at or after `at`.
pub fn snowflake_at(at: DateTime<Utc>) -> u64 {
    let ms = (at.timestamp_millis() - DISCORD_EPOCH_MS).max(0) as u64;
    (ms << 22).max(1)
}

/// True when paging stopped at the cap while full pages were still arriving.
fn history_truncated(pages: usize, last_count: usize) -> bool {
    pages >= MAX_PAGES && last_count >= PAGE_SIZE as usize
}

pub struct DiscordHistory {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordHistory {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl ChannelHistory for DiscordHistory {
    async fn fetch(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<HistoricalMessage>, String> {
        let mut after = MessageId::new(snowflake_at(since));
        let mut collected: Vec<Message> = Vec::new();
        let mut pages = 0;
        let mut last_count = 0;

        while pages < MAX_PAGES {
            let batch = self
                .channel_id
                .messages(&self.http, GetMessages::new().after(after).limit(PAGE_SIZE))
                .await
                .map_err(|e| format!("Failed to read channel history: {}", e))?;

            pages += 1;
            last_count = batch.len();
            if let Some(newest) = batch.iter().map(|m| m.id).max() {
                after = newest;
            }
            collected.extend(batch);
            if last_count < PAGE_SIZE as usize {
                break;
            }
        }

        if history_truncated(pages, last_count) {
            log::warn!(
                "Discord: Stopped after {} pages of channel {}, later messages were not read",
                MAX_PAGES,
                self.channel_id
            );
        }

        let until_secs = until.timestamp();
        collected.retain(|m| m.timestamp.unix_timestamp() <= until_secs);
        // Newest first, regardless of how the pages arrived.
        collected.sort_by(|a, b| b.id.cmp(&a.id));

        log::debug!(
            "Discord: Read {} messages from channel {}",
            collected.len(),
            self.channel_id
        );

        Ok(collected
            .into_iter()
            .map(|m| HistoricalMessage {
                author: Author::new(m.author.id.to_string(), m.author.name.clone()),
                posted_at: DateTime::from_timestamp(m.timestamp.unix_timestamp(), 0).unwrap_or(until),
                content: m.content,
            })
            .collect())
    }
}

pub struct DiscordPoster {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordPoster {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl ChannelPoster for DiscordPoster {
    async fn post(&self, text: &str) -> Result<(), String> {
        for chunk in split_message(text, DISCORD_MESSAGE_LIMIT) {
            self.channel_id
                .say(&self.http, &chunk)
                .await
                .map_err(|e| format!("Failed to send Discord message: {}", e))?;
        }
        Ok(())
    }
}
