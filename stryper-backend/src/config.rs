use chrono::{FixedOffset, NaiveTime, Weekday};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::validators::LinkMatcher;

const DEFAULT_CHANNEL_URL: &str = "http://www.youtube.com/channel/UC20qdRIIoh4Xr6jnmZ4HBng";
const DEFAULT_LINK_PREFIXES: &str = "https://www.youtube.com/watch?v=,https://youtu.be/";
const DEFAULT_LINK_ID_LEN: usize = 11;

#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub channel_id: u64,
    pub is_debugging: bool,
    pub privileged_members: HashSet<String>,
    pub data_file: PathBuf,
    pub command_prefix: String,
    pub trigger: TriggerConfig,
    pub signals: SignalConfig,
    /// Channel page a link must belong to for it to count as a ritual link
    pub ritual_channel_url: String,
    pub history_timeout: Duration,
}

/// When the weekly check fires. The time fires daily; the weekday is checked
/// inside the firing.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerConfig {
    pub time: NaiveTime,
    pub day: Weekday,
    pub timezone: FixedOffset,
}

/// What the clump analyzer looks for in chat history.
#[derive(Clone, Debug)]
pub struct SignalConfig {
    pub ritual_phrase: String,
    pub rating_keyword: String,
    pub link_matcher: LinkMatcher,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bot_token = lookup("STRYPER_BOT_TOKEN").ok_or("STRYPER_BOT_TOKEN must be set")?;

        let is_debugging = parse_bool(&get("IS_DEBUGGING", "true"))
            .ok_or("IS_DEBUGGING must be true or false")?;
        let channel_key = if is_debugging {
            "DEBUG_CHANNEL_ID"
        } else {
            "DEPLOYED_CHANNEL_ID"
        };
        let channel_id = lookup(channel_key)
            .ok_or_else(|| format!("{} must be set", channel_key))?
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("{} must be a valid channel id", channel_key))?;

        let author_name = lookup("AUTHOR_NAME").ok_or("AUTHOR_NAME must be set")?;
        let privileged_members = privileged_members(&get("PRIVILEGED_MEMBER_NAMES", ""), &author_name);

        let time = NaiveTime::parse_from_str(get("TRIGGER_TIME", "19:29").trim(), "%H:%M")
            .map_err(|_| "TRIGGER_TIME must be HH:MM".to_string())?;
        let day = get("TRIGGER_DAY", "Saturday")
            .trim()
            .parse::<Weekday>()
            .map_err(|_| "TRIGGER_DAY must be a weekday name".to_string())?;
        let offset_minutes: i32 = get("TIMEZONE_OFFSET_MINUTES", "630")
            .trim()
            .parse()
            .map_err(|_| "TIMEZONE_OFFSET_MINUTES must be a number".to_string())?;
        let timezone = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or("TIMEZONE_OFFSET_MINUTES is out of range")?;

        let id_len: usize = get("RITUAL_LINK_ID_LEN", &DEFAULT_LINK_ID_LEN.to_string())
            .trim()
            .parse()
            .map_err(|_| "RITUAL_LINK_ID_LEN must be a number".to_string())?;
        let prefixes = split_list(&get("RITUAL_LINK_PREFIXES", DEFAULT_LINK_PREFIXES));
        if prefixes.is_empty() {
            return Err("RITUAL_LINK_PREFIXES must name at least one prefix".to_string());
        }

        let history_timeout_secs: u64 = get("HISTORY_FETCH_TIMEOUT_SECS", "30")
            .trim()
            .parse()
            .map_err(|_| "HISTORY_FETCH_TIMEOUT_SECS must be a number".to_string())?;

        Ok(Self {
            bot_token,
            channel_id,
            is_debugging,
            privileged_members,
            data_file: PathBuf::from(get("DATA_FILE", "data.json")),
            command_prefix: get("COMMAND_PREFIX", "."),
            trigger: TriggerConfig {
                time,
                day,
                timezone,
            },
            signals: SignalConfig {
                ritual_phrase: get("RITUAL_PHRASE", "Stryper Saturday"),
                rating_keyword: get("RATING_KEYWORD", "rating"),
                link_matcher: LinkMatcher::new(prefixes, id_len),
            },
            ritual_channel_url: get("RITUAL_CHANNEL_URL", DEFAULT_CHANNEL_URL),
            history_timeout: Duration::from_secs(history_timeout_secs),
        })
    }

    pub fn is_privileged(&self, member_name: &str) -> bool {
        self.privileged_members.contains(member_name)
    }
}

impl TriggerConfig {
    /// Daily cron expression (sec min hour dom month dow) for the trigger time.
    pub fn cron_expression(&self) -> String {
        use chrono::Timelike;
        format!("0 {} {} * * *", self.time.minute(), self.time.hour())
    }

    pub fn setup_message(&self) -> String {
        format!(
            "Trigger time set for {} @ {}",
            weekday_name(self.day),
            self.time.format("%H:%M")
        )
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn privileged_members(names: &str, author_name: &str) -> HashSet<String> {
    let mut members: HashSet<String> = split_list(names).into_iter().collect();
    members.insert(author_name.trim().to_string());
    members
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
