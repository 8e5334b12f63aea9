//! Shared types for the song catalog and the commands that read it.

use serde::{Deserialize, Deserializer, Serialize};

// =====================================================
// Placeholders
// =====================================================

pub const TITLE_TOKEN: &str = "{title}";
pub const RATING_TOKEN: &str = "{rating}";
pub const URL_TOKEN: &str = "{url}";
pub const NOTES_TOKEN: &str = "{notes}";

/// Template written into an empty catalog the first time one is needed.
pub const DEFAULT_TEMPLATE: &str = "***Hello everybody and WELCOME to Stryper Saturday!!!*** \n\
    Today is the amazing song *{title}*, with a rating of {rating}/10: {url}";

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 10.0;

// =====================================================
// Domain Types
// =====================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub url: String,
    #[serde(deserialize_with = "rating_from_number_or_string")]
    pub rating: f64,
    #[serde(default, deserialize_with = "notes_from_string_or_list")]
    pub notes: String,
}

impl Song {
    /// Build a song, rejecting ratings outside `[0, 10]`.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        rating: f64,
        notes: impl Into<String>,
    ) -> Result<Self, String> {
        if !is_rating_in_range(rating) {
            return Err(format!(
                "rating {} is outside {}..={}",
                rating, MIN_RATING, MAX_RATING
            ));
        }
        Ok(Self {
            title: title.into(),
            url: url.into(),
            rating,
            notes: notes.into(),
        })
    }

    pub fn rating_display(&self) -> String {
        format_rating(self.rating)
    }
}

/// A message template. Construction through [`Template::parse`] guarantees the
/// three required placeholders; templates read back from disk are trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    pub fn parse(text: impl Into<String>) -> Result<Self, TemplateCheck> {
        let text = text.into();
        let check = TemplateCheck::of(&text);
        if check.is_valid() {
            Ok(Self(text))
        } else {
            Err(check)
        }
    }

    pub fn default_greeting() -> Self {
        Self(DEFAULT_TEMPLATE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which required placeholders a candidate template carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateCheck {
    pub has_title: bool,
    pub has_rating: bool,
    pub has_url: bool,
}

impl TemplateCheck {
    pub fn of(text: &str) -> Self {
        Self {
            has_title: text.contains(TITLE_TOKEN),
            has_rating: text.contains(RATING_TOKEN),
            has_url: text.contains(URL_TOKEN),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.has_title && self.has_rating && self.has_url
    }

    /// Placeholders that are absent, in title/rating/url order.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_title {
            missing.push(TITLE_TOKEN);
        }
        if !self.has_rating {
            missing.push(RATING_TOKEN);
        }
        if !self.has_url {
            missing.push(URL_TOKEN);
        }
        missing
    }
}

/// The whole persisted catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub songs: Vec<Song>,
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl Catalog {
    pub fn find_song(&self, url: &str) -> Option<usize> {
        self.songs.iter().position(|s| s.url == url)
    }

    pub fn has_template(&self, template: &Template) -> bool {
        self.templates.iter().any(|t| t == template)
    }
}

// =====================================================
// Helpers
// =====================================================

pub fn is_rating_in_range(rating: f64) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}

/// Integral ratings print without a fractional part (`9`, not `9.0`).
pub fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 && rating.abs() < 1e15 {
        format!("{}", rating as i64)
    } else {
        format!("{}", rating)
    }
}

// Older catalog files stored the rating exactly as typed, e.g. "8.5".
fn rating_from_number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid rating '{}': {}", s, e))),
    }
}

// ...and sometimes the notes as the list of words the chat command received.
fn notes_from_string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Words(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Words(words) => words.join(" "),
    })
}
