//! User input validation: ratings, link canonicalization and the link classifier.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Returns true when `raw` parses as a number in `[0, 10]`.
pub fn validate_rating(raw: &str) -> bool {
    match parse_rating(raw) {
        Some(rating) => catalog_types::is_rating_in_range(rating),
        None => false,
    }
}

/// Fallible numeric parse used by `validate_rating`. `NaN` and infinities are refused.
pub fn parse_rating(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(rating) if rating.is_finite() => Some(rating),
        Ok(_) => None,
        Err(e) => {
            log::debug!("Rating '{}' is not a number: {}", raw, e);
            None
        }
    }
}

/// Canonicalize a pasted link: drop everything from the first `&`, then the
/// `<`/`>` link-suppression markers.
pub fn clean_url(raw: &str) -> String {
    let raw = raw.trim();
    let cut = match raw.find('&') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    // The `&` cut can already have removed the closing `>`, so each marker is
    // stripped on its own.
    let cut = cut.strip_prefix('<').unwrap_or(cut);
    let cut = cut.strip_suffix('>').unwrap_or(cut);
    cut.to_string()
}

/// Outcome of classifying a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClassification {
    pub is_recognized: bool,
    pub title: String,
    pub canonical_url: String,
}

impl LinkClassification {
    pub fn unrecognized(canonical_url: String) -> Self {
        Self {
            is_recognized: false,
            title: String::new(),
            canonical_url,
        }
    }
}

/// Decides whether a link belongs to the ritual's publisher channel.
///
/// Implementations must canonicalize with [`clean_url`] first and must never fail:
/// an unreachable or malformed link is simply not recognized.
#[async_trait]
pub trait LinkClassifier: Send + Sync {
    async fn classify(&self, raw_url: &str) -> LinkClassification;
}

/// Finds candidate ritual links inside free-form chat text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatcher {
    prefixes: Vec<String>,
    id_len: usize,
}

impl LinkMatcher {
    pub fn new(prefixes: Vec<String>, id_len: usize) -> Self {
        Self { prefixes, id_len }
    }

    /// Every `prefix + id_len chars` occurrence, canonicalized, in order of appearance.
    pub fn candidates(&self, content: &str) -> Vec<String> {
        let mut found: Vec<(usize, String)> = Vec::new();
        for prefix in &self.prefixes {
            for (start, _) in content.match_indices(prefix.as_str()) {
                let rest = &content[start + prefix.len()..];
                let id: String = rest.chars().take(self.id_len).collect();
                if id.chars().count() < self.id_len {
                    continue;
                }
                let candidate = clean_url(&format!("{}{}", prefix, id));
                if !found.iter().any(|(_, c)| *c == candidate) {
                    found.push((start, candidate));
                }
            }
        }
        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, c)| c).collect()
    }
}

static CHANNEL_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<link\s+itemprop="url"\s+href="([^"]+)""#).expect("valid channel link regex")
});

static TITLE_META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<meta\s+name="title"\s+content="([^"]*)""#).expect("valid title meta regex")
});

/// Classifier that fetches the video page and checks which channel it links to.
pub struct YoutubeChannelClassifier {
    client: reqwest::Client,
    channel_url: String,
}

impl YoutubeChannelClassifier {
    pub fn new(channel_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build classifier HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            channel_url: channel_url.into(),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch {}: {}", url, e))?;
        log::debug!("Link classifier: {} -> {}", url, response.status());
        if !response.status().is_success() {
            return Err(format!("{} returned {}", url, response.status()));
        }
        response
            .text()
            .await
            .map_err(|e| format!("Failed to read body of {}: {}", url, e))
    }
}

#[async_trait]
impl LinkClassifier for YoutubeChannelClassifier {
    async fn classify(&self, raw_url: &str) -> LinkClassification {
        let canonical = clean_url(raw_url);
        if !is_web_url(&canonical) {
            log::debug!("Link classifier: invalid url '{}'", canonical);
            return LinkClassification::unrecognized(canonical);
        }

        let html = match self.fetch_page(&canonical).await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Link classifier: {}", e);
                return LinkClassification::unrecognized(canonical);
            }
        };

        let (is_recognized, title) = inspect_page(&html, &self.channel_url);
        log::info!(
            "Link classifier: '{}' recognized={} title='{}'",
            canonical,
            is_recognized,
            title
        );
        LinkClassification {
            is_recognized,
            title,
            canonical_url: canonical,
        }
    }
}

fn is_web_url(candidate: &str) -> bool {
    match url::Url::parse(candidate) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Returns whether the page links to `channel_url` and the page title.
fn inspect_page(html: &str, channel_url: &str) -> (bool, String) {
    let wanted = strip_scheme(channel_url);
    let is_channel = CHANNEL_LINK_RE
        .captures_iter(html)
        .any(|cap| strip_scheme(&cap[1]) == wanted);
    let title = TITLE_META_RE
        .captures(html)
        .map(|cap| decode_entities(&cap[1]))
        .unwrap_or_default();
    (is_channel, title)
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
