//! Weekly ritual check.
//!
//! A cron schedule fires once a day at the trigger time. The firing itself checks
//! the weekday; on the right day it reads today's channel history, decides whether
//! someone already carried out the ritual and either celebrates them or posts a
//! random song from the catalog.

use async_trait::async_trait;
use catalog_types::Song;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{self, CatalogError, CatalogStore};
use crate::config::{SignalConfig, TriggerConfig, weekday_name};
use crate::enactment::clumps::link_candidates;
use crate::enactment::{Author, Enactment, HistoricalMessage, RecognizedLinks, build_clumps, resolve};
use crate::validators::LinkClassifier;

/// Source of past channel messages.
#[async_trait]
pub trait ChannelHistory: Send + Sync {
    /// Messages posted between `since` and `until`, newest first.
    async fn fetch(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<HistoricalMessage>, String>;
}

/// Where the scheduler posts its messages.
#[async_trait]
pub trait ChannelPoster: Send + Sync {
    async fn post(&self, text: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Evaluating,
}

/// How a firing ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FiringOutcome {
    WrongDay,
    /// Another firing was still evaluating
    Skipped,
    Celebrated(Enactment),
    AutoPosted(Song),
    /// Nobody enacted and there was nothing to post
    EmptyCatalog,
    Abandoned(String),
}

/// Pure core of a firing: analyze `history` and decide what happened.
pub fn run_scheduled_check(
    history: &[HistoricalMessage],
    bot_id: &str,
    signals: &SignalConfig,
    recognized: &RecognizedLinks,
) -> Enactment {
    let clumps = build_clumps(history, bot_id, signals, recognized);
    log::debug!("[SCHEDULER] {} clumps from {} messages", clumps.len(), history.len());
    resolve(&clumps)
}

pub struct Scheduler {
    trigger: TriggerConfig,
    signals: SignalConfig,
    bot_id: String,
    history_timeout: Duration,
    store: Arc<CatalogStore>,
    classifier: Arc<dyn LinkClassifier>,
    history: Arc<dyn ChannelHistory>,
    poster: Arc<dyn ChannelPoster>,
    state: Mutex<SchedulerState>,
}

/// Puts the scheduler back to `Idle` however the firing ends.
struct EvaluatingGuard<'a>(&'a Mutex<SchedulerState>);

impl Drop for EvaluatingGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = SchedulerState::Idle;
    }
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trigger: TriggerConfig,
        signals: SignalConfig,
        bot_id: impl Into<String>,
        history_timeout: Duration,
        store: Arc<CatalogStore>,
        classifier: Arc<dyn LinkClassifier>,
        history: Arc<dyn ChannelHistory>,
        poster: Arc<dyn ChannelPoster>,
    ) -> Self {
        Self {
            trigger,
            signals,
            bot_id: bot_id.into(),
            history_timeout,
            store,
            classifier,
            history,
            poster,
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    /// Sleep until each trigger time and fire, forever.
    pub async fn run(self: Arc<Self>) {
        let expression = self.trigger.cron_expression();
        let schedule = match cron::Schedule::from_str(&expression) {
            Ok(s) => s,
            Err(e) => {
                log::error!("[SCHEDULER] Invalid schedule '{}': {}", expression, e);
                return;
            }
        };
        log::info!("[SCHEDULER] Started: {}", self.trigger.setup_message());

        loop {
            let Some(next) = schedule.upcoming(self.trigger.timezone).next() else {
                log::warn!("[SCHEDULER] No upcoming trigger time, stopping");
                return;
            };
            let wait = (next.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            log::debug!(
                "[SCHEDULER] {:?}, next firing at {} (in {}s)",
                self.state(),
                next,
                wait.as_secs()
            );
            tokio::time::sleep(wait).await;

            let outcome = self.fire(Utc::now()).await;
            log::info!("[SCHEDULER] Firing finished: {:?}", outcome);
        }
    }

    /// One firing at `now`.
    pub async fn fire(&self, now: DateTime<Utc>) -> FiringOutcome {
        {
            let mut state = self.state.lock();
            if *state == SchedulerState::Evaluating {
                log::warn!("[SCHEDULER] Previous firing still evaluating, skipping");
                return FiringOutcome::Skipped;
            }
            *state = SchedulerState::Evaluating;
        }
        let _idle = EvaluatingGuard(&self.state);

        let local = now.with_timezone(&self.trigger.timezone);
        if local.weekday() != self.trigger.day {
            let msg = format!(
                "Wrong day to trigger as today is {} not {} \n:(",
                weekday_name(local.weekday()),
                weekday_name(self.trigger.day)
            );
            log::info!("[SCHEDULER] {}", msg);
            self.post(&msg).await;
            return FiringOutcome::WrongDay;
        }
        log::info!("[SCHEDULER] Triggered on {}", weekday_name(self.trigger.day));

        let since = match local
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| self.trigger.timezone.from_local_datetime(&midnight).single())
        {
            Some(start) => start.with_timezone(&Utc),
            None => return FiringOutcome::Abandoned("could not compute start of day".to_string()),
        };

        let history = match tokio::time::timeout(self.history_timeout, self.history.fetch(since, now)).await {
            Ok(Ok(messages)) => messages,
            Ok(Err(e)) => {
                log::error!("[SCHEDULER] History fetch failed: {}", e);
                return FiringOutcome::Abandoned(e);
            }
            Err(_) => {
                log::error!(
                    "[SCHEDULER] History fetch timed out after {}s",
                    self.history_timeout.as_secs()
                );
                return FiringOutcome::Abandoned("history fetch timed out".to_string());
            }
        };
        log::info!("[SCHEDULER] Read {} messages since {}", history.len(), since);
        if let Some(oldest) = history.last() {
            log::debug!("[SCHEDULER] Oldest message at {}", oldest.posted_at);
        }

        let recognized = self.classify_links(&history).await;
        let enactment = run_scheduled_check(&history, &self.bot_id, &self.signals, &recognized);
        self.dispatch(enactment).await
    }

    async fn classify_links(&self, history: &[HistoricalMessage]) -> RecognizedLinks {
        let mut recognized = RecognizedLinks::new();
        for candidate in link_candidates(history, &self.bot_id, &self.signals) {
            let result = self.classifier.classify(&candidate).await;
            if result.is_recognized {
                recognized.insert(result.canonical_url);
            }
        }
        recognized
    }

    async fn dispatch(&self, enactment: Enactment) -> FiringOutcome {
        match &enactment {
            Enactment::EnactedByMany(authors) => {
                log::info!("[SCHEDULER] Enacted by {} members", authors.len());
                self.post(&multiple_enactors_message(&self.signals.ritual_phrase, authors))
                    .await;
                FiringOutcome::Celebrated(enactment)
            }
            Enactment::EnactedBy(author) => {
                log::info!("[SCHEDULER] Enacted by {}", author.name);
                self.post(&congratulations_message(&self.signals.ritual_phrase, author))
                    .await;
                FiringOutcome::Celebrated(enactment)
            }
            Enactment::NotEnacted => self.auto_post().await,
        }
    }

    async fn auto_post(&self) -> FiringOutcome {
        let song = match self.store.get_random_song() {
            Ok(song) => song,
            Err(CatalogError::EmptyCatalog) => {
                log::warn!("[SCHEDULER] Nobody enacted and the catalog is empty, nothing to post");
                return FiringOutcome::EmptyCatalog;
            }
            Err(e) => {
                log::error!("[SCHEDULER] Catalog read failed: {}", e);
                return FiringOutcome::Abandoned(e.to_string());
            }
        };
        let template = match self.store.get_random_template() {
            Ok(template) => template,
            Err(e) => {
                log::error!("[SCHEDULER] Template read failed: {}", e);
                return FiringOutcome::Abandoned(e.to_string());
            }
        };

        let (body, notes) = catalog::render(&template, &song);
        if let Err(e) = self.poster.post(&body).await {
            log::error!("[SCHEDULER] Failed to post pick: {}", e);
            return FiringOutcome::Abandoned(e);
        }
        if !notes.is_empty() {
            self.post(&notes).await;
        }
        log::info!("[SCHEDULER] Posted '{}'", song.title);
        FiringOutcome::AutoPosted(song)
    }

    async fn post(&self, text: &str) {
        if let Err(e) = self.poster.post(text).await {
            log::error!("[SCHEDULER] Failed to post message: {}", e);
        }
    }
}

pub fn congratulations_message(ritual_phrase: &str, author: &Author) -> String {
    format!(
        "Oo-rah!!! {} has already enacted {} today. Hallelujah!",
        author.mention(),
        ritual_phrase
    )
}

pub fn multiple_enactors_message(ritual_phrase: &str, authors: &[Author]) -> String {
    let mentions: Vec<String> = authors.iter().map(Author::mention).collect();
    format!(
        "{} has been enacted {} times today by {}! The yellow and black attack is strong this week.",
        ritual_phrase,
        authors.len(),
        mentions.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{LinkClassification, LinkMatcher, clean_url};
    use chrono::{FixedOffset, NaiveTime, Weekday};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const BOT: &str = "bot";
    const LINK: &str = "https://www.youtube.com/watch?v=AAAAAAAAAAA";

    struct FakeHistory {
        messages: Vec<HistoricalMessage>,
        calls: AtomicUsize,
        windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
        delay: Duration,
        fail: bool,
    }

    impl FakeHistory {
        fn with(messages: Vec<HistoricalMessage>) -> Self {
            Self {
                messages,
                calls: AtomicUsize::new(0),
                windows: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ChannelHistory for FakeHistory {
        async fn fetch(
            &self,
            since: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<Vec<HistoricalMessage>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.windows.lock().push((since, until));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err("gateway unavailable".to_string());
            }
            Ok(self.messages.clone())
        }
    }

    #[derive(Default)]
    struct FakePoster {
        posts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChannelPoster for FakePoster {
        async fn post(&self, text: &str) -> Result<(), String> {
            self.posts.lock().push(text.to_string());
            Ok(())
        }
    }

    struct FakeClassifier {
        recognized: HashSet<String>,
    }

    #[async_trait]
    impl LinkClassifier for FakeClassifier {
        async fn classify(&self, raw_url: &str) -> LinkClassification {
            let canonical = clean_url(raw_url);
            LinkClassification {
                is_recognized: self.recognized.contains(&canonical),
                title: "Calling On You".to_string(),
                canonical_url: canonical,
            }
        }
    }

    struct Harness {
        _dir: TempDir,
        store: Arc<CatalogStore>,
        history: Arc<FakeHistory>,
        poster: Arc<FakePoster>,
        scheduler: Scheduler,
    }

    fn harness(history: FakeHistory, timeout: Duration) -> Harness {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(CatalogStore::new(dir.path().join("data.json")));
        let history = Arc::new(history);
        let poster = Arc::new(FakePoster::default());
        let classifier = Arc::new(FakeClassifier {
            recognized: [LINK.to_string()].into_iter().collect(),
        });
        let scheduler = Scheduler::new(
            TriggerConfig {
                time: NaiveTime::from_hms_opt(19, 29, 0).unwrap(),
                day: Weekday::Sat,
                timezone: FixedOffset::east_opt(630 * 60).unwrap(),
            },
            SignalConfig {
                ritual_phrase: "Stryper Saturday".to_string(),
                rating_keyword: "rating".to_string(),
                link_matcher: LinkMatcher::new(vec!["https://www.youtube.com/watch?v=".to_string()], 11),
            },
            BOT,
            timeout,
            store.clone(),
            classifier,
            history.clone(),
            poster.clone(),
        );
        Harness {
            _dir: dir,
            store,
            history,
            poster,
            scheduler,
        }
    }

    fn msg(author: &str, content: &str) -> HistoricalMessage {
        HistoricalMessage {
            author: Author::new(author, author.to_lowercase()),
            content: content.to_string(),
            posted_at: Utc::now(),
        }
    }

    fn add_song(store: &CatalogStore) -> Song {
        let song = Song::new("Calling On You", LINK, 9.0, "").unwrap();
        store.add_song(song.clone()).unwrap();
        song
    }

    /// 19:30 on Saturday 17 October 2026 in UTC+10:30.
    fn saturday_evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap()
    }

    fn friday_evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_wrong_day_never_reads_history() {
        let h = harness(FakeHistory::with(vec![]), Duration::from_secs(5));
        add_song(&h.store);

        let outcome = h.scheduler.fire(friday_evening()).await;

        assert_eq!(outcome, FiringOutcome::WrongDay);
        assert_eq!(h.history.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            *h.poster.posts.lock(),
            vec!["Wrong day to trigger as today is Friday not Saturday \n:(".to_string()]
        );
        assert_eq!(h.scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_no_enactors_auto_posts_once() {
        let history = FakeHistory::with(vec![msg("A", "rating 9"), msg("B", "Stryper Saturday soon?")]);
        let h = harness(history, Duration::from_secs(5));
        let song = add_song(&h.store);

        let outcome = h.scheduler.fire(saturday_evening()).await;

        assert_eq!(outcome, FiringOutcome::AutoPosted(song));
        assert_eq!(h.history.calls.load(Ordering::SeqCst), 1);
        let posts = h.poster.posts.lock();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].contains("Calling On You"));
        assert!(posts[0].contains(LINK));
        assert!(!posts[0].contains("Oo-rah"));
    }

    #[tokio::test]
    async fn test_history_window_is_local_day_up_to_firing() {
        let h = harness(FakeHistory::with(vec![]), Duration::from_secs(5));
        add_song(&h.store);

        let now = saturday_evening();
        h.scheduler.fire(now).await;

        // Local midnight of Saturday 17 October at +10:30.
        let midnight = Utc.with_ymd_and_hms(2026, 10, 16, 13, 30, 0).unwrap();
        assert_eq!(*h.history.windows.lock(), vec![(midnight, now)]);
    }

    #[tokio::test]
    async fn test_auto_post_sends_notes_as_follow_up() {
        let h = harness(FakeHistory::with(vec![]), Duration::from_secs(5));
        let song = Song::new("Free", LINK, 8.5, "from In God We Trust").unwrap();
        h.store.add_song(song).unwrap();

        h.scheduler.fire(saturday_evening()).await;

        let posts = h.poster.posts.lock();
        assert_eq!(posts.len(), 2);
        assert!(posts[0].contains("8.5/10"));
        assert_eq!(posts[1], "from In God We Trust");
    }

    #[tokio::test]
    async fn test_single_enactor_is_congratulated() {
        let history = FakeHistory::with(vec![
            msg("A", &format!("<{}>", LINK)),
            msg("A", "Stryper Saturday! rating 10"),
            msg("B", "rating?"),
        ]);
        let h = harness(history, Duration::from_secs(5));
        add_song(&h.store);

        let outcome = h.scheduler.fire(saturday_evening()).await;

        assert_eq!(
            outcome,
            FiringOutcome::Celebrated(Enactment::EnactedBy(Author::new("A", "a")))
        );
        assert_eq!(
            *h.poster.posts.lock(),
            vec!["Oo-rah!!! <@A> has already enacted Stryper Saturday today. Hallelujah!".to_string()]
        );
    }

    #[tokio::test]
    async fn test_multiple_enactors() {
        let full = format!("Stryper Saturday, rating 9 {}", LINK);
        let history = FakeHistory::with(vec![msg("A", &full), msg("B", &full)]);
        let h = harness(history, Duration::from_secs(5));

        let outcome = h.scheduler.fire(saturday_evening()).await;

        assert!(matches!(
            outcome,
            FiringOutcome::Celebrated(Enactment::EnactedByMany(ref authors)) if authors.len() == 2
        ));
        let posts = h.poster.posts.lock();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].contains("<@A>, <@B>"));
    }

    #[tokio::test]
    async fn test_bot_messages_do_not_count() {
        let full = format!("Stryper Saturday, rating 9 {}", LINK);
        let history = FakeHistory::with(vec![msg(BOT, &full)]);
        let h = harness(history, Duration::from_secs(5));
        add_song(&h.store);

        let outcome = h.scheduler.fire(saturday_evening()).await;
        assert!(matches!(outcome, FiringOutcome::AutoPosted(_)));
    }

    #[tokio::test]
    async fn test_empty_catalog_skips_posting() {
        let h = harness(FakeHistory::with(vec![]), Duration::from_secs(5));

        let outcome = h.scheduler.fire(saturday_evening()).await;

        assert_eq!(outcome, FiringOutcome::EmptyCatalog);
        assert!(h.poster.posts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_history_failure_abandons_firing() {
        let mut history = FakeHistory::with(vec![]);
        history.fail = true;
        let h = harness(history, Duration::from_secs(5));
        add_song(&h.store);

        let outcome = h.scheduler.fire(saturday_evening()).await;

        assert_eq!(outcome, FiringOutcome::Abandoned("gateway unavailable".to_string()));
        assert!(h.poster.posts.lock().is_empty());
        assert_eq!(h.scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_history_timeout_abandons_without_posting() {
        let mut history = FakeHistory::with(vec![]);
        history.delay = Duration::from_millis(500);
        let h = harness(history, Duration::from_millis(20));
        add_song(&h.store);

        let outcome = h.scheduler.fire(saturday_evening()).await;

        assert!(matches!(outcome, FiringOutcome::Abandoned(_)));
        assert!(h.poster.posts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_firings_are_serialized() {
        let mut history = FakeHistory::with(vec![]);
        history.delay = Duration::from_millis(100);
        let h = harness(history, Duration::from_secs(5));
        add_song(&h.store);

        let (first, second) = tokio::join!(
            h.scheduler.fire(saturday_evening()),
            h.scheduler.fire(saturday_evening())
        );

        assert!(matches!(first, FiringOutcome::AutoPosted(_)));
        assert_eq!(second, FiringOutcome::Skipped);
        assert_eq!(h.history.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_scheduled_check_is_pure() {
        let signals = SignalConfig {
            ritual_phrase: "Stryper Saturday".to_string(),
            rating_keyword: "rating".to_string(),
            link_matcher: LinkMatcher::new(vec!["https://www.youtube.com/watch?v=".to_string()], 11),
        };
        let recognized: RecognizedLinks = [LINK.to_string()].into_iter().collect();
        let history = vec![
            msg("A", "rating 9"),
            msg("B", "hi"),
            msg("A", &format!("stryper saturday {}", LINK)),
        ];
        assert_eq!(
            run_scheduled_check(&history, BOT, &signals, &recognized),
            Enactment::NotEnacted
        );
    }
}
