//! Song commands - add, update, remove, list and post songs

use catalog_types::Song;

use super::{CommandReply, parse_index};
use crate::catalog::{self, CatalogError, CatalogStore, Collection};
use crate::validators::{self, LinkClassifier};

const INVALID_RATING_HINT: &str = "has to be a positive decimal from 0 to 10";

/// `add <url> <rating> [notes...]`: classify the link, check the rating, store the song.
pub async fn add(
    store: &CatalogStore,
    classifier: &dyn LinkClassifier,
    prefix: &str,
    raw_url: &str,
    raw_rating: &str,
    notes: &str,
) -> CommandReply {
    let link = classifier.classify(raw_url).await;
    let rating_ok = validators::validate_rating(raw_rating);

    match (link.is_recognized, rating_ok) {
        (true, true) => add_song(store, prefix, &link.title, &link.canonical_url, raw_rating, notes),
        (true, false) => CommandReply::err(format!("'{}' is invalid, {}", raw_rating, INVALID_RATING_HINT)),
        (false, true) => CommandReply::err(format!("'{}' is not reachable", link.canonical_url)),
        (false, false) => CommandReply::err(format!(
            "'{}' is not reachable, and '{}' is invalid, {}",
            link.canonical_url, raw_rating, INVALID_RATING_HINT
        )),
    }
}

/// Store a song whose link has already been classified. Posts the song on success.
pub fn add_song(
    store: &CatalogStore,
    prefix: &str,
    title: &str,
    url: &str,
    raw_rating: &str,
    notes: &str,
) -> CommandReply {
    let song = match validators::parse_rating(raw_rating)
        .ok_or_else(|| format!("'{}' is invalid, {}", raw_rating, INVALID_RATING_HINT))
        .and_then(|rating| Song::new(title, url, rating, notes))
    {
        Ok(song) => song,
        Err(e) => return CommandReply::err(CatalogError::Validation(e).to_string()),
    };

    match store.add_song(song.clone()) {
        Ok(true) => match song_messages(store, &song) {
            Ok(mut messages) => {
                messages.push("Added!".to_string());
                CommandReply {
                    success: true,
                    messages,
                }
            }
            Err(e) => CommandReply {
                success: true,
                messages: vec![format!("Added! (but could not render it: {})", e)],
            },
        },
        Ok(false) => CommandReply::err(
            CatalogError::Duplicate(format!(
                "Already added! Update entry using {}update command",
                prefix
            ))
            .to_string(),
        ),
        Err(e) => CommandReply::err(format!("ERROR: {}", e)),
    }
}

/// `update <url> <rating> [notes...]`
pub async fn update(
    store: &CatalogStore,
    classifier: &dyn LinkClassifier,
    raw_url: &str,
    raw_rating: &str,
    notes: &str,
) -> CommandReply {
    let link = classifier.classify(raw_url).await;
    if !link.is_recognized {
        return CommandReply::err(format!("ERROR: invalid url passed, '{}'", raw_url));
    }
    update_song(store, &link.canonical_url, raw_rating, notes)
}

pub fn update_song(store: &CatalogStore, url: &str, raw_rating: &str, notes: &str) -> CommandReply {
    match store.update_song(url, raw_rating, notes) {
        Ok(_) => CommandReply::ok("success"),
        Err(e) => CommandReply::err(format!("ERROR: {}", e)),
    }
}

pub fn remove_song(store: &CatalogStore, raw_index: &str) -> CommandReply {
    let Some(index) = parse_index(raw_index) else {
        return CommandReply::err(format!("ERROR: '{}' is not a valid index", raw_index));
    };
    match store.remove_by_index(Collection::Songs, index) {
        Ok(description) => CommandReply::ok(format!("Removed {}", description)),
        Err(e) => CommandReply::err(format!("ERROR: {}", e)),
    }
}

pub fn list_songs(store: &CatalogStore) -> CommandReply {
    match store.list_songs() {
        Ok(songs) if songs.is_empty() => CommandReply::ok("No songs yet! Add one with .add"),
        Ok(songs) => {
            let lines: Vec<String> = songs
                .iter()
                .enumerate()
                .map(|(i, s)| format!("`{}` *{}* ({}/10) <{}>", i, s.title, s.rating_display(), s.url))
                .collect();
            CommandReply::ok(lines.join("\n"))
        }
        Err(e) => CommandReply::err(format!("ERROR: {}", e)),
    }
}

/// `random`: post a random song rendered through a random template.
pub fn random_song(store: &CatalogStore) -> CommandReply {
    let result = store
        .get_random_song()
        .and_then(|song| song_messages(store, &song));
    match result {
        Ok(messages) => CommandReply {
            success: true,
            messages,
        },
        Err(CatalogError::EmptyCatalog) => CommandReply::err("ERROR: database is empty, please fill..."),
        Err(e) => CommandReply::err(format!("ERROR: {}", e)),
    }
}

/// Rendered body plus the notes as a follow-up when there are any.
fn song_messages(store: &CatalogStore, song: &Song) -> Result<Vec<String>, CatalogError> {
    let template = store.get_random_template()?;
    let (body, notes) = catalog::render(&template, song);
    let mut messages = vec![body];
    if !notes.is_empty() {
        messages.push(notes);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{LinkClassification, clean_url};
    use async_trait::async_trait;
    use tempfile::TempDir;

    const LINK: &str = "https://www.youtube.com/watch?v=AAAAAAAAAAA";

    struct StubClassifier;

    #[async_trait]
    impl LinkClassifier for StubClassifier {
        async fn classify(&self, raw_url: &str) -> LinkClassification {
            let canonical = clean_url(raw_url);
            if canonical == LINK {
                LinkClassification {
                    is_recognized: true,
                    title: "Always There For You".to_string(),
                    canonical_url: canonical,
                }
            } else {
                LinkClassification::unrecognized(canonical)
            }
        }
    }

    fn store() -> (TempDir, CatalogStore) {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("data.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_add_posts_song_and_confirms() {
        let (_dir, store) = store();
        let reply = add(&store, &StubClassifier, ".", &format!("<{}&t=10>", LINK), "9", "a classic").await;

        assert!(reply.success);
        assert_eq!(reply.messages.len(), 3);
        assert!(reply.messages[0].contains("Always There For You"));
        assert!(reply.messages[0].contains("9/10"));
        assert_eq!(reply.messages[1], "a classic");
        assert_eq!(reply.messages[2], "Added!");

        let songs = store.list_songs().unwrap();
        assert_eq!(songs[0].url, LINK);
    }

    #[tokio::test]
    async fn test_add_duplicate() {
        let (_dir, store) = store();
        assert!(add(&store, &StubClassifier, ".", LINK, "9", "").await.success);

        let reply = add(&store, &StubClassifier, ".", LINK, "4", "").await;
        assert!(!reply.success);
        assert_eq!(
            reply.messages,
            vec!["Already added! Update entry using .update command".to_string()]
        );
        assert_eq!(store.list_songs().unwrap().len(), 1);

        let reply = add(&store, &StubClassifier, "!", LINK, "4", "").await;
        assert_eq!(
            reply.messages,
            vec!["Already added! Update entry using !update command".to_string()]
        );
    }

    #[tokio::test]
    async fn test_add_reports_each_failure() {
        let (_dir, store) = store();

        let reply = add(&store, &StubClassifier, ".", LINK, "eleven", "").await;
        assert_eq!(
            reply.messages[0],
            "'eleven' is invalid, has to be a positive decimal from 0 to 10"
        );

        let reply = add(&store, &StubClassifier, ".", "https://example.com", "5", "").await;
        assert_eq!(reply.messages[0], "'https://example.com' is not reachable");

        let reply = add(&store, &StubClassifier, ".", "https://example.com", "50", "").await;
        assert!(reply.messages[0].contains("is not reachable, and '50' is invalid"));

        assert!(store.list_songs().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update() {
        let (_dir, store) = store();
        add(&store, &StubClassifier, ".", LINK, "6", "").await;

        let reply = update(&store, &StubClassifier, &format!("<{}>", LINK), "8", "grew on me").await;
        assert_eq!(reply, CommandReply::ok("success"));

        let reply = update(&store, &StubClassifier, LINK, "80", "").await;
        assert_eq!(reply, CommandReply::err("ERROR: invalid rating"));

        let reply = update(&store, &StubClassifier, "https://example.com", "8", "").await;
        assert_eq!(
            reply,
            CommandReply::err("ERROR: invalid url passed, 'https://example.com'")
        );
    }

    #[test]
    fn test_update_unknown_song() {
        let (_dir, store) = store();
        assert_eq!(
            update_song(&store, LINK, "5", ""),
            CommandReply::err("ERROR: doesn't exist")
        );
    }

    #[test]
    fn test_remove_and_list() {
        let (_dir, store) = store();
        for n in 0..3 {
            let url = format!("https://www.youtube.com/watch?v={:011}", n);
            assert!(add_song(&store, ".", &format!("Song {}", n), &url, "7", "").success);
        }

        assert_eq!(
            remove_song(&store, "5"),
            CommandReply::err("ERROR: index out of range")
        );
        assert_eq!(
            remove_song(&store, "x"),
            CommandReply::err("ERROR: 'x' is not a valid index")
        );
        assert!(remove_song(&store, "0").messages[0].starts_with("Removed *Song 0*"));

        let listing = list_songs(&store);
        assert!(listing.messages[0].starts_with("`0` *Song 1* (7/10)"));
        assert!(listing.messages[0].contains("`1` *Song 2*"));
    }

    #[test]
    fn test_random_song_on_empty_catalog() {
        let (_dir, store) = store();
        let reply = random_song(&store);
        assert!(!reply.success);
        assert_eq!(list_songs(&store), CommandReply::ok("No songs yet! Add one with .add"));
    }
}
