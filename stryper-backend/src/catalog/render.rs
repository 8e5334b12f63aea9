use catalog_types::{NOTES_TOKEN, RATING_TOKEN, Song, TITLE_TOKEN, Template, URL_TOKEN};

/// Fill `template` with `song`. Returns the message body and the song's notes,
/// which callers post as a follow-up when non-empty.
pub fn render(template: &Template, song: &Song) -> (String, String) {
    let rating = song.rating_display();
    let replacements = [
        (TITLE_TOKEN, song.title.as_str()),
        (URL_TOKEN, song.url.as_str()),
        (RATING_TOKEN, rating.as_str()),
        (NOTES_TOKEN, song.notes.as_str()),
    ];

    // Single pass so placeholder text inside a value is never substituted again.
    let mut body = String::with_capacity(template.as_str().len());
    let mut rest = template.as_str();
    while let Some(open) = rest.find('{') {
        body.push_str(&rest[..open]);
        rest = &rest[open..];
        match replacements.iter().find(|(token, _)| rest.starts_with(token)) {
            Some((token, value)) => {
                body.push_str(value);
                rest = &rest[token.len()..];
            }
            None => {
                body.push('{');
                rest = &rest[1..];
            }
        }
    }
    body.push_str(rest);

    (body, song.notes.clone())
}
