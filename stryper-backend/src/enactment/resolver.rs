use super::{Author, Clump};

/// What the weekly check concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enactment {
    /// Nobody did it; the bot should post a pick itself
    NotEnacted,
    /// Exactly one member did it
    EnactedBy(Author),
    /// Several members did it, in order of their first enacted clump
    EnactedByMany(Vec<Author>),
}

/// Reduce clumps to distinct enactors. An author counts once however many of
/// their clumps are enacted.
pub fn resolve(clumps: &[Clump]) -> Enactment {
    let mut enactors: Vec<Author> = Vec::new();
    for clump in clumps.iter().filter(|c| c.is_enacted()) {
        if !enactors.contains(&clump.author) {
            enactors.push(clump.author.clone());
        }
    }

    match enactors.len() {
        0 => Enactment::NotEnacted,
        1 => Enactment::EnactedBy(enactors.remove(0)),
        _ => Enactment::EnactedByMany(enactors),
    }
}
