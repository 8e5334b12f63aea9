//! JSON file backed catalog of songs and templates.
//!
//! Every operation reads the whole file, mutates it and rewrites it. All
//! operations go through one mutex so concurrent commands cannot lose updates.

use catalog_types::{Catalog, Song, Template};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{CatalogError, CatalogResult};
use crate::validators;

/// Which catalog sequence an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Songs,
    Templates,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Songs => "songs",
            Collection::Templates => "templates",
        }
    }
}

pub struct CatalogStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the catalog file if missing. Returns true when it already existed.
    pub fn ensure_exists(&self) -> CatalogResult<bool> {
        let _guard = self.lock.lock();
        if self.path.exists() {
            return Ok(true);
        }
        log::info!("Catalog: Making '{}'", self.path.display());
        self.write(&Catalog::default())?;
        Ok(false)
    }

    pub fn load_catalog(&self) -> CatalogResult<Catalog> {
        let _guard = self.lock.lock();
        self.read()
    }

    /// Append `song` unless its url is already stored.
    pub fn add_song(&self, song: Song) -> CatalogResult<bool> {
        let _guard = self.lock.lock();
        let mut catalog = self.read()?;
        if catalog.find_song(&song.url).is_some() {
            log::info!("Catalog: '{}' already exists", song.url);
            return Ok(false);
        }
        log::info!("Catalog: Adding '{}' ({})", song.title, song.url);
        catalog.songs.push(song);
        self.write(&catalog)?;
        Ok(true)
    }

    /// Replace rating and notes of the song stored under `url`.
    pub fn update_song(&self, url: &str, raw_rating: &str, notes: &str) -> CatalogResult<Song> {
        let _guard = self.lock.lock();
        let mut catalog = self.read()?;
        let index = catalog
            .find_song(url)
            .ok_or_else(|| CatalogError::NotFound("doesn't exist".to_string()))?;

        let rating = Some(raw_rating)
            .filter(|raw| validators::validate_rating(raw))
            .and_then(validators::parse_rating)
            .ok_or_else(|| CatalogError::Validation("invalid rating".to_string()))?;

        let song = &mut catalog.songs[index];
        song.rating = rating;
        song.notes = notes.to_string();
        let updated = song.clone();

        self.write(&catalog)?;
        log::info!("Catalog: Updated '{}' to {}/10", updated.url, updated.rating_display());
        Ok(updated)
    }

    /// Splice out the item at `index`, returning a description of it.
    pub fn remove_by_index(&self, collection: Collection, index: usize) -> CatalogResult<String> {
        let _guard = self.lock.lock();
        let mut catalog = self.read()?;
        let len = match collection {
            Collection::Songs => catalog.songs.len(),
            Collection::Templates => catalog.templates.len(),
        };
        if index >= len {
            return Err(CatalogError::NotFound("index out of range".to_string()));
        }

        let description = match collection {
            Collection::Songs => {
                let song = catalog.songs.remove(index);
                format!("*{}* ({}/10) {}", song.title, song.rating_display(), song.url)
            }
            Collection::Templates => catalog.templates.remove(index).to_string(),
        };
        self.write(&catalog)?;
        log::info!("Catalog: Removed {}[{}]", collection.as_str(), index);
        Ok(description)
    }

    pub fn list_songs(&self) -> CatalogResult<Vec<Song>> {
        Ok(self.load_catalog()?.songs)
    }

    pub fn list_templates(&self) -> CatalogResult<Vec<Template>> {
        Ok(self.load_catalog()?.templates)
    }

    pub fn get_random_song(&self) -> CatalogResult<Song> {
        let catalog = self.load_catalog()?;
        catalog
            .songs
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(CatalogError::EmptyCatalog)
    }

    /// Append `template` unless an identical one is stored.
    pub fn add_template(&self, template: Template) -> CatalogResult<bool> {
        let _guard = self.lock.lock();
        let mut catalog = self.read()?;
        if catalog.has_template(&template) {
            return Ok(false);
        }
        catalog.templates.push(template);
        self.write(&catalog)?;
        Ok(true)
    }

    /// Random template; an empty list is healed with the default greeting.
    pub fn get_random_template(&self) -> CatalogResult<Template> {
        let _guard = self.lock.lock();
        let mut catalog = self.read()?;
        if let Some(template) = catalog.templates.choose(&mut rand::thread_rng()) {
            return Ok(template.clone());
        }

        log::info!("Catalog: No templates stored, writing the default greeting");
        let default = Template::default_greeting();
        catalog.templates.push(default.clone());
        self.write(&catalog)?;
        Ok(default)
    }

    // Callers hold `lock`.
    fn read(&self) -> CatalogResult<Catalog> {
        if !self.path.exists() {
            log::info!("Catalog: Making '{}'", self.path.display());
            let catalog = Catalog::default();
            self.write(&catalog)?;
            return Ok(catalog);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write(&self, catalog: &Catalog) -> CatalogResult<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        catalog.serialize(&mut ser)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            log::error!("Catalog: Failed to replace '{}': {}", self.path.display(), e);
            CatalogError::from(e)
        })
    }
}
