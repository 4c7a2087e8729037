//! Storage module for deck files and their metadata.
//!
//! Decks are `*.csv` files in one directory. Display details and best
//! streaks live in a `decks.json` sidecar in the same directory, keyed by
//! file stem.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deck_file::{parse_deck, render_deck};
use crate::models::{DeckStats, Flashcard};

const METADATA_FILE: &str = "decks.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file type: {0} (expected a .csv file)")]
    InvalidFileType(String),
    #[error("Deck name is required")]
    NameRequired,
    #[error("Deck not found: {0}")]
    NotFound(String),
    #[error("Metadata file not found: {0:?}")]
    MetadataMissing(PathBuf),
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Sidecar entry for one deck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_streak: Option<u32>,
}

/// User-editable deck details.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckDetails {
    pub name: String,
    pub description: String,
    pub category: String,
    pub colour: String,
    pub tags: Vec<String>,
}

impl DeckDetails {
    fn apply_to(&self, meta: &mut DeckMetadata) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StorageError::NameRequired);
        }

        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        meta.name = Some(name.to_string());
        meta.description = non_empty(&self.description);
        meta.category = non_empty(&self.category);
        meta.colour = non_empty(&self.colour);
        meta.tags = (!tags.is_empty()).then_some(tags);
        Ok(())
    }
}

/// Summary info for a deck.
#[derive(Debug, Clone)]
pub struct DeckInfo {
    pub filename: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub colour: Option<String>,
    pub tags: Vec<String>,
    pub max_streak: u32,
    /// The CSV exists but has no metadata entry yet.
    pub needs_setup: bool,
    pub stats: DeckStats,
}

impl DeckInfo {
    pub fn details(&self) -> DeckDetails {
        DeckDetails {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            category: self.category.clone().unwrap_or_default(),
            colour: self.colour.clone().unwrap_or_default(),
            tags: self.tags.clone(),
        }
    }

    fn matches(&self, query: &str) -> bool {
        let contains = |s: &str| s.to_lowercase().contains(query);
        contains(self.name.as_str())
            || self.description.as_deref().is_some_and(contains)
            || self.category.as_deref().is_some_and(contains)
            || self.tags.iter().any(|t| contains(t.as_str()))
    }
}

/// Deck list orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeckSort {
    #[default]
    Name,
    LastStudied,
    CardCount,
    Accuracy,
    Streak,
}

impl DeckSort {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::LastStudied => "last studied",
            Self::CardCount => "cards",
            Self::Accuracy => "accuracy",
            Self::Streak => "streak",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Name => Self::LastStudied,
            Self::LastStudied => Self::CardCount,
            Self::CardCount => Self::Accuracy,
            Self::Accuracy => Self::Streak,
            Self::Streak => Self::Name,
        }
    }

    /// Name sorts A-Z; everything else puts the largest value first.
    pub fn sort(&self, decks: &mut [DeckInfo]) {
        match self {
            Self::Name => decks.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
            Self::LastStudied => decks.sort_by(|a, b| {
                b.stats.last_studied.unwrap_or(0).cmp(&a.stats.last_studied.unwrap_or(0))
            }),
            Self::CardCount => decks.sort_by(|a, b| b.stats.card_count.cmp(&a.stats.card_count)),
            Self::Accuracy => decks.sort_by(|a, b| {
                b.stats.average_accuracy.total_cmp(&a.stats.average_accuracy)
            }),
            Self::Streak => decks.sort_by(|a, b| b.max_streak.cmp(&a.max_streak)),
        }
    }
}

/// Decks whose name, description, category or tags contain `query`, ignoring case.
pub fn filter_decks<'a>(decks: &'a [DeckInfo], query: &str) -> Vec<&'a DeckInfo> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return decks.iter().collect();
    }
    decks.iter().filter(|d| d.matches(&query)).collect()
}

/// Handles deck persistence.
pub struct DeckStorage {
    decks_dir: PathBuf,
}

impl DeckStorage {
    pub fn new(decks_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&decks_dir).map_err(io_err(&decks_dir))?;
        Ok(Self { decks_dir })
    }

    /// Get default storage location.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hanki")
            .join("decks")
    }

    pub fn decks_dir(&self) -> &Path {
        &self.decks_dir
    }

    fn deck_path(&self, filename: &str) -> Result<PathBuf> {
        let is_plain_name = Path::new(filename).file_name().and_then(|n| n.to_str()) == Some(filename);
        if !filename.ends_with(".csv") || !is_plain_name {
            return Err(StorageError::InvalidFileType(filename.to_string()));
        }
        Ok(self.decks_dir.join(filename))
    }

    fn metadata_path(&self) -> PathBuf {
        self.decks_dir.join(METADATA_FILE)
    }

    fn file_key(filename: &str) -> &str {
        filename.strip_suffix(".csv").unwrap_or(filename)
    }

    /// Load the sidecar, or `None` when it does not exist.
    fn read_metadata(&self) -> Result<Option<BTreeMap<String, DeckMetadata>>> {
        let path = self.metadata_path();
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    fn write_metadata(&self, metadata: &BTreeMap<String, DeckMetadata>) -> Result<()> {
        let path = self.metadata_path();
        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(&path, json).map_err(io_err(&path))
    }

    /// Load a deck's cards.
    pub fn load_deck(&self, filename: &str) -> Result<Vec<Flashcard>> {
        let path = self.deck_path(filename)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => return Err(io_err(&path)(e)),
        };
        Ok(parse_deck(&content)?)
    }

    /// Replace a deck's cards, progress included.
    pub fn save_deck(&self, filename: &str, cards: &[Flashcard]) -> Result<PathBuf> {
        let path = self.deck_path(filename)?;
        let content = render_deck(cards)?;
        fs::write(&path, content).map_err(io_err(&path))?;
        tracing::debug!(deck = filename, cards = cards.len(), "saved deck");
        Ok(path)
    }

    /// Set every card back to unstudied.
    pub fn reset_progress(&self, filename: &str) -> Result<usize> {
        let mut cards = self.load_deck(filename)?;
        for card in &mut cards {
            card.reset_progress();
        }
        self.save_deck(filename, &cards)?;
        tracing::info!(deck = filename, cards = cards.len(), "reset deck progress");
        Ok(cards.len())
    }

    /// Delete a deck file and its metadata entry.
    pub fn delete_deck(&self, filename: &str) -> Result<bool> {
        let path = self.deck_path(filename)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(io_err(&path))?;

        // A broken or missing sidecar must not block deleting the deck itself.
        match self.read_metadata() {
            Ok(Some(mut metadata)) => {
                if metadata.remove(Self::file_key(filename)).is_some() {
                    self.write_metadata(&metadata)?;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(deck = filename, error = %e, "could not update deck metadata"),
        }

        tracing::info!(deck = filename, "deleted deck");
        Ok(true)
    }

    /// Register details for a deck, starting its best streak at zero.
    pub fn create_deck(&self, filename: &str, details: &DeckDetails) -> Result<DeckMetadata> {
        self.deck_path(filename)?;
        let mut metadata = self.read_metadata()?.unwrap_or_default();

        let mut meta = DeckMetadata {
            csv_file: Some(format!("/{}", filename)),
            max_streak: Some(0),
            ..DeckMetadata::default()
        };
        details.apply_to(&mut meta)?;

        metadata.insert(Self::file_key(filename).to_string(), meta.clone());
        self.write_metadata(&metadata)?;
        tracing::info!(deck = filename, "created deck metadata");
        Ok(meta)
    }

    /// Change a deck's details, keeping its streak.
    pub fn update_deck(&self, filename: &str, details: &DeckDetails) -> Result<DeckMetadata> {
        self.deck_path(filename)?;
        let mut metadata = self
            .read_metadata()?
            .ok_or_else(|| StorageError::MetadataMissing(self.metadata_path()))?;

        let meta = metadata
            .entry(Self::file_key(filename).to_string())
            .or_insert_with(|| DeckMetadata {
                csv_file: Some(format!("/{}", filename)),
                ..DeckMetadata::default()
            });
        details.apply_to(meta)?;
        let updated = meta.clone();

        self.write_metadata(&metadata)?;
        Ok(updated)
    }

    /// Create or update, depending on whether the deck has metadata yet.
    pub fn save_details(&self, filename: &str, details: &DeckDetails) -> Result<DeckMetadata> {
        let exists = self
            .read_metadata()?
            .is_some_and(|m| m.contains_key(Self::file_key(filename)));
        if exists {
            self.update_deck(filename, details)
        } else {
            self.create_deck(filename, details)
        }
    }

    /// Best streak recorded for a deck, 0 when unknown.
    pub fn max_streak(&self, filename: &str) -> u32 {
        match self.read_metadata() {
            Ok(Some(metadata)) => metadata
                .get(Self::file_key(filename))
                .and_then(|m| m.max_streak)
                .unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(deck = filename, error = %e, "could not read max streak");
                0
            }
        }
    }

    pub fn set_max_streak(&self, filename: &str, streak: u32) -> Result<()> {
        self.deck_path(filename)?;
        let mut metadata = self.read_metadata()?.unwrap_or_default();
        metadata
            .entry(Self::file_key(filename).to_string())
            .or_default()
            .max_streak = Some(streak);
        self.write_metadata(&metadata)?;
        tracing::debug!(deck = filename, streak, "saved max streak");
        Ok(())
    }

    /// List all available decks with their stats.
    pub fn list_decks(&self, now: i64) -> Result<Vec<DeckInfo>> {
        let metadata = match self.read_metadata() {
            Ok(m) => m.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable deck metadata");
                BTreeMap::new()
            }
        };

        let mut decks = Vec::new();
        for entry in fs::read_dir(&self.decks_dir).map_err(io_err(&self.decks_dir))? {
            let entry = entry.map_err(io_err(&self.decks_dir))?;
            let path = entry.path();

            if path.extension().map_or(true, |e| e != "csv") {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let stats = match self.load_deck(filename) {
                Ok(cards) => DeckStats::from_cards(&cards, now),
                Err(e) => {
                    tracing::warn!(deck = filename, error = %e, "failed to read deck");
                    DeckStats::default()
                }
            };

            let meta = metadata.get(Self::file_key(filename));
            decks.push(DeckInfo {
                filename: filename.to_string(),
                name: meta
                    .and_then(|m| m.name.clone())
                    .unwrap_or_else(|| filename_to_title_case(Self::file_key(filename))),
                description: meta.and_then(|m| m.description.clone()),
                category: meta.and_then(|m| m.category.clone()),
                colour: meta.and_then(|m| m.colour.clone()),
                tags: meta.and_then(|m| m.tags.clone()).unwrap_or_default(),
                max_streak: meta.and_then(|m| m.max_streak).unwrap_or(0),
                needs_setup: meta.is_none(),
                stats,
            });
        }

        DeckSort::Name.sort(&mut decks);
        Ok(decks)
    }

    /// Copy an external CSV into the decks directory, returning its filename.
    pub fn import_csv(&self, csv_path: &Path) -> Result<String> {
        let content = fs::read_to_string(csv_path).map_err(io_err(csv_path))?;
        let cards = parse_deck(&content)?;

        let filename = csv_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .ok_or_else(|| StorageError::InvalidFileType(csv_path.display().to_string()))?;

        self.save_deck(&filename, &cards)?;
        tracing::info!(deck = %filename, cards = cards.len(), "imported deck");
        Ok(filename)
    }
}

/// Convert a filename (snake_case or kebab-case) to Title Case.
fn filename_to_title_case(name: &str) -> String {
    name.split(|c| c == '_' || c == '-')
        .filter(|s| !s.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    const NOW: i64 = 1_700_000_000_000;

    fn storage_with(files: &[(&str, &str)]) -> (TempDir, DeckStorage) {
        let dir = tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let storage = DeckStorage::new(dir.path().to_path_buf()).unwrap();
        (dir, storage)
    }

    fn details(name: &str) -> DeckDetails {
        DeckDetails {
            name: name.to_string(),
            ..DeckDetails::default()
        }
    }

    #[test]
    fn test_rejects_non_csv_names() {
        let (_dir, storage) = storage_with(&[]);
        assert!(matches!(
            storage.load_deck("notes.txt"),
            Err(StorageError::InvalidFileType(_))
        ));
        assert!(matches!(
            storage.load_deck("../escape.csv"),
            Err(StorageError::InvalidFileType(_))
        ));
        assert!(matches!(
            storage.load_deck("missing.csv"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_save_and_load_progress() {
        let (_dir, storage) = storage_with(&[("spanish.csv", "Question,Answer\nhola,hello\n")]);

        let cards = storage.load_deck("spanish.csv").unwrap();
        let answered: Vec<Flashcard> = cards.iter().map(|c| c.answered(true, NOW)).collect();
        storage.save_deck("spanish.csv", &answered).unwrap();

        let reloaded = storage.load_deck("spanish.csv").unwrap();
        assert_eq!(reloaded, answered);
    }

    #[test]
    fn test_reset_progress() {
        let (_dir, storage) = storage_with(&[(
            "maths.csv",
            "Question,Answer,Accuracy,LastAsked\n1+1,2,0.9000,1700000000000\n",
        )]);
        assert_eq!(storage.reset_progress("maths.csv").unwrap(), 1);

        let cards = storage.load_deck("maths.csv").unwrap();
        assert_eq!(cards[0].accuracy, 0.0);
        assert!(cards[0].is_new());
    }

    #[test]
    fn test_list_decks_uses_metadata_and_default_names() {
        let (_dir, storage) = storage_with(&[
            ("world_capitals.csv", "Question,Answer\nFrance,Paris\n"),
            ("spanish-verbs.csv", "Question,Answer\nser,to be\nestar,to be\n"),
            ("notes.txt", "ignored"),
        ]);
        storage
            .create_deck(
                "spanish-verbs.csv",
                &DeckDetails {
                    name: "Verbs".to_string(),
                    category: " Languages ".to_string(),
                    tags: vec!["spanish".to_string(), " ".to_string()],
                    ..DeckDetails::default()
                },
            )
            .unwrap();

        let decks = storage.list_decks(NOW).unwrap();
        assert_eq!(decks.len(), 2);

        assert_eq!(decks[0].name, "Verbs");
        assert_eq!(decks[0].category.as_deref(), Some("Languages"));
        assert_eq!(decks[0].tags, vec!["spanish"]);
        assert_eq!(decks[0].stats.card_count, 2);
        assert!(!decks[0].needs_setup);

        assert_eq!(decks[1].name, "World Capitals");
        assert!(decks[1].needs_setup);
        assert_eq!(decks[1].max_streak, 0);
    }

    #[test]
    fn test_create_requires_name() {
        let (_dir, storage) = storage_with(&[("a.csv", "Question,Answer\nq,a\n")]);
        assert!(matches!(
            storage.create_deck("a.csv", &details("  ")),
            Err(StorageError::NameRequired)
        ));
    }

    #[test]
    fn test_update_requires_sidecar() {
        let (_dir, storage) = storage_with(&[("a.csv", "Question,Answer\nq,a\n")]);
        assert!(matches!(
            storage.update_deck("a.csv", &details("A")),
            Err(StorageError::MetadataMissing(_))
        ));
    }

    #[test]
    fn test_update_keeps_streak() {
        let (_dir, storage) = storage_with(&[("a.csv", "Question,Answer\nq,a\n")]);
        storage.create_deck("a.csv", &details("First")).unwrap();
        storage.set_max_streak("a.csv", 12).unwrap();

        let meta = storage.save_details("a.csv", &details("Second")).unwrap();
        assert_eq!(meta.name.as_deref(), Some("Second"));
        assert_eq!(meta.max_streak, Some(12));
        assert_eq!(storage.max_streak("a.csv"), 12);
    }

    #[test]
    fn test_max_streak_defaults_to_zero() {
        let (_dir, storage) = storage_with(&[]);
        assert_eq!(storage.max_streak("unknown.csv"), 0);
    }

    #[test]
    fn test_delete_removes_metadata() {
        let (dir, storage) = storage_with(&[
            ("a.csv", "Question,Answer\nq,a\n"),
            ("b.csv", "Question,Answer\nq,a\n"),
        ]);
        storage.create_deck("a.csv", &details("A")).unwrap();
        storage.create_deck("b.csv", &details("B")).unwrap();

        assert!(storage.delete_deck("a.csv").unwrap());
        assert!(!dir.path().join("a.csv").exists());
        assert!(!storage.delete_deck("a.csv").unwrap());

        let json = fs::read_to_string(dir.path().join(METADATA_FILE)).unwrap();
        let metadata: BTreeMap<String, DeckMetadata> = serde_json::from_str(&json).unwrap();
        assert!(!metadata.contains_key("a"));
        assert!(metadata.contains_key("b"));
    }

    #[test]
    fn test_import_csv() {
        let source = tempdir().unwrap();
        let path = source.path().join("capitals.csv");
        fs::write(&path, "Question,Answer\nItaly,Rome\n").unwrap();

        let (_dir, storage) = storage_with(&[]);
        let filename = storage.import_csv(&path).unwrap();
        assert_eq!(filename, "capitals.csv");
        assert_eq!(storage.load_deck(&filename).unwrap()[0].answer, "Rome");
    }

    #[test]
    fn test_filter_and_sort() {
        let (_dir, storage) = storage_with(&[
            ("alpha.csv", "Question,Answer\nq,a\n"),
            ("beta.csv", "Question,Answer\nq,a\nq2,a2\nq3,a3\n"),
        ]);
        storage
            .create_deck(
                "alpha.csv",
                &DeckDetails {
                    name: "Alpha".to_string(),
                    tags: vec!["Greek".to_string()],
                    ..DeckDetails::default()
                },
            )
            .unwrap();

        let mut decks = storage.list_decks(NOW).unwrap();
        let found = filter_decks(&decks, "greek");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].filename, "alpha.csv");
        assert_eq!(filter_decks(&decks, "").len(), 2);

        DeckSort::CardCount.sort(&mut decks);
        assert_eq!(decks[0].filename, "beta.csv");
    }

    #[test]
    fn test_filename_to_title_case() {
        assert_eq!(filename_to_title_case("world_capitals"), "World Capitals");
        assert_eq!(filename_to_title_case("spanish-verbs-2"), "Spanish Verbs 2");
    }
}
