#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::{lesson::LessonScore, progress::AggregateProgress};

/// Failures reading or writing persisted scores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("could not access score file {path}: {source}")]
    Io {
        /// file involved
        path:   PathBuf,
        /// underlying error
        #[source]
        source: io::Error,
    },
    /// The backing file is not a valid score snapshot.
    #[error("malformed score file {path}: {source}")]
    Json {
        /// file involved
        path:   PathBuf,
        /// underlying error
        #[source]
        source: serde_json::Error,
    },
}

/// Somewhere lesson scores and aggregate progress are kept between
/// sessions.
pub trait ScoreStore {
    /// Returns the stored score for `lesson_id`, if any.
    fn load(&self, lesson_id: &str) -> Result<Option<LessonScore>, StoreError>;

    /// Stores `score`, replacing any earlier score for the same lesson.
    fn save(&mut self, score: &LessonScore) -> Result<(), StoreError>;

    /// Returns the stored aggregate, or an empty one.
    fn load_progress(&self) -> Result<AggregateProgress, StoreError>;

    /// Stores the aggregate.
    fn save_progress(&mut self, progress: &AggregateProgress) -> Result<(), StoreError>;
}

/// A store that lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// scores by lesson id
    scores:   HashMap<String, LessonScore>,
    /// aggregate progress
    progress: AggregateProgress,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn load(&self, lesson_id: &str) -> Result<Option<LessonScore>, StoreError> {
        Ok(self.scores.get(lesson_id).cloned())
    }

    fn save(&mut self, score: &LessonScore) -> Result<(), StoreError> {
        self.scores.insert(score.lesson_id.clone(), score.clone());
        Ok(())
    }

    fn load_progress(&self) -> Result<AggregateProgress, StoreError> {
        Ok(self.progress.clone())
    }

    fn save_progress(&mut self, progress: &AggregateProgress) -> Result<(), StoreError> {
        self.progress = progress.clone();
        Ok(())
    }
}

/// Everything a [`JsonFileStore`] keeps on disk.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Snapshot {
    /// scores by lesson id
    lessons:  BTreeMap<String, LessonScore>,
    /// aggregate progress
    progress: AggregateProgress,
}

/// A store backed by one pretty-printed JSON file. A missing file reads as
/// an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// the backing file
    path: PathBuf,
}

impl JsonFileStore {
    /// A store backed by `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot, treating a missing file as empty.
    fn read(&self) -> Result<Snapshot, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(source) => return Err(self.io_error(source)),
        };
        if raw.trim().is_empty() {
            return Ok(Snapshot::default());
        }

        serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the snapshot through a sibling temp file, then renames it into
    /// place.
    fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(snapshot).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|e| self.io_error(e))?;
        fs::rename(&staging, &self.path).map_err(|e| self.io_error(e))
    }

    /// Wraps an I/O error with the backing path.
    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ScoreStore for JsonFileStore {
    fn load(&self, lesson_id: &str) -> Result<Option<LessonScore>, StoreError> {
        Ok(self.read()?.lessons.remove(lesson_id))
    }

    fn save(&mut self, score: &LessonScore) -> Result<(), StoreError> {
        let mut snapshot = self.read()?;
        snapshot
            .lessons
            .insert(score.lesson_id.clone(), score.clone());
        self.write(&snapshot)
    }

    fn load_progress(&self) -> Result<AggregateProgress, StoreError> {
        Ok(self.read()?.progress)
    }

    fn save_progress(&mut self, progress: &AggregateProgress) -> Result<(), StoreError> {
        let mut snapshot = self.read()?;
        snapshot.progress = progress.clone();
        self.write(&snapshot)
    }
}
