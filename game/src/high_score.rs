use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::settings::config_dir;

pub type ScoreTable = BTreeMap<String, u32>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("high score storage unavailable: {0}")]
    Io(#[from] io::Error),

    #[error("high score file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where best scores are kept between runs.
pub trait HighScoreBackend: fmt::Debug {
    fn load(&self) -> Result<ScoreTable, StoreError>;
    fn save(&self, scores: &ScoreTable) -> Result<(), StoreError>;
}

/// One JSON object mapping game id to best score.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("KINETIC_HIGH_SCORE_PATH") {
            return Self::at(explicit);
        }
        Self::at(config_dir().join("high_scores.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HighScoreBackend for JsonFileBackend {
    fn load(&self) -> Result<ScoreTable, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ScoreTable::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, scores: &ScoreTable) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(scores)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    scores: RefCell<ScoreTable>,
}

impl MemoryBackend {
    pub fn with_scores(scores: ScoreTable) -> Self {
        Self {
            scores: RefCell::new(scores),
        }
    }
}

impl HighScoreBackend for MemoryBackend {
    fn load(&self) -> Result<ScoreTable, StoreError> {
        Ok(self.scores.borrow().clone())
    }

    fn save(&self, scores: &ScoreTable) -> Result<(), StoreError> {
        *self.scores.borrow_mut() = scores.clone();
        Ok(())
    }
}

/// Monotonic best score per game id.
///
/// Storage trouble never reaches gameplay: a failed load or save drops the
/// backend and the store keeps working from memory for the rest of the run.
#[derive(Debug, Default)]
pub struct HighScoreStore {
    backend: Option<Box<dyn HighScoreBackend>>,
    scores: ScoreTable,
}

impl HighScoreStore {
    pub fn open(backend: Box<dyn HighScoreBackend>) -> Self {
        match backend.load() {
            Ok(scores) => {
                debug!(games = scores.len(), "high scores loaded");
                Self {
                    backend: Some(backend),
                    scores,
                }
            }
            Err(err) => {
                warn!(%err, "high score storage unavailable, keeping scores in memory");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    pub fn get(&self, game_id: &str) -> u32 {
        self.scores.get(game_id).copied().unwrap_or(0)
    }

    /// Records `candidate` if it beats the stored best. Returns whether it did.
    pub fn set(&mut self, game_id: &str, candidate: u32) -> bool {
        if candidate <= self.get(game_id) {
            return false;
        }
        self.scores.insert(game_id.to_string(), candidate);
        if let Some(backend) = &self.backend {
            if let Err(err) = backend.save(&self.scores) {
                warn!(%err, game_id, "failed saving high score, keeping scores in memory");
                self.backend = None;
            }
        }
        true
    }
}
