use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::exercise::Exercise;
use crate::fruit::{DEFAULT_PLAYFIELD_HEIGHT, DEFAULT_PLAYFIELD_WIDTH, Playfield};
use crate::reps::RepThresholds;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CoachSettings {
    pub wall_angels: RepThresholds,
    pub cat_cow: RepThresholds,
    pub spinal_twist: RepThresholds,
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            wall_angels: RepThresholds::for_exercise(Exercise::WallAngels),
            cat_cow: RepThresholds::for_exercise(Exercise::CatCow),
            spinal_twist: RepThresholds::for_exercise(Exercise::SpinalTwist),
        }
    }
}

impl CoachSettings {
    pub fn thresholds(&self, exercise: Exercise) -> RepThresholds {
        match exercise {
            Exercise::WallAngels => self.wall_angels,
            Exercise::CatCow => self.cat_cow,
            Exercise::SpinalTwist => self.spinal_twist,
        }
    }

    pub fn sanitized(self) -> Self {
        Self {
            wall_angels: self
                .wall_angels
                .sanitized(RepThresholds::for_exercise(Exercise::WallAngels)),
            cat_cow: self.cat_cow.sanitized(RepThresholds::for_exercise(Exercise::CatCow)),
            spinal_twist: self
                .spinal_twist
                .sanitized(RepThresholds::for_exercise(Exercise::SpinalTwist)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ArcadeSettings {
    pub playfield: Playfield,
    pub seed: u64,
    /// Start a game on the first hand delivery when none is running.
    pub autostart: bool,
}

impl Default for ArcadeSettings {
    fn default() -> Self {
        Self {
            playfield: Playfield::default(),
            seed: 0x9E37_79B9_7F4A_7C15,
            autostart: true,
        }
    }
}

impl ArcadeSettings {
    pub fn sanitized(mut self) -> Self {
        if !(self.playfield.width.is_finite() && self.playfield.width > 0.0) {
            self.playfield.width = DEFAULT_PLAYFIELD_WIDTH;
        }
        if !(self.playfield.height.is_finite() && self.playfield.height > 0.0) {
            self.playfield.height = DEFAULT_PLAYFIELD_HEIGHT;
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    pub high_score_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub coach: CoachSettings,
    #[serde(default)]
    pub arcade: ArcadeSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            coach: CoachSettings::default(),
            arcade: ArcadeSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Settings {
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        self.coach = self.coach.sanitized();
        self.arcade = self.arcade.sanitized();
        self
    }
}

fn default_version() -> u32 {
    1
}

/// `$XDG_CONFIG_HOME/kinetic`, falling back to `$HOME/.config/kinetic`.
pub fn config_dir() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| {
                let mut p = PathBuf::from(home);
                p.push(".config");
                p
            })
        })
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("kinetic")
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("KINETIC_SETTINGS_PATH") {
            return Self::at(explicit);
        }
        Self::at(config_dir().join("settings.json"))
    }

    pub fn load(&self) -> Settings {
        let Ok(bytes) = fs::read(&self.path) else {
            return Settings::default();
        };
        match serde_json::from_slice::<Settings>(&bytes) {
            Ok(settings) => settings.sanitized(),
            Err(err) => {
                warn!(%err, path = %self.path.display(), "ignoring malformed settings file");
                Settings::default()
            }
        }
    }
}
