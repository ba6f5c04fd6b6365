use pysweeper_core::{GameConfig, GesturePolicy};
use serde::{Deserialize, Serialize};

use crate::utils::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Difficulty {
    Beginner,
    Intermediate,
    Expert,
}

impl Difficulty {
    pub(crate) const ALL: [Self; 3] = [Self::Beginner, Self::Intermediate, Self::Expert];

    pub(crate) const fn config(self) -> GameConfig {
        match self {
            Self::Beginner => GameConfig::beginner(),
            Self::Intermediate => GameConfig::intermediate(),
            Self::Expert => GameConfig::expert(),
        }
    }

    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Expert => "Expert",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Intermediate
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub difficulty: Difficulty,
    pub gesture: GesturePolicy,
    pub help_seen: bool,
}

impl StorageKey for Settings {
    const KEY: &'static str = "pysweeper:settings:v1";
}
