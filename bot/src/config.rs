use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sweeper_core::{CellCount, Coord, GameConfig, SolverConfig, SolverMode};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Beginner,
    Intermediate,
    Expert,
}

impl Preset {
    pub fn game_config(self) -> GameConfig {
        match self {
            Self::Beginner => GameConfig::beginner(),
            Self::Intermediate => GameConfig::intermediate(),
            Self::Expert => GameConfig::expert(),
        }
    }
}

/// Everything an autoplay run needs. Missing fields fall back to a batch of beginner games.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub width: Coord,
    pub height: Coord,
    pub mines: CellCount,
    pub games: u32,
    pub mode: SolverMode,
    /// Base seed; game `i` uses `seed + i`. Unset means fresh randomness every game.
    pub seed: Option<u64>,
    /// Estimator weights as exported JSON.
    pub weights: Option<PathBuf>,
    pub solver: SolverConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        let GameConfig {
            size: (width, height),
            mines,
        } = GameConfig::beginner();
        Self {
            width,
            height,
            mines,
            games: 100,
            mode: SolverMode::default(),
            seed: None,
            weights: None,
            solver: SolverConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        let GameConfig {
            size: (width, height),
            mines,
        } = preset.game_config();
        self.width = width;
        self.height = height;
        self.mines = mines;
    }

    /// Reads the estimator weights, if any are configured.
    pub fn load_weights(&self) -> Result<Option<Vec<u8>>> {
        let Some(path) = &self.weights else {
            return Ok(None);
        };
        let bytes = std::fs::read(path)
            .with_context(|| format!("Could not read estimator weights {}", path.display()))?;
        Ok(Some(bytes))
    }
}
