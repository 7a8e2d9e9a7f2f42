use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::*;
pub use fallback::*;
pub use logic::*;
pub use segment::*;
pub use subset::*;

mod fallback;
mod logic;
mod segment;
mod subset;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    Open,
    Flag,
}

/// Which stage produced a move.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strategy {
    Logic,
    Subset,
    /// Exact segment enumeration found the cell certainly safe or certainly a mine.
    Tank,
    /// Lowest marginal mine probability across all enumerated segments.
    TankProbability,
    Ai,
    PureAi,
    Random,
}

impl Strategy {
    pub const fn is_guess(self) -> bool {
        match self {
            Self::Logic | Self::Subset | Self::Tank => false,
            Self::TankProbability | Self::Ai | Self::PureAi | Self::Random => true,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Logic => "Logic",
            Self::Subset => "Subset",
            Self::Tank => "Tank",
            Self::TankProbability => "Tank(Prob)",
            Self::Ai => "AI",
            Self::PureAi => "PureAI",
            Self::Random => "Random",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A suggested action. `confidence` is the claimed probability that the move is right, `1.0` meaning certain.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub coords: Coord2,
    pub kind: MoveKind,
    pub is_guess: bool,
    pub strategy: Strategy,
    pub confidence: f64,
}

impl Move {
    pub fn new(coords: Coord2, kind: MoveKind, strategy: Strategy, confidence: f64) -> Self {
        Self {
            coords,
            kind,
            is_guess: strategy.is_guess(),
            strategy,
            confidence,
        }
    }

    pub fn certain(coords: Coord2, kind: MoveKind, strategy: Strategy) -> Self {
        Self::new(coords, kind, strategy, 1.0)
    }

    pub fn x(&self) -> Coord {
        self.coords.0
    }

    pub fn y(&self) -> Coord {
        self.coords.1
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverMode {
    /// Logic, subset, segment enumeration, then estimator or random.
    #[default]
    Hybrid,
    /// Estimator ranking only, random when it has nothing to offer.
    PureAi,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown solver mode {0:?}, expected \"hybrid\" or \"pure-ai\"")]
pub struct ParseModeError(String);

impl FromStr for SolverMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "pure-ai" | "pureai" | "ai" => Ok(Self::PureAi),
            _ => Err(ParseModeError(s.to_owned())),
        }
    }
}

/// Largest segment enumerated exhaustively; beyond this 2^n blows up.
pub const DEFAULT_MAX_SEGMENT_UNKNOWNS: usize = 18;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_segment_unknowns: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_segment_unknowns: DEFAULT_MAX_SEGMENT_UNKNOWNS,
        }
    }
}

/// One step of the move-decision pipeline.
pub trait DeductionStage {
    fn name(&self) -> &'static str;

    fn try_find(&mut self, board: &Board) -> Option<Move>;
}

/// Picks the next move for a board by running deduction stages in priority order.
///
/// The solver never keeps the board: it is borrowed for the duration of [`Solver::next_move`] only, so the same
/// solver can follow a game turn after turn.
#[derive(Clone, Debug)]
pub struct Solver {
    mode: SolverMode,
    config: SolverConfig,
    estimator: Option<Arc<Estimator>>,
    rng: SmallRng,
}

impl Solver {
    pub fn new(mode: SolverMode) -> Self {
        Self {
            mode,
            config: SolverConfig::default(),
            estimator: None,
            rng: SmallRng::from_os_rng(),
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Makes the random fallback reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<Estimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Loads estimator weights; on failure the estimator stays disabled and moves degrade to random picks.
    pub fn with_estimator_json(mut self, bytes: &[u8]) -> Self {
        match Estimator::from_json(bytes) {
            Ok(estimator) => self.estimator = Some(Arc::new(estimator)),
            Err(err) => {
                log::warn!("Estimator disabled, falling back to random guesses: {}", err);
                self.estimator = None;
            }
        }
        self
    }

    pub fn mode(&self) -> SolverMode {
        self.mode
    }

    pub fn config(&self) -> SolverConfig {
        self.config
    }

    pub fn has_estimator(&self) -> bool {
        self.estimator.is_some()
    }

    /// Returns `None` once the board is resolved: exploded, cleared, or without any cell left to open.
    pub fn next_move(&mut self, board: &Board) -> Option<Move> {
        if board.is_game_over() || board.check_clear() {
            return None;
        }

        let mut stages = self.pipeline();
        for stage in stages.iter_mut() {
            if let Some(found) = stage.try_find(board) {
                log::debug!(
                    "{} chose {:?} {:?} (confidence {:.3})",
                    stage.name(),
                    found.kind,
                    found.coords,
                    found.confidence
                );
                return Some(found);
            }
            log::trace!("{} found nothing", stage.name());
        }
        None
    }

    fn pipeline(&mut self) -> Vec<Box<dyn DeductionStage + '_>> {
        let Self {
            mode,
            config,
            estimator,
            rng,
        } = self;

        let mut stages: Vec<Box<dyn DeductionStage + '_>> = Vec::with_capacity(5);
        if *mode == SolverMode::Hybrid {
            stages.push(Box::new(LogicSolver));
            stages.push(Box::new(SubsetSolver));
            stages.push(Box::new(SegmentSolver::new(*config)));
        }

        if let Some(estimator) = estimator.as_deref() {
            let strategy = match mode {
                SolverMode::Hybrid => Strategy::Ai,
                SolverMode::PureAi => Strategy::PureAi,
            };
            stages.push(Box::new(EstimatorStage::new(estimator, strategy)));
        }
        stages.push(Box::new(RandomStage::new(rng)));
        stages
    }
}

/// What a numbered cell sees around it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct NeighborSummary {
    pub flagged: u8,
    /// Hidden, unflagged neighbors in scan order.
    pub unknown: SmallVec<[Coord2; 8]>,
}

impl NeighborSummary {
    pub fn of(board: &Board, coords: Coord2) -> Self {
        let mut flagged = 0;
        let mut unknown = SmallVec::new();
        for pos in board.iter_neighbors(coords) {
            match board.cell_at(pos).state() {
                CellState::Flagged => flagged += 1,
                CellState::Hidden => unknown.push(pos),
                CellState::Revealed => {}
            }
        }
        Self { flagged, unknown }
    }

    /// Mines still unaccounted for around a cell showing `count`. Negative when over-flagged.
    pub fn needed(&self, count: u8) -> i16 {
        i16::from(count) - i16::from(self.flagged)
    }

    pub fn hidden(&self) -> usize {
        usize::from(self.flagged) + self.unknown.len()
    }
}
