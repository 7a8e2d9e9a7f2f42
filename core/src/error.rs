use thiserror::Error;

use crate::CellCount;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Board must be at least one cell wide and tall")]
    InvalidBoardSize,
    #[error("Too many mines: requested {mines} but at most {max} fit around a safe opening")]
    TooManyMines { mines: CellCount, max: CellCount },
}

pub type Result<T> = core::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("Could not parse estimator weights")]
    Parse(#[from] serde_json::Error),
    #[error("Layer {layer} has shape {found:?}, expected {expected:?}")]
    Shape {
        layer: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
}
