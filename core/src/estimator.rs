use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::*;

/// Side of the square window the estimator looks at, centered on the target cell.
pub const WINDOW_SIDE: usize = 5;

/// Number of inputs the estimator consumes.
pub const WINDOW_LEN: usize = WINDOW_SIDE * WINDOW_SIDE;

const OUT_OF_BOUNDS: f64 = 9.0;
const HIDDEN_FLAGGED: f64 = -2.0;
const HIDDEN: f64 = -1.0;

/// Raw parameter set as exported by the training pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorWeights {
    pub fc1_weight: Vec<Vec<f64>>,
    pub fc1_bias: Vec<f64>,
    pub fc2_weight: Vec<Vec<f64>>,
    pub fc2_bias: Vec<f64>,
    pub fc3_weight: Vec<Vec<f64>>,
    pub fc3_bias: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
struct Dense {
    weight: Array2<f64>,
    bias: Array1<f64>,
}

impl Dense {
    fn from_rows(
        layer: &'static str,
        rows: Vec<Vec<f64>>,
        bias: Vec<f64>,
        inputs: usize,
        outputs: Option<usize>,
    ) -> core::result::Result<Self, EstimatorError> {
        let shape_error = |found: (usize, usize)| EstimatorError::Shape {
            layer,
            expected: (outputs.unwrap_or(found.0), inputs),
            found,
        };

        let row_count = rows.len();
        if row_count == 0 || outputs.is_some_and(|outputs| outputs != row_count) {
            return Err(shape_error((row_count, rows.first().map_or(0, Vec::len))));
        }
        if let Some(bad_row) = rows.iter().find(|row| row.len() != inputs) {
            return Err(shape_error((row_count, bad_row.len())));
        }
        if bias.len() != row_count {
            return Err(EstimatorError::Shape {
                layer,
                expected: (row_count, 1),
                found: (bias.len(), 1),
            });
        }

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let weight = Array2::from_shape_vec((row_count, inputs), flat)
            .map_err(|_| shape_error((row_count, inputs)))?;

        Ok(Self {
            weight,
            bias: Array1::from(bias),
        })
    }

    fn outputs(&self) -> usize {
        self.weight.nrows()
    }

    fn forward(&self, input: &Array1<f64>) -> Array1<f64> {
        self.weight.dot(input) + &self.bias
    }
}

/// Fixed feed-forward network estimating the chance that a hidden cell holds a mine.
///
/// Two rectified hidden layers feed a single logistic output, so every prediction lies in `[0, 1]`.
/// Inference is pure: the same weights and window always give the same answer.
#[derive(Clone, Debug, PartialEq)]
pub struct Estimator {
    hidden1: Dense,
    hidden2: Dense,
    output: Dense,
}

impl Estimator {
    pub fn from_json(bytes: &[u8]) -> core::result::Result<Self, EstimatorError> {
        let weights: EstimatorWeights = serde_json::from_slice(bytes)?;
        Self::from_weights(weights)
    }

    pub fn from_weights(weights: EstimatorWeights) -> core::result::Result<Self, EstimatorError> {
        let hidden1 = Dense::from_rows("fc1", weights.fc1_weight, weights.fc1_bias, WINDOW_LEN, None)?;
        let hidden2 = Dense::from_rows(
            "fc2",
            weights.fc2_weight,
            weights.fc2_bias,
            hidden1.outputs(),
            None,
        )?;
        let output = Dense::from_rows(
            "fc3",
            weights.fc3_weight,
            weights.fc3_bias,
            hidden2.outputs(),
            Some(1),
        )?;

        log::debug!(
            "Loaded estimator with hidden layers {} and {}",
            hidden1.outputs(),
            hidden2.outputs()
        );
        Ok(Self {
            hidden1,
            hidden2,
            output,
        })
    }

    pub fn predict(&self, window: &[f64; WINDOW_LEN]) -> f64 {
        let input = Array1::from(window.to_vec());
        let hidden = self.hidden1.forward(&input).mapv(relu);
        let hidden = self.hidden2.forward(&hidden).mapv(relu);
        let logit = self.output.forward(&hidden)[0];
        sigmoid(logit)
    }

    /// Encodes and scores the window around `coords`.
    pub fn predict_at(&self, board: &Board, coords: Coord2) -> f64 {
        self.predict(&encode_window(board, coords))
    }
}

/// Encodes the 5x5 neighborhood of `target`, row-major: `9` off the board, `-2` flagged, `-1` hidden, else the
/// revealed count.
pub fn encode_window(board: &Board, target: Coord2) -> [f64; WINDOW_LEN] {
    let mut window = [OUT_OF_BOUNDS; WINDOW_LEN];
    let reach = (WINDOW_SIDE / 2) as isize;

    let offsets = (-reach..=reach).flat_map(|dy| (-reach..=reach).map(move |dx| (dx, dy)));
    for (slot, delta) in window.iter_mut().zip(offsets) {
        let Some(coords) = apply_delta(target, delta, board.size()) else {
            continue;
        };
        let cell = board.cell_at(coords);
        *slot = match cell.state() {
            CellState::Flagged => HIDDEN_FLAGGED,
            CellState::Hidden => HIDDEN,
            CellState::Revealed => f64::from(cell.neighbor_count()),
        };
    }

    window
}

fn relu(value: f64) -> f64 {
    value.max(0.0)
}

fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}
