use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

use super::*;

/// Opens the hidden cell the estimator considers least likely to be a mine.
#[derive(Copy, Clone, Debug)]
pub struct EstimatorStage<'a> {
    estimator: &'a Estimator,
    strategy: Strategy,
}

impl<'a> EstimatorStage<'a> {
    /// `strategy` tags the produced moves, so hybrid and pure play stay distinguishable in statistics.
    pub fn new(estimator: &'a Estimator, strategy: Strategy) -> Self {
        Self { estimator, strategy }
    }

    pub fn find(&self, board: &Board) -> Option<Move> {
        let mut best: Option<(f64, Coord2)> = None;
        for (coords, cell) in board.iter_cells() {
            if !cell.is_open_candidate() {
                continue;
            }

            let probability = self.estimator.predict_at(board, coords);
            log::trace!("Estimated {:.3} at {:?}", probability, coords);
            if probability < best.map_or(1.0, |(lowest, _)| lowest) {
                best = Some((probability, coords));
            }
        }

        best.map(|(probability, coords)| Move::new(coords, MoveKind::Open, self.strategy, 1.0 - probability))
    }
}

impl DeductionStage for EstimatorStage<'_> {
    fn name(&self) -> &'static str {
        "estimator"
    }

    fn try_find(&mut self, board: &Board) -> Option<Move> {
        self.find(board)
    }
}

/// Last resort: a uniformly random hidden cell.
#[derive(Debug)]
pub struct RandomStage<'r> {
    rng: &'r mut SmallRng,
}

impl<'r> RandomStage<'r> {
    pub fn new(rng: &'r mut SmallRng) -> Self {
        Self { rng }
    }
}

impl DeductionStage for RandomStage<'_> {
    fn name(&self) -> &'static str {
        "random"
    }

    fn try_find(&mut self, board: &Board) -> Option<Move> {
        let candidates: Vec<Coord2> = board
            .iter_cells()
            .filter(|(_, cell)| cell.is_open_candidate())
            .map(|(coords, _)| coords)
            .collect();

        let &coords = candidates.choose(&mut *self.rng)?;
        Some(Move::new(coords, MoveKind::Open, Strategy::Random, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::estimator::tests::hidden_counting_weights;
    use crate::solver::tests::layout_board;

    #[test]
    fn estimator_picks_lowest_prediction() {
        let mut board = layout_board((3, 3), &[(0, 0), (0, 1)]);
        board.open((2, 0));
        let estimator = Estimator::from_weights(hidden_counting_weights()).unwrap();

        let found = EstimatorStage::new(&estimator, Strategy::Ai).find(&board).unwrap();

        let lowest = board
            .iter_cells()
            .filter(|(_, cell)| cell.is_open_candidate())
            .map(|(coords, _)| estimator.predict_at(&board, coords))
            .fold(1.0, f64::min);
        assert_eq!(found.strategy, Strategy::Ai);
        assert_eq!(found.kind, MoveKind::Open);
        assert_eq!(found.confidence, 1.0 - lowest);
        assert!(board.cell_at(found.coords).is_open_candidate());
    }

    #[test]
    fn estimator_ignores_flagged_cells() {
        let mut board = layout_board((2, 1), &[(1, 0)]);
        board.toggle_flag((0, 0));
        let estimator = Estimator::from_weights(hidden_counting_weights()).unwrap();

        let found = EstimatorStage::new(&estimator, Strategy::PureAi).find(&board).unwrap();

        assert_eq!(found.coords, (1, 0));
        assert_eq!(found.strategy, Strategy::PureAi);
    }

    #[test]
    fn random_only_picks_hidden_cells() {
        let mut board = layout_board((4, 4), &[(3, 3)]);
        board.open((0, 0));
        board.toggle_flag((3, 3));
        let mut rng = SmallRng::seed_from_u64(3);

        // only the flagged mine is left, which is not an open candidate
        assert_eq!(RandomStage::new(&mut rng).try_find(&board), None);

        let board = layout_board((4, 4), &[(3, 3)]);
        for _ in 0..32 {
            let found = RandomStage::new(&mut rng).try_find(&board).unwrap();
            assert!(board.cell_at(found.coords).is_open_candidate());
            assert_eq!(found.strategy, Strategy::Random);
            assert_eq!(found.confidence, 0.0);
        }
    }
}
