use super::*;

/// The two single-cell rules: a number already satisfied by its flags clears the rest of its neighbors, and a
/// number with exactly as many hidden neighbors as its count makes all of them mines.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogicSolver;

impl LogicSolver {
    /// First hidden, unflagged neighbor of a number whose flags already match it.
    pub fn find_safe(board: &Board) -> Option<Move> {
        numbered_cells(board).find_map(|(coords, count)| {
            let summary = NeighborSummary::of(board, coords);
            if summary.flagged != count {
                return None;
            }
            summary
                .unknown
                .first()
                .map(|&target| Move::certain(target, MoveKind::Open, Strategy::Logic))
        })
    }

    /// First unflagged neighbor of a number whose hidden neighbors must all be mines.
    pub fn find_mine(board: &Board) -> Option<Move> {
        numbered_cells(board).find_map(|(coords, count)| {
            let summary = NeighborSummary::of(board, coords);
            if summary.hidden() != usize::from(count) {
                return None;
            }
            summary
                .unknown
                .first()
                .map(|&target| Move::certain(target, MoveKind::Flag, Strategy::Logic))
        })
    }
}

impl DeductionStage for LogicSolver {
    fn name(&self) -> &'static str {
        "logic"
    }

    fn try_find(&mut self, board: &Board) -> Option<Move> {
        Self::find_safe(board).or_else(|| Self::find_mine(board))
    }
}

/// Revealed cells showing a non-zero count, row-major.
pub(crate) fn numbered_cells(board: &Board) -> impl Iterator<Item = (Coord2, u8)> + '_ {
    board
        .iter_cells()
        .filter(|(_, cell)| cell.is_numbered())
        .map(|(coords, cell)| (coords, cell.neighbor_count()))
}
