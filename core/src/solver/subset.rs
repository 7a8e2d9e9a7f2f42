use std::collections::BTreeSet;

use super::logic::numbered_cells;
use super::*;

/// Pairwise constraint difference: when one number's unknown neighbors are a subset of another's, the mines
/// left over for the difference are known.
///
/// Only numbers reachable through a shared unknown neighbor are paired, rather than every pair on the board.
#[derive(Copy, Clone, Debug, Default)]
pub struct SubsetSolver;

impl SubsetSolver {
    pub fn find(board: &Board) -> Option<Move> {
        for (first, first_count) in numbered_cells(board) {
            let inner = NeighborSummary::of(board, first);
            if inner.unknown.is_empty() {
                continue;
            }
            let inner_needed = inner.needed(first_count);

            let mut checked = BTreeSet::new();
            for &unknown in &inner.unknown {
                for second in board.iter_neighbors(unknown) {
                    if second == first || !checked.insert(second) {
                        continue;
                    }

                    let cell = board.cell_at(second);
                    if !cell.is_numbered() {
                        continue;
                    }

                    let outer = NeighborSummary::of(board, second);
                    let outer_needed = outer.needed(cell.neighbor_count());
                    if let Some(found) = Self::compare(&inner, inner_needed, &outer, outer_needed) {
                        log::trace!("{:?} within {:?} gives {:?}", first, second, found);
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    fn compare(
        inner: &NeighborSummary,
        inner_needed: i16,
        outer: &NeighborSummary,
        outer_needed: i16,
    ) -> Option<Move> {
        if !inner.unknown.iter().all(|pos| outer.unknown.contains(pos)) {
            return None;
        }

        let diff: SmallVec<[Coord2; 8]> = outer
            .unknown
            .iter()
            .copied()
            .filter(|pos| !inner.unknown.contains(pos))
            .collect();
        let &target = diff.first()?;

        let mines_in_diff = outer_needed - inner_needed;
        if mines_in_diff == 0 {
            Some(Move::certain(target, MoveKind::Open, Strategy::Subset))
        } else if mines_in_diff == diff.len() as i16 {
            Some(Move::certain(target, MoveKind::Flag, Strategy::Subset))
        } else {
            None
        }
    }
}

impl DeductionStage for SubsetSolver {
    fn name(&self) -> &'static str {
        "subset"
    }

    fn try_find(&mut self, board: &Board) -> Option<Move> {
        Self::find(board)
    }
}
