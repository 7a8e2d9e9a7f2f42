use std::collections::VecDeque;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::*;

/// A numbered cell's requirement over some of its segment's unknowns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The numbered cell this rule comes from.
    pub clue: Coord2,
    /// Indices into the owning segment's `unknowns`.
    pub cell_indices: Vec<usize>,
    /// Count minus flags already placed around the clue. Negative only on over-flagged boards.
    pub required_mines: i16,
}

/// A connected group of frontier cells whose rules never mention a cell outside the group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub unknowns: Vec<Coord2>,
    pub rules: Vec<Rule>,
}

/// Outcome of exhaustively enumerating a segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumeration {
    /// Number of assignments satisfying every rule. Zero means the rules contradict each other.
    pub total: u64,
    /// Per unknown, how many of those assignments make it a mine.
    pub mine_counts: Vec<u64>,
}

impl Enumeration {
    pub fn probability(&self, index: usize) -> f64 {
        self.mine_counts[index] as f64 / self.total as f64
    }

    pub fn is_certainly_safe(&self, index: usize) -> bool {
        self.total > 0 && self.mine_counts[index] == 0
    }

    pub fn is_certainly_mine(&self, index: usize) -> bool {
        self.total > 0 && self.mine_counts[index] == self.total
    }
}

impl Segment {
    pub fn len(&self) -> usize {
        self.unknowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unknowns.is_empty()
    }

    /// Tries every mine/safe assignment of the unknowns, mine first, abandoning a branch as soon as some rule can
    /// no longer be met.
    pub fn enumerate(&self) -> Enumeration {
        let mut cell_rules = vec![Vec::new(); self.unknowns.len()];
        for (rule_id, rule) in self.rules.iter().enumerate() {
            for &cell in &rule.cell_indices {
                cell_rules[cell].push(rule_id);
            }
        }

        let mut search = Search {
            segment: self,
            cell_rules,
            placed_mines: vec![0; self.rules.len()],
            unassigned: self
                .rules
                .iter()
                .map(|rule| rule.cell_indices.len() as i16)
                .collect(),
            assignment: vec![false; self.unknowns.len()],
            result: Enumeration {
                total: 0,
                mine_counts: vec![0; self.unknowns.len()],
            },
        };
        search.visit(0);

        log::trace!(
            "Segment of {} unknowns and {} rules has {} solutions",
            self.unknowns.len(),
            self.rules.len(),
            search.result.total
        );
        search.result
    }
}

struct Search<'a> {
    segment: &'a Segment,
    cell_rules: Vec<Vec<usize>>,
    placed_mines: Vec<i16>,
    unassigned: Vec<i16>,
    assignment: Vec<bool>,
    result: Enumeration,
}

impl Search<'_> {
    fn visit(&mut self, index: usize) {
        if index == self.assignment.len() {
            self.record();
            return;
        }

        for is_mine in [true, false] {
            if self.fits(index, is_mine) {
                self.assign(index, is_mine);
                self.visit(index + 1);
                self.unassign(index, is_mine);
            }
        }
    }

    /// Whether giving `index` this value keeps every rule it touches satisfiable.
    fn fits(&self, index: usize, is_mine: bool) -> bool {
        self.cell_rules[index].iter().all(|&rule_id| {
            let required = self.segment.rules[rule_id].required_mines;
            let mines = self.placed_mines[rule_id] + i16::from(is_mine);
            let still_open = self.unassigned[rule_id] - 1;
            mines <= required && mines + still_open >= required
        })
    }

    fn assign(&mut self, index: usize, is_mine: bool) {
        self.assignment[index] = is_mine;
        for &rule_id in &self.cell_rules[index] {
            self.placed_mines[rule_id] += i16::from(is_mine);
            self.unassigned[rule_id] -= 1;
        }
    }

    fn unassign(&mut self, index: usize, is_mine: bool) {
        self.assignment[index] = false;
        for &rule_id in &self.cell_rules[index] {
            self.placed_mines[rule_id] -= i16::from(is_mine);
            self.unassigned[rule_id] += 1;
        }
    }

    fn record(&mut self) {
        let satisfied = self
            .segment
            .rules
            .iter()
            .zip(&self.placed_mines)
            .all(|(rule, &mines)| mines == rule.required_mines);
        if !satisfied {
            return;
        }

        self.result.total += 1;
        for (count, &is_mine) in self.result.mine_counts.iter_mut().zip(&self.assignment) {
            *count += u64::from(is_mine);
        }
    }
}

/// A numbered cell whose flags do not yet account for its count, with the unknowns around it.
struct ActiveClue {
    coords: Coord2,
    unknown_ids: SmallVec<[usize; 8]>,
    required_mines: i16,
}

/// Splits the frontier into independent segments.
///
/// Frontier cells live in one arena and are referred to by index; two of them are linked when some active clue
/// sees both, and each connected component, found breadth-first, becomes a segment.
pub fn build_segments(board: &Board) -> Vec<Segment> {
    let mut frontier: Vec<Coord2> = Vec::new();
    let mut frontier_ids: Array2<Option<usize>> = Array2::from_elem(board.size().to_nd_index(), None);
    let mut clues = Vec::new();

    for (coords, cell) in board.iter_cells() {
        if !cell.is_numbered() {
            continue;
        }

        let summary = NeighborSummary::of(board, coords);
        if summary.flagged >= cell.neighbor_count() || summary.unknown.is_empty() {
            continue;
        }

        let unknown_ids = summary
            .unknown
            .iter()
            .map(|&pos| {
                *frontier_ids[pos.to_nd_index()].get_or_insert_with(|| {
                    frontier.push(pos);
                    frontier.len() - 1
                })
            })
            .collect();

        clues.push(ActiveClue {
            coords,
            unknown_ids,
            required_mines: summary.needed(cell.neighbor_count()),
        });
    }

    let mut links = vec![Vec::new(); frontier.len()];
    for clue in &clues {
        for (i, &left) in clue.unknown_ids.iter().enumerate() {
            for &right in &clue.unknown_ids[i + 1..] {
                links[left].push(right);
                links[right].push(left);
            }
        }
    }

    // (segment, index within segment) for every frontier cell
    let mut placement: Vec<Option<(usize, usize)>> = vec![None; frontier.len()];
    let mut segments: Vec<Segment> = Vec::new();

    for start in 0..frontier.len() {
        if placement[start].is_some() {
            continue;
        }

        let segment_id = segments.len();
        let mut segment = Segment::default();
        let mut queue = VecDeque::from([start]);
        let mut enqueued = 1;
        placement[start] = Some((segment_id, 0));

        // dequeue order equals enqueue order, so the local index is known up front
        while let Some(current) = queue.pop_front() {
            segment.unknowns.push(frontier[current]);
            for &next in &links[current] {
                if placement[next].is_none() {
                    placement[next] = Some((segment_id, enqueued));
                    enqueued += 1;
                    queue.push_back(next);
                }
            }
        }
        segments.push(segment);
    }

    for clue in clues {
        let Some(&first) = clue.unknown_ids.first() else {
            continue;
        };
        let Some((segment_id, _)) = placement[first] else {
            continue;
        };

        let cell_indices = clue
            .unknown_ids
            .iter()
            .filter_map(|&id| placement[id].map(|(_, local)| local))
            .collect();
        segments[segment_id].rules.push(Rule {
            clue: clue.coords,
            cell_indices,
            required_mines: clue.required_mines,
        });
    }

    segments
}

/// Exact marginal probabilities over the frontier, one segment at a time.
#[derive(Copy, Clone, Debug, Default)]
pub struct SegmentSolver {
    config: SolverConfig,
}

impl SegmentSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn find(&self, board: &Board) -> Option<Move> {
        let mut best: Option<(f64, Coord2)> = None;

        for segment in build_segments(board) {
            if segment.len() > self.config.max_segment_unknowns {
                log::debug!(
                    "Skipping segment of {} unknowns (limit {})",
                    segment.len(),
                    self.config.max_segment_unknowns
                );
                continue;
            }

            let enumeration = segment.enumerate();
            if enumeration.total == 0 {
                log::debug!("Segment at {:?} has no consistent assignment", segment.unknowns.first());
                continue;
            }

            for (index, &coords) in segment.unknowns.iter().enumerate() {
                if enumeration.is_certainly_safe(index) {
                    return Some(Move::certain(coords, MoveKind::Open, Strategy::Tank));
                }
                if enumeration.is_certainly_mine(index) && !board.cell_at(coords).is_flagged() {
                    return Some(Move::certain(coords, MoveKind::Flag, Strategy::Tank));
                }

                let probability = enumeration.probability(index);
                if probability < best.map_or(1.0, |(lowest, _)| lowest) {
                    best = Some((probability, coords));
                }
            }
        }

        best.map(|(probability, coords)| {
            Move::new(coords, MoveKind::Open, Strategy::TankProbability, 1.0 - probability)
        })
    }
}

impl DeductionStage for SegmentSolver {
    fn name(&self) -> &'static str {
        "segment"
    }

    fn try_find(&mut self, board: &Board) -> Option<Move> {
        self.find(board)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::solver::tests::layout_board;

    fn segment(unknowns: usize, rules: &[(&[usize], i16)]) -> Segment {
        Segment {
            unknowns: (0..unknowns).map(|x| (x as Coord, 0)).collect(),
            rules: rules
                .iter()
                .map(|&(cells, required_mines)| Rule {
                    clue: (0, 1),
                    cell_indices: cells.to_vec(),
                    required_mines,
                })
                .collect(),
        }
    }

    #[test]
    fn one_of_two_is_even() {
        let enumeration = segment(2, &[(&[0, 1], 1)]).enumerate();

        assert_eq!(enumeration.total, 2);
        assert_eq!(enumeration.probability(0), 0.5);
        assert_eq!(enumeration.probability(1), 0.5);
    }

    #[test]
    fn overlapping_rules_pin_down_cells() {
        // a+b = 1, a+b+c = 2, b+c = 1
        let enumeration = segment(3, &[(&[0, 1], 1), (&[0, 1, 2], 2), (&[1, 2], 1)]).enumerate();

        assert_eq!(enumeration.total, 1);
        assert!(enumeration.is_certainly_mine(0));
        assert!(enumeration.is_certainly_safe(1));
        assert!(enumeration.is_certainly_mine(2));
    }

    #[test]
    fn counts_every_solution() {
        // two of four, with the first pair holding exactly one
        let enumeration = segment(4, &[(&[0, 1, 2, 3], 2), (&[0, 1], 1)]).enumerate();

        assert_eq!(enumeration.total, 4);
        assert_eq!(enumeration.mine_counts, vec![2, 2, 2, 2]);
    }

    #[test]
    fn contradiction_has_no_solutions() {
        let enumeration = segment(2, &[(&[0, 1], 1), (&[0, 1], 2)]).enumerate();

        assert_eq!(enumeration.total, 0);
        assert!(!enumeration.is_certainly_safe(0));
        assert!(!enumeration.is_certainly_mine(0));
    }

    #[test]
    fn one_by_three_board_is_one_segment() {
        let mut board = layout_board((3, 1), &[(2, 0)]);
        board.open((1, 0));

        let segments = build_segments(&board);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].unknowns, vec![(0, 0), (2, 0)]);
        assert_eq!(segments[0].rules.len(), 1);
        assert_eq!(segments[0].rules[0].required_mines, 1);
        let enumeration = segments[0].enumerate();
        assert_eq!(enumeration.probability(0), 0.5);
        assert_eq!(enumeration.probability(1), 0.5);
    }

    #[test]
    fn separated_frontiers_split() {
        let mut board = layout_board((7, 1), &[(0, 0), (6, 0)]);
        board.open((3, 0));

        let segments = build_segments(&board);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].unknowns, vec![(0, 0)]);
        assert_eq!(segments[1].unknowns, vec![(6, 0)]);
    }

    #[test]
    fn satisfied_clues_do_not_constrain() {
        let mut board = layout_board((3, 1), &[(2, 0)]);
        board.open((1, 0));
        board.toggle_flag((2, 0));

        assert!(build_segments(&board).is_empty());
    }

    #[test]
    fn segments_partition_the_frontier() {
        for seed in 0..40 {
            let mut board = Board::with_seed(16, 16, 40, seed).unwrap();
            board.open((8, 8));
            let mut solver = Solver::new(SolverMode::Hybrid).with_seed(seed);
            // advance a few turns to get a ragged frontier
            for _ in 0..6 {
                let Some(next) = solver.next_move(&board) else {
                    break;
                };
                match next.kind {
                    MoveKind::Open => {
                        board.open(next.coords);
                    }
                    MoveKind::Flag => {
                        board.toggle_flag(next.coords);
                    }
                }
            }
            if board.is_game_over() {
                continue;
            }

            let expected: BTreeSet<Coord2> = board
                .iter_cells()
                .filter(|(coords, cell)| {
                    cell.is_open_candidate()
                        && board.iter_neighbors(*coords).any(|pos| {
                            let clue = board.cell_at(pos);
                            clue.is_numbered()
                                && NeighborSummary::of(&board, pos).flagged < clue.neighbor_count()
                        })
                })
                .map(|(coords, _)| coords)
                .collect();

            let segments = build_segments(&board);
            let mut seen = BTreeSet::new();
            for segment in &segments {
                for &coords in &segment.unknowns {
                    assert!(seen.insert(coords), "{coords:?} appears twice");
                }
                for rule in &segment.rules {
                    assert!(!rule.cell_indices.is_empty());
                    for &index in &rule.cell_indices {
                        let coords = segment.unknowns[index];
                        assert!(is_adjacent_or_same(coords, rule.clue));
                    }
                    let local: BTreeSet<_> = rule.cell_indices.iter().collect();
                    assert_eq!(local.len(), rule.cell_indices.len());
                    assert_eq!(
                        rule.cell_indices.len(),
                        NeighborSummary::of(&board, rule.clue).unknown.len()
                    );
                }
            }
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn finds_certain_mine_in_one_two_one() {
        let mut board = layout_board((3, 2), &[(0, 0), (2, 0)]);
        for x in 0..3 {
            board.open((x, 1));
        }

        assert_eq!(
            SegmentSolver::default().try_find(&board),
            Some(Move::certain((0, 0), MoveKind::Flag, Strategy::Tank))
        );
    }

    #[test]
    fn best_guess_when_nothing_is_certain() {
        let mut board = layout_board((3, 1), &[(2, 0)]);
        board.open((1, 0));

        let found = SegmentSolver::new(SolverConfig::default()).try_find(&board).unwrap();

        assert_eq!(found.strategy, Strategy::TankProbability);
        assert_eq!(found.coords, (0, 0));
        assert_eq!(found.confidence, 0.5);
        assert!(found.is_guess);
    }

    #[test]
    fn oversized_segments_are_skipped() {
        let mut board = layout_board((3, 1), &[(2, 0)]);
        board.open((1, 0));
        let config = SolverConfig {
            max_segment_unknowns: 1,
        };

        assert_eq!(SegmentSolver::new(config).try_find(&board), None);
    }
}
