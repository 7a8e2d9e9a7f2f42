use core::fmt;
use std::collections::VecDeque;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Mines are placed lazily: a board stays `Uninitialized` until the first in-range `open`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardPhase {
    #[default]
    Uninitialized,
    Initialized,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    NoChange,
    Changed,
}

impl MarkOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    config: GameConfig,
    seed: u64,
    cells: Array2<Cell>,
    phase: BoardPhase,
    revealed_count: CellCount,
    flagged_count: CellCount,
    game_over: bool,
}

impl Board {
    /// Creates an empty board whose mines get placed on the first `open`, seeded from the process RNG.
    pub fn new(width: Coord, height: Coord, mine_count: CellCount) -> Result<Self> {
        Self::with_seed(width, height, mine_count, rand::random())
    }

    /// Same as [`Board::new`] with a fixed placement seed, for replays and tests.
    pub fn with_seed(width: Coord, height: Coord, mine_count: CellCount, seed: u64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidBoardSize);
        }

        let config = GameConfig::new_unchecked((width, height), mine_count);
        if mine_count > config.max_mines() {
            return Err(GameError::TooManyMines {
                mines: mine_count,
                max: config.max_mines(),
            });
        }

        Ok(Self {
            config,
            seed,
            cells: Array2::default(config.size.to_nd_index()),
            phase: BoardPhase::Uninitialized,
            revealed_count: 0,
            flagged_count: 0,
            game_over: false,
        })
    }

    pub fn from_config(config: GameConfig) -> Result<Self> {
        Self::new(config.size.0, config.size.1, config.mines)
    }

    /// Builds an already initialized board over a fixed layout. No safe opening is enforced.
    pub fn from_layout(layout: MineLayout) -> Self {
        let config = layout.game_config();
        let mut board = Self {
            config,
            seed: 0,
            cells: Array2::default(config.size.to_nd_index()),
            phase: BoardPhase::Uninitialized,
            revealed_count: 0,
            flagged_count: 0,
            game_over: false,
        };
        board.place_mines(&layout);
        board
    }

    pub fn size(&self) -> Coord2 {
        self.config.size
    }

    pub fn width(&self) -> Coord {
        self.config.size.0
    }

    pub fn height(&self) -> Coord {
        self.config.size.1
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn mine_count(&self) -> CellCount {
        self.config.mines
    }

    pub fn phase(&self) -> BoardPhase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count
    }

    pub fn flag_count(&self) -> CellCount {
        self.flagged_count
    }

    /// Mines not yet accounted for by a flag. Negative when the player over-flags.
    pub fn mines_left(&self) -> isize {
        (self.config.mines as isize) - (self.flagged_count as isize)
    }

    pub fn contains(&self, coords: Coord2) -> bool {
        coords.0 < self.width() && coords.1 < self.height()
    }

    /// # Panics
    ///
    /// When `coords` is outside the board, use [`Board::get`] for unchecked input.
    pub fn cell_at(&self, coords: Coord2) -> Cell {
        self.cells[coords.to_nd_index()]
    }

    pub fn get(&self, coords: Coord2) -> Option<Cell> {
        self.cells.get(coords.to_nd_index()).copied()
    }

    pub fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        NeighborIter::new(coords, self.size())
    }

    /// Every coordinate with its cell, row-major.
    pub fn iter_cells(&self) -> impl Iterator<Item = (Coord2, Cell)> + '_ {
        iter_row_major(self.size()).map(|coords| (coords, self.cell_at(coords)))
    }

    /// True once every non-mine cell is revealed. Flags play no part.
    pub fn check_clear(&self) -> bool {
        self.config.total_cells() - self.revealed_count == self.config.mines
    }

    /// Reveals a cell, flood-filling through zeros. Returns `false` only when a mine was revealed.
    pub fn open(&mut self, coords: Coord2) -> bool {
        if !self.contains(coords) {
            return true;
        }

        if self.phase == BoardPhase::Uninitialized {
            let generator = RandomLayoutGenerator::new(self.seed, coords);
            match generator.generate(self.config) {
                Ok(layout) => self.place_mines(&layout),
                Err(err) => {
                    log::error!("Could not place mines around {:?}: {}", coords, err);
                    return true;
                }
            }
        }

        let cell = self.cell_at(coords);
        if !cell.is_open_candidate() {
            return true;
        }

        self.reveal(coords);
        if cell.mine {
            log::debug!("Mine revealed at {:?}", coords);
            self.game_over = true;
            return false;
        }

        if cell.neighbor_count == 0 {
            self.flood_from(coords);
        }

        true
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> MarkOutcome {
        if !self.contains(coords) {
            return MarkOutcome::NoChange;
        }

        let cell = &mut self.cells[coords.to_nd_index()];
        match cell.state {
            CellState::Hidden => {
                cell.state = CellState::Flagged;
                self.flagged_count += 1;
            }
            CellState::Flagged => {
                cell.state = CellState::Hidden;
                self.flagged_count -= 1;
            }
            CellState::Revealed => return MarkOutcome::NoChange,
        }
        MarkOutcome::Changed
    }

    fn place_mines(&mut self, layout: &MineLayout) {
        for coords in iter_row_major(self.size()) {
            let cell = &mut self.cells[coords.to_nd_index()];
            cell.mine = layout.contains_mine(coords);
            cell.neighbor_count = if cell.mine {
                0
            } else {
                layout.adjacent_mine_count(coords)
            };
        }
        self.phase = BoardPhase::Initialized;
    }

    fn reveal(&mut self, coords: Coord2) {
        self.cells[coords.to_nd_index()].state = CellState::Revealed;
        self.revealed_count += 1;
    }

    /// Opens the neighbors of a revealed zero, and theirs in turn, stopping at revealed and flagged cells.
    fn flood_from(&mut self, origin: Coord2) {
        let mut to_visit: VecDeque<Coord2> = self.iter_neighbors(origin).collect();

        while let Some(coords) = to_visit.pop_front() {
            let cell = self.cell_at(coords);
            if !cell.is_open_candidate() {
                continue;
            }

            self.reveal(coords);
            log::trace!(
                "Flood opened cell at {:?}, mine count: {}",
                coords,
                cell.neighbor_count
            );

            if cell.neighbor_count == 0 {
                to_visit.extend(
                    self.iter_neighbors(coords)
                        .filter(|&pos| self.cell_at(pos).is_open_candidate()),
                );
            }
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height() {
            for x in 0..self.width() {
                let cell = self.cell_at((x, y));
                let symbol = match cell.state {
                    CellState::Hidden => '-',
                    CellState::Flagged => 'F',
                    CellState::Revealed if cell.mine => '*',
                    CellState::Revealed if cell.neighbor_count == 0 => '.',
                    CellState::Revealed => char::from(b'0' + cell.neighbor_count),
                };
                if x > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_board(size: Coord2, mines: &[Coord2]) -> Board {
        Board::from_layout(MineLayout::from_mine_coords(size, mines).unwrap())
    }

    #[test]
    fn open_out_of_range_is_a_no_op() {
        let mut board = Board::with_seed(9, 9, 10, 3).unwrap();
        let before = board.clone();

        assert!(board.open((9, 0)));
        assert!(board.open((0, 200)));

        assert_eq!(board, before);
        assert_eq!(board.phase(), BoardPhase::Uninitialized);
    }

    #[test]
    fn first_open_is_always_a_safe_zero() {
        for seed in 0..64 {
            let mut board = Board::with_seed(9, 9, 30, seed).unwrap();

            assert!(board.open((4, 4)));

            assert_eq!(board.phase(), BoardPhase::Initialized);
            assert_eq!(board.cell_at((4, 4)).neighbor_count(), 0);
            for pos in board.iter_neighbors((4, 4)) {
                assert!(!board.cell_at(pos).is_mine());
                assert!(board.cell_at(pos).is_revealed());
            }
        }
    }

    #[test]
    fn dense_boundary_board_still_places() {
        let mut board = Board::with_seed(4, 4, 16 - 9, 11).unwrap();

        assert!(board.open((0, 0)));

        let mines = board.iter_cells().filter(|(_, cell)| cell.is_mine()).count();
        assert_eq!(mines, 7);
    }

    #[test]
    fn rejects_crowded_boards() {
        assert_eq!(
            Board::new(3, 3, 1).err(),
            Some(GameError::TooManyMines { mines: 1, max: 0 })
        );
        assert_eq!(Board::new(0, 3, 0).err(), Some(GameError::InvalidBoardSize));
    }

    #[test]
    fn zero_floods_its_whole_neighborhood() {
        let mut board = layout_board((3, 3), &[]);

        assert!(board.open((1, 1)));

        assert_eq!(board.revealed_count(), 9);
        assert!(board.check_clear());
    }

    #[test]
    fn flood_stops_at_numbers_and_flags() {
        let mut board = layout_board((5, 1), &[(4, 0)]);
        board.toggle_flag((1, 0));

        assert!(board.open((2, 0)));

        assert!(board.cell_at((3, 0)).is_revealed());
        assert_eq!(board.cell_at((3, 0)).neighbor_count(), 1);
        assert!(board.cell_at((1, 0)).is_flagged());
        assert!(!board.cell_at((0, 0)).is_revealed());
        assert!(!board.cell_at((4, 0)).is_revealed());
        assert_eq!(board.revealed_count(), 2);
    }

    #[test]
    fn reopening_is_idempotent() {
        let mut board = layout_board((3, 3), &[(2, 2)]);

        assert!(board.open((0, 0)));
        let revealed = board.revealed_count();
        assert!(board.open((0, 0)));
        assert!(board.open((1, 1)));

        assert_eq!(board.revealed_count(), revealed);
        assert!(board.check_clear());
    }

    #[test]
    fn opening_a_mine_ends_the_game() {
        let mut board = layout_board((2, 2), &[(0, 0)]);

        assert!(!board.open((0, 0)));

        assert!(board.is_game_over());
        assert!(board.cell_at((0, 0)).is_revealed());
        assert!(!board.check_clear());
    }

    #[test]
    fn flagged_cells_cannot_be_opened() {
        let mut board = layout_board((2, 2), &[(0, 0)]);
        board.toggle_flag((0, 0));

        assert!(board.open((0, 0)));

        assert!(!board.is_game_over());
        assert!(board.cell_at((0, 0)).is_flagged());
    }

    #[test]
    fn toggle_flag_ignores_revealed_and_out_of_range() {
        let mut board = layout_board((3, 1), &[(0, 0)]);
        board.open((2, 0));

        assert_eq!(board.toggle_flag((2, 0)), MarkOutcome::NoChange);
        assert_eq!(board.toggle_flag((7, 0)), MarkOutcome::NoChange);
        assert_eq!(board.toggle_flag((0, 0)), MarkOutcome::Changed);
        assert_eq!(board.flag_count(), 1);
        assert_eq!(board.mines_left(), 0);
        assert_eq!(board.toggle_flag((0, 0)), MarkOutcome::Changed);
        assert_eq!(board.flag_count(), 0);
    }

    #[test]
    fn check_clear_ignores_flags() {
        let mut board = layout_board((3, 1), &[(0, 0)]);
        board.toggle_flag((1, 0));
        board.toggle_flag((2, 0));
        assert!(!board.check_clear());

        board.toggle_flag((1, 0));
        board.toggle_flag((2, 0));
        board.open((1, 0));
        board.open((2, 0));

        assert!(board.check_clear());
    }

    #[test]
    fn renders_visible_state() {
        let mut board = layout_board((3, 2), &[(0, 0)]);
        board.open((2, 1));
        board.toggle_flag((0, 0));

        assert_eq!(board.to_string(), "F 1 .\n- 1 .\n");
    }
}
