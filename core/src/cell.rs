use serde::{Deserialize, Serialize};

/// Player-visible state of a single cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Hidden,
    Flagged,
    Revealed,
}

/// One square of the board. `neighbor_count` is only meaningful once mines are placed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub(crate) mine: bool,
    pub(crate) neighbor_count: u8,
    pub(crate) state: CellState,
}

impl Cell {
    pub const fn is_mine(self) -> bool {
        self.mine
    }

    pub const fn neighbor_count(self) -> u8 {
        self.neighbor_count
    }

    pub const fn state(self) -> CellState {
        self.state
    }

    pub const fn is_revealed(self) -> bool {
        matches!(self.state, CellState::Revealed)
    }

    pub const fn is_flagged(self) -> bool {
        matches!(self.state, CellState::Flagged)
    }

    /// Not revealed, whether flagged or not.
    pub const fn is_hidden(self) -> bool {
        !self.is_revealed()
    }

    /// Hidden and not flagged: the only cells a move may still target.
    pub const fn is_open_candidate(self) -> bool {
        matches!(self.state, CellState::Hidden)
    }

    /// Revealed, safe, and showing a non-zero count.
    pub const fn is_numbered(self) -> bool {
        self.is_revealed() && !self.mine && self.neighbor_count > 0
    }
}
