use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::index;

use super::*;

/// Uniform placement that keeps the 3x3 block around the first opened cell free of mines, so the opening is
/// always a zero.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomLayoutGenerator {
    seed: u64,
    start: Coord2,
}

impl RandomLayoutGenerator {
    pub fn new(seed: u64, start: Coord2) -> Self {
        Self { seed, start }
    }
}

impl LayoutGenerator for RandomLayoutGenerator {
    fn generate(self, config: GameConfig) -> Result<MineLayout> {
        let (width, height) = config.size;
        if width == 0 || height == 0 {
            return Err(GameError::InvalidBoardSize);
        }
        if self.start.0 >= width || self.start.1 >= height {
            return Err(GameError::InvalidCoords);
        }

        let free_cells: Vec<Coord2> = iter_row_major(config.size)
            .filter(|&coords| !is_adjacent_or_same(coords, self.start))
            .collect();

        let mines = usize::from(config.mines);
        if mines > free_cells.len() {
            return Err(GameError::TooManyMines {
                mines: config.mines,
                max: free_cells.len().try_into().unwrap_or(CellCount::MAX),
            });
        }

        // one draw per mine over the remaining free cells, no rejection loop
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut mine_mask: Array2<bool> = Array2::default(config.size.to_nd_index());
        for picked in index::sample(&mut rng, free_cells.len(), mines) {
            mine_mask[free_cells[picked].to_nd_index()] = true;
        }

        log::debug!(
            "Placed {} mines on {}x{} around safe start {:?} (seed {})",
            mines,
            width,
            height,
            self.start,
            self.seed
        );
        Ok(MineLayout::from_mine_mask(mine_mask))
    }
}
