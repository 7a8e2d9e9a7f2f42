use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use sweeper_core::{Board, Estimator, MoveKind, Solver, Strategy};

use crate::config::BotConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Won,
    Lost,
    /// The solver ran out of moves on an unresolved board.
    Stalled,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StrategyStats {
    pub moves: u64,
    pub guesses: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameRecord {
    pub outcome: Outcome,
    pub moves: u64,
    pub strategies: BTreeMap<Strategy, StrategyStats>,
}

/// Plays one game to the end, the first click included.
pub fn play_game(board: &mut Board, solver: &mut Solver) -> GameRecord {
    let mut record = GameRecord {
        outcome: Outcome::Stalled,
        moves: 0,
        strategies: BTreeMap::new(),
    };

    while let Some(next) = solver.next_move(board) {
        record.moves += 1;
        let stats = record.strategies.entry(next.strategy).or_default();
        stats.moves += 1;
        stats.guesses += u64::from(next.is_guess);

        match next.kind {
            MoveKind::Open => {
                board.open(next.coords);
            }
            MoveKind::Flag => {
                board.toggle_flag(next.coords);
            }
        }
    }

    record.outcome = if board.is_game_over() {
        Outcome::Lost
    } else if board.check_clear() {
        Outcome::Won
    } else {
        Outcome::Stalled
    };
    log::debug!("Game finished {:?} after {} moves", record.outcome, record.moves);
    record
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub stalled: u32,
    pub win_rate: f64,
    pub moves: u64,
    /// Keyed by strategy label.
    pub strategies: BTreeMap<String, StrategyStats>,
}

impl Summary {
    pub fn add(&mut self, record: &GameRecord) {
        self.games += 1;
        match record.outcome {
            Outcome::Won => self.wins += 1,
            Outcome::Lost => self.losses += 1,
            Outcome::Stalled => self.stalled += 1,
        }
        self.win_rate = f64::from(self.wins) / f64::from(self.games);
        self.moves += record.moves;

        for (strategy, stats) in &record.strategies {
            let total = self.strategies.entry(strategy.label().to_owned()).or_default();
            total.moves += stats.moves;
            total.guesses += stats.guesses;
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Games: {} | wins: {} | losses: {} | stalled: {} | win rate: {:.2}%\n",
            self.games,
            self.wins,
            self.losses,
            self.stalled,
            self.win_rate * 100.0
        );
        for (label, stats) in &self.strategies {
            out.push_str(&format!(
                "  {:<10} moves: {:>8} guesses: {:>8}\n",
                label, stats.moves, stats.guesses
            ));
        }
        out
    }
}

/// Runs every configured game. `on_finish` sees each final board, for `--show`.
pub fn run(config: &BotConfig, mut on_finish: impl FnMut(u32, &Board, &GameRecord)) -> Result<Summary> {
    let estimator = match config.load_weights()? {
        Some(bytes) => match Estimator::from_json(&bytes) {
            Ok(estimator) => Some(Arc::new(estimator)),
            Err(err) => {
                log::warn!("Estimator disabled, falling back to random guesses: {}", err);
                None
            }
        },
        None => None,
    };

    let mut summary = Summary::default();
    for game in 0..config.games {
        let seed = config.seed.map(|seed| seed.wrapping_add(u64::from(game)));
        let mut board = match seed {
            Some(seed) => Board::with_seed(config.width, config.height, config.mines, seed)?,
            None => Board::new(config.width, config.height, config.mines)?,
        };

        let mut solver = Solver::new(config.mode).with_config(config.solver);
        if let Some(seed) = seed {
            solver = solver.with_seed(seed);
        }
        if let Some(estimator) = &estimator {
            solver = solver.with_estimator(estimator.clone());
        }

        let record = play_game(&mut board, &mut solver);
        log::info!("Game {} {:?} in {} moves", game + 1, record.outcome, record.moves);
        on_finish(game, &board, &record);
        summary.add(&record);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweeper_core::{MineLayout, SolverMode};

    fn seeded(games: u32, seed: u64) -> BotConfig {
        BotConfig {
            games,
            seed: Some(seed),
            ..BotConfig::default()
        }
    }

    #[test]
    fn cleared_board_needs_no_moves() {
        // opening a corner floods everything except the lone mine
        let layout = MineLayout::from_mine_coords((4, 4), &[(3, 3)]).unwrap();
        let mut board = Board::from_layout(layout);
        board.open((0, 0));
        let mut solver = Solver::new(SolverMode::Hybrid).with_seed(1);

        let record = play_game(&mut board, &mut solver);

        assert_eq!(record.outcome, Outcome::Won);
        assert_eq!(record.moves, 0);
        assert!(board.check_clear());
    }

    #[test]
    fn every_game_is_resolved() {
        let summary = run(&seeded(20, 11), |_, board, record| {
            match record.outcome {
                Outcome::Won => assert!(board.check_clear()),
                Outcome::Lost => assert!(board.is_game_over()),
                Outcome::Stalled => panic!("solver stalled on\n{board}"),
            }
        })
        .unwrap();

        assert_eq!(summary.games, 20);
        assert_eq!(summary.wins + summary.losses, 20);
        assert!(summary.moves > 0);
        let counted: u64 = summary.strategies.values().map(|stats| stats.moves).sum();
        assert_eq!(counted, summary.moves);
    }

    #[test]
    fn seeded_runs_repeat() {
        let first = run(&seeded(5, 3), |_, _, _| {}).unwrap();
        let second = run(&seeded(5, 3), |_, _, _| {}).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn guesses_are_only_counted_for_guessing_strategies() {
        let summary = run(&seeded(10, 2), |_, _, _| {}).unwrap();

        for label in ["Logic", "Subset", "Tank"] {
            if let Some(stats) = summary.strategies.get(label) {
                assert_eq!(stats.guesses, 0, "{label}");
            }
        }
        // the very first click is always a guess
        let guesses: u64 = summary.strategies.values().map(|stats| stats.guesses).sum();
        assert!(guesses >= 10);
    }

    #[test]
    fn impossible_board_is_reported() {
        let config = BotConfig {
            mines: 80,
            ..seeded(1, 0)
        };

        assert!(run(&config, |_, _, _| {}).is_err());
    }

    #[test]
    fn summary_renders_rates() {
        let mut summary = Summary::default();
        let mut strategies = BTreeMap::new();
        strategies.insert(Strategy::Logic, StrategyStats { moves: 3, guesses: 0 });
        summary.add(&GameRecord {
            outcome: Outcome::Won,
            moves: 3,
            strategies,
        });
        summary.add(&GameRecord {
            outcome: Outcome::Lost,
            moves: 0,
            strategies: BTreeMap::new(),
        });

        assert_eq!(summary.win_rate, 0.5);
        let text = summary.render();
        assert!(text.starts_with("Games: 2 | wins: 1 | losses: 1 | stalled: 0 | win rate: 50.00%"));
        assert!(text.contains("Logic"));
    }
}
