//! Difficulty-driven board generation
//!
//! A difficulty level maps to an immutable [`DifficultyConfig`] snapshot:
//! board size, move budget, palette and blocker layout parameters. Low
//! levels get larger boards, more moves and no blockers.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::Board;
use super::grid::CellId;
use crate::consts::*;
use crate::{SimError, lerp};

/// Board width and height at the easiest and hardest levels
const EASY_SIZE: (f32, f32) = (9.0, 10.0);
const HARD_SIZE: (f32, f32) = (6.0, 7.0);
const EASY_MOVES: f32 = 40.0;
const HARD_MOVES: f32 = 15.0;
const EASY_COLORS: f32 = 4.0;
const HARD_COLORS: f32 = MAX_PALETTE as f32;
const MAX_COVERAGE: f32 = 0.3;
const MIN_COVERAGE: f32 = 0.08;
const MAX_CLUSTER: f32 = 4.0;
const EASY_GOAL: f32 = 20.0;
const HARD_GOAL: f32 = 45.0;
/// Seed picks attempted per blocker before placement gives up
const SEED_ATTEMPTS_PER_BLOCKER: usize = 8;

/// Per-level board parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    /// Clamped difficulty level
    pub level: i32,
    pub width: i32,
    pub height: i32,
    pub move_budget: u32,
    /// Number of tile colors in play
    pub color_count: u8,
    /// Fraction of eligible cells to cover with blockers
    pub blocker_coverage: f32,
    /// Upper bound on cells per blocker cluster
    pub blocker_cluster_size: usize,
    /// Blockers only go in rows at or above `height * ratio` (y = 0 is the bottom)
    pub blocker_row_start_ratio: f32,
    pub blocker_max_strength: u8,
    /// Chance a spawned tile copies an already placed neighbour's color
    pub match_assist: f32,
    /// Tiles to collect for the default goal
    pub goal_count: u32,
}

impl DifficultyConfig {
    /// Derive the snapshot for a level, clamping it into range first
    pub fn for_level(level: i32) -> Self {
        let level = level.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        let t = (level - MIN_DIFFICULTY) as f32 / (MAX_DIFFICULTY - MIN_DIFFICULTY) as f32;

        let (blocker_coverage, blocker_cluster_size, blocker_max_strength) =
            if level < BLOCKER_DIFFICULTY_FLOOR {
                (0.0, 0, MIN_BLOCKER_STRENGTH)
            } else {
                let bt = (level - BLOCKER_DIFFICULTY_FLOOR) as f32
                    / (MAX_DIFFICULTY - BLOCKER_DIFFICULTY_FLOOR).max(1) as f32;
                (
                    lerp(MIN_COVERAGE, MAX_COVERAGE, bt),
                    lerp(1.0, MAX_CLUSTER, bt).round() as usize,
                    lerp(
                        f32::from(MIN_BLOCKER_STRENGTH),
                        f32::from(MAX_BLOCKER_STRENGTH),
                        bt,
                    )
                    .round() as u8,
                )
            };

        Self {
            level,
            width: lerp(EASY_SIZE.0, HARD_SIZE.0, t).round() as i32,
            height: lerp(EASY_SIZE.1, HARD_SIZE.1, t).round() as i32,
            move_budget: lerp(EASY_MOVES, HARD_MOVES, t).round() as u32,
            color_count: lerp(EASY_COLORS, HARD_COLORS, t).round() as u8,
            blocker_coverage,
            blocker_cluster_size,
            blocker_row_start_ratio: lerp(0.6, 0.4, t),
            blocker_max_strength,
            match_assist: lerp(0.35, 0.0, t),
            goal_count: lerp(EASY_GOAL, HARD_GOAL, t).round() as u32,
        }
    }

    /// Reject snapshots from collaborators that cannot produce a board
    pub fn validate(&self) -> Result<(), SimError> {
        if self.width < 2 || self.height < 2 {
            return Err(SimError::InvalidConfig(format!(
                "board {}x{} is too small",
                self.width, self.height
            )));
        }
        if self.width > MAX_BOARD_SIDE || self.height > MAX_BOARD_SIDE {
            return Err(SimError::InvalidConfig(format!(
                "board {}x{} exceeds {} cells per side",
                self.width, self.height, MAX_BOARD_SIDE
            )));
        }
        if self.color_count < 2 || self.color_count > MAX_PALETTE {
            return Err(SimError::InvalidConfig(format!(
                "color_count {} outside 2..={}",
                self.color_count, MAX_PALETTE
            )));
        }
        if self.move_budget == 0 {
            return Err(SimError::InvalidConfig("move_budget must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.blocker_coverage)
            || !(0.0..=1.0).contains(&self.blocker_row_start_ratio)
        {
            return Err(SimError::InvalidConfig("blocker ratios must be within 0..=1".into()));
        }
        if !(MIN_BLOCKER_STRENGTH..=MAX_BLOCKER_STRENGTH).contains(&self.blocker_max_strength) {
            return Err(SimError::InvalidConfig(format!(
                "blocker_max_strength {} outside {}..={}",
                self.blocker_max_strength, MIN_BLOCKER_STRENGTH, MAX_BLOCKER_STRENGTH
            )));
        }
        Ok(())
    }

    /// First row that may hold a blocker
    pub fn blocker_start_row(&self) -> i32 {
        ((self.height as f32 * self.blocker_row_start_ratio).floor() as i32).clamp(0, self.height - 1)
    }

    /// Number of blockers wanted, before caps
    pub fn blocker_target(&self) -> usize {
        let rows = (self.height - self.blocker_start_row()) as usize;
        ((rows * self.width as usize) as f32 * self.blocker_coverage).round() as usize
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self::for_level(MIN_DIFFICULTY)
    }
}

/// Per-row and per-column blocker counts with caps that keep every line open
struct LineCaps {
    rows: Vec<usize>,
    columns: Vec<usize>,
    row_cap: usize,
    column_cap: usize,
}

impl LineCaps {
    fn new(config: &DifficultyConfig) -> Self {
        let band = (config.height - config.blocker_start_row()) as usize;
        Self {
            rows: vec![0; config.height as usize],
            columns: vec![0; config.width as usize],
            row_cap: (config.width as usize).saturating_sub(1),
            column_cap: band.saturating_sub(1).min(config.height as usize - 1),
        }
    }

    fn allows(&self, x: i32, y: i32) -> bool {
        self.rows[y as usize] < self.row_cap && self.columns[x as usize] < self.column_cap
    }

    fn record(&mut self, x: i32, y: i32) {
        self.rows[y as usize] += 1;
        self.columns[x as usize] += 1;
    }
}

/// Scatter blocker clusters over the upper rows.
///
/// Each random seed grows by BFS over free 4-adjacent eligible cells up to
/// the cluster size. Runs out of room gracefully: returns how many were placed.
pub fn place_blockers(board: &mut Board, config: &DifficultyConfig, rng: &mut impl Rng) -> usize {
    let target = config.blocker_target();
    if target == 0 || config.blocker_cluster_size == 0 {
        return 0;
    }
    let start_row = config.blocker_start_row();
    let max_strength = config.blocker_max_strength.max(MIN_BLOCKER_STRENGTH);
    let mut caps = LineCaps::new(config);
    let eligible = |board: &Board, caps: &LineCaps, cell: CellId| {
        let pos = board.grid.pos(cell);
        pos.y >= start_row && board.grid.cell(cell).is_available() && caps.allows(pos.x, pos.y)
    };

    let mut placed = 0;
    let mut attempts = target * SEED_ATTEMPTS_PER_BLOCKER;
    while placed < target && attempts > 0 {
        attempts -= 1;
        let candidates: Vec<CellId> = board
            .grid
            .free_cells()
            .iter()
            .copied()
            .filter(|c| eligible(board, &caps, *c))
            .collect();
        if candidates.is_empty() {
            break;
        }
        let seed = candidates[rng.random_range(0..candidates.len())];

        let mut queue = VecDeque::from([seed]);
        let mut cluster = 0;
        while let Some(cell) = queue.pop_front() {
            if cluster >= config.blocker_cluster_size || placed >= target {
                break;
            }
            if !eligible(board, &caps, cell) {
                continue;
            }
            let strength = rng.random_range(MIN_BLOCKER_STRENGTH..=max_strength);
            if board.place_blocker(cell, strength).is_err() {
                continue;
            }
            let pos = board.grid.pos(cell);
            caps.record(pos.x, pos.y);
            cluster += 1;
            placed += 1;
            let mut next: Vec<CellId> = board
                .grid
                .neighbors4(cell)
                .filter(|n| eligible(board, &caps, *n))
                .collect();
            next.sort_unstable();
            queue.extend(next);
        }
    }

    if placed < target {
        log::warn!(
            "Placed {} of {} blockers at level {} (no eligible cells left)",
            placed,
            target,
            config.level
        );
    } else {
        log::info!("Placed {} blockers at level {}", placed, config.level);
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_level_is_clamped() {
        assert_eq!(DifficultyConfig::for_level(-5), DifficultyConfig::for_level(MIN_DIFFICULTY));
        assert_eq!(DifficultyConfig::for_level(99).level, MAX_DIFFICULTY);
    }

    #[test]
    fn test_easy_levels_are_bigger_and_longer() {
        let easy = DifficultyConfig::for_level(MIN_DIFFICULTY);
        let hard = DifficultyConfig::for_level(MAX_DIFFICULTY);
        assert!(easy.width * easy.height > hard.width * hard.height);
        assert!(easy.move_budget > hard.move_budget);
        assert!(easy.color_count < hard.color_count);
        assert!(easy.validate().is_ok());
        assert!(hard.validate().is_ok());
    }

    #[test]
    fn test_no_blockers_below_floor() {
        let config = DifficultyConfig::for_level(BLOCKER_DIFFICULTY_FLOOR - 1);
        assert_eq!(config.blocker_coverage, 0.0);
        let mut board = Board::new(config.width, config.height);
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(place_blockers(&mut board, &config, &mut rng), 0);
        assert!(board.blockers.is_empty());
    }

    #[test]
    fn test_blockers_respect_band_and_caps() {
        let config = DifficultyConfig::for_level(MAX_DIFFICULTY);
        let mut board = Board::new(config.width, config.height);
        let mut rng = Pcg32::seed_from_u64(42);
        let placed = place_blockers(&mut board, &config, &mut rng);
        assert!(placed > 0);
        assert_eq!(placed, board.blockers.len());

        let start = config.blocker_start_row();
        for y in 0..config.height {
            let in_row = board.blockers.iter().filter(|b| board.grid.pos(b.cell).y == y).count();
            assert!(in_row < config.width as usize, "row {} fully blocked", y);
            if y < start {
                assert_eq!(in_row, 0);
            }
        }
        for x in 0..config.width {
            let in_col = board.blockers.iter().filter(|b| board.grid.pos(b.cell).x == x).count();
            assert!(in_col < config.height as usize, "column {} fully blocked", x);
        }
        for blocker in board.blockers.iter() {
            assert!((MIN_BLOCKER_STRENGTH..=config.blocker_max_strength).contains(&blocker.strength()));
        }
        assert!(board.verify().is_ok());
    }

    #[test]
    fn test_extreme_coverage_degrades_gracefully() {
        let config = DifficultyConfig {
            blocker_coverage: 1.0,
            blocker_cluster_size: 50,
            blocker_row_start_ratio: 0.0,
            ..DifficultyConfig::for_level(MAX_DIFFICULTY)
        };
        let mut board = Board::new(config.width, config.height);
        let mut rng = Pcg32::seed_from_u64(9);
        let placed = place_blockers(&mut board, &config, &mut rng);
        assert!(placed < config.blocker_target());
        assert!(board.grid.free_count() > 0);
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let config = DifficultyConfig {
            color_count: 1,
            ..DifficultyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_snapshot_rejected() {
        let config = DifficultyConfig {
            width: 50_000,
            height: 50_000,
            ..DifficultyConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut sim = crate::GridSimulation::new(crate::Settings::headless(), 1);
        assert!(sim.apply_config(config).is_err());
        assert_eq!(sim.phase(), crate::GamePhase::Init);
    }
}
