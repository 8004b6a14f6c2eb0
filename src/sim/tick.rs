//! Phase machine and command surface
//!
//! Commands only record intent or move between phases; [`tick`] (or
//! [`GridSimulation::advance`]) then runs phases until the machine reaches a
//! point where it has to wait: player input, outstanding relocation
//! tickets, a pause, or the end of the level.

use std::collections::BTreeSet;

use rand::Rng;

use super::barrier::Ticket;
use super::board::Board;
use super::cascade::{Relocation, compact};
use super::difficulty::{DifficultyConfig, place_blockers};
use super::events::GameEvent;
use super::grid::{CellId, CellPos};
use super::group::{determine_group, has_valid_move, is_blastable, neighbor_scan};
use super::shuffle::shuffle_board;
use super::state::{GamePhase, Goal, GridSimulation, Selection};
use super::tile::{ColorType, TileInfo, TileKind};
use crate::{Settings, ShuffleMode, SimError};

/// Commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Tile tapped by the player
    pub select: Option<CellPos>,
    /// Shuffle booster
    pub shuffle: Option<ShuffleMode>,
    /// Pause toggle
    pub pause: bool,
    /// Relocations the renderer finished showing
    pub completed: Vec<Ticket>,
    /// Treat every outstanding relocation as shown
    pub finish_animations: bool,
}

/// Result of a tile selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Accepted { group_size: usize },
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Input is only sampled in WaitingInput
    NotAccepting(GamePhase),
    OutOfBounds,
    EmptyCell,
    /// Tile pinned under a blocker
    Blocked,
    /// Group smaller than the blast threshold
    BelowThreshold,
}

/// Apply one tick of input and run the phase machine until it waits
pub fn tick(sim: &mut GridSimulation, input: &TickInput) -> Result<(), SimError> {
    if input.pause {
        if sim.phase() == GamePhase::Paused {
            sim.resume();
        } else {
            sim.pause();
        }
    }

    for ticket in &input.completed {
        sim.complete_relocation(*ticket);
    }
    if input.finish_animations {
        sim.finish_animations();
    }

    if let Some(pos) = input.select {
        sim.select_tile(pos);
    }
    if let Some(mode) = input.shuffle {
        sim.request_shuffle(mode);
    }

    sim.advance()
}

impl GridSimulation {
    /// Build a board for a difficulty level
    pub fn apply_difficulty(&mut self, level: i32) -> Result<(), SimError> {
        self.apply_config(DifficultyConfig::for_level(level))
    }

    /// Build a board from a difficulty snapshot supplied by a collaborator
    pub fn apply_config(&mut self, config: DifficultyConfig) -> Result<(), SimError> {
        config.validate()?;
        self.settings.validate()?;

        self.rng = self.rng_state.advance();
        let mut board = Board::new(config.width, config.height);
        place_blockers(&mut board, &config, &mut self.rng);
        let target_color = self.rng.random_range(0..config.color_count);

        log::info!(
            "Level {}: {}x{} board, {} moves, {} colors, {} blockers",
            config.level,
            config.width,
            config.height,
            config.move_budget,
            config.color_count,
            board.blockers.len()
        );

        self.reset_board(config, board, Goal::new(Some(target_color), config.goal_count));
        Ok(())
    }

    /// Simulation over a hand-built board. Free cells are filled on the first advance.
    ///
    /// The goal never completes unless replaced with [`set_goal`](Self::set_goal).
    pub fn with_board(settings: Settings, seed: u64, board: Board, move_budget: u32) -> Self {
        let mut sim = Self::new(settings, seed);
        let config = DifficultyConfig {
            width: board.width(),
            height: board.height(),
            move_budget,
            ..DifficultyConfig::default()
        };
        sim.rng = sim.rng_state.advance();
        sim.reset_board(config, board, Goal::new(None, u32::MAX));
        sim
    }

    fn reset_board(&mut self, config: DifficultyConfig, board: Board, goal: Goal) {
        self.config = config;
        self.board = board;
        self.moves_left = config.move_budget;
        self.score = 0;
        self.goal = goal;
        self.barrier.complete_all();
        self.selection = None;
        self.cascade_issued = false;
        self.shuffle_mode = None;
        self.shuffle_attempts = 0;
        self.auto_shuffle = false;
        self.paused_from = None;
        self.enter(GamePhase::SpawningBlocks);
        self.events.publish(GameEvent::GoalProgress {
            remaining: goal.remaining,
        });
    }

    /// Player taps a cell
    pub fn select_tile(&mut self, pos: CellPos) -> SelectOutcome {
        if self.phase != GamePhase::WaitingInput {
            log::debug!("Selection at {:?} ignored in {:?}", pos, self.phase);
            return SelectOutcome::Rejected(RejectReason::NotAccepting(self.phase));
        }
        let Some(cell) = self.board.grid.id_at(pos) else {
            return SelectOutcome::Rejected(RejectReason::OutOfBounds);
        };
        let Some(tile) = self.board.grid.tile_at(cell) else {
            return SelectOutcome::Rejected(RejectReason::EmptyCell);
        };
        if self.board.is_pinned(cell) {
            log::debug!("Selection at {:?} is under a blocker", pos);
            return SelectOutcome::Rejected(RejectReason::Blocked);
        }

        let group = determine_group(&self.board, tile);
        if !is_blastable(&group) {
            log::debug!("Group of {} at {:?} below threshold", group.len(), pos);
            self.events.publish(GameEvent::SelectionRejected { pos });
            return SelectOutcome::Rejected(RejectReason::BelowThreshold);
        }

        let group_size = group.len();
        self.selection = Some(Selection { tile, group });
        self.enter(GamePhase::Blasting);
        SelectOutcome::Accepted { group_size }
    }

    /// Shuffle booster; only honoured while waiting for input
    pub fn request_shuffle(&mut self, mode: ShuffleMode) -> bool {
        if self.phase != GamePhase::WaitingInput {
            log::debug!("Shuffle request ignored in {:?}", self.phase);
            return false;
        }
        self.shuffle_mode = Some(mode);
        self.shuffle_attempts = 0;
        self.auto_shuffle = false;
        self.enter(GamePhase::Shuffling);
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.phase.is_active() {
            log::debug!("Pause ignored in {:?}", self.phase);
            return false;
        }
        self.paused_from = Some(self.phase);
        self.enter(GamePhase::Paused);
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase != GamePhase::Paused {
            return false;
        }
        match self.paused_from.take().unwrap_or(GamePhase::WaitingInput) {
            GamePhase::WaitingInput => self.open_input(),
            to => self.enter(to),
        }
        true
    }

    /// Renderer finished showing one relocation. Accepted while paused too.
    pub fn complete_relocation(&mut self, ticket: Ticket) -> bool {
        self.barrier.complete(ticket)
    }

    pub fn finish_animations(&mut self) -> usize {
        self.barrier.complete_all()
    }

    /// Replace the level goal
    pub fn set_goal(&mut self, goal: Goal) {
        self.goal = goal;
        self.publish_goal();
    }

    /// Collaborator-tracked progress toward the goal
    pub fn report_collected(&mut self, n: u32) {
        self.goal.collect(n);
        self.publish_goal();
    }

    fn publish_goal(&mut self) {
        self.events.publish(GameEvent::GoalProgress {
            remaining: self.goal.remaining,
        });
        if self.goal.is_met() && self.phase == GamePhase::WaitingInput {
            self.enter(GamePhase::Win);
        }
    }

    /// Hand the board to the player, unless the goal was met while it was busy
    fn open_input(&mut self) {
        if self.goal.is_met() {
            log::info!("Goal reached with {} moves left", self.moves_left);
            self.enter(GamePhase::Win);
        } else {
            self.enter(GamePhase::WaitingInput);
        }
    }

    /// Run phases until the machine has to wait
    pub fn advance(&mut self) -> Result<(), SimError> {
        while self.step()? {
            debug_assert!(self.board.verify().is_ok(), "board invariant broken in {:?}", self.phase);
        }
        Ok(())
    }

    /// Run the current phase once. Returns false when it has to wait.
    pub fn step(&mut self) -> Result<bool, SimError> {
        match self.phase {
            GamePhase::SpawningBlocks => {
                self.spawn_pass()?;
                Ok(true)
            }
            GamePhase::Blasting => {
                self.blast()?;
                Ok(true)
            }
            GamePhase::Falling => self.fall(),
            GamePhase::Shuffling => self.shuffle_pass(),
            GamePhase::Init
            | GamePhase::WaitingInput
            | GamePhase::Paused
            | GamePhase::Win
            | GamePhase::Lose => Ok(false),
        }
    }

    fn spawn_pass(&mut self) -> Result<(), SimError> {
        let mut cells = self.board.grid.free_cells().to_vec();
        cells.sort_unstable();
        let score = self.settings.score_for(false);
        for cell in cells {
            let color = self.spawn_color(cell);
            let id = self.board.spawn_tile(cell, color, TileKind::Regular, score)?;
            if let Some(tile) = self.board.tile(id) {
                let info = TileInfo::from(tile);
                let pos = self.board.grid.pos(cell);
                self.events.publish(GameEvent::TileSpawned { tile: info, pos });
            }
        }

        neighbor_scan(&mut self.board);
        let has_move = has_valid_move(&self.board);
        self.events.publish(GameEvent::NeighborScanComplete {
            has_valid_move: has_move,
        });

        if has_move || self.goal.is_met() {
            self.open_input();
        } else {
            log::info!("No valid move left, shuffling");
            self.shuffle_mode = Some(self.settings.auto_shuffle_mode);
            self.shuffle_attempts = 0;
            self.auto_shuffle = true;
            self.enter(GamePhase::Shuffling);
        }
        Ok(())
    }

    /// Random palette color, sometimes copying a placed neighbour on easy levels
    fn spawn_color(&mut self, cell: CellId) -> ColorType {
        if self.rng.random::<f32>() < self.config.match_assist {
            let grid = &self.board.grid;
            let neighbours: Vec<ColorType> = grid
                .neighbors4(cell)
                .filter_map(|n| grid.tile_at(n))
                .filter_map(|t| self.board.tile(t))
                .filter(|t| t.color < self.config.color_count)
                .map(|t| t.color)
                .collect();
            if !neighbours.is_empty() {
                return neighbours[self.rng.random_range(0..neighbours.len())];
            }
        }
        self.rng.random_range(0..self.config.color_count)
    }

    fn blast(&mut self) -> Result<(), SimError> {
        let Some(selection) = self.selection.take() else {
            log::warn!("Blasting without a selection");
            self.open_input();
            return Ok(());
        };
        let origin = self
            .board
            .tile(selection.tile)
            .map(|t| (TileInfo::from(t), t.cell()));
        let Some((origin, Some(origin_cell))) = origin else {
            return Err(SimError::TileCellMismatch {
                tile: selection.tile.0,
            });
        };
        let origin_pos = self.board.grid.pos(origin_cell);

        self.moves_left = self.moves_left.saturating_sub(1);

        let mut blasted: Vec<CellPos> = Vec::with_capacity(selection.group.len());
        let mut collected = 0u32;
        for &id in &selection.group {
            let Some(tile) = self.board.tile(id) else {
                continue;
            };
            let info = TileInfo::from(tile);
            let Some(cell) = self.board.remove_tile(id) else {
                continue;
            };
            let pos = self.board.grid.pos(cell);
            self.score += u64::from(info.score_value);
            if self.goal.counts(info.color) {
                collected += 1;
            }
            blasted.push(pos);
            self.events.publish(GameEvent::TileBlasted { tile: info, pos });
        }

        self.degrade_blockers(&blasted, origin.kind, origin_pos);

        if origin.kind == TileKind::Regular {
            self.create_special(selection.group.len(), origin.color, origin_cell)?;
        }

        if collected > 0 {
            self.goal.collect(collected);
            self.events.publish(GameEvent::GoalProgress {
                remaining: self.goal.remaining,
            });
        }

        if self.goal.is_met() {
            self.enter(GamePhase::Win);
        } else if self.moves_left == 0 {
            self.enter(GamePhase::Lose);
        } else {
            self.cascade_issued = false;
            self.enter(GamePhase::Falling);
        }
        Ok(())
    }

    /// Adjacent blockers plus those in the special tile's footprint, each hit once
    fn degrade_blockers(&mut self, blasted: &[CellPos], kind: TileKind, origin: CellPos) {
        let mut hit = BTreeSet::new();
        for pos in blasted {
            hit.extend(self.board.adjacent_blockers(*pos));
        }
        if let Some(footprint) = kind.footprint(origin) {
            hit.extend(self.board.blockers_in(&footprint));
        }

        for id in hit {
            let Some(result) = self.board.damage_blocker(id, 1) else {
                continue;
            };
            let pos = self.board.grid.pos(result.cell);
            if result.destroyed {
                self.events.publish(GameEvent::BlockerDestroyed { pos });
            } else {
                self.events.publish(GameEvent::BlockerDamaged {
                    pos,
                    strength: result.strength,
                });
            }
        }
    }

    /// Leave a special tile behind for a large regular group
    fn create_special(&mut self, size: usize, color: ColorType, cell: CellId) -> Result<(), SimError> {
        let kind = if size >= self.settings.color_clear_threshold {
            TileKind::ColorClear { target: color }
        } else if size >= self.settings.bomb_threshold {
            TileKind::AreaBomb {
                radius: self.settings.bomb_radius,
            }
        } else if size >= self.settings.line_clear_threshold {
            if self.rng.random::<bool>() {
                TileKind::HorizontalClear
            } else {
                TileKind::VerticalClear
            }
        } else {
            return Ok(());
        };

        let score = self.settings.score_for(true);
        let id = self.board.spawn_tile(cell, color, kind, score)?;
        if let Some(tile) = self.board.tile(id) {
            let info = TileInfo::from(tile);
            let pos = self.board.grid.pos(cell);
            self.events.publish(GameEvent::SpecialCreated { tile: info, pos, kind });
        }
        Ok(())
    }

    fn fall(&mut self) -> Result<bool, SimError> {
        if !self.cascade_issued {
            self.cascade_issued = true;
            let moves = compact(&mut self.board)?;
            if moves.is_empty() {
                self.cascade_issued = false;
                self.enter(GamePhase::SpawningBlocks);
                return Ok(true);
            }
            self.issue_relocations(&moves);
        }

        if !self.barrier.is_clear() {
            return Ok(false);
        }
        self.cascade_issued = false;
        self.enter(GamePhase::SpawningBlocks);
        Ok(true)
    }

    fn shuffle_pass(&mut self) -> Result<bool, SimError> {
        if let Some(mode) = self.shuffle_mode.take() {
            let moves = shuffle_board(&mut self.board, &mut self.rng, mode)?;
            self.shuffle_attempts += 1;
            self.issue_relocations(&moves);
            self.events.publish(GameEvent::Shuffled { moved: moves.len() });
            let has_move = has_valid_move(&self.board);
            self.events.publish(GameEvent::NeighborScanComplete {
                has_valid_move: has_move,
            });
        }

        if !self.barrier.is_clear() {
            return Ok(false);
        }

        if self.auto_shuffle && !has_valid_move(&self.board) {
            if self.shuffle_attempts < self.settings.max_shuffle_attempts {
                self.shuffle_mode = Some(self.settings.auto_shuffle_mode);
                return Ok(true);
            }
            log::warn!(
                "Board still deadlocked after {} shuffles",
                self.shuffle_attempts
            );
        }

        self.shuffle_attempts = 0;
        self.auto_shuffle = false;
        self.open_input();
        Ok(true)
    }

    /// Register a ticket and announce each relocation
    fn issue_relocations(&mut self, moves: &[Relocation]) {
        for m in moves {
            let Some(tile) = self.board.tile(m.tile).map(TileInfo::from) else {
                continue;
            };
            let ticket = self.barrier.register();
            self.events.publish(GameEvent::TileMoved {
                ticket,
                tile,
                from: m.from,
                to: m.to,
            });
        }
        if self.settings.instant_animations {
            self.barrier.complete_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    fn board_from(layout: &[&str]) -> Board {
        // rows top to bottom; digits are colors, '#' a strength-1 blocker
        let height = layout.len() as i32;
        let width = layout[0].len() as i32;
        let mut board = Board::new(width, height);
        for (row, line) in layout.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let pos = IVec2::new(x as i32, height - 1 - row as i32);
                let cell = board.grid.id_at(pos).unwrap();
                match ch {
                    '#' => {
                        board.place_blocker(cell, 1).unwrap();
                    }
                    c => {
                        let color = c.to_digit(10).unwrap() as u8;
                        board.spawn_tile(cell, color, TileKind::Regular, 10).unwrap();
                    }
                }
            }
        }
        board
    }

    /// Only pair: the two color-2 tiles at the bottom left
    const ONE_PAIR: [&str; 3] = ["301", "412", "223"];

    fn started(layout: &[&str], settings: Settings, moves: u32) -> GridSimulation {
        let mut sim = GridSimulation::with_board(settings, 7, board_from(layout), moves);
        sim.advance().unwrap();
        sim
    }

    fn tickets(events: &[GameEvent]) -> Vec<Ticket> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::TileMoved { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_apply_difficulty_fills_board() {
        let mut sim = GridSimulation::new(Settings::headless(), 12345);
        assert_eq!(sim.phase(), GamePhase::Init);
        sim.apply_difficulty(6).unwrap();
        sim.advance().unwrap();

        assert_eq!(sim.phase(), GamePhase::WaitingInput);
        assert_eq!(sim.board.grid.free_count(), 0);
        assert_eq!(sim.moves_left(), DifficultyConfig::for_level(6).move_budget);
        assert!(sim.board.verify().is_ok());
        assert!(sim.board.tiles.iter().all(|t| t.color < sim.config.color_count));
    }

    #[test]
    fn test_same_seed_same_board() {
        let layout = |seed| {
            let mut sim = GridSimulation::new(Settings::headless(), seed);
            sim.apply_difficulty(4).unwrap();
            sim.advance().unwrap();
            sim.board
                .grid
                .cells()
                .map(|(id, _)| sim.board.grid.tile_at(id).and_then(|t| sim.board.tile(t)).map(|t| t.color))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(99), layout(99));
    }

    #[test]
    fn test_singleton_costs_no_move() {
        let mut sim = started(&ONE_PAIR, Settings::headless(), 10);
        assert_eq!(sim.phase(), GamePhase::WaitingInput);
        sim.drain_events();

        let outcome = sim.select_tile(IVec2::new(2, 0));
        assert_eq!(outcome, SelectOutcome::Rejected(RejectReason::BelowThreshold));
        sim.advance().unwrap();

        assert_eq!(sim.moves_left(), 10);
        assert_eq!(sim.phase(), GamePhase::WaitingInput);
        assert_eq!(sim.board.tiles.live_count(), 9);
        assert_eq!(
            sim.drain_events(),
            vec![GameEvent::SelectionRejected {
                pos: IVec2::new(2, 0)
            }]
        );
    }

    #[test]
    fn test_selection_outside_waiting_input_ignored() {
        let mut sim = GridSimulation::new(Settings::headless(), 1);
        assert_eq!(
            sim.select_tile(IVec2::ZERO),
            SelectOutcome::Rejected(RejectReason::NotAccepting(GamePhase::Init))
        );
        assert!(!sim.request_shuffle(ShuffleMode::Random));
    }

    #[test]
    fn test_out_of_bounds_selection() {
        let mut sim = started(&ONE_PAIR, Settings::headless(), 10);
        assert_eq!(
            sim.select_tile(IVec2::new(5, 5)),
            SelectOutcome::Rejected(RejectReason::OutOfBounds)
        );
    }

    #[test]
    fn test_falling_waits_for_relocations() {
        let mut sim = started(&ONE_PAIR, Settings::default(), 10);
        sim.drain_events();

        let outcome = sim.select_tile(IVec2::new(0, 0));
        assert_eq!(outcome, SelectOutcome::Accepted { group_size: 2 });
        sim.advance().unwrap();

        assert_eq!(sim.phase(), GamePhase::Falling);
        assert_eq!(sim.moves_left(), 9);
        assert_eq!(sim.score(), 20);
        let events = sim.drain_events();
        let blasted = events
            .iter()
            .filter(|e| matches!(e, GameEvent::TileBlasted { .. }))
            .count();
        assert_eq!(blasted, 2);
        let pending = tickets(&events);
        assert_eq!(pending.len(), 4);
        // tiles are already in their target cells while the barrier is up
        assert!(sim.board.verify().is_ok());

        for ticket in &pending[..3] {
            assert!(sim.complete_relocation(*ticket));
            sim.advance().unwrap();
            assert_eq!(sim.phase(), GamePhase::Falling);
        }
        assert!(sim.complete_relocation(pending[3]));
        sim.advance().unwrap();

        assert!(matches!(
            sim.phase(),
            GamePhase::WaitingInput | GamePhase::Shuffling
        ));
        assert_eq!(sim.board.grid.free_count(), 0);
    }

    #[test]
    fn test_pause_defers_falling() {
        let mut sim = started(&ONE_PAIR, Settings::default(), 10);
        sim.select_tile(IVec2::new(1, 0));
        sim.advance().unwrap();
        assert_eq!(sim.phase(), GamePhase::Falling);

        assert!(sim.pause());
        assert_eq!(sim.finish_animations(), 4);
        sim.advance().unwrap();
        assert_eq!(sim.phase(), GamePhase::Paused);
        assert_eq!(
            sim.select_tile(IVec2::ZERO),
            SelectOutcome::Rejected(RejectReason::NotAccepting(GamePhase::Paused))
        );

        assert!(sim.resume());
        assert_eq!(sim.phase(), GamePhase::Falling);
        sim.advance().unwrap();
        assert_ne!(sim.phase(), GamePhase::Falling);
        assert!(sim.board.verify().is_ok());
    }

    #[test]
    fn test_tick_pause_toggle() {
        let mut sim = started(&ONE_PAIR, Settings::headless(), 10);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut sim, &pause).unwrap();
        assert_eq!(sim.phase(), GamePhase::Paused);
        tick(&mut sim, &pause).unwrap();
        assert_eq!(sim.phase(), GamePhase::WaitingInput);
    }

    #[test]
    fn test_last_move_loses() {
        let mut sim = started(&ONE_PAIR, Settings::headless(), 1);
        let input = TickInput {
            select: Some(IVec2::new(0, 0)),
            ..Default::default()
        };
        tick(&mut sim, &input).unwrap();
        assert_eq!(sim.phase(), GamePhase::Lose);
        assert_eq!(sim.moves_left(), 0);
        assert!(!sim.pause());
        assert_eq!(
            sim.select_tile(IVec2::new(0, 1)),
            SelectOutcome::Rejected(RejectReason::NotAccepting(GamePhase::Lose))
        );
    }

    #[test]
    fn test_goal_reached_wins() {
        let mut sim = started(&ONE_PAIR, Settings::headless(), 1);
        sim.set_goal(Goal::new(Some(2), 2));
        sim.select_tile(IVec2::new(0, 0));
        sim.advance().unwrap();
        assert_eq!(sim.phase(), GamePhase::Win);
        assert!(sim.goal().is_met());
    }

    #[test]
    fn test_reported_collection_wins_while_waiting() {
        let mut sim = started(&ONE_PAIR, Settings::headless(), 5);
        sim.set_goal(Goal::new(None, 3));
        sim.report_collected(2);
        assert_eq!(sim.phase(), GamePhase::WaitingInput);
        sim.report_collected(1);
        assert_eq!(sim.phase(), GamePhase::Win);
    }

    #[test]
    fn test_goal_reported_during_fall_wins_without_another_move() {
        let mut sim = started(&ONE_PAIR, Settings::default(), 10);
        sim.set_goal(Goal::new(None, 5));
        sim.select_tile(IVec2::new(0, 0));
        sim.advance().unwrap();
        assert_eq!(sim.phase(), GamePhase::Falling);
        assert_eq!(sim.goal().remaining, 3);

        sim.report_collected(5);
        assert_eq!(sim.phase(), GamePhase::Falling);
        sim.finish_animations();
        sim.advance().unwrap();

        assert_eq!(sim.phase(), GamePhase::Win);
        assert_eq!(sim.moves_left(), 9);
    }

    #[test]
    fn test_goal_met_while_paused_wins_on_resume() {
        let mut sim = started(&ONE_PAIR, Settings::headless(), 10);
        sim.set_goal(Goal::new(None, 2));
        assert!(sim.pause());
        sim.report_collected(2);
        assert_eq!(sim.phase(), GamePhase::Paused);

        assert!(sim.resume());
        assert_eq!(sim.phase(), GamePhase::Win);
    }

    #[test]
    fn test_goal_met_across_paused_fall_wins() {
        let mut sim = started(&ONE_PAIR, Settings::default(), 10);
        sim.set_goal(Goal::new(None, 4));
        sim.select_tile(IVec2::new(0, 0));
        sim.advance().unwrap();
        assert!(sim.pause());

        sim.report_collected(2);
        sim.finish_animations();
        sim.advance().unwrap();
        assert_eq!(sim.phase(), GamePhase::Paused);

        sim.resume();
        assert_eq!(sim.phase(), GamePhase::Falling);
        sim.advance().unwrap();
        assert_eq!(sim.phase(), GamePhase::Win);
        assert_eq!(sim.moves_left(), 9);
    }

    #[test]
    fn test_pinned_tile_rejects_selection() {
        let mut board = board_from(&ONE_PAIR);
        let cell = board.grid.id_at(IVec2::new(2, 2)).unwrap();
        board.place_blocker(cell, 1).unwrap();
        let mut sim = GridSimulation::with_board(Settings::headless(), 7, board, 10);
        sim.advance().unwrap();
        assert_eq!(sim.phase(), GamePhase::WaitingInput);

        assert_eq!(
            sim.select_tile(IVec2::new(2, 2)),
            SelectOutcome::Rejected(RejectReason::Blocked)
        );
        assert_eq!(sim.moves_left(), 10);
        assert_eq!(sim.board.blocker_strength_at(IVec2::new(2, 2)), Some(1));
        assert!(sim.board.verify().is_ok());
    }

    #[test]
    fn test_blast_destroys_adjacent_blocker() {
        let mut sim = started(&["403", "31#", "012"], Settings::headless(), 10);
        assert_eq!(sim.phase(), GamePhase::WaitingInput);
        sim.drain_events();

        sim.select_tile(IVec2::new(1, 0));
        sim.advance().unwrap();

        let events = sim.drain_events();
        assert!(events.contains(&GameEvent::BlockerDestroyed {
            pos: IVec2::new(2, 1)
        }));
        assert!(sim.board.blockers.is_empty());
        assert_eq!(sim.board.grid.free_count(), 0);
        assert!(sim.board.verify().is_ok());
    }

    #[test]
    fn test_bomb_footprint_hits_diagonal_blocker() {
        // the bomb at (2, 1) and the 1 below it are the only match
        let mut board = board_from(&["0#234", "23140", "40132"]);
        let cell = board.grid.id_at(IVec2::new(2, 1)).unwrap();
        let plain = board.grid.tile_at(cell).unwrap();
        board.remove_tile(plain);
        board.spawn_tile(cell, 1, TileKind::AreaBomb { radius: 2 }, 25).unwrap();
        let mut sim = GridSimulation::with_board(Settings::headless(), 3, board, 10);
        sim.advance().unwrap();
        assert_eq!(sim.phase(), GamePhase::WaitingInput);
        sim.drain_events();

        assert_eq!(
            sim.select_tile(IVec2::new(2, 1)),
            SelectOutcome::Accepted { group_size: 2 }
        );
        sim.advance().unwrap();

        // (1, 2) touches no blasted cell, only the bomb's window
        assert!(sim.drain_events().contains(&GameEvent::BlockerDestroyed {
            pos: IVec2::new(1, 2)
        }));
        assert!(sim.board.blockers.is_empty());
        assert!(sim.board.verify().is_ok());
    }

    #[test]
    fn test_large_group_leaves_special() {
        let mut sim = started(&["23232", "11111"], Settings::headless(), 10);
        sim.drain_events();
        sim.select_tile(IVec2::new(2, 0));
        sim.advance().unwrap();

        let events = sim.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::SpecialCreated {
                kind: TileKind::HorizontalClear | TileKind::VerticalClear,
                ..
            }
        )));
        assert!(sim.board.tiles.iter().any(|t| t.kind.is_special()));
        assert_eq!(sim.score(), 50);
    }

    #[test]
    fn test_deadlocked_board_shuffles_before_input() {
        let layout = ["012012", "120120", "201201", "012012", "120120", "201201"];
        let mut sim = started(&layout, Settings::headless(), 10);
        let before = sim.board.color_histogram();

        let events = sim.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Shuffled { .. })));
        assert!(events.contains(&GameEvent::NeighborScanComplete {
            has_valid_move: false
        }));
        assert_eq!(sim.phase(), GamePhase::WaitingInput);
        assert_eq!(sim.board.color_histogram(), before);
        assert!(sim.board.verify().is_ok());
    }

    #[test]
    fn test_shuffle_booster_waits_for_animation() {
        let mut sim = started(&ONE_PAIR, Settings::default(), 10);
        let before = sim.board.color_histogram();
        assert!(sim.request_shuffle(ShuffleMode::Ordered));
        sim.advance().unwrap();

        if sim.pending_relocations() > 0 {
            assert_eq!(sim.phase(), GamePhase::Shuffling);
            sim.finish_animations();
            sim.advance().unwrap();
        }
        assert_eq!(sim.phase(), GamePhase::WaitingInput);
        assert_eq!(sim.moves_left(), 10);
        assert_eq!(sim.board.color_histogram(), before);
    }

    #[test]
    fn test_every_transition_announced() {
        let mut sim = GridSimulation::new(Settings::headless(), 5);
        sim.apply_difficulty(1).unwrap();
        sim.advance().unwrap();
        let phases: Vec<(GamePhase, GamePhase)> = sim
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::PhaseChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(phases.first(), Some(&(GamePhase::Init, GamePhase::SpawningBlocks)));
        for pair in phases.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }
}
