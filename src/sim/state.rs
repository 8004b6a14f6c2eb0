//! Simulation state and core lifecycle types
//!
//! [`GridSimulation`] is the single context object: it owns the board, the
//! seeded RNG, the phase machine and the event bus. There is no global state.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::barrier::PendingBarrier;
use super::board::Board;
use super::difficulty::DifficultyConfig;
use super::events::{EventBus, EventSink, GameEvent};
use super::tile::{ColorType, TileId};
use crate::{Settings, ShuffleMode};

/// Board lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No board applied yet
    Init,
    /// Filling free cells with new tiles
    SpawningBlocks,
    /// Waiting for a tile selection
    WaitingInput,
    /// Removing the selected group
    Blasting,
    /// Tiles dropping into vacated cells
    Falling,
    /// Reassigning tiles to break a deadlock
    Shuffling,
    /// Halted; resumes to the phase it interrupted
    Paused,
    Win,
    Lose,
}

impl GamePhase {
    /// Win and Lose freeze the board until a new one is applied
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::Win | GamePhase::Lose)
    }

    /// Phases a pause may interrupt
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            GamePhase::Init | GamePhase::Paused | GamePhase::Win | GamePhase::Lose
        )
    }
}

/// Collection target; reaching zero wins the level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Only tiles of this color count; `None` counts every blasted tile
    pub target_color: Option<ColorType>,
    pub remaining: u32,
}

impl Goal {
    pub fn new(target_color: Option<ColorType>, remaining: u32) -> Self {
        Self {
            target_color,
            remaining,
        }
    }

    pub fn counts(&self, color: ColorType) -> bool {
        self.target_color.is_none_or(|c| c == color)
    }

    pub fn collect(&mut self, n: u32) {
        self.remaining = self.remaining.saturating_sub(n);
    }

    pub fn is_met(&self) -> bool {
        self.remaining == 0
    }
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::new(self.seed, self.stream.wrapping_mul(2).wrapping_add(1))
    }

    /// Next stream for a fresh board under the same run seed
    pub fn advance(&mut self) -> Pcg32 {
        self.stream += 1;
        self.to_rng()
    }
}

/// Simulation context passed to every operation
#[derive(Debug)]
pub struct GridSimulation {
    pub settings: Settings,
    /// Snapshot the current board was built from
    pub config: DifficultyConfig,
    pub board: Board,
    pub(crate) phase: GamePhase,
    /// Phase to restore on resume
    pub(crate) paused_from: Option<GamePhase>,
    pub(crate) rng_state: RngState,
    pub(crate) rng: Pcg32,
    pub(crate) moves_left: u32,
    pub(crate) score: u64,
    pub(crate) goal: Goal,
    /// Relocations and shuffle sequences awaiting visual completion
    pub(crate) barrier: PendingBarrier,
    pub(crate) events: EventBus,
    /// Group accepted in WaitingInput, consumed by Blasting
    pub(crate) selection: Option<Selection>,
    /// Falling: compaction already issued for this pass
    pub(crate) cascade_issued: bool,
    /// Shuffling: mode of the pending pass, taken once the pass runs
    pub(crate) shuffle_mode: Option<ShuffleMode>,
    pub(crate) shuffle_attempts: u32,
    /// Whether the current shuffle came from a deadlock rather than a request
    pub(crate) auto_shuffle: bool,
}

/// A blastable group chosen by the player
#[derive(Debug, Clone)]
pub(crate) struct Selection {
    pub tile: TileId,
    pub group: Vec<TileId>,
}

impl GridSimulation {
    /// Create an empty simulation in `Init`. Apply a difficulty to build a board.
    pub fn new(settings: Settings, seed: u64) -> Self {
        let rng_state = RngState::new(seed);
        let rng = rng_state.to_rng();
        let config = DifficultyConfig::default();
        Self {
            settings,
            config,
            board: Board::new(config.width, config.height),
            phase: GamePhase::Init,
            paused_from: None,
            rng_state,
            rng,
            moves_left: 0,
            score: 0,
            goal: Goal::new(None, 0),
            barrier: PendingBarrier::new(),
            events: EventBus::new(),
            selection: None,
            cascade_issued: false,
            shuffle_mode: None,
            shuffle_attempts: 0,
            auto_shuffle: false,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn seed(&self) -> u64 {
        self.rng_state.seed
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    /// Outstanding relocation tickets
    pub fn pending_relocations(&self) -> usize {
        self.barrier.pending()
    }

    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.events.subscribe(sink);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// Move to a new phase, announcing the transition
    pub(crate) fn enter(&mut self, to: GamePhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        log::debug!("Phase {:?} -> {:?}", from, to);
        self.phase = to;
        self.events.publish(GameEvent::PhaseChanged { from, to });
    }
}
