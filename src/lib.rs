//! Tile Blast - simulation core for a tile-matching blast puzzle
//!
//! Core modules:
//! - `sim`: Deterministic board simulation (grid, grouping, cascades, shuffles)
//! - `settings`: Data-driven tuning for scores and special tiles
//! - `error`: Invariant and configuration errors
//!
//! Rendering, input gestures and backend sync are collaborators: they
//! consume [`sim::GameEvent`]s and issue commands on [`sim::GridSimulation`].

pub mod error;
pub mod settings;
pub mod sim;

pub use error::SimError;
pub use settings::{Settings, ShuffleMode};
pub use sim::{GamePhase, GridSimulation, TickInput, tick};

/// Game configuration constants
pub mod consts {
    /// Smallest group that may be blasted
    pub const BLAST_THRESHOLD: usize = 2;

    /// Difficulty scale bounds (inclusive)
    pub const MIN_DIFFICULTY: i32 = 1;
    pub const MAX_DIFFICULTY: i32 = 10;
    /// Levels below this never receive blockers
    pub const BLOCKER_DIFFICULTY_FLOOR: i32 = 3;

    /// Largest board side; keeps cell index arithmetic in range
    pub const MAX_BOARD_SIDE: i32 = 64;

    /// Largest palette a board may use
    pub const MAX_PALETTE: u8 = 6;

    /// Blocker strength bounds
    pub const MIN_BLOCKER_STRENGTH: u8 = 1;
    pub const MAX_BLOCKER_STRENGTH: u8 = 3;

    /// Shuffle draw thresholds: above RANDOM goes to the shuffled list,
    /// between COLUMN and RANDOM to a column bucket, below COLUMN to a row bucket
    pub const SHUFFLE_RANDOM_CUTOFF: f32 = 0.1;
    pub const SHUFFLE_COLUMN_CUTOFF: f32 = 0.05;
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}
