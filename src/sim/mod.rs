//! Deterministic board simulation
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Stable iteration order (by cell and tile ID)
//! - Visual timing enters only through relocation tickets
//! - No rendering or platform dependencies

pub mod barrier;
pub mod blocker;
pub mod board;
pub mod cascade;
pub mod difficulty;
pub mod events;
pub mod grid;
pub mod group;
pub mod shuffle;
pub mod state;
pub mod tick;
pub mod tile;

pub use barrier::{PendingBarrier, Ticket};
pub use blocker::{Blocker, BlockerHit, BlockerId};
pub use board::Board;
pub use cascade::{Relocation, compact};
pub use difficulty::{DifficultyConfig, place_blockers};
pub use events::{EventSink, GameEvent};
pub use grid::{Cell, CellId, CellPos, CellSet, Grid};
pub use group::{determine_group, has_valid_move, is_blastable, neighbor_scan};
pub use shuffle::{can_shuffle, shuffle_board};
pub use state::{GamePhase, Goal, GridSimulation};
pub use tick::{RejectReason, SelectOutcome, TickInput, tick};
pub use tile::{ColorType, Footprint, Tile, TileId, TileInfo, TileKind};
