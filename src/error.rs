//! Simulation error types
//!
//! Only unrecoverable invariant breaches and configuration problems surface
//! as errors. Rejected player commands are reported through
//! [`SelectOutcome`](crate::sim::SelectOutcome) instead.

use thiserror::Error;

use crate::sim::CellPos;

#[derive(Debug, Error)]
pub enum SimError {
    /// Shuffle was asked to place more tiles than there are free cells
    #[error("shuffle needs {needed} free cells but only {free} are available")]
    ShuffleCapacity { free: usize, needed: usize },

    /// A second tile was assigned to an occupied cell
    #[error("cell ({}, {}) already holds a tile or blocker", .pos.x, .pos.y)]
    CellOccupied { pos: CellPos },

    #[error("cell ({}, {}) already holds a blocker", .pos.x, .pos.y)]
    BlockerAlreadyPlaced { pos: CellPos },

    #[error("cell ({}, {}) is outside the {width}x{height} grid", .pos.x, .pos.y)]
    OutOfBounds { pos: CellPos, width: i32, height: i32 },

    /// Free-cell set disagrees with actual cell occupancy
    #[error("free-cell set out of sync at ({}, {})", .pos.x, .pos.y)]
    FreeSetMismatch { pos: CellPos },

    /// A tile's recorded cell does not match its grid slot
    #[error("tile {tile} records a cell that does not hold it")]
    TileCellMismatch { tile: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("settings json: {0}")]
    Json(#[from] serde_json::Error),
}
