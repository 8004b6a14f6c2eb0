//! Cascade compaction
//!
//! Columns are processed left to right, each from the bottom row up. A
//! tile drops into the lowest empty row below it; a blocker is a hard
//! partition that nothing crosses and resets the empty-row tracker. A tile
//! under a blocker is pinned and never moves.
//! Each relocation is applied to the board whole before the next one.

use serde::{Deserialize, Serialize};

use super::board::Board;
use super::grid::CellPos;
use super::tile::TileId;
use crate::SimError;

/// One tile moved from `from` to `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub tile: TileId,
    pub from: CellPos,
    pub to: CellPos,
}

/// Drop every tile as far as it can fall. Returns the relocations made.
pub fn compact(board: &mut Board) -> Result<Vec<Relocation>, SimError> {
    let mut moves = Vec::new();
    for x in 0..board.width() {
        compact_column(board, x, &mut moves)?;
    }
    Ok(moves)
}

fn compact_column(board: &mut Board, x: i32, moves: &mut Vec<Relocation>) -> Result<(), SimError> {
    let mut lowest_empty: Option<i32> = None;
    for y in 0..board.height() {
        let pos = CellPos::new(x, y);
        let cell = board.grid.require(pos)?;

        if board.grid.blocker_at(cell).is_some() {
            lowest_empty = None;
            continue;
        }
        if board.grid.tile_at(cell).is_none() {
            lowest_empty.get_or_insert(y);
            continue;
        }
        let Some(target_y) = lowest_empty else {
            continue;
        };

        let to = CellPos::new(x, target_y);
        let target = board.grid.require(to)?;
        let tile = board.move_tile(cell, target)?;
        moves.push(Relocation { tile, from: pos, to });
        // everything between target_y and y is empty now, including y itself
        lowest_empty = Some(target_y + 1);
    }
    Ok(())
}
