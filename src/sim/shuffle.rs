//! Deadlock reshuffle
//!
//! Tiles are lifted off the board and dealt back into the free cells. Most
//! tiles take the next cell of a Fisher-Yates shuffled list; a small share
//! is steered into a column or row picked from the tile's color, which
//! clusters colors slightly and makes a playable board more likely. Tiles
//! pinned under a blocker stay where they are.

use rand::Rng;
use rand::seq::SliceRandom;

use super::board::Board;
use super::cascade::Relocation;
use super::grid::{CellId, CellSet};
use super::group::neighbor_scan;
use super::tile::{ColorType, TileId};
use crate::consts::{SHUFFLE_COLUMN_CUTOFF, SHUFFLE_RANDOM_CUTOFF};
use crate::{ShuffleMode, SimError};

/// Where a tile's cell was drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draw {
    Shuffled,
    Column,
    Row,
}

/// Pick the source for a drawn fraction
pub fn classify_draw(p: f32) -> Draw {
    if p > SHUFFLE_RANDOM_CUTOFF {
        Draw::Shuffled
    } else if p >= SHUFFLE_COLUMN_CUTOFF {
        Draw::Column
    } else {
        Draw::Row
    }
}

/// Free cells indexed three ways; taking a cell removes it from all three
struct CellPool {
    shuffled: CellSet,
    columns: Vec<CellSet>,
    rows: Vec<CellSet>,
}

impl CellPool {
    fn new(board: &Board, cells: Vec<CellId>) -> Self {
        let n = board.grid.len();
        let mut columns = vec![CellSet::with_capacity(n); board.width() as usize];
        let mut rows = vec![CellSet::with_capacity(n); board.height() as usize];
        for &cell in &cells {
            let pos = board.grid.pos(cell);
            columns[pos.x as usize].insert(cell);
            rows[pos.y as usize].insert(cell);
        }
        Self {
            shuffled: CellSet::from_cells(n, cells),
            columns,
            rows,
        }
    }

    fn take(&mut self, board: &Board, cell: CellId) {
        let pos = board.grid.pos(cell);
        self.shuffled.remove(cell);
        self.columns[pos.x as usize].remove(cell);
        self.rows[pos.y as usize].remove(cell);
    }

    fn next_shuffled(&self) -> Option<CellId> {
        self.shuffled.last()
    }

    fn bucket(&self, draw: Draw, color: ColorType) -> Option<CellId> {
        let buckets = match draw {
            Draw::Shuffled => return None,
            Draw::Column => &self.columns,
            Draw::Row => &self.rows,
        };
        buckets
            .get(bucket_index(color, buckets.len()))
            .and_then(CellSet::last)
    }
}

/// Column/row bucket a color is steered to
#[inline]
pub fn bucket_index(color: ColorType, buckets: usize) -> usize {
    if buckets == 0 {
        0
    } else {
        color as usize % buckets
    }
}

/// Lift every tile and deal it back into the free cells.
///
/// Every live tile that is not pinned needs a cell, including tiles that are
/// currently detached. Fails before touching the board when the cells left after
/// lifting cannot hold them all. Returns the tiles that changed cell.
pub fn shuffle_board(
    board: &mut Board,
    rng: &mut impl Rng,
    mode: ShuffleMode,
) -> Result<Vec<Relocation>, SimError> {
    can_shuffle(board)?;
    let tiles: Vec<(TileId, Option<CellId>)> = board
        .tiles
        .iter()
        .map(|t| (t.id, t.cell()))
        .filter(|(_, cell)| cell.is_none_or(|c| !board.is_pinned(c)))
        .collect();

    for &(_, origin) in &tiles {
        if let Some(cell) = origin {
            board.lift_tile(cell);
        }
    }

    let mut cells = board.grid.free_cells().to_vec();
    cells.sort_unstable();
    cells.shuffle(rng);
    let capacity = cells.len();
    let mut pool = CellPool::new(board, cells);

    let ceiling = mode.draw_ceiling();
    let mut moves = Vec::new();
    for &(tile, origin) in &tiles {
        let color = board.tile(tile).map(|t| t.color).unwrap_or_default();
        let p: f32 = rng.random_range(0.0..ceiling);
        let target = pool
            .bucket(classify_draw(p), color)
            .or_else(|| pool.next_shuffled())
            .ok_or(SimError::ShuffleCapacity {
                free: capacity,
                needed: tiles.len(),
            })?;
        pool.take(board, target);
        board.place_tile(tile, target)?;
        if origin != Some(target) {
            let to = board.grid.pos(target);
            moves.push(Relocation {
                tile,
                from: origin.map_or(to, |c| board.grid.pos(c)),
                to,
            });
        }
    }

    neighbor_scan(board);
    log::info!(
        "Shuffled {} tiles ({} moved, mode {})",
        tiles.len(),
        moves.len(),
        mode.as_str()
    );
    Ok(moves)
}

/// Cells available once every loose tile is lifted must cover every loose tile
pub fn can_shuffle(board: &Board) -> Result<(), SimError> {
    let free = board.grid.free_count() + board.playable_cells().count();
    let pinned = board.occupied_cells().count() - board.playable_cells().count();
    let needed = board.tiles.live_count() - pinned;
    if free < needed {
        return Err(SimError::ShuffleCapacity { free, needed });
    }
    Ok(())
}
