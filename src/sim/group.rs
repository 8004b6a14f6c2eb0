//! Group determination, neighbour scan and deadlock check
//!
//! Every grouping starts with the selected tile itself. Traversals use an
//! explicit queue over cell ids; results are sets, so visiting order only
//! matters to collaborators that replay the list for effects.

use std::collections::VecDeque;

use super::board::Board;
use super::grid::CellId;
use super::tile::{TileId, TileKind};
use crate::consts::BLAST_THRESHOLD;

/// Tiles the selected tile's variant gathers for removal
pub fn determine_group(board: &Board, tile: TileId) -> Vec<TileId> {
    let Some(t) = board.tile(tile) else {
        return Vec::new();
    };
    let Some(cell) = t.cell() else {
        return Vec::new();
    };
    if board.is_pinned(cell) {
        return vec![tile];
    }
    match t.kind {
        TileKind::Regular => color_component(board, cell, None),
        TileKind::HorizontalClear => {
            let y = board.grid.pos(cell).y;
            line_group(board, tile, |pos| pos.y == y)
        }
        TileKind::VerticalClear => {
            let x = board.grid.pos(cell).x;
            line_group(board, tile, |pos| pos.x == x)
        }
        TileKind::AreaBomb { radius } => color_component(board, cell, Some(i32::from(radius.max(1)))),
        TileKind::ColorClear { target } => color_clear_group(board, tile, target),
    }
}

/// True when a group is large enough to blast
#[inline]
pub fn is_blastable(group: &[TileId]) -> bool {
    group.len() >= BLAST_THRESHOLD
}

/// Same-color connected component from `start`; with a radius, candidates
/// outside the |dx| < r, |dy| < r window are neither admitted nor expanded
fn color_component(board: &Board, start: CellId, radius: Option<i32>) -> Vec<TileId> {
    let grid = &board.grid;
    let Some(seed) = grid.tile_at(start).and_then(|t| board.tile(t)) else {
        return Vec::new();
    };
    let color = seed.color;
    let origin = grid.pos(start);

    let mut visited = vec![false; grid.len()];
    let mut queue = VecDeque::from([start]);
    let mut group = vec![seed.id];
    visited[start.index()] = true;

    while let Some(cell) = queue.pop_front() {
        for next in grid.neighbors4(cell) {
            if visited[next.index()] || board.is_pinned(next) {
                continue;
            }
            if let Some(r) = radius {
                let d = (grid.pos(next) - origin).abs();
                if d.x >= r || d.y >= r {
                    continue;
                }
            }
            let Some(tile) = grid.tile_at(next).and_then(|t| board.tile(t)) else {
                continue;
            };
            if tile.color != color {
                continue;
            }
            visited[next.index()] = true;
            group.push(tile.id);
            queue.push_back(next);
        }
    }
    group
}

fn line_group(board: &Board, this: TileId, on_line: impl Fn(glam::IVec2) -> bool) -> Vec<TileId> {
    let mut group = vec![this];
    group.extend(
        board
            .playable_cells()
            .filter(|(cell, tile)| *tile != this && on_line(board.grid.pos(*cell)))
            .map(|(_, tile)| tile),
    );
    group
}

fn color_clear_group(board: &Board, this: TileId, target: u8) -> Vec<TileId> {
    let mut group = vec![this];
    group.extend(
        board
            .playable_cells()
            .filter_map(|(_, t)| board.tile(t))
            .filter(|t| t.id != this && t.kind == TileKind::Regular && t.color == target)
            .map(|t| t.id),
    );
    group
}

/// Rebuild every tile's same-color neighbour list and component size
pub fn neighbor_scan(board: &mut Board) {
    let grid = &board.grid;
    let cells = grid.len();

    // adjacency by cell, then component labels by flood fill
    let mut adjacency: Vec<(TileId, Vec<TileId>)> = Vec::new();
    let mut component = vec![usize::MAX; cells];
    let mut sizes: Vec<usize> = Vec::new();

    for (cell, tile_id) in board.playable_cells() {
        let Some(tile) = board.tiles.get(tile_id) else {
            continue;
        };
        let same: Vec<TileId> = grid
            .neighbors4(cell)
            .filter(|n| !board.is_pinned(*n))
            .filter_map(|n| grid.tile_at(n))
            .filter(|n| board.tiles.get(*n).is_some_and(|o| o.color == tile.color))
            .collect();
        adjacency.push((tile_id, same));

        if component[cell.index()] != usize::MAX {
            continue;
        }
        let label = sizes.len();
        let members = color_component(board, cell, None);
        for member in &members {
            if let Some(c) = board.tiles.get(*member).and_then(|t| t.cell()) {
                component[c.index()] = label;
            }
        }
        sizes.push(members.len());
    }

    // pinned tiles belong to no group
    let hints: Vec<(TileId, usize)> = board
        .occupied_cells()
        .map(|(cell, tile)| (tile, sizes.get(component[cell.index()]).copied().unwrap_or(0)))
        .collect();
    let pinned: Vec<TileId> = board
        .occupied_cells()
        .filter(|(cell, _)| board.is_pinned(*cell))
        .map(|(_, tile)| tile)
        .collect();

    for (id, same) in adjacency {
        if let Some(tile) = board.tiles.get_mut(id) {
            tile.adjacent_same_color = same;
        }
    }
    for (id, size) in hints {
        if let Some(tile) = board.tiles.get_mut(id) {
            tile.group_hint = size;
        }
    }
    for id in pinned {
        if let Some(tile) = board.tiles.get_mut(id) {
            tile.adjacent_same_color.clear();
        }
    }
}

/// True if any blastable move exists.
///
/// Stops at the first pair of same-color 4-neighbours. A special tile whose
/// own group reaches the blast threshold also counts.
pub fn has_valid_move(board: &Board) -> bool {
    let grid = &board.grid;
    for (cell, tile_id) in board.playable_cells() {
        let Some(tile) = board.tile(tile_id) else {
            continue;
        };
        let paired = grid
            .neighbors4(cell)
            .filter(|n| !board.is_pinned(*n))
            .filter_map(|n| grid.tile_at(n))
            .any(|n| board.tile(n).is_some_and(|o| o.color == tile.color));
        if paired {
            return true;
        }
    }
    board
        .tiles
        .iter()
        .filter(|t| t.kind.is_special() && t.cell().is_some_and(|c| !board.is_pinned(c)))
        .any(|t| is_blastable(&determine_group(board, t.id)))
}
