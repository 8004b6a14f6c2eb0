//! Board: grid plus the tile arena and blocker registry
//!
//! Every occupancy change goes through here so that a tile's recorded cell,
//! the cell's tile slot and the free set always move together.

use serde::{Deserialize, Serialize};

use super::blocker::{BlockerHit, BlockerId, BlockerRegistry};
use super::grid::{CellId, CellPos, Grid};
use super::tile::{ColorType, Footprint, Tile, TileArena, TileId, TileKind};
use crate::SimError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub grid: Grid,
    pub tiles: TileArena,
    pub blockers: BlockerRegistry,
}

impl Board {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            grid: Grid::new(width, height),
            tiles: TileArena::new(),
            blockers: BlockerRegistry::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.grid.width()
    }

    pub fn height(&self) -> i32 {
        self.grid.height()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    /// Tile occupying the cell at `pos`
    pub fn tile_at(&self, pos: CellPos) -> Option<&Tile> {
        let id = self.grid.id_at(pos)?;
        self.grid.tile_at(id).and_then(|t| self.tiles.get(t))
    }

    /// Grid position of a live, placed tile
    pub fn tile_pos(&self, id: TileId) -> Option<CellPos> {
        self.tiles.get(id)?.cell.map(|c| self.grid.pos(c))
    }

    /// Spawn a new tile directly into a free cell
    pub fn spawn_tile(
        &mut self,
        cell: CellId,
        color: ColorType,
        kind: TileKind,
        score_value: u32,
    ) -> Result<TileId, SimError> {
        if !self.grid.cell(cell).is_available() {
            return Err(SimError::CellOccupied {
                pos: self.grid.pos(cell),
            });
        }
        let id = self.tiles.spawn(color, kind, score_value);
        self.place_tile(id, cell)?;
        Ok(id)
    }

    /// Spawn at a position (test and level-authoring helper)
    pub fn spawn_tile_at(
        &mut self,
        pos: CellPos,
        color: ColorType,
        kind: TileKind,
    ) -> Result<TileId, SimError> {
        let cell = self.grid.require(pos)?;
        self.spawn_tile(cell, color, kind, 0)
    }

    /// Put a detached tile into a free cell
    pub fn place_tile(&mut self, id: TileId, cell: CellId) -> Result<(), SimError> {
        self.grid.attach_tile(cell, id)?;
        if let Some(tile) = self.tiles.get_mut(id) {
            tile.cell = Some(cell);
        }
        Ok(())
    }

    /// Take the tile out of a cell, leaving it live but detached
    pub fn lift_tile(&mut self, cell: CellId) -> Option<TileId> {
        let id = self.grid.detach_tile(cell)?;
        if let Some(tile) = self.tiles.get_mut(id) {
            tile.cell = None;
        }
        Some(id)
    }

    /// Move a tile between cells in one step
    pub fn move_tile(&mut self, from: CellId, to: CellId) -> Result<TileId, SimError> {
        if !self.grid.cell(to).is_available() {
            return Err(SimError::CellOccupied {
                pos: self.grid.pos(to),
            });
        }
        let id = self.lift_tile(from).ok_or(SimError::InvalidConfig(format!(
            "no tile to move at ({}, {})",
            self.grid.pos(from).x,
            self.grid.pos(from).y
        )))?;
        self.place_tile(id, to)?;
        Ok(id)
    }

    /// Detach a tile and return it to the pool
    pub fn remove_tile(&mut self, id: TileId) -> Option<CellId> {
        let cell = self.tiles.get(id)?.cell;
        if let Some(cell) = cell {
            self.grid.detach_tile(cell);
        }
        self.tiles.release(id);
        cell
    }

    /// Put a blocker on a cell. Fails if one is already there.
    ///
    /// A tile already in the cell stays there, pinned until the blocker is destroyed.
    pub fn place_blocker(&mut self, cell: CellId, strength: u8) -> Result<BlockerId, SimError> {
        if self.grid.blocker_at(cell).is_some() {
            return Err(SimError::BlockerAlreadyPlaced {
                pos: self.grid.pos(cell),
            });
        }
        let id = self.blockers.insert(cell, strength);
        self.grid.attach_blocker(cell, id)?;
        Ok(id)
    }

    pub fn blocker_strength_at(&self, pos: CellPos) -> Option<u8> {
        let cell = self.grid.id_at(pos)?;
        let id = self.grid.blocker_at(cell)?;
        self.blockers.get(id).map(|b| b.strength())
    }

    /// Damage a blocker; at zero strength it leaves its cell
    pub fn damage_blocker(&mut self, id: BlockerId, amount: u8) -> Option<BlockerHit> {
        let blocker = self.blockers.get_mut(id)?;
        let strength = blocker.reduce_strength(amount);
        let cell = blocker.cell;
        let destroyed = strength == 0;
        if destroyed {
            self.blockers.remove(id);
            self.grid.detach_blocker(cell);
        }
        Some(BlockerHit {
            blocker: id,
            cell,
            strength,
            destroyed,
        })
    }

    /// Blockers one 4-neighbour step from `pos`, in cell order
    pub fn adjacent_blockers(&self, pos: CellPos) -> Vec<BlockerId> {
        let Some(cell) = self.grid.id_at(pos) else {
            return Vec::new();
        };
        let mut found: Vec<BlockerId> = self
            .grid
            .neighbors4(cell)
            .filter_map(|n| self.grid.blocker_at(n))
            .collect();
        found.sort();
        found
    }

    /// Blockers covered by a special tile's footprint
    pub fn blockers_in(&self, footprint: &Footprint) -> Vec<BlockerId> {
        self.blockers
            .iter()
            .filter(|b| footprint.contains(self.grid.pos(b.cell)))
            .map(|b| b.id)
            .collect()
    }

    /// A direct blast at `pos` knocks 1 strength off each 4-adjacent blocker
    pub fn handle_adjacent_blast(&mut self, pos: CellPos) -> Vec<BlockerHit> {
        self.adjacent_blockers(pos)
            .into_iter()
            .filter_map(|id| self.damage_blocker(id, 1))
            .collect()
    }

    /// Occupied cells holding tiles, in cell order
    pub fn occupied_cells(&self) -> impl Iterator<Item = (CellId, TileId)> + '_ {
        self.grid
            .cells()
            .filter_map(|(id, cell)| cell.tile().map(|t| (id, t)))
    }

    /// Tiles under a blocker neither move nor match
    pub fn is_pinned(&self, cell: CellId) -> bool {
        self.grid.blocker_at(cell).is_some()
    }

    /// Occupied cells whose tile is not pinned, in cell order
    pub fn playable_cells(&self) -> impl Iterator<Item = (CellId, TileId)> + '_ {
        self.occupied_cells().filter(|(cell, _)| !self.is_pinned(*cell))
    }

    /// Sorted multiset of tile colors on the board
    pub fn color_histogram(&self) -> Vec<ColorType> {
        let mut colors: Vec<ColorType> = self
            .occupied_cells()
            .filter_map(|(_, t)| self.tiles.get(t).map(|t| t.color))
            .collect();
        colors.sort_unstable();
        colors
    }

    /// Check free-set membership and tile/cell back-references
    pub fn verify(&self) -> Result<(), SimError> {
        self.grid.verify_free_set()?;
        for (cell, tile_id) in self.occupied_cells() {
            match self.tiles.get(tile_id) {
                Some(tile) if tile.cell == Some(cell) => {}
                _ => return Err(SimError::TileCellMismatch { tile: tile_id.0 }),
            }
        }
        for tile in self.tiles.iter() {
            if let Some(cell) = tile.cell {
                if self.grid.tile_at(cell) != Some(tile.id) {
                    return Err(SimError::TileCellMismatch { tile: tile.id.0 });
                }
            }
        }
        for blocker in self.blockers.iter() {
            if self.grid.blocker_at(blocker.cell) != Some(blocker.id) {
                return Err(SimError::FreeSetMismatch {
                    pos: self.grid.pos(blocker.cell),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    #[test]
    fn test_move_tile_keeps_back_reference() {
        let mut board = Board::new(3, 3);
        let t = board.spawn_tile_at(IVec2::new(0, 2), 1, TileKind::Regular).unwrap();
        let from = board.grid.id_at(IVec2::new(0, 2)).unwrap();
        let to = board.grid.id_at(IVec2::new(0, 0)).unwrap();

        board.move_tile(from, to).unwrap();
        assert_eq!(board.tile_pos(t), Some(IVec2::new(0, 0)));
        assert!(board.grid.is_free(from));
        assert!(board.verify().is_ok());
    }

    #[test]
    fn test_remove_tile_frees_cell() {
        let mut board = Board::new(2, 2);
        let t = board.spawn_tile_at(IVec2::ZERO, 0, TileKind::Regular).unwrap();
        let cell = board.remove_tile(t).unwrap();
        assert!(board.grid.is_free(cell));
        assert!(board.tile(t).is_none());
        assert!(board.verify().is_ok());
    }

    #[test]
    fn test_place_blocker_twice_fails() {
        let mut board = Board::new(3, 3);
        let cell = board.grid.id_at(IVec2::new(1, 1)).unwrap();
        board.place_blocker(cell, 2).unwrap();
        assert!(!board.grid.is_free(cell));
        assert!(matches!(
            board.place_blocker(cell, 1),
            Err(SimError::BlockerAlreadyPlaced { .. })
        ));
    }

    #[test]
    fn test_blocker_pins_existing_tile() {
        let mut board = Board::new(2, 2);
        let tile = board.spawn_tile_at(IVec2::ZERO, 4, TileKind::Regular).unwrap();
        let cell = board.grid.id_at(IVec2::ZERO).unwrap();

        let blocker = board.place_blocker(cell, 2).unwrap();
        assert!(board.is_pinned(cell));
        assert_eq!(board.grid.tile_at(cell), Some(tile));
        assert_eq!(board.playable_cells().count(), 0);
        assert!(board.verify().is_ok());

        board.damage_blocker(blocker, 2);
        // the slot still holds the tile, so the cell stays out of the free set
        assert!(!board.is_pinned(cell));
        assert!(!board.grid.is_free(cell));
        assert_eq!(board.playable_cells().count(), 1);
        assert!(board.verify().is_ok());
    }

    #[test]
    fn test_blocker_destroyed_after_three_adjacent_blasts() {
        let mut board = Board::new(3, 3);
        let cell = board.grid.id_at(IVec2::new(1, 1)).unwrap();
        board.place_blocker(cell, 3).unwrap();

        for expected in [2, 1] {
            let hits = board.handle_adjacent_blast(IVec2::new(1, 0));
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].strength, expected);
            assert!(!board.grid.is_free(cell));
        }
        let hits = board.handle_adjacent_blast(IVec2::new(0, 1));
        assert!(hits[0].destroyed);
        assert!(board.grid.is_free(cell));
        assert!(board.blockers.is_empty());
        assert!(board.verify().is_ok());
    }

    #[test]
    fn test_diagonal_blast_does_not_damage() {
        let mut board = Board::new(3, 3);
        let cell = board.grid.id_at(IVec2::new(1, 1)).unwrap();
        board.place_blocker(cell, 1).unwrap();
        assert!(board.handle_adjacent_blast(IVec2::new(0, 0)).is_empty());
        assert_eq!(board.blocker_strength_at(IVec2::new(1, 1)), Some(1));
    }

    #[test]
    fn test_blockers_in_footprint() {
        let mut board = Board::new(5, 5);
        for pos in [IVec2::new(0, 2), IVec2::new(4, 2), IVec2::new(2, 4)] {
            let cell = board.grid.id_at(pos).unwrap();
            board.place_blocker(cell, 1).unwrap();
        }
        let row = TileKind::HorizontalClear.footprint(IVec2::new(2, 2)).unwrap();
        assert_eq!(board.blockers_in(&row).len(), 2);
        let col = TileKind::VerticalClear.footprint(IVec2::new(2, 2)).unwrap();
        assert_eq!(board.blockers_in(&col).len(), 1);
    }
}
