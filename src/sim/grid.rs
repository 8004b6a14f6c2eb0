//! Cell grid and free-cell tracking
//!
//! Cells are stored in a flat arena indexed by [`CellId`]; `y = 0` is the
//! bottom row. The free-cell set is updated on every occupancy change so
//! that `is_available()` and set membership never disagree.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::blocker::BlockerId;
use super::tile::TileId;
use crate::SimError;
use crate::consts::MAX_BOARD_SIDE;

/// Grid coordinate (x = column, y = row from the bottom)
pub type CellPos = IVec2;

/// 4-neighbour offsets (no diagonals)
pub const NEIGHBORS_4: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u32);

impl CellId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One grid position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub pos: CellPos,
    tile: Option<TileId>,
    blocker: Option<BlockerId>,
}

impl Cell {
    fn new(pos: CellPos) -> Self {
        Self {
            pos,
            tile: None,
            blocker: None,
        }
    }

    pub fn tile(&self) -> Option<TileId> {
        self.tile
    }

    pub fn blocker(&self) -> Option<BlockerId> {
        self.blocker
    }

    /// True when the cell holds neither a tile nor a blocker
    #[inline]
    pub fn is_available(&self) -> bool {
        self.tile.is_none() && self.blocker.is_none()
    }
}

/// Set of cells with O(1) insert, remove and membership (swap-with-last)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellSet {
    items: Vec<CellId>,
    /// slot[cell] = position in `items`
    slot: Vec<Option<usize>>,
}

impl CellSet {
    pub fn with_capacity(cells: usize) -> Self {
        Self {
            items: Vec::with_capacity(cells),
            slot: vec![None; cells],
        }
    }

    pub fn from_cells(cells: usize, items: Vec<CellId>) -> Self {
        let mut set = Self {
            items: Vec::with_capacity(items.len()),
            slot: vec![None; cells],
        };
        for id in items {
            set.insert(id);
        }
        set
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.slot.get(id.index()).copied().flatten().is_some()
    }

    /// Returns false if already present
    pub fn insert(&mut self, id: CellId) -> bool {
        if self.contains(id) {
            return false;
        }
        if id.index() >= self.slot.len() {
            self.slot.resize(id.index() + 1, None);
        }
        self.slot[id.index()] = Some(self.items.len());
        self.items.push(id);
        true
    }

    /// Returns false if absent
    pub fn remove(&mut self, id: CellId) -> bool {
        let Some(pos) = self.slot.get(id.index()).copied().flatten() else {
            return false;
        };
        self.items.swap_remove(pos);
        if let Some(&moved) = self.items.get(pos) {
            self.slot[moved.index()] = Some(pos);
        }
        self.slot[id.index()] = None;
        true
    }

    pub fn pop(&mut self) -> Option<CellId> {
        let id = self.items.pop()?;
        self.slot[id.index()] = None;
        Some(id)
    }

    pub fn last(&self) -> Option<CellId> {
        self.items.last().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[CellId] {
        &self.items
    }
}

/// Rectangular cell grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    free: CellSet,
}

impl Grid {
    /// Create a grid with every cell free
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.clamp(1, MAX_BOARD_SIDE);
        let height = height.clamp(1, MAX_BOARD_SIDE);
        let count = (width * height) as usize;
        let mut cells = Vec::with_capacity(count);
        for y in 0..height {
            for x in 0..width {
                cells.push(Cell::new(IVec2::new(x, y)));
            }
        }
        let free = CellSet::from_cells(count, (0..count as u32).map(CellId).collect());
        Self {
            width,
            height,
            cells,
            free,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn in_bounds(&self, pos: CellPos) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    #[inline]
    pub fn id_at(&self, pos: CellPos) -> Option<CellId> {
        self.in_bounds(pos)
            .then(|| CellId((pos.y * self.width + pos.x) as u32))
    }

    /// Like [`id_at`](Self::id_at) but reports the bad position
    pub fn require(&self, pos: CellPos) -> Result<CellId, SimError> {
        self.id_at(pos).ok_or(SimError::OutOfBounds {
            pos,
            width: self.width,
            height: self.height,
        })
    }

    #[inline]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    pub fn cell_at(&self, pos: CellPos) -> Option<&Cell> {
        self.id_at(pos).map(|id| self.cell(id))
    }

    #[inline]
    pub fn pos(&self, id: CellId) -> CellPos {
        self.cells[id.index()].pos
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (CellId(i as u32), c))
    }

    /// In-bounds 4-neighbours of a cell
    pub fn neighbors4(&self, id: CellId) -> impl Iterator<Item = CellId> + '_ {
        let pos = self.pos(id);
        NEIGHBORS_4.iter().filter_map(move |d| self.id_at(pos + *d))
    }

    pub fn free_cells(&self) -> &[CellId] {
        self.free.as_slice()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn is_free(&self, id: CellId) -> bool {
        self.free.contains(id)
    }

    pub fn tile_at(&self, id: CellId) -> Option<TileId> {
        self.cells[id.index()].tile
    }

    pub fn blocker_at(&self, id: CellId) -> Option<BlockerId> {
        self.cells[id.index()].blocker
    }

    /// Attach a tile. Fails if the cell already holds a tile or a blocker.
    pub fn attach_tile(&mut self, id: CellId, tile: TileId) -> Result<(), SimError> {
        let cell = &mut self.cells[id.index()];
        if !cell.is_available() {
            return Err(SimError::CellOccupied { pos: cell.pos });
        }
        cell.tile = Some(tile);
        self.sync_free(id);
        Ok(())
    }

    pub fn detach_tile(&mut self, id: CellId) -> Option<TileId> {
        let tile = self.cells[id.index()].tile.take();
        self.sync_free(id);
        tile
    }

    pub fn attach_blocker(&mut self, id: CellId, blocker: BlockerId) -> Result<(), SimError> {
        let cell = &mut self.cells[id.index()];
        if cell.blocker.is_some() {
            return Err(SimError::BlockerAlreadyPlaced { pos: cell.pos });
        }
        cell.blocker = Some(blocker);
        self.sync_free(id);
        Ok(())
    }

    pub fn detach_blocker(&mut self, id: CellId) -> Option<BlockerId> {
        let blocker = self.cells[id.index()].blocker.take();
        self.sync_free(id);
        blocker
    }

    fn sync_free(&mut self, id: CellId) {
        if self.cells[id.index()].is_available() {
            self.free.insert(id);
        } else {
            self.free.remove(id);
        }
    }

    /// Check `free == { c | c.is_available() }`
    pub fn verify_free_set(&self) -> Result<(), SimError> {
        for (id, cell) in self.cells() {
            if cell.is_available() != self.free.contains(id) {
                return Err(SimError::FreeSetMismatch { pos: cell.pos });
            }
        }
        if self.free.len() != self.cells.iter().filter(|c| c.is_available()).count() {
            return Err(SimError::InvalidConfig("free set holds stale cells".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_all_free() {
        let grid = Grid::new(4, 3);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.free_count(), 12);
        assert!(grid.cells().all(|(_, c)| c.is_available()));
        assert!(grid.verify_free_set().is_ok());
    }

    #[test]
    fn test_oversized_grid_is_clamped() {
        let grid = Grid::new(i32::MAX, 3);
        assert_eq!(grid.width(), MAX_BOARD_SIDE);
        assert_eq!(grid.len(), (MAX_BOARD_SIDE * 3) as usize);
    }

    #[test]
    fn test_id_and_pos_agree() {
        let grid = Grid::new(5, 4);
        let id = grid.id_at(IVec2::new(3, 2)).unwrap();
        assert_eq!(grid.pos(id), IVec2::new(3, 2));
        assert!(grid.id_at(IVec2::new(5, 0)).is_none());
        assert!(grid.id_at(IVec2::new(0, -1)).is_none());
        assert!(matches!(
            grid.require(IVec2::new(-1, 0)),
            Err(SimError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_neighbors_at_corner() {
        let grid = Grid::new(3, 3);
        let corner = grid.id_at(IVec2::ZERO).unwrap();
        let mut around: Vec<_> = grid.neighbors4(corner).map(|id| grid.pos(id)).collect();
        around.sort_by_key(|p| (p.x, p.y));
        assert_eq!(around, vec![IVec2::new(0, 1), IVec2::new(1, 0)]);
    }

    #[test]
    fn test_attach_detach_tracks_free_set() {
        let mut grid = Grid::new(3, 3);
        let id = grid.id_at(IVec2::new(1, 1)).unwrap();

        grid.attach_tile(id, TileId(7)).unwrap();
        assert!(!grid.is_free(id));
        assert_eq!(grid.free_count(), 8);

        assert_eq!(grid.detach_tile(id), Some(TileId(7)));
        assert!(grid.is_free(id));
        assert!(grid.verify_free_set().is_ok());
    }

    #[test]
    fn test_second_tile_owner_rejected() {
        let mut grid = Grid::new(2, 2);
        let id = grid.id_at(IVec2::ZERO).unwrap();
        grid.attach_tile(id, TileId(1)).unwrap();
        assert!(matches!(
            grid.attach_tile(id, TileId(2)),
            Err(SimError::CellOccupied { .. })
        ));
        assert_eq!(grid.tile_at(id), Some(TileId(1)));
    }

    #[test]
    fn test_blocker_keeps_cell_out_of_free_set() {
        let mut grid = Grid::new(2, 2);
        let id = grid.id_at(IVec2::new(1, 0)).unwrap();
        grid.attach_blocker(id, BlockerId(0)).unwrap();
        assert!(!grid.is_free(id));
        assert!(matches!(
            grid.attach_blocker(id, BlockerId(1)),
            Err(SimError::BlockerAlreadyPlaced { .. })
        ));
        grid.detach_blocker(id);
        assert!(grid.is_free(id));
    }

    #[test]
    fn test_cell_set_swap_remove() {
        let mut set = CellSet::with_capacity(4);
        for i in 0..4 {
            set.insert(CellId(i));
        }
        assert!(set.remove(CellId(1)));
        assert!(!set.remove(CellId(1)));
        assert_eq!(set.len(), 3);
        assert!(set.contains(CellId(3)));
        assert!(set.remove(CellId(3)));
        assert_eq!(set.pop(), Some(CellId(2)));
        assert_eq!(set.as_slice(), &[CellId(0)]);
    }
}
