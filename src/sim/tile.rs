//! Tiles and the tile arena
//!
//! Tiles are referenced by [`TileId`]. Blasted tiles go back to a pool and
//! are reused by later spawns, so an id only names a live tile while
//! [`TileArena::is_live`] says so.

use serde::{Deserialize, Serialize};

use super::grid::{CellId, CellPos};

/// Palette index
pub type ColorType = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u32);

impl TileId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tile variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Regular,
    /// Clears its whole row
    HorizontalClear,
    /// Clears its whole column
    VerticalClear,
    /// Same-color tiles within a square window
    AreaBomb { radius: u8 },
    /// Every regular tile of the target color
    ColorClear { target: ColorType },
}

impl TileKind {
    pub fn is_special(&self) -> bool {
        !matches!(self, TileKind::Regular)
    }

    /// Area a blast of this tile reaches beyond its group, for blocker damage
    pub fn footprint(&self, origin: CellPos) -> Option<Footprint> {
        match *self {
            TileKind::Regular | TileKind::ColorClear { .. } => None,
            TileKind::HorizontalClear => Some(Footprint::Row(origin.y)),
            TileKind::VerticalClear => Some(Footprint::Column(origin.x)),
            TileKind::AreaBomb { radius } => Some(Footprint::Square {
                center: origin,
                radius: i32::from(radius.max(1)),
            }),
        }
    }
}

/// Cells covered by a special tile's effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footprint {
    Row(i32),
    Column(i32),
    /// Cells with |dx| < radius and |dy| < radius
    Square { center: CellPos, radius: i32 },
}

impl Footprint {
    pub fn contains(&self, pos: CellPos) -> bool {
        match *self {
            Footprint::Row(y) => pos.y == y,
            Footprint::Column(x) => pos.x == x,
            Footprint::Square { center, radius } => {
                let d = (pos - center).abs();
                d.x < radius && d.y < radius
            }
        }
    }
}

/// A matchable piece
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub color: ColorType,
    pub kind: TileKind,
    pub score_value: u32,
    /// Back-reference to the cell holding this tile (None while detached or pooled)
    pub(crate) cell: Option<CellId>,
    /// Same-color 4-neighbours, valid right after a neighbour scan
    pub adjacent_same_color: Vec<TileId>,
    /// Size of this tile's same-color component at the last scan
    pub group_hint: usize,
}

impl Tile {
    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    fn reset(&mut self, color: ColorType, kind: TileKind, score_value: u32) {
        self.color = color;
        self.kind = kind;
        self.score_value = score_value;
        self.cell = None;
        self.adjacent_same_color.clear();
        self.group_hint = 0;
    }
}

/// Snapshot of a tile carried by events (ids may be recycled later)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    pub id: TileId,
    pub color: ColorType,
    pub kind: TileKind,
    pub score_value: u32,
}

impl From<&Tile> for TileInfo {
    fn from(tile: &Tile) -> Self {
        Self {
            id: tile.id,
            color: tile.color,
            kind: tile.kind,
            score_value: tile.score_value,
        }
    }
}

/// Arena of tiles with a recycling pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileArena {
    tiles: Vec<Tile>,
    live: Vec<bool>,
    pool: Vec<TileId>,
}

impl TileArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached tile, reusing a pooled slot when one exists
    pub fn spawn(&mut self, color: ColorType, kind: TileKind, score_value: u32) -> TileId {
        if let Some(id) = self.pool.pop() {
            self.tiles[id.index()].reset(color, kind, score_value);
            self.live[id.index()] = true;
            return id;
        }
        let id = TileId(self.tiles.len() as u32);
        self.tiles.push(Tile {
            id,
            color,
            kind,
            score_value,
            cell: None,
            adjacent_same_color: Vec::new(),
            group_hint: 0,
        });
        self.live.push(true);
        id
    }

    /// Return a tile to the pool. The caller must already have detached it from the grid.
    pub fn release(&mut self, id: TileId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        let tile = &mut self.tiles[id.index()];
        tile.cell = None;
        tile.adjacent_same_color.clear();
        self.live[id.index()] = false;
        self.pool.push(id);
        true
    }

    pub fn is_live(&self, id: TileId) -> bool {
        self.live.get(id.index()).copied().unwrap_or(false)
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.is_live(id).then(|| &self.tiles[id.index()])
    }

    pub fn get_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        if self.is_live(id) {
            Some(&mut self.tiles[id.index()])
        } else {
            None
        }
    }

    /// Live tiles in id order
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles
            .iter()
            .zip(&self.live)
            .filter_map(|(t, live)| live.then_some(t))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles
            .iter_mut()
            .zip(&self.live)
            .filter_map(|(t, live)| live.then_some(t))
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|l| **l).count()
    }

    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }
}
