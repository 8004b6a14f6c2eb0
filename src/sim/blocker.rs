//! Degradable obstacles
//!
//! A blocker pins its cell out of play until its strength is worn down.
//! Strength changes go through [`Board`](super::Board) so the grid's free
//! set follows blocker removal.

use serde::{Deserialize, Serialize};

use super::grid::CellId;
use crate::consts::{MAX_BLOCKER_STRENGTH, MIN_BLOCKER_STRENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockerId(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blocker {
    pub id: BlockerId,
    /// Protected cell
    pub cell: CellId,
    strength: u8,
}

impl Blocker {
    pub fn new(id: BlockerId, cell: CellId, strength: u8) -> Self {
        Self {
            id,
            cell,
            strength: strength.clamp(MIN_BLOCKER_STRENGTH, MAX_BLOCKER_STRENGTH),
        }
    }

    pub fn strength(&self) -> u8 {
        self.strength
    }

    pub fn is_destroyed(&self) -> bool {
        self.strength == 0
    }

    /// Lower strength, clamped at zero. Returns the remaining strength.
    pub fn reduce_strength(&mut self, amount: u8) -> u8 {
        self.strength = self.strength.saturating_sub(amount);
        self.strength
    }
}

/// Result of damaging one blocker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockerHit {
    pub blocker: BlockerId,
    pub cell: CellId,
    pub strength: u8,
    pub destroyed: bool,
}

/// Owner of every blocker on the board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockerRegistry {
    slots: Vec<Option<Blocker>>,
}

impl BlockerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cell: CellId, strength: u8) -> BlockerId {
        let id = BlockerId(self.slots.len() as u32);
        self.slots.push(Some(Blocker::new(id, cell, strength)));
        id
    }

    pub fn get(&self, id: BlockerId) -> Option<&Blocker> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: BlockerId) -> Option<&mut Blocker> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, id: BlockerId) -> Option<Blocker> {
        self.slots.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blocker> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_clamps_at_zero() {
        let mut blocker = Blocker::new(BlockerId(0), CellId(0), 2);
        assert_eq!(blocker.reduce_strength(5), 0);
        assert!(blocker.is_destroyed());
        assert_eq!(blocker.reduce_strength(1), 0);
    }

    #[test]
    fn test_new_strength_is_bounded() {
        assert_eq!(Blocker::new(BlockerId(0), CellId(0), 0).strength(), 1);
        assert_eq!(Blocker::new(BlockerId(0), CellId(0), 9).strength(), 3);
    }

    #[test]
    fn test_registry_remove() {
        let mut registry = BlockerRegistry::new();
        let a = registry.insert(CellId(3), 2);
        let b = registry.insert(CellId(4), 1);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(a).is_some());
        assert!(registry.get(a).is_none());
        assert_eq!(registry.get(b).map(|b| b.cell), Some(CellId(4)));
        assert_eq!(registry.len(), 1);
    }
}
