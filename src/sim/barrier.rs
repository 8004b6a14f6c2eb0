//! Pending-operation barrier
//!
//! Each asynchronous unit of work (a tile relocation, a shuffle sequence)
//! takes a ticket. The owning phase may only advance once every ticket has
//! been completed. Completing an unknown or already-completed ticket is a
//! no-op, so collaborators can report completion more than once.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticket(pub u64);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingBarrier {
    next: u64,
    outstanding: BTreeSet<Ticket>,
}

impl PendingBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self) -> Ticket {
        let ticket = Ticket(self.next);
        self.next += 1;
        self.outstanding.insert(ticket);
        ticket
    }

    /// Returns true if the ticket was outstanding
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        self.outstanding.remove(&ticket)
    }

    /// Complete every outstanding ticket, returning how many there were
    pub fn complete_all(&mut self) -> usize {
        let n = self.outstanding.len();
        self.outstanding.clear();
        n
    }

    pub fn pending(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_clear(&self) -> bool {
        self.outstanding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clears_only_at_zero() {
        let mut barrier = PendingBarrier::new();
        let a = barrier.register();
        let b = barrier.register();
        assert_ne!(a, b);

        assert!(barrier.complete(a));
        assert!(!barrier.is_clear());
        assert!(!barrier.complete(a));
        assert_eq!(barrier.pending(), 1);

        assert!(barrier.complete(b));
        assert!(barrier.is_clear());
    }

    #[test]
    fn test_complete_all() {
        let mut barrier = PendingBarrier::new();
        barrier.register();
        barrier.register();
        assert_eq!(barrier.complete_all(), 2);
        assert!(barrier.is_clear());
        // tickets keep increasing after a flush
        assert_eq!(barrier.register(), Ticket(2));
    }
}
