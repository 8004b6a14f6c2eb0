//! Events published to collaborators
//!
//! Renderers, score panels and sync layers observe the simulation through
//! [`GameEvent`]s. Events are queued for polling and also pushed to any
//! registered [`EventSink`] as they happen.

use serde::{Deserialize, Serialize};

use super::barrier::Ticket;
use super::grid::CellPos;
use super::state::GamePhase;
use super::tile::{TileInfo, TileKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Fired on every phase transition
    PhaseChanged { from: GamePhase, to: GamePhase },
    /// Once per removed tile
    TileBlasted { tile: TileInfo, pos: CellPos },
    /// After every neighbour scan
    NeighborScanComplete { has_valid_move: bool },
    TileSpawned { tile: TileInfo, pos: CellPos },
    /// A tile changed cell; report `ticket` back once the move has been shown
    TileMoved {
        ticket: Ticket,
        tile: TileInfo,
        from: CellPos,
        to: CellPos,
    },
    SpecialCreated { tile: TileInfo, pos: CellPos, kind: TileKind },
    BlockerDamaged { pos: CellPos, strength: u8 },
    BlockerDestroyed { pos: CellPos },
    /// Tap that could not blast (shake feedback); no move was spent
    SelectionRejected { pos: CellPos },
    Shuffled { moved: usize },
    GoalProgress { remaining: u32 },
}

/// Observer of simulation events
pub trait EventSink {
    fn on_event(&mut self, event: &GameEvent);
}

impl<F: FnMut(&GameEvent)> EventSink for F {
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}

/// Event queue plus synchronous observers
#[derive(Default)]
pub struct EventBus {
    queue: Vec<GameEvent>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queued", &self.queue.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn publish(&mut self, event: GameEvent) {
        for sink in &mut self.sinks {
            sink.on_event(&event);
        }
        self.queue.push(event);
    }

    /// Take every queued event, oldest first
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.queue)
    }

    pub fn queued(&self) -> &[GameEvent] {
        &self.queue
    }
}
