//! Tile Blast headless runner
//!
//! Plays a level by always tapping the largest group and logs the result.
//!
//! Usage: `tile-blast [level] [seed] [settings.json]`

#![cfg_attr(target_arch = "wasm32", allow(dead_code, unused_imports))]

use std::time::{SystemTime, UNIX_EPOCH};

use tile_blast::sim::{CellPos, GameEvent, GamePhase, GridSimulation, TickInput, determine_group, tick};
use tile_blast::{Settings, SimError};

/// Upper bound on taps, in case a level never resolves
const MAX_TAPS: usize = 500;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("Run failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host page; nothing to run here
}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<(), SimError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let level = args.first().and_then(|a| a.parse().ok()).unwrap_or(1);
    let seed = args.get(1).and_then(|a| a.parse().ok()).unwrap_or_else(clock_seed);
    let settings = match args.get(2) {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| SimError::InvalidConfig(format!("{}: {}", path, e)))?;
            Settings {
                instant_animations: true,
                ..Settings::from_json(&json)?
            }
        }
        None => Settings::headless(),
    };

    log::info!("Tile Blast starting: level {}, seed {}", level, seed);
    let mut sim = GridSimulation::new(settings, seed);
    sim.apply_difficulty(level)?;
    tick(&mut sim, &TickInput::default())?;
    sim.drain_events();

    let mut taps = 0;
    while sim.phase() == GamePhase::WaitingInput && taps < MAX_TAPS {
        let Some(pos) = best_tap(&sim) else {
            log::warn!("No blastable group after reshuffling, using the shuffle booster");
            let input = TickInput {
                shuffle: Some(sim.settings.auto_shuffle_mode),
                ..Default::default()
            };
            tick(&mut sim, &input)?;
            sim.drain_events();
            taps += 1;
            continue;
        };
        let input = TickInput {
            select: Some(pos),
            ..Default::default()
        };
        tick(&mut sim, &input)?;
        taps += 1;
        let events = sim.drain_events();
        let blasted = events
            .iter()
            .filter(|e| matches!(e, GameEvent::TileBlasted { .. }))
            .count();
        log::debug!(
            "Tap {} at ({}, {}): {} blasted, {} events, score {}, moves left {}",
            taps,
            pos.x,
            pos.y,
            blasted,
            events.len(),
            sim.score(),
            sim.moves_left()
        );
    }

    let goal = sim.goal();
    log::info!(
        "Finished in {:?}: score {}, moves left {}, goal remaining {}",
        sim.phase(),
        sim.score(),
        sim.moves_left(),
        goal.remaining
    );
    Ok(())
}

/// Cell of the tile whose group is largest, if any group can blast
fn best_tap(sim: &GridSimulation) -> Option<CellPos> {
    let board = &sim.board;
    board
        .playable_cells()
        .map(|(cell, tile)| (determine_group(board, tile).len(), cell))
        .filter(|(size, _)| *size >= tile_blast::consts::BLAST_THRESHOLD)
        .max_by_key(|(size, cell)| (*size, std::cmp::Reverse(*cell)))
        .map(|(_, cell)| board.grid.pos(cell))
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
