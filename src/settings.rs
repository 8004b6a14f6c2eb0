//! Simulation settings
//!
//! Tuning that stays fixed across levels: scores, special-tile thresholds
//! and shuffle policy. Per-level values live in
//! [`DifficultyConfig`](crate::sim::DifficultyConfig).

use serde::{Deserialize, Serialize};

use crate::SimError;

/// Shuffle entropy levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ShuffleMode {
    /// Mostly uniform placement with a light positional bias
    #[default]
    Random,
    /// Low-entropy placement: every tile goes through a color bucket
    Ordered,
}

impl ShuffleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShuffleMode::Random => "Random",
            ShuffleMode::Ordered => "Ordered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "random" => Some(ShuffleMode::Random),
            "ordered" | "order" => Some(ShuffleMode::Ordered),
            _ => None,
        }
    }

    /// Upper bound of the fraction drawn per tile
    pub fn draw_ceiling(&self) -> f32 {
        match self {
            ShuffleMode::Random => 1.0,
            ShuffleMode::Ordered => crate::consts::SHUFFLE_RANDOM_CUTOFF,
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Scoring ===
    /// Score for a regular tile
    pub tile_score: u32,
    /// Score for any special tile
    pub special_tile_score: u32,

    // === Special tiles ===
    /// AreaBomb reach; a tile is hit when |dx| < radius and |dy| < radius
    pub bomb_radius: u8,
    /// Group size that leaves a line clear behind
    pub line_clear_threshold: usize,
    /// Group size that leaves an area bomb behind
    pub bomb_threshold: usize,
    /// Group size that leaves a color clear behind
    pub color_clear_threshold: usize,

    // === Shuffling ===
    /// Mode used when the board deadlocks on its own
    pub auto_shuffle_mode: ShuffleMode,
    /// Automatic shuffles attempted before input is reopened
    pub max_shuffle_attempts: u32,

    // === Headless ===
    /// Complete relocations as soon as they are issued (no renderer attached)
    pub instant_animations: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tile_score: 10,
            special_tile_score: 25,

            bomb_radius: 2,
            line_clear_threshold: 5,
            bomb_threshold: 7,
            color_clear_threshold: 9,

            auto_shuffle_mode: ShuffleMode::Random,
            max_shuffle_attempts: 5,

            instant_animations: false,
        }
    }
}

impl Settings {
    /// Settings for driving the simulation without a renderer
    pub fn headless() -> Self {
        Self {
            instant_animations: true,
            ..Self::default()
        }
    }

    /// Score awarded when a tile of this variant is blasted
    pub fn score_for(&self, special: bool) -> u32 {
        if special {
            self.special_tile_score
        } else {
            self.tile_score
        }
    }

    /// Reject settings the simulation cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        if self.bomb_radius == 0 {
            return Err(SimError::InvalidConfig("bomb_radius must be at least 1".into()));
        }
        if self.line_clear_threshold < crate::consts::BLAST_THRESHOLD {
            return Err(SimError::InvalidConfig(format!(
                "line_clear_threshold {} is below the blast threshold",
                self.line_clear_threshold
            )));
        }
        if !(self.line_clear_threshold <= self.bomb_threshold
            && self.bomb_threshold <= self.color_clear_threshold)
        {
            return Err(SimError::InvalidConfig(
                "special thresholds must be non-decreasing".into(),
            ));
        }
        Ok(())
    }

    /// Parse settings from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        log::info!("Loaded simulation settings");
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string(self)?)
    }
}
