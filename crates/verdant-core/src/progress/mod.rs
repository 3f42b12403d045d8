//! Garden progress and leveling.
//!
//! Completing an energy-saving task plants something in the user's garden.
//! Filling the garden advances the level, which unlocks a wider plant
//! palette and raises the number of completions needed for the next level.
//!
//! ## Level progression
//!
//! | Level | Required | Palette |
//! |-------|----------|---------|
//! | 1 | 5  | potato |
//! | 2 | 7  | potato, berry |
//! | 3 | 9  | potato, berry, sunflower |
//! | 4 | 11 | potato, berry, sunflower, dandelion |
//! | 5 | 13 | potato, berry, sunflower, dandelion, rose |
//!
//! At [`MAX_LEVEL`] the progression stops: further completions keep adding
//! plants and counting toward `total_completed`, but the garden is never
//! cleared again.

pub mod engine;
pub mod store;

use serde::{Deserialize, Serialize};

pub use engine::{Completion, ProgressEngine};
pub use store::{MemoryStore, ProgressStore};

/// Opaque user identity. Produced by the account layer; the progress
/// engine never interprets it.
pub type UserId = i64;

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 5;

/// Plant placement margins, in percent of the plot. Positions are drawn
/// from the interior so plants never render clipped at the edge.
pub const X_RANGE: std::ops::Range<f64> = 6.0..88.0;
pub const Y_RANGE: std::ops::Range<f64> = 15.0..78.0;

/// The plant palette, unlocked one kind per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantKind {
    Potato,
    Berry,
    Sunflower,
    Dandelion,
    Rose,
}

/// A placed plant. Coordinates are percentages within the plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub kind: PlantKind,
    pub x: f64,
    pub y: f64,
}

/// Per-user progress state. One row per user; plants belong to the
/// current level only and are cleared on level-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub level: u32,
    pub completed_in_level: u32,
    pub total_completed: u64,
    pub plants: Vec<Plant>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            level: 1,
            completed_in_level: 0,
            total_completed: 0,
            plants: Vec::new(),
        }
    }
}

impl ProgressState {
    /// Derived view of this state for the presentation layer.
    pub fn view(&self) -> ProgressView {
        let required = tasks_required(self.level);
        ProgressView {
            level: self.level,
            completed_in_level: self.completed_in_level,
            total_completed: self.total_completed,
            required,
            unlock: unlock_label(self.level).to_string(),
            progress: (self.completed_in_level as f64 / required as f64).min(1.0),
            plants: self.plants.clone(),
        }
    }
}

/// Stored state plus the fields derived from it: the completion count the
/// current level requires, the label of the kind this level unlocked, and
/// the fill fraction for the progress bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressView {
    pub level: u32,
    pub completed_in_level: u32,
    pub total_completed: u64,
    pub required: u32,
    pub unlock: String,
    pub progress: f64,
    pub plants: Vec<Plant>,
}

/// Completions required to finish the given level: 5, 7, 9, 11, 13...
pub fn tasks_required(level: u32) -> u32 {
    5 + (level.max(1) - 1) * 2
}

/// Cumulative palette available at a level. Never shrinks as levels rise.
pub fn palette_for_level(level: u32) -> &'static [PlantKind] {
    static PALETTE: [PlantKind; 5] = [
        PlantKind::Potato,
        PlantKind::Berry,
        PlantKind::Sunflower,
        PlantKind::Dandelion,
        PlantKind::Rose,
    ];
    let unlocked = level.clamp(1, MAX_LEVEL) as usize;
    &PALETTE[..unlocked]
}

/// Label for the plant kind newly available at this level.
pub fn unlock_label(level: u32) -> &'static str {
    match level {
        1 => "Potatoes",
        2 => "Bushes",
        3 => "Sunflowers",
        4 => "Dandelions",
        5 => "Roses",
        _ => "New plants",
    }
}
