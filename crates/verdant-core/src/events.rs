//! Semantic notifications for the presentation layer.
//!
//! State-changing calls return these as values (via
//! [`Completion::events`](crate::progress::Completion::events)); nothing is
//! broadcast ambiently. The presentation layer decides when to re-render.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::{Plant, ProgressView};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Any change to the user's progress state.
    ProgressChanged {
        view: ProgressView,
        at: DateTime<Utc>,
    },
    /// A completion grew a plant without filling the garden.
    PlantAdded { plant: Plant, at: DateTime<Utc> },
    /// A completion filled the garden and advanced the level.
    LeveledUp { level: u32, at: DateTime<Utc> },
}
