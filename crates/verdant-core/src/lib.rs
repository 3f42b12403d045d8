//! # Verdant Core Library
//!
//! This library provides the core business logic for Verdant, a home-energy
//! "nudge" app: it derives energy-saving tasks from smart-home device state,
//! acts on them through interchangeable providers, and rewards completions
//! with a per-user garden that levels up. All operations are available via
//! the standalone CLI binary; any richer front end is a thin layer over the
//! same core.
//!
//! ## Architecture
//!
//! - **Progress Engine**: Per-user leveling state machine. Every completion
//!   is an atomic read-modify-write against a keyed store, serialized per
//!   user.
//! - **Task Deriver**: Pure mapping from a device snapshot to actionable
//!   tasks.
//! - **Providers**: One capability trait over mock, Home Assistant, and Nest
//!   backends, selected once at startup from configuration.
//! - **Accounts**: Username/password identities and bearer sessions backing
//!   the engine's opaque user ids.
//! - **Storage**: SQLite persistence and TOML configuration.
//!
//! ## Key Components
//!
//! - [`ProgressEngine`]: The leveling/garden state machine
//! - [`DeviceProvider`]: Trait for smart-home backends
//! - [`Database`]: Accounts, sessions, and progress persistence
//! - [`Config`]: Application configuration management

pub mod accounts;
pub mod error;
pub mod events;
pub mod progress;
pub mod providers;
pub mod storage;
pub mod tasks;

pub use accounts::{Accounts, Session};
pub use error::{AuthError, ConfigError, CoreError, DatabaseError, OAuthError, ProviderError};
pub use events::Event;
pub use progress::{
    Completion, MemoryStore, Plant, PlantKind, ProgressEngine, ProgressState, ProgressStore,
    ProgressView, UserId,
};
pub use providers::{DeviceProvider, DeviceSnapshot, FanSpeed, Light, Thermostat};
pub use storage::{Config, Database};
pub use tasks::{derive_tasks, Task, TaskRules};
