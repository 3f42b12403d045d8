//! Keyed persistence contract for progress state.
//!
//! The engine is generic over the store so the same transition logic runs
//! against SQLite in the app and an in-memory map in tests (or in a
//! single-user local deployment).

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::DatabaseError;

use super::{ProgressState, UserId};

/// Durable keyed store for per-user progress.
///
/// `save` must be atomic: either the whole state (counters and garden)
/// lands, or none of it does.
pub trait ProgressStore: Send + Sync {
    /// Whether the identity is known to the account layer.
    fn user_exists(&self, user: UserId) -> Result<bool, DatabaseError>;

    /// Load stored state. `None` means a valid user with no state yet.
    fn load(&self, user: UserId) -> Result<Option<ProgressState>, DatabaseError>;

    /// Persist the full state for the user, replacing whatever was there.
    fn save(&self, user: UserId, state: &ProgressState) -> Result<(), DatabaseError>;
}

impl<S: ProgressStore + ?Sized> ProgressStore for std::sync::Arc<S> {
    fn user_exists(&self, user: UserId) -> Result<bool, DatabaseError> {
        (**self).user_exists(user)
    }

    fn load(&self, user: UserId) -> Result<Option<ProgressState>, DatabaseError> {
        (**self).load(user)
    }

    fn save(&self, user: UserId, state: &ProgressState) -> Result<(), DatabaseError> {
        (**self).save(user, state)
    }
}

/// In-memory store. Backs tests and the degenerate single-user local
/// deployment, where identity collapses to one registered id.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashSet<UserId>>,
    states: RwLock<HashMap<UserId, ProgressState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an identity known to the store.
    pub fn register(&self, user: UserId) {
        self.users.write().expect("lock poisoned").insert(user);
    }
}

impl ProgressStore for MemoryStore {
    fn user_exists(&self, user: UserId) -> Result<bool, DatabaseError> {
        Ok(self.users.read().expect("lock poisoned").contains(&user))
    }

    fn load(&self, user: UserId) -> Result<Option<ProgressState>, DatabaseError> {
        Ok(self.states.read().expect("lock poisoned").get(&user).cloned())
    }

    fn save(&self, user: UserId, state: &ProgressState) -> Result<(), DatabaseError> {
        self.states
            .write()
            .expect("lock poisoned")
            .insert(user, state.clone());
        Ok(())
    }
}
