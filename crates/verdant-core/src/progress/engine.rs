//! Progress engine: the read-modify-write loop around [`ProgressState`].
//!
//! Every completion is one logical unit per user: load (or default), grow a
//! plant, bump counters, maybe level up, persist. A per-user lock registry
//! serializes concurrent completions for the same user; different users
//! never wait on each other beyond the store's own critical sections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::events::Event;

use super::store::ProgressStore;
use super::{
    palette_for_level, tasks_required, Plant, ProgressState, ProgressView, UserId, MAX_LEVEL,
    X_RANGE, Y_RANGE,
};

/// Outcome of recording a task completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub leveled_up: bool,
    pub state: ProgressView,
}

impl Completion {
    /// Semantic notifications for the presentation layer, derived from the
    /// outcome instead of broadcast on a bus.
    pub fn events(&self) -> Vec<Event> {
        let at = Utc::now();
        let mut events = vec![Event::ProgressChanged {
            view: self.state.clone(),
            at,
        }];
        if self.leveled_up {
            events.push(Event::LeveledUp {
                level: self.state.level,
                at,
            });
        } else if let Some(plant) = self.state.plants.last() {
            events.push(Event::PlantAdded { plant: *plant, at });
        }
        events
    }
}

/// Per-user progress state machine over a keyed store.
pub struct ProgressEngine<S> {
    store: S,
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    rng: Mutex<Mcg128Xsl64>,
}

impl<S: ProgressStore> ProgressEngine<S> {
    /// Create an engine with an entropy-seeded RNG.
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            rng: Mutex::new(Mcg128Xsl64::from_entropy()),
        }
    }

    /// Create an engine with a fixed seed, for reproducible plant draws.
    pub fn with_seed(store: S, seed: u64) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            rng: Mutex::new(Mcg128Xsl64::seed_from_u64(seed)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current state for the user, lazily created and persisted with
    /// defaults on first access.
    pub fn state(&self, user: UserId) -> Result<ProgressState> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().expect("lock poisoned");

        self.ensure_known(user)?;
        match self.store.load(user)? {
            Some(state) => Ok(state),
            None => {
                let state = ProgressState::default();
                self.store.save(user, &state)?;
                Ok(state)
            }
        }
    }

    /// [`state`](Self::state) plus the derived fields.
    pub fn view(&self, user: UserId) -> Result<ProgressView> {
        Ok(self.state(user)?.view())
    }

    /// Record one completed task: grow a plant, bump counters, level up
    /// when the garden fills. Persisted atomically before returning.
    pub fn record_completion(&self, user: UserId) -> Result<Completion> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().expect("lock poisoned");

        self.ensure_known(user)?;
        let mut state = self.store.load(user)?.unwrap_or_default();

        let plant = self.grow_plant(state.level);
        state.plants.push(plant);
        state.completed_in_level += 1;
        state.total_completed += 1;

        // The level-up check runs after the triggering plant is appended, so
        // the caller can show it for one frame; the persisted state after a
        // level-up starts with an empty garden.
        let mut leveled_up = false;
        if state.completed_in_level >= tasks_required(state.level) && state.level < MAX_LEVEL {
            state.level += 1;
            state.completed_in_level = 0;
            state.plants.clear();
            leveled_up = true;
        }

        self.store.save(user, &state)?;
        Ok(Completion {
            leveled_up,
            state: state.view(),
        })
    }

    /// Force the user back to defaults. Idempotent.
    pub fn reset(&self, user: UserId) -> Result<ProgressState> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().expect("lock poisoned");

        self.ensure_known(user)?;
        let state = ProgressState::default();
        self.store.save(user, &state)?;
        Ok(state)
    }

    fn ensure_known(&self, user: UserId) -> Result<()> {
        if self.store.user_exists(user)? {
            Ok(())
        } else {
            Err(AuthError::UnknownUser(user).into())
        }
    }

    fn grow_plant(&self, level: u32) -> Plant {
        let palette = palette_for_level(level);
        let mut rng = self.rng.lock().expect("lock poisoned");
        let kind = palette[rng.gen_range(0..palette.len())];
        Plant {
            kind,
            x: rng.gen_range(X_RANGE),
            y: rng.gen_range(Y_RANGE),
        }
    }

    fn user_lock(&self, user: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock poisoned");
        locks.entry(user).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::progress::store::MemoryStore;
    use crate::progress::PlantKind;

    const USER: UserId = 1;

    fn engine() -> ProgressEngine<MemoryStore> {
        let store = MemoryStore::new();
        store.register(USER);
        ProgressEngine::with_seed(store, 42)
    }

    fn complete_n(engine: &ProgressEngine<MemoryStore>, n: u32) -> Completion {
        let mut last = None;
        for _ in 0..n {
            last = Some(engine.record_completion(USER).unwrap());
        }
        last.expect("n must be > 0")
    }

    #[test]
    fn first_access_creates_defaults() {
        let engine = engine();
        let state = engine.state(USER).unwrap();
        assert_eq!(state, ProgressState::default());
        // Lazy creation persisted the defaults.
        assert!(engine.store().load(USER).unwrap().is_some());
    }

    #[test]
    fn completion_adds_one_plant() {
        let engine = engine();
        let outcome = engine.record_completion(USER).unwrap();
        assert!(!outcome.leveled_up);
        assert_eq!(outcome.state.completed_in_level, 1);
        assert_eq!(outcome.state.total_completed, 1);
        assert_eq!(outcome.state.plants.len(), 1);
    }

    #[test]
    fn fifth_completion_levels_up_with_empty_garden() {
        let engine = engine();
        let fourth = complete_n(&engine, 4);
        assert!(!fourth.leveled_up);
        assert_eq!(fourth.state.plants.len(), 4);

        let fifth = engine.record_completion(USER).unwrap();
        assert!(fifth.leveled_up);
        assert_eq!(fifth.state.level, 2);
        assert_eq!(fifth.state.completed_in_level, 0);
        assert_eq!(fifth.state.total_completed, 5);
        assert!(fifth.state.plants.is_empty(), "triggering plant is not retained");
        assert_eq!(fifth.state.required, 7);
        assert_eq!(fifth.state.unlock, "Bushes");
    }

    #[test]
    fn plants_always_match_completed_count() {
        let engine = engine();
        for _ in 0..40 {
            let outcome = engine.record_completion(USER).unwrap();
            assert_eq!(
                outcome.state.plants.len() as u32,
                outcome.state.completed_in_level
            );
        }
    }

    #[test]
    fn counters_are_monotonic() {
        let engine = engine();
        let mut last_total = 0;
        let mut last_level = 1;
        for _ in 0..50 {
            let outcome = engine.record_completion(USER).unwrap();
            assert!(outcome.state.total_completed > last_total);
            assert!(outcome.state.level >= last_level);
            assert!(outcome.state.level <= MAX_LEVEL);
            last_total = outcome.state.total_completed;
            last_level = outcome.state.level;
        }
    }

    #[test]
    fn level_one_grows_only_potatoes() {
        let engine = engine();
        for _ in 0..4 {
            let outcome = engine.record_completion(USER).unwrap();
            assert!(outcome
                .state
                .plants
                .iter()
                .all(|p| p.kind == PlantKind::Potato));
        }
    }

    #[test]
    fn plants_stay_within_cumulative_palette() {
        let engine = engine();
        for _ in 0..60 {
            let outcome = engine.record_completion(USER).unwrap();
            let palette = palette_for_level(outcome.state.level);
            for plant in &outcome.state.plants {
                assert!(
                    palette.contains(&plant.kind),
                    "{:?} outside palette at level {}",
                    plant.kind,
                    outcome.state.level
                );
            }
        }
    }

    #[test]
    fn positions_respect_plot_margins() {
        let engine = engine();
        for _ in 0..60 {
            let outcome = engine.record_completion(USER).unwrap();
            for plant in &outcome.state.plants {
                assert!(X_RANGE.contains(&plant.x), "x = {}", plant.x);
                assert!(Y_RANGE.contains(&plant.y), "y = {}", plant.y);
            }
        }
    }

    #[test]
    fn cap_keeps_accumulating() {
        let engine = engine();
        // 5 + 7 + 9 + 11 completions drive the user to level 5, garden empty.
        let at_cap = complete_n(&engine, 32);
        assert_eq!(at_cap.state.level, MAX_LEVEL);
        assert_eq!(at_cap.state.completed_in_level, 0);

        // Crossing required(5) = 13 at the cap never levels up or clears.
        for i in 1..=20 {
            let outcome = engine.record_completion(USER).unwrap();
            assert!(!outcome.leveled_up);
            assert_eq!(outcome.state.level, MAX_LEVEL);
            assert_eq!(outcome.state.completed_in_level, i);
            assert_eq!(outcome.state.plants.len() as u32, i);
        }
        let state = engine.state(USER).unwrap();
        assert_eq!(state.total_completed, 52);
    }

    #[test]
    fn reset_is_idempotent() {
        let engine = engine();
        complete_n(&engine, 9);

        let once = engine.reset(USER).unwrap();
        let twice = engine.reset(USER).unwrap();
        assert_eq!(once, ProgressState::default());
        assert_eq!(once, twice);
        assert_eq!(engine.state(USER).unwrap(), ProgressState::default());
    }

    #[test]
    fn unknown_user_is_rejected_without_mutation() {
        let engine = engine();
        let err = engine.record_completion(99).unwrap_err();
        assert!(matches!(err, CoreError::Auth(AuthError::UnknownUser(99))));
        assert!(engine.store().load(99).unwrap().is_none());

        let err = engine.state(99).unwrap_err();
        assert!(matches!(err, CoreError::Auth(AuthError::UnknownUser(99))));
    }

    #[test]
    fn same_seed_grows_same_garden() {
        let a = engine();
        let b = engine();
        for _ in 0..4 {
            let pa = a.record_completion(USER).unwrap();
            let pb = b.record_completion(USER).unwrap();
            assert_eq!(pa.state.plants, pb.state.plants);
        }
    }

    #[test]
    fn users_progress_independently() {
        let store = MemoryStore::new();
        store.register(1);
        store.register(2);
        let engine = ProgressEngine::with_seed(store, 7);

        for _ in 0..5 {
            engine.record_completion(1).unwrap();
        }
        engine.record_completion(2).unwrap();

        assert_eq!(engine.state(1).unwrap().level, 2);
        let two = engine.state(2).unwrap();
        assert_eq!(two.level, 1);
        assert_eq!(two.total_completed, 1);
    }

    #[test]
    fn concurrent_completions_lose_nothing() {
        let store = MemoryStore::new();
        store.register(USER);
        let engine = Arc::new(ProgressEngine::with_seed(store, 42));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        engine.record_completion(USER).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        // 40 completions: 32 consumed reaching level 5, 8 left in the garden.
        let state = engine.state(USER).unwrap();
        assert_eq!(state.total_completed, 40);
        assert_eq!(state.level, MAX_LEVEL);
        assert_eq!(state.completed_in_level, 8);
        assert_eq!(state.plants.len(), 8);
    }

    #[test]
    fn end_to_end_over_sqlite() {
        use crate::storage::Database;

        let db = Arc::new(Database::open_memory().unwrap());
        let user = db.create_user("ada", "hash").unwrap();
        let engine = ProgressEngine::with_seed(Arc::clone(&db), 42);

        for _ in 0..4 {
            assert!(!engine.record_completion(user).unwrap().leveled_up);
        }
        let fifth = engine.record_completion(user).unwrap();
        assert!(fifth.leveled_up);
        assert_eq!(fifth.state.level, 2);
        assert_eq!(fifth.state.total_completed, 5);
        assert!(fifth.state.plants.is_empty());

        // The transition survived the store, not just the engine.
        let persisted = db.load(user).unwrap().unwrap();
        assert_eq!(persisted.level, 2);
        assert_eq!(persisted.completed_in_level, 0);
        assert!(persisted.plants.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn invariants_hold_after_any_run(n in 0u32..120) {
                let store = MemoryStore::new();
                store.register(USER);
                let engine = ProgressEngine::with_seed(store, 1);

                for _ in 0..n {
                    engine.record_completion(USER).unwrap();
                }
                let state = engine.state(USER).unwrap();

                prop_assert_eq!(state.plants.len() as u32, state.completed_in_level);
                prop_assert_eq!(state.total_completed, u64::from(n));
                prop_assert!(state.level >= 1 && state.level <= MAX_LEVEL);
                if state.level < MAX_LEVEL {
                    prop_assert!(state.completed_in_level < tasks_required(state.level));
                }
            }
        }
    }
}
