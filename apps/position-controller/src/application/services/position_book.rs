//! Position Book
//!
//! The table of tracked positions plus the set of keys with a signal in
//! flight. Both live behind one mutex. The lock is never held across a
//! network call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::position::{Position, PositionView};
use crate::domain::shared::PositionKey;

#[derive(Debug, Default)]
struct BookState {
    positions: HashMap<PositionKey, Position>,
    in_flight: HashSet<PositionKey>,
}

/// Shared table of open positions.
#[derive(Debug, Default)]
pub struct PositionBook {
    state: Mutex<BookState>,
}

impl PositionBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for one signal. `None` while another signal holds it.
    ///
    /// The claim is released when the returned guard drops.
    pub fn try_reserve(self: &Arc<Self>, key: &PositionKey) -> Option<Reservation> {
        let inserted = self.state.lock().in_flight.insert(key.clone());
        inserted.then(|| Reservation {
            book: Arc::clone(self),
            key: key.clone(),
        })
    }

    /// Whether a signal currently holds `key`.
    pub fn is_reserved(&self, key: &PositionKey) -> bool {
        self.state.lock().in_flight.contains(key)
    }

    /// Copy of the record under `key`.
    pub fn get(&self, key: &PositionKey) -> Option<Position> {
        self.state.lock().positions.get(key).cloned()
    }

    /// Insert `position`, replacing any older record of the same key.
    ///
    /// Returns the replaced record. Its monitor notices the new generation and
    /// exits.
    pub fn publish(&self, position: Position) -> Option<Position> {
        let key = position.key().clone();
        self.state.lock().positions.insert(key, position)
    }

    /// Apply `f` to the record under `key` if it still has `generation`.
    ///
    /// Returns `false` when the record is gone or was replaced.
    pub fn update<F>(&self, key: &PositionKey, generation: Uuid, f: F) -> bool
    where
        F: FnOnce(&mut Position),
    {
        let mut state = self.state.lock();
        match state.positions.get_mut(key) {
            Some(position) if position.generation() == generation => {
                f(position);
                true
            }
            _ => false,
        }
    }

    /// Remove the record under `key` if it still has `generation`.
    pub fn remove_generation(&self, key: &PositionKey, generation: Uuid) -> Option<Position> {
        let mut state = self.state.lock();
        let matches = state
            .positions
            .get(key)
            .is_some_and(|p| p.generation() == generation);
        if matches {
            state.positions.remove(key)
        } else {
            None
        }
    }

    /// Remove whatever record is under `key`.
    pub fn remove(&self, key: &PositionKey) -> Option<Position> {
        self.state.lock().positions.remove(key)
    }

    /// Number of tracked positions.
    pub fn len(&self) -> usize {
        self.state.lock().positions.len()
    }

    /// Whether no position is tracked.
    pub fn is_empty(&self) -> bool {
        self.state.lock().positions.is_empty()
    }

    /// Views of every tracked position, ordered by key.
    pub fn snapshot(&self) -> Vec<PositionView> {
        let mut views: Vec<(PositionKey, PositionView)> = self
            .state
            .lock()
            .positions
            .iter()
            .map(|(key, position)| (key.clone(), position.view()))
            .collect();
        views.sort_by(|a, b| a.0.cmp(&b.0));
        views.into_iter().map(|(_, view)| view).collect()
    }

    fn release(&self, key: &PositionKey) {
        self.state.lock().in_flight.remove(key);
    }
}

/// Claim on a position key held while one signal is processed.
#[derive(Debug)]
pub struct Reservation {
    book: Arc<PositionBook>,
    key: PositionKey,
}

impl Reservation {
    /// Reserved key.
    #[must_use]
    pub const fn key(&self) -> &PositionKey {
        &self.key
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.book.release(&self.key);
    }
}
