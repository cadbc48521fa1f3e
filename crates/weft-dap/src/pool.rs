//! Owner-scoped reference pool.
//!
//! Issues opaque integer handles for transient debug objects (frame
//! scopes, variables) and tracks them by owner so a whole scope can
//! be invalidated at once. The id counter is owned by the pool
//! instance, so independent sessions never interfere and ids are
//! never reused within a pool's lifetime.

use std::hash::Hash;

use rustc_hash::FxHashMap;

const FIRST_ID: u64 = 1000;

#[derive(Debug)]
pub struct ObjectPool<O, V> {
    next_id: u64,
    by_id: FxHashMap<u64, (O, V)>,
    by_owner: FxHashMap<O, Vec<u64>>,
}

impl<O: Clone + Eq + Hash, V> ObjectPool<O, V> {
    pub fn new() -> Self {
        Self {
            next_id: FIRST_ID,
            by_id: FxHashMap::default(),
            by_owner: FxHashMap::default(),
        }
    }

    /// Store a value under an owner; the returned id stays valid until
    /// the id or its owner is removed, or the pool is cleared.
    pub fn store(&mut self, owner: O, value: V) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.by_owner.entry(owner.clone()).or_default().push(id);
        self.by_id.insert(id, (owner, value));
        id
    }

    pub fn get(&self, id: u64) -> Option<&V> {
        self.by_id.get(&id).map(|(_, value)| value)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn remove_by_id(&mut self, id: u64) {
        if let Some((owner, _)) = self.by_id.remove(&id) {
            if let Some(ids) = self.by_owner.get_mut(&owner) {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    self.by_owner.remove(&owner);
                }
            }
        }
    }

    /// Remove exactly the entries registered under `owner`.
    pub fn remove_all_owned_by(&mut self, owner: &O) {
        if let Some(ids) = self.by_owner.remove(owner) {
            for id in ids {
                self.by_id.remove(&id);
            }
        }
    }

    /// Invalidate every entry. The id counter keeps increasing, so
    /// ids from before the clear never come back.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_owner.clear();
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl<O: Clone + Eq + Hash, V> Default for ObjectPool<O, V> {
    fn default() -> Self {
        Self::new()
    }
}
