//! Identity Map pattern for tracking unique object instances per primary key.
//!
//! The Identity Map ensures that each logical record corresponds to exactly
//! one in-memory instance within a session:
//!
//! - **Uniqueness**: Same key always returns the same object reference
//! - **Consistency**: Changes to an object are visible everywhere it's used
//! - **Eviction**: Removing an entry stops tracking without touching the
//!   instance, which stays valid for anyone still holding a reference
//!
//! # Design
//!
//! Entries store `Arc<RwLock<M>>` behind `Box<dyn Any>` so heterogeneous
//! model types share one map. Entries are grouped per type, then by the
//! `EntityKey` hash; each bucket verifies full key equality, so hash
//! collisions never conflate records.
//!
//! # Example
//!
//! ```ignore
//! let mut map = IdentityMap::new();
//!
//! let invoice_ref = map.insert(key.clone(), invoice);
//! let again = map.get::<Invoice>(&key).unwrap();
//!
//! // Both references point to the same object
//! assert!(Arc::ptr_eq(&invoice_ref, &again));
//! ```

use crate::key::EntityKey;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use trackmap_core::Model;

/// A reference to an object in the identity map.
pub type ModelRef<M> = Arc<RwLock<M>>;

/// A guard for reading an object from the identity map.
pub type ModelReadGuard<'a, M> = std::sync::RwLockReadGuard<'a, M>;

/// A guard for writing to an object in the identity map.
pub type ModelWriteGuard<'a, M> = std::sync::RwLockWriteGuard<'a, M>;

/// A type-erased entry in the identity map.
struct IdentityEntry {
    /// Actually stores `Arc<RwLock<M>>` for some M.
    arc: Box<dyn Any + Send + Sync>,
    /// Key the entry was tracked under.
    key: EntityKey,
    /// Insertion sequence, for stable enumeration order.
    seq: u64,
}

impl IdentityEntry {
    fn downcast<M: Model + 'static>(&self) -> Option<&ModelRef<M>> {
        self.arc.downcast_ref::<ModelRef<M>>()
    }
}

/// Entries of a single model type, bucketed by key hash.
#[derive(Default)]
struct TypeEntries {
    buckets: HashMap<u64, Vec<IdentityEntry>>,
    len: usize,
}

/// Identity Map for tracking unique object instances.
#[derive(Default)]
pub struct IdentityMap {
    types: HashMap<TypeId, TypeEntries>,
    next_seq: u64,
}

impl IdentityMap {
    /// Create a new empty identity map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Insert a model under `key`.
    ///
    /// If an object with the same key already exists, returns the existing
    /// reference and drops `model`.
    pub fn insert<M: Model + 'static>(&mut self, key: EntityKey, model: M) -> ModelRef<M> {
        if let Some(existing) = self.get::<M>(&key) {
            return existing;
        }

        let arc: ModelRef<M> = Arc::new(RwLock::new(model));
        let seq = self.next_seq;
        self.next_seq += 1;

        let entries = self.types.entry(TypeId::of::<M>()).or_default();
        entries
            .buckets
            .entry(key.pk_hash())
            .or_default()
            .push(IdentityEntry {
                arc: Box::new(Arc::clone(&arc)),
                key,
                seq,
            });
        entries.len += 1;

        arc
    }

    /// Get an object by its exact key.
    pub fn get<M: Model + 'static>(&self, key: &EntityKey) -> Option<ModelRef<M>> {
        let bucket = self.types.get(&TypeId::of::<M>())?.buckets.get(&key.pk_hash())?;
        bucket
            .iter()
            .find(|entry| entry.key == *key)
            .and_then(|entry| entry.downcast::<M>())
            .map(Arc::clone)
    }

    /// Check if an object with the given key exists in the map.
    pub fn contains_key(&self, key: &EntityKey) -> bool {
        self.types
            .get(&key.type_id())
            .and_then(|entries| entries.buckets.get(&key.pk_hash()))
            .is_some_and(|bucket| bucket.iter().any(|entry| entry.key == *key))
    }

    /// Check if this exact instance is tracked.
    pub fn contains_instance<M: Model + 'static>(&self, instance: &ModelRef<M>) -> bool {
        self.find_instance(instance).is_some()
    }

    /// All tracked instances of `M`, in insertion order.
    pub fn local<M: Model + 'static>(&self) -> Vec<ModelRef<M>> {
        let Some(entries) = self.types.get(&TypeId::of::<M>()) else {
            return Vec::new();
        };
        let mut found: Vec<(u64, ModelRef<M>)> = entries
            .buckets
            .values()
            .flatten()
            .filter_map(|entry| entry.downcast::<M>().map(|arc| (entry.seq, Arc::clone(arc))))
            .collect();
        found.sort_by_key(|(seq, _)| *seq);
        found.into_iter().map(|(_, arc)| arc).collect()
    }

    /// Key the instance is tracked under.
    pub fn key_of<M: Model + 'static>(&self, instance: &ModelRef<M>) -> Option<&EntityKey> {
        let (hash, idx) = self.find_instance(instance)?;
        let entries = self.types.get(&TypeId::of::<M>())?;
        entries.buckets.get(&hash)?.get(idx).map(|entry| &entry.key)
    }

    /// Remove an object by key.
    ///
    /// # Returns
    ///
    /// `true` if the object was removed, `false` if it wasn't in the map.
    pub fn remove(&mut self, key: &EntityKey) -> bool {
        let Some(entries) = self.types.get_mut(&key.type_id()) else {
            return false;
        };
        let Some(bucket) = entries.buckets.get_mut(&key.pk_hash()) else {
            return false;
        };
        let Some(idx) = bucket.iter().position(|entry| entry.key == *key) else {
            return false;
        };
        bucket.swap_remove(idx);
        if bucket.is_empty() {
            entries.buckets.remove(&key.pk_hash());
        }
        entries.len -= 1;
        true
    }

    /// Remove this exact instance, located by pointer identity.
    ///
    /// Works even if the instance's key fields changed after insertion.
    pub fn remove_instance<M: Model + 'static>(&mut self, instance: &ModelRef<M>) -> bool {
        let Some((hash, idx)) = self.find_instance(instance) else {
            return false;
        };
        let Some(entries) = self.types.get_mut(&TypeId::of::<M>()) else {
            return false;
        };
        if let Some(bucket) = entries.buckets.get_mut(&hash) {
            bucket.swap_remove(idx);
            if bucket.is_empty() {
                entries.buckets.remove(&hash);
            }
            entries.len -= 1;
            return true;
        }
        false
    }

    fn find_instance<M: Model + 'static>(&self, instance: &ModelRef<M>) -> Option<(u64, usize)> {
        let entries = self.types.get(&TypeId::of::<M>())?;
        entries.buckets.iter().find_map(|(hash, bucket)| {
            bucket
                .iter()
                .position(|entry| {
                    entry
                        .downcast::<M>()
                        .is_some_and(|arc| Arc::ptr_eq(arc, instance))
                })
                .map(|idx| (*hash, idx))
        })
    }

    /// Clear all entries from the identity map.
    pub fn clear(&mut self) {
        self.types.clear();
    }

    /// Get the number of entries in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.values().map(|entries| entries.len).sum()
    }

    /// Get the number of tracked instances of `M`.
    #[must_use]
    pub fn len_of<M: Model + 'static>(&self) -> usize {
        self.types
            .get(&TypeId::of::<M>())
            .map_or(0, |entries| entries.len)
    }

    /// Check if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityMap")
            .field("types", &self.types.len())
            .field("entries", &self.len())
            .finish()
    }
}
