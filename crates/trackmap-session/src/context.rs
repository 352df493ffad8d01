//! Capabilities a change-tracking context exposes to the resolver.
//!
//! [`TrackingContext`] is the minimum: mapping metadata, a snapshot of the
//! tracked instances of a type, and instance-level detachment. Contexts that
//! can compute a native key and look it up directly also implement
//! [`KeyedLookup`].

use crate::identity_map::ModelRef;
use crate::key::EntityKey;
use std::sync::Arc;
use trackmap_core::{InvalidArgumentError, KeyFieldReader, Model, Result};

/// Snapshot of the tracked instances of one type.
///
/// Taken when requested; later attach/detach calls on the context are not
/// reflected.
#[derive(Debug)]
pub struct TrackedSet<M> {
    items: Vec<ModelRef<M>>,
}

impl<M> TrackedSet<M> {
    /// Wrap a list of tracked references.
    pub fn new(items: Vec<ModelRef<M>>) -> Self {
        Self { items }
    }

    /// Iterate over the tracked instances.
    pub fn iter(&self) -> std::slice::Iter<'_, ModelRef<M>> {
        self.items.iter()
    }

    /// Number of tracked instances.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check whether this exact instance is in the snapshot.
    pub fn contains(&self, instance: &ModelRef<M>) -> bool {
        self.items.iter().any(|item| Arc::ptr_eq(item, instance))
    }

    /// Consume the snapshot.
    pub fn into_vec(self) -> Vec<ModelRef<M>> {
        self.items
    }
}

impl<M> IntoIterator for TrackedSet<M> {
    type Item = ModelRef<M>;
    type IntoIter = std::vec::IntoIter<ModelRef<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, M> IntoIterator for &'a TrackedSet<M> {
    type Item = &'a ModelRef<M>;
    type IntoIter = std::slice::Iter<'a, ModelRef<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A change-tracking context with a local cache of tracked instances.
pub trait TrackingContext {
    /// Metadata provider used to find key fields and read their values.
    type Metadata: KeyFieldReader;

    /// The context's mapping metadata.
    fn metadata(&self) -> &Self::Metadata;

    /// Currently tracked instances of `M`.
    fn local<M: Model + 'static>(&self) -> TrackedSet<M>;

    /// Stop tracking this exact instance.
    ///
    /// Returns `false` when the instance was not tracked. Never touches the
    /// backing store.
    fn detach_instance<M: Model + 'static>(&mut self, instance: &ModelRef<M>) -> bool;
}

/// A context that can look up tracked instances by native key.
pub trait KeyedLookup: TrackingContext {
    /// Compute the key `instance` would be tracked under, from its current
    /// key field values.
    fn create_entity_key<M: Model + 'static>(&self, instance: &M) -> Result<EntityKey> {
        let reader = self.metadata();
        let fields = reader.key_fields::<M>()?;
        let values = reader.field_values(instance, &fields)?;
        EntityKey::new::<M>(fields, values)
    }

    /// Exact lookup of the tracked instance with `key`.
    ///
    /// A key built for another type, or with the wrong number of values for
    /// `M`'s key descriptor, is rejected.
    fn try_get_by_key<M: Model + 'static>(&self, key: &EntityKey) -> Result<Option<ModelRef<M>>>;
}

/// Reject keys that were not built for `M` or do not fit its descriptor.
pub fn validate_key<M: Model + 'static, R: KeyFieldReader>(
    reader: &R,
    key: &EntityKey,
) -> Result<()> {
    if !key.is_for::<M>() {
        return Err(InvalidArgumentError::new(
            "key",
            format!(
                "key for '{}' used to look up '{}'",
                key.table(),
                M::TABLE_NAME
            ),
        )
        .into());
    }
    let fields = reader.key_fields::<M>()?;
    if fields.as_slice() != key.fields() {
        return Err(InvalidArgumentError::new(
            "key",
            format!(
                "key fields {:?} do not match '{}' key {:?}",
                key.fields(),
                M::TABLE_NAME,
                fields
            ),
        )
        .into());
    }
    Ok(())
}
