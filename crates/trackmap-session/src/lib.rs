//! Identity-map resolution and detachment for trackmap.
//!
//! `trackmap-session` is the **change-tracking layer**. It keeps one in-memory
//! instance per primary key and lets callers find or detach a tracked
//! instance given any other instance carrying the same key.
//!
//! # Role In The Architecture
//!
//! - **Identity map**: ensures a single in-memory instance per primary key.
//! - **Context capabilities**: [`TrackingContext`] and [`KeyedLookup`] describe
//!   what the resolver needs from a context, so it works against any context,
//!   not just [`Session`].
//! - **Resolution**: [`find_in_local_cache`] scans, [`resolve_tracked_by_key`]
//!   looks up by native key.
//! - **Detachment**: stop tracking without touching the backing store.
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::new();
//! session.register::<Invoice>()?;
//!
//! let tracked = session.attach(Invoice { id: 2, total_cents: 1500 })?;
//!
//! // A template with the same key resolves to the tracked instance
//! let found = session.resolve_tracked(&Invoice { id: 2, total_cents: 0 })?;
//! assert!(Arc::ptr_eq(&tracked, &found.unwrap()));
//!
//! // Stop tracking it; `tracked` is still usable as a plain value
//! session.detach_if_tracked(&Invoice { id: 2, total_cents: 0 })?;
//! ```

pub mod context;
pub mod detach;
pub mod identity_map;
pub mod key;
pub mod resolver;

pub use context::{KeyedLookup, TrackedSet, TrackingContext, validate_key};
pub use detach::{
    DetachExt, detach, detach_all_if_tracked, detach_all_local_if_tracked, detach_if_tracked,
    detach_local_if_tracked,
};
pub use identity_map::{IdentityMap, ModelReadGuard, ModelRef, ModelWriteGuard};
pub use key::EntityKey;
pub use resolver::{
    FieldEquals, KeyPredicate, build_equality_predicate, find_in_local_cache, find_matching,
    resolve_key_fields, resolve_tracked_by_key,
};

use trackmap_core::{
    EntityMapping, KeyFieldReader, MappingRegistry, MetadataError, Model, ModelMetadata, Result,
    Value,
};

// ============================================================================
// Session Configuration
// ============================================================================

/// Configuration for Session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whether every model type must be registered before use.
    pub strict_mappings: bool,
    /// Whether key values are checked against the declared column type.
    pub check_key_types: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strict_mappings: false,
            check_key_types: true,
        }
    }
}

impl SessionConfig {
    /// Require explicit registration of every model type.
    #[must_use]
    pub fn strict_mappings(mut self, value: bool) -> Self {
        self.strict_mappings = value;
        self
    }

    /// Enable or disable key value type checks.
    #[must_use]
    pub fn check_key_types(mut self, value: bool) -> Self {
        self.check_key_types = value;
        self
    }
}

// ============================================================================
// Session Metadata
// ============================================================================

/// Metadata as seen by a session: registered mappings first, then (unless
/// strict) whatever the model declares.
#[derive(Debug)]
pub struct SessionMetadata {
    registry: MappingRegistry,
    fallback: ModelMetadata,
    strict: bool,
}

impl SessionMetadata {
    fn from_config(config: &SessionConfig) -> Self {
        let fallback = if config.check_key_types {
            ModelMetadata::new()
        } else {
            ModelMetadata::without_type_checks()
        };
        Self {
            registry: MappingRegistry::new().with_type_checks(config.check_key_types),
            fallback,
            strict: config.strict_mappings,
        }
    }

    /// The explicit mappings.
    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    fn ensure_usable<M: Model + 'static>(&self) -> Result<()> {
        if self.strict && !self.registry.is_mapped::<M>() {
            return Err(MetadataError::unmapped(std::any::type_name::<M>()).into());
        }
        Ok(())
    }
}

impl KeyFieldReader for SessionMetadata {
    fn key_fields<M: Model + 'static>(&self) -> Result<Vec<&'static str>> {
        if self.registry.is_mapped::<M>() {
            return self.registry.key_fields::<M>();
        }
        self.ensure_usable::<M>()?;
        self.fallback.key_fields::<M>()
    }

    fn field_value<M: Model + 'static>(&self, instance: &M, field: &str) -> Result<Value> {
        if self.registry.is_mapped::<M>() {
            return self.registry.field_value(instance, field);
        }
        self.ensure_usable::<M>()?;
        self.fallback.field_value(instance, field)
    }

    fn field_values<M: Model + 'static>(&self, instance: &M, fields: &[&str]) -> Result<Vec<Value>> {
        if self.registry.is_mapped::<M>() {
            return self.registry.field_values(instance, fields);
        }
        self.ensure_usable::<M>()?;
        self.fallback.field_values(instance, fields)
    }
}

// ============================================================================
// Session
// ============================================================================

/// In-memory change-tracking context.
///
/// Holds the identity map of loaded records. Attaching a record whose key is
/// already tracked returns the tracked instance, so every key maps to exactly
/// one `ModelRef` for the life of the session or until it is detached.
///
/// Mappings should be registered before records of that type are attached;
/// tracked entries keep the key they were attached under.
#[derive(Debug)]
pub struct Session {
    identity_map: IdentityMap,
    metadata: SessionMetadata,
    config: SessionConfig,
}

impl Session {
    /// Create a session with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a session with custom configuration.
    #[must_use]
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            identity_map: IdentityMap::new(),
            metadata: SessionMetadata::from_config(&config),
            config,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register `M` using its declared key fields.
    pub fn register<M: Model + 'static>(&mut self) -> Result<&EntityMapping> {
        self.metadata.registry.register::<M>()
    }

    /// Register `M` with an explicit key descriptor.
    pub fn register_keys<M: Model + 'static>(
        &mut self,
        keys: &[&'static str],
    ) -> Result<&EntityMapping> {
        self.metadata.registry.register_keys::<M>(keys)
    }

    // ========================================================================
    // Tracking
    // ========================================================================

    /// Track a loaded record.
    ///
    /// If a record with the same key is already tracked, the tracked instance
    /// is returned and `model` is dropped.
    #[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME))]
    pub fn attach<M: Model + 'static>(&mut self, model: M) -> Result<ModelRef<M>> {
        let key = self.create_entity_key(&model)?;
        let already_tracked = self.identity_map.contains_key(&key);
        tracing::debug!(pk = ?key.values(), already_tracked, "Attach");
        Ok(self.identity_map.insert(key, model))
    }

    /// Track several loaded records, in order.
    pub fn attach_all<M, I>(&mut self, models: I) -> Result<Vec<ModelRef<M>>>
    where
        M: Model + 'static,
        I: IntoIterator<Item = M>,
    {
        models.into_iter().map(|m| self.attach(m)).collect()
    }

    /// Check whether a record with `obj`'s current key is tracked.
    pub fn contains<M: Model + 'static>(&self, obj: &M) -> Result<bool> {
        let key = self.create_entity_key(obj)?;
        Ok(self.identity_map.contains_key(&key))
    }

    /// Get the tracked instance with the given key values.
    pub fn find<M: Model + 'static>(&self, pk: &[Value]) -> Result<Option<ModelRef<M>>> {
        let fields = self.metadata.key_fields::<M>()?;
        let key = EntityKey::new::<M>(fields, pk.to_vec())?;
        Ok(self.identity_map.get(&key))
    }

    /// Stop tracking this exact instance.
    pub fn expunge<M: Model + 'static>(&mut self, obj: &ModelRef<M>) -> bool {
        self.identity_map.remove_instance(obj)
    }

    /// Stop tracking everything.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn expunge_all(&mut self) {
        let count = self.identity_map.len();
        self.identity_map.clear();
        tracing::debug!(count, "Expunged all session objects");
    }

    /// Number of tracked instances across all types.
    pub fn tracked_count(&self) -> usize {
        self.identity_map.len()
    }

    /// Number of tracked instances of `M`.
    pub fn tracked_count_of<M: Model + 'static>(&self) -> usize {
        self.identity_map.len_of::<M>()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingContext for Session {
    type Metadata = SessionMetadata;

    fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    fn local<M: Model + 'static>(&self) -> TrackedSet<M> {
        TrackedSet::new(self.identity_map.local())
    }

    fn detach_instance<M: Model + 'static>(&mut self, instance: &ModelRef<M>) -> bool {
        self.identity_map.remove_instance(instance)
    }
}

impl KeyedLookup for Session {
    fn try_get_by_key<M: Model + 'static>(&self, key: &EntityKey) -> Result<Option<ModelRef<M>>> {
        validate_key::<M, _>(&self.metadata, key)?;
        Ok(self.identity_map.get(key))
    }
}
