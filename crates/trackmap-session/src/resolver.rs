//! Key-based identity resolution.
//!
//! Given a template instance, find the tracked instance that shares its
//! primary key. Two strategies:
//!
//! - **Native key** ([`resolve_tracked_by_key`]): the context computes an
//!   [`EntityKey`](crate::EntityKey) and performs an exact lookup. This is the
//!   canonical path.
//! - **Scanning** ([`find_in_local_cache`]): build a [`KeyPredicate`] from the
//!   template's key values and test every tracked instance. Works on any
//!   [`TrackingContext`].
//!
//! Both strategies read the template's *current* key values on every call;
//! nothing is cached between calls.

use crate::context::{KeyedLookup, TrackingContext};
use crate::identity_map::ModelRef;
use std::marker::PhantomData;
use std::sync::TryLockError;
use trackmap_core::{Error, KeyFieldReader, MetadataError, Model, Result, Value};

/// Resolve the ordered key field names of `M`.
pub fn resolve_key_fields<M: Model + 'static, R: KeyFieldReader>(
    reader: &R,
) -> Result<Vec<&'static str>> {
    let fields = reader.key_fields::<M>()?;
    if fields.is_empty() {
        return Err(MetadataError::no_key(std::any::type_name::<M>()).into());
    }
    Ok(fields)
}

/// One `field = value` test.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEquals {
    pub field: &'static str,
    pub value: Value,
}

/// Conjunction of field equality tests over the key fields of `M`.
///
/// Tests are evaluated in key-descriptor order and stop at the first
/// mismatch.
#[derive(Debug, Clone)]
pub struct KeyPredicate<M> {
    tests: Vec<FieldEquals>,
    _marker: PhantomData<fn(&M)>,
}

impl<M: Model + 'static> KeyPredicate<M> {
    /// Evaluate against a candidate.
    pub fn matches<R: KeyFieldReader>(&self, reader: &R, candidate: &M) -> Result<bool> {
        for test in &self.tests {
            if reader.field_value(candidate, test.field)? != test.value {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Evaluate against a tracked reference.
    ///
    /// A candidate currently locked for writing is an error rather than a
    /// wait.
    pub fn matches_ref<R: KeyFieldReader>(&self, reader: &R, candidate: &ModelRef<M>) -> Result<bool> {
        let guard = match candidate.try_read() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return Err(Error::Custom(format!(
                    "tracked '{}' instance is locked for writing",
                    M::TABLE_NAME
                )));
            }
        };
        self.matches(reader, &guard)
    }

    /// The individual tests, in evaluation order.
    pub fn tests(&self) -> &[FieldEquals] {
        &self.tests
    }

    /// Number of field tests.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Check if there are no tests (never true for a built predicate).
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// True when the key spans more than one field.
    pub fn is_composite(&self) -> bool {
        self.tests.len() > 1
    }
}

/// Build a predicate matching any instance whose key fields equal the
/// template's current values.
pub fn build_equality_predicate<M: Model + 'static, R: KeyFieldReader>(
    reader: &R,
    template: &M,
    key_fields: &[&'static str],
) -> Result<KeyPredicate<M>> {
    if key_fields.is_empty() {
        return Err(MetadataError::no_key(std::any::type_name::<M>()).into());
    }
    let values = reader.field_values(template, key_fields)?;
    let tests = key_fields
        .iter()
        .zip(values)
        .map(|(&field, value)| FieldEquals { field, value })
        .collect();
    Ok(KeyPredicate {
        tests,
        _marker: PhantomData,
    })
}

/// First tracked instance of `M` satisfying `predicate`.
pub fn find_matching<C, M>(ctx: &C, predicate: &KeyPredicate<M>) -> Result<Option<ModelRef<M>>>
where
    C: TrackingContext + ?Sized,
    M: Model + 'static,
{
    let reader = ctx.metadata();
    for candidate in ctx.local::<M>() {
        if predicate.matches_ref(reader, &candidate)? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Find the tracked instance sharing `template`'s key by scanning the local
/// cache.
#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME))]
pub fn find_in_local_cache<C, M>(ctx: &C, template: &M) -> Result<Option<ModelRef<M>>>
where
    C: TrackingContext + ?Sized,
    M: Model + 'static,
{
    let key_fields = resolve_key_fields::<M, _>(ctx.metadata())?;
    let predicate = build_equality_predicate(ctx.metadata(), template, &key_fields)?;
    tracing::trace!(tests = ?predicate.tests(), "Scanning local cache");

    let found = find_matching(ctx, &predicate)?;
    tracing::debug!(found = found.is_some(), "Local cache scan complete");
    Ok(found)
}

/// Find the tracked instance sharing `template`'s key by native key lookup.
#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME))]
pub fn resolve_tracked_by_key<C, M>(ctx: &C, template: &M) -> Result<Option<ModelRef<M>>>
where
    C: KeyedLookup + ?Sized,
    M: Model + 'static,
{
    let key = ctx.create_entity_key(template)?;
    tracing::trace!(key = ?key.values(), "Resolved entity key");

    let found = ctx.try_get_by_key::<M>(&key)?;
    tracing::debug!(found = found.is_some(), "Native key lookup complete");
    Ok(found)
}
