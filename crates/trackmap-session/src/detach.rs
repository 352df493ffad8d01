//! Detaching tracked instances from a context.
//!
//! Detaching stops the context from tracking an instance. It never issues a
//! DELETE and never modifies the instance; references held elsewhere stay
//! valid as plain values.
//!
//! The `*_if_tracked` helpers accept a *template*, any instance carrying the
//! key of the record to detach. A template whose key matches nothing tracked
//! is a no-op, not an error.
//!
//! # Example
//!
//! ```ignore
//! use trackmap_session::DetachExt;
//!
//! let stale = Invoice { id: 2, ..Default::default() };
//! session.detach_if_tracked(&stale)?;
//! ```

use crate::context::{KeyedLookup, TrackingContext};
use crate::identity_map::ModelRef;
use crate::resolver::{
    build_equality_predicate, find_matching, resolve_key_fields, resolve_tracked_by_key,
};
use trackmap_core::{Model, Result};

/// Stop tracking `instance`.
#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME))]
pub fn detach<C, M>(ctx: &mut C, instance: &ModelRef<M>) -> bool
where
    C: TrackingContext + ?Sized,
    M: Model + 'static,
{
    let removed = ctx.detach_instance(instance);
    tracing::debug!(removed, "Detach");
    removed
}

/// Detach the tracked instance sharing `template`'s key, if any.
///
/// Returns whether an instance was detached.
#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME))]
pub fn detach_if_tracked<C, M>(ctx: &mut C, template: &M) -> Result<bool>
where
    C: KeyedLookup + ?Sized,
    M: Model + 'static,
{
    match resolve_tracked_by_key(&*ctx, template)? {
        Some(tracked) => Ok(ctx.detach_instance(&tracked)),
        None => {
            tracing::trace!("Template not tracked, nothing to detach");
            Ok(false)
        }
    }
}

/// Detach the tracked instance for each template, in order.
///
/// Templates matching nothing are skipped. The first error aborts the batch;
/// instances detached before it stay detached.
///
/// Returns the number of instances detached.
#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME))]
pub fn detach_all_if_tracked<'a, C, M, I>(ctx: &mut C, templates: I) -> Result<usize>
where
    C: KeyedLookup + ?Sized,
    M: Model + 'static,
    I: IntoIterator<Item = &'a M>,
{
    let mut detached = 0;
    for template in templates {
        if let Some(tracked) = resolve_tracked_by_key(&*ctx, template)? {
            if ctx.detach_instance(&tracked) {
                detached += 1;
            }
        }
    }
    tracing::debug!(detached, "Batch detach complete");
    Ok(detached)
}

/// Like [`detach_if_tracked`], for contexts without native key lookup.
///
/// Locates the instance by scanning the local cache.
#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME))]
pub fn detach_local_if_tracked<C, M>(ctx: &mut C, template: &M) -> Result<bool>
where
    C: TrackingContext + ?Sized,
    M: Model + 'static,
{
    let key_fields = resolve_key_fields::<M, _>(ctx.metadata())?;
    detach_scanned(ctx, template, &key_fields)
}

/// Like [`detach_all_if_tracked`], for contexts without native key lookup.
///
/// Key fields are resolved once for the whole batch.
#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME))]
pub fn detach_all_local_if_tracked<'a, C, M, I>(ctx: &mut C, templates: I) -> Result<usize>
where
    C: TrackingContext + ?Sized,
    M: Model + 'static,
    I: IntoIterator<Item = &'a M>,
{
    let key_fields = resolve_key_fields::<M, _>(ctx.metadata())?;
    let mut detached = 0;
    for template in templates {
        if detach_scanned(ctx, template, &key_fields)? {
            detached += 1;
        }
    }
    tracing::debug!(detached, "Batch detach complete");
    Ok(detached)
}

fn detach_scanned<C, M>(ctx: &mut C, template: &M, key_fields: &[&'static str]) -> Result<bool>
where
    C: TrackingContext + ?Sized,
    M: Model + 'static,
{
    let predicate = build_equality_predicate(ctx.metadata(), template, key_fields)?;
    match find_matching(&*ctx, &predicate)? {
        Some(tracked) => Ok(ctx.detach_instance(&tracked)),
        None => Ok(false),
    }
}

/// Method-call syntax for resolution and detachment on any keyed context.
pub trait DetachExt: KeyedLookup {
    /// See [`resolve_tracked_by_key`].
    fn resolve_tracked<M: Model + 'static>(&self, template: &M) -> Result<Option<ModelRef<M>>> {
        resolve_tracked_by_key(self, template)
    }

    /// See [`detach_if_tracked`].
    fn detach_if_tracked<M: Model + 'static>(&mut self, template: &M) -> Result<bool> {
        detach_if_tracked(self, template)
    }

    /// See [`detach_all_if_tracked`].
    fn detach_all_if_tracked<'a, M, I>(&mut self, templates: I) -> Result<usize>
    where
        M: Model + 'static,
        I: IntoIterator<Item = &'a M>,
    {
        detach_all_if_tracked(self, templates)
    }
}

impl<C: KeyedLookup + ?Sized> DetachExt for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityKey, Session, SessionMetadata, TrackedSet, find_in_local_cache};
    use std::sync::Arc;
    use trackmap_core::{Error, FieldInfo, SqlType, Value};

    #[derive(Debug, Clone)]
    struct Invoice {
        id: i64,
    }

    impl Model for Invoice {
        const TABLE_NAME: &'static str = "invoices";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];

        fn fields() -> &'static [FieldInfo] {
            static FIELDS: &[FieldInfo] =
                &[FieldInfo::new("id", "id", SqlType::BigInt).primary_key(true)];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("id", Value::BigInt(self.id))]
        }
    }

    #[derive(Debug, Clone)]
    struct LineItem {
        order_id: i64,
        line_no: i32,
        qty: i32,
    }

    impl Model for LineItem {
        const TABLE_NAME: &'static str = "line_items";
        const PRIMARY_KEY: &'static [&'static str] = &["order_id", "line_no"];

        fn fields() -> &'static [FieldInfo] {
            static FIELDS: &[FieldInfo] = &[
                FieldInfo::new("order_id", "order_id", SqlType::BigInt).primary_key(true),
                FieldInfo::new("line_no", "line_no", SqlType::Integer).primary_key(true),
                FieldInfo::new("qty", "qty", SqlType::Integer),
            ];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("order_id", Value::BigInt(self.order_id)),
                ("line_no", Value::Int(self.line_no)),
                ("qty", Value::Int(self.qty)),
            ]
        }
    }

    // A partially loaded row leaves its key out of `to_row()`.
    #[derive(Debug, Clone)]
    struct Ticket {
        id: Option<i64>,
    }

    impl Model for Ticket {
        const TABLE_NAME: &'static str = "tickets";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];

        fn fields() -> &'static [FieldInfo] {
            &[]
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            self.id.map(|id| vec![("id", Value::BigInt(id))]).unwrap_or_default()
        }
    }

    #[derive(Debug, Clone)]
    struct Reading {
        level: f64,
    }

    impl Model for Reading {
        const TABLE_NAME: &'static str = "readings";
        const PRIMARY_KEY: &'static [&'static str] = &["level"];

        fn fields() -> &'static [FieldInfo] {
            static FIELDS: &[FieldInfo] =
                &[FieldInfo::new("level", "level", SqlType::Double).primary_key(true)];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("level", Value::Double(self.level))]
        }
    }

    /// Session wrapper that records detach order.
    #[derive(Default)]
    struct Recording {
        inner: Session,
        detached: Vec<Vec<Value>>,
    }

    impl TrackingContext for Recording {
        type Metadata = SessionMetadata;

        fn metadata(&self) -> &SessionMetadata {
            self.inner.metadata()
        }

        fn local<M: Model + 'static>(&self) -> TrackedSet<M> {
            self.inner.local()
        }

        fn detach_instance<M: Model + 'static>(&mut self, instance: &ModelRef<M>) -> bool {
            let removed = self.inner.detach_instance(instance);
            if removed {
                let pk = instance.read().unwrap().primary_key_value();
                self.detached.push(pk);
            }
            removed
        }
    }

    impl KeyedLookup for Recording {
        fn try_get_by_key<M: Model + 'static>(
            &self,
            key: &EntityKey,
        ) -> Result<Option<ModelRef<M>>> {
            self.inner.try_get_by_key(key)
        }
    }

    /// Context offering only the scanning capability.
    #[derive(Default)]
    struct ScanOnly(Recording);

    impl TrackingContext for ScanOnly {
        type Metadata = SessionMetadata;

        fn metadata(&self) -> &SessionMetadata {
            self.0.metadata()
        }

        fn local<M: Model + 'static>(&self) -> TrackedSet<M> {
            self.0.local()
        }

        fn detach_instance<M: Model + 'static>(&mut self, instance: &ModelRef<M>) -> bool {
            self.0.detach_instance(instance)
        }
    }

    fn local_ids(session: &Session) -> Vec<i64> {
        session
            .local::<Invoice>()
            .iter()
            .map(|inv| inv.read().unwrap().id)
            .collect()
    }

    fn invoices(ids: &[i64]) -> Session {
        let mut session = Session::new();
        for &id in ids {
            session.attach(Invoice { id }).unwrap();
        }
        session
    }

    fn line(order_id: i64, line_no: i32) -> LineItem {
        LineItem {
            order_id,
            line_no,
            qty: 1,
        }
    }

    #[test]
    fn test_detach_if_tracked_removes_matching_invoice() {
        let mut session = invoices(&[1, 2, 3]);

        assert!(detach_if_tracked(&mut session, &Invoice { id: 2 }).unwrap());
        assert_eq!(local_ids(&session), vec![1, 3]);
    }

    #[test]
    fn test_detach_if_tracked_miss_is_noop() {
        let mut session = invoices(&[1, 2, 3]);

        assert!(!detach_if_tracked(&mut session, &Invoice { id: 9 }).unwrap());
        assert_eq!(local_ids(&session), vec![1, 2, 3]);
    }

    #[test]
    fn test_detach_composite_key_removes_exactly_one() {
        let mut session = Session::new();
        for (order_id, line_no) in [(1, 1), (1, 2), (2, 1)] {
            session.attach(line(order_id, line_no)).unwrap();
        }

        let template = LineItem {
            order_id: 1,
            line_no: 2,
            qty: 99,
        };
        assert!(session.detach_if_tracked(&template).unwrap());

        let keys: Vec<(i64, i32)> = session
            .local::<LineItem>()
            .iter()
            .map(|item| {
                let item = item.read().unwrap();
                (item.order_id, item.line_no)
            })
            .collect();
        assert_eq!(keys, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn test_detached_instance_survives_as_plain_value() {
        let mut session = invoices(&[1]);
        let held = session.find::<Invoice>(&[Value::BigInt(1)]).unwrap().unwrap();

        session.detach_if_tracked(&Invoice { id: 1 }).unwrap();
        assert_eq!(session.tracked_count(), 0);
        assert_eq!(held.read().unwrap().id, 1);
        assert!(!detach(&mut session, &held));
    }

    #[test]
    fn test_detach_all_follows_input_order() {
        let mut ctx = Recording::default();
        for id in 1..=5 {
            ctx.inner.attach(Invoice { id }).unwrap();
        }

        let templates: Vec<Invoice> = [4, 9, 2, 5, 42].map(|id| Invoice { id }).to_vec();
        let detached = ctx.detach_all_if_tracked(&templates).unwrap();

        assert_eq!(detached, 3);
        assert_eq!(
            ctx.detached,
            vec![
                vec![Value::BigInt(4)],
                vec![Value::BigInt(2)],
                vec![Value::BigInt(5)],
            ]
        );
        assert_eq!(local_ids(&ctx.inner), vec![1, 3]);
    }

    #[test]
    fn test_detach_all_is_fail_fast() {
        let mut session = Session::new();
        for id in [1, 2] {
            session.attach(Ticket { id: Some(id) }).unwrap();
        }

        let templates = [Ticket { id: Some(1) }, Ticket { id: None }, Ticket { id: Some(2) }];
        let err = detach_all_if_tracked(&mut session, &templates).unwrap_err();

        assert!(matches!(err, Error::FieldAccess(_)));
        assert_eq!(session.tracked_count_of::<Ticket>(), 1);
        assert!(session.contains(&Ticket { id: Some(2) }).unwrap());
    }

    #[test]
    fn test_scanning_batch_is_fail_fast() {
        let mut scan = ScanOnly::default();
        for id in [1, 2] {
            scan.0.inner.attach(Ticket { id: Some(id) }).unwrap();
        }

        let templates = [Ticket { id: Some(1) }, Ticket { id: None }, Ticket { id: Some(2) }];
        let err = detach_all_local_if_tracked(&mut scan, &templates).unwrap_err();

        assert!(matches!(err, Error::FieldAccess(_)));
        assert_eq!(scan.0.detached, vec![vec![Value::BigInt(1)]]);
        assert_eq!(scan.0.inner.tracked_count_of::<Ticket>(), 1);
        assert!(scan.0.inner.contains(&Ticket { id: Some(2) }).unwrap());
    }

    #[test]
    fn test_scanning_fallback_matches_native_path() {
        let mut scan = ScanOnly::default();
        let mut native = Session::new();
        for (order_id, line_no) in [(1, 1), (1, 2), (2, 1)] {
            scan.0.inner.attach(line(order_id, line_no)).unwrap();
            native.attach(line(order_id, line_no)).unwrap();
        }

        let templates = [line(2, 1), line(3, 3), line(1, 1)];
        let scanned = detach_all_local_if_tracked(&mut scan, &templates).unwrap();
        let keyed = detach_all_if_tracked(&mut native, &templates).unwrap();

        assert_eq!(scanned, 2);
        assert_eq!(scanned, keyed);
        assert_eq!(scan.0.inner.tracked_count(), native.tracked_count());
        assert_eq!(
            scan.0.detached,
            vec![
                vec![Value::BigInt(2), Value::Int(1)],
                vec![Value::BigInt(1), Value::Int(1)],
            ]
        );

        assert!(detach_local_if_tracked(&mut scan, &line(1, 2)).unwrap());
        assert!(!detach_local_if_tracked(&mut scan, &line(1, 2)).unwrap());
    }

    #[test]
    fn test_resolution_strategies_agree() {
        let mut session = Session::new();
        for (order_id, line_no) in [(1, 1), (1, 2), (2, 1)] {
            session.attach(line(order_id, line_no)).unwrap();
        }

        for template in [line(1, 1), line(1, 2), line(2, 1), line(2, 2), line(9, 9)] {
            let scanned = find_in_local_cache(&session, &template).unwrap();
            let keyed = session.resolve_tracked(&template).unwrap();
            match (scanned, keyed) {
                (Some(a), Some(b)) => assert!(Arc::ptr_eq(&a, &b)),
                (None, None) => {}
                (a, b) => panic!("strategies disagree: {a:?} vs {b:?}"),
            }
        }
    }

    #[test]
    fn test_signed_zero_keys_resolve_alike() {
        let mut session = Session::new();
        let tracked = session.attach(Reading { level: 0.0 }).unwrap();

        let template = Reading { level: -0.0 };
        let scanned = find_in_local_cache(&session, &template).unwrap();
        let keyed = session.resolve_tracked(&template).unwrap();
        assert!(scanned.is_some_and(|found| Arc::ptr_eq(&found, &tracked)));
        assert!(keyed.is_some_and(|found| Arc::ptr_eq(&found, &tracked)));

        let again = session.attach(Reading { level: -0.0 }).unwrap();
        assert!(Arc::ptr_eq(&again, &tracked));
        assert_eq!(session.tracked_count(), 1);

        assert!(session.detach_if_tracked(&template).unwrap());
        assert_eq!(session.tracked_count(), 0);
    }

    #[test]
    fn test_nan_key_is_rejected_by_both_strategies() {
        let mut session = Session::new();
        session.attach(Reading { level: 1.5 }).unwrap();

        let template = Reading { level: f64::NAN };
        assert!(matches!(
            find_in_local_cache(&session, &template),
            Err(Error::FieldAccess(_))
        ));
        assert!(matches!(
            session.resolve_tracked(&template),
            Err(Error::FieldAccess(_))
        ));
        assert!(session.attach(template).is_err());
        assert_eq!(session.tracked_count(), 1);
    }

    #[test]
    fn test_key_mutation_after_load() {
        let mut session = invoices(&[1, 2]);
        let tracked = session.find::<Invoice>(&[Value::BigInt(1)]).unwrap().unwrap();
        tracked.write().unwrap().id = 10;

        // Native lookup follows the key the instance was attached under,
        // scanning follows its current values.
        let by_old_key = session.resolve_tracked(&Invoice { id: 1 }).unwrap();
        assert!(by_old_key.is_some_and(|found| Arc::ptr_eq(&found, &tracked)));
        let by_scan = find_in_local_cache(&session, &Invoice { id: 10 }).unwrap();
        assert!(by_scan.is_some_and(|found| Arc::ptr_eq(&found, &tracked)));

        assert!(session.detach_if_tracked(&Invoice { id: 1 }).unwrap());
        assert_eq!(local_ids(&session), vec![2]);
    }
}
