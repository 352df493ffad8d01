//! Mapping metadata: which fields form a type's key, and how to read them.
//!
//! Two providers implement [`KeyFieldReader`]:
//!
//! - [`ModelMetadata`] derives everything from the `Model` impl itself. No
//!   registration step; every `Model` is considered mapped.
//! - [`MappingRegistry`] holds explicit per-type mappings, can override a
//!   type's key descriptor, and rejects types that were never registered.

use crate::error::{FieldAccessError, MetadataError, Result};
use crate::field::find_field;
use crate::model::Model;
use crate::value::Value;
use std::any::{TypeId, type_name};
use std::collections::HashMap;

/// Capability for discovering key fields and reading field values.
pub trait KeyFieldReader {
    /// The ordered key field names for `M`.
    fn key_fields<M: Model + 'static>(&self) -> Result<Vec<&'static str>>;

    /// The current value of `field` on `instance`.
    fn field_value<M: Model + 'static>(&self, instance: &M, field: &str) -> Result<Value>;

    /// Current values of several fields, in the order given.
    fn field_values<M: Model + 'static>(&self, instance: &M, fields: &[&str]) -> Result<Vec<Value>> {
        fields
            .iter()
            .map(|field| self.field_value(instance, field))
            .collect()
    }
}

impl<R: KeyFieldReader> KeyFieldReader for &R {
    fn key_fields<M: Model + 'static>(&self) -> Result<Vec<&'static str>> {
        (**self).key_fields::<M>()
    }

    fn field_value<M: Model + 'static>(&self, instance: &M, field: &str) -> Result<Value> {
        (**self).field_value(instance, field)
    }

    fn field_values<M: Model + 'static>(&self, instance: &M, fields: &[&str]) -> Result<Vec<Value>> {
        (**self).field_values(instance, fields)
    }
}

/// Key fields declared by the model: fields flagged `primary_key`, in field
/// order, falling back to `M::PRIMARY_KEY` when none are flagged.
pub fn declared_key_fields<M: Model>() -> Vec<&'static str> {
    let flagged: Vec<&'static str> = M::fields()
        .iter()
        .filter(|f| f.primary_key)
        .map(|f| f.name)
        .collect();
    if flagged.is_empty() {
        M::PRIMARY_KEY.to_vec()
    } else {
        flagged
    }
}

/// Read one field's current value from a model instance.
///
/// With `check_type`, the value must fit the field's declared `SqlType`
/// (fields without `FieldInfo` are not checked). NaN values are rejected
/// because they cannot take part in key equality.
pub fn read_field<M: Model>(instance: &M, field: &str, check_type: bool) -> Result<Value> {
    let value = instance
        .to_row()
        .into_iter()
        .find(|(name, _)| *name == field)
        .map(|(_, value)| value)
        .ok_or_else(|| FieldAccessError::missing(M::TABLE_NAME, field))?;
    check_key_value::<M>(field, &value, check_type)?;
    Ok(value)
}

/// Read several fields with a single `to_row()` call.
fn read_fields<M: Model>(instance: &M, fields: &[&str], check_type: bool) -> Result<Vec<Value>> {
    let row = instance.to_row();
    fields
        .iter()
        .map(|field| {
            let value = row
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| FieldAccessError::missing(M::TABLE_NAME, *field))?;
            check_key_value::<M>(field, &value, check_type)?;
            Ok(value)
        })
        .collect()
}

fn check_key_value<M: Model>(field: &str, value: &Value, check_type: bool) -> Result<()> {
    if check_type {
        check_declared_type::<M>(field, value)?;
    }
    if value.is_nan() {
        return Err(FieldAccessError::not_comparable(M::TABLE_NAME, field, value.type_name()).into());
    }
    Ok(())
}

fn check_declared_type<M: Model>(field: &str, value: &Value) -> Result<()> {
    match find_field(M::fields(), field) {
        Some(info) if !info.sql_type.accepts(value) => Err(FieldAccessError::type_mismatch(
            M::TABLE_NAME,
            field,
            info.sql_type.sql_name(),
            value.type_name(),
        )
        .into()),
        _ => Ok(()),
    }
}

/// Metadata read straight from `Model` impls.
#[derive(Debug, Clone, Copy)]
pub struct ModelMetadata {
    check_types: bool,
}

impl ModelMetadata {
    /// Create a reader that type-checks key values.
    pub const fn new() -> Self {
        Self { check_types: true }
    }

    /// Create a reader that skips the declared-type check.
    pub const fn without_type_checks() -> Self {
        Self { check_types: false }
    }
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyFieldReader for ModelMetadata {
    fn key_fields<M: Model + 'static>(&self) -> Result<Vec<&'static str>> {
        let keys = declared_key_fields::<M>();
        if keys.is_empty() {
            return Err(MetadataError::no_key(type_name::<M>()).into());
        }
        Ok(keys)
    }

    fn field_value<M: Model + 'static>(&self, instance: &M, field: &str) -> Result<Value> {
        read_field(instance, field, self.check_types)
    }

    fn field_values<M: Model + 'static>(&self, instance: &M, fields: &[&str]) -> Result<Vec<Value>> {
        read_fields(instance, fields, self.check_types)
    }
}

/// Registered mapping for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMapping {
    /// Rust type name
    pub type_name: &'static str,
    /// Table the type maps to
    pub table: &'static str,
    /// Ordered key descriptor
    pub key_fields: Vec<&'static str>,
}

/// Explicit registry of mapped types.
#[derive(Debug)]
pub struct MappingRegistry {
    mappings: HashMap<TypeId, EntityMapping>,
    check_types: bool,
}

impl MappingRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
            check_types: true,
        }
    }

    /// Enable or disable the declared-type check on field reads.
    #[must_use]
    pub fn with_type_checks(mut self, value: bool) -> Self {
        self.check_types = value;
        self
    }

    /// Register `M` using the key fields its model declares.
    pub fn register<M: Model + 'static>(&mut self) -> Result<&EntityMapping> {
        let keys = declared_key_fields::<M>();
        self.insert::<M>(keys)
    }

    /// Register `M` with an explicit key descriptor.
    ///
    /// Every key field must exist on the model when it publishes field metadata.
    pub fn register_keys<M: Model + 'static>(
        &mut self,
        keys: &[&'static str],
    ) -> Result<&EntityMapping> {
        let fields = M::fields();
        if !fields.is_empty() {
            if let Some(unknown) = keys.iter().find(|k| find_field(fields, k).is_none()) {
                return Err(FieldAccessError::missing(M::TABLE_NAME, *unknown).into());
            }
        }
        self.insert::<M>(keys.to_vec())
    }

    fn insert<M: Model + 'static>(&mut self, keys: Vec<&'static str>) -> Result<&EntityMapping> {
        if keys.is_empty() {
            return Err(MetadataError::no_key(type_name::<M>()).into());
        }
        tracing::debug!(table = M::TABLE_NAME, keys = ?keys, "Registered entity mapping");
        let mapping = EntityMapping {
            type_name: type_name::<M>(),
            table: M::TABLE_NAME,
            key_fields: keys,
        };
        let entry = self.mappings.entry(TypeId::of::<M>()).insert_entry(mapping);
        Ok(entry.into_mut())
    }

    /// Remove the mapping for `M`.
    pub fn unregister<M: Model + 'static>(&mut self) -> Option<EntityMapping> {
        self.mappings.remove(&TypeId::of::<M>())
    }

    /// Get the mapping for `M`.
    pub fn mapping<M: Model + 'static>(&self) -> Result<&EntityMapping> {
        self.mappings
            .get(&TypeId::of::<M>())
            .ok_or_else(|| MetadataError::unmapped(type_name::<M>()).into())
    }

    /// Check whether `M` is registered.
    pub fn is_mapped<M: Model + 'static>(&self) -> bool {
        self.mappings.contains_key(&TypeId::of::<M>())
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Check if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl Default for MappingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyFieldReader for MappingRegistry {
    fn key_fields<M: Model + 'static>(&self) -> Result<Vec<&'static str>> {
        Ok(self.mapping::<M>()?.key_fields.clone())
    }

    fn field_value<M: Model + 'static>(&self, instance: &M, field: &str) -> Result<Value> {
        self.mapping::<M>()?;
        read_field(instance, field, self.check_types)
    }

    fn field_values<M: Model + 'static>(&self, instance: &M, fields: &[&str]) -> Result<Vec<Value>> {
        self.mapping::<M>()?;
        read_fields(instance, fields, self.check_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, FieldAccessErrorKind, MetadataErrorKind};
    use crate::{FieldInfo, SqlType};

    struct Invoice {
        id: i64,
        number: String,
    }

    impl Model for Invoice {
        const TABLE_NAME: &'static str = "invoices";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];

        fn fields() -> &'static [FieldInfo] {
            static FIELDS: &[FieldInfo] = &[
                FieldInfo::new("id", "id", SqlType::BigInt).primary_key(true),
                FieldInfo::new("number", "number", SqlType::Text),
            ];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("id", Value::BigInt(self.id)),
                ("number", Value::Text(self.number.clone())),
            ]
        }
    }

    // Declares keys only through PRIMARY_KEY, no field metadata.
    struct Shipment {
        carrier: String,
        tracking_no: String,
    }

    impl Model for Shipment {
        const TABLE_NAME: &'static str = "shipments";
        const PRIMARY_KEY: &'static [&'static str] = &["carrier", "tracking_no"];

        fn fields() -> &'static [FieldInfo] {
            &[]
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("carrier", Value::Text(self.carrier.clone())),
                ("tracking_no", Value::Text(self.tracking_no.clone())),
            ]
        }
    }

    struct AuditEntry;

    impl Model for AuditEntry {
        const TABLE_NAME: &'static str = "audit_log";
        const PRIMARY_KEY: &'static [&'static str] = &[];

        fn fields() -> &'static [FieldInfo] {
            &[]
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![]
        }
    }

    // Key value contradicts the declared column type.
    struct Mislabeled;

    impl Model for Mislabeled {
        const TABLE_NAME: &'static str = "mislabeled";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];

        fn fields() -> &'static [FieldInfo] {
            static FIELDS: &[FieldInfo] =
                &[FieldInfo::new("id", "id", SqlType::BigInt).primary_key(true)];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("id", Value::Text("42".into()))]
        }
    }

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

    fn invoice() -> Invoice {
        Invoice {
            id: 2,
            number: "INV-0002".into(),
        }
    }

    #[test]
    fn test_model_metadata_prefers_flagged_fields() {
        let keys = ModelMetadata::new().key_fields::<Invoice>().unwrap();
        assert_eq!(keys, vec!["id"]);
    }

    #[test]
    fn test_model_metadata_falls_back_to_declared_constant() {
        let keys = ModelMetadata::new().key_fields::<Shipment>().unwrap();
        assert_eq!(keys, vec!["carrier", "tracking_no"]);

        let shipment = Shipment {
            carrier: "DHL".into(),
            tracking_no: "JD01".into(),
        };
        let values = ModelMetadata::new()
            .field_values(&shipment, &keys)
            .unwrap();
        assert_eq!(
            values,
            vec![Value::Text("DHL".into()), Value::Text("JD01".into())]
        );
    }

    #[test]
    fn test_no_key_is_metadata_error() {
        match ModelMetadata::new().key_fields::<AuditEntry>() {
            Err(Error::Metadata(e)) => assert_eq!(e.kind, MetadataErrorKind::NoKey),
            other => panic!("expected metadata error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_field_is_field_access_error() {
        match ModelMetadata::new().field_value(&invoice(), "customer_id") {
            Err(Error::FieldAccess(e)) => {
                assert_eq!(e.kind, FieldAccessErrorKind::Missing);
                assert_eq!(e.field, "customer_id");
                assert_eq!(e.table, "invoices");
            }
            other => panic!("expected field access error, got {other:?}"),
        }
    }

    #[test]
    fn test_type_mismatch_detected_unless_disabled() {
        match ModelMetadata::new().field_value(&Mislabeled, "id") {
            Err(Error::FieldAccess(e)) => {
                assert_eq!(e.kind, FieldAccessErrorKind::TypeMismatch);
                assert_eq!(e.actual, Some("TEXT"));
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }

        let value = ModelMetadata::without_type_checks()
            .field_value(&Mislabeled, "id")
            .unwrap();
        assert_eq!(value, Value::Text("42".into()));
    }

    #[test]
    fn test_registry_rejects_unmapped_types() {
        let registry = MappingRegistry::new();
        assert!(!registry.is_mapped::<Invoice>());
        match registry.key_fields::<Invoice>() {
            Err(Error::Metadata(e)) => assert_eq!(e.kind, MetadataErrorKind::Unmapped),
            other => panic!("expected unmapped error, got {other:?}"),
        }
        assert!(registry.field_value(&invoice(), "id").is_err());
    }

    #[test]
    fn test_registry_register_and_override() {
        let mut registry = MappingRegistry::new();
        let mapping = registry.register::<Invoice>().unwrap();
        assert_eq!(mapping.table, "invoices");
        assert_eq!(mapping.key_fields, vec!["id"]);

        registry.register_keys::<Invoice>(&["number"]).unwrap();
        assert_eq!(registry.key_fields::<Invoice>().unwrap(), vec!["number"]);
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister::<Invoice>().is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_validates_override_keys() {
        let mut registry = MappingRegistry::new();
        assert!(matches!(
            registry.register_keys::<Invoice>(&["customer_id"]),
            Err(Error::FieldAccess(_))
        ));
        assert!(matches!(
            registry.register_keys::<Invoice>(&[]),
            Err(Error::Metadata(_))
        ));
        assert!(matches!(
            registry.register::<AuditEntry>(),
            Err(Error::Metadata(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_nan_key_value_is_rejected() {
        let nan = Reading { level: f64::NAN };
        match ModelMetadata::without_type_checks().field_value(&nan, "level") {
            Err(Error::FieldAccess(e)) => {
                assert_eq!(e.kind, FieldAccessErrorKind::NotComparable);
                assert_eq!(e.actual, Some("DOUBLE"));
            }
            other => panic!("expected not comparable, got {other:?}"),
        }
        assert!(ModelMetadata::new().field_values(&nan, &["level"]).is_err());

        let zero = Reading { level: -0.0 };
        assert_eq!(
            ModelMetadata::new().field_value(&zero, "level").unwrap(),
            Value::Double(0.0)
        );
    }
}
