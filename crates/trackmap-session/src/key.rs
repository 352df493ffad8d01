//! Native entity keys for exact identity-map lookup.

use std::any::{TypeId, type_name};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use trackmap_core::{InvalidArgumentError, Model, Result, Value};

/// Key identifying one tracked record: the record type plus the current
/// values of its key fields.
///
/// Built by a context from a type's key descriptor and an instance's values.
/// The hash is computed once at construction.
#[derive(Debug, Clone)]
pub struct EntityKey {
    type_id: TypeId,
    type_name: &'static str,
    table: &'static str,
    fields: Vec<&'static str>,
    values: Vec<Value>,
    hash: u64,
}

impl EntityKey {
    /// Create a key for `M` from its key descriptor and matching values.
    pub fn new<M: Model + 'static>(fields: Vec<&'static str>, values: Vec<Value>) -> Result<Self> {
        if fields.is_empty() {
            return Err(InvalidArgumentError::new("fields", "entity key needs at least one field").into());
        }
        if fields.len() != values.len() {
            return Err(InvalidArgumentError::new(
                "values",
                format!(
                    "entity key for '{}' has {} fields but {} values",
                    M::TABLE_NAME,
                    fields.len(),
                    values.len()
                ),
            )
            .into());
        }
        if let Some((field, _)) = fields.iter().zip(&values).find(|(_, v)| v.is_nan()) {
            return Err(InvalidArgumentError::new(
                "values",
                format!("entity key for '{}' holds NaN in '{field}'", M::TABLE_NAME),
            )
            .into());
        }
        let type_id = TypeId::of::<M>();
        let hash = hash_key(type_id, &values);
        Ok(Self {
            type_id,
            type_name: type_name::<M>(),
            table: M::TABLE_NAME,
            fields,
            values,
            hash,
        })
    }

    /// Check whether this key was built for `M`.
    pub fn is_for<M: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    /// Type identifier of the record type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the record type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Table of the record type.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Key field names, in descriptor order.
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// Key values, aligned with `fields()`.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Precomputed hash of type and values.
    pub fn pk_hash(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for EntityKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.type_id == other.type_id && self.values == other.values
    }
}

fn hash_key(type_id: TypeId, values: &[Value]) -> u64 {
    let mut hasher = DefaultHasher::new();
    type_id.hash(&mut hasher);
    values.len().hash(&mut hasher);
    for v in values {
        hash_value(v, &mut hasher);
    }
    hasher.finish()
}

/// Hash a single value into the hasher.
///
/// Values equal under `Value`'s `PartialEq` must hash alike, so `-0.0` is
/// hashed as `0.0`.
fn hash_value(v: &Value, hasher: &mut impl Hasher) {
    match v {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::TinyInt(i) => {
            2u8.hash(hasher);
            i.hash(hasher);
        }
        Value::SmallInt(i) => {
            3u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Int(i) => {
            4u8.hash(hasher);
            i.hash(hasher);
        }
        Value::BigInt(i) => {
            5u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Float(f) => {
            6u8.hash(hasher);
            (f + 0.0).to_bits().hash(hasher);
        }
        Value::Double(f) => {
            7u8.hash(hasher);
            (f + 0.0).to_bits().hash(hasher);
        }
        Value::Decimal(s) => {
            8u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Text(s) => {
            9u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            10u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Date(d) => {
            11u8.hash(hasher);
            d.hash(hasher);
        }
        Value::Time(t) => {
            12u8.hash(hasher);
            t.hash(hasher);
        }
        Value::Timestamp(ts) => {
            13u8.hash(hasher);
            ts.hash(hasher);
        }
        Value::TimestampTz(ts) => {
            14u8.hash(hasher);
            ts.hash(hasher);
        }
        Value::Uuid(u) => {
            15u8.hash(hasher);
            u.hash(hasher);
        }
        Value::Json(j) => {
            16u8.hash(hasher);
            j.to_string().hash(hasher);
        }
        Value::Array(arr) => {
            17u8.hash(hasher);
            arr.len().hash(hasher);
            for item in arr {
                hash_value(item, hasher);
            }
        }
        Value::Default => {
            18u8.hash(hasher);
        }
    }
}
