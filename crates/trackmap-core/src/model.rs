//! Model trait for ORM-style struct mapping.
//!
//! The `Model` trait is the contract between a record type and the mapping
//! metadata: table name, declared key columns, per-field metadata, and the
//! record's current field values.

use crate::field::FieldInfo;
use crate::value::Value;

/// Trait for types that can be mapped to database tables.
///
/// # Example
///
/// ```ignore
/// use trackmap_core::{FieldInfo, Model, SqlType, Value};
///
/// struct Invoice {
///     id: i64,
///     total_cents: i64,
/// }
///
/// impl Model for Invoice {
///     const TABLE_NAME: &'static str = "invoices";
///     const PRIMARY_KEY: &'static [&'static str] = &["id"];
///
///     fn fields() -> &'static [FieldInfo] {
///         static FIELDS: &[FieldInfo] = &[
///             FieldInfo::new("id", "id", SqlType::BigInt).primary_key(true),
///             FieldInfo::new("total_cents", "total_cents", SqlType::BigInt),
///         ];
///         FIELDS
///     }
///
///     fn to_row(&self) -> Vec<(&'static str, Value)> {
///         vec![("id", self.id.into()), ("total_cents", self.total_cents.into())]
///     }
/// }
/// ```
pub trait Model: Sized + Send + Sync {
    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// The primary key column name(s).
    ///
    /// Used when no field in `fields()` carries the `primary_key` flag.
    const PRIMARY_KEY: &'static [&'static str];

    /// Get field metadata for all columns.
    fn fields() -> &'static [FieldInfo];

    /// Convert this model instance to a row of current field values.
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    /// Get the value of the primary key field(s) declared in `PRIMARY_KEY`.
    ///
    /// Key columns absent from `to_row()` read as NULL.
    fn primary_key_value(&self) -> Vec<Value> {
        let row = self.to_row();
        Self::PRIMARY_KEY
            .iter()
            .map(|pk| {
                row.iter()
                    .find(|(name, _)| name == pk)
                    .map_or(Value::Null, |(_, v)| v.clone())
            })
            .collect()
    }

    /// Check if this is a new record (every key value is NULL).
    fn is_new(&self) -> bool {
        self.primary_key_value().iter().all(Value::is_null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqlType;

    #[derive(Debug)]
    struct LineItem {
        order_id: i64,
        line_no: i32,
        sku: Option<String>,
    }

    impl Model for LineItem {
        const TABLE_NAME: &'static str = "line_items";
        const PRIMARY_KEY: &'static [&'static str] = &["order_id", "line_no"];

        fn fields() -> &'static [FieldInfo] {
            static FIELDS: &[FieldInfo] = &[
                FieldInfo::new("order_id", "order_id", SqlType::BigInt).primary_key(true),
                FieldInfo::new("line_no", "line_no", SqlType::Integer).primary_key(true),
                FieldInfo::new("sku", "sku", SqlType::Text).nullable(true),
            ];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("order_id", Value::BigInt(self.order_id)),
                ("line_no", Value::Int(self.line_no)),
                ("sku", Value::from(self.sku.clone())),
            ]
        }
    }

    #[derive(Debug)]
    struct Draft {
        id: Option<i64>,
    }

    impl Model for Draft {
        const TABLE_NAME: &'static str = "drafts";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];

        fn fields() -> &'static [FieldInfo] {
            &[]
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("id", Value::from(self.id))]
        }
    }

    #[test]
    fn test_default_primary_key_value_follows_declared_order() {
        let item = LineItem {
            order_id: 7,
            line_no: 2,
            sku: None,
        };
        assert_eq!(
            item.primary_key_value(),
            vec![Value::BigInt(7), Value::Int(2)]
        );
        assert!(!item.is_new());
    }

    #[test]
    fn test_is_new_when_key_is_null() {
        assert!(Draft { id: None }.is_new());
        assert!(!Draft { id: Some(1) }.is_new());
    }
}
