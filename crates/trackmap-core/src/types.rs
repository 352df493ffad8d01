//! SQL type definitions and value compatibility.

use crate::value::Value;

/// SQL data types a mapped field can declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    // Integer types
    TinyInt,
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,

    // Fixed precision
    Decimal { precision: u8, scale: u8 },

    // Boolean
    Boolean,

    // String types
    VarChar(u32),
    Text,

    // Binary types
    Blob,

    // Date/time types
    Date,
    Time,
    Timestamp,
    TimestampTz,

    // UUID
    Uuid,

    // JSON
    Json,

    // Custom type name
    Custom(&'static str),
}

impl SqlType {
    /// Get the SQL type name for this type.
    pub fn sql_name(&self) -> String {
        match self {
            SqlType::TinyInt => "TINYINT".to_string(),
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Decimal { precision, scale } => format!("DECIMAL({}, {})", precision, scale),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::VarChar(len) => format!("VARCHAR({})", len),
            SqlType::Text => "TEXT".to_string(),
            SqlType::Blob => "BLOB".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::TimestampTz => "TIMESTAMPTZ".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Json => "JSON".to_string(),
            SqlType::Custom(name) => (*name).to_string(),
        }
    }

    /// Check if this type is an integer type.
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt
        )
    }

    /// Check if this type is text-based.
    pub const fn is_text(&self) -> bool {
        matches!(self, SqlType::VarChar(_) | SqlType::Text)
    }

    /// Check whether a runtime value can be stored in a column of this type.
    ///
    /// NULL fits every type. Integer widths are interchangeable since models
    /// commonly widen (`i32` field mapped to a BIGINT column). `Custom` types
    /// accept anything.
    pub fn accepts(&self, value: &Value) -> bool {
        match value {
            Value::Null | Value::Default => true,
            Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => {
                self.is_integer() || matches!(self, SqlType::Custom(_))
            }
            Value::Bool(_) => matches!(self, SqlType::Boolean | SqlType::Custom(_)),
            Value::Float(_) | Value::Double(_) => {
                matches!(self, SqlType::Real | SqlType::Double | SqlType::Custom(_))
            }
            Value::Decimal(_) => matches!(self, SqlType::Decimal { .. } | SqlType::Custom(_)),
            Value::Text(_) => self.is_text() || matches!(self, SqlType::Custom(_)),
            Value::Bytes(_) => matches!(self, SqlType::Blob | SqlType::Custom(_)),
            Value::Date(_) => matches!(self, SqlType::Date | SqlType::Custom(_)),
            Value::Time(_) => matches!(self, SqlType::Time | SqlType::Custom(_)),
            Value::Timestamp(_) | Value::TimestampTz(_) => matches!(
                self,
                SqlType::Timestamp | SqlType::TimestampTz | SqlType::Custom(_)
            ),
            Value::Uuid(_) => matches!(self, SqlType::Uuid | SqlType::Custom(_)),
            Value::Json(_) => matches!(self, SqlType::Json | SqlType::Custom(_)),
            Value::Array(_) => matches!(self, SqlType::Custom(_)),
        }
    }
}
