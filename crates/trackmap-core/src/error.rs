//! Error types for trackmap operations.
//!
//! A resolution miss is never an error: lookups return `Ok(None)` and
//! conditional detaches return `Ok(false)`. Everything here is fatal to the
//! call that produced it and propagates unchanged to the caller.

use std::fmt;

/// The primary error type for all trackmap operations.
#[derive(Debug)]
pub enum Error {
    /// The record type is not mapped, or has no declared key
    Metadata(MetadataError),
    /// A declared key field cannot be read from an instance
    FieldAccess(FieldAccessError),
    /// A caller-supplied argument violates the operation's contract
    InvalidArgument(InvalidArgumentError),
    /// Custom error with message
    Custom(String),
}

/// Mapping metadata could not describe the requested type.
#[derive(Debug, Clone)]
pub struct MetadataError {
    pub kind: MetadataErrorKind,
    /// Rust type name of the record type
    pub type_name: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataErrorKind {
    /// The type was never registered with the mapping registry
    Unmapped,
    /// The type is mapped but declares no primary key field
    NoKey,
}

/// A key field could not be read from a record instance.
#[derive(Debug, Clone)]
pub struct FieldAccessError {
    pub kind: FieldAccessErrorKind,
    /// Table of the record type
    pub table: &'static str,
    /// Field that failed
    pub field: String,
    /// Declared SQL type, for mismatches
    pub expected: Option<String>,
    /// Runtime value type name, for mismatches
    pub actual: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccessErrorKind {
    /// The field is not present on the type
    Missing,
    /// The field's runtime value does not fit its declared type
    TypeMismatch,
    /// The value cannot be compared for identity (NaN)
    NotComparable,
}

/// An argument was absent or malformed where the contract requires it.
#[derive(Debug, Clone)]
pub struct InvalidArgumentError {
    /// Name of the offending argument
    pub argument: &'static str,
    pub message: String,
}

impl MetadataError {
    /// The type has no mapping.
    pub fn unmapped(type_name: &'static str) -> Self {
        Self {
            kind: MetadataErrorKind::Unmapped,
            type_name,
            message: format!("type `{type_name}` is not mapped"),
        }
    }

    /// The type declares no key.
    pub fn no_key(type_name: &'static str) -> Self {
        Self {
            kind: MetadataErrorKind::NoKey,
            type_name,
            message: format!("type `{type_name}` declares no primary key"),
        }
    }
}

impl FieldAccessError {
    /// The field does not exist on the record type.
    pub fn missing(table: &'static str, field: impl Into<String>) -> Self {
        Self {
            kind: FieldAccessErrorKind::Missing,
            table,
            field: field.into(),
            expected: None,
            actual: None,
        }
    }

    /// The field's value has the wrong runtime type.
    pub fn type_mismatch(
        table: &'static str,
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: &'static str,
    ) -> Self {
        Self {
            kind: FieldAccessErrorKind::TypeMismatch,
            table,
            field: field.into(),
            expected: Some(expected.into()),
            actual: Some(actual),
        }
    }

    /// The field holds a value that never equals itself.
    pub fn not_comparable(table: &'static str, field: impl Into<String>, actual: &'static str) -> Self {
        Self {
            kind: FieldAccessErrorKind::NotComparable,
            table,
            field: field.into(),
            expected: None,
            actual: Some(actual),
        }
    }
}

impl InvalidArgumentError {
    pub fn new(argument: &'static str, message: impl Into<String>) -> Self {
        Self {
            argument,
            message: message.into(),
        }
    }

    /// A conditional step was enabled without the value it needs.
    pub fn required(argument: &'static str) -> Self {
        Self::new(
            argument,
            format!("`{argument}` is required when the condition is true"),
        )
    }
}

impl Error {
    /// Is this a metadata error (unmapped type or missing key declaration)?
    pub fn is_metadata_error(&self) -> bool {
        matches!(self, Error::Metadata(_))
    }

    /// Is this a field access error?
    pub fn is_field_access_error(&self) -> bool {
        matches!(self, Error::FieldAccess(_))
    }

    /// Is this an invalid argument error?
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Metadata(e) => write!(f, "Metadata error: {}", e),
            Error::FieldAccess(e) => write!(f, "Field access error: {}", e),
            Error::InvalidArgument(e) => write!(f, "Invalid argument: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Metadata(e) => Some(e),
            Error::FieldAccess(e) => Some(e),
            Error::InvalidArgument(e) => Some(e),
            Error::Custom(_) => None,
        }
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for FieldAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldAccessErrorKind::Missing => {
                write!(f, "field '{}' not found on '{}'", self.field, self.table)
            }
            FieldAccessErrorKind::TypeMismatch => write!(
                f,
                "field '{}' on '{}': expected {}, found {}",
                self.field,
                self.table,
                self.expected.as_deref().unwrap_or("?"),
                self.actual.unwrap_or("?")
            ),
            FieldAccessErrorKind::NotComparable => write!(
                f,
                "field '{}' on '{}' holds a NaN {} and cannot identify a record",
                self.field,
                self.table,
                self.actual.unwrap_or("?")
            ),
        }
    }
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MetadataError {}
impl std::error::Error for FieldAccessError {}
impl std::error::Error for InvalidArgumentError {}

impl From<MetadataError> for Error {
    fn from(err: MetadataError) -> Self {
        Error::Metadata(err)
    }
}

impl From<FieldAccessError> for Error {
    fn from(err: FieldAccessError) -> Self {
        Error::FieldAccess(err)
    }
}

impl From<InvalidArgumentError> for Error {
    fn from(err: InvalidArgumentError) -> Self {
        Error::InvalidArgument(err)
    }
}

/// Result type alias for trackmap operations.
pub type Result<T> = std::result::Result<T, Error>;
