//! trackmap - identity-map resolution and conditional query helpers.
//!
//! trackmap is a utility layer for change-tracking contexts, providing:
//!
//! - Key resolution from mapping metadata, including composite keys
//! - Lookup of the tracked instance sharing a template's key
//! - Detachment of tracked instances without touching the backing store
//! - Conditional filter / skip / take / order-by-descending combinators for
//!   both deferred queries and in-memory iterators
//!
//! # Quick Start
//!
//! ```ignore
//! use trackmap::prelude::*;
//!
//! let mut session = Session::new();
//! for id in [1, 2, 3] {
//!     session.attach(Invoice { id, total_cents: 0 })?;
//! }
//!
//! // Detach invoice 2 given any instance carrying its key
//! session.detach_if_tracked(&Invoice { id: 2, total_cents: 0 })?;
//! assert_eq!(session.tracked_count_of::<Invoice>(), 2);
//!
//! // Page only when asked to
//! let (sql, params) = select!(Invoice)
//!     .filter_if(open_only, Expr::col("status").eq("open"))
//!     .limit_if(paged, page_size)?
//!     .build();
//! ```

// Re-export all public types from sub-crates
pub use trackmap_core::{
    EntityMapping, Error, FieldAccessError, FieldAccessErrorKind, FieldInfo, GetOrDefault,
    InvalidArgumentError, KeyFieldReader, MappingRegistry, MetadataError, MetadataErrorKind,
    Model, ModelMetadata, Result, SqlType, Value,
};

pub use trackmap_session::{
    DetachExt, EntityKey, FieldEquals, IdentityMap, KeyPredicate, KeyedLookup, ModelRef,
    Session, SessionConfig, SessionMetadata, TrackedSet, TrackingContext,
    build_equality_predicate, detach, detach_all_if_tracked, detach_all_local_if_tracked,
    detach_if_tracked, detach_local_if_tracked, find_in_local_cache, resolve_key_fields,
    resolve_tracked_by_key,
};

pub use trackmap_query::{
    BinaryOp, Conditional, ConditionalIterExt, Dialect, Expr, Limit, Offset, OrderBy, Select,
    UnaryOp, Where, select,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use trackmap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Query building
        ConditionalIterExt,
        // Session
        DetachExt,
        Error,
        Expr,
        FieldInfo,
        GetOrDefault,
        KeyedLookup,
        Model,
        ModelRef,
        OrderBy,
        Result,
        Select,
        Session,
        SessionConfig,
        SqlType,
        TrackingContext,
        Value,
        // Macros
        select,
    };
}
