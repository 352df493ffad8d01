//! Query construction and conditional pipelines for trackmap.
//!
//! `trackmap-query` is the **query construction layer**. It provides a fluent
//! `Select` builder and a small expression DSL that turn `Model` metadata
//! into SQL plus parameters, along with conditional combinators that apply a
//! pipeline step only when a flag is set.
//!
//! # Role In The Architecture
//!
//! - **Query macro**: `select!` starts a typed query.
//! - **Expression DSL**: `Expr` builds WHERE and ORDER BY clauses safely.
//! - **Dialect support**: placeholders for Postgres, MySQL, and SQLite.
//! - **Conditional combinators**: `filter_if`, `offset_if`, `limit_if` and
//!   `order_by_desc_if` on the builder; `ConditionalIterExt` for iterators.

pub mod clause;
pub mod conditional;
pub mod expr;
pub mod select;

pub use clause::{Limit, Offset, OrderBy, OrderDirection, Where};
pub use conditional::{Conditional, ConditionalIterExt};
pub use expr::{BinaryOp, Dialect, Expr, UnaryOp};
pub use select::Select;

/// Create a SELECT query for a model.
///
/// # Example
///
/// ```ignore
/// let (sql, params) = select!(Invoice)
///     .filter(Expr::col("total").gt(100))
///     .order_by(Expr::col("issued_at").desc())
///     .build();
/// ```
#[macro_export]
macro_rules! select {
    ($model:ty) => {
        $crate::Select::<$model>::new()
    };
}
