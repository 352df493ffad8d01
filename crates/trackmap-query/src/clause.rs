//! Clauses a `Select` is assembled from.

use crate::expr::{Dialect, Expr};
use trackmap_core::Value;

/// WHERE clause: the conjunction of every filter added so far.
#[derive(Debug, Clone)]
pub struct Where {
    expr: Expr,
}

impl Where {
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    /// Narrow the clause to rows that also satisfy `expr`.
    ///
    /// Each side keeps its own grouping, so an OR predicate never leaks
    /// into the surrounding conjunction.
    pub fn and(self, expr: Expr) -> Self {
        Self {
            expr: self.expr.and(expr),
        }
    }

    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_offset(Dialect::default(), 0)
    }

    /// Build with placeholders numbered after `offset` earlier parameters.
    pub fn build_with_offset(&self, dialect: Dialect, offset: usize) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = self.expr.build_with_dialect(dialect, &mut params, offset);
        (sql, params)
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderBy {
    pub fn new(expr: Expr, direction: OrderDirection) -> Self {
        Self { expr, direction }
    }

    /// Render the term, binding any literals into `params`.
    pub fn build(&self, dialect: Dialect, params: &mut Vec<Value>, offset: usize) -> String {
        let sql = self.expr.build_with_dialect(dialect, params, offset);
        match self.direction {
            OrderDirection::Asc => format!("{sql} ASC"),
            OrderDirection::Desc => format!("{sql} DESC"),
        }
    }
}

/// LIMIT clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub u64);

/// OFFSET clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset(pub u64);
