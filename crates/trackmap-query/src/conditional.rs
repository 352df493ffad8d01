//! Conditional pipeline combinators.
//!
//! Each combinator applies its operation only when `condition` is true and
//! otherwise passes the source through untouched. They come in two forms:
//!
//! - methods on [`Select`], which stay deferred and end up in the generated SQL
//! - [`ConditionalIterExt`], which works on any in-memory iterator
//!
//! Operations that take a count (`offset_if`, `limit_if`, `skip_if`,
//! `take_if`) accept it as an `Option`; a true condition with `None` is an
//! invalid argument.
//!
//! # Example
//!
//! ```ignore
//! let query = select!(Invoice)
//!     .filter_if(only_open, Expr::col("status").eq("open"))
//!     .order_by_desc_if(newest_first, Expr::col("issued_at"))
//!     .offset_if(paged, page_start)?
//!     .limit_if(paged, page_size)?;
//! ```

use crate::expr::Expr;
use crate::select::Select;
use std::cmp::Reverse;
use std::iter::{Filter, Skip, Take};
use trackmap_core::{InvalidArgumentError, Model, Result};

fn traced(step: &'static str, condition: bool) -> bool {
    tracing::trace!(step, applied = condition, "Conditional step");
    condition
}

fn require<T>(
    step: &'static str,
    condition: bool,
    value: Option<T>,
    argument: &'static str,
) -> Result<Option<T>> {
    match (traced(step, condition), value) {
        (false, _) => Ok(None),
        (true, Some(value)) => Ok(Some(value)),
        (true, None) => Err(InvalidArgumentError::required(argument).into()),
    }
}

// ============================================================================
// Deferred (query builder)
// ============================================================================

impl<M: Model> Select<M> {
    /// Add a WHERE condition when `condition` is true.
    ///
    /// The condition is ANDed with earlier filters as a single group.
    pub fn filter_if(self, condition: bool, expr: Expr) -> Self {
        if traced("filter_if", condition) {
            self.filter(expr)
        } else {
            self
        }
    }

    /// Set OFFSET when `condition` is true.
    pub fn offset_if(self, condition: bool, n: Option<u64>) -> Result<Self> {
        Ok(match require("offset_if", condition, n, "offset")? {
            Some(n) => self.offset(n),
            None => self,
        })
    }

    /// Set LIMIT when `condition` is true.
    pub fn limit_if(self, condition: bool, n: Option<u64>) -> Result<Self> {
        Ok(match require("limit_if", condition, n, "limit")? {
            Some(n) => self.limit(n),
            None => self,
        })
    }

    /// Add a descending ORDER BY term when `condition` is true.
    pub fn order_by_desc_if(self, condition: bool, expr: Expr) -> Self {
        if traced("order_by_desc_if", condition) {
            self.order_by(expr.desc())
        } else {
            self
        }
    }
}

// ============================================================================
// Eager (iterators)
// ============================================================================

/// Iterator that is either the adapted source or the source itself.
#[derive(Debug, Clone)]
pub enum Conditional<A, B> {
    /// The operation was applied.
    Applied(A),
    /// The condition was false; yields the source unchanged.
    Skipped(B),
}

impl<A, B> Conditional<A, B> {
    /// Whether the operation was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Conditional::Applied(_))
    }
}

impl<A, B> Iterator for Conditional<A, B>
where
    A: Iterator,
    B: Iterator<Item = A::Item>,
{
    type Item = A::Item;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Conditional::Applied(it) => it.next(),
            Conditional::Skipped(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Conditional::Applied(it) => it.size_hint(),
            Conditional::Skipped(it) => it.size_hint(),
        }
    }
}

impl<A, B> DoubleEndedIterator for Conditional<A, B>
where
    A: DoubleEndedIterator,
    B: DoubleEndedIterator<Item = A::Item>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        match self {
            Conditional::Applied(it) => it.next_back(),
            Conditional::Skipped(it) => it.next_back(),
        }
    }
}

/// Conditional adapters for any iterator.
pub trait ConditionalIterExt: Iterator + Sized {
    /// Keep only items matching `predicate` when `condition` is true.
    fn filter_if<P>(self, condition: bool, predicate: P) -> Conditional<Filter<Self, P>, Self>
    where
        P: FnMut(&Self::Item) -> bool,
    {
        if traced("filter_if", condition) {
            Conditional::Applied(self.filter(predicate))
        } else {
            Conditional::Skipped(self)
        }
    }

    /// Skip the first `n` items when `condition` is true.
    fn skip_if(self, condition: bool, n: Option<usize>) -> Result<Conditional<Skip<Self>, Self>> {
        Ok(match require("skip_if", condition, n, "count")? {
            Some(n) => Conditional::Applied(self.skip(n)),
            None => Conditional::Skipped(self),
        })
    }

    /// Yield at most `n` items when `condition` is true.
    fn take_if(self, condition: bool, n: Option<usize>) -> Result<Conditional<Take<Self>, Self>> {
        Ok(match require("take_if", condition, n, "count")? {
            Some(n) => Conditional::Applied(self.take(n)),
            None => Conditional::Skipped(self),
        })
    }

    /// Sort by `key` descending when `condition` is true.
    ///
    /// The sort is stable, and `key` is evaluated once per item. Applying it
    /// collects the source.
    fn order_by_desc_if<K, F>(
        self,
        condition: bool,
        mut key: F,
    ) -> Conditional<std::vec::IntoIter<Self::Item>, Self>
    where
        K: Ord,
        F: FnMut(&Self::Item) -> K,
    {
        if traced("order_by_desc_if", condition) {
            let mut items: Vec<Self::Item> = self.collect();
            items.sort_by_cached_key(|item| Reverse(key(item)));
            Conditional::Applied(items.into_iter())
        } else {
            Conditional::Skipped(self)
        }
    }
}

impl<I: Iterator> ConditionalIterExt for I {}
