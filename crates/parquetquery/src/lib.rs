//! # parquetquery - Synchronized Column Iteration over Parquet
//!
//! This crate provides the low-level machinery for executing pushed-down
//! predicates against Parquet files with nested schemas:
//!
//! - [`ColumnIterator`]: scans one leaf column in row order, pruning column
//!   chunks by statistics and filtering decoded values with a [`Predicate`]
//! - [`JoinIterator`], [`LeftJoinIterator`], [`UnionIterator`]: advance
//!   several iterators in lock-step, grouping entries by [`RowNumber`]
//!   prefix at a definition level
//! - [`GroupPredicate`]: a per-group callback that filters groups and
//!   assembles composite results through the typed `other_entries` side
//!   channel
//!
//! The intended use is a tree: column iterators at the leaves, joins at the
//! inner nodes, and a collector at each join turning raw column entries
//! into domain objects. The whole tree executes on the caller's thread;
//! cancellation is cooperative via a `CancellationToken` checked between
//! group emissions.

pub mod error;
pub mod iterator;
pub mod join;
pub mod predicate;
pub mod row_number;
pub mod value;

pub use error::{Error, Result};
pub use iterator::{ColumnIterator, Entry, GroupIterator, GroupPredicate, IteratorResult};
pub use join::{JoinIterator, LeftJoinIterator, UnionIterator};
pub use predicate::{
    new_float_predicate, new_int_between_predicate, new_int_predicate, or_predicates,
    AndPredicate, BoolPredicate, FloatPredicate, GenericPredicate, IntPredicate, OrPredicate,
    Predicate, PredicateBox, RegexInPredicate, StringInPredicate,
};
pub use row_number::{RowNumber, MAX_DEFINITION_LEVEL};
pub use value::CellValue;
