//! # Cairn Columnar Dataset Substrate
//!
//! This crate provides the dataset abstraction that the Cairn FHIRPath
//! compiler emits operations against: an immutable, columnar, lazily
//! evaluated table of typed values.
//!
//! A [`Dataset`] is a handle to a logical plan. Every operation (column
//! selection, aliasing, filtering, joining, array expansion, grouping,
//! ordering) produces a new `Dataset` that references its input; nothing is
//! computed until [`Dataset::collect`] is called. This mirrors the way the
//! compiler works: it only ever *describes* transformations, and leaves
//! execution to whatever consumes the compiled output.
//!
//! ## Key types
//!
//! - [`Value`]: a single typed cell (null, boolean, integer, decimal,
//!   string, date/time, array, struct).
//! - [`Column`]: an expression over the columns of a row (references,
//!   literals, comparisons, arithmetic, conditionals, struct field access,
//!   array construction, row-level map functions).
//! - [`Dataset`]: the immutable plan handle.
//! - [`Table`]: the materialized result of `collect()`.
//!
//! ## Reference interpreter
//!
//! `collect()` runs a straightforward single-process interpreter over the
//! plan. It exists so that compiled plans have observable row semantics in
//! tests and in the downstream executors; it is not a query optimizer and
//! does not try to be one.

mod column;
mod dataset;
mod error;
mod exec;
mod value;

pub use column::{Column, MapFn, coalesce, col, concat_arrays, lit, make_array, make_struct, when};
pub use dataset::{Aggregate, Dataset, JoinType, Table};
pub use error::DatasetError;
pub use value::Value;
