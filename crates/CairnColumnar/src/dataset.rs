//! The immutable, lazily-evaluated dataset handle.
//!
//! A [`Dataset`] wraps a logical plan node; every transformation returns a
//! new handle referencing its input, so handles are cheap to clone and safe
//! to share. Schemas are derived from the plan without touching data, which
//! is how construction-time errors (unknown or duplicate columns) surface
//! before anything executes.

use std::fmt;
use std::sync::Arc;

use crate::column::Column;
use crate::error::DatasetError;
use crate::exec;
use crate::value::Value;

/// A handle to a logical dataset plan.
#[derive(Clone)]
pub struct Dataset {
    pub(crate) plan: Arc<Plan>,
}

pub(crate) enum Plan {
    Source {
        name: String,
        columns: Vec<String>,
        rows: Arc<Vec<Vec<Value>>>,
    },
    Select {
        input: Dataset,
        columns: Vec<String>,
    },
    WithColumn {
        input: Dataset,
        name: String,
        expr: Column,
    },
    Filter {
        input: Dataset,
        predicate: Column,
    },
    Join {
        left: Dataset,
        right: Dataset,
        left_on: Column,
        right_on: Column,
        how: JoinType,
    },
    ExplodePos {
        input: Dataset,
        array: Column,
        value_column: String,
        pos_column: String,
    },
    RowIndex {
        input: Dataset,
        partition_by: Column,
        order_by: Column,
        name: String,
    },
    Aggregate {
        input: Dataset,
        group_by: Vec<(String, Column)>,
        aggregates: Vec<(String, Aggregate)>,
    },
    Union {
        left: Dataset,
        right: Dataset,
    },
    OrderBy {
        input: Dataset,
        keys: Vec<Column>,
    },
}

/// How two datasets are merged by an equi-join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
}

/// Aggregate expressions usable under [`Dataset::aggregate`].
///
/// `First` takes the first non-null value in row order, so callers that
/// care about ordering sort the input first.
#[derive(Debug)]
pub enum Aggregate {
    Max(Column),
    Min(Column),
    Sum(Column),
    Count(Column),
    First(Column),
}

/// A materialized dataset: column names plus rows of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Index of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of a named column, in row order. Panics on an unknown
    /// name; this is a test convenience, not API surface for executors.
    pub fn column_values(&self, name: &str) -> Vec<&Value> {
        let idx = self
            .column_index(name)
            .unwrap_or_else(|| panic!("no column named '{}' in {:?}", name, self.columns));
        self.rows.iter().map(|row| &row[idx]).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Dataset {
    /// Creates a leaf dataset over in-memory rows.
    pub fn from_rows(
        name: &str,
        columns: Vec<&str>,
        rows: Vec<Vec<Value>>,
    ) -> Dataset {
        Dataset {
            plan: Arc::new(Plan::Source {
                name: name.to_string(),
                columns: columns.into_iter().map(str::to_string).collect(),
                rows: Arc::new(rows),
            }),
        }
    }

    fn derive(plan: Plan) -> Dataset {
        Dataset { plan: Arc::new(plan) }
    }

    /// Narrows the dataset to the named columns, in the given order.
    pub fn select(&self, columns: &[&str]) -> Dataset {
        Dataset::derive(Plan::Select {
            input: self.clone(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    /// Adds (or replaces) a column computed from an expression.
    pub fn with_column(&self, name: &str, expr: Column) -> Dataset {
        Dataset::derive(Plan::WithColumn {
            input: self.clone(),
            name: name.to_string(),
            expr,
        })
    }

    /// Keeps only rows where the predicate evaluates to exactly `true`.
    /// Null predicates drop the row.
    pub fn filter(&self, predicate: Column) -> Dataset {
        Dataset::derive(Plan::Filter { input: self.clone(), predicate })
    }

    /// Equi-join on one key expression per side. Null keys never match;
    /// a left-outer join pads unmatched left rows with nulls.
    pub fn join(&self, right: &Dataset, left_on: Column, right_on: Column, how: JoinType) -> Dataset {
        Dataset::derive(Plan::Join {
            left: self.clone(),
            right: right.clone(),
            left_on,
            right_on,
            how,
        })
    }

    /// Expands an array-valued expression into one row per element,
    /// capturing the element and its zero-based position in two new
    /// columns. Rows whose array is null or empty produce a single row
    /// with null element and null position (outer semantics), so subjects
    /// without values survive the expansion.
    pub fn explode_with_position(
        &self,
        array: Column,
        value_column: &str,
        pos_column: &str,
    ) -> Dataset {
        Dataset::derive(Plan::ExplodePos {
            input: self.clone(),
            array,
            value_column: value_column.to_string(),
            pos_column: pos_column.to_string(),
        })
    }

    /// Attaches a zero-based rank column computed per partition in the
    /// order of `order_by` (nulls last, ties stable). Position capture for
    /// indexer-style operations.
    pub fn with_row_index(&self, partition_by: Column, order_by: Column, name: &str) -> Dataset {
        Dataset::derive(Plan::RowIndex {
            input: self.clone(),
            partition_by,
            order_by,
            name: name.to_string(),
        })
    }

    /// Groups by the given key expressions and computes aggregates. The
    /// output schema is the group names followed by the aggregate names,
    /// one row per distinct key, in first-seen order.
    pub fn aggregate(
        &self,
        group_by: Vec<(&str, Column)>,
        aggregates: Vec<(&str, Aggregate)>,
    ) -> Dataset {
        Dataset::derive(Plan::Aggregate {
            input: self.clone(),
            group_by: group_by
                .into_iter()
                .map(|(n, c)| (n.to_string(), c))
                .collect(),
            aggregates: aggregates
                .into_iter()
                .map(|(n, a)| (n.to_string(), a))
                .collect(),
        })
    }

    /// Concatenates two datasets with identical schemas.
    pub fn union_all(&self, other: &Dataset) -> Dataset {
        Dataset::derive(Plan::Union { left: self.clone(), right: other.clone() })
    }

    /// Stable sort by the given key expressions, nulls last.
    pub fn order_by(&self, keys: Vec<Column>) -> Dataset {
        Dataset::derive(Plan::OrderBy { input: self.clone(), keys })
    }

    /// Derives the output schema of this plan without executing it.
    pub fn schema(&self) -> Result<Vec<String>, DatasetError> {
        match self.plan.as_ref() {
            Plan::Source { columns, .. } => Ok(columns.clone()),
            Plan::Select { input, columns } => {
                let schema = input.schema()?;
                for name in columns {
                    if !schema.contains(name) {
                        return Err(DatasetError::UnknownColumn {
                            name: name.clone(),
                            context: "select".to_string(),
                        });
                    }
                }
                Ok(columns.clone())
            }
            Plan::WithColumn { input, name, .. } => {
                let mut schema = input.schema()?;
                if !schema.contains(name) {
                    schema.push(name.clone());
                }
                Ok(schema)
            }
            Plan::Filter { input, .. } => input.schema(),
            Plan::Join { left, right, .. } => {
                let mut schema = left.schema()?;
                for name in right.schema()? {
                    if schema.contains(&name) {
                        return Err(DatasetError::DuplicateColumn {
                            name,
                            context: "join".to_string(),
                        });
                    }
                    schema.push(name);
                }
                Ok(schema)
            }
            Plan::ExplodePos { input, value_column, pos_column, .. } => {
                let mut schema = input.schema()?;
                for name in [value_column, pos_column] {
                    if schema.contains(name) {
                        return Err(DatasetError::DuplicateColumn {
                            name: name.clone(),
                            context: "explode".to_string(),
                        });
                    }
                    schema.push(name.clone());
                }
                Ok(schema)
            }
            Plan::RowIndex { input, name, .. } => {
                let mut schema = input.schema()?;
                if schema.contains(name) {
                    return Err(DatasetError::DuplicateColumn {
                        name: name.clone(),
                        context: "row index".to_string(),
                    });
                }
                schema.push(name.clone());
                Ok(schema)
            }
            Plan::Aggregate { group_by, aggregates, .. } => {
                let mut schema: Vec<String> = group_by.iter().map(|(n, _)| n.clone()).collect();
                schema.extend(aggregates.iter().map(|(n, _)| n.clone()));
                Ok(schema)
            }
            Plan::Union { left, right } => {
                let ls = left.schema()?;
                let rs = right.schema()?;
                if ls != rs {
                    return Err(DatasetError::SchemaMismatch(format!(
                        "union inputs differ: {:?} vs {:?}",
                        ls, rs
                    )));
                }
                Ok(ls)
            }
            Plan::OrderBy { input, .. } => input.schema(),
        }
    }

    /// Executes the plan with the reference interpreter.
    pub fn collect(&self) -> Result<Table, DatasetError> {
        exec::execute(self)
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.plan.as_ref() {
            Plan::Source { name, columns, rows } => {
                write!(f, "Source[{} {:?} ({} rows)]", name, columns, rows.len())
            }
            Plan::Select { input, columns } => write!(f, "Select[{:?}]({:?})", columns, input),
            Plan::WithColumn { input, name, expr } => {
                write!(f, "WithColumn[{} = {:?}]({:?})", name, expr, input)
            }
            Plan::Filter { input, predicate } => write!(f, "Filter[{:?}]({:?})", predicate, input),
            Plan::Join { left, right, how, .. } => {
                write!(f, "Join[{:?}]({:?}, {:?})", how, left, right)
            }
            Plan::ExplodePos { input, value_column, pos_column, .. } => {
                write!(f, "Explode[{}, {}]({:?})", value_column, pos_column, input)
            }
            Plan::RowIndex { input, name, .. } => write!(f, "RowIndex[{}]({:?})", name, input),
            Plan::Aggregate { input, group_by, aggregates } => write!(
                f,
                "Aggregate[{} keys, {} aggs]({:?})",
                group_by.len(),
                aggregates.len(),
                input
            ),
            Plan::Union { left, right } => write!(f, "Union({:?}, {:?})", left, right),
            Plan::OrderBy { input, keys } => write!(f, "OrderBy[{} keys]({:?})", keys.len(), input),
        }
    }
}
