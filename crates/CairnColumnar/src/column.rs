//! Column expressions.
//!
//! A [`Column`] is a pure expression over the columns of a row: references,
//! literals, comparisons, arithmetic, conditionals, struct field access and
//! array construction. Columns are cheap to clone (the expression tree is
//! reference counted) and are evaluated only when a dataset is collected.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// A row-level function injected into a plan, used for operations that are
/// expressed as dataset-level calls but implemented outside the substrate
/// (for example terminology translation). The function receives the input
/// cell and returns the output cell; errors abort execution of the plan.
pub type MapFn = dyn Fn(&Value) -> Result<Value, String> + Send + Sync;

/// An expression over dataset columns.
#[derive(Clone)]
pub struct Column {
    pub(crate) expr: Arc<Expr>,
}

pub(crate) enum Expr {
    Named(String),
    Literal(Value),
    Binary {
        op: BinaryOp,
        left: Column,
        right: Column,
    },
    Not(Column),
    IsNull(Column),
    When {
        branches: Vec<(Column, Column)>,
        otherwise: Option<Column>,
    },
    GetField {
        base: Column,
        name: String,
    },
    MakeArray(Vec<Column>),
    MakeStruct(Vec<(String, Column)>),
    ConcatArrays(Column, Column),
    Coalesce(Vec<Column>),
    Map {
        input: Column,
        label: String,
        func: Arc<MapFn>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Xor,
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Concat,
}

impl Column {
    fn new(expr: Expr) -> Self {
        Column { expr: Arc::new(expr) }
    }

    fn binary(self, op: BinaryOp, other: Column) -> Column {
        Column::new(Expr::Binary { op, left: self, right: other })
    }

    pub fn eq(self, other: Column) -> Column {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn not_eq(self, other: Column) -> Column {
        self.binary(BinaryOp::NotEq, other)
    }

    pub fn lt(self, other: Column) -> Column {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn lt_eq(self, other: Column) -> Column {
        self.binary(BinaryOp::LtEq, other)
    }

    pub fn gt(self, other: Column) -> Column {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn gt_eq(self, other: Column) -> Column {
        self.binary(BinaryOp::GtEq, other)
    }

    pub fn and(self, other: Column) -> Column {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: Column) -> Column {
        self.binary(BinaryOp::Or, other)
    }

    pub fn xor(self, other: Column) -> Column {
        self.binary(BinaryOp::Xor, other)
    }

    pub fn add(self, other: Column) -> Column {
        self.binary(BinaryOp::Add, other)
    }

    pub fn sub(self, other: Column) -> Column {
        self.binary(BinaryOp::Sub, other)
    }

    pub fn mul(self, other: Column) -> Column {
        self.binary(BinaryOp::Mul, other)
    }

    /// Decimal division; integer operands are promoted.
    pub fn div(self, other: Column) -> Column {
        self.binary(BinaryOp::Div, other)
    }

    /// Truncated integer division.
    pub fn int_div(self, other: Column) -> Column {
        self.binary(BinaryOp::IntDiv, other)
    }

    pub fn modulo(self, other: Column) -> Column {
        self.binary(BinaryOp::Mod, other)
    }

    /// String concatenation. Null operands propagate as null; callers that
    /// want empty-string semantics should coalesce first.
    pub fn concat(self, other: Column) -> Column {
        self.binary(BinaryOp::Concat, other)
    }

    pub fn not(self) -> Column {
        Column::new(Expr::Not(self))
    }

    pub fn is_null(self) -> Column {
        Column::new(Expr::IsNull(self))
    }

    pub fn is_not_null(self) -> Column {
        Column::new(Expr::IsNull(self)).not()
    }

    /// Accesses a field of a struct-valued column. Missing fields and
    /// non-struct cells evaluate to null.
    pub fn get_field(self, name: &str) -> Column {
        Column::new(Expr::GetField { base: self, name: name.to_string() })
    }

    /// Attaches a row-level map function to this column; see [`MapFn`].
    /// The label appears in plan debug output in place of the opaque
    /// function.
    pub fn map_value(self, label: &str, func: Arc<MapFn>) -> Column {
        Column::new(Expr::Map { input: self, label: label.to_string(), func })
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr.as_ref() {
            Expr::Named(name) => write!(f, "col({})", name),
            Expr::Literal(v) => write!(f, "lit({:?})", v),
            Expr::Binary { op, left, right } => write!(f, "({:?} {:?} {:?})", left, op, right),
            Expr::Not(c) => write!(f, "not({:?})", c),
            Expr::IsNull(c) => write!(f, "is_null({:?})", c),
            Expr::When { branches, otherwise } => {
                write!(f, "when({} branches, otherwise: {:?})", branches.len(), otherwise)
            }
            Expr::GetField { base, name } => write!(f, "{:?}.{}", base, name),
            Expr::MakeArray(items) => write!(f, "array({} items)", items.len()),
            Expr::MakeStruct(fields) => write!(f, "struct({} fields)", fields.len()),
            Expr::ConcatArrays(a, b) => write!(f, "concat_arrays({:?}, {:?})", a, b),
            Expr::Coalesce(items) => write!(f, "coalesce({} items)", items.len()),
            Expr::Map { input, label, .. } => write!(f, "map[{}]({:?})", label, input),
        }
    }
}

/// References a column by name.
pub fn col(name: &str) -> Column {
    Column::new(Expr::Named(name.to_string()))
}

/// Injects a literal value as a column.
pub fn lit(value: impl Into<Value>) -> Column {
    Column::new(Expr::Literal(value.into()))
}

/// Builds an array-valued column from element columns.
pub fn make_array(items: Vec<Column>) -> Column {
    Column::new(Expr::MakeArray(items))
}

/// Builds a struct-valued column from named field columns.
pub fn make_struct(fields: Vec<(&str, Column)>) -> Column {
    Column::new(Expr::MakeStruct(
        fields.into_iter().map(|(n, c)| (n.to_string(), c)).collect(),
    ))
}

/// Concatenates two array-valued columns. Null on either side propagates
/// as null; callers that need a one-sided default build it with [`when`].
pub fn concat_arrays(left: Column, right: Column) -> Column {
    Column::new(Expr::ConcatArrays(left, right))
}

/// First non-null of the given columns.
pub fn coalesce(items: Vec<Column>) -> Column {
    Column::new(Expr::Coalesce(items))
}

/// Starts a conditional column: `when(cond, value).when(...).otherwise(v)`.
/// Without an `otherwise`, unmatched rows evaluate to null.
pub fn when(condition: Column, value: Column) -> WhenColumn {
    WhenColumn { branches: vec![(condition, value)] }
}

/// Builder for multi-branch conditional columns.
pub struct WhenColumn {
    branches: Vec<(Column, Column)>,
}

impl WhenColumn {
    pub fn when(mut self, condition: Column, value: Column) -> WhenColumn {
        self.branches.push((condition, value));
        self
    }

    pub fn otherwise(self, value: Column) -> Column {
        Column { expr: Arc::new(Expr::When { branches: self.branches, otherwise: Some(value) }) }
    }

    /// Finishes the conditional without a default branch.
    pub fn end(self) -> Column {
        Column { expr: Arc::new(Expr::When { branches: self.branches, otherwise: None }) }
    }
}
