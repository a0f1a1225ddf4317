//! Reference interpreter for dataset plans.
//!
//! Row-at-a-time evaluation, no optimization. Joins are hash joins on the
//! key expression, aggregation is hash grouping in first-seen key order,
//! sorts are stable with nulls last.

use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::trace;

use crate::column::{BinaryOp, Column, Expr};
use crate::dataset::{Aggregate, Dataset, JoinType, Plan, Table};
use crate::error::DatasetError;
use crate::value::Value;

pub(crate) fn execute(dataset: &Dataset) -> Result<Table, DatasetError> {
    let columns = dataset.schema()?;
    let rows = execute_rows(dataset)?;
    Ok(Table { columns, rows })
}

fn execute_rows(dataset: &Dataset) -> Result<Vec<Vec<Value>>, DatasetError> {
    match dataset.plan.as_ref() {
        Plan::Source { name, columns, rows } => {
            for row in rows.iter() {
                if row.len() != columns.len() {
                    return Err(DatasetError::SchemaMismatch(format!(
                        "source '{}' row has {} cells, schema has {} columns",
                        name,
                        row.len(),
                        columns.len()
                    )));
                }
            }
            Ok(rows.as_ref().clone())
        }
        Plan::Select { input, columns } => {
            let in_schema = input.schema()?;
            let rows = execute_rows(input)?;
            let indexes: Vec<usize> = columns
                .iter()
                .map(|name| {
                    in_schema.iter().position(|c| c == name).ok_or_else(|| {
                        DatasetError::UnknownColumn {
                            name: name.clone(),
                            context: "select".to_string(),
                        }
                    })
                })
                .collect::<Result<_, _>>()?;
            Ok(rows
                .into_iter()
                .map(|row| indexes.iter().map(|&i| row[i].clone()).collect())
                .collect())
        }
        Plan::WithColumn { input, name, expr } => {
            let in_schema = input.schema()?;
            let rows = execute_rows(input)?;
            let existing = in_schema.iter().position(|c| c == name);
            let mut out = Vec::with_capacity(rows.len());
            for mut row in rows {
                let value = eval(expr, &in_schema, &row)?;
                match existing {
                    Some(i) => row[i] = value,
                    None => row.push(value),
                }
                out.push(row);
            }
            Ok(out)
        }
        Plan::Filter { input, predicate } => {
            let in_schema = input.schema()?;
            let rows = execute_rows(input)?;
            let mut out = Vec::new();
            for row in rows {
                if eval(predicate, &in_schema, &row)? == Value::Boolean(true) {
                    out.push(row);
                }
            }
            Ok(out)
        }
        Plan::Join { left, right, left_on, right_on, how } => {
            let left_schema = left.schema()?;
            let right_schema = right.schema()?;
            let left_rows = execute_rows(left)?;
            let right_rows = execute_rows(right)?;
            trace!(left = left_rows.len(), right = right_rows.len(), "executing join");

            let mut index: HashMap<Value, Vec<usize>> = HashMap::new();
            for (i, row) in right_rows.iter().enumerate() {
                let key = eval(right_on, &right_schema, row)?;
                if !key.is_null() {
                    index.entry(key).or_default().push(i);
                }
            }

            let right_width = right_schema.len();
            let mut out = Vec::new();
            for row in left_rows {
                let key = eval(left_on, &left_schema, &row)?;
                let matches = if key.is_null() { None } else { index.get(&key) };
                match matches {
                    Some(indexes) => {
                        for &i in indexes {
                            let mut merged = row.clone();
                            merged.extend(right_rows[i].iter().cloned());
                            out.push(merged);
                        }
                    }
                    None => {
                        if *how == JoinType::LeftOuter {
                            let mut merged = row.clone();
                            merged.extend(std::iter::repeat_n(Value::Null, right_width));
                            out.push(merged);
                        }
                    }
                }
            }
            Ok(out)
        }
        Plan::ExplodePos { input, array, .. } => {
            let in_schema = input.schema()?;
            let rows = execute_rows(input)?;
            let mut out = Vec::new();
            for row in rows {
                match eval(array, &in_schema, &row)? {
                    Value::Array(items) if !items.is_empty() => {
                        for (i, item) in items.into_iter().enumerate() {
                            let mut expanded = row.clone();
                            expanded.push(item);
                            expanded.push(Value::Integer(i as i64));
                            out.push(expanded);
                        }
                    }
                    // Outer semantics: subjects without elements keep a row.
                    _ => {
                        let mut expanded = row;
                        expanded.push(Value::Null);
                        expanded.push(Value::Null);
                        out.push(expanded);
                    }
                }
            }
            Ok(out)
        }
        Plan::RowIndex { input, partition_by, order_by, .. } => {
            let in_schema = input.schema()?;
            let rows = execute_rows(input)?;
            let mut partitions: HashMap<Value, Vec<usize>> = HashMap::new();
            let mut order_keys = Vec::with_capacity(rows.len());
            for (i, row) in rows.iter().enumerate() {
                let partition = eval(partition_by, &in_schema, row)?;
                order_keys.push(eval(order_by, &in_schema, row)?);
                partitions.entry(partition).or_default().push(i);
            }
            let mut ranks = vec![Value::Null; rows.len()];
            for indexes in partitions.values() {
                let mut sorted = indexes.clone();
                sorted.sort_by(|&a, &b| compare_keys(&order_keys[a], &order_keys[b]));
                for (rank, &i) in sorted.iter().enumerate() {
                    ranks[i] = Value::Integer(rank as i64);
                }
            }
            Ok(rows
                .into_iter()
                .zip(ranks)
                .map(|(mut row, rank)| {
                    row.push(rank);
                    row
                })
                .collect())
        }
        Plan::Aggregate { input, group_by, aggregates } => {
            let in_schema = input.schema()?;
            let rows = execute_rows(input)?;

            // Groups in first-seen order; per group, the evaluated input of
            // every aggregate expression.
            let mut group_index: HashMap<Vec<Value>, usize> = HashMap::new();
            let mut keys: Vec<Vec<Value>> = Vec::new();
            let mut inputs: Vec<Vec<Vec<Value>>> = Vec::new();
            for row in &rows {
                let key: Vec<Value> = group_by
                    .iter()
                    .map(|(_, expr)| eval(expr, &in_schema, row))
                    .collect::<Result<_, _>>()?;
                let group = match group_index.get(&key) {
                    Some(&i) => i,
                    None => {
                        group_index.insert(key.clone(), keys.len());
                        keys.push(key);
                        inputs.push(vec![Vec::new(); aggregates.len()]);
                        inputs.len() - 1
                    }
                };
                for (slot, (_, aggregate)) in aggregates.iter().enumerate() {
                    let expr = match aggregate {
                        Aggregate::Max(c)
                        | Aggregate::Min(c)
                        | Aggregate::Sum(c)
                        | Aggregate::Count(c)
                        | Aggregate::First(c) => c,
                    };
                    inputs[group][slot].push(eval(expr, &in_schema, row)?);
                }
            }

            let mut out = Vec::with_capacity(keys.len());
            for (key, group_inputs) in keys.into_iter().zip(inputs) {
                let mut row = key;
                for ((_, aggregate), values) in aggregates.iter().zip(group_inputs) {
                    row.push(finish_aggregate(aggregate, values)?);
                }
                out.push(row);
            }
            Ok(out)
        }
        Plan::Union { left, right } => {
            let mut rows = execute_rows(left)?;
            rows.extend(execute_rows(right)?);
            Ok(rows)
        }
        Plan::OrderBy { input, keys } => {
            let in_schema = input.schema()?;
            let rows = execute_rows(input)?;
            let mut keyed: Vec<(Vec<Value>, Vec<Value>)> = rows
                .into_iter()
                .map(|row| {
                    let key: Result<Vec<Value>, DatasetError> =
                        keys.iter().map(|k| eval(k, &in_schema, &row)).collect();
                    key.map(|k| (k, row))
                })
                .collect::<Result<_, _>>()?;
            keyed.sort_by(|(a, _), (b, _)| {
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| compare_keys(x, y))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
            Ok(keyed.into_iter().map(|(_, row)| row).collect())
        }
    }
}

/// Sort ordering used for order-by and rank: nulls last, incomparable
/// values treated as equal (stable sort preserves input order for them).
fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

fn finish_aggregate(aggregate: &Aggregate, values: Vec<Value>) -> Result<Value, DatasetError> {
    match aggregate {
        Aggregate::Max(_) => Ok(values
            .into_iter()
            .filter(|v| !v.is_null())
            .max_by(|a, b| a.compare(b).unwrap_or(Ordering::Equal))
            .unwrap_or(Value::Null)),
        Aggregate::Min(_) => Ok(values
            .into_iter()
            .filter(|v| !v.is_null())
            .min_by(|a, b| a.compare(b).unwrap_or(Ordering::Equal))
            .unwrap_or(Value::Null)),
        Aggregate::Sum(_) => {
            let mut any = false;
            let mut decimal = false;
            let mut total = Decimal::ZERO;
            for value in values.iter().filter(|v| !v.is_null()) {
                let d = value.as_decimal().ok_or_else(|| DatasetError::TypeMismatch {
                    context: "sum".to_string(),
                    expected: "numeric",
                    found: value.type_name(),
                })?;
                decimal |= matches!(value, Value::Decimal(_));
                total += d;
                any = true;
            }
            if !any {
                Ok(Value::Null)
            } else if decimal {
                Ok(Value::Decimal(total))
            } else {
                // Integer-only input keeps an integer result.
                Ok(Value::Integer(total.to_i64().unwrap_or(i64::MAX)))
            }
        }
        Aggregate::Count(_) => {
            Ok(Value::Integer(values.iter().filter(|v| !v.is_null()).count() as i64))
        }
        Aggregate::First(_) => Ok(values
            .into_iter()
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null)),
    }
}

fn eval(column: &Column, schema: &[String], row: &[Value]) -> Result<Value, DatasetError> {
    match column.expr.as_ref() {
        Expr::Named(name) => {
            let idx = schema.iter().position(|c| c == name).ok_or_else(|| {
                DatasetError::UnknownColumn {
                    name: name.clone(),
                    context: "expression".to_string(),
                }
            })?;
            Ok(row[idx].clone())
        }
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Binary { op, left, right } => {
            let l = eval(left, schema, row)?;
            let r = eval(right, schema, row)?;
            eval_binary(*op, l, r)
        }
        Expr::Not(inner) => match eval(inner, schema, row)? {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            Value::Null => Ok(Value::Null),
            other => Err(DatasetError::TypeMismatch {
                context: "not".to_string(),
                expected: "boolean",
                found: other.type_name(),
            }),
        },
        Expr::IsNull(inner) => Ok(Value::Boolean(eval(inner, schema, row)?.is_null())),
        Expr::When { branches, otherwise } => {
            for (condition, value) in branches {
                if eval(condition, schema, row)? == Value::Boolean(true) {
                    return eval(value, schema, row);
                }
            }
            match otherwise {
                Some(value) => eval(value, schema, row),
                None => Ok(Value::Null),
            }
        }
        Expr::GetField { base, name } => {
            Ok(eval(base, schema, row)?.field(name).cloned().unwrap_or(Value::Null))
        }
        Expr::MakeArray(items) => {
            let values: Vec<Value> = items
                .iter()
                .map(|c| eval(c, schema, row))
                .collect::<Result<_, _>>()?;
            Ok(Value::Array(values))
        }
        Expr::MakeStruct(fields) => {
            let mut out = std::collections::BTreeMap::new();
            for (name, column) in fields {
                out.insert(name.clone(), eval(column, schema, row)?);
            }
            Ok(Value::Struct(out))
        }
        Expr::ConcatArrays(left, right) => {
            let l = eval(left, schema, row)?;
            let r = eval(right, schema, row)?;
            match (l, r) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::Array(mut a), Value::Array(b)) => {
                    a.extend(b);
                    Ok(Value::Array(a))
                }
                (a, b) => Err(DatasetError::TypeMismatch {
                    context: "concat_arrays".to_string(),
                    expected: "array",
                    found: if a.as_array().is_some() { b.type_name() } else { a.type_name() },
                }),
            }
        }
        Expr::Coalesce(items) => {
            for item in items {
                let value = eval(item, schema, row)?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            Ok(Value::Null)
        }
        Expr::Map { input, label, func } => {
            let value = eval(input, schema, row)?;
            func(&value).map_err(|message| DatasetError::MapFailed {
                label: label.clone(),
                message,
            })
        }
    }
}

fn eval_binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, DatasetError> {
    use BinaryOp::*;
    match op {
        And | Or | Xor => {
            let a = kleene_operand(&l)?;
            let b = kleene_operand(&r)?;
            Ok(match op {
                And => match (a, b) {
                    (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
                    (Some(true), Some(true)) => Value::Boolean(true),
                    _ => Value::Null,
                },
                Or => match (a, b) {
                    (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
                    (Some(false), Some(false)) => Value::Boolean(false),
                    _ => Value::Null,
                },
                _ => match (a, b) {
                    (Some(x), Some(y)) => Value::Boolean(x != y),
                    _ => Value::Null,
                },
            })
        }
        Eq | NotEq => {
            if l.is_null() || r.is_null() {
                return Ok(Value::Null);
            }
            let equal = match l.compare(&r) {
                Some(ordering) => ordering == Ordering::Equal,
                None => l == r,
            };
            Ok(Value::Boolean(if op == Eq { equal } else { !equal }))
        }
        Lt | LtEq | Gt | GtEq => match l.compare(&r) {
            Some(ordering) => Ok(Value::Boolean(match op {
                Lt => ordering == Ordering::Less,
                LtEq => ordering != Ordering::Greater,
                Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })),
            None => Ok(Value::Null),
        },
        Add | Sub | Mul | Div => {
            if l.is_null() || r.is_null() {
                return Ok(Value::Null);
            }
            let (a, b) = numeric_operands(op, &l, &r)?;
            let integral = matches!((&l, &r), (Value::Integer(_), Value::Integer(_)));
            let result = match op {
                Add => a + b,
                Sub => a - b,
                Mul => a * b,
                _ => {
                    if b.is_zero() {
                        return Ok(Value::Null);
                    }
                    a / b
                }
            };
            // Division always yields a decimal; the rest keep integers
            // integral.
            if integral && op != Div {
                Ok(Value::Integer(result.to_i64().unwrap_or(i64::MAX)))
            } else {
                Ok(Value::Decimal(result))
            }
        }
        IntDiv | Mod => {
            if l.is_null() || r.is_null() {
                return Ok(Value::Null);
            }
            match (l.as_integer(), r.as_integer()) {
                (Some(_), Some(0)) => Ok(Value::Null),
                (Some(a), Some(b)) => Ok(Value::Integer(if op == IntDiv { a / b } else { a % b })),
                _ => Err(DatasetError::TypeMismatch {
                    context: "integer division".to_string(),
                    expected: "integer",
                    found: if l.as_integer().is_some() { r.type_name() } else { l.type_name() },
                }),
            }
        }
        Concat => {
            if l.is_null() || r.is_null() {
                return Ok(Value::Null);
            }
            match (l.as_str(), r.as_str()) {
                (Some(a), Some(b)) => Ok(Value::String(format!("{}{}", a, b))),
                _ => Err(DatasetError::TypeMismatch {
                    context: "concat".to_string(),
                    expected: "string",
                    found: if l.as_str().is_some() { r.type_name() } else { l.type_name() },
                }),
            }
        }
    }
}

fn kleene_operand(value: &Value) -> Result<Option<bool>, DatasetError> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        other => Err(DatasetError::TypeMismatch {
            context: "boolean operator".to_string(),
            expected: "boolean",
            found: other.type_name(),
        }),
    }
}

fn numeric_operands(
    op: BinaryOp,
    l: &Value,
    r: &Value,
) -> Result<(Decimal, Decimal), DatasetError> {
    match (l.as_decimal(), r.as_decimal()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(DatasetError::TypeMismatch {
            context: format!("{:?}", op),
            expected: "numeric",
            found: if l.as_decimal().is_some() { r.type_name() } else { l.type_name() },
        }),
    }
}
