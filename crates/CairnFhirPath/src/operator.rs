//! Binary and unary operator dispatch.
//!
//! Operators validate operand capability and singularity up front — every
//! violation is a user input error naming the offending expression — then
//! compose the operand datasets through the join engine and emit a value
//! column over the merged dataset. Boolean logic is three-valued;
//! membership routes through the exists aggregation in the join engine;
//! `|` unions the operand values into an unordered collection.

use cairn_columnar::{Dataset, JoinType, Value, col, lit};
use cairn_fhir_model::FhirType;

use crate::context::ParserContext;
use crate::error::{FhirPathError, FhirPathResult, check_user_input};
use crate::join::{JoinSet, exists_aggregation, join_paths};
use crate::path::{ElementPath, LiteralPath, PathValue};

/// The binary operators of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    And,
    Or,
    Xor,
    Implies,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    TruncatedDivide,
    Modulo,
    Concat,
    In,
    ContainsCollection,
    Combine,
}

impl BinaryOperator {
    /// Maps a source-language token onto its operator; `None` for tokens
    /// the compiler does not support (equivalence `~` / `!~`).
    pub fn from_token(token: &str) -> Option<BinaryOperator> {
        Some(match token {
            "and" => BinaryOperator::And,
            "or" => BinaryOperator::Or,
            "xor" => BinaryOperator::Xor,
            "implies" => BinaryOperator::Implies,
            "=" => BinaryOperator::Equals,
            "!=" => BinaryOperator::NotEquals,
            "<" => BinaryOperator::LessThan,
            "<=" => BinaryOperator::LessThanOrEqual,
            ">" => BinaryOperator::GreaterThan,
            ">=" => BinaryOperator::GreaterThanOrEqual,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "div" => BinaryOperator::TruncatedDivide,
            "mod" => BinaryOperator::Modulo,
            "&" => BinaryOperator::Concat,
            "in" => BinaryOperator::In,
            "contains" => BinaryOperator::ContainsCollection,
            "|" => BinaryOperator::Combine,
            _ => return None,
        })
    }

    fn is_boolean_logic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Xor | BinaryOperator::Implies
        )
    }

    fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equals
                | BinaryOperator::NotEquals
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }

    fn is_math(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::TruncatedDivide
                | BinaryOperator::Modulo
        )
    }
}

pub(crate) fn invoke_binary(
    ctx: &ParserContext,
    operator: BinaryOperator,
    left: PathValue,
    right: PathValue,
    expression: &str,
) -> FhirPathResult<PathValue> {
    match operator {
        BinaryOperator::In => membership(ctx, &left, &right, expression),
        BinaryOperator::ContainsCollection => membership(ctx, &right, &left, expression),
        BinaryOperator::Combine => combine(ctx, &left, &right, expression),
        _ => elementwise(ctx, operator, &left, &right, expression),
    }
}

/// `singular in collection` (and its mirrored `contains` form).
fn membership(
    ctx: &ParserContext,
    singular: &PathValue,
    collection: &PathValue,
    expression: &str,
) -> FhirPathResult<PathValue> {
    check_user_input(singular.is_singular(), || {
        format!(
            "Membership test requires a singular operand: {}",
            singular.expression()
        )
    })?;
    check_user_input(!collection.is_literal(), || {
        format!(
            "Membership test requires a collection operand: {}",
            collection.expression()
        )
    })?;
    check_user_input(singular.is_comparable_to(collection), || {
        format!(
            "Operands of a membership test are not comparable: \"{}\" and \"{}\"",
            singular.expression(),
            collection.expression()
        )
    })?;
    exists_aggregation(ctx.aliases(), singular, collection, expression)
}

/// The singular-operand operators: boolean logic, comparison, math and
/// string concatenation.
fn elementwise(
    ctx: &ParserContext,
    operator: BinaryOperator,
    left: &PathValue,
    right: &PathValue,
    expression: &str,
) -> FhirPathResult<PathValue> {
    for operand in [left, right] {
        check_user_input(operand.is_singular(), || {
            format!(
                "Operand to {:?} operator must be singular: {}",
                operator,
                operand.expression()
            )
        })?;
    }

    if operator.is_boolean_logic() {
        for operand in [left, right] {
            check_user_input(operand.is_boolean_type() || operand.is_null_literal(), || {
                format!("Operand must be a singular Boolean: {}", operand.expression())
            })?;
        }
    } else if operator.is_comparison() {
        check_user_input(left.is_comparable_to(right), || {
            format!(
                "Operands are not comparable: \"{}\" and \"{}\"",
                left.expression(),
                right.expression()
            )
        })?;
    } else if operator.is_math() {
        for operand in [left, right] {
            check_user_input(operand.is_numeric_type(), || {
                format!("Math operator requires numeric operands: {}", operand.expression())
            })?;
        }
    } else {
        // Concat.
        for operand in [left, right] {
            check_user_input(
                operand.is_string_like_type() || operand.is_null_literal(),
                || format!("Concatenation requires string operands: {}", operand.expression()),
            )?;
        }
    }

    let (dataset, joins, id, lineage) = merge_operands(ctx, &[left, right])?;

    let l = left.value_column();
    let r = right.value_column();
    let value = match operator {
        BinaryOperator::And => l.and(r),
        BinaryOperator::Or => l.or(r),
        BinaryOperator::Xor => l.xor(r),
        BinaryOperator::Implies => l.not().or(r),
        BinaryOperator::Equals => l.eq(r),
        BinaryOperator::NotEquals => l.not_eq(r),
        BinaryOperator::LessThan => l.lt(r),
        BinaryOperator::LessThanOrEqual => l.lt_eq(r),
        BinaryOperator::GreaterThan => l.gt(r),
        BinaryOperator::GreaterThanOrEqual => l.gt_eq(r),
        BinaryOperator::Add => l.add(r),
        BinaryOperator::Subtract => l.sub(r),
        BinaryOperator::Multiply => l.mul(r),
        BinaryOperator::Divide => l.div(r),
        BinaryOperator::TruncatedDivide => l.int_div(r),
        BinaryOperator::Modulo => l.modulo(r),
        BinaryOperator::Concat => l.concat(r),
        _ => unreachable!("collection operators handled above"),
    };

    let fhir_type = result_type(operator, left, right);
    let this = PathValue::find_this_column(&[left, right]);
    Ok(PathValue::Element(ElementPath::build(
        ctx.aliases(),
        expression,
        &dataset,
        Some(id),
        None,
        value,
        true,
        this,
        fhir_type,
        None,
        None,
        &lineage,
        joins,
    )))
}

fn result_type(operator: BinaryOperator, left: &PathValue, right: &PathValue) -> FhirType {
    if operator.is_boolean_logic() || operator.is_comparison() {
        return FhirType::Boolean;
    }
    match operator {
        BinaryOperator::Concat => FhirType::String,
        BinaryOperator::Divide => FhirType::Decimal,
        BinaryOperator::TruncatedDivide | BinaryOperator::Modulo => FhirType::Integer,
        _ => {
            // Numeric widening: any decimal operand makes the result
            // decimal.
            if left.fhir_type() == Some(FhirType::Decimal)
                || right.fhir_type() == Some(FhirType::Decimal)
            {
                FhirType::Decimal
            } else {
                FhirType::Integer
            }
        }
    }
}

/// Composes operand datasets. When every operand is a literal, the
/// subject context anchors the result so the expression still yields one
/// row per subject.
fn merge_operands(
    ctx: &ParserContext,
    operands: &[&PathValue],
) -> FhirPathResult<(Dataset, JoinSet, cairn_columnar::Column, String)> {
    let non_literal: Vec<&PathValue> = operands.iter().copied().filter(|p| !p.is_literal()).collect();
    if non_literal.is_empty() {
        let anchor = PathValue::Resource(ctx.input().clone());
        let id = anchor
            .id_column()
            .unwrap_or_else(|| panic!("subject context without an id column"));
        return Ok((
            anchor.dataset().clone(),
            JoinSet::new(),
            id,
            anchor.lineage().to_string(),
        ));
    }
    let (dataset, joins) = join_paths(&non_literal, JoinType::LeftOuter)?;
    let first = non_literal[0];
    let id = first
        .id_column()
        .unwrap_or_else(|| panic!("path value without an id column cannot be merged"));
    Ok((dataset, joins, id, first.lineage().to_string()))
}

/// `|`: merges two collections into one unordered collection.
fn combine(
    ctx: &ParserContext,
    left: &PathValue,
    right: &PathValue,
    expression: &str,
) -> FhirPathResult<PathValue> {
    let fhir_type = combined_type(left, right).ok_or_else(|| {
        FhirPathError::InvalidInput(format!(
            "Paths cannot be merged into a collection: \"{}\" and \"{}\"",
            left.expression(),
            right.expression()
        ))
    })?;
    if !left.is_literal() && !right.is_literal() {
        check_user_input(left.lineage() == right.lineage(), || {
            format!(
                "Operands are not join-compatible: \"{}\" and \"{}\"",
                left.expression(),
                right.expression()
            )
        })?;
    }

    let n = ctx.aliases().next();
    let id_name = format!("uid_{}", n);
    let value_name = format!("uval_{}", n);
    let side = |path: &PathValue| -> Dataset {
        let (dataset, id) = if path.is_literal() {
            let anchor = PathValue::Resource(ctx.input().clone());
            let id = anchor
                .id_column()
                .unwrap_or_else(|| panic!("subject context without an id column"));
            (anchor.dataset().clone(), id)
        } else {
            let id = path
                .id_column()
                .unwrap_or_else(|| panic!("path value without an id column cannot be merged"));
            (path.dataset().clone(), id)
        };
        dataset
            .with_column(&id_name, id)
            .with_column(&value_name, path.value_column())
            .select(&[id_name.as_str(), value_name.as_str()])
    };

    let dataset = side(left).union_all(&side(right));
    let mut joins = left.joins();
    joins.merge(&right.joins());
    let lineage = if left.is_literal() { right.lineage() } else { left.lineage() };

    Ok(PathValue::Element(ElementPath::build(
        ctx.aliases(),
        expression,
        &dataset,
        Some(col(&id_name)),
        None,
        col(&value_name),
        false,
        None,
        fhir_type,
        None,
        None,
        lineage,
        joins,
    )))
}

fn combined_type(left: &PathValue, right: &PathValue) -> Option<FhirType> {
    match (left.fhir_type(), right.fhir_type()) {
        (Some(a), Some(b)) if a == b => Some(a),
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Some(FhirType::Decimal),
        (Some(a), Some(b)) if a.is_string_like() && b.is_string_like() => Some(FhirType::String),
        (Some(a), None) if right.is_null_literal() => Some(a),
        (None, Some(b)) if left.is_null_literal() => Some(b),
        _ => None,
    }
}

/// Unary `+` / `-`. Literal operands fold directly; non-literal operands
/// negate their value column over their own dataset.
pub(crate) fn invoke_polarity(
    ctx: &ParserContext,
    op: char,
    operand: PathValue,
    expression: &str,
) -> FhirPathResult<PathValue> {
    check_user_input(operand.is_singular(), || {
        format!("Polarity operand must be singular: {}", operand.expression())
    })?;
    check_user_input(operand.is_numeric_type(), || {
        format!("Polarity operand must be numeric: {}", operand.expression())
    })?;
    if op == '+' {
        return Ok(operand);
    }
    if let PathValue::Literal(p) = &operand {
        let value = match &p.value {
            Value::Integer(i) => Value::Integer(-i),
            Value::Decimal(d) => Value::Decimal(-*d),
            other => other.clone(),
        };
        return Ok(PathValue::Literal(LiteralPath {
            expression: expression.to_string(),
            value,
            ..p.clone()
        }));
    }
    let value = lit(0i64).sub(operand.value_column());
    let dataset = operand.dataset().clone();
    Ok(operand.copy_with(
        ctx.aliases(),
        expression,
        &dataset,
        operand.id_column(),
        operand.eid_column(),
        value,
        operand.is_singular(),
        operand.this_column(),
        operand.joins(),
    ))
}

/// The indexer `[n]`: selects the n-th element (zero-based) of an ordered
/// collection per subject. Rank is computed over the element identity
/// order; the result is singular.
pub(crate) fn invoke_indexer(
    ctx: &ParserContext,
    input: PathValue,
    index: i64,
    expression: &str,
) -> FhirPathResult<PathValue> {
    check_user_input(!input.is_literal(), || {
        format!("Cannot index into a literal: {}", input.expression())
    })?;
    check_user_input(input.has_order(), || {
        format!("Orderable path expected for indexer: {}", input.expression())
    })?;
    let id = input
        .id_column()
        .unwrap_or_else(|| panic!("path value without an id column cannot be indexed"));
    let n = ctx.aliases().next();
    let rank_name = format!("rank_{}", n);
    let dataset = input
        .dataset()
        .with_row_index(id.clone(), input.ordering_column(), &rank_name)
        .filter(col(&rank_name).eq(lit(index)));
    Ok(input.copy_with(
        ctx.aliases(),
        expression,
        &dataset,
        Some(id),
        None,
        input.value_column(),
        true,
        input.this_column(),
        input.joins(),
    ))
}
