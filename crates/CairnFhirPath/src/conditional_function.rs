//! The conditional function, iif.

use cairn_columnar::{JoinType, lit, when};
use cairn_fhir_model::FhirType;

use crate::error::{FhirPathError, FhirPathResult, check_user_input};
use crate::function::{NamedFunction, NamedFunctionInput, check_arity};
use crate::join::join_paths;
use crate::path::{ElementPath, PathValue};

/// `iif(condition, ifTrue, otherwise)`: returns the second argument where
/// the first evaluates to `true`, the third otherwise (including where the
/// condition is absent).
///
/// The condition must be a singular boolean navigable from the item
/// context; the three operand datasets are joined and the value column is
/// a when/otherwise over the condition. The result's type is the
/// structural widening of the two branch types.
pub struct IifFunction;

impl NamedFunction for IifFunction {
    fn name(&self) -> &'static str {
        "iif"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "iif", 3, 3)?;
        let condition = &input.arguments[0];
        let if_true = &input.arguments[1];
        let otherwise = &input.arguments[2];

        check_user_input(condition.is_boolean_type(), || {
            format!("Condition argument to iif must be Boolean: {}", condition.expression())
        })?;
        check_user_input(condition.is_singular(), || {
            format!("Condition argument to iif must be singular: {}", condition.expression())
        })?;
        check_user_input(condition.this_column().is_some(), || {
            format!(
                "Condition argument to iif function must be navigable from collection item (use $this): {}",
                condition.expression()
            )
        })?;

        let fhir_type = widened_type(if_true, otherwise).ok_or_else(|| {
            FhirPathError::InvalidInput(format!(
                "Paths cannot be merged: \"{}\" and \"{}\"",
                if_true.expression(),
                otherwise.expression()
            ))
        })?;
        for branch in [if_true, otherwise] {
            check_user_input(branch.is_singular(), || {
                format!("Branch argument to iif must be singular: {}", branch.expression())
            })?;
        }

        let operands: Vec<&PathValue> = [condition, if_true, otherwise]
            .into_iter()
            .filter(|p| !p.is_literal())
            .collect();
        let (dataset, joins) = join_paths(&operands, JoinType::LeftOuter)?;

        let value = when(condition.value_column().eq(lit(true)), if_true.value_column())
            .otherwise(otherwise.value_column());

        // The condition's $this column carries the input item's identity;
        // the result takes the input's cardinality.
        let this = condition
            .this_column()
            .unwrap_or_else(|| panic!("condition this column checked above"));
        let eid = if input.input.is_singular() {
            None
        } else {
            Some(this.clone().get_field("eid"))
        };
        let this_out = if input.input.this_column().is_some() {
            condition.this_column()
        } else {
            None
        };
        let id = condition
            .id_column()
            .unwrap_or_else(|| panic!("condition path without an id column"));

        Ok(PathValue::Element(ElementPath::build(
            input.context.aliases(),
            &input.expression,
            &dataset,
            Some(id),
            eid,
            value,
            input.input.is_singular(),
            this_out,
            fhir_type,
            None,
            None,
            condition.lineage(),
            joins,
        )))
    }
}

/// The structural combination of the two branch types: identical types
/// stay, numerics widen to decimal, string kinds widen to string, a null
/// literal takes the other branch's type.
fn widened_type(if_true: &PathValue, otherwise: &PathValue) -> Option<FhirType> {
    match (if_true.fhir_type(), otherwise.fhir_type()) {
        (Some(a), Some(b)) if a == b => Some(a),
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Some(FhirType::Decimal),
        (Some(a), Some(b)) if a.is_string_like() && b.is_string_like() => Some(FhirType::String),
        (Some(a), None) if otherwise.is_null_literal() => Some(a),
        (None, Some(b)) if if_true.is_null_literal() => Some(b),
        _ => None,
    }
}
