//! Collection and aggregation functions: count, sum, first, empty,
//! exists, not.
//!
//! The aggregation-style functions collapse a path's values to one row
//! per subject by grouping on the subject identity column (plus any
//! active grouping columns from the parser context) and applying an
//! aggregate over the value column. Their results are singular by
//! construction and therefore carry no element identity.

use cairn_columnar::{Aggregate, Column, Dataset, col, lit};
use cairn_fhir_model::FhirType;

use crate::error::{FhirPathResult, check_user_input};
use crate::filtering_functions::apply_where;
use crate::function::{NamedFunction, NamedFunctionInput, check_arity};
use crate::path::{ElementPath, PathValue};

/// The aggregated dataset plus the bound column names the result is
/// rebuilt from.
struct Aggregated {
    dataset: Dataset,
    id_name: String,
    value_name: String,
    this_name: Option<String>,
}

/// Groups a path's dataset by subject identity — and by the item context
/// when the path carries a `$this` column, so that aggregates compiled
/// inside function arguments collapse per item rather than per subject —
/// plus any active grouping columns, applying one aggregate to the value
/// column.
fn aggregate_by_subject(
    input: &NamedFunctionInput<'_>,
    path: &PathValue,
    dataset: &Dataset,
    aggregate: impl FnOnce(Column) -> Aggregate,
) -> FhirPathResult<Aggregated> {
    check_user_input(!path.is_literal(), || {
        format!("Cannot aggregate over a literal: {}", input.expression)
    })?;
    let id = path
        .id_column()
        .unwrap_or_else(|| panic!("path value without an id column cannot be aggregated"));

    let n = input.context.aliases().next();
    let id_name = format!("agg_id_{}", n);
    let value_name = format!("agg_value_{}", n);

    let mut group_names: Vec<String> = vec![id_name.clone()];
    let mut group_columns: Vec<Column> = vec![id];
    let this_name = path.this_column().map(|this| {
        let name = format!("agg_this_{}", n);
        group_names.push(name.clone());
        group_columns.push(this);
        name
    });
    for (i, grouping) in input.context.groupings().iter().enumerate() {
        group_names.push(format!("agg_group{}_{}", i, n));
        group_columns.push(grouping.clone());
    }
    let group_by: Vec<(&str, Column)> = group_names
        .iter()
        .map(String::as_str)
        .zip(group_columns)
        .collect();

    let aggregated = dataset.aggregate(
        group_by,
        vec![(value_name.as_str(), aggregate(path.value_column()))],
    );
    Ok(Aggregated { dataset: aggregated, id_name, value_name, this_name })
}

/// The number of values per subject.
pub struct CountFunction;

impl NamedFunction for CountFunction {
    fn name(&self) -> &'static str {
        "count"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "count", 0, 0)?;
        let path = input.input.clone();
        let agg = aggregate_by_subject(&input, &path, path.dataset(), Aggregate::Count)?;
        Ok(PathValue::Element(ElementPath::build(
            input.context.aliases(),
            &input.expression,
            &agg.dataset,
            Some(col(&agg.id_name)),
            None,
            col(&agg.value_name),
            true,
            agg.this_name.as_deref().map(col),
            FhirType::Integer,
            None,
            None,
            path.lineage(),
            path.joins(),
        )))
    }
}

/// The sum of a numeric path's values per subject.
pub struct SumFunction;

impl NamedFunction for SumFunction {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "sum", 0, 0)?;
        let path = input.input.clone();
        check_user_input(path.is_numeric_type(), || {
            format!("Input to sum function must be numeric: {}", path.expression())
        })?;
        let agg = aggregate_by_subject(&input, &path, path.dataset(), Aggregate::Sum)?;
        let fhir_type = path.fhir_type().unwrap_or(FhirType::Decimal);
        Ok(PathValue::Element(ElementPath::build(
            input.context.aliases(),
            &input.expression,
            &agg.dataset,
            Some(col(&agg.id_name)),
            None,
            col(&agg.value_name),
            true,
            agg.this_name.as_deref().map(col),
            fhir_type,
            None,
            None,
            path.lineage(),
            path.joins(),
        )))
    }
}

/// The first value per subject, in element identity order.
pub struct FirstFunction;

impl NamedFunction for FirstFunction {
    fn name(&self) -> &'static str {
        "first"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "first", 0, 0)?;
        let path = input.input.clone();
        check_user_input(matches!(path, PathValue::Element(_)), || {
            format!("Input to first function must be an element path: {}", path.expression())
        })?;
        let ordered = path.ordered_dataset()?;
        let agg = aggregate_by_subject(&input, &path, &ordered, Aggregate::First)?;
        let fhir_type = path.fhir_type().unwrap_or(FhirType::String);
        Ok(PathValue::Element(ElementPath::build(
            input.context.aliases(),
            &input.expression,
            &agg.dataset,
            Some(col(&agg.id_name)),
            None,
            col(&agg.value_name),
            true,
            agg.this_name.as_deref().map(col),
            fhir_type,
            path.definition().cloned(),
            None,
            path.lineage(),
            path.joins(),
        )))
    }
}

/// Whether a subject has no values at all.
pub struct EmptyFunction;

impl NamedFunction for EmptyFunction {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "empty", 0, 0)?;
        let path = input.input.clone();
        let agg = aggregate_by_subject(&input, &path, path.dataset(), Aggregate::Count)?;
        Ok(PathValue::Element(ElementPath::build(
            input.context.aliases(),
            &input.expression,
            &agg.dataset,
            Some(col(&agg.id_name)),
            None,
            col(&agg.value_name).eq(lit(0i64)),
            true,
            agg.this_name.as_deref().map(col),
            FhirType::Boolean,
            None,
            None,
            path.lineage(),
            path.joins(),
        )))
    }
}

/// Whether a subject has any value; with a criteria argument, whether any
/// value satisfies it.
pub struct ExistsFunction;

impl NamedFunction for ExistsFunction {
    fn name(&self) -> &'static str {
        "exists"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "exists", 0, 1)?;
        let path = if input.arguments.len() == 1 {
            // exists(criteria) is where(criteria) followed by exists().
            apply_where(input.context, &input.input, &input.arguments[0], &input.expression)?
        } else {
            input.input.clone()
        };
        let agg = aggregate_by_subject(&input, &path, path.dataset(), Aggregate::Count)?;
        Ok(PathValue::Element(ElementPath::build(
            input.context.aliases(),
            &input.expression,
            &agg.dataset,
            Some(col(&agg.id_name)),
            None,
            col(&agg.value_name).gt(lit(0i64)),
            true,
            agg.this_name.as_deref().map(col),
            FhirType::Boolean,
            None,
            None,
            path.lineage(),
            path.joins(),
        )))
    }
}

/// Boolean negation of a singular boolean path. Three-valued: an absent
/// input stays absent.
pub struct NotFunction;

impl NamedFunction for NotFunction {
    fn name(&self) -> &'static str {
        "not"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "not", 0, 0)?;
        let path = input.input.clone();
        check_user_input(!path.is_literal(), || {
            format!("Input to not function must not be a literal: {}", path.expression())
        })?;
        check_user_input(path.is_singular(), || {
            format!("Input to not function must be singular: {}", path.expression())
        })?;
        check_user_input(path.is_boolean_type(), || {
            format!("Input to not function must be Boolean: {}", path.expression())
        })?;
        let dataset = path.dataset().clone();
        Ok(path.copy_with(
            input.context.aliases(),
            &input.expression,
            &dataset,
            path.id_column(),
            None,
            path.value_column().not(),
            true,
            path.this_column(),
            path.joins(),
        ))
    }
}
