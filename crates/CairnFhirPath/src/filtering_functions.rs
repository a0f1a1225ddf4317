//! Filtering functions: where and ofType.

use cairn_columnar::{JoinType, coalesce, col, lit};

use crate::error::{FhirPathError, FhirPathResult, check_user_input};
use crate::function::{NamedFunction, NamedFunctionInput, check_arity};
use crate::join::{Join, JoinExpression, JoinKind, alias_for};
use crate::context::ParserContext;
use crate::path::{PathValue, ResourcePath};

/// Filters the input collection to items whose criteria evaluates to
/// `true`. The criteria is compiled against the input's item context, so
/// its dataset already carries the input's rows; filtering that dataset
/// and recovering the item's identity and value from the materialized
/// `$this` column yields the result without a structural join.
pub(crate) fn apply_where(
    ctx: &ParserContext,
    input: &PathValue,
    criteria: &PathValue,
    expression: &str,
) -> FhirPathResult<PathValue> {
    check_user_input(!input.is_literal(), || {
        format!("Cannot filter a literal: {}", input.expression())
    })?;
    check_user_input(criteria.is_singular(), || {
        format!("Criteria must be singular: {}", criteria.expression())
    })?;
    check_user_input(criteria.is_boolean_type() || criteria.is_null_literal(), || {
        format!("Criteria must be a Boolean expression: {}", criteria.expression())
    })?;

    // A literal criteria filters everything or nothing; no item context
    // is involved.
    if let Some(value) = criteria.literal_value() {
        let keep = matches!(value, cairn_columnar::Value::Boolean(true));
        let dataset = input.dataset().filter(lit(keep));
        return Ok(input.copy_with(
            ctx.aliases(),
            expression,
            &dataset,
            input.id_column(),
            input.eid_column(),
            input.value_column(),
            input.is_singular(),
            input.this_column(),
            input.joins(),
        ));
    }

    let this = criteria.this_column().ok_or_else(|| {
        FhirPathError::InvalidInput(format!(
            "Criteria must be navigable from the item context ($this): {}",
            criteria.expression()
        ))
    })?;
    let filtered = criteria
        .dataset()
        .filter(coalesce(vec![criteria.value_column(), lit(false)]));

    match input {
        PathValue::Resource(_) => {
            // Resource items re-join by resource identity so the element
            // columns stay navigable after the filter.
            let n = ctx.aliases().next();
            let key_name = format!("where_key_{}", n);
            let keys = filtered
                .with_column(&key_name, this.get_field("value"))
                .select(&[key_name.as_str()]);
            let dataset = input
                .dataset()
                .join(&keys, input.value_column(), col(&key_name), JoinType::Inner);
            let mut joins = input.joins();
            joins.merge(&criteria.joins());
            Ok(input.copy_with(
                ctx.aliases(),
                expression,
                &dataset,
                input.id_column(),
                input.eid_column(),
                input.value_column(),
                input.is_singular(),
                input.this_column(),
                joins,
            ))
        }
        _ => {
            let id = criteria
                .id_column()
                .unwrap_or_else(|| panic!("criteria path without an id column"));
            let eid = if input.is_singular() {
                None
            } else {
                Some(this.clone().get_field("eid"))
            };
            let this_out = if input.this_column().is_some() {
                criteria.this_column()
            } else {
                None
            };
            Ok(input.copy_with(
                ctx.aliases(),
                expression,
                &filtered,
                Some(id),
                eid,
                this.get_field("value"),
                input.is_singular(),
                this_out,
                criteria.joins(),
            ))
        }
    }
}

/// `where(criteria)`.
pub struct WhereFunction;

impl NamedFunction for WhereFunction {
    fn name(&self) -> &'static str {
        "where"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "where", 1, 1)?;
        check_user_input(!input.input.is_literal(), || {
            format!("Input to where function must not be a literal: {}", input.expression)
        })?;
        apply_where(input.context, &input.input, &input.arguments[0], &input.expression)
    }
}

/// `ofType(ResourceType)`: narrows a polymorphic resource collection to
/// rows whose type discriminator matches, joining the target table so the
/// result is a fully navigable resource context.
pub struct OfTypeFunction;

impl NamedFunction for OfTypeFunction {
    fn name(&self) -> &'static str {
        "ofType"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "ofType", 1, 1)?;
        let untyped = match &input.input {
            PathValue::UntypedResource(u) => u,
            other => {
                return Err(FhirPathError::InvalidInput(format!(
                    "ofType may only be applied to a polymorphic resource: {}",
                    other.expression()
                )));
            }
        };
        let target_type = match &input.arguments[0] {
            PathValue::Resource(r) => r.resource_type().to_string(),
            other => {
                return Err(FhirPathError::InvalidInput(format!(
                    "Argument to ofType must be a base resource type: {}",
                    other.expression()
                )));
            }
        };

        let ctx = input.context;
        let target = ResourcePath::build(
            ctx.aliases(),
            ctx.registry(),
            ctx.source(),
            &target_type,
            &target_type,
        )?;
        let filtered = input
            .input
            .dataset()
            .filter(untyped.type_column().eq(lit(target_type.as_str())));
        let target_id = col(&target.attrs.value_column);
        let dataset = filtered.join(
            &target.attrs.dataset,
            input.input.value_column(),
            target_id.clone(),
            JoinType::Inner,
        );

        let mut joins = input.input.joins();
        let depends_upon = joins.last_alias().map(str::to_string);
        joins.add(Join {
            expression: JoinExpression::Table {
                target: target.attrs.dataset.clone(),
                reference: input.input.value_column(),
                target_id,
            },
            table_alias: alias_for(&input.expression),
            kind: JoinKind::TableJoin,
            depends_upon,
        });

        let id = input
            .input
            .id_column()
            .unwrap_or_else(|| panic!("polymorphic path without an id column"));
        Ok(PathValue::Resource(ResourcePath::derive(
            ctx.aliases(),
            &input.expression,
            &dataset,
            id,
            input.input.eid_column(),
            col(&target.attrs.value_column),
            input.input.is_singular(),
            input.input.this_column(),
            &target.elements,
            &target_type,
            target.definition.clone(),
            input.input.lineage(),
            joins,
        )))
    }
}
