//! The path traversal operator: member navigation.
//!
//! Traversal looks the member up in the input's structure definition,
//! resolves self-referential slots through the model registry under the
//! recursion guard, and produces a new path value. Repeated elements are
//! expanded with a positional explode whose element identities extend the
//! parent's, preserving collection order across arbitrarily deep nesting;
//! singular elements are plain field accesses.
//!
//! Navigation into a recursive structure that has already reached the
//! configured maximum nesting level yields an absent value — a null value
//! column — rather than an error, which is what makes self-referential
//! structure definitions compilable.

use cairn_columnar::{Value, col, lit};
use cairn_fhir_model::ElementDefinition;
use tracing::debug;

use crate::context::ParserContext;
use crate::error::{FhirPathError, FhirPathResult};
use crate::join::{Join, JoinExpression, JoinKind, alias_for};
use crate::path::{ElementPath, PathValue, ResourcePath};

/// The outcome of one traversal step. When the step entered a
/// self-referential structure, `entered_structure` names it; the compiler
/// holds the recursion guard open for the remainder of the invocation
/// chain under that name.
pub(crate) struct TraversalResult {
    pub path: PathValue,
    pub entered_structure: Option<String>,
}

pub(crate) fn traverse(
    ctx: &ParserContext,
    input: &PathValue,
    member: &str,
    expression: &str,
) -> FhirPathResult<TraversalResult> {
    let (child, value_source, foreign) = match input {
        PathValue::Resource(rp) => {
            let child = rp.definition().element(member).cloned().ok_or_else(|| {
                FhirPathError::UndefinedElement {
                    name: member.to_string(),
                    expression: input.expression().to_string(),
                }
            })?;
            let value_source = rp
                .element_column(member)
                .unwrap_or_else(|| panic!("element '{}' missing from bound columns", member));
            let foreign = if rp.resource_type() != ctx.subject_type() {
                Some(Box::new(rp.clone()))
            } else {
                None
            };
            (child, value_source, foreign)
        }
        PathValue::Element(ep) => {
            let definition = ep.definition.as_ref().ok_or_else(|| {
                FhirPathError::InvalidInput(format!(
                    "Cannot navigate into untyped value: {}",
                    input.expression()
                ))
            })?;
            let child = definition.child(member).cloned().ok_or_else(|| {
                FhirPathError::UndefinedElement {
                    name: member.to_string(),
                    expression: input.expression().to_string(),
                }
            })?;
            let value_source = input.value_column().get_field(member);
            (child, value_source, ep.foreign_resource.clone())
        }
        PathValue::UntypedResource(_) => {
            return Err(FhirPathError::InvalidInput(format!(
                "Polymorphic resource must be narrowed with ofType() before navigation: {}",
                input.expression()
            )));
        }
        PathValue::Literal(_) => {
            return Err(FhirPathError::InvalidInput(format!(
                "Cannot navigate from a literal: {}",
                input.expression()
            )));
        }
    };

    // Self-referential slots resolve through the registry, bounded by the
    // recursion guard.
    let content_reference = child.content_reference.clone();
    let (effective, entered_structure) = match content_reference {
        Some(reference) => {
            let resolved = ctx.registry().structure_for(&reference).cloned().ok_or_else(|| {
                FhirPathError::InvalidInput(format!(
                    "Unresolvable structure reference \"{}\" at: {}",
                    reference, expression
                ))
            })?;
            let level = ctx.nesting().current_nesting_level(&reference);
            if level >= ctx.config().max_nesting_level {
                debug!(structure = reference.as_str(), level, "nesting limit reached");
                return Ok(TraversalResult {
                    path: absent_path(ctx, input, expression, resolved, foreign),
                    entered_structure: None,
                });
            }
            (resolved, Some(reference))
        }
        None => (child, None),
    };

    let path = if effective.collection {
        let n = ctx.aliases().next();
        let value_name = format!("exp_value_{}", n);
        let pos_name = format!("exp_pos_{}", n);
        let dataset = input.dataset().explode_with_position(
            value_source.clone(),
            &value_name,
            &pos_name,
        );
        let eid = input.expand_eid(col(&pos_name), col(&value_name));

        let mut joins = input.joins();
        let depends_upon = joins.last_alias().map(str::to_string);
        joins.add(Join {
            expression: JoinExpression::Lateral { array: value_source },
            table_alias: alias_for(expression),
            kind: JoinKind::LateralView,
            depends_upon,
        });

        PathValue::Element(ElementPath::build(
            ctx.aliases(),
            expression,
            &dataset,
            input.id_column(),
            Some(eid),
            col(&value_name),
            false,
            input.this_column(),
            effective.fhir_type,
            Some(effective),
            foreign,
            input.lineage(),
            joins,
        ))
    } else {
        PathValue::Element(ElementPath::build(
            ctx.aliases(),
            expression,
            input.dataset(),
            input.id_column(),
            input.eid_column(),
            value_source,
            input.is_singular(),
            input.this_column(),
            effective.fhir_type,
            Some(effective),
            foreign,
            input.lineage(),
            input.joins(),
        ))
    };

    Ok(TraversalResult { path, entered_structure })
}

/// A path whose value is absent: emitted when navigation would exceed the
/// recursion limit. Keeps the resolved definition so further navigation
/// stays well-typed; every deeper recursive step is equally absent.
fn absent_path(
    ctx: &ParserContext,
    input: &PathValue,
    expression: &str,
    definition: ElementDefinition,
    foreign: Option<Box<ResourcePath>>,
) -> PathValue {
    let singular = input.is_singular() && !definition.collection;
    let eid = if singular { None } else { input.eid_column() };
    PathValue::Element(ElementPath::build(
        ctx.aliases(),
        expression,
        input.dataset(),
        input.id_column(),
        eid,
        lit(Value::Null),
        singular,
        input.this_column(),
        definition.fhir_type,
        Some(definition),
        foreign,
        input.lineage(),
        input.joins(),
    ))
}
