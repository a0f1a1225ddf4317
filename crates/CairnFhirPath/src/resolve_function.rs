//! Forward and reverse traversal across reference-typed links.
//!
//! `resolve()` follows a reference to its target resource: directly when
//! the reference is monomorphic, via a single bare-resource-type argument
//! when it is polymorphic or typed as `Resource`, and into an untyped
//! result carrying a per-row type discriminator when a polymorphic
//! reference is resolved without an argument (narrow afterwards with
//! `ofType`).
//!
//! `reverseResolve(Foreign.reference)` walks the link backwards: from the
//! subject context to the foreign resources whose reference points at it.
//!
//! References join on their raw identifier string against the target
//! table's identity column; subject identity and, for forward resolve,
//! original element ordering are preserved.

use cairn_columnar::{Dataset, JoinType, col, lit};

use crate::error::{FhirPathError, FhirPathResult, check_user_input};
use crate::function::{NamedFunction, NamedFunctionInput, check_arity};
use crate::join::{Join, JoinExpression, JoinKind, alias_for};
use crate::path::{PathValue, ResourcePath, UntypedResourcePath};

/// `resolve()` / `resolve(TargetType)`.
pub struct ResolveFunction;

impl NamedFunction for ResolveFunction {
    fn name(&self) -> &'static str {
        "resolve"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "resolve", 0, 1)?;
        let definition = input.input.reference_definition().cloned().ok_or_else(|| {
            FhirPathError::InvalidInput(format!(
                "Input to resolve function must be a Reference: {}",
                input.input.expression()
            ))
        })?;
        let targets = &definition.reference_targets;
        check_user_input(!targets.is_empty(), || {
            format!("Reference has no declared target types: {}", input.expression)
        })?;

        if let Some(argument) = input.arguments.first() {
            // Explicit narrowing: the argument must name a permissible
            // target resource type.
            let target_type = match argument {
                PathValue::Resource(r) => r.resource_type().to_string(),
                other => {
                    return Err(FhirPathError::InvalidInput(format!(
                        "Argument to resolve function must be a base resource type: {}",
                        other.expression()
                    )));
                }
            };
            check_user_input(
                targets.iter().any(|t| t == &target_type || t == "Resource"),
                || {
                    format!(
                        "Reference cannot target {}: {}",
                        target_type, input.expression
                    )
                },
            )?;
            return typed_resolve(&input, &target_type);
        }

        if targets.len() == 1 && targets[0] != "Resource" {
            return typed_resolve(&input, &targets[0]);
        }
        check_user_input(!targets.iter().any(|t| t == "Resource"), || {
            format!(
                "Attempt to resolve a Resource-typed reference without a type argument: {}",
                input.expression
            )
        })?;
        untyped_resolve(&input, targets.clone())
    }
}

/// Resolve to one known target type: a left join from the reference's raw
/// identifier to the target table's identity.
fn typed_resolve(input: &NamedFunctionInput<'_>, target_type: &str) -> FhirPathResult<PathValue> {
    let ctx = input.context;
    let reference = &input.input;
    let target = ResourcePath::build(
        ctx.aliases(),
        ctx.registry(),
        ctx.source(),
        target_type,
        target_type,
    )?;

    let target_id = col(&target.attrs.value_column);
    let dataset = reference.dataset().join(
        &target.attrs.dataset,
        reference.raw_reference_column(),
        target_id.clone(),
        JoinType::LeftOuter,
    );

    let mut joins = reference.joins();
    let depends_upon = joins.last_alias().map(str::to_string);
    joins.add(Join {
        expression: JoinExpression::Table {
            target: target.attrs.dataset.clone(),
            reference: reference.raw_reference_column(),
            target_id,
        },
        table_alias: alias_for(&input.expression),
        kind: JoinKind::TableJoin,
        depends_upon,
    });

    let id = reference
        .id_column()
        .unwrap_or_else(|| panic!("reference path without an id column"));
    Ok(PathValue::Resource(ResourcePath::derive(
        ctx.aliases(),
        &input.expression,
        &dataset,
        id,
        reference.eid_column(),
        col(&target.attrs.value_column),
        reference.is_singular(),
        reference.this_column(),
        &target.elements,
        target_type,
        target.definition.clone(),
        reference.lineage(),
        joins,
    )))
}

/// Resolve a polymorphic reference without narrowing: a union of the
/// candidate target identities, discriminated per row by the actual
/// target's type.
fn untyped_resolve(
    input: &NamedFunctionInput<'_>,
    targets: Vec<String>,
) -> FhirPathResult<PathValue> {
    let ctx = input.context;
    let reference = &input.input;

    let n = ctx.aliases().next();
    let id_name = format!("rt_id_{}", n);
    let type_name = format!("rt_type_{}", n);
    let mut union: Option<Dataset> = None;
    for target in &targets {
        let table = ctx.source().dataset_for(target).ok_or_else(|| {
            FhirPathError::InvalidInput(format!(
                "No dataset available for resource type: {}",
                target
            ))
        })?;
        let branch = table
            .with_column(&id_name, col("id"))
            .with_column(&type_name, lit(target.as_str()))
            .select(&[id_name.as_str(), type_name.as_str()]);
        union = Some(match union {
            Some(acc) => acc.union_all(&branch),
            None => branch,
        });
    }
    let candidates =
        union.unwrap_or_else(|| panic!("untyped resolve requires at least one target type"));

    let dataset = reference.dataset().join(
        &candidates,
        reference.raw_reference_column(),
        col(&id_name),
        JoinType::LeftOuter,
    );

    let mut joins = reference.joins();
    let depends_upon = joins.last_alias().map(str::to_string);
    joins.add(Join {
        expression: JoinExpression::Table {
            target: candidates,
            reference: reference.raw_reference_column(),
            target_id: col(&id_name),
        },
        table_alias: alias_for(&input.expression),
        kind: JoinKind::TableJoin,
        depends_upon,
    });

    let id = reference
        .id_column()
        .unwrap_or_else(|| panic!("reference path without an id column"));
    Ok(PathValue::UntypedResource(UntypedResourcePath::build(
        ctx.aliases(),
        &input.expression,
        &dataset,
        id,
        reference.eid_column(),
        col(&id_name),
        reference.is_singular(),
        reference.this_column(),
        col(&type_name),
        targets,
        reference.lineage(),
        joins,
    )))
}

/// `reverseResolve(Foreign.reference)`.
pub struct ReverseResolveFunction;

impl NamedFunction for ReverseResolveFunction {
    fn name(&self) -> &'static str {
        "reverseResolve"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "reverseResolve", 1, 1)?;
        let subject = match &input.input {
            PathValue::Resource(r) => r,
            other => {
                return Err(FhirPathError::InvalidInput(format!(
                    "reverseResolve may only be invoked on a resource: {}",
                    other.expression()
                )));
            }
        };
        let argument = &input.arguments[0];
        let reference_definition = argument.reference_definition().cloned().ok_or_else(|| {
            FhirPathError::InvalidInput(format!(
                "Argument to reverseResolve must be a Reference: {}",
                argument.expression()
            ))
        })?;
        let foreign = argument.foreign_resource().cloned().ok_or_else(|| {
            FhirPathError::InvalidInput(format!(
                "Argument to reverseResolve must be a reference within a foreign resource: {}",
                argument.expression()
            ))
        })?;
        check_user_input(
            reference_definition
                .reference_targets
                .iter()
                .any(|t| t == subject.resource_type() || t == "Resource"),
            || {
                format!(
                    "Reference in argument cannot target {}: {}",
                    subject.resource_type(),
                    input.expression
                )
            },
        )?;

        let ctx = input.context;
        // Subject to foreign reference, then back onto the foreign root to
        // recover its element columns.
        let joined = input.input.dataset().join(
            argument.dataset(),
            input.input.value_column(),
            argument.raw_reference_column(),
            JoinType::LeftOuter,
        );
        let argument_id = argument
            .id_column()
            .unwrap_or_else(|| panic!("argument path without an id column"));
        let dataset = joined.join(
            &foreign.attrs.dataset,
            argument_id,
            col(&foreign.attrs.value_column),
            JoinType::LeftOuter,
        );

        let mut joins = input.input.joins();
        joins.merge(&argument.joins());
        let depends_upon = joins.last_alias().map(str::to_string);
        joins.add(Join {
            expression: JoinExpression::Table {
                target: foreign.attrs.dataset.clone(),
                reference: argument.raw_reference_column(),
                target_id: input.input.value_column(),
            },
            table_alias: alias_for(&input.expression),
            kind: JoinKind::TableJoin,
            depends_upon,
        });

        let id = input
            .input
            .id_column()
            .unwrap_or_else(|| panic!("subject path without an id column"));
        // One row per referencing foreign resource, in no defined order.
        Ok(PathValue::Resource(ResourcePath::derive(
            ctx.aliases(),
            &input.expression,
            &dataset,
            id,
            None,
            col(&foreign.attrs.value_column),
            false,
            input.input.this_column(),
            &foreign.elements,
            foreign.resource_type(),
            foreign.definition.clone(),
            input.input.lineage(),
            joins,
        )))
    }
}
