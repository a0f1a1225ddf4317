//! Terminology functions: translate and memberOf.
//!
//! Both operate on Coding or CodeableConcept inputs. The coding array is
//! extracted — directly for a coding, via the `coding` child for a
//! codeable concept — and the gateway call is captured into a row-level
//! map operation on the dataset, so it executes once per row when the
//! compiled plan later runs, never during compilation.

use std::sync::Arc;

use cairn_columnar::{Column, MapFn, Value, col, make_array, when};
use cairn_fhir_model::{ElementDefinition, FhirType};

use crate::error::{FhirPathError, FhirPathResult, check_user_input};
use crate::function::{
    NamedFunction, NamedFunctionInput, boolean_literal_argument, check_arity,
    optional_string_literal_argument, string_literal_argument,
};
use crate::join::{Join, JoinExpression, JoinKind, alias_for};
use crate::path::{ElementPath, PathValue};
use crate::terminology::{Coding, TerminologyGateway};

const DEFAULT_EQUIVALENCE: &str = "equivalent";

/// Validates a terminology function's input and returns the coding-array
/// column together with the element definition describing one coding of
/// the result.
fn coding_array(
    input: &NamedFunctionInput<'_>,
    name: &str,
) -> FhirPathResult<(Column, Option<ElementDefinition>)> {
    check_user_input(input.context.gateway().is_some(), || {
        format!(
            "Attempt to call terminology function {} when terminology service has not been configured",
            name
        )
    })?;
    let path = &input.input;
    match path.fhir_type() {
        Some(FhirType::Coding) => {
            let array = when(
                path.value_column().is_not_null(),
                make_array(vec![path.value_column()]),
            )
            .end();
            Ok((array, path.definition().cloned()))
        }
        Some(FhirType::CodeableConcept) => {
            let definition = path.definition().and_then(|d| d.child("coding")).cloned();
            Ok((path.value_column().get_field("coding"), definition))
        }
        _ => Err(FhirPathError::InvalidInput(format!(
            "Input to {} function is of unsupported type: {}",
            name,
            path.expression()
        ))),
    }
}

/// `translate(conceptMapUrl [, reverse [, equivalence]])`: translates each
/// input coding through a concept map and re-expands the per-row result
/// array into new rows with freshly generated element identities,
/// mirroring ordinary one-to-many traversal semantics.
pub struct TranslateFunction;

impl NamedFunction for TranslateFunction {
    fn name(&self) -> &'static str {
        "translate"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "translate", 1, 3)?;
        let concept_map_url = string_literal_argument(&input, 0, "translate")?;
        let reverse = boolean_literal_argument(&input, 1, "translate", false)?;
        let equivalence =
            optional_string_literal_argument(&input, 2, "translate", DEFAULT_EQUIVALENCE)?;
        let (codings, definition) = coding_array(&input, "translate")?;

        let gateway: Arc<dyn TerminologyGateway> = input
            .context
            .gateway()
            .cloned()
            .unwrap_or_else(|| panic!("gateway presence checked above"));
        let map: Arc<MapFn> = {
            let url = concept_map_url.clone();
            Arc::new(move |cell: &Value| {
                if cell.is_null() {
                    return Ok(Value::Null);
                }
                let codings = Coding::vec_from_value(cell);
                let translated = gateway
                    .translate(&codings, &url, reverse, &equivalence)
                    .map_err(|e| e.to_string())?;
                if translated.is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Array(translated.iter().map(Coding::to_value).collect()))
                }
            })
        };

        let ctx = input.context;
        let path = &input.input;
        let n = ctx.aliases().next();
        let result_name = format!("translate_{}", n);
        let value_name = format!("exp_value_{}", n);
        let pos_name = format!("exp_pos_{}", n);

        let translated = path
            .dataset()
            .with_column(&result_name, codings.map_value("translate", map));
        let dataset =
            translated.explode_with_position(col(&result_name), &value_name, &pos_name);
        let eid = path.expand_eid(col(&pos_name), col(&value_name));

        let mut joins = path.joins();
        let depends_upon = joins.last_alias().map(str::to_string);
        joins.add(Join {
            expression: JoinExpression::Lateral { array: col(&result_name) },
            table_alias: alias_for(&input.expression),
            kind: JoinKind::LateralView,
            depends_upon,
        });

        let foreign = match path {
            PathValue::Element(e) => e.foreign_resource.clone(),
            _ => None,
        };
        Ok(PathValue::Element(ElementPath::build(
            ctx.aliases(),
            &input.expression,
            &dataset,
            path.id_column(),
            Some(eid),
            col(&value_name),
            false,
            path.this_column(),
            FhirType::Coding,
            definition,
            foreign,
            path.lineage(),
            joins,
        )))
    }
}

/// `memberOf(valueSetUrl)`: a per-value boolean membership test against a
/// value set.
pub struct MemberOfFunction;

impl NamedFunction for MemberOfFunction {
    fn name(&self) -> &'static str {
        "memberOf"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue> {
        check_arity(&input, "memberOf", 1, 1)?;
        let value_set_url = string_literal_argument(&input, 0, "memberOf")?;
        let (codings, _) = coding_array(&input, "memberOf")?;

        let gateway: Arc<dyn TerminologyGateway> = input
            .context
            .gateway()
            .cloned()
            .unwrap_or_else(|| panic!("gateway presence checked above"));
        let map: Arc<MapFn> = Arc::new(move |cell: &Value| {
            if cell.is_null() {
                return Ok(Value::Null);
            }
            let codings = Coding::vec_from_value(cell);
            gateway
                .validate(&value_set_url, &codings)
                .map(Value::Boolean)
                .map_err(|e| e.to_string())
        });

        let ctx = input.context;
        let path = &input.input;
        let n = ctx.aliases().next();
        let result_name = format!("member_of_{}", n);
        let dataset = path
            .dataset()
            .with_column(&result_name, codings.map_value("memberOf", map));

        Ok(PathValue::Element(ElementPath::build(
            ctx.aliases(),
            &input.expression,
            &dataset,
            path.id_column(),
            path.eid_column(),
            col(&result_name),
            path.is_singular(),
            path.this_column(),
            FhirType::Boolean,
            None,
            None,
            path.lineage(),
            path.joins(),
        )))
    }
}
