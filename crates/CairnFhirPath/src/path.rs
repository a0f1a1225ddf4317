//! # The Path Value Model
//!
//! A path value is the compiled representation of one (sub)expression's
//! result against a dataset. Every path value carries the canonical
//! expression text, an immutable dataset handle, the identity column tying
//! rows back to the subject resource, an optional element-identity column
//! ordering repeated values within one subject, the value column itself, a
//! singularity flag, an optional `$this` column for item-context
//! derivations, and the accumulated join set.
//!
//! Path values are immutable: every compilation step derives a new one by
//! copy-with-overrides. Construction re-aliases all supplied columns under
//! fresh names from the compilation-local [`AliasGenerator`] and narrows
//! the dataset to the columns needed downstream, which bounds dataset
//! width across long compositions and guarantees that merging any two
//! path values never collides on column names.
//!
//! The four variants are polymorphic over capability, not class
//! hierarchy: capability checks (`is_comparable_to`, numeric,
//! materializable, reference) are static matches over the variant tag and
//! the declared FHIR type.

use std::collections::BTreeMap;

use cairn_columnar::{
    Column, Dataset, Value, col, concat_arrays, lit, make_array, make_struct, when,
};
use cairn_fhir_model::{ElementDefinition, FhirType, ModelRegistry, ResourceDefinition};
use tracing::trace;

use crate::context::{AliasGenerator, ResourceSource};
use crate::error::{FhirPathError, FhirPathResult, check_user_input};
use crate::join::JoinSet;

/// Common attributes shared by the non-literal variants.
#[derive(Debug, Clone)]
pub(crate) struct PathAttrs {
    pub expression: String,
    pub dataset: Dataset,
    pub id_column: Option<String>,
    pub eid_column: Option<String>,
    pub value_column: String,
    pub singular: bool,
    pub this_column: Option<String>,
    pub lineage: String,
    pub joins: JoinSet,
}

impl PathAttrs {
    /// Binds the supplied columns under fresh unique names and narrows the
    /// dataset to them. `extras` are additional columns to bind and keep
    /// (resource element columns, type discriminators); their bound names
    /// are returned alongside.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        aliases: &AliasGenerator,
        expression: &str,
        dataset: &Dataset,
        id: Option<Column>,
        eid: Option<Column>,
        value: Column,
        singular: bool,
        this: Option<Column>,
        lineage: &str,
        joins: JoinSet,
        extras: Vec<(String, Column)>,
    ) -> (PathAttrs, Vec<String>) {
        // Construction-time invariant, not just a runtime check: a path
        // value declared singular must have no element identity column.
        assert!(
            !(singular && eid.is_some()),
            "singular path value cannot carry an element identity column: {}",
            expression
        );

        let n = aliases.next();
        let mut ds = dataset.clone();
        let mut keep: Vec<String> = Vec::new();

        let id_column = id.map(|column| {
            let name = format!("id_{}", n);
            ds = ds.with_column(&name, column);
            keep.push(name.clone());
            name
        });
        let eid_column = eid.map(|column| {
            let name = format!("eid_{}", n);
            ds = ds.with_column(&name, column);
            keep.push(name.clone());
            name
        });
        let this_column = this.map(|column| {
            let name = format!("this_{}", n);
            ds = ds.with_column(&name, column);
            keep.push(name.clone());
            name
        });
        let value_column = {
            let name = format!("value_{}", n);
            ds = ds.with_column(&name, value);
            keep.push(name.clone());
            name
        };
        let mut extra_names = Vec::with_capacity(extras.len());
        for (base, column) in extras {
            let name = format!("{}_{}", base, n);
            ds = ds.with_column(&name, column);
            keep.push(name.clone());
            extra_names.push(name);
        }

        let keep_refs: Vec<&str> = keep.iter().map(String::as_str).collect();
        let narrowed = ds.select(&keep_refs);
        trace!(expression, columns = keep.len(), "bound path value columns");

        (
            PathAttrs {
                expression: expression.to_string(),
                dataset: narrowed,
                id_column,
                eid_column,
                value_column,
                singular,
                this_column,
                lineage: lineage.to_string(),
                joins,
            },
            extra_names,
        )
    }
}

/// A literal expression: no dataset dependency beyond a join anchor,
/// always singular. The anchor dataset and identity column come from the
/// context the literal was compiled in, so literal-only expressions can
/// still produce one row per subject.
#[derive(Debug, Clone)]
pub struct LiteralPath {
    pub(crate) expression: String,
    pub(crate) dataset: Dataset,
    pub(crate) id_column: Option<String>,
    pub(crate) value: Value,
    pub(crate) fhir_type: Option<FhirType>,
    pub(crate) lineage: String,
}

impl LiteralPath {
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A typed element within a resource (or complex type), the workhorse
/// variant of the model.
#[derive(Debug, Clone)]
pub struct ElementPath {
    pub(crate) attrs: PathAttrs,
    pub(crate) fhir_type: FhirType,
    pub(crate) definition: Option<ElementDefinition>,
    /// The resource this path originated from when it crossed a resource
    /// boundary (reverse or forward resolve).
    pub(crate) foreign_resource: Option<Box<ResourcePath>>,
}

impl ElementPath {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        aliases: &AliasGenerator,
        expression: &str,
        dataset: &Dataset,
        id: Option<Column>,
        eid: Option<Column>,
        value: Column,
        singular: bool,
        this: Option<Column>,
        fhir_type: FhirType,
        definition: Option<ElementDefinition>,
        foreign_resource: Option<Box<ResourcePath>>,
        lineage: &str,
        joins: JoinSet,
    ) -> ElementPath {
        let (attrs, _) = PathAttrs::build(
            aliases, expression, dataset, id, eid, value, singular, this, lineage, joins,
            Vec::new(),
        );
        ElementPath { attrs, fhir_type, definition, foreign_resource }
    }
}

/// A whole-resource context. Element columns are bound alongside the core
/// columns so that navigation from the resource does not need to re-read
/// the source table, and the value column is the resource identity.
#[derive(Debug, Clone)]
pub struct ResourcePath {
    pub(crate) attrs: PathAttrs,
    pub(crate) resource_type: String,
    pub(crate) definition: ResourceDefinition,
    pub(crate) elements: BTreeMap<String, String>,
}

impl ResourcePath {
    /// Roots a resource context at the source table for `resource_type`.
    /// Elements missing from the encoded table are bound as nulls, so a
    /// narrower encoding still compiles.
    pub(crate) fn build(
        aliases: &AliasGenerator,
        registry: &dyn ModelRegistry,
        source: &dyn ResourceSource,
        resource_type: &str,
        expression: &str,
    ) -> FhirPathResult<ResourcePath> {
        let definition = registry.definition_for(resource_type).cloned().ok_or_else(|| {
            FhirPathError::InvalidInput(format!("Unknown resource type: {}", resource_type))
        })?;
        let table = source.dataset_for(resource_type).ok_or_else(|| {
            FhirPathError::InvalidInput(format!(
                "No dataset available for resource type: {}",
                resource_type
            ))
        })?;
        let table_schema = table.schema()?;
        check_user_input(table_schema.iter().any(|c| c == "id"), || {
            format!("Dataset for {} does not carry an id column", resource_type)
        })?;

        let extras: Vec<(String, Column)> = definition
            .elements
            .iter()
            .map(|element| {
                let source_column = if table_schema.contains(&element.name) {
                    col(&element.name)
                } else {
                    lit(Value::Null)
                };
                (format!("el_{}", element.name), source_column)
            })
            .collect();

        let lineage = format!("{}#{}", resource_type, aliases.next());
        let (attrs, extra_names) = PathAttrs::build(
            aliases,
            expression,
            &table,
            Some(col("id")),
            None,
            col("id"),
            true,
            None,
            &lineage,
            JoinSet::new(),
            extras,
        );
        let elements = definition
            .elements
            .iter()
            .map(|element| element.name.clone())
            .zip(extra_names)
            .collect();
        Ok(ResourcePath { attrs, resource_type: resource_type.to_string(), definition, elements })
    }

    /// Derives a resource path over an already-merged dataset, keeping
    /// subject identity separate from the resource's own element columns.
    /// Used by resolve, reverseResolve and ofType.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn derive(
        aliases: &AliasGenerator,
        expression: &str,
        dataset: &Dataset,
        id: Column,
        eid: Option<Column>,
        value: Column,
        singular: bool,
        this: Option<Column>,
        elements: &BTreeMap<String, String>,
        resource_type: &str,
        definition: ResourceDefinition,
        lineage: &str,
        joins: JoinSet,
    ) -> ResourcePath {
        let extras: Vec<(String, Column)> = elements
            .iter()
            .map(|(element, bound)| (format!("el_{}", element), col(bound)))
            .collect();
        let (attrs, extra_names) = PathAttrs::build(
            aliases,
            expression,
            dataset,
            Some(id),
            eid,
            value,
            singular,
            this,
            lineage,
            joins,
            extras,
        );
        let elements = elements.keys().cloned().zip(extra_names).collect();
        ResourcePath {
            attrs,
            resource_type: resource_type.to_string(),
            definition,
            elements,
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    /// The bound column holding a top-level element's encoded value.
    pub(crate) fn element_column(&self, name: &str) -> Option<Column> {
        self.elements.get(name).map(|bound| col(bound))
    }
}

/// The result of a polymorphic resolve: resource rows of more than one
/// possible type, discriminated by a per-row type column. Must be narrowed
/// with `ofType` before navigation.
#[derive(Debug, Clone)]
pub struct UntypedResourcePath {
    pub(crate) attrs: PathAttrs,
    pub(crate) type_column: String,
    pub(crate) possible_types: Vec<String>,
}

impl UntypedResourcePath {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        aliases: &AliasGenerator,
        expression: &str,
        dataset: &Dataset,
        id: Column,
        eid: Option<Column>,
        value: Column,
        singular: bool,
        this: Option<Column>,
        type_column: Column,
        possible_types: Vec<String>,
        lineage: &str,
        joins: JoinSet,
    ) -> UntypedResourcePath {
        let (attrs, extra_names) = PathAttrs::build(
            aliases,
            expression,
            dataset,
            Some(id),
            eid,
            value,
            singular,
            this,
            lineage,
            joins,
            vec![("type".to_string(), type_column)],
        );
        let type_column = extra_names.into_iter().next().unwrap_or_default();
        UntypedResourcePath { attrs, type_column, possible_types }
    }

    pub fn possible_types(&self) -> &[String] {
        &self.possible_types
    }

    pub(crate) fn type_column(&self) -> Column {
        col(&self.type_column)
    }

    /// Evaluates the dataset and returns the per-row type discriminators.
    pub fn collect_discriminators(&self) -> FhirPathResult<Vec<Value>> {
        let table = self.attrs.dataset.collect()?;
        let index = table
            .column_index(&self.type_column)
            .unwrap_or_else(|| panic!("type discriminator column missing from collected table"));
        Ok(table.rows.iter().map(|row| row[index].clone()).collect())
    }
}

/// The compiled representation of one (sub)expression.
#[derive(Debug, Clone)]
pub enum PathValue {
    Literal(LiteralPath),
    Element(ElementPath),
    Resource(ResourcePath),
    UntypedResource(UntypedResourcePath),
}

impl PathValue {
    fn attrs(&self) -> Option<&PathAttrs> {
        match self {
            PathValue::Literal(_) => None,
            PathValue::Element(p) => Some(&p.attrs),
            PathValue::Resource(p) => Some(&p.attrs),
            PathValue::UntypedResource(p) => Some(&p.attrs),
        }
    }

    pub fn expression(&self) -> &str {
        match self {
            PathValue::Literal(p) => &p.expression,
            PathValue::Element(p) => &p.attrs.expression,
            PathValue::Resource(p) => &p.attrs.expression,
            PathValue::UntypedResource(p) => &p.attrs.expression,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        match self {
            PathValue::Literal(p) => &p.dataset,
            PathValue::Element(p) => &p.attrs.dataset,
            PathValue::Resource(p) => &p.attrs.dataset,
            PathValue::UntypedResource(p) => &p.attrs.dataset,
        }
    }

    pub fn id_column(&self) -> Option<Column> {
        self.id_column_name().map(col)
    }

    pub(crate) fn id_column_name(&self) -> Option<&str> {
        match self {
            PathValue::Literal(p) => p.id_column.as_deref(),
            PathValue::Element(p) => p.attrs.id_column.as_deref(),
            PathValue::Resource(p) => p.attrs.id_column.as_deref(),
            PathValue::UntypedResource(p) => p.attrs.id_column.as_deref(),
        }
    }

    pub fn eid_column(&self) -> Option<Column> {
        self.attrs().and_then(|a| a.eid_column.as_deref().map(col))
    }

    pub fn value_column(&self) -> Column {
        match self {
            PathValue::Literal(p) => lit(p.value.clone()),
            PathValue::Element(p) => col(&p.attrs.value_column),
            PathValue::Resource(p) => col(&p.attrs.value_column),
            PathValue::UntypedResource(p) => col(&p.attrs.value_column),
        }
    }

    pub fn is_singular(&self) -> bool {
        match self {
            PathValue::Literal(_) => true,
            other => other.attrs().map(|a| a.singular).unwrap_or(true),
        }
    }

    pub fn this_column(&self) -> Option<Column> {
        self.attrs().and_then(|a| a.this_column.as_deref().map(col))
    }

    pub fn joins(&self) -> JoinSet {
        match self {
            PathValue::Literal(_) => JoinSet::new(),
            other => other.attrs().map(|a| a.joins.clone()).unwrap_or_default(),
        }
    }

    pub fn lineage(&self) -> &str {
        match self {
            PathValue::Literal(p) => &p.lineage,
            PathValue::Element(p) => &p.attrs.lineage,
            PathValue::Resource(p) => &p.attrs.lineage,
            PathValue::UntypedResource(p) => &p.attrs.lineage,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, PathValue::Literal(_))
    }

    pub fn literal_value(&self) -> Option<&Value> {
        match self {
            PathValue::Literal(p) => Some(&p.value),
            _ => None,
        }
    }

    /// The declared FHIR type, where one exists. Resource contexts have a
    /// resource type instead; null literals have none.
    pub fn fhir_type(&self) -> Option<FhirType> {
        match self {
            PathValue::Literal(p) => p.fhir_type,
            PathValue::Element(p) => Some(p.fhir_type),
            _ => None,
        }
    }

    pub fn definition(&self) -> Option<&ElementDefinition> {
        match self {
            PathValue::Element(p) => p.definition.as_ref(),
            _ => None,
        }
    }

    pub fn foreign_resource(&self) -> Option<&ResourcePath> {
        match self {
            PathValue::Element(p) => p.foreign_resource.as_deref(),
            _ => None,
        }
    }

    /// Whether each subject row's values have a defined order: true when
    /// the path is singular or carries an element identity column.
    pub fn has_order(&self) -> bool {
        self.is_singular() || self.eid_column().is_some()
    }

    /// The dataset sorted by element identity. A user input error when the
    /// path has no defined order.
    pub fn ordered_dataset(&self) -> FhirPathResult<Dataset> {
        check_user_input(self.has_order(), || {
            format!("Orderable path expected: {}", self.expression())
        })?;
        Ok(match self.eid_column() {
            Some(eid) => self.dataset().order_by(vec![eid]),
            None => self.dataset().clone(),
        })
    }

    /// The element identity expression, or a null literal marking an
    /// unordered path.
    pub fn ordering_column(&self) -> Column {
        self.eid_column().unwrap_or_else(|| lit(Value::Null))
    }

    /// Builds the element identity of a child produced by expanding this
    /// path's value: null when the child value is null, `[index]` when
    /// this path has no identity of its own, `parent ++ [index]`
    /// otherwise.
    pub fn expand_eid(&self, index: Column, value: Column) -> Column {
        let parent = self.ordering_column();
        when(value.is_null(), lit(Value::Null))
            .when(parent.clone().is_null(), make_array(vec![index.clone()]))
            .otherwise(concat_arrays(parent, make_array(vec![index])))
    }

    /// Derives an item-context copy for compiling argument sub-expressions:
    /// singular, no element identity of its own, with a `$this` column
    /// materializing the `(eid, value)` pair of each item.
    pub fn to_this_path(&self, aliases: &AliasGenerator) -> FhirPathResult<PathValue> {
        check_user_input(!self.is_literal(), || {
            format!("Literal has no item context: {}", self.expression())
        })?;
        let this = make_struct(vec![
            ("eid", self.ordering_column()),
            ("value", self.value_column()),
        ]);
        Ok(self.copy_with(
            aliases,
            "$this",
            self.dataset(),
            self.id_column(),
            None,
            self.value_column(),
            true,
            Some(this),
            self.joins(),
        ))
    }

    /// Copy-with-overrides, preserving each variant's type metadata.
    /// Literal paths are terminal and cannot be derived from; attempting
    /// to is a compiler bug.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn copy_with(
        &self,
        aliases: &AliasGenerator,
        expression: &str,
        dataset: &Dataset,
        id: Option<Column>,
        eid: Option<Column>,
        value: Column,
        singular: bool,
        this: Option<Column>,
        joins: JoinSet,
    ) -> PathValue {
        match self {
            PathValue::Literal(p) => {
                panic!("literal path values are not derivable: {}", p.expression)
            }
            PathValue::Element(p) => PathValue::Element(ElementPath::build(
                aliases,
                expression,
                dataset,
                id,
                eid,
                value,
                singular,
                this,
                p.fhir_type,
                p.definition.clone(),
                p.foreign_resource.clone(),
                &p.attrs.lineage,
                joins,
            )),
            PathValue::Resource(p) => {
                let id = id.unwrap_or_else(|| {
                    panic!("resource path copy requires an id column: {}", expression)
                });
                PathValue::Resource(ResourcePath::derive(
                    aliases,
                    expression,
                    dataset,
                    id,
                    eid,
                    value,
                    singular,
                    this,
                    &p.elements,
                    &p.resource_type,
                    p.definition.clone(),
                    &p.attrs.lineage,
                    joins,
                ))
            }
            PathValue::UntypedResource(p) => {
                let id = id.unwrap_or_else(|| {
                    panic!("resource path copy requires an id column: {}", expression)
                });
                PathValue::UntypedResource(UntypedResourcePath::build(
                    aliases,
                    expression,
                    dataset,
                    id,
                    eid,
                    value,
                    singular,
                    this,
                    p.type_column(),
                    p.possible_types.clone(),
                    &p.attrs.lineage,
                    joins,
                ))
            }
        }
    }

    /// Finds a `$this` column among sibling inputs, used when an operator
    /// must inherit the item context from whichever operand carries it.
    pub fn find_this_column(inputs: &[&PathValue]) -> Option<Column> {
        inputs.iter().find_map(|p| p.this_column())
    }

    /// Finds an element identity column among sibling inputs.
    pub fn find_eid_column(inputs: &[&PathValue]) -> Option<Column> {
        inputs.iter().find_map(|p| p.eid_column())
    }

    // Capability checks: static matches over variant tag and declared
    // type, in place of runtime casts.

    pub fn is_boolean_type(&self) -> bool {
        matches!(self.fhir_type(), Some(FhirType::Boolean))
            || matches!(self.literal_value(), Some(Value::Boolean(_)))
    }

    pub fn is_numeric_type(&self) -> bool {
        self.fhir_type().map(|t| t.is_numeric()).unwrap_or(false)
    }

    pub fn is_string_like_type(&self) -> bool {
        self.fhir_type().map(|t| t.is_string_like()).unwrap_or(false)
    }

    /// Whether this path can be materialized into a concrete domain value
    /// for output: primitives and codings qualify, whole resources do not.
    pub fn is_materializable(&self) -> bool {
        match self {
            PathValue::Literal(p) => p.fhir_type.is_some(),
            PathValue::Element(p) => p.fhir_type.is_primitive() || p.fhir_type == FhirType::Coding,
            _ => false,
        }
    }

    /// Whether two paths may be compared with ordering/equality operators.
    /// A null literal compares with anything; complex types compare only
    /// for equality against the same type.
    pub fn is_comparable_to(&self, other: &PathValue) -> bool {
        match (self.fhir_type(), other.fhir_type()) {
            (Some(a), Some(b)) => a.comparable_with(&b) || a == b,
            // Null literals take the comparability of the other side.
            (None, _) | (_, None) => self.is_null_literal() || other.is_null_literal(),
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, PathValue::Literal(p) if p.fhir_type.is_none())
    }

    /// The element definition when this path has the reference capability.
    pub fn reference_definition(&self) -> Option<&ElementDefinition> {
        match self {
            PathValue::Element(p) if p.fhir_type == FhirType::Reference => p.definition.as_ref(),
            _ => None,
        }
    }

    /// The raw identifier string of a reference value.
    pub fn raw_reference_column(&self) -> Column {
        self.value_column().get_field("reference")
    }

    fn bound_value_name(&self) -> Option<&str> {
        self.attrs().map(|a| a.value_column.as_str())
    }

    /// Evaluates the path and returns its value cells, ordered by element
    /// identity where the path has a defined order, in plan row order
    /// otherwise.
    pub fn collect_values(&self) -> FhirPathResult<Vec<Value>> {
        Ok(self.collect_triples()?.into_iter().map(|(_, _, v)| v).collect())
    }

    /// Evaluates the path and returns `(subject id, value)` pairs.
    pub fn collect_pairs(&self) -> FhirPathResult<Vec<(Value, Value)>> {
        Ok(self
            .collect_triples()?
            .into_iter()
            .map(|(id, _, v)| (id, v))
            .collect())
    }

    /// Evaluates the path and returns `(subject id, element identity,
    /// value)` triples. A literal yields its single anchored value.
    pub fn collect_triples(&self) -> FhirPathResult<Vec<(Value, Value, Value)>> {
        if let PathValue::Literal(p) = self {
            return Ok(vec![(Value::Null, Value::Null, p.value.clone())]);
        }
        let dataset = if self.has_order() {
            self.ordered_dataset()?
        } else {
            self.dataset().clone()
        };
        let table = dataset.collect()?;
        let value_index = self
            .bound_value_name()
            .and_then(|name| table.column_index(name))
            .unwrap_or_else(|| panic!("bound value column missing from collected table"));
        let id_index = self.id_column_name().and_then(|name| table.column_index(name));
        let eid_index = self
            .attrs()
            .and_then(|a| a.eid_column.as_deref())
            .and_then(|name| table.column_index(name));
        Ok(table
            .rows
            .iter()
            .map(|row| {
                (
                    id_index.map(|i| row[i].clone()).unwrap_or(Value::Null),
                    eid_index.map(|i| row[i].clone()).unwrap_or(Value::Null),
                    row[value_index].clone(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_columnar::Value;

    fn dataset() -> Dataset {
        Dataset::from_rows(
            "t",
            vec!["id", "value", "eid"],
            vec![vec![
                Value::from("p1"),
                Value::from("x"),
                Value::Array(vec![Value::Integer(0)]),
            ]],
        )
    }

    fn element(generator: &AliasGenerator, singular: bool, eid: Option<Column>) -> ElementPath {
        ElementPath::build(
            generator,
            "test",
            &dataset(),
            Some(col("id")),
            eid,
            col("value"),
            singular,
            None,
            FhirType::String,
            None,
            None,
            "Patient#0",
            JoinSet::new(),
        )
    }

    #[test]
    #[should_panic(expected = "singular path value cannot carry an element identity column")]
    fn singular_path_with_eid_fails_at_construction() {
        element(&AliasGenerator::new(), true, Some(col("eid")));
    }

    #[test]
    fn construction_rebinds_and_narrows() {
        let generator = AliasGenerator::new();
        let path = PathValue::Element(element(&generator, false, Some(col("eid"))));
        let schema = path.dataset().schema().unwrap();
        // Only freshly bound columns survive, so merges never collide.
        assert_eq!(schema.len(), 3);
        assert!(schema.iter().all(|c| c.ends_with("_0")));
        assert!(path.has_order());
        assert!(!path.is_singular());
    }

    #[test]
    fn singular_paths_are_ordered_without_eid() {
        let path = PathValue::Element(element(&AliasGenerator::new(), true, None));
        assert!(path.has_order());
        assert!(path.ordered_dataset().is_ok());
    }

    #[test]
    fn unordered_path_rejects_ordered_dataset() {
        let path = PathValue::Element(element(&AliasGenerator::new(), false, None));
        assert!(!path.has_order());
        let err = path.ordered_dataset().unwrap_err();
        assert!(err.to_string().contains("Orderable path expected"));
    }

    #[test]
    fn this_path_is_singular_and_carries_the_pair() {
        let generator = AliasGenerator::new();
        let path = PathValue::Element(element(&generator, false, Some(col("eid"))));
        let this_path = path.to_this_path(&generator).unwrap();
        assert!(this_path.is_singular());
        assert!(this_path.eid_column().is_none());
        assert!(this_path.this_column().is_some());
    }
}
