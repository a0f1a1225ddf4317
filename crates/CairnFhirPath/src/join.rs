//! # Join & Dataset Composition Engine
//!
//! Merges independently-built path values into one dataset with consistent
//! row identity, and keeps the declarative record of every merge — the
//! [`JoinSet`] — that accompanies the compiled output.
//!
//! Each [`Join`] describes one dataset merge: how it is performed (a plain
//! table join, a lateral array-exploding view, or an exists-style
//! correlated subquery), the alias identifying it, and an optional
//! predecessor it depends on. Dependencies form a DAG by construction —
//! joins are only ever created forward from already-resolved path values —
//! and insertion order is the tie-break for emission order.

use cairn_columnar::{Aggregate, Column, Dataset, JoinType, coalesce, col, lit};
use cairn_fhir_model::FhirType;
use tracing::debug;

use crate::context::AliasGenerator;
use crate::error::{FhirPathResult, check_user_input};
use crate::path::{ElementPath, PathValue};

/// The kind of dataset merge a join performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// A plain equi-join against another table.
    TableJoin,
    /// A lateral view expanding an array column into rows.
    LateralView,
    /// A correlated subquery collapsed to one boolean row per subject.
    ExistsSubquery,
}

/// How a join is performed, in terms of the dataset substrate.
#[derive(Debug, Clone)]
pub enum JoinExpression {
    Table {
        target: Dataset,
        reference: Column,
        target_id: Column,
    },
    Lateral {
        array: Column,
    },
    Exists {
        subquery: Dataset,
        subject_id: Column,
    },
}

/// One recorded dataset merge.
#[derive(Debug, Clone)]
pub struct Join {
    pub expression: JoinExpression,
    pub table_alias: String,
    pub kind: JoinKind,
    /// The alias of a predecessor join this one builds upon.
    pub depends_upon: Option<String>,
}

/// The ordered set of joins accumulated by a compilation. Aliases are
/// unique; adding a join whose alias is already present resolves to the
/// existing entry instead of duplicating it.
#[derive(Debug, Clone, Default)]
pub struct JoinSet {
    joins: Vec<Join>,
}

impl JoinSet {
    pub fn new() -> Self {
        JoinSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Join> {
        self.joins.iter()
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.joins.iter().any(|j| j.table_alias == alias)
    }

    pub fn last_alias(&self) -> Option<&str> {
        self.joins.last().map(|j| j.table_alias.as_str())
    }

    /// Adds a join, skipping it if the alias is already present. A missing
    /// predecessor is a compiler bug: joins are created forward from
    /// resolved path values, so the dependency must already be here.
    pub fn add(&mut self, join: Join) {
        if self.contains_alias(&join.table_alias) {
            return;
        }
        if let Some(predecessor) = &join.depends_upon {
            assert!(
                self.contains_alias(predecessor),
                "join '{}' depends on '{}', which is not in the set",
                join.table_alias,
                predecessor
            );
        }
        self.joins.push(join);
    }

    /// Merges another set into this one, preserving insertion order and
    /// resolving shared predecessors instead of duplicating them.
    pub fn merge(&mut self, other: &JoinSet) {
        for join in &other.joins {
            self.add(join.clone());
        }
    }
}

/// Derives a join alias from expression text, lower-camel-cased the way
/// the emitted SQL-side aliases read: `Patient.name.given` becomes
/// `patientNameGiven`.
pub(crate) fn alias_for(expression: &str) -> String {
    let mut out = String::new();
    for segment in expression.split(|c: char| !c.is_ascii_alphanumeric()) {
        if segment.is_empty() {
            continue;
        }
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) if out.is_empty() => {
                out.extend(first.to_lowercase());
                out.push_str(chars.as_str());
            }
            Some(first) => {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
            None => {}
        }
    }
    if out.is_empty() { "expr".to_string() } else { out }
}

/// Joins the datasets of the given path values on subject identity,
/// merging their accumulated join sets. Literal operands contribute no
/// dataset; at least one operand must be non-literal.
///
/// Combining is only legal for paths that share subject lineage; mixing
/// lineages is a user input error, not a runtime failure.
pub(crate) fn join_paths(
    paths: &[&PathValue],
    how: JoinType,
) -> FhirPathResult<(Dataset, JoinSet)> {
    let datasets: Vec<&&PathValue> = paths.iter().filter(|p| !p.is_literal()).collect();
    assert!(
        !datasets.is_empty(),
        "dataset composition requires at least one non-literal operand"
    );

    let first = datasets[0];
    for other in &datasets[1..] {
        check_user_input(first.lineage() == other.lineage(), || {
            format!(
                "Operands are not join-compatible: \"{}\" and \"{}\"",
                first.expression(),
                other.expression()
            )
        })?;
    }

    let mut dataset = first.dataset().clone();
    let mut joins = first.joins();
    let first_id = first
        .id_column()
        .unwrap_or_else(|| panic!("path value without an id column cannot be merged"));
    for other in &datasets[1..] {
        let other_id = other
            .id_column()
            .unwrap_or_else(|| panic!("path value without an id column cannot be merged"));
        dataset = dataset.join(other.dataset(), first_id.clone(), other_id, how);
        joins.merge(&other.joins());
    }
    debug!(operands = datasets.len(), "composed datasets");
    Ok((dataset, joins))
}

/// The membership/existence composition: collapses all candidate matches
/// per subject into a single boolean with `MAX`, coalesced to `false`,
/// then keys the result by subject id.
///
/// Any lateral joins pending on the collection side are absorbed into the
/// correlated subquery — a one-to-many expansion cannot simply be joined
/// into a boolean test — and the outer join set gains a single
/// exists-join in their place. Null or absent values on the matched side
/// count as "no match": the aggregated boolean is never null.
pub(crate) fn exists_aggregation(
    aliases: &AliasGenerator,
    singular: &PathValue,
    collection: &PathValue,
    expression: &str,
) -> FhirPathResult<PathValue> {
    let (joined, _) = if singular.is_literal() {
        (collection.dataset().clone(), JoinSet::new())
    } else {
        join_paths(&[singular, collection], JoinType::LeftOuter)?
    };

    let subject_id = if singular.is_literal() {
        collection
            .id_column()
            .unwrap_or_else(|| panic!("collection operand without an id column"))
    } else {
        singular
            .id_column()
            .unwrap_or_else(|| panic!("singular operand without an id column"))
    };

    // Null equality coalesces to false before aggregation, so a subject
    // whose candidates are all null still gets a definite answer.
    let equality = coalesce(vec![
        singular.value_column().eq(collection.value_column()),
        lit(false),
    ]);

    let n = aliases.next();
    let id_name = format!("mid_{}", n);
    let value_name = format!("mval_{}", n);
    let aggregated = joined
        .aggregate(
            vec![(id_name.as_str(), subject_id)],
            vec![(value_name.as_str(), Aggregate::Max(equality))],
        )
        .with_column(&value_name, coalesce(vec![col(&value_name), lit(false)]));

    let subquery_alias = format!(
        "{}Membership",
        collection
            .joins()
            .last_alias()
            .map(str::to_string)
            .unwrap_or_else(|| alias_for(collection.expression()))
    );
    let mut joins = singular.joins();
    let depends_upon = joins.last_alias().map(str::to_string);
    joins.add(Join {
        expression: JoinExpression::Exists {
            subquery: aggregated.clone(),
            subject_id: col(&id_name),
        },
        table_alias: subquery_alias,
        kind: JoinKind::ExistsSubquery,
        depends_upon,
    });

    let lineage = if singular.is_literal() {
        collection.lineage().to_string()
    } else {
        singular.lineage().to_string()
    };
    Ok(PathValue::Element(ElementPath::build(
        aliases,
        expression,
        &aggregated,
        Some(col(&id_name)),
        None,
        col(&value_name),
        true,
        None,
        FhirType::Boolean,
        None,
        None,
        &lineage,
        joins,
    )))
}
