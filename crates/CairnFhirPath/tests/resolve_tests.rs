mod common;

use cairn_columnar::Value;
use cairn_fhirpath::{ExpressionCompiler, JoinKind, PathValue};
use common::{context_for, s};

#[test]
fn monomorphic_resolve_preserves_subject_rows_and_order() {
    let ctx = context_for("Encounter");
    // Four encounters referencing three organizations, one referenced
    // twice: one result row per encounter, carrying the target's data.
    let path = ExpressionCompiler::new(&ctx)
        .compile("serviceProvider.resolve().name")
        .unwrap();
    assert!(path.is_singular());
    assert_eq!(
        path.collect_pairs().unwrap(),
        vec![
            (s("e1"), s("Gold Hospital")),
            (s("e2"), s("Gold Hospital")),
            (s("e3"), s("Silver Clinic")),
            (s("e4"), s("Bronze Surgery")),
        ]
    );
}

#[test]
fn resolve_records_a_table_join() {
    let ctx = context_for("Encounter");
    let path = ExpressionCompiler::new(&ctx)
        .compile("serviceProvider.resolve()")
        .unwrap();
    let joins: Vec<_> = path.joins().iter().cloned().collect();
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0].kind, JoinKind::TableJoin);
}

#[test]
fn polymorphic_resolve_without_argument_is_untyped() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("generalPractitioner.resolve()")
        .unwrap();
    let untyped = match &path {
        PathValue::UntypedResource(u) => u,
        other => panic!("expected an untyped resource path, got {:?}", other),
    };
    assert_eq!(untyped.possible_types(), ["Practitioner", "Organization"]);
    // The per-row discriminator carries each row's actual target type.
    assert_eq!(
        untyped.collect_discriminators().unwrap(),
        vec![s("Practitioner"), s("Organization"), Value::Null]
    );
}

#[test]
fn of_type_narrows_by_discriminator() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("generalPractitioner.resolve().ofType(Practitioner).gender")
        .unwrap();
    assert_eq!(path.collect_pairs().unwrap(), vec![(s("p1"), s("male"))]);
}

#[test]
fn resolve_with_type_argument_narrows_directly() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("generalPractitioner.resolve(Practitioner).gender")
        .unwrap();
    let pairs = path.collect_pairs().unwrap();
    assert!(pairs.contains(&(s("p1"), s("male"))));
    // The practitioner table has no row for p2's organization target.
    assert!(pairs.contains(&(s("p2"), Value::Null)));
}

#[test]
fn resolve_argument_must_be_a_permitted_target() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx)
        .compile("generalPractitioner.resolve(Encounter)")
        .unwrap_err();
    assert!(err.to_string().contains("cannot target Encounter"));
}

#[test]
fn resource_typed_references_require_an_argument() {
    let ctx = context_for("Condition");
    let err = ExpressionCompiler::new(&ctx)
        .compile("evidence.detail.resolve()")
        .unwrap_err();
    assert!(err.to_string().contains("without a type argument"));
}

#[test]
fn resolve_requires_a_reference_input() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx).compile("gender.resolve()").unwrap_err();
    assert!(err.to_string().contains("must be a Reference"));
}

#[test]
fn reverse_resolve_counts_referencing_resources() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("reverseResolve(Condition.subject).count()")
        .unwrap();
    assert_eq!(
        path.collect_pairs().unwrap(),
        vec![
            (s("p1"), Value::Integer(2)),
            (s("p2"), Value::Integer(1)),
            (s("p3"), Value::Integer(0)),
        ]
    );
}

#[test]
fn reverse_resolve_is_navigable_and_unordered() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("reverseResolve(Condition.subject).clinicalStatus.coding.code")
        .unwrap();
    assert!(!path.is_singular());
    assert!(!path.has_order());
    let values = path.collect_values().unwrap();
    let non_null: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    assert_eq!(non_null.len(), 3);
    assert_eq!(non_null.iter().filter(|v| *v == &&s("active")).count(), 2);
    assert_eq!(non_null.iter().filter(|v| *v == &&s("resolved")).count(), 1);
}

#[test]
fn reverse_resolve_argument_must_reference_the_subject() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx)
        .compile("reverseResolve(Encounter.serviceProvider)")
        .unwrap_err();
    assert!(err.to_string().contains("cannot target Patient"));

    let err = ExpressionCompiler::new(&ctx)
        .compile("reverseResolve(Condition.code)")
        .unwrap_err();
    assert!(err.to_string().contains("must be a Reference"));
}
