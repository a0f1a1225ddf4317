mod common;

use cairn_columnar::Value;
use cairn_fhirpath::{
    ExpressionCompiler, FhirPathError, PathValue, compile_aggregation, compile_extraction,
    compile_filter, compile_grouping, compile_query,
};
use common::{context_for, s};

fn values_for<'a>(pairs: &'a [(Value, Value)], id: &str) -> Vec<&'a Value> {
    pairs
        .iter()
        .filter(|(row_id, _)| row_id == &s(id))
        .map(|(_, value)| value)
        .collect()
}

#[test]
fn singular_element_traversal() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx).compile("gender").unwrap();
    assert!(path.is_singular());
    assert_eq!(
        path.collect_values().unwrap(),
        vec![s("female"), s("male"), s("female")]
    );
}

#[test]
fn subject_resource_prefix_roots_the_chain() {
    let ctx = context_for("Patient");
    let implicit = ExpressionCompiler::new(&ctx).compile("gender").unwrap();
    let explicit = ExpressionCompiler::new(&ctx).compile("Patient.gender").unwrap();
    assert_eq!(
        implicit.collect_values().unwrap(),
        explicit.collect_values().unwrap()
    );
}

#[test]
fn repeated_elements_explode_with_stable_identity() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx).compile("name.family").unwrap();
    assert!(!path.is_singular());
    assert!(path.has_order());

    let pairs = path.collect_pairs().unwrap();
    assert_eq!(values_for(&pairs, "p1"), vec![&s("Abbott"), &s("Aylward")]);
    assert_eq!(values_for(&pairs, "p2"), vec![&s("Baker")]);
    // Subjects without values keep a null row through the outer explode.
    assert_eq!(values_for(&pairs, "p3"), vec![&Value::Null]);
}

#[test]
fn nested_repeats_extend_the_parent_identity() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx).compile("name.given").unwrap();
    let triples = path.collect_triples().unwrap();
    let p1: Vec<_> = triples.iter().filter(|(id, _, _)| id == &s("p1")).collect();
    assert_eq!(p1.len(), 3);
    // Lexicographic eid order: [0,0] Alice, [0,1] Ann, [1,0] Amy.
    assert_eq!(p1[0].2, s("Alice"));
    assert_eq!(p1[1].2, s("Ann"));
    assert_eq!(p1[2].2, s("Amy"));
    assert_eq!(
        p1[0].1,
        Value::Array(vec![Value::Integer(0), Value::Integer(0)])
    );
    assert_eq!(
        p1[2].1,
        Value::Array(vec![Value::Integer(1), Value::Integer(0)])
    );
}

#[test]
fn literal_only_expressions_compile() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx).compile("true").unwrap();
    assert!(path.is_literal());
    assert!(path.is_singular());
}

#[test]
fn parse_errors_name_the_expression() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx).compile("name.").unwrap_err();
    match err {
        FhirPathError::ParseError { expression, .. } => assert_eq!(expression, "name."),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn undefined_elements_are_user_errors() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx).compile("frobnicate").unwrap_err();
    match err {
        FhirPathError::UndefinedElement { name, .. } => assert_eq!(name, "frobnicate"),
        other => panic!("expected undefined element, got {:?}", other),
    }
}

#[test]
fn unsupported_features_are_user_errors() {
    let ctx = context_for("Patient");
    let compiler = ExpressionCompiler::new(&ctx);
    for (expression, fragment) in [
        ("name.frobnicate()", "Unsupported function"),
        ("%ucum", "External constants"),
        ("gender is code", "not supported"),
        ("gender ~ 'female'", "Operator '~' is not supported"),
        ("name['x']", "Indexer must be an integer literal"),
    ] {
        let err = compiler.compile(expression).unwrap_err();
        assert!(
            err.to_string().contains(fragment),
            "expected '{}' in error for {}: {}",
            fragment,
            expression,
            err
        );
    }
}

#[test]
fn filter_category_requires_singular_boolean() {
    let ctx = context_for("Patient");
    assert!(compile_filter(&ctx, "gender = 'female'").is_ok());
    let not_boolean = compile_filter(&ctx, "gender").unwrap_err();
    assert!(not_boolean.to_string().contains("singular Boolean"));
    let not_singular = compile_filter(&ctx, "name.family").unwrap_err();
    assert!(not_singular.to_string().contains("singular Boolean"));
}

#[test]
fn grouping_category_requires_materializable() {
    let ctx = context_for("Patient");
    assert!(compile_grouping(&ctx, "gender").is_ok());
    let err = compile_grouping(&ctx, "name").unwrap_err();
    assert!(err.to_string().contains("not materializable"));
}

#[test]
fn aggregation_category_requires_singular_materializable() {
    let ctx = context_for("Patient");
    assert!(compile_aggregation(&ctx, "name.count()").is_ok());
    let err = compile_aggregation(&ctx, "name.family").unwrap_err();
    assert!(err.to_string().contains("singular and materializable"));
}

#[test]
fn extraction_permits_collections() {
    let ctx = context_for("Patient");
    assert!(compile_extraction(&ctx, "name.family").is_ok());
    assert!(compile_extraction(&ctx, "name").is_err());
}

#[test]
fn query_without_filters_passes_the_base_dataset_through() {
    let ctx = context_for("Patient");
    let query = compile_query(&ctx, &[], &[], &["name.count()"]).unwrap();
    assert_eq!(query.dataset.collect().unwrap().len(), 3);
    assert_eq!(query.aggregations.len(), 1);
    // The aggregation's lateral expansion is still recorded.
    assert!(query.joins.iter().any(|j| j.table_alias == "name"));
}

#[test]
fn query_filters_compose_and_apply() {
    let ctx = context_for("Patient");
    let query = compile_query(&ctx, &["gender = 'female'"], &[], &["name.count()"]).unwrap();
    assert_eq!(query.filters.len(), 1);
    assert_eq!(query.dataset.collect().unwrap().len(), 2);
}

#[test]
fn mixing_subject_lineages_is_a_user_error() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx)
        .compile("Organization.name = gender")
        .unwrap_err();
    assert!(err.to_string().contains("not join-compatible"));
}

#[test]
fn compiled_paths_report_canonical_expressions() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("name.where(use = 'official').family")
        .unwrap();
    match &path {
        PathValue::Element(_) => {}
        other => panic!("expected an element path, got {:?}", other),
    }
    assert!(path.expression().contains("where"));
}
