mod common;

use cairn_columnar::Value;
use cairn_fhirpath::ExpressionCompiler;
use common::{context_for, s};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn compile_values(expression: &str) -> Vec<Value> {
    let ctx = context_for("Patient");
    ExpressionCompiler::new(&ctx)
        .compile(expression)
        .unwrap_or_else(|e| panic!("failed to compile '{}': {}", expression, e))
        .collect_values()
        .unwrap()
}

#[test]
fn comparison_operators_yield_singular_booleans() {
    assert_eq!(
        compile_values("gender = 'female'"),
        vec![Value::Boolean(true), Value::Boolean(false), Value::Boolean(true)]
    );
    assert_eq!(
        compile_values("multipleBirthInteger >= 2"),
        // Absent operands propagate as absent, not false.
        vec![Value::Boolean(false), Value::Boolean(true), Value::Null]
    );
}

#[test]
fn boolean_logic_is_three_valued() {
    assert_eq!(
        compile_values("active and gender = 'female'"),
        vec![Value::Boolean(true), Value::Boolean(false), Value::Boolean(true)]
    );
    // false and {} is false; true and {} is unknown.
    assert_eq!(
        compile_values("active and multipleBirthInteger > 1"),
        vec![Value::Boolean(false), Value::Boolean(false), Value::Null]
    );
    assert_eq!(
        compile_values("active implies gender = 'female'"),
        vec![Value::Boolean(true), Value::Boolean(true), Value::Boolean(true)]
    );
}

#[test]
fn math_operators_promote_to_decimal() {
    assert_eq!(
        compile_values("multipleBirthInteger + 1"),
        vec![Value::Integer(2), Value::Integer(3), Value::Null]
    );
    assert_eq!(
        compile_values("multipleBirthInteger / 2"),
        vec![
            Value::Decimal(dec!(0.5)),
            Value::Decimal(Decimal::from(1)),
            Value::Null
        ]
    );
    assert_eq!(
        compile_values("multipleBirthInteger mod 2"),
        vec![Value::Integer(1), Value::Integer(0), Value::Null]
    );
}

#[test]
fn polarity_negates_numeric_literals_and_paths() {
    assert_eq!(
        compile_values("-multipleBirthInteger"),
        vec![Value::Integer(-1), Value::Integer(-2), Value::Null]
    );
    let ctx = context_for("Patient");
    let literal = ExpressionCompiler::new(&ctx).compile("-5").unwrap();
    assert_eq!(literal.literal_value(), Some(&Value::Integer(-5)));
}

#[test]
fn string_concatenation() {
    assert_eq!(
        compile_values("gender & '!'"),
        vec![s("female!"), s("male!"), s("female!")]
    );
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx).compile("active & '!'").unwrap_err();
    assert!(err.to_string().contains("string operands"));
}

#[test]
fn operators_require_singular_operands() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx)
        .compile("name.family = 'Abbott'")
        .unwrap_err();
    assert!(err.to_string().contains("must be singular"));
}

#[test]
fn incomparable_operands_are_rejected() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx)
        .compile("gender = multipleBirthInteger")
        .unwrap_err();
    assert!(err.to_string().contains("not comparable"));
}

#[test]
fn combine_merges_into_an_unordered_collection() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("name.given | name.family")
        .unwrap();
    assert!(!path.is_singular());
    assert!(!path.has_order());
    let values = path.collect_values().unwrap();
    let non_null: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    assert_eq!(non_null.len(), 7);
    for expected in ["Alice", "Ann", "Amy", "Bob", "Abbott", "Aylward", "Baker"] {
        assert!(non_null.contains(&&s(expected)), "missing {}", expected);
    }
}

#[test]
fn indexer_selects_by_element_order() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx).compile("name[0].family").unwrap();
    assert!(path.is_singular());
    let pairs = path.collect_pairs().unwrap();
    assert!(pairs.contains(&(s("p1"), s("Abbott"))));
    assert!(pairs.contains(&(s("p2"), s("Baker"))));
}

#[test]
fn where_filters_by_item_criteria() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("name.where(use = 'official').family")
        .unwrap();
    let pairs = path.collect_pairs().unwrap();
    let non_null: Vec<_> = pairs.iter().filter(|(_, v)| !v.is_null()).collect();
    assert_eq!(non_null.len(), 2);
    assert!(pairs.contains(&(s("p1"), s("Abbott"))));
    assert!(!pairs.contains(&(s("p1"), s("Aylward"))));
    assert!(pairs.contains(&(s("p2"), s("Baker"))));
}

#[test]
fn where_criteria_must_be_boolean() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx)
        .compile("name.where(family)")
        .unwrap_err();
    assert!(err.to_string().contains("Boolean"));
}

#[test]
fn iif_selects_between_branches() {
    assert_eq!(
        compile_values("iif(gender = 'female', 1, 0)"),
        vec![Value::Integer(1), Value::Integer(0), Value::Integer(1)]
    );
}

#[test]
fn iif_widens_branch_types() {
    assert_eq!(
        compile_values("iif(active, 1, 0.5)"),
        vec![
            Value::Integer(1),
            Value::Decimal(dec!(0.5)),
            Value::Integer(1)
        ]
    );
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx)
        .compile("iif(active, 1, 'no')")
        .unwrap_err();
    assert!(err.to_string().contains("cannot be merged"));
}

#[test]
fn iif_condition_must_be_singular_boolean() {
    let ctx = context_for("Patient");
    let err = ExpressionCompiler::new(&ctx)
        .compile("iif(gender, 1, 0)")
        .unwrap_err();
    assert!(err.to_string().contains("must be Boolean"));
}

#[test]
fn collection_functions_aggregate_per_subject() {
    let ctx = context_for("Patient");
    let count = ExpressionCompiler::new(&ctx).compile("name.count()").unwrap();
    assert_eq!(
        count.collect_pairs().unwrap(),
        vec![
            (s("p1"), Value::Integer(2)),
            (s("p2"), Value::Integer(1)),
            (s("p3"), Value::Integer(0)),
        ]
    );

    let exists = ExpressionCompiler::new(&ctx).compile("name.exists()").unwrap();
    assert_eq!(
        exists.collect_pairs().unwrap(),
        vec![
            (s("p1"), Value::Boolean(true)),
            (s("p2"), Value::Boolean(true)),
            (s("p3"), Value::Boolean(false)),
        ]
    );

    let empty = ExpressionCompiler::new(&ctx).compile("name.empty()").unwrap();
    assert_eq!(
        empty.collect_pairs().unwrap(),
        vec![
            (s("p1"), Value::Boolean(false)),
            (s("p2"), Value::Boolean(false)),
            (s("p3"), Value::Boolean(true)),
        ]
    );
}

#[test]
fn exists_with_criteria_behaves_like_where_exists() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("name.exists(use = 'maiden')")
        .unwrap();
    // Subjects whose rows were all filtered out drop from the path-level
    // result; the query composer re-attaches them with a left-outer join.
    assert_eq!(
        path.collect_pairs().unwrap(),
        vec![(s("p1"), Value::Boolean(true))]
    );
}

#[test]
fn first_respects_element_order() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("name.given.first()")
        .unwrap();
    assert!(path.is_singular());
    let pairs = path.collect_pairs().unwrap();
    assert!(pairs.contains(&(s("p1"), s("Alice"))));
    assert!(pairs.contains(&(s("p2"), s("Bob"))));
}

#[test]
fn sum_aggregates_numeric_values() {
    let ctx = context_for("Patient");
    let path = ExpressionCompiler::new(&ctx)
        .compile("multipleBirthInteger.sum()")
        .unwrap();
    let pairs = path.collect_pairs().unwrap();
    assert!(pairs.contains(&(s("p1"), Value::Integer(1))));
    assert!(pairs.contains(&(s("p2"), Value::Integer(2))));

    let err = ExpressionCompiler::new(&ctx).compile("gender.sum()").unwrap_err();
    assert!(err.to_string().contains("numeric"));
}

#[test]
fn not_negates_singular_booleans() {
    assert_eq!(
        compile_values("active.not()"),
        vec![Value::Boolean(false), Value::Boolean(true), Value::Boolean(false)]
    );
}
