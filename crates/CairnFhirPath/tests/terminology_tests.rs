mod common;

use std::sync::Arc;

use cairn_columnar::Value;
use cairn_fhirpath::{ExpressionCompiler, FhirPathError, ParserContext};
use common::{FailingGateway, MockGateway, context_for, s};

fn gateway_context(subject: &str) -> ParserContext {
    context_for(subject).with_gateway(Arc::new(MockGateway::new()))
}

#[test]
fn translate_expands_to_translated_codings_only() {
    let ctx = gateway_context("Condition");
    let path = ExpressionCompiler::new(&ctx)
        .compile("code.coding.translate('http://example.org/cm').code")
        .unwrap();
    assert!(!path.is_singular());

    // Two input codings for c1: one translates, one does not. Exactly one
    // translated value appears; the untranslated coding contributes none.
    let triples = path.collect_triples().unwrap();
    let translated: Vec<_> = triples.iter().filter(|(_, _, v)| !v.is_null()).collect();
    assert_eq!(translated.len(), 1);
    assert_eq!(translated[0].0, s("c1"));
    assert_eq!(translated[0].2, s("acute-viral"));
    // Freshly assigned element identity extends the source coding's.
    assert_eq!(
        translated[0].1,
        Value::Array(vec![Value::Integer(0), Value::Integer(0)])
    );
}

#[test]
fn translate_on_codeable_concepts_uses_the_coding_child() {
    let ctx = gateway_context("Condition");
    let path = ExpressionCompiler::new(&ctx)
        .compile("code.translate('http://example.org/cm').code")
        .unwrap();
    let values = path.collect_values().unwrap();
    let non_null: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    assert_eq!(non_null, vec![&s("acute-viral")]);
}

#[test]
fn member_of_tests_value_set_membership_per_value() {
    let ctx = gateway_context("Condition");
    let path = ExpressionCompiler::new(&ctx)
        .compile("code.memberOf('http://example.org/vs/respiratory')")
        .unwrap();
    assert!(path.is_singular());
    assert_eq!(
        path.collect_pairs().unwrap(),
        vec![
            (s("c1"), Value::Boolean(true)),
            (s("c2"), Value::Boolean(false)),
            (s("c3"), Value::Boolean(false)),
        ]
    );
}

#[test]
fn terminology_functions_require_a_configured_gateway() {
    let ctx = context_for("Condition");
    let err = ExpressionCompiler::new(&ctx)
        .compile("code.translate('http://example.org/cm')")
        .unwrap_err();
    assert!(err.to_string().contains("terminology service has not been configured"));
}

#[test]
fn terminology_functions_validate_their_arguments() {
    let ctx = gateway_context("Condition");
    let compiler = ExpressionCompiler::new(&ctx);
    for (expression, fragment) in [
        ("code.translate(1)", "String literal"),
        ("code.translate('u', 'x')", "Boolean literal"),
        ("recordedDate.translate('u')", "unsupported type"),
        ("code.memberOf()", "requires 1 argument"),
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
fn gateway_failures_surface_at_execution_not_compilation() {
    let ctx = context_for("Condition").with_gateway(Arc::new(FailingGateway));
    // Compilation only shapes the request; the fault arrives when the
    // plan runs.
    let path = ExpressionCompiler::new(&ctx)
        .compile("code.memberOf('http://example.org/vs/respiratory')")
        .unwrap();
    let err = path.collect_values().unwrap_err();
    match err {
        FhirPathError::Dataset(inner) => {
            assert!(inner.to_string().contains("connection refused"))
        }
        other => panic!("expected a dataset error, got {:?}", other),
    }
}
