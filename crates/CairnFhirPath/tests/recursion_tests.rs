mod common;

use cairn_columnar::Value;
use cairn_fhirpath::{CompilerConfig, ExpressionCompiler};
use common::{context_for, context_with_config, s};

fn non_null(values: Vec<Value>) -> Vec<Value> {
    values.into_iter().filter(|v| !v.is_null()).collect()
}

#[test]
fn recursive_structures_navigate_to_the_configured_depth() {
    let ctx = context_for("Questionnaire");
    let compiler = ExpressionCompiler::new(&ctx);

    let level1 = compiler.compile("item.linkId").unwrap();
    assert_eq!(non_null(level1.collect_values().unwrap()), vec![s("1")]);

    let level2 = compiler.compile("item.item.linkId").unwrap();
    assert_eq!(non_null(level2.collect_values().unwrap()), vec![s("1.1")]);

    // Three recursive re-entries stay under the default limit of three.
    let level4 = compiler.compile("item.item.item.item.linkId").unwrap();
    assert_eq!(non_null(level4.collect_values().unwrap()), vec![s("1.1.1.1")]);
}

#[test]
fn navigation_past_the_limit_is_absent_not_an_error() {
    let ctx = context_with_config(
        "Questionnaire",
        CompilerConfig { max_nesting_level: 2 },
    );
    let compiler = ExpressionCompiler::new(&ctx);

    // Two re-entries are fine...
    let within = compiler.compile("item.item.item.linkId").unwrap();
    assert_eq!(non_null(within.collect_values().unwrap()), vec![s("1.1.1")]);

    // ...the third is pruned: the expression still compiles, the value is
    // simply absent.
    let beyond = compiler.compile("item.item.item.item.linkId").unwrap();
    assert!(non_null(beyond.collect_values().unwrap()).is_empty());
}

#[test]
fn pruned_slots_stay_navigable() {
    let ctx = context_with_config(
        "Questionnaire",
        CompilerConfig { max_nesting_level: 1 },
    );
    let compiler = ExpressionCompiler::new(&ctx);
    // Deeper recursive children of a pruned slot are equally absent.
    let path = compiler.compile("item.item.item.text").unwrap();
    assert!(non_null(path.collect_values().unwrap()).is_empty());
}

#[test]
fn recursion_inside_function_arguments_observes_the_open_scope() {
    let ctx = context_for("Questionnaire");
    let compiler = ExpressionCompiler::new(&ctx);
    let path = compiler
        .compile("item.item.where($this.item.exists()).linkId")
        .unwrap();
    // Only the level-two item with a level-three child survives.
    assert_eq!(non_null(path.collect_values().unwrap()), vec![s("1.1")]);
}

#[test]
fn extension_recursion_is_bounded_too() {
    let ctx = context_for("Patient");
    let compiler = ExpressionCompiler::new(&ctx);
    // Extension.extension re-enters Extension through a content
    // reference; the chain compiles and terminates.
    let path = compiler.compile("extension.extension.url").unwrap();
    assert!(non_null(path.collect_values().unwrap()).is_empty());
}
