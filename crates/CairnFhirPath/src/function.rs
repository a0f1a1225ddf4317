//! # Named Function Dispatch
//!
//! A registry mapping language tokens to [`NamedFunction`] implementations.
//! Each implementation receives the compiled input path, the compiled
//! argument paths and the shared parser context, and returns a new path
//! value. Implementations independently validate input capability,
//! argument count and argument literal-ness; violations are user input
//! errors carrying the offending expression text, never internal failures.
//!
//! Every function call is a pure transform — there is no global state.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::context::ParserContext;
use crate::error::{FhirPathError, FhirPathResult, check_user_input};
use crate::path::PathValue;

static BUILTINS: Lazy<Arc<FunctionRegistry>> =
    Lazy::new(|| Arc::new(FunctionRegistry::with_builtins()));

/// The shared built-in registry. Contexts default to this instance, so
/// registry setup is paid once per process rather than per compilation.
pub(crate) fn builtin_functions() -> Arc<FunctionRegistry> {
    BUILTINS.clone()
}

/// The inputs to one function invocation.
pub struct NamedFunctionInput<'a> {
    pub context: &'a ParserContext,
    pub input: PathValue,
    pub arguments: Vec<PathValue>,
    /// The canonical text of the whole invocation, for diagnostics.
    pub expression: String,
}

/// A named function of the language.
pub trait NamedFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<PathValue>;
}

/// Registry of named functions, keyed by language token.
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Arc<dyn NamedFunction>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        FunctionRegistry { functions: HashMap::new() }
    }

    /// The registry pre-populated with every built-in function.
    pub fn with_builtins() -> Self {
        use crate::collection_functions::{
            CountFunction, EmptyFunction, ExistsFunction, FirstFunction, NotFunction, SumFunction,
        };
        use crate::conditional_function::IifFunction;
        use crate::extension_function::ExtensionFunction;
        use crate::filtering_functions::{OfTypeFunction, WhereFunction};
        use crate::resolve_function::{ResolveFunction, ReverseResolveFunction};
        use crate::terminology_functions::{MemberOfFunction, TranslateFunction};

        let mut registry = FunctionRegistry::new();
        registry.register(Arc::new(CountFunction));
        registry.register(Arc::new(SumFunction));
        registry.register(Arc::new(FirstFunction));
        registry.register(Arc::new(EmptyFunction));
        registry.register(Arc::new(ExistsFunction));
        registry.register(Arc::new(NotFunction));
        registry.register(Arc::new(WhereFunction));
        registry.register(Arc::new(OfTypeFunction));
        registry.register(Arc::new(ResolveFunction));
        registry.register(Arc::new(ReverseResolveFunction));
        registry.register(Arc::new(IifFunction));
        registry.register(Arc::new(ExtensionFunction));
        registry.register(Arc::new(MemberOfFunction));
        registry.register(Arc::new(TranslateFunction));
        registry
    }

    pub fn register(&mut self, function: Arc<dyn NamedFunction>) {
        self.functions.insert(function.name(), function);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn NamedFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        FunctionRegistry::with_builtins()
    }
}

// Shared argument validation helpers.

pub(crate) fn check_arity(
    input: &NamedFunctionInput<'_>,
    name: &str,
    min: usize,
    max: usize,
) -> FhirPathResult<()> {
    let count = input.arguments.len();
    check_user_input(count >= min && count <= max, || {
        if min == max {
            format!(
                "Function {} requires {} argument(s): {}",
                name, min, input.expression
            )
        } else {
            format!(
                "Function {} accepts between {} and {} arguments: {}",
                name, min, max, input.expression
            )
        }
    })
}

/// A required string-literal argument.
pub(crate) fn string_literal_argument(
    input: &NamedFunctionInput<'_>,
    index: usize,
    name: &str,
) -> FhirPathResult<String> {
    match input.arguments.get(index).and_then(|a| a.literal_value()) {
        Some(cairn_columnar::Value::String(s)) => Ok(s.clone()),
        _ => Err(FhirPathError::InvalidInput(format!(
            "Function {} expects a String literal as argument {}: {}",
            name,
            index + 1,
            input.expression
        ))),
    }
}

/// An optional boolean-literal argument with a default.
pub(crate) fn boolean_literal_argument(
    input: &NamedFunctionInput<'_>,
    index: usize,
    name: &str,
    default: bool,
) -> FhirPathResult<bool> {
    match input.arguments.get(index) {
        None => Ok(default),
        Some(argument) => match argument.literal_value() {
            Some(cairn_columnar::Value::Boolean(b)) => Ok(*b),
            _ => Err(FhirPathError::InvalidInput(format!(
                "Function {} expects a Boolean literal as argument {}: {}",
                name,
                index + 1,
                input.expression
            ))),
        },
    }
}

/// An optional string-literal argument with a default.
pub(crate) fn optional_string_literal_argument(
    input: &NamedFunctionInput<'_>,
    index: usize,
    name: &str,
    default: &str,
) -> FhirPathResult<String> {
    match input.arguments.get(index) {
        None => Ok(default.to_string()),
        Some(argument) => match argument.literal_value() {
            Some(cairn_columnar::Value::String(s)) => Ok(s.clone()),
            _ => Err(FhirPathError::InvalidInput(format!(
                "Function {} expects a String literal as argument {}: {}",
                name,
                index + 1,
                input.expression
            ))),
        },
    }
}
