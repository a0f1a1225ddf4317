//! # Cairn FHIRPath Compiler
//!
//! Compiles FHIRPath expressions over a declared subject resource type
//! into operations against the Cairn columnar dataset substrate. The
//! compiled output — a path value with well-defined cardinality, ordering
//! and typing, plus the accumulated join set — is consumed by
//! aggregation, extraction and search executors.
//!
//! The core pieces, leaves first:
//!
//! - [`path`]: the immutable, typed path value model.
//! - [`join`]: the join & dataset composition engine.
//! - [`nesting`]: the recursion guard bounding self-referential structure
//!   expansion.
//! - [`function`] and the built-in function modules: the named-function
//!   dispatch registry.
//! - [`parser`] and [`compiler`]: the grammar and the grammar-driven
//!   incremental compiler with its [`ParserContext`].
//! - [`terminology`]: the terminology gateway protocol, with an HTTP
//!   client in [`terminology_client`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cairn_fhirpath::{ExpressionCompiler, ParserContext, ResourceSource};
//! use cairn_columnar::Dataset;
//! use cairn_fhir_model::builtin_registry;
//!
//! struct Warehouse;
//! impl ResourceSource for Warehouse {
//!     fn dataset_for(&self, _resource_type: &str) -> Option<Dataset> {
//!         // Resolve the encoded table for the resource type.
//!         None
//!     }
//! }
//!
//! # fn main() -> Result<(), cairn_fhirpath::FhirPathError> {
//! let registry = Arc::new(builtin_registry().clone());
//! let ctx = ParserContext::new("Patient", Arc::new(Warehouse), registry)?;
//! let compiled = ExpressionCompiler::new(&ctx).compile("name.family.first()")?;
//! let rows = compiled.dataset().collect()?;
//! # Ok(())
//! # }
//! ```
//!
//! The compiler is synchronous and single-threaded per request; datasets
//! are lazy plans, so nothing is materialized until the caller collects.
//! Compiled path values are immutable and safe to cache.

mod collection_functions;
mod compiler;
mod conditional_function;
mod context;
mod error;
mod extension_function;
mod filtering_functions;
mod function;
mod join;
mod literal;
mod nesting;
mod operator;
pub mod parser;
mod path;
mod resolve_function;
mod terminology;
mod terminology_client;
mod terminology_functions;
mod traversal;

pub use compiler::{
    CompiledQuery, ExpressionCompiler, compile_aggregation, compile_extraction, compile_filter,
    compile_grouping, compile_query,
};
pub use context::{AliasGenerator, CompilerConfig, ParserContext, ResourceSource};
pub use error::{FhirPathError, FhirPathResult};
pub use function::{FunctionRegistry, NamedFunction, NamedFunctionInput};
pub use join::{Join, JoinExpression, JoinKind, JoinSet};
pub use nesting::{CompilationScope, NestingContext};
pub use operator::BinaryOperator;
pub use path::{ElementPath, LiteralPath, PathValue, ResourcePath, UntypedResourcePath};
pub use terminology::{Coding, TerminologyError, TerminologyGateway};
pub use terminology_client::HttpTerminologyGateway;
