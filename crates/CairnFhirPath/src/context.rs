//! The per-compilation parser context.
//!
//! A [`ParserContext`] carries everything a compilation step needs: the
//! subject resource context, the current `$this` binding when compiling
//! function arguments, active grouping columns, the model registry, the
//! resource dataset source, the optional terminology gateway, the function
//! registry, configuration, the alias generator, and the recursion guard.
//! Derived contexts (for argument compilation) share the alias generator
//! and the nesting context, so column names stay unique and nesting levels
//! stay coherent across the whole compilation.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use cairn_columnar::{Column, Dataset};
use cairn_fhir_model::ModelRegistry;
use serde::{Deserialize, Serialize};

use crate::error::FhirPathResult;
use crate::function::FunctionRegistry;
use crate::nesting::NestingContext;
use crate::path::{PathValue, ResourcePath};
use crate::terminology::TerminologyGateway;

/// Compiler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Maximum number of times a self-referential structure may be entered
    /// while compiling one expression; navigation beyond this depth yields
    /// absent values.
    pub max_nesting_level: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig { max_nesting_level: 3 }
    }
}

/// Produces unique synthetic column names for one compilation. A monotonic
/// counter, not randomness: uniqueness within the compiled dataset is the
/// invariant, unpredictability is not.
#[derive(Debug, Default)]
pub struct AliasGenerator {
    counter: Cell<u64>,
}

impl AliasGenerator {
    pub fn new() -> Self {
        AliasGenerator::default()
    }

    pub fn next(&self) -> u64 {
        let n = self.counter.get();
        self.counter.set(n + 1);
        n
    }
}

/// Supplies the encoded dataset for a resource type: an `id` column plus
/// one column per top-level element. The warehouse side of this interface
/// is an external collaborator; tests register in-memory tables.
pub trait ResourceSource: Send + Sync {
    fn dataset_for(&self, resource_type: &str) -> Option<Dataset>;
}

/// The state threaded through every compilation step.
#[derive(Clone)]
pub struct ParserContext {
    input: ResourcePath,
    this: Option<Box<PathValue>>,
    groupings: Vec<Column>,
    source: Arc<dyn ResourceSource>,
    registry: Arc<dyn ModelRegistry>,
    gateway: Option<Arc<dyn TerminologyGateway>>,
    functions: Arc<FunctionRegistry>,
    config: CompilerConfig,
    aliases: Rc<AliasGenerator>,
    nesting: Rc<NestingContext>,
}

impl ParserContext {
    /// Creates a context rooted at the given subject resource type. Fails
    /// with a user input error when the type is unknown to the registry or
    /// the source has no dataset for it.
    pub fn new(
        subject_resource_type: &str,
        source: Arc<dyn ResourceSource>,
        registry: Arc<dyn ModelRegistry>,
    ) -> FhirPathResult<ParserContext> {
        let aliases = Rc::new(AliasGenerator::new());
        let input = ResourcePath::build(
            &aliases,
            registry.as_ref(),
            source.as_ref(),
            subject_resource_type,
            subject_resource_type,
        )?;
        Ok(ParserContext {
            input,
            this: None,
            groupings: Vec::new(),
            source,
            registry,
            gateway: None,
            functions: crate::function::builtin_functions(),
            config: CompilerConfig::default(),
            aliases,
            nesting: Rc::new(NestingContext::new()),
        })
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn TerminologyGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_functions(mut self, functions: Arc<FunctionRegistry>) -> Self {
        self.functions = functions;
        self
    }

    /// Sets the active grouping columns for aggregation-aware compilation
    /// passes.
    pub fn with_groupings(mut self, groupings: Vec<Column>) -> Self {
        self.groupings = groupings;
        self
    }

    /// Derives a context whose chains root at the given item context
    /// (`$this`), used when compiling function arguments.
    pub(crate) fn with_this(&self, this: PathValue) -> ParserContext {
        let mut derived = self.clone();
        derived.this = Some(Box::new(this));
        derived
    }

    pub fn input(&self) -> &ResourcePath {
        &self.input
    }

    pub fn subject_type(&self) -> &str {
        self.input.resource_type()
    }

    pub(crate) fn this(&self) -> Option<&PathValue> {
        self.this.as_deref()
    }

    pub fn groupings(&self) -> &[Column] {
        &self.groupings
    }

    pub fn source(&self) -> &dyn ResourceSource {
        self.source.as_ref()
    }

    pub fn registry(&self) -> &dyn ModelRegistry {
        self.registry.as_ref()
    }

    pub fn gateway(&self) -> Option<&Arc<dyn TerminologyGateway>> {
        self.gateway.as_ref()
    }

    pub(crate) fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub(crate) fn aliases(&self) -> &AliasGenerator {
        &self.aliases
    }

    pub(crate) fn nesting(&self) -> &NestingContext {
        &self.nesting
    }
}
