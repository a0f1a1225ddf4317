//! # Cairn FHIR Model Registry
//!
//! Structural metadata about FHIR resources: which elements a resource has,
//! their cardinality, their declared types, the permissible target types of
//! reference elements, and the `contentReference` slots that make
//! structures like `Questionnaire.item` self-referential.
//!
//! The compiler consumes this through the [`ModelRegistry`] trait; the
//! [`builtin_registry`] function supplies a hand-maintained in-memory
//! registry covering a useful R4 subset. Deployments with a full model
//! store can provide their own implementation.

mod builtin;
mod definitions;
mod registry;
mod types;

pub use builtin::builtin_registry;
pub use definitions::{ElementDefinition, ResourceDefinition};
pub use registry::{InMemoryRegistry, ModelRegistry};
pub use types::FhirType;
