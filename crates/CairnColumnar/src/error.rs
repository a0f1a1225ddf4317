//! Error types for dataset plan construction and execution.

use thiserror::Error;

/// Errors raised while deriving a plan's schema or executing it.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A column expression referenced a name the schema does not contain.
    #[error("unknown column '{name}' in {context}")]
    UnknownColumn { name: String, context: String },

    /// Two inputs to a merge carried the same column name. The compiler
    /// guarantees unique synthetic names; hitting this means a plan was
    /// built outside that discipline.
    #[error("duplicate column '{name}' in {context}")]
    DuplicateColumn { name: String, context: String },

    /// Union inputs with differing schemas, or a source row whose width
    /// does not match its declared columns.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// An operation was applied to a cell of an unsupported type.
    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A row-level map function (for example a terminology gateway call)
    /// failed. Fatal for the evaluation; the substrate does not retry.
    #[error("map function '{label}' failed: {message}")]
    MapFailed { label: String, message: String },
}
