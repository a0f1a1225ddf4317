//! Error types for expression compilation.
//!
//! Two taxonomies exist. User input errors are represented here: they carry
//! the offending expression text, are never retried, and reject the whole
//! query. Internal invariant violations (a singular path carrying an
//! element identity column, recursion guard misuse) are compiler bugs and
//! panic instead; they are deliberately not part of this enum.

use thiserror::Error;

/// Result type alias for compilation operations.
pub type FhirPathResult<T> = Result<T, FhirPathError>;

/// User input errors raised during expression compilation.
#[derive(Debug, Error)]
pub enum FhirPathError {
    /// The expression text failed to parse.
    #[error("Error parsing expression \"{expression}\": {message}")]
    ParseError { expression: String, message: String },

    /// A semantically invalid expression: wrong arity, wrong argument type
    /// or capability, non-singular operand, category mismatch and the
    /// like. The message names the offending expression.
    #[error("{0}")]
    InvalidInput(String),

    /// Navigation to an element the structure definition does not declare.
    #[error("No element named \"{name}\" in {expression}")]
    UndefinedElement { name: String, expression: String },

    /// A plan-level failure surfaced while deriving schemas for the
    /// compiled output. These indicate the substrate rejected a merge,
    /// which the compiler treats as a user-facing rejection of the query.
    #[error("dataset error: {0}")]
    Dataset(#[from] cairn_columnar::DatasetError),
}

/// Rejects the query with an [`FhirPathError::InvalidInput`] when the
/// condition does not hold. Mirrors the original's check-user-input
/// helper: validation failures are user errors, never panics.
pub(crate) fn check_user_input(
    condition: bool,
    message: impl FnOnce() -> String,
) -> FhirPathResult<()> {
    if condition {
        Ok(())
    } else {
        Err(FhirPathError::InvalidInput(message()))
    }
}
