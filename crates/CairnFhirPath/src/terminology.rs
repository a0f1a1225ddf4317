//! # Terminology Gateway Protocol
//!
//! The interface the compiler's terminology functions speak. Calls are
//! not made during compilation: the compiler captures a gateway handle
//! into a dataset-level map operation, so translation and membership
//! checks execute once per row when the compiled plan runs. A transport
//! failure at that point is fatal for the evaluation; the core never
//! retries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cairn_columnar::Value;

/// A code-system concept reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: &str, code: &str) -> Coding {
        Coding {
            system: Some(system.to_string()),
            code: Some(code.to_string()),
            ..Coding::default()
        }
    }

    /// Encodes this coding as a struct cell.
    pub fn to_value(&self) -> Value {
        let mut fields = std::collections::BTreeMap::new();
        let mut put = |name: &str, value: &Option<String>| {
            if let Some(value) = value {
                fields.insert(name.to_string(), Value::String(value.clone()));
            }
        };
        put("system", &self.system);
        put("version", &self.version);
        put("code", &self.code);
        put("display", &self.display);
        Value::Struct(fields)
    }

    /// Decodes a coding from a struct cell, if it is one.
    pub fn from_value(value: &Value) -> Option<Coding> {
        let fields = value.as_struct()?;
        let get = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Some(Coding {
            system: get("system"),
            version: get("version"),
            code: get("code"),
            display: get("display"),
        })
    }

    /// Decodes an array cell of codings; a null cell is an empty list.
    pub fn vec_from_value(value: &Value) -> Vec<Coding> {
        match value.as_array() {
            Some(items) => items.iter().filter_map(Coding::from_value).collect(),
            None => Vec::new(),
        }
    }
}

/// Failures from the gateway's transport or protocol layer.
#[derive(Debug, Error)]
pub enum TerminologyError {
    #[error("terminology transport error: {0}")]
    Transport(String),

    #[error("unexpected terminology response: {0}")]
    Protocol(String),
}

/// External service answering code-system translation and membership
/// questions. Implementations must be individually thread-safe; the
/// compiler shares one handle across the map operations it emits.
pub trait TerminologyGateway: Send + Sync {
    /// Translates codings through a concept map, returning the translated
    /// codings that satisfy the requested equivalence.
    fn translate(
        &self,
        codings: &[Coding],
        concept_map_url: &str,
        reverse: bool,
        equivalence: &str,
    ) -> Result<Vec<Coding>, TerminologyError>;

    /// Whether any of the codings is a member of the value set.
    fn validate(&self, value_set_url: &str, codings: &[Coding]) -> Result<bool, TerminologyError>;
}
