//! HTTP client for a FHIR terminology server.
//!
//! Speaks the standard `ConceptMap/$translate` and
//! `ValueSet/$validate-code` operations, exchanging `Parameters`
//! resources as JSON. The client is deliberately lightweight: a pooled
//! blocking reqwest client and a normalized base URL. It implements
//! [`TerminologyGateway`], so it plugs straight into the compiler's
//! dataset-level terminology operations; because those run at plan
//! execution time, a synchronous client is the right shape here.

use reqwest::blocking::Client;
use serde_json::{Value as Json, json};
use tracing::debug;

use crate::terminology::{Coding, TerminologyError, TerminologyGateway};

/// A gateway backed by a FHIR terminology server.
///
/// Example base URLs: `http://localhost:8080/fhir`, `https://tx.fhir.org/r4`.
#[derive(Debug, Clone)]
pub struct HttpTerminologyGateway {
    client: Client,
    base_url: String,
}

impl HttpTerminologyGateway {
    /// Creates a gateway; the base URL is normalized by trimming any
    /// trailing slash.
    pub fn new(base_url: &str) -> HttpTerminologyGateway {
        HttpTerminologyGateway {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn post_parameters(&self, path: &str, parameters: Json) -> Result<Json, TerminologyError> {
        debug!(path, "terminology request");
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .header("Content-Type", "application/fhir+json")
            .json(&parameters)
            .send()
            .map_err(|e| TerminologyError::Transport(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| TerminologyError::Transport(e.to_string()))?;
        response
            .json::<Json>()
            .map_err(|e| TerminologyError::Transport(e.to_string()))
    }

    /// Extracts the boolean `result` parameter from a `Parameters`
    /// response.
    fn result_parameter(response: &Json) -> Option<bool> {
        let parameters = response.get("parameter")?.as_array()?;
        parameters
            .iter()
            .find(|p| p.get("name").and_then(Json::as_str) == Some("result"))
            .and_then(|p| p.get("valueBoolean"))
            .and_then(Json::as_bool)
    }

    /// Collects the translated concepts out of a `$translate` response,
    /// keeping matches with the requested equivalence.
    fn match_parameters(response: &Json, equivalence: &str) -> Vec<Coding> {
        let mut matches = Vec::new();
        let Some(parameters) = response.get("parameter").and_then(Json::as_array) else {
            return matches;
        };
        for parameter in parameters {
            if parameter.get("name").and_then(Json::as_str) != Some("match") {
                continue;
            }
            let Some(parts) = parameter.get("part").and_then(Json::as_array) else {
                continue;
            };
            let matched_equivalence = parts
                .iter()
                .find(|p| p.get("name").and_then(Json::as_str) == Some("equivalence"))
                .and_then(|p| p.get("valueCode"))
                .and_then(Json::as_str);
            if matched_equivalence != Some(equivalence) {
                continue;
            }
            let concept = parts
                .iter()
                .find(|p| p.get("name").and_then(Json::as_str) == Some("concept"))
                .and_then(|p| p.get("valueCoding"));
            if let Some(concept) = concept {
                if let Ok(coding) = serde_json::from_value::<Coding>(concept.clone()) {
                    matches.push(coding);
                }
            }
        }
        matches
    }
}

impl TerminologyGateway for HttpTerminologyGateway {
    fn translate(
        &self,
        codings: &[Coding],
        concept_map_url: &str,
        reverse: bool,
        equivalence: &str,
    ) -> Result<Vec<Coding>, TerminologyError> {
        let mut translated = Vec::new();
        for coding in codings {
            let parameters = json!({
                "resourceType": "Parameters",
                "parameter": [
                    { "name": "url", "valueUri": concept_map_url },
                    { "name": "reverse", "valueBoolean": reverse },
                    { "name": "coding", "valueCoding": coding },
                ]
            });
            let response = self.post_parameters("ConceptMap/$translate", parameters)?;
            if Self::result_parameter(&response) == Some(true) {
                translated.extend(Self::match_parameters(&response, equivalence));
            }
        }
        Ok(translated)
    }

    fn validate(&self, value_set_url: &str, codings: &[Coding]) -> Result<bool, TerminologyError> {
        for coding in codings {
            let parameters = json!({
                "resourceType": "Parameters",
                "parameter": [
                    { "name": "url", "valueUri": value_set_url },
                    { "name": "coding", "valueCoding": coding },
                ]
            });
            let response = self.post_parameters("ValueSet/$validate-code", parameters)?;
            if Self::result_parameter(&response) == Some(true) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_is_normalized() {
        let gateway = HttpTerminologyGateway::new("https://tx.example.org/fhir/");
        assert_eq!(gateway.base_url, "https://tx.example.org/fhir");
    }

    #[test]
    fn translate_response_parsing_filters_equivalence() {
        let response = json!({
            "resourceType": "Parameters",
            "parameter": [
                { "name": "result", "valueBoolean": true },
                { "name": "match", "part": [
                    { "name": "equivalence", "valueCode": "equivalent" },
                    { "name": "concept", "valueCoding": { "system": "http://snomed.info/sct", "code": "444814009" } }
                ]},
                { "name": "match", "part": [
                    { "name": "equivalence", "valueCode": "wider" },
                    { "name": "concept", "valueCoding": { "system": "http://snomed.info/sct", "code": "195662009" } }
                ]}
            ]
        });
        assert_eq!(HttpTerminologyGateway::result_parameter(&response), Some(true));
        let matches = HttpTerminologyGateway::match_parameters(&response, "equivalent");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].code.as_deref(), Some("444814009"));
    }
}
