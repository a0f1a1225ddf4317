//! The built-in R4 subset registry.
//!
//! Hand-maintained definitions for the resource types and complex
//! datatypes the compiler's tests exercise. Choice elements (`value[x]`)
//! are registered under their type-specific names, matching how the
//! columnar encoding stores them.

use once_cell::sync::Lazy;

use crate::definitions::{ElementDefinition, ResourceDefinition};
use crate::registry::InMemoryRegistry;
use crate::types::FhirType;

fn human_name(name: &str) -> ElementDefinition {
    ElementDefinition::new(name, FhirType::HumanName).with_children(vec![
        ElementDefinition::new("use", FhirType::Code),
        ElementDefinition::new("family", FhirType::String),
        ElementDefinition::new("given", FhirType::String).collection(),
        ElementDefinition::new("prefix", FhirType::String).collection(),
        ElementDefinition::new("suffix", FhirType::String).collection(),
    ])
}

fn identifier(name: &str) -> ElementDefinition {
    ElementDefinition::new(name, FhirType::Identifier).with_children(vec![
        ElementDefinition::new("use", FhirType::Code),
        ElementDefinition::new("system", FhirType::Uri),
        ElementDefinition::new("value", FhirType::String),
    ])
}

fn coding(name: &str) -> ElementDefinition {
    ElementDefinition::new(name, FhirType::Coding).with_children(vec![
        ElementDefinition::new("system", FhirType::Uri),
        ElementDefinition::new("version", FhirType::String),
        ElementDefinition::new("code", FhirType::Code),
        ElementDefinition::new("display", FhirType::String),
        ElementDefinition::new("userSelected", FhirType::Boolean),
    ])
}

fn codeable_concept(name: &str) -> ElementDefinition {
    ElementDefinition::new(name, FhirType::CodeableConcept).with_children(vec![
        coding("coding").collection(),
        ElementDefinition::new("text", FhirType::String),
    ])
}

fn reference(name: &str, targets: &[&str]) -> ElementDefinition {
    ElementDefinition::new(name, FhirType::Reference)
        .with_targets(targets)
        .with_children(vec![
            ElementDefinition::new("reference", FhirType::String),
            ElementDefinition::new("type", FhirType::Uri),
            ElementDefinition::new("display", FhirType::String),
        ])
}

fn period(name: &str) -> ElementDefinition {
    ElementDefinition::new(name, FhirType::Period).with_children(vec![
        ElementDefinition::new("start", FhirType::DateTime),
        ElementDefinition::new("end", FhirType::DateTime),
    ])
}

/// Extension's `extension` child re-enters Extension itself, so the nested
/// slot is a content reference resolved through the registry.
fn extension(name: &str) -> ElementDefinition {
    ElementDefinition::new(name, FhirType::Extension).with_children(vec![
        ElementDefinition::new("url", FhirType::Uri),
        ElementDefinition::new("valueString", FhirType::String),
        ElementDefinition::new("valueInteger", FhirType::Integer),
        ElementDefinition::new("valueBoolean", FhirType::Boolean),
        coding("valueCoding"),
        ElementDefinition::new("extension", FhirType::Extension)
            .collection()
            .with_content_reference("Extension.extension"),
    ])
}

fn patient() -> ResourceDefinition {
    ResourceDefinition::new(
        "Patient",
        vec![
            ElementDefinition::new("id", FhirType::Id),
            ElementDefinition::new("active", FhirType::Boolean),
            ElementDefinition::new("gender", FhirType::Code),
            ElementDefinition::new("birthDate", FhirType::Date),
            human_name("name").collection(),
            identifier("identifier").collection(),
            codeable_concept("maritalStatus"),
            ElementDefinition::new("multipleBirthInteger", FhirType::Integer),
            reference("managingOrganization", &["Organization"]),
            reference("generalPractitioner", &["Practitioner", "Organization"]).collection(),
            extension("extension").collection(),
        ],
    )
}

fn practitioner() -> ResourceDefinition {
    ResourceDefinition::new(
        "Practitioner",
        vec![
            ElementDefinition::new("id", FhirType::Id),
            ElementDefinition::new("active", FhirType::Boolean),
            ElementDefinition::new("gender", FhirType::Code),
            human_name("name").collection(),
            identifier("identifier").collection(),
        ],
    )
}

fn organization() -> ResourceDefinition {
    ResourceDefinition::new(
        "Organization",
        vec![
            ElementDefinition::new("id", FhirType::Id),
            ElementDefinition::new("active", FhirType::Boolean),
            ElementDefinition::new("name", FhirType::String),
            identifier("identifier").collection(),
        ],
    )
}

fn group() -> ResourceDefinition {
    ResourceDefinition::new(
        "Group",
        vec![
            ElementDefinition::new("id", FhirType::Id),
            ElementDefinition::new("type", FhirType::Code),
            ElementDefinition::new("actual", FhirType::Boolean),
        ],
    )
}

fn encounter() -> ResourceDefinition {
    ResourceDefinition::new(
        "Encounter",
        vec![
            ElementDefinition::new("id", FhirType::Id),
            ElementDefinition::new("status", FhirType::Code),
            codeable_concept("reasonCode").collection(),
            reference("subject", &["Patient", "Group"]),
            reference("serviceProvider", &["Organization"]),
            period("period"),
        ],
    )
}

fn condition() -> ResourceDefinition {
    ResourceDefinition::new(
        "Condition",
        vec![
            ElementDefinition::new("id", FhirType::Id),
            codeable_concept("clinicalStatus"),
            codeable_concept("verificationStatus"),
            codeable_concept("severity"),
            codeable_concept("code"),
            reference("subject", &["Patient", "Group"]),
            ElementDefinition::new("recordedDate", FhirType::DateTime),
            ElementDefinition::new("evidence", FhirType::BackboneElement)
                .collection()
                .with_children(vec![
                    codeable_concept("code").collection(),
                    reference("detail", &["Resource"]).collection(),
                ]),
        ],
    )
}

fn observation() -> ResourceDefinition {
    ResourceDefinition::new(
        "Observation",
        vec![
            ElementDefinition::new("id", FhirType::Id),
            ElementDefinition::new("status", FhirType::Code),
            codeable_concept("code"),
            codeable_concept("category").collection(),
            reference("subject", &["Patient", "Group"]),
            reference("performer", &["Practitioner", "Organization", "Patient"]).collection(),
            ElementDefinition::new("valueInteger", FhirType::Integer),
            ElementDefinition::new("valueString", FhirType::String),
            codeable_concept("valueCodeableConcept"),
            ElementDefinition::new("issued", FhirType::Instant),
        ],
    )
}

fn questionnaire() -> ResourceDefinition {
    ResourceDefinition::new(
        "Questionnaire",
        vec![
            ElementDefinition::new("id", FhirType::Id),
            ElementDefinition::new("title", FhirType::String),
            ElementDefinition::new("status", FhirType::Code),
            ElementDefinition::new("item", FhirType::BackboneElement)
                .collection()
                .with_children(vec![
                    ElementDefinition::new("linkId", FhirType::String),
                    ElementDefinition::new("text", FhirType::String),
                    ElementDefinition::new("type", FhirType::Code),
                    ElementDefinition::new("item", FhirType::BackboneElement)
                        .collection()
                        .with_content_reference("Questionnaire.item"),
                ]),
        ],
    )
}

static BUILTIN: Lazy<InMemoryRegistry> = Lazy::new(|| {
    let mut registry = InMemoryRegistry::new();
    registry.register(patient());
    registry.register(practitioner());
    registry.register(organization());
    registry.register(group());
    registry.register(encounter());
    registry.register(condition());
    registry.register(observation());
    registry.register(questionnaire());
    // Recursive datatype structures addressed by content references.
    registry.register_structure("Extension.extension", extension("extension").collection());
    registry
});

/// The shared built-in registry.
pub fn builtin_registry() -> &'static InMemoryRegistry {
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelRegistry;

    #[test]
    fn builtin_covers_expected_types() {
        let registry = builtin_registry();
        for t in ["Patient", "Condition", "Questionnaire", "Group"] {
            assert!(registry.is_resource_type(t), "missing {}", t);
        }
        assert!(!registry.is_resource_type("Medication"));
    }

    #[test]
    fn polymorphic_reference_detection() {
        let registry = builtin_registry();
        let patient = registry.definition_for("Patient").unwrap();
        assert!(patient.element("generalPractitioner").unwrap().is_polymorphic_reference());
        assert!(!patient.element("managingOrganization").unwrap().is_polymorphic_reference());

        let condition = registry.definition_for("Condition").unwrap();
        let detail = condition.element("evidence").unwrap().child("detail").unwrap();
        assert!(detail.is_polymorphic_reference());
    }

    #[test]
    fn extension_recursion_resolves_through_registry() {
        let registry = builtin_registry();
        let ext = registry.structure_for("Extension.extension").unwrap();
        let slot = ext.child("extension").unwrap();
        assert_eq!(slot.content_reference.as_deref(), Some("Extension.extension"));
    }
}
