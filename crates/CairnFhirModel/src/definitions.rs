//! Resource and element structure definitions.

use serde::{Deserialize, Serialize};

use crate::types::FhirType;

/// Structural definition of one element within a resource or complex type.
///
/// `content_reference`, when present, marks a self-referential slot: the
/// element's children are not stored inline but found by resolving the
/// reference (for example `Questionnaire.item` within itself). The
/// compiler's recursion guard bounds how deep such slots are expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    pub name: String,
    pub fhir_type: FhirType,
    /// True when the element's maximum cardinality exceeds one.
    pub collection: bool,
    /// Permissible target resource types, for `Reference` elements. The
    /// special entry `"Resource"` means any resource type.
    pub reference_targets: Vec<String>,
    /// Path of the structure this element re-enters, for recursive slots.
    pub content_reference: Option<String>,
    /// Child elements, for complex and backbone types.
    pub children: Vec<ElementDefinition>,
}

impl ElementDefinition {
    pub fn new(name: &str, fhir_type: FhirType) -> Self {
        ElementDefinition {
            name: name.to_string(),
            fhir_type,
            collection: false,
            reference_targets: Vec::new(),
            content_reference: None,
            children: Vec::new(),
        }
    }

    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.reference_targets = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_content_reference(mut self, path: &str) -> Self {
        self.content_reference = Some(path.to_string());
        self
    }

    pub fn with_children(mut self, children: Vec<ElementDefinition>) -> Self {
        self.children = children;
        self
    }

    /// Looks up an inline child by name. Recursive slots resolve through
    /// the registry, not here.
    pub fn child(&self, name: &str) -> Option<&ElementDefinition> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Whether this element is a reference with more than one possible
    /// target, or a reference to any resource.
    pub fn is_polymorphic_reference(&self) -> bool {
        self.fhir_type == FhirType::Reference
            && (self.reference_targets.len() > 1
                || self.reference_targets.iter().any(|t| t == "Resource"))
    }
}

/// Structural definition of a resource type: its name and element tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub resource_type: String,
    pub elements: Vec<ElementDefinition>,
}

impl ResourceDefinition {
    pub fn new(resource_type: &str, elements: Vec<ElementDefinition>) -> Self {
        ResourceDefinition {
            resource_type: resource_type.to_string(),
            elements,
        }
    }

    pub fn element(&self, name: &str) -> Option<&ElementDefinition> {
        self.elements.iter().find(|e| e.name == name)
    }
}
