//! The model registry lookup interface and its in-memory implementation.

use std::collections::HashMap;

use crate::definitions::{ElementDefinition, ResourceDefinition};

/// Lookup interface the compiler navigates structure through. Must be
/// available before any structural navigation step compiles; lookups that
/// fail surface as user input errors at the compilation layer.
pub trait ModelRegistry: Send + Sync {
    /// The structural definition of a resource type, if known.
    fn definition_for(&self, resource_type: &str) -> Option<&ResourceDefinition>;

    /// Resolves a `contentReference` path (for example
    /// `"Questionnaire.item"`) to the structure it names.
    fn structure_for(&self, content_reference: &str) -> Option<&ElementDefinition>;

    /// Whether a bare identifier names a known resource type.
    fn is_resource_type(&self, name: &str) -> bool {
        self.definition_for(name).is_some()
    }
}

/// A registry backed by hash maps, indexing every element path so that
/// `contentReference` targets resolve without walking.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    resources: HashMap<String, ResourceDefinition>,
    structures: HashMap<String, ElementDefinition>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        InMemoryRegistry::default()
    }

    /// Registers a resource definition, indexing each of its element paths
    /// (`Type.element`, `Type.element.child`, ...) as addressable
    /// structures.
    pub fn register(&mut self, definition: ResourceDefinition) {
        for element in &definition.elements {
            Self::index_structure(
                &mut self.structures,
                &definition.resource_type,
                element,
            );
        }
        self.resources
            .insert(definition.resource_type.clone(), definition);
    }

    /// Registers a standalone structure under an explicit path, used for
    /// recursive datatypes such as `Extension.extension`.
    pub fn register_structure(&mut self, path: &str, element: ElementDefinition) {
        self.structures.insert(path.to_string(), element);
    }

    fn index_structure(
        structures: &mut HashMap<String, ElementDefinition>,
        prefix: &str,
        element: &ElementDefinition,
    ) {
        let path = format!("{}.{}", prefix, element.name);
        for child in &element.children {
            Self::index_structure(structures, &path, child);
        }
        structures.insert(path, element.clone());
    }
}

impl ModelRegistry for InMemoryRegistry {
    fn definition_for(&self, resource_type: &str) -> Option<&ResourceDefinition> {
        self.resources.get(resource_type)
    }

    fn structure_for(&self, content_reference: &str) -> Option<&ElementDefinition> {
        self.structures.get(content_reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FhirType;

    #[test]
    fn element_paths_are_indexed_recursively() {
        let mut registry = InMemoryRegistry::new();
        registry.register(ResourceDefinition::new(
            "Questionnaire",
            vec![
                ElementDefinition::new("item", FhirType::BackboneElement)
                    .collection()
                    .with_children(vec![
                        ElementDefinition::new("linkId", FhirType::String),
                        ElementDefinition::new("item", FhirType::BackboneElement)
                            .collection()
                            .with_content_reference("Questionnaire.item"),
                    ]),
            ],
        ));

        let item = registry.structure_for("Questionnaire.item").unwrap();
        assert_eq!(item.children.len(), 2);
        // The nested slot resolves back to the same structure.
        let slot = item.child("item").unwrap();
        assert_eq!(slot.content_reference.as_deref(), Some("Questionnaire.item"));
        assert!(registry.structure_for("Questionnaire.item.linkId").is_some());
    }
}
