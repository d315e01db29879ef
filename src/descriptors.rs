//! Component descriptors and the reconciled registry shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::controls::{ControlParseError, ParsedPropertyControls};
use crate::element::JsxElement;
use crate::project::Imports;

/// A pre-built insertable instantiation of a component, plus the imports the
/// insertion must add to the target file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentVariant {
    pub insert_menu_label: String,
    pub element_to_insert: JsxElement,
    #[serde(default)]
    pub imports_to_add: Imports,
}

/// What one component declares about itself. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub properties: Result<ParsedPropertyControls, ControlParseError>,
    #[serde(default)]
    pub variants: Vec<ComponentVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptorWithName {
    pub component_name: String,
    #[serde(flatten)]
    pub descriptor: ComponentDescriptor,
}

impl ComponentDescriptorWithName {
    pub fn new(component_name: &str, descriptor: ComponentDescriptor) -> Self {
        Self {
            component_name: component_name.to_string(),
            descriptor,
        }
    }
}

/// The authoritative reconciled registry: module path → component name →
/// descriptor. Entries are keyed uniquely; last reconciliation wins.
pub type PropertyControlsInfo = BTreeMap<String, BTreeMap<String, ComponentDescriptor>>;

/// Flattened view of every insertable variant, for insert-menu population.
pub fn insertable_variants(
    info: &PropertyControlsInfo,
) -> Vec<(&str, &str, &ComponentVariant)> {
    let mut result = Vec::new();
    for (module_path, components) in info {
        for (component_name, descriptor) in components {
            for variant in &descriptor.variants {
                result.push((module_path.as_str(), component_name.as_str(), variant));
            }
        }
    }
    result
}
