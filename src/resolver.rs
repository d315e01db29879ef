//! Property controls resolution.
//!
//! Given a rendered element's name and the importing file's import table,
//! find which control descriptions apply. Fallback order for elements with no
//! registry entry: intrinsic HTML elements get the shared style-object
//! controls, locally defined components fall back to the open file's module
//! path, third-party packages fall back to the built-in descriptor table.

use lazy_static::lazy_static;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::controls::{default_props, ControlDescription, ParsedPropertyControls};
use crate::descriptors::{ComponentDescriptorWithName, PropertyControlsInfo};
use crate::element::{is_intrinsic_html_element, ElementName};
use crate::project::{strip_source_extension, Imports};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmDependency {
    pub name: String,
    pub version: String,
}

lazy_static! {
    /// Intrinsic elements (div, span, ...) all support the style prop; this
    /// one-size-fits-all description stands in for per-tag control sets.
    static ref HTML_ELEMENT_STYLE_PROPS: ParsedPropertyControls = {
        let mut controls = ParsedPropertyControls::new();
        controls.insert(
            "style".to_string(),
            Ok(ControlDescription::StyleObject { label: None }),
        );
        controls
    };
}

/// Descriptors a known third-party package publishes about its components.
/// Version matching is deliberately loose; packages we know nothing about
/// contribute nothing.
pub fn third_party_components(
    package_name: &str,
    _package_version: &str,
) -> Option<Vec<ComponentDescriptorWithName>> {
    match package_name {
        "antd" => Some(antd_components()),
        _ => None,
    }
}

fn antd_components() -> Vec<ComponentDescriptorWithName> {
    use crate::descriptors::ComponentDescriptor;

    let mut button_controls = ParsedPropertyControls::new();
    button_controls.insert(
        "type".to_string(),
        Ok(ControlDescription::PopupList {
            label: Some("Type".to_string()),
            options: vec![
                serde_json::json!("default"),
                serde_json::json!("primary"),
                serde_json::json!("ghost"),
                serde_json::json!("dashed"),
                serde_json::json!("link"),
                serde_json::json!("text"),
            ],
            default_value: Some(serde_json::json!("default")),
        }),
    );
    button_controls.insert(
        "disabled".to_string(),
        Ok(ControlDescription::Boolean {
            label: Some("Disabled".to_string()),
            default_value: Some(serde_json::json!(false)),
            disabled_title: None,
            enabled_title: None,
        }),
    );
    button_controls.insert(
        "style".to_string(),
        Ok(ControlDescription::StyleObject { label: None }),
    );

    vec![ComponentDescriptorWithName::new(
        "Button",
        ComponentDescriptor {
            properties: Ok(button_controls),
            variants: vec![],
        },
    )]
}

pub fn controls_for_external_dependencies(
    npm_dependencies: &[NpmDependency],
) -> PropertyControlsInfo {
    let mut info = PropertyControlsInfo::new();
    for dependency in npm_dependencies {
        if let Some(components) = third_party_components(&dependency.name, &dependency.version) {
            let module_entry = info.entry(dependency.name.clone()).or_default();
            for with_name in components {
                module_entry.insert(with_name.component_name, with_name.descriptor);
            }
        }
    }
    info
}

/// Which module's registry entry owns a named import, if any import binds it.
fn module_path_importing_name(imports: &Imports, imported_name: &str) -> Option<String> {
    imports.iter().find_map(|(source, details)| {
        let binds_name = details
            .imported_from_within
            .iter()
            .any(|alias| alias.alias == imported_name)
            || details.imported_with_name.as_deref() == Some(imported_name)
            || details.imported_as.as_deref() == Some(imported_name);
        if binds_name {
            Some(strip_source_extension(source))
        } else {
            None
        }
    })
}

/// Resolve the controls applying to a rendered element.
pub fn property_controls_for_target(
    element_name: &ElementName,
    imports: &Imports,
    open_file_path: Option<&str>,
    registry: &PropertyControlsInfo,
) -> Option<ParsedPropertyControls> {
    let imported_name = element_name.base_variable.as_str();
    let tag_name = element_name.as_string();

    let mut module_path = module_path_importing_name(imports, imported_name);

    if module_path.is_none() && is_intrinsic_html_element(element_name) {
        return Some(HTML_ELEMENT_STYLE_PROPS.clone());
    }
    if module_path.is_none() {
        // Defined in the open file itself.
        module_path = open_file_path.map(strip_source_extension);
    }

    let module_path = module_path?;
    let descriptor = registry.get(&module_path)?.get(&tag_name)?;
    descriptor.properties.as_ref().ok().cloned()
}

/// Declared defaults for a component, keyed the way the inspector expects.
pub fn default_properties_for_component_in_file(
    component_name: &str,
    module_path: &str,
    registry: &PropertyControlsInfo,
) -> BTreeMap<String, Value> {
    registry
        .get(module_path)
        .and_then(|components| components.get(component_name))
        .and_then(|descriptor| descriptor.properties.as_ref().ok())
        .map(default_props)
        .unwrap_or_default()
}
