//! Scene and instance paths.
//!
//! A rendered element is identified by where it sits in the render tree, not
//! by object identity: a `ScenePath` names the scene an instance lives in and
//! an `InstancePath` appends the chain of element uids from the scene root
//! down to the element. These paths are the keys that correlate the spy
//! metadata with the committed output.

use serde::{Deserialize, Serialize};

use crate::element::{ComponentDefinition, JsxElement, JsxElementChild};

/// Name of the top-level definition treated as the canvas root.
pub const STORYBOARD_VARIABLE_NAME: &str = "storyboard";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePath {
    pub scene_elements: Vec<String>,
}

impl ScenePath {
    pub fn new(scene_elements: Vec<String>) -> Self {
        Self { scene_elements }
    }

    pub fn as_string(&self) -> String {
        self.scene_elements.join("/")
    }
}

/// The storyboard root renders in an unnamed scene.
pub fn empty_scene_path_for_storyboard() -> ScenePath {
    ScenePath::default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePath {
    pub scene: ScenePath,
    pub element_path: Vec<String>,
}

impl InstancePath {
    pub fn new(scene: ScenePath, element_path: Vec<String>) -> Self {
        Self {
            scene,
            element_path,
        }
    }

    pub fn append(&self, uid: &str) -> InstancePath {
        let mut element_path = self.element_path.clone();
        element_path.push(uid.to_string());
        InstancePath {
            scene: self.scene.clone(),
            element_path,
        }
    }

    pub fn as_string(&self) -> String {
        format!("{}:{}", self.scene.as_string(), self.element_path.join("/"))
    }

    pub fn parent(&self) -> Option<InstancePath> {
        if self.element_path.is_empty() {
            return None;
        }
        Some(InstancePath {
            scene: self.scene.clone(),
            element_path: self.element_path[..self.element_path.len() - 1].to_vec(),
        })
    }

    /// Whether `other` is this path or a descendant of it.
    pub fn contains(&self, other: &InstancePath) -> bool {
        self.scene == other.scene
            && self.element_path.len() <= other.element_path.len()
            && other.element_path[..self.element_path.len()] == self.element_path[..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TemplatePath {
    #[serde(rename = "SCENE")]
    Scene(ScenePath),
    #[serde(rename = "INSTANCE")]
    Instance(InstancePath),
}

impl TemplatePath {
    pub fn as_string(&self) -> String {
        match self {
            TemplatePath::Scene(scene) => scene.as_string(),
            TemplatePath::Instance(instance) => instance.as_string(),
        }
    }
}

/// Whether `path` is hidden, either directly or because an ancestor is.
pub fn is_hidden_instance(hidden: &[TemplatePath], path: &InstancePath) -> bool {
    hidden.iter().any(|entry| match entry {
        TemplatePath::Instance(hidden_path) => hidden_path.contains(path),
        TemplatePath::Scene(scene) => *scene == path.scene,
    })
}

/// All instantiation paths a component definition can produce in a scene:
/// one per uid-carrying element, rooted at the definition's root element.
pub fn valid_paths_for_component(
    definition: &ComponentDefinition,
    scene: &ScenePath,
) -> Vec<InstancePath> {
    let mut paths = Vec::new();
    collect_valid_paths(
        &definition.root_element,
        &InstancePath::new(scene.clone(), Vec::new()),
        &mut paths,
    );
    paths
}

fn collect_valid_paths(element: &JsxElement, parent: &InstancePath, out: &mut Vec<InstancePath>) {
    let path = parent.append(&element.uid);
    out.push(path.clone());
    for child in &element.children {
        collect_valid_paths_in_child(child, &path, out);
    }
}

fn collect_valid_paths_in_child(
    child: &JsxElementChild,
    parent: &InstancePath,
    out: &mut Vec<InstancePath>,
) {
    match child {
        JsxElementChild::Element(element) => collect_valid_paths(element, parent, out),
        JsxElementChild::Fragment { children } => {
            for inner in children {
                collect_valid_paths_in_child(inner, parent, out);
            }
        }
        JsxElementChild::Text { .. } | JsxElementChild::Expression { .. } => {}
    }
}
