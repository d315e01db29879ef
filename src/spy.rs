//! Spy context: instance metadata collected during a render pass.
//!
//! Exactly one spy context is alive per canvas render session. The renderer
//! appends one entry per instantiated element; inspector and navigator
//! collaborators read the snapshot after the pass commits.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasRectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInstanceMetadata {
    pub element_path: String,
    pub tag_name: String,
    #[serde(default)]
    pub props: BTreeMap<String, Value>,
    /// Filled in by the DOM-walking collaborator after layout; the renderer
    /// only reserves the slot.
    pub global_frame: Option<CanvasRectangle>,
}

pub type ElementInstanceMetadataMap = BTreeMap<String, ElementInstanceMetadata>;

#[derive(Debug, Default)]
pub struct SpyContext {
    metadata: ElementInstanceMetadataMap,
}

impl SpyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new pass starts from an empty map; nothing carries over.
    pub fn reset_for_pass(&mut self) {
        self.metadata.clear();
    }

    pub fn record(&mut self, entry: ElementInstanceMetadata) {
        self.metadata.insert(entry.element_path.clone(), entry);
    }

    pub fn snapshot(&self) -> &ElementInstanceMetadataMap {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> ElementInstanceMetadata {
        ElementInstanceMetadata {
            element_path: path.to_string(),
            tag_name: "div".to_string(),
            props: BTreeMap::new(),
            global_frame: None,
        }
    }

    #[test]
    fn records_are_keyed_by_path_and_reset_per_pass() {
        let mut spy = SpyContext::new();
        spy.record(entry(":root"));
        spy.record(entry(":root/aaa"));
        assert_eq!(spy.len(), 2);

        spy.reset_for_pass();
        assert!(spy.is_empty());
    }

    #[test]
    fn rerecording_a_path_overwrites() {
        let mut spy = SpyContext::new();
        spy.record(entry(":root"));
        let mut updated = entry(":root");
        updated.tag_name = "span".to_string();
        spy.record(updated.clone());
        assert_eq!(spy.snapshot()[":root"], updated);
    }
}
