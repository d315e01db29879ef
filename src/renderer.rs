//! Component renderer wrappers.
//!
//! Every component a module scope exposes is wrapped in a `ComponentRenderer`
//! carrying the defining module path, the component name, and a hash of the
//! definition it was created from. The wrapper is referentially stable: the
//! canvas reuses a cached wrapper across passes as long as `matches_definition`
//! holds, and only mints a fresh one when the definition actually changed.
//!
//! Rendering is the compute half of a pass: it walks the current definition
//! tree (always re-fetched from project contents, so hot-reloaded code wins
//! over the definition the wrapper was minted from), records spy metadata per
//! instance path, and produces a `RenderedNode` tree for the commit half.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::element::{
    find_component, is_intrinsic_html_element, AttributeValue, ComponentDefinition, ElementName,
    JsxElement, JsxElementChild,
};
use crate::paths::{is_hidden_instance, InstancePath, TemplatePath};
use crate::project::ProjectContents;
use crate::scope::{ExecutionScope, ModuleScope, ScopeValue};
use crate::spy::{ElementInstanceMetadata, SpyContext};

/// Nested component chains deeper than this indicate runaway recursion
/// through mutually rendering components.
const MAX_RENDER_DEPTH: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSOLE CAPTURE
// ═══════════════════════════════════════════════════════════════════════════════

/// One captured console entry from a render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLog {
    pub method: String,
    pub data: Vec<Value>,
}

impl ConsoleLog {
    pub fn warn(message: &str) -> Self {
        Self {
            method: "warn".to_string(),
            data: vec![Value::String(message.to_string())],
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// The computed output tree. Instance paths on nodes line up with the spy
/// metadata keys recorded during the same pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedNode {
    pub tag: String,
    pub path: String,
    pub props: BTreeMap<String, Value>,
    pub children: Vec<RenderedNode>,
}

impl RenderedNode {
    fn text(path: String, text: &str) -> Self {
        Self {
            tag: "#text".to_string(),
            path,
            props: BTreeMap::from([("text".to_string(), Value::String(text.to_string()))]),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("component `{component}` has no definition in `{module}`")]
    MissingDefinition { module: String, component: String },
    #[error("render depth limit exceeded at `{path}`")]
    DepthLimitExceeded { path: String },
}

/// Everything one render pass threads through the element walk.
pub struct RenderContext<'a> {
    pub project: &'a ProjectContents,
    pub scopes: &'a BTreeMap<String, ModuleScope>,
    pub spy: &'a mut SpyContext,
    pub console: &'a mut Vec<ConsoleLog>,
    pub hidden_instances: &'a [TemplatePath],
    pub edited_text_element: Option<&'a InstancePath>,
    pub canvas_is_live: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT RENDERER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRenderer {
    pub module_path: String,
    pub component_name: String,
    definition_hash: String,
}

impl ComponentRenderer {
    pub fn new(module_path: &str, definition: &ComponentDefinition) -> Self {
        Self {
            module_path: module_path.to_string(),
            component_name: definition.name.clone(),
            definition_hash: definition_hash(definition),
        }
    }

    /// True when `definition` is the one this wrapper was minted from, so the
    /// cached wrapper can be reused and downstream identity checks hold.
    pub fn matches_definition(&self, definition: &ComponentDefinition) -> bool {
        self.component_name == definition.name
            && self.definition_hash == definition_hash(definition)
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    /// Render this component at `instance_path`. Returns `None` when the
    /// whole instance is hidden.
    pub fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        instance_path: &InstancePath,
    ) -> Result<Option<RenderedNode>, RenderError> {
        self.render_at_depth(ctx, instance_path, 0)
    }

    fn render_at_depth(
        &self,
        ctx: &mut RenderContext<'_>,
        instance_path: &InstancePath,
        depth: usize,
    ) -> Result<Option<RenderedNode>, RenderError> {
        let project = ctx.project;
        // Always the current tree: a hot-reloaded definition replaces the
        // one this wrapper was minted from.
        let definition = project
            .parsed_module(&self.module_path)
            .and_then(|module| find_component(&module.top_level_elements, &self.component_name))
            .ok_or_else(|| RenderError::MissingDefinition {
                module: self.module_path.clone(),
                component: self.component_name.clone(),
            })?;
        self.render_element(ctx, &definition.root_element, instance_path, depth)
    }

    fn render_element(
        &self,
        ctx: &mut RenderContext<'_>,
        element: &JsxElement,
        parent_path: &InstancePath,
        depth: usize,
    ) -> Result<Option<RenderedNode>, RenderError> {
        let path = parent_path.append(element_uid(element));
        if depth > MAX_RENDER_DEPTH {
            return Err(RenderError::DepthLimitExceeded {
                path: path.as_string(),
            });
        }

        let props = resolve_props(element);
        let tag = element.name.as_string();

        // The text-edit target renders as a muted placeholder under the
        // editing overlay, children withheld.
        if ctx.edited_text_element == Some(&path) {
            let mut placeholder_props = props;
            placeholder_props.insert("data-text-editing".to_string(), Value::Bool(true));
            ctx.spy.record(ElementInstanceMetadata {
                element_path: path.as_string(),
                tag_name: tag.clone(),
                props: placeholder_props.clone(),
                global_frame: None,
            });
            return Ok(Some(RenderedNode {
                tag,
                path: path.as_string(),
                props: placeholder_props,
                children: Vec::new(),
            }));
        }

        if is_hidden_instance(ctx.hidden_instances, &path) {
            return Ok(None);
        }

        if !is_intrinsic_html_element(&element.name) {
            let scope_value = ctx
                .scopes
                .get(&self.module_path)
                .and_then(|module| lookup_scope_value(&module.scope, &element.name));
            match scope_value {
                Some(ScopeValue::Component(renderer)) => {
                    ctx.spy.record(ElementInstanceMetadata {
                        element_path: path.as_string(),
                        tag_name: tag.clone(),
                        props: props.clone(),
                        global_frame: None,
                    });
                    let renderer = renderer.clone();
                    let rendered = renderer.render_at_depth(ctx, &path, depth + 1)?;
                    return Ok(Some(RenderedNode {
                        tag,
                        path: path.as_string(),
                        props,
                        children: rendered.into_iter().collect(),
                    }));
                }
                Some(_) | None => {
                    // Unresolved component names still render as a node so
                    // the canvas shows something selectable, with a warning
                    // captured for the console feed.
                    ctx.console.push(ConsoleLog::warn(&format!(
                        "Component {} is not in scope in {}",
                        tag, self.module_path
                    )));
                }
            }
        }

        ctx.spy.record(ElementInstanceMetadata {
            element_path: path.as_string(),
            tag_name: tag.clone(),
            props: props.clone(),
            global_frame: None,
        });

        let mut children = Vec::new();
        self.render_children(ctx, &element.children, &path, depth, &mut children)?;
        Ok(Some(RenderedNode {
            tag,
            path: path.as_string(),
            props,
            children,
        }))
    }

    fn render_children(
        &self,
        ctx: &mut RenderContext<'_>,
        source_children: &[JsxElementChild],
        parent_path: &InstancePath,
        depth: usize,
        out: &mut Vec<RenderedNode>,
    ) -> Result<(), RenderError> {
        for (index, child) in source_children.iter().enumerate() {
            match child {
                JsxElementChild::Element(inner) => {
                    if let Some(node) = self.render_element(ctx, inner, parent_path, depth + 1)? {
                        out.push(node);
                    }
                }
                JsxElementChild::Text { text } => {
                    out.push(RenderedNode::text(
                        format!("{}/text-{}", parent_path.as_string(), index),
                        text,
                    ));
                }
                JsxElementChild::Expression { code } => {
                    // Dynamic content surfaces as its source; evaluation is
                    // the host runtime's concern.
                    out.push(RenderedNode {
                        tag: "#expression".to_string(),
                        path: format!("{}/expr-{}", parent_path.as_string(), index),
                        props: BTreeMap::from([(
                            "code".to_string(),
                            Value::String(code.clone()),
                        )]),
                        children: Vec::new(),
                    });
                }
                JsxElementChild::Fragment { children } => {
                    // Fragments splice their children into the parent.
                    self.render_children(ctx, children, parent_path, depth, out)?;
                }
            }
        }
        Ok(())
    }
}

/// Elements missing a uid fall back to their display name so paths stay
/// non-empty and deterministic.
fn element_uid(element: &JsxElement) -> &str {
    if element.uid.is_empty() {
        &element.name.base_variable
    } else {
        &element.uid
    }
}

fn resolve_props(element: &JsxElement) -> BTreeMap<String, Value> {
    element
        .props
        .iter()
        .map(|attribute| {
            let value = match &attribute.value {
                AttributeValue::Static { value } => value.clone(),
                AttributeValue::Expression { code } => Value::String(format!("{{{}}}", code)),
            };
            (attribute.key.clone(), value)
        })
        .collect()
}

/// Walk an element name's member path through star-import module bindings,
/// e.g. `Widgets.Card` through a `Module` value.
fn lookup_scope_value<'s>(scope: &'s ExecutionScope, name: &ElementName) -> Option<&'s ScopeValue> {
    let mut current = scope.get(&name.base_variable)?;
    for segment in &name.property_path {
        match current {
            ScopeValue::Module(inner) => current = inner.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

fn definition_hash(definition: &ComponentDefinition) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(definition).unwrap_or_default());
    format!("{:x}", hasher.finalize())
}
