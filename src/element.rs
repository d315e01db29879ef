//! Parsed element tree model.
//!
//! The source parser is an external collaborator: this crate consumes its
//! output as an already-parsed tree of top-level definitions. The wire form
//! mirrors the parser's JSON output (camelCase keys, `type` discriminants),
//! so a tree round-trips through `serde_json` unchanged.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT NAMES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementName {
    pub base_variable: String,
    #[serde(default)]
    pub property_path: Vec<String>,
}

impl ElementName {
    pub fn new(base_variable: &str) -> Self {
        Self {
            base_variable: base_variable.to_string(),
            property_path: Vec::new(),
        }
    }

    /// Flattened display name, e.g. `Card.Header`.
    pub fn as_string(&self) -> String {
        if self.property_path.is_empty() {
            self.base_variable.clone()
        } else {
            format!("{}.{}", self.base_variable, self.property_path.join("."))
        }
    }
}

lazy_static! {
    static ref INTRINSIC_HTML_ELEMENTS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for tag in [
            "a", "article", "aside", "b", "blockquote", "br", "button", "canvas", "caption",
            "code", "col", "div", "em", "fieldset", "figure", "footer", "form", "h1", "h2", "h3",
            "h4", "h5", "h6", "header", "hr", "i", "iframe", "img", "input", "label", "li",
            "main", "nav", "ol", "option", "p", "pre", "section", "select", "small", "span",
            "strong", "table", "tbody", "td", "textarea", "th", "thead", "tr", "u", "ul",
            "video",
        ] {
            s.insert(tag);
        }
        s
    };
}

/// Intrinsic elements are lowercase host tags with no member path.
pub fn is_intrinsic_html_element(name: &ElementName) -> bool {
    name.property_path.is_empty() && INTRINSIC_HTML_ELEMENTS.contains(name.base_variable.as_str())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AttributeValue {
    #[serde(rename = "ATTRIBUTE_VALUE", rename_all = "camelCase")]
    Static { value: serde_json::Value },
    #[serde(rename = "ATTRIBUTE_EXPRESSION", rename_all = "camelCase")]
    Expression { code: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsxAttribute {
    pub key: String,
    pub value: AttributeValue,
}

pub fn jsx_attribute_value(key: &str, value: serde_json::Value) -> JsxAttribute {
    JsxAttribute {
        key: key.to_string(),
        value: AttributeValue::Static { value },
    }
}

pub fn jsx_attribute_expression(key: &str, code: &str) -> JsxAttribute {
    JsxAttribute {
        key: key.to_string(),
        value: AttributeValue::Expression {
            code: code.to_string(),
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsxElementChild {
    #[serde(rename = "JSX_ELEMENT")]
    Element(JsxElement),
    #[serde(rename = "JSX_TEXT_BLOCK", rename_all = "camelCase")]
    Text { text: String },
    #[serde(rename = "JSX_ARBITRARY_BLOCK", rename_all = "camelCase")]
    Expression { code: String },
    #[serde(rename = "JSX_FRAGMENT", rename_all = "camelCase")]
    Fragment { children: Vec<JsxElementChild> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsxElement {
    pub name: ElementName,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub props: Vec<JsxAttribute>,
    #[serde(default)]
    pub children: Vec<JsxElementChild>,
}

pub fn jsx_element(
    name: &str,
    uid: &str,
    props: Vec<JsxAttribute>,
    children: Vec<JsxElementChild>,
) -> JsxElement {
    JsxElement {
        name: ElementName::new(name),
        uid: uid.to_string(),
        props,
        children,
    }
}

/// Insert-menu fragments carry no uid; one is assigned on insertion.
pub fn jsx_element_without_uid(
    name: &str,
    props: Vec<JsxAttribute>,
    children: Vec<JsxElementChild>,
) -> JsxElement {
    jsx_element(name, "", props, children)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOP-LEVEL DEFINITIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinition {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    pub root_element: JsxElement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TopLevelElement {
    #[serde(rename = "COMPONENT")]
    Component(ComponentDefinition),
    /// A non-component code block whose bindings become plain scope values.
    #[serde(rename = "ARBITRARY_BLOCK", rename_all = "camelCase")]
    ArbitraryBlock {
        #[serde(default)]
        defined_within: BTreeMap<String, serde_json::Value>,
        /// Names the block references from the surrounding module scope.
        #[serde(default)]
        defined_elsewhere: Vec<String>,
    },
}

pub fn find_component<'a>(
    top_level_elements: &'a [TopLevelElement],
    name: &str,
) -> Option<&'a ComponentDefinition> {
    top_level_elements.iter().find_map(|element| match element {
        TopLevelElement::Component(definition) if definition.name == name => Some(definition),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intrinsic_detection_requires_bare_lowercase_tag() {
        assert!(is_intrinsic_html_element(&ElementName::new("div")));
        assert!(!is_intrinsic_html_element(&ElementName::new("Card")));
        let with_path = ElementName {
            base_variable: "div".to_string(),
            property_path: vec!["inner".to_string()],
        };
        assert!(!is_intrinsic_html_element(&with_path));
    }

    #[test]
    fn element_name_flattens_property_path() {
        let name = ElementName {
            base_variable: "Card".to_string(),
            property_path: vec!["Header".to_string()],
        };
        assert_eq!(name.as_string(), "Card.Header");
    }

    #[test]
    fn element_tree_round_trips_through_json() {
        let element = jsx_element(
            "div",
            "root",
            vec![jsx_attribute_value("title", json!("Default"))],
            vec![JsxElementChild::Text {
                text: "hi".to_string(),
            }],
        );
        let wire = serde_json::to_value(&element).unwrap();
        assert_eq!(wire["props"][0]["value"]["type"], "ATTRIBUTE_VALUE");
        let back: JsxElement = serde_json::from_value(wire).unwrap();
        assert_eq!(back, element);
    }
}
