//! Property control descriptions.
//!
//! Components publish a declarative description of their configurable
//! properties; the inspector renders widgets from it. The set of control
//! kinds is closed: every place that consumes a description matches on the
//! full enum with no wildcard arm, so adding a kind without handling it
//! everywhere is a compile error rather than a runtime throw.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROL DESCRIPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "control")]
pub enum ControlDescription {
    #[serde(rename = "array", rename_all = "camelCase")]
    Array {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        default_value: Option<Value>,
        #[serde(default)]
        max_count: Option<usize>,
        property_control: Box<ControlDescription>,
    },
    #[serde(rename = "boolean", rename_all = "camelCase")]
    Boolean {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        default_value: Option<Value>,
        #[serde(default)]
        disabled_title: Option<String>,
        #[serde(default)]
        enabled_title: Option<String>,
    },
    #[serde(rename = "color", rename_all = "camelCase")]
    Color {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        default_value: Option<Value>,
    },
    #[serde(rename = "componentinstance", rename_all = "camelCase")]
    ComponentInstance {
        #[serde(default)]
        label: Option<String>,
    },
    #[serde(rename = "enum", rename_all = "camelCase")]
    Enum {
        #[serde(default)]
        label: Option<String>,
        options: Vec<Value>,
        #[serde(default)]
        default_value: Option<Value>,
        #[serde(default)]
        option_titles: Option<Vec<String>>,
        #[serde(default)]
        display_segmented_control: Option<bool>,
    },
    #[serde(rename = "eventhandler", rename_all = "camelCase")]
    EventHandler {
        #[serde(default)]
        label: Option<String>,
    },
    #[serde(rename = "ignore", rename_all = "camelCase")]
    Ignore {
        #[serde(default)]
        label: Option<String>,
    },
    #[serde(rename = "image", rename_all = "camelCase")]
    Image {
        #[serde(default)]
        label: Option<String>,
    },
    #[serde(rename = "number", rename_all = "camelCase")]
    Number {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        default_value: Option<Value>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        unit: Option<String>,
        #[serde(default)]
        step: Option<f64>,
        #[serde(default)]
        display_stepper: Option<bool>,
    },
    #[serde(rename = "object", rename_all = "camelCase")]
    ObjectControl {
        #[serde(default)]
        label: Option<String>,
        object: BTreeMap<String, ControlDescription>,
    },
    #[serde(rename = "options", rename_all = "camelCase")]
    Options {
        #[serde(default)]
        label: Option<String>,
        options: Vec<Value>,
        #[serde(default)]
        default_value: Option<Value>,
    },
    #[serde(rename = "popuplist", rename_all = "camelCase")]
    PopupList {
        #[serde(default)]
        label: Option<String>,
        options: Vec<Value>,
        #[serde(default)]
        default_value: Option<Value>,
    },
    #[serde(rename = "slider", rename_all = "camelCase")]
    Slider {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        default_value: Option<Value>,
        min: f64,
        max: f64,
        step: f64,
    },
    #[serde(rename = "string-input", rename_all = "camelCase")]
    StringInput {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        default_value: Option<Value>,
        #[serde(default)]
        placeholder: Option<String>,
        #[serde(default)]
        obscured: Option<bool>,
    },
    #[serde(rename = "styleobject", rename_all = "camelCase")]
    StyleObject {
        #[serde(default)]
        label: Option<String>,
    },
    #[serde(rename = "union", rename_all = "camelCase")]
    Union {
        #[serde(default)]
        label: Option<String>,
        controls: Vec<ControlDescription>,
        #[serde(default)]
        default_value: Option<Value>,
    },
}

impl ControlDescription {
    pub fn label(&self) -> Option<&str> {
        match self {
            ControlDescription::Array { label, .. }
            | ControlDescription::Boolean { label, .. }
            | ControlDescription::Color { label, .. }
            | ControlDescription::ComponentInstance { label }
            | ControlDescription::Enum { label, .. }
            | ControlDescription::EventHandler { label }
            | ControlDescription::Ignore { label }
            | ControlDescription::Image { label }
            | ControlDescription::Number { label, .. }
            | ControlDescription::ObjectControl { label, .. }
            | ControlDescription::Options { label, .. }
            | ControlDescription::PopupList { label, .. }
            | ControlDescription::Slider { label, .. }
            | ControlDescription::StringInput { label, .. }
            | ControlDescription::StyleObject { label }
            | ControlDescription::Union { label, .. } => label.as_deref(),
        }
    }

    /// The declared default for this control, where the kind carries one.
    pub fn default_value(&self) -> Option<&Value> {
        match self {
            ControlDescription::Array { default_value, .. }
            | ControlDescription::Boolean { default_value, .. }
            | ControlDescription::Color { default_value, .. }
            | ControlDescription::Enum { default_value, .. }
            | ControlDescription::Number { default_value, .. }
            | ControlDescription::Options { default_value, .. }
            | ControlDescription::PopupList { default_value, .. }
            | ControlDescription::Slider { default_value, .. }
            | ControlDescription::StringInput { default_value, .. }
            | ControlDescription::Union { default_value, .. } => default_value.as_ref(),
            ControlDescription::ComponentInstance { .. }
            | ControlDescription::EventHandler { .. }
            | ControlDescription::Ignore { .. }
            | ControlDescription::Image { .. }
            | ControlDescription::ObjectControl { .. }
            | ControlDescription::StyleObject { .. } => None,
        }
    }
}

/// Optional fields left unset on a description; surfaced to component authors
/// as completeness hints. Matches every kind exhaustively.
pub fn unset_optional_fields(description: &ControlDescription) -> Vec<&'static str> {
    let mut result = Vec::new();
    if description.label().is_none() {
        result.push("label");
    }
    let mut field = |name: &'static str, is_unset: bool| {
        if is_unset {
            result.push(name);
        }
    };
    match description {
        ControlDescription::Array {
            default_value,
            max_count,
            ..
        } => {
            field("defaultValue", default_value.is_none());
            field("maxCount", max_count.is_none());
        }
        ControlDescription::Boolean {
            default_value,
            disabled_title,
            enabled_title,
            ..
        } => {
            field("defaultValue", default_value.is_none());
            field("disabledTitle", disabled_title.is_none());
            field("enabledTitle", enabled_title.is_none());
        }
        ControlDescription::Color { default_value, .. } => {
            field("defaultValue", default_value.is_none());
        }
        ControlDescription::ComponentInstance { .. } => {}
        ControlDescription::Enum {
            default_value,
            option_titles,
            display_segmented_control,
            ..
        } => {
            field("defaultValue", default_value.is_none());
            field("optionTitles", option_titles.is_none());
            field("displaySegmentedControl", display_segmented_control.is_none());
        }
        ControlDescription::EventHandler { .. } => {}
        ControlDescription::Ignore { .. } => {}
        ControlDescription::Image { .. } => {}
        ControlDescription::Number {
            default_value,
            max,
            min,
            unit,
            step,
            display_stepper,
            ..
        } => {
            field("defaultValue", default_value.is_none());
            field("max", max.is_none());
            field("min", min.is_none());
            field("unit", unit.is_none());
            field("step", step.is_none());
            field("displayStepper", display_stepper.is_none());
        }
        ControlDescription::ObjectControl { .. } => {}
        ControlDescription::Options { default_value, .. } => {
            field("defaultValue", default_value.is_none());
        }
        ControlDescription::PopupList { default_value, .. } => {
            field("defaultValue", default_value.is_none());
        }
        ControlDescription::Slider { default_value, .. } => {
            field("defaultValue", default_value.is_none());
        }
        ControlDescription::StringInput {
            default_value,
            placeholder,
            obscured,
            ..
        } => {
            field("defaultValue", default_value.is_none());
            field("placeholder", placeholder.is_none());
            field("obscured", obscured.is_none());
        }
        ControlDescription::StyleObject { .. } => {}
        ControlDescription::Union { .. } => {}
    }
    result
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ControlParseError {
    #[error("control description is not an object")]
    NotAnObject,
    #[error("control description is missing the `control` discriminant")]
    MissingControlKind,
    #[error("unknown control kind `{0}`")]
    UnknownControlKind(String),
    #[error("malformed control description: {0}")]
    Malformed(String),
}

/// Per-property parse results; failures are kept so the inspector can show
/// the offending property instead of dropping the whole component.
pub type ParsedPropertyControls = BTreeMap<String, Result<ControlDescription, ControlParseError>>;

pub fn parse_control_description(value: &Value) -> Result<ControlDescription, ControlParseError> {
    let object = value.as_object().ok_or(ControlParseError::NotAnObject)?;
    let kind = object
        .get("control")
        .and_then(Value::as_str)
        .ok_or(ControlParseError::MissingControlKind)?;
    if !KNOWN_CONTROL_KINDS.contains(&kind) {
        return Err(ControlParseError::UnknownControlKind(kind.to_string()));
    }
    serde_json::from_value(value.clone())
        .map_err(|error| ControlParseError::Malformed(error.to_string()))
}

const KNOWN_CONTROL_KINDS: [&str; 16] = [
    "array",
    "boolean",
    "color",
    "componentinstance",
    "enum",
    "eventhandler",
    "ignore",
    "image",
    "number",
    "object",
    "options",
    "popuplist",
    "slider",
    "string-input",
    "styleobject",
    "union",
];

pub fn parse_property_controls(value: &Value) -> Result<ParsedPropertyControls, ControlParseError> {
    let object = value.as_object().ok_or(ControlParseError::NotAnObject)?;
    Ok(object
        .iter()
        .map(|(key, control)| (key.clone(), parse_control_description(control)))
        .collect())
}

// ═══════════════════════════════════════════════════════════════════════════════
// DERIVED INFORMATION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn default_props(parsed: &ParsedPropertyControls) -> BTreeMap<String, Value> {
    let mut result = BTreeMap::new();
    for (key, control) in parsed {
        if let Ok(description) = control {
            if let Some(default_value) = description.default_value() {
                result.insert(key.clone(), default_value.clone());
            }
        }
    }
    result
}

/// Drop `ignore` controls; parse failures are copied through untouched.
pub fn remove_ignored(parsed: &ParsedPropertyControls) -> ParsedPropertyControls {
    parsed
        .iter()
        .filter(|(_, control)| {
            !matches!(control, Ok(ControlDescription::Ignore { .. }))
        })
        .map(|(key, control)| (key.clone(), control.clone()))
        .collect()
}

/// Props every element supports regardless of declared controls.
pub fn filter_special_props(props: &[String]) -> Vec<String> {
    props
        .iter()
        .filter(|prop| *prop != "style" && *prop != "css" && *prop != "className")
        .cloned()
        .collect()
}

pub fn find_missing_defaults(
    known_props: &[String],
    props_with_defaults: &BTreeMap<String, Value>,
) -> Vec<String> {
    filter_special_props(known_props)
        .into_iter()
        .filter(|prop| !props_with_defaults.contains_key(prop))
        .collect()
}

pub fn missing_property_controls_warning(props_without_controls: &[String]) -> Option<String> {
    if props_without_controls.is_empty() {
        None
    } else {
        Some(format!(
            "There are no property controls for these props: {}",
            join_special(props_without_controls, ", ", " & ")
        ))
    }
}

pub fn missing_defaults_warning(props_without_defaults: &[String]) -> Option<String> {
    match props_without_defaults {
        [] => None,
        [prop] => Some(format!("The prop {} doesn't have a default value.", prop)),
        props => Some(format!(
            "These props don't have default values: {}",
            join_special(props, ", ", " & ")
        )),
    }
}

fn join_special(items: &[String], separator: &str, last_separator: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{}{}{}", head.join(separator), last_separator, last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_input_control() {
        let parsed =
            parse_control_description(&json!({ "control": "string-input", "label": "Title" }))
                .unwrap();
        assert_eq!(
            parsed,
            ControlDescription::StringInput {
                label: Some("Title".to_string()),
                default_value: None,
                placeholder: None,
                obscured: None,
            }
        );
    }

    #[test]
    fn unknown_kind_is_a_parse_error_not_a_panic() {
        let result = parse_control_description(&json!({ "control": "holo-deck" }));
        assert_eq!(
            result,
            Err(ControlParseError::UnknownControlKind("holo-deck".to_string()))
        );
    }

    #[test]
    fn missing_discriminant_is_reported() {
        assert_eq!(
            parse_control_description(&json!({ "label": "Title" })),
            Err(ControlParseError::MissingControlKind)
        );
        assert_eq!(
            parse_control_description(&json!("nope")),
            Err(ControlParseError::NotAnObject)
        );
    }

    #[test]
    fn default_props_skips_failures_and_defaultless_controls() {
        let parsed = parse_property_controls(&json!({
            "title": { "control": "string-input", "defaultValue": "Default" },
            "onClick": { "control": "eventhandler" },
            "broken": { "control": "mystery" },
        }))
        .unwrap();
        let defaults = default_props(&parsed);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults["title"], json!("Default"));
    }

    #[test]
    fn remove_ignored_keeps_parse_failures() {
        let parsed = parse_property_controls(&json!({
            "hidden": { "control": "ignore" },
            "title": { "control": "string-input" },
            "broken": { "control": "mystery" },
        }))
        .unwrap();
        let filtered = remove_ignored(&parsed);
        assert!(!filtered.contains_key("hidden"));
        assert!(filtered.contains_key("title"));
        assert!(filtered.contains_key("broken"));
    }

    #[test]
    fn unset_optional_fields_for_number() {
        let description = ControlDescription::Number {
            label: None,
            default_value: Some(json!(1)),
            max: None,
            min: None,
            unit: None,
            step: None,
            display_stepper: None,
        };
        assert_eq!(
            unset_optional_fields(&description),
            vec!["label", "max", "min", "unit", "step", "displayStepper"]
        );
    }

    #[test]
    fn warnings_use_special_joining() {
        let warning = missing_property_controls_warning(&[
            "size".to_string(),
            "tone".to_string(),
            "shape".to_string(),
        ])
        .unwrap();
        assert_eq!(
            warning,
            "There are no property controls for these props: size, tone & shape"
        );
        assert_eq!(
            missing_defaults_warning(&["size".to_string()]).unwrap(),
            "The prop size doesn't have a default value."
        );
        assert!(missing_defaults_warning(&[]).is_none());
    }

    #[test]
    fn special_props_are_filtered_from_missing_defaults() {
        let known = vec![
            "style".to_string(),
            "className".to_string(),
            "title".to_string(),
        ];
        let missing = find_missing_defaults(&known, &BTreeMap::new());
        assert_eq!(missing, vec!["title".to_string()]);
    }
}
