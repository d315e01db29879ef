//! # Canvas Runtime
//!
//! The live-rendering execution core of a visual UI editor. Project files
//! arrive already parsed; this crate turns them into an on-canvas render and
//! keeps the editor's component metadata in sync with the code.
//!
//! ## Render Pass Invariants
//!
//! 1. **Two phases**: a pass first computes the full `RenderedNode` tree,
//!    then commits it and reports spy metadata. A failed compute leaves no
//!    partial commit; the next pass re-enters from the top.
//! 2. **Export privacy**: a module's scope only exposes names its exports
//!    declare. Unexported components never leak into an importer.
//! 3. **Current tree wins**: renderers always re-fetch the definition from
//!    project contents, so hot-reloaded code renders even through a cached
//!    wrapper. Wrapper identity is stable while the definition is unchanged.
//! 4. **Registrations accumulate, validation reconciles**: property-control
//!    registrations queue per file and are folded into the editor's registry
//!    only by a validation pass, which dispatches a single delta-only update
//!    or nothing at all.
//! 5. **CSS before code**: the stylesheet side-effect pass runs before any
//!    module resolution in the same render.

mod canvas;
mod controls;
mod descriptors;
mod element;
mod paths;
mod project;
mod registry;
mod renderer;
mod resolver;
mod scope;
mod spy;


pub use canvas::{
    pick_canvas_props, CanvasContainer, CanvasError, CanvasHost, CanvasProps, CanvasVector,
    CommittedCanvas, EditorSnapshot, RenderPhase, CANVAS_CONTAINER_ID,
};
pub use controls::{
    default_props, filter_special_props, find_missing_defaults, missing_defaults_warning,
    missing_property_controls_warning, parse_control_description, parse_property_controls,
    remove_ignored, unset_optional_fields, ControlDescription, ControlParseError,
    ParsedPropertyControls,
};
pub use descriptors::{
    insertable_variants, ComponentDescriptor, ComponentDescriptorWithName, ComponentVariant,
    PropertyControlsInfo,
};
pub use element::{
    find_component, is_intrinsic_html_element, jsx_attribute_expression, jsx_attribute_value,
    jsx_element, jsx_element_without_uid, AttributeValue, ComponentDefinition, ElementName,
    JsxAttribute, JsxElement, JsxElementChild, TopLevelElement,
};
pub use paths::{
    empty_scene_path_for_storyboard, is_hidden_instance, valid_paths_for_component, InstancePath,
    ScenePath, TemplatePath, STORYBOARD_VARIABLE_NAME,
};
pub use project::{
    import_alias, import_details, load_project_contents, normalize_name, strip_source_extension,
    ExportsDetail, ImportAlias, ImportDetails, Imports, ParsedModule, ProjectContents, ProjectFile,
    ResolveError,
};
pub use registry::{
    apply_property_controls_update, controls_to_check, resolved_controls, ControlsError,
    ControlsResult, ControlsToCheck, EditorAction, RegisteredControls,
};
pub use renderer::{
    ComponentRenderer, ConsoleLog, RenderContext, RenderError, RenderedNode,
};
pub use resolver::{
    controls_for_external_dependencies, default_properties_for_component_in_file,
    property_controls_for_target, third_party_components, NpmDependency,
};
pub use scope::{
    normalized_css_imports, sync_css_imports, ExecutionScope, FallbackRequire, ModuleScope,
    NoFallback, RequiredModule, ScopeBuilder, ScopeError, ScopeValue, StylesheetHost,
};
pub use spy::{
    CanvasRectangle, ElementInstanceMetadata, ElementInstanceMetadataMap, SpyContext,
};
