//! Canvas host and render root.
//!
//! A render pass is two phases. Compute: sync CSS side effects, build
//! execution scopes for the open file, pick the storyboard root, and walk the
//! tree into a `RenderedNode` structure while the spy records per-instance
//! metadata. Commit: hand the committed container and the metadata snapshot
//! to the host's DOM-report callback. The phase state machine makes the
//! ordering observable; a failed pass leaves no partial commit behind and the
//! next pass re-enters from the top.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::paths::{
    empty_scene_path_for_storyboard, valid_paths_for_component, InstancePath, ScenePath,
    TemplatePath, STORYBOARD_VARIABLE_NAME,
};
use crate::project::ProjectContents;
use crate::renderer::{
    ComponentRenderer, ConsoleLog, RenderContext, RenderError, RenderedNode,
};
use crate::scope::{sync_css_imports, FallbackRequire, ScopeBuilder, ScopeError, StylesheetHost};
use crate::spy::{ElementInstanceMetadataMap, SpyContext};

/// DOM id the committed canvas mounts under.
pub const CANVAS_CONTAINER_ID: &str = "canvas-container";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasVector {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Idle,
    BuildingScope,
    Rendering,
    Committed,
}

impl Default for RenderPhase {
    fn default() -> Self {
        RenderPhase::Idle
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CANVAS PROPS
// ═══════════════════════════════════════════════════════════════════════════════

/// The slice of editor state one render pass depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasProps {
    pub offset: CanvasVector,
    pub scale: f64,
    pub ui_file_path: String,
    pub hidden_instances: Vec<TemplatePath>,
    pub edited_text_element: Option<InstancePath>,
    pub canvas_is_live: bool,
    /// Scene being interacted with in live mode, if any.
    pub focused_element_path: Option<ScenePath>,
    pub mount_count: u64,
    pub walk_dom: bool,
}

/// Editor-store snapshot the props are picked from. Kept separate so the
/// canvas never sees store fields it does not depend on.
#[derive(Debug, Clone, Default)]
pub struct EditorSnapshot {
    pub open_file_path: Option<String>,
    pub canvas_offset: CanvasVector,
    pub scale: f64,
    pub hidden_instances: Vec<TemplatePath>,
    pub text_editor_target: Option<InstancePath>,
    pub live_mode: bool,
    pub focused_element_path: Option<ScenePath>,
    pub mount_count: u64,
}

/// `None` when no file is open; the canvas simply does not render. The text
/// edit target also joins the hidden set so the canvas copy stays muted under
/// the editing overlay.
pub fn pick_canvas_props(editor: &EditorSnapshot) -> Option<CanvasProps> {
    let ui_file_path = editor.open_file_path.clone()?;
    let mut hidden_instances = editor.hidden_instances.clone();
    if let Some(edited) = &editor.text_editor_target {
        hidden_instances.push(TemplatePath::Instance(edited.clone()));
    }
    Some(CanvasProps {
        offset: editor.canvas_offset,
        scale: editor.scale,
        ui_file_path,
        hidden_instances,
        edited_text_element: editor.text_editor_target.clone(),
        canvas_is_live: editor.live_mode,
        focused_element_path: editor.focused_element_path.clone(),
        mount_count: editor.mount_count,
        walk_dom: true,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMITTED OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasContainer {
    pub container_id: String,
    pub valid_root_paths: Vec<InstancePath>,
    pub root: Option<RenderedNode>,
    pub scale: f64,
    pub offset: CanvasVector,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedCanvas {
    pub container: CanvasContainer,
    pub metadata: ElementInstanceMetadataMap,
    pub console_logs: Vec<ConsoleLog>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("open file `{0}` has no parsed module")]
    OpenFileNotParsed(String),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

// ═══════════════════════════════════════════════════════════════════════════════
// CANVAS HOST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct CanvasHost {
    phase: RenderPhase,
    spy: SpyContext,
    console_logs: Vec<ConsoleLog>,
    /// (module path, component name) → last minted wrapper, reused while
    /// `matches_definition` holds so root identity is stable across passes.
    renderer_cache: BTreeMap<(String, String), ComponentRenderer>,
}

impl CanvasHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Console entries captured by the most recent pass.
    pub fn console_logs(&self) -> &[ConsoleLog] {
        &self.console_logs
    }

    /// Spy metadata from the most recent pass.
    pub fn metadata(&self) -> &ElementInstanceMetadataMap {
        self.spy.snapshot()
    }

    /// Run one full render pass over the open file.
    pub fn render_pass(
        &mut self,
        props: &CanvasProps,
        project: &ProjectContents,
        stylesheets: &mut dyn StylesheetHost,
        fallback: &dyn FallbackRequire,
        on_dom_report: &mut dyn FnMut(&ElementInstanceMetadataMap),
    ) -> Result<CommittedCanvas, CanvasError> {
        self.phase = RenderPhase::BuildingScope;
        self.spy.reset_for_pass();
        self.console_logs.clear();

        let parsed = project
            .parsed_module(&props.ui_file_path)
            .ok_or_else(|| CanvasError::OpenFileNotParsed(props.ui_file_path.clone()))?;

        // Stylesheet links must reflect this pass before any module loads.
        sync_css_imports(stylesheets, &props.ui_file_path, &parsed.imports);

        let mut builder = ScopeBuilder::new(project, fallback);
        let module_scope = builder.build_execution_scope(&props.ui_file_path)?;
        let scopes = builder.into_scopes();

        let storyboard = module_scope
            .top_level_components
            .get(STORYBOARD_VARIABLE_NAME);
        let valid_root_paths = storyboard
            .map(|definition| {
                valid_paths_for_component(definition, &empty_scene_path_for_storyboard())
            })
            .unwrap_or_default();
        let root_renderer = storyboard.map(|definition| {
            self.stable_renderer_for(&props.ui_file_path, definition)
        });

        self.phase = RenderPhase::Rendering;
        let mut console_logs = Vec::new();
        let root = match &root_renderer {
            Some(renderer) => {
                let mut ctx = RenderContext {
                    project,
                    scopes: &scopes,
                    spy: &mut self.spy,
                    console: &mut console_logs,
                    hidden_instances: &props.hidden_instances,
                    edited_text_element: props.edited_text_element.as_ref(),
                    canvas_is_live: props.canvas_is_live,
                };
                renderer.render(
                    &mut ctx,
                    &InstancePath::new(empty_scene_path_for_storyboard(), Vec::new()),
                )?
            }
            None => {
                tracing::debug!(
                    file = %props.ui_file_path,
                    "open file has no storyboard; committing an empty canvas"
                );
                None
            }
        };
        self.console_logs = console_logs;

        self.phase = RenderPhase::Committed;
        let metadata = self.spy.snapshot().clone();
        if props.walk_dom {
            on_dom_report(&metadata);
        }
        Ok(CommittedCanvas {
            container: CanvasContainer {
                container_id: CANVAS_CONTAINER_ID.to_string(),
                valid_root_paths,
                root,
                scale: props.scale,
                offset: props.offset,
            },
            metadata,
            console_logs: self.console_logs.clone(),
        })
    }

    fn stable_renderer_for(
        &mut self,
        module_path: &str,
        definition: &crate::element::ComponentDefinition,
    ) -> ComponentRenderer {
        let key = (module_path.to_string(), definition.name.clone());
        if let Some(existing) = self.renderer_cache.get(&key) {
            if existing.matches_definition(definition) {
                return existing.clone();
            }
        }
        let fresh = ComponentRenderer::new(module_path, definition);
        self.renderer_cache.insert(key, fresh.clone());
        fresh
    }
}

/// Scene paths for every scene-like child of the storyboard root. The
/// storyboard's own scene is the unnamed one.
pub fn scene_path_for_storyboard_child(uid: &str) -> ScenePath {
    ScenePath::new(vec![uid.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{jsx_element, ComponentDefinition, JsxElementChild, TopLevelElement};
    use crate::project::{ExportsDetail, Imports, ParsedModule, ProjectFile};
    use crate::scope::NoFallback;

    struct NullStylesheets;
    impl StylesheetHost for NullStylesheets {
        fn unimport_all_but(&mut self, _css_files: &[String]) {}
    }

    fn storyboard_project() -> ProjectContents {
        let mut contents = ProjectContents::new();
        contents.insert(
            "/src/app.js",
            ProjectFile::Text {
                code: String::new(),
                parsed: Some(ParsedModule {
                    top_level_elements: vec![TopLevelElement::Component(ComponentDefinition {
                        name: STORYBOARD_VARIABLE_NAME.to_string(),
                        params: vec![],
                        root_element: jsx_element(
                            "div",
                            "sb",
                            vec![],
                            vec![JsxElementChild::Element(jsx_element(
                                "span",
                                "hello",
                                vec![],
                                vec![],
                            ))],
                        ),
                    })],
                    imports: Imports::new(),
                    exports: ExportsDetail::default(),
                }),
            },
        );
        contents
    }

    fn props_for(file: &str) -> CanvasProps {
        CanvasProps {
            offset: CanvasVector::default(),
            scale: 1.0,
            ui_file_path: file.to_string(),
            hidden_instances: vec![],
            edited_text_element: None,
            canvas_is_live: false,
            focused_element_path: None,
            mount_count: 1,
            walk_dom: true,
        }
    }

    #[test]
    fn pick_canvas_props_requires_an_open_file() {
        assert!(pick_canvas_props(&EditorSnapshot::default()).is_none());

        let editor = EditorSnapshot {
            open_file_path: Some("/src/app.js".to_string()),
            text_editor_target: Some(InstancePath::new(
                ScenePath::default(),
                vec!["sb".to_string()],
            )),
            ..EditorSnapshot::default()
        };
        let props = pick_canvas_props(&editor).unwrap();
        assert_eq!(props.ui_file_path, "/src/app.js");
        // The edit target joins the hidden set.
        assert_eq!(props.hidden_instances.len(), 1);
    }

    #[test]
    fn render_pass_commits_and_reports_metadata() {
        let project = storyboard_project();
        let mut host = CanvasHost::new();
        let mut reported: Option<ElementInstanceMetadataMap> = None;
        let committed = host
            .render_pass(
                &props_for("/src/app.js"),
                &project,
                &mut NullStylesheets,
                &NoFallback,
                &mut |metadata| reported = Some(metadata.clone()),
            )
            .unwrap();

        assert_eq!(host.phase(), RenderPhase::Committed);
        assert_eq!(committed.container.container_id, CANVAS_CONTAINER_ID);
        let root = committed.container.root.unwrap();
        assert_eq!(root.path, ":sb");
        let paths: Vec<String> = committed
            .container
            .valid_root_paths
            .iter()
            .map(InstancePath::as_string)
            .collect();
        assert_eq!(paths, vec![":sb", ":sb/hello"]);
        assert_eq!(reported.unwrap().len(), 2);
    }

    #[test]
    fn walk_dom_false_skips_the_dom_report() {
        let project = storyboard_project();
        let mut host = CanvasHost::new();
        let mut props = props_for("/src/app.js");
        props.walk_dom = false;
        let mut reports = 0;
        host.render_pass(
            &props,
            &project,
            &mut NullStylesheets,
            &NoFallback,
            &mut |_| reports += 1,
        )
        .unwrap();
        assert_eq!(reports, 0);
    }

    #[test]
    fn missing_open_file_is_an_error_not_a_panic() {
        let project = storyboard_project();
        let mut host = CanvasHost::new();
        let error = host
            .render_pass(
                &props_for("/src/missing.js"),
                &project,
                &mut NullStylesheets,
                &NoFallback,
                &mut |_| {},
            )
            .unwrap_err();
        assert_eq!(
            error,
            CanvasError::OpenFileNotParsed("/src/missing.js".to_string())
        );
    }

    #[test]
    fn file_without_storyboard_commits_empty_canvas() {
        let mut project = storyboard_project();
        project.insert(
            "/src/plain.js",
            ProjectFile::Text {
                code: String::new(),
                parsed: Some(ParsedModule {
                    top_level_elements: vec![],
                    imports: Imports::new(),
                    exports: ExportsDetail::default(),
                }),
            },
        );
        let mut host = CanvasHost::new();
        let committed = host
            .render_pass(
                &props_for("/src/plain.js"),
                &project,
                &mut NullStylesheets,
                &NoFallback,
                &mut |_| {},
            )
            .unwrap();
        assert!(committed.container.root.is_none());
        assert!(committed.container.valid_root_paths.is_empty());
    }

    #[test]
    fn root_renderer_is_stable_until_the_definition_changes() {
        let project = storyboard_project();
        let mut host = CanvasHost::new();
        let props = props_for("/src/app.js");
        host.render_pass(&props, &project, &mut NullStylesheets, &NoFallback, &mut |_| {})
            .unwrap();
        let first = host.renderer_cache.values().next().unwrap().clone();

        host.render_pass(&props, &project, &mut NullStylesheets, &NoFallback, &mut |_| {})
            .unwrap();
        let second = host.renderer_cache.values().next().unwrap().clone();
        assert_eq!(first, second);

        // A changed definition mints a fresh wrapper.
        let mut changed = storyboard_project();
        changed.insert(
            "/src/app.js",
            ProjectFile::Text {
                code: String::new(),
                parsed: Some(ParsedModule {
                    top_level_elements: vec![TopLevelElement::Component(ComponentDefinition {
                        name: STORYBOARD_VARIABLE_NAME.to_string(),
                        params: vec![],
                        root_element: jsx_element("div", "sb", vec![], vec![]),
                    })],
                    imports: Imports::new(),
                    exports: ExportsDetail::default(),
                }),
            },
        );
        host.render_pass(&props, &changed, &mut NullStylesheets, &NoFallback, &mut |_| {})
            .unwrap();
        let third = host.renderer_cache.values().next().unwrap().clone();
        assert_ne!(first.definition_hash(), third.definition_hash());
    }
}
