//! Execution scope construction.
//!
//! One module's scope maps its exported names to live-renderable values.
//! Scopes are rebuilt per render pass per module, memoized by module path for
//! the duration of the pass. Import resolution goes through `custom_require`:
//! files the editor understands are substituted with live-rendered component
//! wrappers, everything else falls back to the host's generic loader.
//!
//! Invariants:
//!
//! 1. A module's scope is built fully before it is returned; partial or lazy
//!    bindings never escape. Cyclic component imports are therefore a
//!    detected error, not a hang.
//! 2. Export privacy is a hard filter: bindings absent from a module's
//!    declared exports never leak into an importer's scope.
//! 3. The CSS side-effect pass runs before any module resolution in the same
//!    render, keyed by normalized, de-duplicated, sorted import sources.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::element::TopLevelElement;
use crate::project::{normalize_name, Imports, ParsedModule, ProjectContents};
use crate::renderer::ComponentRenderer;

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE VALUES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScopeValue {
    /// A renderable component wrapper.
    Component(ComponentRenderer),
    /// A plain constant from an arbitrary code block.
    Value(serde_json::Value),
    /// A whole module, as bound by a star import.
    Module(ExecutionScope),
}

pub type ExecutionScope = BTreeMap<String, ScopeValue>;

/// One module's built scope plus its top-level component definitions, which
/// the canvas needs for storyboard-root selection and path validity.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleScope {
    pub scope: ExecutionScope,
    pub top_level_components: BTreeMap<String, crate::element::ComponentDefinition>,
}

/// What an import sees of another module: the export-filtered scope plus the
/// name of the default export, if one exists. Host-loaded modules carry no
/// export metadata.
#[derive(Debug, Clone)]
pub struct RequiredModule {
    pub scope: ExecutionScope,
    pub default_export: Option<String>,
}

impl RequiredModule {
    fn external(scope: ExecutionScope) -> Self {
        Self {
            scope,
            default_export: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST SEAMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Generic module loader for anything the editor cannot substitute:
/// external packages and unparseable files.
pub trait FallbackRequire {
    fn require(&self, import_origin: &str, specifier: &str) -> Option<ExecutionScope>;
}

/// A fallback that resolves nothing; imports simply bind to absence.
pub struct NoFallback;

impl FallbackRequire for NoFallback {
    fn require(&self, _import_origin: &str, _specifier: &str) -> Option<ExecutionScope> {
        None
    }
}

/// Receives the set of stylesheet files the current render depends on and
/// unimports every other previously imported stylesheet.
pub trait StylesheetHost {
    fn unimport_all_but(&mut self, css_files: &[String]);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("cyclic import detected: {}", chain.join(" -> "))]
    CyclicImport { chain: Vec<String> },
    #[error("file `{0}` is not a parsed module")]
    NotParsed(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// CSS SIDE EFFECTS
// ═══════════════════════════════════════════════════════════════════════════════

/// The open file's `.css` import sources, normalized against the importing
/// file, de-duplicated and sorted.
pub fn normalized_css_imports(file_path: &str, imports: &Imports) -> Vec<String> {
    let mut result: Vec<String> = imports
        .keys()
        .filter(|source| source.ends_with(".css"))
        .map(|source| normalize_name(file_path, source))
        .collect();
    result.sort();
    result.dedup();
    result
}

/// Must run before any `custom_require` call in the same render; later
/// renders depend on the stylesheet links already reflecting this pass.
pub fn sync_css_imports(host: &mut dyn StylesheetHost, file_path: &str, imports: &Imports) {
    host.unimport_all_but(&normalized_css_imports(file_path, imports));
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct ScopeBuilder<'p> {
    project: &'p ProjectContents,
    fallback: &'p dyn FallbackRequire,
    /// Per-render-pass memo: module path → built scope.
    cache: BTreeMap<String, ModuleScope>,
    /// Modules currently being built, for cyclic-import detection.
    building: Vec<String>,
}

impl<'p> ScopeBuilder<'p> {
    pub fn new(project: &'p ProjectContents, fallback: &'p dyn FallbackRequire) -> Self {
        Self {
            project,
            fallback,
            cache: BTreeMap::new(),
            building: Vec::new(),
        }
    }

    /// All module scopes built so far this pass, keyed by module path.
    pub fn into_scopes(self) -> BTreeMap<String, ModuleScope> {
        self.cache
    }

    pub fn build_execution_scope(&mut self, file_path: &str) -> Result<ModuleScope, ScopeError> {
        if let Some(cached) = self.cache.get(file_path) {
            return Ok(cached.clone());
        }
        if self.building.iter().any(|path| path == file_path) {
            let mut chain = self.building.clone();
            chain.push(file_path.to_string());
            return Err(ScopeError::CyclicImport { chain });
        }
        let project = self.project;
        let parsed = project
            .parsed_module(file_path)
            .ok_or_else(|| ScopeError::NotParsed(file_path.to_string()))?;

        self.building.push(file_path.to_string());
        let built = self.build_from_parsed(file_path, parsed);
        self.building.pop();

        let module_scope = built?;
        self.cache
            .insert(file_path.to_string(), module_scope.clone());
        Ok(module_scope)
    }

    fn build_from_parsed(
        &mut self,
        file_path: &str,
        parsed: &ParsedModule,
    ) -> Result<ModuleScope, ScopeError> {
        let mut scope = ExecutionScope::new();

        for (source, details) in &parsed.imports {
            let Some(required) = self.custom_require(file_path, source) else {
                // Unresolvable imports bind to absence, never an error.
                continue;
            };
            if let Some(binder) = &details.imported_with_name {
                let default_value = required
                    .default_export
                    .as_ref()
                    .and_then(|name| required.scope.get(name))
                    .or_else(|| required.scope.get("default"));
                match default_value {
                    Some(value) => {
                        scope.insert(binder.clone(), value.clone());
                    }
                    None => {
                        scope.insert(binder.clone(), ScopeValue::Module(required.scope.clone()));
                    }
                }
            }
            for alias in &details.imported_from_within {
                if let Some(value) = required.scope.get(&alias.name) {
                    scope.insert(alias.alias.clone(), value.clone());
                }
            }
            if let Some(star_binder) = &details.imported_as {
                scope.insert(
                    star_binder.clone(),
                    ScopeValue::Module(required.scope.clone()),
                );
            }
        }

        let mut top_level_components = BTreeMap::new();
        for element in &parsed.top_level_elements {
            match element {
                TopLevelElement::Component(definition) => {
                    scope.insert(
                        definition.name.clone(),
                        ScopeValue::Component(ComponentRenderer::new(file_path, definition)),
                    );
                    top_level_components.insert(definition.name.clone(), definition.clone());
                }
                TopLevelElement::ArbitraryBlock { defined_within, .. } => {
                    for (name, value) in defined_within {
                        scope.insert(name.clone(), ScopeValue::Value(value.clone()));
                    }
                }
            }
        }

        Ok(ModuleScope {
            scope,
            top_level_components,
        })
    }

    /// Module resolution for one import. Project-local parsed files get a
    /// recursively built, export-filtered scope; everything else goes to the
    /// host loader.
    pub fn custom_require(
        &mut self,
        import_origin: &str,
        specifier: &str,
    ) -> Option<RequiredModule> {
        let project = self.project;
        let resolved_path = match project.resolve(import_origin, specifier) {
            Ok(path) => path,
            Err(_) => return self.host_require(import_origin, specifier),
        };
        let Some(parsed) = project.parsed_module(&resolved_path) else {
            return self.host_require(import_origin, specifier);
        };
        match self.build_execution_scope(&resolved_path) {
            Ok(module_scope) => {
                let exports = &parsed.exports;
                let filtered: ExecutionScope = module_scope
                    .scope
                    .into_iter()
                    .filter(|(name, _)| exports.exports_name(name))
                    .collect();
                Some(RequiredModule {
                    scope: filtered,
                    default_export: exports.default_export.clone(),
                })
            }
            Err(error) => {
                tracing::warn!(
                    path = %resolved_path,
                    %error,
                    "scope construction failed; deferring to host loader"
                );
                self.host_require(import_origin, specifier)
            }
        }
    }

    fn host_require(&self, import_origin: &str, specifier: &str) -> Option<RequiredModule> {
        self.fallback
            .require(import_origin, specifier)
            .map(RequiredModule::external)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{jsx_element, ComponentDefinition, TopLevelElement};
    use crate::project::{import_alias, import_details, ExportsDetail, ProjectFile};
    use std::collections::BTreeSet;

    fn component(name: &str) -> TopLevelElement {
        TopLevelElement::Component(ComponentDefinition {
            name: name.to_string(),
            params: vec![],
            root_element: jsx_element("div", "root", vec![], vec![]),
        })
    }

    fn parsed_file(
        top_level_elements: Vec<TopLevelElement>,
        imports: Imports,
        named_exports: &[&str],
        default_export: Option<&str>,
    ) -> ProjectFile {
        ProjectFile::Text {
            code: String::new(),
            parsed: Some(ParsedModule {
                top_level_elements,
                imports,
                exports: ExportsDetail {
                    named_exports: named_exports
                        .iter()
                        .map(|name| name.to_string())
                        .collect::<BTreeSet<_>>(),
                    default_export: default_export.map(str::to_string),
                },
            }),
        }
    }

    fn card_project() -> ProjectContents {
        let mut contents = ProjectContents::new();
        contents.insert(
            "/src/card.js",
            parsed_file(
                vec![component("Card"), component("Hidden")],
                Imports::new(),
                &["Card"],
                None,
            ),
        );
        contents.insert(
            "/src/app.js",
            parsed_file(
                vec![component("storyboard")],
                Imports::from([(
                    "./card".to_string(),
                    import_details(None, vec![import_alias("Card")], None),
                )]),
                &["storyboard"],
                None,
            ),
        );
        contents
    }

    #[test]
    fn imported_components_enter_the_importer_scope() {
        let project = card_project();
        let mut builder = ScopeBuilder::new(&project, &NoFallback);
        let module_scope = builder.build_execution_scope("/src/app.js").unwrap();
        assert!(matches!(
            module_scope.scope.get("Card"),
            Some(ScopeValue::Component(_))
        ));
    }

    #[test]
    fn unexported_bindings_never_leak() {
        let project = card_project();
        let mut builder = ScopeBuilder::new(&project, &NoFallback);
        let module_scope = builder.build_execution_scope("/src/app.js").unwrap();
        // `Hidden` exists inside /src/card.js but is not exported.
        assert!(module_scope.scope.get("Hidden").is_none());

        let card_scope = builder.build_execution_scope("/src/card.js").unwrap();
        assert!(card_scope.scope.contains_key("Hidden"));
    }

    #[test]
    fn default_imports_bind_the_default_export() {
        let mut contents = ProjectContents::new();
        contents.insert(
            "/src/card.js",
            parsed_file(vec![component("Card")], Imports::new(), &[], Some("Card")),
        );
        contents.insert(
            "/src/app.js",
            parsed_file(
                vec![],
                Imports::from([(
                    "./card".to_string(),
                    import_details(Some("TheCard"), vec![], None),
                )]),
                &[],
                None,
            ),
        );
        let mut builder = ScopeBuilder::new(&contents, &NoFallback);
        let module_scope = builder.build_execution_scope("/src/app.js").unwrap();
        assert!(matches!(
            module_scope.scope.get("TheCard"),
            Some(ScopeValue::Component(_))
        ));
    }

    #[test]
    fn star_imports_bind_the_whole_filtered_module() {
        let mut contents = card_project();
        contents.insert(
            "/src/all.js",
            parsed_file(
                vec![],
                Imports::from([(
                    "./card".to_string(),
                    import_details(None, vec![], Some("Cards")),
                )]),
                &[],
                None,
            ),
        );
        let mut builder = ScopeBuilder::new(&contents, &NoFallback);
        let module_scope = builder.build_execution_scope("/src/all.js").unwrap();
        match module_scope.scope.get("Cards") {
            Some(ScopeValue::Module(inner)) => {
                assert!(inner.contains_key("Card"));
                assert!(!inner.contains_key("Hidden"));
            }
            other => panic!("expected module binding, got {:?}", other),
        }
    }

    #[test]
    fn cyclic_imports_are_detected_not_fatal() {
        let mut contents = ProjectContents::new();
        contents.insert(
            "/src/a.js",
            parsed_file(
                vec![component("A")],
                Imports::from([(
                    "./b".to_string(),
                    import_details(None, vec![import_alias("B")], None),
                )]),
                &["A"],
                None,
            ),
        );
        contents.insert(
            "/src/b.js",
            parsed_file(
                vec![component("B")],
                Imports::from([(
                    "./a".to_string(),
                    import_details(None, vec![import_alias("A")], None),
                )]),
                &["B"],
                None,
            ),
        );
        let mut builder = ScopeBuilder::new(&contents, &NoFallback);
        // The outer build succeeds with the cycle broken at the back edge:
        // `B` was built without an `A` binding, then `A` binds `B` normally.
        let module_scope = builder.build_execution_scope("/src/a.js").unwrap();
        assert!(matches!(
            module_scope.scope.get("B"),
            Some(ScopeValue::Component(_))
        ));
        let inner = builder.build_execution_scope("/src/b.js").unwrap();
        assert!(inner.scope.get("A").is_none());

        // The cycle itself is reported when hit directly mid-build.
        let mut direct = ScopeBuilder::new(&contents, &NoFallback);
        direct.building.push("/src/a.js".to_string());
        let error = direct.build_execution_scope("/src/a.js").unwrap_err();
        assert!(matches!(error, ScopeError::CyclicImport { .. }));
    }

    #[test]
    fn unknown_specifiers_use_the_fallback_loader() {
        struct StubLoader;
        impl FallbackRequire for StubLoader {
            fn require(&self, _origin: &str, specifier: &str) -> Option<ExecutionScope> {
                (specifier == "antd").then(|| {
                    ExecutionScope::from([(
                        "Button".to_string(),
                        ScopeValue::Value(serde_json::json!("antd-button")),
                    )])
                })
            }
        }

        let mut contents = ProjectContents::new();
        contents.insert(
            "/src/app.js",
            parsed_file(
                vec![],
                Imports::from([(
                    "antd".to_string(),
                    import_details(None, vec![import_alias("Button")], None),
                )]),
                &[],
                None,
            ),
        );
        let mut builder = ScopeBuilder::new(&contents, &StubLoader);
        let module_scope = builder.build_execution_scope("/src/app.js").unwrap();
        assert_eq!(
            module_scope.scope.get("Button"),
            Some(&ScopeValue::Value(serde_json::json!("antd-button")))
        );
    }

    #[test]
    fn css_imports_are_normalized_sorted_and_deduped() {
        let imports = Imports::from([
            (
                "./theme.css".to_string(),
                import_details(None, vec![], None),
            ),
            (
                "../shared/base.css".to_string(),
                import_details(None, vec![], None),
            ),
            ("./card".to_string(), import_details(None, vec![], None)),
        ]);
        assert_eq!(
            normalized_css_imports("/src/nested/app.js", &imports),
            vec![
                "/src/nested/theme.css".to_string(),
                "/src/shared/base.css".to_string(),
            ]
        );
    }

    #[test]
    fn sync_css_imports_reaches_the_stylesheet_host() {
        struct Recorder(Vec<String>);
        impl StylesheetHost for Recorder {
            fn unimport_all_but(&mut self, css_files: &[String]) {
                self.0 = css_files.to_vec();
            }
        }
        let imports = Imports::from([(
            "./theme.css".to_string(),
            import_details(None, vec![], None),
        )]);
        let mut recorder = Recorder(Vec::new());
        sync_css_imports(&mut recorder, "/src/app.js", &imports);
        assert_eq!(recorder.0, vec!["/src/theme.css".to_string()]);
    }
}
