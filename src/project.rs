//! Project contents and module path handling.
//!
//! The project-content collaborator hands this crate a tree of files keyed by
//! project-relative path. Module paths are those keys with the source
//! extension stripped; `resolve` turns an import specifier into the stored
//! file path by probing the extensions the parser understands.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

use crate::element::TopLevelElement;

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORT / EXPORT METADATA
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportAlias {
    pub name: String,
    pub alias: String,
}

pub fn import_alias(name: &str) -> ImportAlias {
    ImportAlias {
        name: name.to_string(),
        alias: name.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDetails {
    /// Default import binding, if any.
    pub imported_with_name: Option<String>,
    /// Named imports, possibly aliased.
    #[serde(default)]
    pub imported_from_within: Vec<ImportAlias>,
    /// Star import binding, if any.
    pub imported_as: Option<String>,
}

pub fn import_details(
    imported_with_name: Option<&str>,
    imported_from_within: Vec<ImportAlias>,
    imported_as: Option<&str>,
) -> ImportDetails {
    ImportDetails {
        imported_with_name: imported_with_name.map(str::to_string),
        imported_from_within,
        imported_as: imported_as.map(str::to_string),
    }
}

/// Import source → how its bindings enter the importer's scope.
pub type Imports = BTreeMap<String, ImportDetails>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportsDetail {
    #[serde(default)]
    pub named_exports: BTreeSet<String>,
    pub default_export: Option<String>,
}

impl ExportsDetail {
    pub fn exports_name(&self, name: &str) -> bool {
        self.named_exports.contains(name) || self.default_export.as_deref() == Some(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT FILES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedModule {
    pub top_level_elements: Vec<TopLevelElement>,
    #[serde(default)]
    pub imports: Imports,
    #[serde(default)]
    pub exports: ExportsDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProjectFile {
    #[serde(rename = "TEXT_FILE", rename_all = "camelCase")]
    Text {
        code: String,
        /// Present only when the parsing collaborator succeeded on this file.
        parsed: Option<ParsedModule>,
    },
    #[serde(rename = "ASSET_FILE")]
    Asset,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("specifier `{0}` is not project-local")]
    NotProjectLocal(String),
    #[error("no project file matches `{0}`")]
    NotFound(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectContents {
    files: BTreeMap<String, ProjectFile>,
}

impl ProjectContents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, file: ProjectFile) {
        self.files.insert(path.to_string(), file);
    }

    pub fn file(&self, path: &str) -> Option<&ProjectFile> {
        self.files.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn parsed_module(&self, path: &str) -> Option<&ParsedModule> {
        match self.files.get(path)? {
            ProjectFile::Text { parsed, .. } => parsed.as_ref(),
            ProjectFile::Asset => None,
        }
    }

    /// Resolve an import specifier relative to the importing file, probing
    /// the source extensions and index files. Bare specifiers (packages) are
    /// not project-local and fall to the host loader.
    pub fn resolve(&self, import_origin: &str, specifier: &str) -> Result<String, ResolveError> {
        let base = if specifier.starts_with('/') {
            normalize_segments(specifier)
        } else if specifier.starts_with("./") || specifier.starts_with("../") {
            let origin_dir = dirname(import_origin);
            normalize_segments(&format!("{}/{}", origin_dir, specifier))
        } else {
            return Err(ResolveError::NotProjectLocal(specifier.to_string()));
        };

        let mut candidates = vec![base.clone()];
        for ext in SOURCE_EXTENSIONS {
            candidates.push(format!("{}.{}", base, ext));
        }
        for ext in SOURCE_EXTENSIONS {
            candidates.push(format!("{}/index.{}", base, ext));
        }

        candidates
            .into_iter()
            .find(|candidate| self.files.contains_key(candidate))
            .ok_or(ResolveError::NotFound(base))
    }
}

const SOURCE_EXTENSIONS: [&str; 5] = ["js", "jsx", "ts", "tsx", "css"];

lazy_static! {
    static ref SOURCE_EXTENSION_RE: Regex = Regex::new(r"\.(js|jsx|ts|tsx|css)$").unwrap();
}

/// Logical module path: stored path with the source extension stripped.
pub fn strip_source_extension(path: &str) -> String {
    SOURCE_EXTENSION_RE.replace(path, "").into_owned()
}

/// Normalized project-relative name for an import source, used as the key
/// for CSS side effects and registry module paths.
pub fn normalize_name(import_origin: &str, import_source: &str) -> String {
    if import_source.starts_with("./") || import_source.starts_with("../") {
        normalize_segments(&format!("{}/{}", dirname(import_origin), import_source))
    } else {
        normalize_segments(import_source)
    }
}

fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(index) => path[..index].to_string(),
        None => String::new(),
    }
}

fn normalize_segments(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTORY LOADER
// ═══════════════════════════════════════════════════════════════════════════════

/// Load a project directory into a contents tree. Text files keep their code
/// with `parsed: None` until the parsing collaborator fills them in; anything
/// unreadable is recorded as an asset. Per-file failures never abort the scan.
pub fn load_project_contents(base_dir: &Path) -> ProjectContents {
    let mut contents = ProjectContents::new();
    for entry in WalkDir::new(base_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        let relative = match entry.path().strip_prefix(base_dir) {
            Ok(relative) => format!("/{}", relative.to_string_lossy().replace('\\', "/")),
            Err(_) => continue,
        };
        let is_source = SOURCE_EXTENSION_RE.is_match(&relative);
        if is_source {
            match fs::read_to_string(entry.path()) {
                Ok(code) => contents.insert(&relative, ProjectFile::Text { code, parsed: None }),
                Err(error) => {
                    tracing::warn!(path = %relative, %error, "failed to read project file");
                    contents.insert(&relative, ProjectFile::Asset);
                }
            }
        } else {
            contents.insert(&relative, ProjectFile::Asset);
        }
    }
    contents
}
