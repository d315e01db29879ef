//! Control descriptor registry and reconciliation.
//!
//! Files evaluated on the canvas declare property controls for module paths
//! asynchronously. Declarations land in a ledger first; `validate_controls_to_check`
//! periodically reconciles the ledger against the last-known-good registry and
//! dispatches the minimal delta as a single action.
//!
//! Ledger invariants:
//!
//! 1. Declarations accumulate per evaluating file, in registration order.
//!    Two registrations for the same module path merge component-by-component
//!    at reconciliation time; the later registration wins on key collision.
//! 2. Reconciling an evaluated file consumes its pending declarations into
//!    that file's last-validated set; evaluating a file that declared nothing
//!    therefore deletes its previous declarations.
//! 3. The last-validated set survives unimport. Only registry entries are
//!    deleted when a file stops being imported; re-importing the file
//!    restores them from the ledger without re-evaluation.
//! 4. A resolved declaration is immutable; re-registration replaces it.

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;
use thiserror::Error;

use crate::descriptors::{ComponentDescriptorWithName, PropertyControlsInfo};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlsError {
    #[error("controls evaluation failed: {0}")]
    Evaluation(String),
}

pub type ControlsResult = Result<Vec<ComponentDescriptorWithName>, ControlsError>;

/// A deferred declaration of "controls this module claims to export".
/// Shared so reconciliation can await it again on later passes.
pub type ControlsToCheck = Shared<BoxFuture<'static, ControlsResult>>;

pub fn controls_to_check<F>(future: F) -> ControlsToCheck
where
    F: Future<Output = ControlsResult> + Send + 'static,
{
    future.boxed().shared()
}

pub fn resolved_controls(result: ControlsResult) -> ControlsToCheck {
    controls_to_check(std::future::ready(result))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    /// Delta update: the receiving reducer deletes the listed modules, then
    /// overwrites/adds the given ones. Never a full-registry replacement.
    UpdatePropertyControlsInfo {
        property_controls_info: PropertyControlsInfo,
        module_names_or_paths_to_delete: Vec<String>,
    },
}

/// Apply a dispatched delta to a registry, the way the receiving reducer does.
pub fn apply_property_controls_update(registry: &mut PropertyControlsInfo, action: &EditorAction) {
    match action {
        EditorAction::UpdatePropertyControlsInfo {
            property_controls_info,
            module_names_or_paths_to_delete,
        } => {
            for module in module_names_or_paths_to_delete {
                registry.remove(module);
            }
            for (module, components) in property_controls_info {
                registry.insert(module.clone(), components.clone());
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct LedgerState {
    /// Declarations registered since each file's evaluation started, in order.
    pending: BTreeMap<String, Vec<(String, ControlsToCheck)>>,
    /// Each file's declarations as of its last reconciled evaluation.
    validated: BTreeMap<String, Vec<(String, ControlsToCheck)>>,
}

/// Process-wide registered-controls store. All mutation goes through
/// `add_registered_controls` and `clear_all_registered_controls`; the registry
/// representation itself only changes via dispatched actions.
#[derive(Default)]
pub struct RegisteredControls {
    state: Mutex<LedgerState>,
}

impl RegisteredControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration from an evaluating file. Never blocks.
    pub fn add_registered_controls(
        &self,
        evaluator_id: &str,
        module_path: &str,
        controls: ControlsToCheck,
    ) {
        let mut state = self.state.lock().expect("registered-controls lock poisoned");
        state
            .pending
            .entry(evaluator_id.to_string())
            .or_default()
            .push((module_path.to_string(), controls));
    }

    /// Session-boundary reset.
    pub fn clear_all_registered_controls(&self) {
        let mut state = self.state.lock().expect("registered-controls lock poisoned");
        state.pending.clear();
        state.validated.clear();
    }

    /// Reconcile declarations against `current_registry` and dispatch at most
    /// one delta action. Per-module failures are isolated: a failed
    /// declaration contributes nothing this pass and reconciliation continues.
    pub async fn validate_controls_to_check(
        &self,
        dispatch: &mut dyn FnMut(Vec<EditorAction>),
        current_registry: &PropertyControlsInfo,
        imported_file_ids: &[&str],
        evaluated_file_ids: &[&str],
    ) {
        // Consume pending declarations for evaluated files, then collect the
        // contributions of every still-imported file. Non-evaluated files go
        // first so that this pass's evaluations win module-path collisions.
        let jobs: Vec<(String, String, ControlsToCheck)> = {
            let mut state = self.state.lock().expect("registered-controls lock poisoned");
            for file_id in evaluated_file_ids {
                let declared = state.pending.remove(*file_id).unwrap_or_default();
                state.validated.insert(file_id.to_string(), declared);
            }

            let mut ordered_files: Vec<String> = state
                .validated
                .keys()
                .filter(|file_id| {
                    imported_file_ids.contains(&file_id.as_str())
                        && !evaluated_file_ids.contains(&file_id.as_str())
                })
                .cloned()
                .collect();
            ordered_files.extend(
                evaluated_file_ids
                    .iter()
                    .filter(|file_id| imported_file_ids.contains(*file_id))
                    .map(|file_id| file_id.to_string()),
            );

            ordered_files
                .iter()
                .flat_map(|file_id| {
                    state
                        .validated
                        .get(file_id)
                        .into_iter()
                        .flatten()
                        .map(|(module_path, controls)| {
                            (file_id.clone(), module_path.clone(), controls.clone())
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        // Fan-out/fan-in: resolution order does not matter, result order
        // matches registration order for a deterministic merge.
        let results = join_all(jobs.iter().map(|(_, _, controls)| controls.clone())).await;

        let mut next: PropertyControlsInfo = BTreeMap::new();
        for ((file_id, module_path, _), result) in jobs.iter().zip(results) {
            match result {
                Ok(components) => {
                    let module_entry = next.entry(module_path.clone()).or_default();
                    for with_name in components {
                        module_entry.insert(with_name.component_name.clone(), with_name.descriptor);
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        file = %file_id,
                        module = %module_path,
                        %error,
                        "control declaration failed; module contributes nothing this pass"
                    );
                }
            }
        }

        let module_names_or_paths_to_delete: Vec<String> = current_registry
            .keys()
            .filter(|module_path| !next.contains_key(*module_path))
            .cloned()
            .collect();

        let property_controls_info: PropertyControlsInfo = next
            .into_iter()
            .filter(|(module_path, components)| {
                current_registry.get(module_path) != Some(components)
            })
            .collect();

        if module_names_or_paths_to_delete.is_empty() && property_controls_info.is_empty() {
            return;
        }

        dispatch(vec![EditorAction::UpdatePropertyControlsInfo {
            property_controls_info,
            module_names_or_paths_to_delete,
        }]);
    }
}
