// SPDX-License-Identifier: MIT

//! Instruction-document-driven execution: select a flow
//! (`-n`/`--noninteractive` picks `flows.noninteractive`, otherwise
//! `flows.interactive`), run its steps against the Orchestrator, and
//! write the result document to `outputs.result`.
//!
//! Grounded in `AEONOrchestrator.run()`
//! (`examples/original_source/library/orchestrator/engines/python/orchestrator.json.v1.2.py`):
//! demand-load `refs.configs`, check `expected_files`, select a flow,
//! execute its steps stopping at the first failure, then write the
//! result document and print a stdout summary.

use crate::exit_error::ExitError;
use aeon_config::ConfigValue;
use aeon_core::UnitId;
use aeon_manifest::{ExpectedFile, FilePolicy, InstructionDocument, Outputs, Step};
use aeon_orchestrator::{Orchestrator, ResultDocument, ResultFlags, ResultMeta, StepResult, StepStatus, UnitOutcome};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timeout budget for a single `stop` step. Flow steps target one unit
/// at a time, so there's no wave fan-out to wait on.
const STEP_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Demand-load every `refs.configs` entry as a system-config overlay,
/// resolving its path against `root` and rejecting any traversal.
fn load_refs_configs(
    orchestrator: &Orchestrator,
    root: &Path,
    configs: &std::collections::HashMap<String, String>,
) -> Result<(), ExitError> {
    for (id, path) in configs {
        let resolved =
            aeon_manifest::resolve_under_root(root, path).map_err(|e| ExitError::validation(e.to_string()))?;
        orchestrator
            .config()
            .load_system_config_file(&resolved)
            .map_err(|e| ExitError::validation(format!("refs.configs {id:?} ({}): {e}", resolved.display())))?;
    }
    Ok(())
}

/// Check `expected_files[]` against `root`: `required_now` missing files
/// are fatal, `required_eventually` missing files become warnings,
/// `optional` files are never checked for presence.
fn check_expected_files(root: &Path, files: &[ExpectedFile], warnings: &mut Vec<String>) -> Result<(), ExitError> {
    for file in files {
        let resolved =
            aeon_manifest::resolve_under_root(root, &file.path).map_err(|e| ExitError::validation(e.to_string()))?;
        match file.policy {
            FilePolicy::RequiredNow if !resolved.exists() => {
                let err = aeon_manifest::ManifestError::RequiredFileMissing {
                    path: file.path.clone(),
                    file: resolved.display().to_string(),
                };
                return Err(ExitError::validation(err.to_string()));
            }
            FilePolicy::RequiredEventually if !resolved.exists() => {
                warnings.push(format!("required-eventually file missing: {}", resolved.display()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Drive one unit through the lifecycle method a step names. `resolve`
/// is an alias for `start`: the Orchestrator already dispatches to
/// `resolve()` internally for task-flavored units.
async fn run_step_method(
    orchestrator: &Orchestrator,
    task: &UnitId,
    method: &str,
) -> Result<aeon_orchestrator::OperationReport, ExitError> {
    let target = [task.clone()];
    let report = match method {
        "load" => orchestrator.load(Some(&target)).await,
        "start" | "resolve" => orchestrator.start(Some(&target)).await,
        "stop" => orchestrator.stop(Some(&target), STEP_STOP_TIMEOUT).await,
        "unload" => orchestrator.unload(Some(&target)).await,
        // Unreachable: `aeon-manifest` validates the method set at parse time.
        _ => return Ok(aeon_orchestrator::OperationReport::new()),
    };
    Ok(report?)
}

/// Apply a step's `args` as runtime config overrides on its target unit.
/// Values `aeon_config::ConfigValue` can't represent (objects, arrays,
/// null) are skipped with a warning rather than rejected outright.
fn apply_step_args(orchestrator: &Orchestrator, step: &Step, warnings: &mut Vec<String>) {
    for (key, value) in &step.args {
        match ConfigValue::from_json(value) {
            Some(config_value) => orchestrator.config().set_runtime_override(step.task.clone(), key.clone(), config_value),
            None => warnings.push(format!("step {:?}: unsupported config value for {key:?}, skipped", step.id)),
        }
    }
}

/// Run the instruction document's selected flow and produce its result
/// document. Stops at the first failed step, matching the grounded
/// original's stop-on-failure policy, but — unlike it — still returns a
/// result document recording every step run so far, since the result
/// contract's `status: failed` variant exists precisely to report this.
pub async fn run_instruction_document(
    orchestrator: &Orchestrator,
    doc: &InstructionDocument,
    root: &Path,
    entry_path: &Path,
    noninteractive: bool,
    cli_enable: bool,
    web_enable: bool,
) -> Result<ResultDocument, ExitError> {
    let mut warnings = Vec::new();

    load_refs_configs(orchestrator, root, &doc.refs_configs)?;
    check_expected_files(root, &doc.expected_files, &mut warnings)?;

    let steps = doc.steps_for(noninteractive);
    let registered: HashSet<UnitId> = orchestrator.manifests().into_iter().map(|m| m.id).collect();

    let mut step_results = Vec::with_capacity(steps.len());
    for step in &steps {
        let action = format!("{}#{}", step.task, step.method);

        if !registered.contains(&step.task) {
            step_results.push(StepResult {
                id: step.id.clone(),
                action,
                status: StepStatus::Failed,
                result: None,
                error: Some(format!("unit {} is not registered", step.task)),
            });
            break;
        }

        apply_step_args(orchestrator, step, &mut warnings);

        let report = run_step_method(orchestrator, &step.task, &step.method).await?;
        let step_result = match report.get(&step.task) {
            Some(UnitOutcome::Ok { state }) => StepResult {
                id: step.id.clone(),
                action,
                status: StepStatus::Success,
                result: Some(serde_json::json!({ "state": state })),
                error: None,
            },
            Some(UnitOutcome::Error { message }) => {
                StepResult { id: step.id.clone(), action, status: StepStatus::Failed, result: None, error: Some(message.clone()) }
            }
            None => StepResult {
                id: step.id.clone(),
                action,
                status: StepStatus::Failed,
                result: None,
                error: Some("no outcome reported for this unit".to_string()),
            },
        };

        let failed = step_result.status == StepStatus::Failed;
        step_results.push(step_result);
        if failed {
            break;
        }
    }

    Ok(ResultDocument {
        meta: ResultMeta {
            timestamp: chrono::Utc::now().to_rfc3339(),
            root: root.display().to_string(),
            mode: if noninteractive { "noninteractive" } else { "interactive" }.to_string(),
            flags: ResultFlags { cli_enabled: cli_enable, web_enabled: web_enable },
            entry_path: entry_path.display().to_string(),
        },
        warnings,
        steps: step_results,
    })
}

/// Write the result document to `outputs.result`, resolved against
/// `root` and rejecting any traversal. Returns the resolved path.
pub fn write_result(root: &Path, outputs: &Outputs, result: &ResultDocument) -> Result<PathBuf, ExitError> {
    let resolved =
        aeon_manifest::resolve_under_root(root, &outputs.result).map_err(|e| ExitError::validation(e.to_string()))?;
    if let Some(parent) = resolved.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ExitError::runtime(format!("cannot create result directory {}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| ExitError::runtime(format!("cannot serialize result document: {e}")))?;
    std::fs::write(&resolved, json)
        .map_err(|e| ExitError::runtime(format!("cannot write result document {}: {e}", resolved.display())))?;
    Ok(resolved)
}

/// Print the stdout summary `outputs.stdout_summary` gates.
pub fn print_summary(result: &ResultDocument, written: &Path) {
    println!("{}", "=".repeat(60));
    println!("aeon orchestrator — execution summary");
    println!("{}", "=".repeat(60));
    for step in &result.steps {
        let icon = if step.status == StepStatus::Success { "\u{2713}" } else { "\u{2717}" };
        let label = if step.status == StepStatus::Success { "SUCCESS" } else { "FAILED" };
        println!("{icon} {}: {} - {label}", step.id, step.action);
    }
    println!("{}", "=".repeat(60));
    println!("result written to: {}", written.display());
}
