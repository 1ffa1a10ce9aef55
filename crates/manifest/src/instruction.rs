// SPDX-License-Identifier: MIT

//! The process instruction document: the top-level JSON an entry point's
//! `--file:<path>` loads (schema `"aeon.instructions"`, version `"1.0"`).
//!
//! Distinct from [`crate::document::ManifestDocument`] (schema
//! `"aeon.unit"`), which describes one unit. An instruction document
//! names the `tasks[]` a process manages, a default `entry_point{task,
//! method}`, optional `flows.{interactive,noninteractive}` step lists
//! that pick which of those tasks run and in what order, demand-loaded
//! `refs.configs`, and `expected_files[]` policy checks — all resolved
//! relative to the installation root via [`crate::resolve_under_root`].

use crate::error::ManifestError;
use aeon_core::UnitId;
use std::collections::{HashMap, HashSet};

const SCHEMA_TAG: &str = "aeon.instructions";
const SUPPORTED_VERSION: &str = "1.0";

const KNOWN_METHODS: &[&str] = &["load", "start", "stop", "unload", "resolve"];

#[derive(Debug, Clone, serde::Deserialize)]
struct RawDocument {
    schema: String,
    version: String,
    process_name: String,
    #[serde(default)]
    description: Option<String>,
    tasks: Vec<String>,
    entry_point: RawEntryPoint,
    #[serde(default)]
    flows: RawFlows,
    #[serde(default)]
    refs: RawRefs,
    #[serde(default)]
    expected_files: Vec<ExpectedFile>,
    #[serde(default)]
    outputs: Outputs,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct RawEntryPoint {
    task: String,
    method: String,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct RawFlows {
    #[serde(default)]
    interactive: Option<Vec<RawStep>>,
    #[serde(default)]
    noninteractive: Option<Vec<RawStep>>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct RawStep {
    id: String,
    task: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    args: HashMap<String, serde_json::Value>,
}

fn default_method() -> String {
    "resolve".to_string()
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct RawRefs {
    #[serde(default)]
    configs: HashMap<String, String>,
}

/// A file an instruction document expects to find relative to the
/// installation root, and how strictly its presence is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilePolicy {
    RequiredNow,
    RequiredEventually,
    Optional,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ExpectedFile {
    pub path: String,
    pub policy: FilePolicy,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Outputs {
    #[serde(default = "default_result_path")]
    pub result: String,
    #[serde(default = "default_true")]
    pub stdout_summary: bool,
}

impl Default for Outputs {
    fn default() -> Self {
        Self { result: default_result_path(), stdout_summary: true }
    }
}

fn default_result_path() -> String {
    "runtime/last_result.json".to_string()
}

fn default_true() -> bool {
    true
}

/// One step of a flow: drive `task` through a lifecycle `method`
/// (`load`/`start`/`stop`/`unload`/`resolve`), with `args` applied as
/// runtime config overrides beforehand.
#[derive(Debug, Clone)]
pub struct Step {
    pub id: String,
    pub task: UnitId,
    pub method: String,
    pub args: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct EntryPoint {
    pub task: UnitId,
    pub method: String,
}

#[derive(Debug, Clone, Default)]
pub struct Flows {
    pub interactive: Option<Vec<Step>>,
    pub noninteractive: Option<Vec<Step>>,
}

/// A validated `"aeon.instructions"` document.
#[derive(Debug, Clone)]
pub struct InstructionDocument {
    pub process_name: String,
    pub description: Option<String>,
    pub tasks: Vec<UnitId>,
    pub entry_point: EntryPoint,
    pub flows: Flows,
    /// `refs.configs`, `id -> path`; paths are relative to the
    /// installation root and resolved by the caller.
    pub refs_configs: HashMap<String, String>,
    pub expected_files: Vec<ExpectedFile>,
    pub outputs: Outputs,
}

impl InstructionDocument {
    /// The steps to run for the selected mode: the declared flow if one
    /// exists for it, otherwise a single synthetic step built from
    /// `entry_point` (the shape the pre-flow instruction documents in
    /// this lineage used on their own).
    pub fn steps_for(&self, noninteractive: bool) -> Vec<Step> {
        let flow = if noninteractive { &self.flows.noninteractive } else { &self.flows.interactive };
        match flow {
            Some(steps) => steps.clone(),
            None => vec![Step {
                id: "entry_point".to_string(),
                task: self.entry_point.task.clone(),
                method: self.entry_point.method.clone(),
                args: HashMap::new(),
            }],
        }
    }
}

/// Parse an instruction document's JSON text, identified by `path` for
/// error reporting.
pub fn parse_instruction_document(text: &str, path: &str) -> Result<InstructionDocument, ManifestError> {
    let doc: RawDocument =
        serde_json::from_str(text).map_err(|source| ManifestError::Parse { path: path.to_string(), source })?;
    to_instruction_document(doc, path)
}

fn to_instruction_document(doc: RawDocument, path: &str) -> Result<InstructionDocument, ManifestError> {
    if doc.schema != SCHEMA_TAG {
        return Err(ManifestError::UnknownSchema {
            path: path.to_string(),
            schema: doc.schema,
            expected: SCHEMA_TAG.to_string(),
        });
    }
    if doc.version != SUPPORTED_VERSION {
        return Err(ManifestError::UnsupportedVersion { path: path.to_string(), version: doc.version });
    }

    let tasks = parse_ids(doc.tasks, path)?;
    let known: HashSet<&UnitId> = tasks.iter().collect();

    let entry_point = parse_entry_point(doc.entry_point, &known, path)?;

    let interactive = doc.flows.interactive.map(|steps| parse_steps(steps, &known, "interactive", path)).transpose()?;
    let noninteractive =
        doc.flows.noninteractive.map(|steps| parse_steps(steps, &known, "noninteractive", path)).transpose()?;

    Ok(InstructionDocument {
        process_name: doc.process_name,
        description: doc.description,
        tasks,
        entry_point,
        flows: Flows { interactive, noninteractive },
        refs_configs: doc.refs.configs,
        expected_files: doc.expected_files,
        outputs: doc.outputs,
    })
}

fn parse_entry_point(raw: RawEntryPoint, known: &HashSet<&UnitId>, path: &str) -> Result<EntryPoint, ManifestError> {
    let task =
        UnitId::parse(raw.task).map_err(|source| ManifestError::InvalidUnit { path: path.to_string(), source })?;
    if !known.contains(&task) {
        return Err(ManifestError::UnknownTask { path: path.to_string(), task: task.as_str().to_string() });
    }
    validate_method(&raw.method, path)?;
    Ok(EntryPoint { task, method: raw.method })
}

fn parse_steps(
    raw: Vec<RawStep>,
    known: &HashSet<&UnitId>,
    flow: &str,
    path: &str,
) -> Result<Vec<Step>, ManifestError> {
    let mut seen = HashSet::new();
    let mut steps = Vec::with_capacity(raw.len());
    for step in raw {
        if !seen.insert(step.id.clone()) {
            return Err(ManifestError::DuplicateStepId { path: path.to_string(), flow: flow.to_string(), id: step.id });
        }
        let task =
            UnitId::parse(step.task).map_err(|source| ManifestError::InvalidUnit { path: path.to_string(), source })?;
        if !known.contains(&task) {
            return Err(ManifestError::UnknownTask { path: path.to_string(), task: task.as_str().to_string() });
        }
        validate_method(&step.method, path)?;
        steps.push(Step { id: step.id, task, method: step.method, args: step.args });
    }
    Ok(steps)
}

fn validate_method(method: &str, path: &str) -> Result<(), ManifestError> {
    if KNOWN_METHODS.contains(&method) {
        Ok(())
    } else {
        Err(ManifestError::UnsupportedMethod { path: path.to_string(), method: method.to_string() })
    }
}

fn parse_ids(raw: Vec<String>, path: &str) -> Result<Vec<UnitId>, ManifestError> {
    raw.into_iter()
        .map(|s| UnitId::parse(s).map_err(|source| ManifestError::InvalidUnit { path: path.to_string(), source }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(extra: &str) -> String {
        format!(
            r#"{{"schema":"aeon.instructions","version":"1.0","process_name":"boot",
                "tasks":["net/base"],
                "entry_point":{{"task":"net/base","method":"resolve"}}{}}}"#,
            extra
        )
    }

    #[test]
    fn minimal_document_falls_back_to_entry_point() {
        let doc = parse_instruction_document(&sample(""), "p.json").unwrap();
        assert_eq!(doc.process_name, "boot");
        assert_eq!(doc.outputs.result, "runtime/last_result.json");
        assert!(doc.outputs.stdout_summary);

        let steps = doc.steps_for(false);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].task.as_str(), "net/base");
        assert_eq!(steps[0].method, "resolve");
    }

    #[test]
    fn wrong_schema_is_rejected() {
        let text = r#"{"schema":"other","version":"1.0","process_name":"p","tasks":[],
            "entry_point":{"task":"a/b","method":"resolve"}}"#;
        let err = parse_instruction_document(text, "p.json").unwrap_err();
        assert!(matches!(err, ManifestError::UnknownSchema { .. }));
    }

    #[test]
    fn entry_point_task_must_be_listed() {
        let text = r#"{"schema":"aeon.instructions","version":"1.0","process_name":"p","tasks":["other/x"],
            "entry_point":{"task":"a/b","method":"resolve"}}"#;
        let err = parse_instruction_document(text, "p.json").unwrap_err();
        assert!(matches!(err, ManifestError::UnknownTask { .. }));
    }

    #[test]
    fn unsupported_method_is_rejected() {
        let text = r#"{"schema":"aeon.instructions","version":"1.0","process_name":"p","tasks":["a/b"],
            "entry_point":{"task":"a/b","method":"teleport"}}"#;
        let err = parse_instruction_document(text, "p.json").unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedMethod { .. }));
    }

    #[test]
    fn flow_steps_parse_and_select_by_mode() {
        let text = sample(
            r#","flows":{"interactive":[{"id":"s1","task":"net/base","method":"load"}],
                "noninteractive":[{"id":"s1","task":"net/base","method":"load"},
                                   {"id":"s2","task":"net/base","method":"start"}]}"#,
        );
        let doc = parse_instruction_document(&text, "p.json").unwrap();
        assert_eq!(doc.steps_for(false).len(), 1);
        assert_eq!(doc.steps_for(true).len(), 2);
    }

    #[test]
    fn duplicate_step_id_is_rejected() {
        let text = sample(
            r#","flows":{"interactive":[{"id":"s1","task":"net/base","method":"load"},
                                          {"id":"s1","task":"net/base","method":"start"}]}"#,
        );
        let err = parse_instruction_document(&text, "p.json").unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateStepId { .. }));
    }

    #[test]
    fn refs_and_expected_files_parse() {
        let text = sample(
            r#","refs":{"configs":{"base":"config/base.toml"}},
                "expected_files":[{"path":"license.txt","policy":"required_now"}],
                "outputs":{"result":"runtime/out.json","stdout_summary":false}"#,
        );
        let doc = parse_instruction_document(&text, "p.json").unwrap();
        assert_eq!(doc.refs_configs.get("base"), Some(&"config/base.toml".to_string()));
        assert_eq!(doc.expected_files.len(), 1);
        assert_eq!(doc.expected_files[0].policy, FilePolicy::RequiredNow);
        assert_eq!(doc.outputs.result, "runtime/out.json");
        assert!(!doc.outputs.stdout_summary);
    }
}
