// SPDX-License-Identifier: MIT

//! `aeon`: orchestrator entry point.
//!
//! The entry manifest's own flags (`--file:<path>`, `--config:<path>`,
//! `--root:<path>`, `--repo:<path>`, `-n`/`-c`/`-w`) are parsed by hand
//! against `std::env::args()` before `clap` ever sees them — clap's
//! static derive can't express a caller-declared, dynamically-shaped
//! flag schema. Everything after that hand-rolled pre-pass (the
//! subcommand and its own arguments) goes through `clap` normally.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod builtin;
mod cli;
mod exit_error;
mod flow;

use clap::Parser;
use cli::{Cli, Command, OutputFormat};
use exit_error::ExitError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use aeon_config::ConfigResolver;
use aeon_orchestrator::Orchestrator;
use aeon_store::FileStateStore;

/// Flags the entry point itself understands, parsed ahead of `clap`
///.
struct GlobalFlags {
    files: Vec<PathBuf>,
    configs: Vec<PathBuf>,
    root: Option<PathBuf>,
    repo: PathBuf,
    noninteractive: bool,
    cli_enable: bool,
    web_enable: bool,
    rest: Vec<String>,
}

/// Hand-rolled pre-pass over `argv[1..]`: peels off the entry point's own
/// flags (colon- or equals-separated, repeatable where noted) and leaves
/// everything else for `clap`.
fn parse_global_flags(args: impl Iterator<Item = String>) -> Result<GlobalFlags, ExitError> {
    let mut files = Vec::new();
    let mut configs = Vec::new();
    let mut root = None;
    let mut repo = PathBuf::from("tmp/repo");
    let mut noninteractive = false;
    let mut cli_enable = false;
    let mut web_enable = false;
    let mut rest = Vec::new();

    for arg in args {
        if let Some(value) = strip_dynamic_flag(&arg, "--file") {
            files.push(PathBuf::from(value));
        } else if let Some(value) = strip_dynamic_flag(&arg, "--config") {
            configs.push(PathBuf::from(value));
        } else if let Some(value) = strip_dynamic_flag(&arg, "--root") {
            root = Some(PathBuf::from(value));
        } else if let Some(value) = strip_dynamic_flag(&arg, "--repo") {
            repo = PathBuf::from(value);
        } else if arg == "-n" || arg == "--noninteractive" {
            noninteractive = true;
        } else if arg == "-c" || arg == "--cli-enable" {
            cli_enable = true;
        } else if arg == "-w" || arg == "--web-enable" {
            web_enable = true;
        } else {
            rest.push(arg);
        }
    }

    Ok(GlobalFlags { files, configs, root, repo, noninteractive, cli_enable, web_enable, rest })
}

/// `--flag:value` or `--flag=value`, matching either separator the spec
/// allows for the entry point's own dynamic flags.
fn strip_dynamic_flag<'a>(arg: &'a str, flag: &str) -> Option<&'a str> {
    arg.strip_prefix(flag)
        .and_then(|rest| rest.strip_prefix(':').or_else(|| rest.strip_prefix('=')))
}

fn resolve_root(flags: &GlobalFlags) -> Result<PathBuf, ExitError> {
    if let Ok(basedir) = std::env::var("AEON_BASEDIR") {
        return Ok(PathBuf::from(basedir));
    }
    if let Some(root) = &flags.root {
        return Ok(root.clone());
    }
    std::env::current_dir().map_err(|e| ExitError::runtime(format!("cannot determine current directory: {e}")))
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let argv: Vec<String> = std::env::args().collect();
    let program = argv.first().cloned().unwrap_or_else(|| "aeon".to_string());

    let result = run(argv.into_iter().skip(1)).await;
    if let Err(err) = result {
        eprintln!("{program}: {err}");
        std::process::exit(err.code);
    }
}

async fn run(args: impl Iterator<Item = String>) -> Result<(), ExitError> {
    let flags = parse_global_flags(args)?;
    let root = resolve_root(&flags)?;
    let repo_root = root.join(&flags.repo);

    let mut cli_args = vec!["aeon".to_string()];
    cli_args.extend(flags.rest.iter().cloned());
    let cli = Cli::try_parse_from(cli_args).map_err(|e| ExitError::usage(e.to_string()))?;

    tracing::info!(
        root = %root.display(),
        repo = %repo_root.display(),
        noninteractive = flags.noninteractive,
        cli_enable = flags.cli_enable,
        web_enable = flags.web_enable,
        "starting aeon"
    );

    let orchestrator = build_orchestrator(&root, &flags)?;
    discover_repo(&orchestrator, &repo_root)?;

    if flags.files.is_empty() {
        if !matches!(cli.command, Command::Discover) && orchestrator.manifests().is_empty() {
            // Every subcommand but `discover` needs at least one registered
            // unit; `--file` (an instruction document) or `--repo` scanning
            // is the usual way to seed that.
            tracing::warn!("no units discovered under --repo and no --file instruction document supplied; operating on an empty registry");
        }
        return dispatch(&orchestrator, cli.command, cli.format).await;
    }

    run_instruction_documents(&orchestrator, &flags, &root, &cli).await
}

/// Recursively register every `"aeon.unit"` manifest found under
/// `repo_root`. Not finding the directory at all is not an error — a run
/// driven purely by an instruction document's `refs`/`expected_files`
/// may have no repo tree to scan.
fn discover_repo(orchestrator: &Orchestrator, repo_root: &Path) -> Result<(), ExitError> {
    if !repo_root.exists() {
        return Ok(());
    }
    for manifest in orchestrator.discover(&[repo_root])? {
        let flavor = manifest.flavor;
        let body = builtin::generic_body(flavor);
        orchestrator.register(manifest, body, aeon_core::HookSet::new())?;
    }
    Ok(())
}

/// Load each `--file` instruction document and run it: `discover` just
/// enumerates `tasks[]`, every other subcommand runs the flow the
/// `-n`/`--noninteractive` flag selects and writes its result document.
async fn run_instruction_documents(
    orchestrator: &Orchestrator,
    flags: &GlobalFlags,
    root: &Path,
    cli: &Cli,
) -> Result<(), ExitError> {
    for file in &flags.files {
        if !file.exists() {
            return Err(ExitError::validation(format!("instruction document not found: {}", file.display())));
        }
        let text = std::fs::read_to_string(file)
            .map_err(|e| ExitError::validation(format!("cannot read {}: {e}", file.display())))?;
        let doc = aeon_manifest::parse_instruction_document(&text, &file.display().to_string())
            .map_err(|e| ExitError::validation(e.to_string()))?;

        if matches!(cli.command, Command::Discover) {
            print_value(&doc.tasks.iter().map(|id| id.as_str().to_string()).collect::<Vec<_>>(), cli.format);
            continue;
        }

        let result = flow::run_instruction_document(
            orchestrator,
            &doc,
            root,
            file,
            flags.noninteractive,
            flags.cli_enable,
            flags.web_enable,
        )
        .await?;
        let written = flow::write_result(root, &doc.outputs, &result)?;
        if doc.outputs.stdout_summary {
            flow::print_summary(&result, &written);
        }
        if result.any_failed() {
            return Err(ExitError::runtime(format!("process {:?} failed", doc.process_name)));
        }
    }
    Ok(())
}

fn build_orchestrator(root: &std::path::Path, flags: &GlobalFlags) -> Result<Orchestrator, ExitError> {
    let state_path = root.join("runtime").join("states").join("state.json");
    let store = Arc::new(
        FileStateStore::open(state_path).map_err(|e| ExitError::runtime(format!("cannot open state store: {e}")))?,
    );
    let config = Arc::new(ConfigResolver::new());
    for path in &flags.configs {
        config
            .load_system_config_file(path)
            .map_err(|e| ExitError::validation(format!("cannot load config overlay {}: {e}", path.display())))?;
    }
    Ok(Orchestrator::new(store, config))
}

async fn dispatch(orchestrator: &Orchestrator, command: Command, format: OutputFormat) -> Result<(), ExitError> {
    match command {
        Command::Discover => {
            print_value(&orchestrator.manifests().iter().map(|m| m.id.as_str().to_string()).collect::<Vec<_>>(), format);
            Ok(())
        }
        Command::Load => {
            let report = orchestrator.load(None).await?;
            print_report(&report, format)
        }
        Command::Start => {
            orchestrator.load(None).await?;
            let report = orchestrator.start(None).await?;
            print_report(&report, format)
        }
        Command::Stop { timeout_secs } => {
            let report = orchestrator.stop(None, Duration::from_secs(timeout_secs)).await?;
            print_report(&report, format)
        }
        Command::Unload => {
            let report = orchestrator.unload(None).await?;
            print_report(&report, format)
        }
        Command::Reload { id, timeout_secs } => {
            let id = aeon_core::UnitId::parse(id).map_err(|e| ExitError::validation(e.to_string()))?;
            orchestrator.reload(&id, Duration::from_secs(timeout_secs)).await?;
            Ok(())
        }
        Command::Status => {
            let status = orchestrator.status().await;
            print_value(&status, format);
            Ok(())
        }
        Command::Shutdown { timeout_secs } => {
            let report = orchestrator.shutdown(Duration::from_secs(timeout_secs)).await?;
            print_report(&report, format)
        }
        Command::Run { shutdown_timeout_secs } => run_until_signal(orchestrator, shutdown_timeout_secs, format).await,
    }
}

/// `discover -> load -> start -> wait for SIGINT/SIGTERM -> shutdown`
///.
async fn run_until_signal(
    orchestrator: &Orchestrator,
    shutdown_timeout_secs: u64,
    format: OutputFormat,
) -> Result<(), ExitError> {
    let load_report = orchestrator.load(None).await?;
    if orchestrator.run_failed(&load_report) {
        return Err(ExitError::runtime("a required unit failed to load"));
    }
    let start_report = orchestrator.start(None).await?;
    if orchestrator.run_failed(&start_report) {
        return Err(ExitError::runtime("a required unit failed to start"));
    }

    tracing::info!("all units started; waiting for SIGINT/SIGTERM");
    let sigint_caught = wait_for_shutdown_signal().await;

    let report = orchestrator.shutdown(Duration::from_secs(shutdown_timeout_secs)).await?;
    print_report(&report, format)?;

    if sigint_caught {
        return Err(ExitError::sigint());
    }
    Ok(())
}

/// Waits for either Ctrl+C or SIGTERM. Returns `true` for Ctrl+C (SIGINT),
/// whose exit code differs from a plain SIGTERM shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> bool {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler, falling back to SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return true;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => true,
        _ = terminate.recv() => false,
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> bool {
    let _ = tokio::signal::ctrl_c().await;
    true
}

fn print_report(report: &aeon_orchestrator::OperationReport, format: OutputFormat) -> Result<(), ExitError> {
    print_value(report, format);
    Ok(())
}

fn print_value(value: &impl serde::Serialize, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialize output: {e}"),
        },
        OutputFormat::Text => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{json}");
            }
        }
    }
}
