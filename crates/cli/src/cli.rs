// SPDX-License-Identifier: MIT

//! Subcommand surface, parsed by `clap` derive once the hand-rolled
//! pre-pass (see `main.rs::parse_global_flags`) has stripped the
//! entry-point flags `clap`'s static schema can't express.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "aeon", about = "Manifest-driven orchestration kernel", version)]
pub struct Cli {
    /// Output format for status/report commands.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Discover manifests under the entry file(s)/directories and print them.
    Discover,
    /// Register discovered units, resolve the dependency plan, and run
    /// discover -> load -> start -> wait for SIGINT/SIGTERM -> shutdown.
    Run {
        /// Total shutdown timeout budget in seconds (60/40 stop/unload split).
        #[arg(long, default_value_t = 60)]
        shutdown_timeout_secs: u64,
    },
    /// Run discover -> load only, then print the per-unit report.
    Load,
    /// Run discover -> load -> start, then print the per-unit report.
    Start,
    /// Stop every loaded unit (reverse load order).
    Stop {
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Unload every unit (reverse load order).
    Unload,
    /// Stop -> unload -> load -> start a single unit.
    Reload {
        /// Unit id, `group/name`.
        id: String,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Print `{running, modules, health}`.
    Status,
    /// Stop then unload every unit, bounded by a total timeout.
    Shutdown {
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}
