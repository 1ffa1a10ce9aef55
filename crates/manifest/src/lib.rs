// SPDX-License-Identifier: MIT

//! Manifest document parsing and discovery (C1's on-disk half), plus the
//! process instruction document an entry point's `--file:<path>` loads.
//!
//! [`aeon_core::ManifestRegistry`] is the in-memory store; this crate
//! turns the JSON documents unit authors write on disk into the
//! validated [`aeon_core::Manifest`] values that registry holds, and
//! separately parses the `"aeon.instructions"` process document that
//! names which units take part in a run and how.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod discovery;
mod document;
mod error;
mod instruction;

pub use discovery::{discover_dir, load_file, resolve_under_root, DiscoveryResult};
pub use document::{parse_document, ManifestDocument};
pub use error::ManifestError;
pub use instruction::{
    parse_instruction_document, EntryPoint, ExpectedFile, FilePolicy, Flows, InstructionDocument, Outputs, Step,
};
