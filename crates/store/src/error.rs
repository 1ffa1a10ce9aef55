// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read state document at {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },

    #[error("failed to write state document at {path}: {source}")]
    Write { path: String, #[source] source: std::io::Error },

    #[error("failed to parse state document at {path}: {source}")]
    Parse { path: String, #[source] source: serde_json::Error },

    #[error("failed to serialize state document: {0}")]
    Serialize(#[from] serde_json::Error),
}
