use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A reference to a file the run produced, recorded in the manifest
/// so a reader can locate every by-product without walking the
/// workspace directory by hand. Append-only: the in-memory manifest
/// mirrors `manifest.json` and is rewritten whole after every append.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Artifact {
    Screenshot {
        iteration: u32,
        path: PathBuf,
        size_bytes: u64,
        #[serde(default)]
        metadata: serde_json::Value,
    },
    Evaluation {
        iteration: u32,
        path: PathBuf,
        score: u32,
        passed: bool,
    },
    Log {
        name: String,
        path: PathBuf,
        log_kind: String,
    },
    File {
        name: String,
        path: PathBuf,
        file_kind: String,
        #[serde(default)]
        metadata: serde_json::Value,
    },
    Report {
        name: String,
        path: PathBuf,
    },
}

impl Artifact {
    pub fn path(&self) -> &PathBuf {
        match self {
            Artifact::Screenshot { path, .. }
            | Artifact::Evaluation { path, .. }
            | Artifact::Log { path, .. }
            | Artifact::File { path, .. }
            | Artifact::Report { path, .. } => path,
        }
    }
}
