//! The §6 configuration document schema.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One configuration document: a single language to initialise plus any
/// number of dependency documents that must be applied first (spec §6
/// "Dependencies load first; a cycle is rejected with `CyclicConfiguration`").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoadConfiguration {
    /// The loader tag this document configures (e.g. `"py"`, `"node"`).
    pub language_id: String,

    /// Primary script path to load.
    pub path: Option<PathBuf>,

    /// Additional module search paths to register before loading.
    pub execution_paths: Vec<PathBuf>,

    /// Extra scripts to load alongside `path`, same tag.
    pub scripts: Vec<PathBuf>,

    /// Documents that must be fully applied before this one.
    pub dependencies: Vec<LoadConfiguration>,
}

impl LoadConfiguration {
    /// Parses a single configuration document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
