//! Resolves a configuration document's dependency tree into an ordered,
//! dependency-first load plan (spec §6 "Dependencies load first; a cycle is
//! rejected with `CyclicConfiguration`").

use super::error::{ConfigError, ConfigResult};
use super::schema::LoadConfiguration;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads configuration documents from disk and flattens their `dependencies`
/// trees into a single ordered plan.
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
        }
    }

    /// Adds a directory searched for a bare configuration filename.
    pub fn add_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Loads a configuration file and resolves it into an ordered plan:
    /// every dependency document fully precedes the document that named it.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> ConfigResult<Vec<LoadConfiguration>> {
        let resolved = self.resolve_path(path.as_ref())?;
        debug!(path = %resolved.display(), "loading configuration");
        let text = std::fs::read_to_string(&resolved)?;
        let config = LoadConfiguration::from_json(&text)?;
        self.flatten(config)
    }

    /// Resolves a parsed document's dependency tree into an ordered plan.
    pub fn flatten(&self, config: LoadConfiguration) -> ConfigResult<Vec<LoadConfiguration>> {
        let mut order = Vec::new();
        let mut in_progress = Vec::new();
        flatten_into(config, &mut in_progress, &mut order)?;
        Ok(order)
    }

    fn resolve_path(&self, path: &Path) -> ConfigResult<PathBuf> {
        if path.is_absolute() {
            return if path.exists() {
                Ok(path.to_path_buf())
            } else {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            };
        }
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        for search_path in &self.search_paths {
            let candidate = search_path.join(path);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(ConfigError::FileNotFound(path.to_path_buf()))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn identity(config: &LoadConfiguration) -> String {
    match &config.path {
        Some(path) => format!("{}:{}", config.language_id, path.display()),
        None => config.language_id.clone(),
    }
}

/// Post-order flattening: every entry in `dependencies` is resolved (and
/// appended to `order`) before the document that named it, detecting cycles
/// via the `in_progress` stack of identities currently being resolved.
fn flatten_into(
    config: LoadConfiguration,
    in_progress: &mut Vec<String>,
    order: &mut Vec<LoadConfiguration>,
) -> ConfigResult<()> {
    let id = identity(&config);
    if in_progress.contains(&id) {
        return Err(ConfigError::CyclicConfiguration(id));
    }
    in_progress.push(id.clone());

    let LoadConfiguration {
        language_id,
        path,
        execution_paths,
        scripts,
        dependencies,
    } = config;

    for dependency in dependencies {
        flatten_into(dependency, in_progress, order)?;
    }

    order.push(LoadConfiguration {
        language_id,
        path,
        execution_paths,
        scripts,
        dependencies: Vec::new(),
    });

    in_progress.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(language_id: &str, deps: Vec<LoadConfiguration>) -> LoadConfiguration {
        LoadConfiguration {
            language_id: language_id.to_string(),
            path: None,
            execution_paths: Vec::new(),
            scripts: Vec::new(),
            dependencies: deps,
        }
    }

    #[test]
    fn dependencies_precede_the_document_that_named_them() {
        let loader = ConfigLoader::new();
        let config = doc("node", vec![doc("py", vec![])]);
        let order = loader.flatten(config).unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].language_id, "py");
        assert_eq!(order[1].language_id, "node");
    }

    #[test]
    fn self_referential_dependency_is_rejected() {
        let loader = ConfigLoader::new();
        let mut config = doc("py", vec![]);
        config.dependencies.push(doc("py", vec![]));
        // Force an identical identity (same language_id, no path) to create
        // a genuine cycle rather than two distinct "py" documents.
        let err = loader.flatten(config).unwrap_err();
        assert!(matches!(err, ConfigError::CyclicConfiguration(_)));
    }
}
