//! Environment variable caching (spec §6 "Environment variables").
//!
//! Mirrors `environment_variable.c` in the C original: each variable name is
//! read from the process environment at most once per run and the result —
//! present or absent — is cached, so a loader that consults e.g.
//! `PYTHONPATH` on every script load does not re-enter `getenv` each time.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A process-wide cache of environment variable lookups.
///
/// Reads are cached on first access; nothing ever invalidates an entry
/// during the process lifetime, matching the C original's read-once
/// semantics (a loader that needs to observe a variable change must restart
/// the process).
pub struct EnvCache {
    entries: RwLock<HashMap<&'static str, Option<String>>>,
}

impl EnvCache {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value of `name`, reading and caching it from the
    /// process environment on first request.
    pub fn get(&self, name: &'static str) -> Option<String> {
        if let Some(cached) = self.entries.read().get(name) {
            return cached.clone();
        }
        let value = std::env::var(name).ok();
        self.entries.write().insert(name, value.clone());
        value
    }

    /// Forces a specific value into the cache, bypassing the process
    /// environment. Used by tests and by embedders that configure a loader
    /// programmatically instead of through the process environment.
    pub fn set_for_test(&self, name: &'static str, value: Option<String>) {
        self.entries.write().insert(name, value);
    }
}

static CACHE: OnceCell<EnvCache> = OnceCell::new();

/// The process-wide [`EnvCache`] singleton.
pub fn cache() -> &'static EnvCache {
    CACHE.get_or_init(EnvCache::new)
}

/// Well-known environment variables consulted by the core (spec §6).
pub mod vars {
    pub const LOADER_LIBRARY_PATH: &str = "METACALL_LOADER_LIBRARY_PATH";
    pub const LOADER_SCRIPT_PATH: &str = "LOADER_SCRIPT_PATH";
    pub const LIBRARY_PATH: &str = "LOADER_LIBRARY_PATH";
    pub const EXTENSIONS_PATH: &str = "METACALL_EXTENSIONS_PATH";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_value_is_returned_without_touching_the_environment() {
        let cache = EnvCache::new();
        cache.set_for_test("METACALL_TEST_ONLY_VAR", Some("/opt/scripts".to_string()));
        assert_eq!(
            cache.get("METACALL_TEST_ONLY_VAR"),
            Some("/opt/scripts".to_string())
        );
    }

    #[test]
    fn missing_variable_caches_as_none() {
        let cache = EnvCache::new();
        assert_eq!(cache.get("METACALL_DEFINITELY_UNSET_VAR_XYZ"), None);
        // Second read hits the cache, still None.
        assert_eq!(cache.get("METACALL_DEFINITELY_UNSET_VAR_XYZ"), None);
    }
}
