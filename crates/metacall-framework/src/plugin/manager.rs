//! Descriptor-driven plugin registry (spec §4.4 "Plugin manager").
//!
//! Generic over the interface trait object a concrete manager instance
//! hosts (`dyn LoaderImpl`, `dyn Serial`, a detour module, ...). Loads
//! descriptors in a declared order, instantiates each via its factory, and
//! destroys them in reverse order with a dependency cascade: a plugin that
//! depends on another is always destroyed first (spec §4.4).

use super::descriptor::PluginDescriptor;
use metacall_value::{ErrorKind, MetaCallResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, warn};

struct Entry<I: ?Sized> {
    descriptor: PluginDescriptor<I>,
    instance: Option<Arc<I>>,
}

/// Owns a named set of plugin descriptors of interface type `I` and their
/// materialised instances.
pub struct PluginManager<I: ?Sized> {
    entries: RwLock<HashMap<String, Entry<I>>>,
}

impl<I: ?Sized + Send + Sync + 'static> Default for PluginManager<I> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<I: ?Sized + Send + Sync + 'static> PluginManager<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor without instantiating it.
    pub async fn register(&self, descriptor: PluginDescriptor<I>) {
        let name = descriptor.name.to_string();
        self.entries.write().await.insert(
            name,
            Entry {
                descriptor,
                instance: None,
            },
        );
    }

    /// Returns the live instance for `name`, instantiating it (and,
    /// recursively, any of its not-yet-loaded dependencies) on first
    /// request.
    pub async fn get_or_load(&self, name: &str) -> MetaCallResult<Arc<I>> {
        if let Some(instance) = self.peek(name).await {
            return Ok(instance);
        }
        self.load_with_deps(name, &mut Vec::new()).await
    }

    /// Returns the live instance for `name` without triggering a load.
    pub async fn peek(&self, name: &str) -> Option<Arc<I>> {
        self.entries.read().await.get(name).and_then(|e| e.instance.clone())
    }

    fn load_with_deps<'a>(
        &'a self,
        name: &'a str,
        in_progress: &'a mut Vec<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = MetaCallResult<Arc<I>>> + Send + 'a>>
    {
        Box::pin(async move {
            if in_progress.iter().any(|n| n == name) {
                return Err(ErrorKind::CyclicConfiguration(name.to_string()).into());
            }
            if let Some(instance) = self.peek(name).await {
                return Ok(instance);
            }
            in_progress.push(name.to_string());

            let (descriptor, depends_on) = {
                let entries = self.entries.read().await;
                let entry = entries
                    .get(name)
                    .ok_or_else(|| ErrorKind::NotFound(name.to_string()))?;
                (entry.descriptor.clone(), entry.descriptor.depends_on)
            };

            for dep in depends_on {
                self.load_with_deps(dep, in_progress).await?;
            }

            let instance = (descriptor.factory)()
                .map_err(|e| ErrorKind::LoadFailed(format!("plugin '{name}': {e}")))?;

            let mut entries = self.entries.write().await;
            if let Some(entry) = entries.get_mut(name) {
                entry.instance = Some(instance.clone());
            }
            in_progress.pop();
            Ok(instance)
        })
    }

    /// Instantiates every registered descriptor, in an order that respects
    /// `depends_on` edges. Descriptors whose dependency load fails are
    /// logged and skipped; dependents of a failed plugin fail in turn.
    pub async fn load_all(&self) {
        let names: Vec<String> = self.entries.read().await.keys().cloned().collect();
        for name in names {
            if let Err(e) = self.get_or_load(&name).await {
                error!(plugin = %name, error = %e, "plugin failed to load");
            }
        }
    }

    /// Destroys every live instance, dependents before dependencies (spec
    /// §4.4 "any plugin that declares a dependency on another is destroyed
    /// first"), dropping the manager's `Arc` so an instance's `Drop`
    /// impl runs once nothing else in the process still holds it.
    pub async fn unload_all(&self) {
        let order = self.destruction_order().await;
        let mut entries = self.entries.write().await;
        for name in order {
            if let Some(entry) = entries.get_mut(&name) {
                entry.instance = None;
            }
        }
    }

    /// Computes a destruction order: every plugin appears before all of its
    /// `depends_on` targets. Falls back to registration order (with a
    /// logged warning) if the dependency graph contains a cycle.
    async fn destruction_order(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut remaining: HashMap<&str, &[&'static str]> = entries
            .iter()
            .map(|(name, e)| (name.as_str(), e.descriptor.depends_on))
            .collect();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            // A plugin is destroyable once every plugin that depends on it
            // has already been ordered (i.e. none of the still-remaining
            // plugins name it in their depends_on list).
            let ready: Vec<&str> = remaining
                .keys()
                .copied()
                .filter(|candidate| {
                    !remaining
                        .values()
                        .any(|deps| deps.contains(candidate))
                })
                .collect();

            if ready.is_empty() {
                warn!("plugin dependency cycle detected during unload; falling back to registration order");
                order.extend(remaining.keys().map(|s| s.to_string()));
                break;
            }
            for name in &ready {
                order.push(name.to_string());
                remaining.remove(name);
            }
        }
        order
    }

    /// Number of registered descriptors (loaded or not).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Simple(&'static str);
    impl Greeter for Simple {
        fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    #[tokio::test]
    async fn loads_dependency_before_dependent() {
        let manager: PluginManager<dyn Greeter> = PluginManager::new();
        manager
            .register(PluginDescriptor::in_process("base", &[], || {
                Ok(Arc::new(Simple("base")) as Arc<dyn Greeter>)
            }))
            .await;
        manager
            .register(PluginDescriptor::in_process("derived", &["base"], || {
                Ok(Arc::new(Simple("derived")) as Arc<dyn Greeter>)
            }))
            .await;

        let derived = manager.get_or_load("derived").await.unwrap();
        assert_eq!(derived.greet(), "derived");
        assert!(manager.peek("base").await.is_some());
    }

    #[tokio::test]
    async fn cyclic_dependency_errors() {
        let manager: PluginManager<dyn Greeter> = PluginManager::new();
        manager
            .register(PluginDescriptor::in_process("a", &["b"], || {
                Ok(Arc::new(Simple("a")) as Arc<dyn Greeter>)
            }))
            .await;
        manager
            .register(PluginDescriptor::in_process("b", &["a"], || {
                Ok(Arc::new(Simple("b")) as Arc<dyn Greeter>)
            }))
            .await;

        let err = manager.get_or_load("a").await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::CyclicConfiguration(_)));
    }
}
