//! Discovery contexts: named symbol tables produced by loading a script
//! (spec §3 "Context").

use super::reflect::{Class, Function};
use super::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A flat, named table of the functions, classes, and globals a loader
/// discovered while processing a handle. Contexts can be appended
/// (name-union, later entries win) and compared for overlap (spec §3).
#[derive(Clone, Default)]
pub struct Context {
    functions: HashMap<Arc<str>, Arc<Function>>,
    classes: HashMap<Arc<str>, Arc<Class>>,
    globals: HashMap<Arc<str>, Value>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function under its own name, replacing any prior entry
    /// (spec §3 "later discovery overwrites an earlier same-named entry").
    pub fn insert_function(&mut self, function: Arc<Function>) {
        self.functions.insert(Arc::from(function.name()), function);
    }

    /// Registers a class under its own name, replacing any prior entry.
    pub fn insert_class(&mut self, class: Arc<Class>) {
        self.classes.insert(Arc::from(class.name()), class);
    }

    /// Registers a global value under `name`, replacing any prior entry.
    pub fn insert_global(&mut self, name: impl Into<Arc<str>>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    /// Looks up a function by name.
    pub fn function(&self, name: &str) -> Option<&Arc<Function>> {
        self.functions.get(name)
    }

    /// Looks up a class by name.
    pub fn class(&self, name: &str) -> Option<&Arc<Class>> {
        self.classes.get(name)
    }

    /// Looks up a global by name.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// All function names, in arbitrary order.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|k| k.as_ref())
    }

    /// All class names, in arbitrary order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(|k| k.as_ref())
    }

    /// Merges `other` into `self` by name-union: entries from `other`
    /// overwrite same-named entries already present (spec §3 "append").
    pub fn append(&mut self, other: Context) {
        self.functions.extend(other.functions);
        self.classes.extend(other.classes);
        self.globals.extend(other.globals);
    }

    /// True if `self` and `other` share any function, class, or global name
    /// (spec §3 "compare (any-overlap)"), used by the loader pipeline to
    /// detect redefinition before committing a newly discovered context.
    pub fn overlaps(&self, other: &Context) -> bool {
        self.functions.keys().any(|k| other.functions.contains_key(k))
            || self.classes.keys().any(|k| other.classes.contains_key(k))
            || self.globals.keys().any(|k| other.globals.contains_key(k))
    }

    /// True if this context discovered nothing at all.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.classes.is_empty() && self.globals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::signature::Signature;
    use std::sync::Arc;

    fn dummy_function(name: &str) -> Arc<Function> {
        Arc::new(Function::new(
            name,
            Signature::any(0),
            "mock",
            Arc::new(|_args| Ok(Value::Null)),
        ))
    }

    #[test]
    fn append_overwrites_same_name() {
        let mut a = Context::new();
        a.insert_function(dummy_function("f"));
        let mut b = Context::new();
        b.insert_function(dummy_function("f"));
        a.append(b);
        assert_eq!(a.function_names().count(), 1);
    }

    #[test]
    fn overlap_detects_shared_names() {
        let mut a = Context::new();
        a.insert_function(dummy_function("shared"));
        let mut b = Context::new();
        b.insert_function(dummy_function("shared"));
        assert!(a.overlaps(&b));

        let mut c = Context::new();
        c.insert_function(dummy_function("distinct"));
        assert!(!a.overlaps(&c));
    }
}
