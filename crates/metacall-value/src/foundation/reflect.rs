//! The object-oriented reflection surface (spec §3 "Class / Object /
//! Attribute / Method / Constructor") plus the callable [`Function`] entity.

use super::signature::Signature;
use super::value::Value;
use crate::error::{ErrorKind, MetaCallResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Member visibility, shared by attributes and methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// A native invocation trampoline: the loader-supplied closure a [`Function`]
/// or [`Method`]/[`Constructor`] calls into. Boxed behind `Arc` so the same
/// trampoline can be shared by multiple reflected entities (e.g. an
/// overloaded symbol discovered under two names).
pub type NativeInvoke = Arc<dyn Fn(&[Value]) -> MetaCallResult<Value> + Send + Sync>;

/// A named entity with a signature and a back-end handle (spec §3
/// "Function"). Owned by the loader that produced it.
pub struct Function {
    name: Arc<str>,
    signature: Signature,
    loader_tag: Arc<str>,
    invoke: NativeInvoke,
}

impl Function {
    /// Creates a function entity.
    pub fn new(
        name: impl Into<Arc<str>>,
        signature: Signature,
        loader_tag: impl Into<Arc<str>>,
        invoke: NativeInvoke,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            loader_tag: loader_tag.into(),
            invoke,
        }
    }

    /// The function's name, as discovered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function's signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Tag of the loader that produced this function, used by the call
    /// pipeline to re-enter the owning loader's affinity rules.
    pub fn loader_tag(&self) -> &str {
        &self.loader_tag
    }

    /// Invokes the function. Validates arity against the signature; the
    /// call pipeline (in `metacall-framework`) is responsible for coercion
    /// and for acquiring the owning loader's invoke lock before calling
    /// this — this method only performs the mechanical arity check and the
    /// call itself.
    pub fn call(&self, args: &[Value]) -> MetaCallResult<Value> {
        if args.len() != self.signature.arity() {
            return Err(ErrorKind::ArityMismatch {
                expected: self.signature.arity(),
                got: args.len(),
            }
            .into());
        }
        (self.invoke)(args)
    }
}

/// A class attribute descriptor (spec §3 "Attribute").
#[derive(Debug, Clone)]
pub struct Attribute {
    name: Arc<str>,
    visibility: Visibility,
    /// `true` if this attribute may be created on first write (the
    /// "dynamic accessor" policy); `false` means the member must pre-exist.
    dynamic: bool,
}

impl Attribute {
    /// Creates an attribute descriptor.
    pub fn new(name: impl Into<Arc<str>>, visibility: Visibility, dynamic: bool) -> Self {
        Self {
            name: name.into(),
            visibility,
            dynamic,
        }
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether this attribute may be created on first write.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// A class method descriptor (spec §3 "Method").
pub struct Method {
    name: Arc<str>,
    signature: Signature,
    visibility: Visibility,
    is_static: bool,
    invoke: NativeInvoke,
}

impl Method {
    /// Creates a method descriptor.
    pub fn new(
        name: impl Into<Arc<str>>,
        signature: Signature,
        visibility: Visibility,
        is_static: bool,
        invoke: NativeInvoke,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            visibility,
            is_static,
            invoke,
        }
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method signature. For instance methods, the receiver is passed as
    /// the first element of the argument vector at call time rather than
    /// being modeled as a signature parameter.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Declared visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether this method is static (no receiver).
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Invokes the method with `args` (receiver prepended by the caller for
    /// instance methods).
    pub fn call(&self, args: &[Value]) -> MetaCallResult<Value> {
        (self.invoke)(args)
    }
}

/// A class constructor descriptor (spec §3 "Constructor").
pub struct Constructor {
    signature: Signature,
    visibility: Visibility,
    invoke: NativeInvoke,
}

impl Constructor {
    /// Creates a constructor descriptor.
    pub fn new(signature: Signature, visibility: Visibility, invoke: NativeInvoke) -> Self {
        Self {
            signature,
            visibility,
            invoke,
        }
    }

    /// Constructor signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Declared visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Invokes the constructor, expected to return an `object` value.
    pub fn call(&self, args: &[Value]) -> MetaCallResult<Value> {
        if args.len() != self.signature.arity() {
            return Err(ErrorKind::ArityMismatch {
                expected: self.signature.arity(),
                got: args.len(),
            }
            .into());
        }
        (self.invoke)(args)
    }
}

/// A class type descriptor (spec §3 "Class"). Owns its constructors,
/// methods, and attributes; weakly referenced by the objects it stands up
/// (spec §3 "Ownership summary").
pub struct Class {
    name: Arc<str>,
    loader_tag: Arc<str>,
    constructors: Vec<Constructor>,
    methods: HashMap<Arc<str>, Method>,
    attributes: HashMap<Arc<str>, Attribute>,
}

impl Class {
    /// Creates a class descriptor.
    pub fn new(
        name: impl Into<Arc<str>>,
        loader_tag: impl Into<Arc<str>>,
        constructors: Vec<Constructor>,
        methods: Vec<Method>,
        attributes: Vec<Attribute>,
    ) -> Self {
        Self {
            name: name.into(),
            loader_tag: loader_tag.into(),
            constructors,
            methods: methods.into_iter().map(|m| (Arc::from(m.name()), m)).collect(),
            attributes: attributes
                .into_iter()
                .map(|a| (Arc::from(a.name()), a))
                .collect(),
        }
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag of the loader that produced this class.
    pub fn loader_tag(&self) -> &str {
        &self.loader_tag
    }

    /// Declared constructors, in declaration order.
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Looks up a method by name.
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Looks up an attribute descriptor by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Instantiates an object of this class by calling `constructor_index`
    /// (usually `0`) and binding the resulting object's weak class
    /// back-pointer to `self_arc`.
    pub fn construct(self_arc: &Arc<Class>, constructor_index: usize, args: &[Value]) -> MetaCallResult<Object> {
        let ctor = self_arc
            .constructors
            .get(constructor_index)
            .ok_or_else(|| ErrorKind::NotFound(format!("constructor #{constructor_index}")))?;
        ctor.call(args)?;
        Ok(Object::new(Arc::downgrade(self_arc)))
    }
}

/// A class instance (spec §3 "Object"). Holds a weak back-pointer to its
/// class — used only for dispatch — breaking the class/object reference
/// cycle the spec's Design Notes call out.
pub struct Object {
    class: Weak<Class>,
    attributes: RwLock<HashMap<Arc<str>, Value>>,
}

impl Object {
    /// Creates an object bound to `class`.
    pub fn new(class: Weak<Class>) -> Self {
        Self {
            class,
            attributes: RwLock::new(HashMap::new()),
        }
    }

    /// The object's class, if it has not been dropped.
    pub fn class(&self) -> Option<Arc<Class>> {
        self.class.upgrade()
    }

    /// Reads an attribute's current value.
    pub fn get_attribute(&self, name: &str) -> Option<Value> {
        self.attributes.read().get(name).cloned()
    }

    /// Writes an attribute, honoring the class's static/dynamic accessor
    /// policy (spec §3): a statically-declared member must pre-exist on the
    /// class; a dynamic member may be created on first write even if the
    /// class never declared it.
    pub fn set_attribute(&self, name: &str, value: Value) -> MetaCallResult<()> {
        if let Some(class) = self.class() {
            match class.attribute(name) {
                Some(attr) if attr.is_dynamic() => {}
                Some(_) => {}
                None => {
                    return Err(ErrorKind::NotFound(format!(
                        "attribute '{name}' is not declared on class '{}'",
                        class.name()
                    ))
                    .into());
                }
            }
        }
        self.attributes.write().insert(Arc::from(name), value);
        Ok(())
    }
}
