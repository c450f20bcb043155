//! Function signatures (spec §3 "Signature").

use super::type_id::Type;
use std::sync::Arc;

/// One parameter in a [`Signature`]. The name may be empty (positional-only
/// back ends); the type may be absent, meaning "any / unresolved".
#[derive(Debug, Clone)]
pub struct Parameter {
    name: Arc<str>,
    ty: Option<Type>,
}

impl Parameter {
    /// Creates a parameter descriptor.
    pub fn new(name: impl Into<Arc<str>>, ty: Option<Type>) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// The parameter's name, empty string when unnamed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter's declared type, `None` when unresolved.
    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }
}

/// An ordered parameter list plus a return type (spec §3 "Signature").
#[derive(Debug, Clone)]
pub struct Signature {
    parameters: Vec<Parameter>,
    return_type: Option<Type>,
}

impl Signature {
    /// Creates a signature from an ordered parameter list and return type.
    pub fn new(parameters: Vec<Parameter>, return_type: Option<Type>) -> Self {
        Self {
            parameters,
            return_type,
        }
    }

    /// An empty signature returning an unresolved type — the permissive
    /// default used by loaders that cannot introspect arity ahead of a call.
    pub fn any(arity: usize) -> Self {
        Self {
            parameters: (0..arity).map(|_| Parameter::new("", None)).collect(),
            return_type: None,
        }
    }

    /// Declared parameters, in order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Declared return type, `None` when unresolved.
    pub fn return_type(&self) -> Option<&Type> {
        self.return_type.as_ref()
    }

    /// Declared arity — the number of arguments a call must supply.
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Index of the named parameter, if declared.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name() == name)
    }
}
