//! Compile parameter descriptors into a resolution plan.

use super::ResolveError;
use super::context::ContextField;
use super::provider::{Dependency, Param, ProviderKey, Shape};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum NodeKey {
    Context(ContextField),
    Provider(ProviderKey),
    /// Plain values are never shared; each occurrence gets its own slot.
    Value(usize),
}

/// A parameter name bound to the node that produces its value.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) name: String,
    pub(crate) key: NodeKey,
}

/// One step of a resolution plan.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) key: NodeKey,
    /// Name of the first parameter that referenced this node.
    pub(crate) param: String,
    pub(crate) dependency: Dependency,
    /// Inputs of a provider node, bound to earlier nodes.
    pub(crate) inputs: Vec<Binding>,
}

impl Node {
    pub fn param(&self) -> &str {
        &self.param
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }
}

/// The compiled description of how to resolve a callable's parameters.
///
/// Nodes are in post-order: a provider's inputs always precede it, and each
/// context field or provider appears once no matter how often it is referenced.
/// Building performs no I/O and yields the same plan for the same parameters.
#[derive(Debug, Clone, Default)]
pub struct Dependant {
    pub(crate) nodes: Vec<Node>,
    pub(crate) bindings: Vec<Binding>,
}

impl Dependant {
    /// Compile `params` into a plan.
    ///
    /// Fails when a parameter is declared by a type the context cannot supply
    /// or when two parameters of one callable share a name, so configuration
    /// mistakes surface at registration.
    pub fn build(params: &[Param]) -> Result<Self, ResolveError> {
        let mut builder = Builder::default();
        let bindings = builder.bind_all(params)?;
        Ok(Self {
            nodes: builder.nodes,
            bindings,
        })
    }

    /// Plan steps in resolution order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Top-level parameter names, in declaration order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Default)]
struct Builder {
    nodes: Vec<Node>,
    seen: HashSet<NodeKey>,
    next_value: usize,
}

impl Builder {
    fn bind_all(&mut self, params: &[Param]) -> Result<Vec<Binding>, ResolveError> {
        let mut names = HashSet::with_capacity(params.len());
        if let Some(dup) = params.iter().find(|p| !names.insert(p.name())) {
            return Err(ResolveError::DuplicateParameter(dup.name().to_string()));
        }
        params.iter().map(|p| self.bind(p)).collect()
    }

    fn bind(&mut self, param: &Param) -> Result<Binding, ResolveError> {
        let key = match param.shape() {
            Shape::Typed { type_id, type_name } => {
                let field = ContextField::for_type(*type_id).ok_or_else(|| {
                    ResolveError::UnmappedType {
                        param: param.name().to_string(),
                        type_name: *type_name,
                    }
                })?;
                let key = NodeKey::Context(field);
                self.push_once(key, param, Dependency::ContextField(field), Vec::new());
                key
            }
            Shape::Value(value) => {
                let key = NodeKey::Value(self.next_value);
                self.next_value += 1;
                self.push_once(key, param, Dependency::DirectValue(value.clone()), Vec::new());
                key
            }
            Shape::Depends(provider) => {
                let key = NodeKey::Provider(provider.key());
                if !self.seen.contains(&key) {
                    let inputs = self.bind_all(provider.params())?;
                    let dependency = Dependency::SubDependency(provider.clone());
                    self.push_once(key, param, dependency, inputs);
                }
                key
            }
            Shape::Scoped(provider) => {
                let key = NodeKey::Provider(provider.key());
                if !self.seen.contains(&key) {
                    let inputs = self.bind_all(provider.params())?;
                    let dependency = Dependency::ScopedResource(provider.clone());
                    self.push_once(key, param, dependency, inputs);
                }
                key
            }
        };

        Ok(Binding {
            name: param.name().to_string(),
            key,
        })
    }

    fn push_once(
        &mut self,
        key: NodeKey,
        param: &Param,
        dependency: Dependency,
        inputs: Vec<Binding>,
    ) {
        if self.seen.insert(key) {
            self.nodes.push(Node {
                key,
                param: param.name().to_string(),
                dependency,
                inputs,
            });
        }
    }
}
