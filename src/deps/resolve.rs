//! Resolve a plan against an invocation context.

use super::ResolveError;
use super::context::Context;
use super::dependant::{Binding, Dependant, NodeKey};
use super::provider::{Args, Dependency, Value};
use super::scope::ScopeStack;
use std::collections::HashMap;

/// Resolve every parameter of `dependant` against `context`.
///
/// Nodes are resolved in plan order, so each provider is called once per pass
/// and every parameter bound to it sees the same value. Release actions of
/// scoped resources are pushed onto `scope`; resources acquired before a
/// failure are still released when `scope` is dropped.
pub fn solve_dependencies(
    context: &Context,
    dependant: &Dependant,
    scope: &mut ScopeStack,
) -> Result<Args, ResolveError> {
    let mut resolved: HashMap<NodeKey, Value> = HashMap::with_capacity(dependant.nodes.len());

    for node in &dependant.nodes {
        let value = match &node.dependency {
            Dependency::DirectValue(value) => value.clone(),
            Dependency::ContextField(field) => {
                context
                    .field(*field)
                    .ok_or_else(|| ResolveError::MissingContext {
                        param: node.param.clone(),
                        field: *field,
                    })?
            }
            Dependency::SubDependency(provider) => {
                let args = bind(&node.inputs, &resolved);
                provider
                    .call(&args)
                    .map_err(|source| ResolveError::Provider {
                        provider: provider.name().to_string(),
                        source,
                    })?
            }
            Dependency::ScopedResource(provider) => {
                let args = bind(&node.inputs, &resolved);
                let (value, release) =
                    provider
                        .acquire(&args)
                        .map_err(|source| ResolveError::Provider {
                            provider: provider.name().to_string(),
                            source,
                        })?;
                if let Some(release) = release {
                    scope.push(provider.name(), release);
                }
                value
            }
        };

        tracing::trace!(param = %node.param, "resolved dependency");
        resolved.insert(node.key, value);
    }

    Ok(bind(&dependant.bindings, &resolved))
}

fn bind(bindings: &[Binding], resolved: &HashMap<NodeKey, Value>) -> Args {
    Args::from_values(
        bindings
            .iter()
            .filter_map(|b| resolved.get(&b.key).map(|v| (b.name.clone(), v.clone())))
            .collect(),
    )
}
