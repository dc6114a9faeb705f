//! Parameter descriptors, providers and resolved arguments.

use super::ResolveError;
use super::context::ContextField;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A resolved, type-erased parameter value.
pub type Value = Rc<dyn Any>;

/// Release action of a scoped resource.
pub type Release = Box<dyn FnOnce() -> anyhow::Result<()>>;

type ProviderFn = dyn Fn(&Args) -> anyhow::Result<Value>;
type AcquireFn = dyn Fn(&Args) -> anyhow::Result<(Value, Option<Release>)>;

static NEXT_PROVIDER_KEY: AtomicU64 = AtomicU64::new(0);

/// Identity of a provider. Clones of a provider share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ProviderKey(u64);

impl ProviderKey {
    fn next() -> Self {
        ProviderKey(NEXT_PROVIDER_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// A callable whose result is injected into other callables.
///
/// Within one resolution pass a provider is called at most once, however
/// many parameters depend on it.
#[derive(Clone)]
pub struct Provider {
    key: ProviderKey,
    name: Rc<str>,
    params: Rc<[Param]>,
    call: Rc<ProviderFn>,
}

impl Provider {
    pub fn new<T, F>(name: &str, params: Vec<Param>, f: F) -> Self
    where
        T: Any,
        F: Fn(&Args) -> anyhow::Result<T> + 'static,
    {
        Self {
            key: ProviderKey::next(),
            name: Rc::from(name),
            params: Rc::from(params),
            call: Rc::new(move |args: &Args| f(args).map(|v| Rc::new(v) as Value)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn key(&self) -> ProviderKey {
        self.key
    }

    pub(crate) fn call(&self, args: &Args) -> anyhow::Result<Value> {
        (self.call)(args)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// A value together with the action that releases it.
pub struct Scoped<T> {
    value: T,
    release: Option<Release>,
}

impl<T> Scoped<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            release: None,
        }
    }

    /// Run `release` when the invocation that acquired the value ends.
    pub fn on_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }
}

/// A provider that acquires a resource and registers its release.
#[derive(Clone)]
pub struct ScopedProvider {
    key: ProviderKey,
    name: Rc<str>,
    params: Rc<[Param]>,
    acquire: Rc<AcquireFn>,
}

impl ScopedProvider {
    pub fn new<T, F>(name: &str, params: Vec<Param>, f: F) -> Self
    where
        T: Any,
        F: Fn(&Args) -> anyhow::Result<Scoped<T>> + 'static,
    {
        Self {
            key: ProviderKey::next(),
            name: Rc::from(name),
            params: Rc::from(params),
            acquire: Rc::new(move |args: &Args| {
                f(args).map(|scoped| (Rc::new(scoped.value) as Value, scoped.release))
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn key(&self) -> ProviderKey {
        self.key
    }

    pub(crate) fn acquire(&self, args: &Args) -> anyhow::Result<(Value, Option<Release>)> {
        (self.acquire)(args)
    }
}

impl fmt::Debug for ScopedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedProvider")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Shape {
    Typed {
        type_id: TypeId,
        type_name: &'static str,
    },
    Value(Value),
    Depends(Provider),
    Scoped(ScopedProvider),
}

/// Declared shape of one parameter of a stage agent or provider.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    shape: Shape,
}

impl Param {
    /// A parameter of type `T`, taken from the invocation context.
    pub fn of<T: Any>(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shape: Shape::Typed {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
            },
        }
    }

    /// A plain value passed through unchanged.
    pub fn value<T: Any>(name: &str, value: T) -> Self {
        Self {
            name: name.to_string(),
            shape: Shape::Value(Rc::new(value)),
        }
    }

    /// The result of `provider`, resolved recursively.
    pub fn depends(name: &str, provider: &Provider) -> Self {
        Self {
            name: name.to_string(),
            shape: Shape::Depends(provider.clone()),
        }
    }

    /// A resource from `provider`, released when the invocation ends.
    pub fn scoped(name: &str, provider: &ScopedProvider) -> Self {
        Self {
            name: name.to_string(),
            shape: Shape::Scoped(provider.clone()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// How a plan node produces its value.
#[derive(Debug, Clone)]
pub enum Dependency {
    DirectValue(Value),
    ContextField(ContextField),
    SubDependency(Provider),
    ScopedResource(ScopedProvider),
}

/// Resolved parameters of one invocation, by declared name.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<(String, Value)>,
}

impl Args {
    pub(crate) fn from_values(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    /// The value of parameter `name` as a `T`.
    pub fn get<T: Any>(&self, name: &str) -> Result<Rc<T>, ResolveError> {
        let value = self
            .values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| Rc::clone(v))
            .ok_or_else(|| ResolveError::UnknownParameter(name.to_string()))?;

        value
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                param: name.to_string(),
                requested: type_name::<T>(),
            })
    }

    /// Declared parameter names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
