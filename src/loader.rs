//! Prerequisite loading.
//!
//! A scene declares the external components and assets it needs as a list of
//! [`PrerequisiteSpec`]s. [`AsyncLoader::load_all`] issues one request per spec
//! through a host-supplied [`ComponentLoader`] and resolves once every request
//! has succeeded, filling the shared [`Registry`] keyed by label.
//!
//! Loading is all-or-nothing and fails fast: the first failing request rejects
//! the whole batch with its label, outstanding requests are dropped, and the
//! registry is not touched. Retrying is left to the transport.

use crate::error::{LoadError, TransportError};
use futures::FutureExt;
use futures::future::{LocalBoxFuture, try_join_all};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A loadable component or asset.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrerequisiteSpec {
    /// Namespaced type tag understood by the host loader.
    #[serde(alias = "ident")]
    pub identity: String,
    /// Opaque URI handed to the transport.
    #[serde(alias = "src")]
    pub source: String,
    /// Key under which the loaded resource is registered.
    pub label: String,
}

impl PrerequisiteSpec {
    pub fn new(
        identity: impl Into<String>,
        source: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            source: source.into(),
            label: label.into(),
        }
    }
}

/// Type-erased loaded resource. Downcast through [`Registry::get`].
pub type Resource = Rc<dyn Any>;

/// Host transport for prerequisites.
///
/// Implemented for any `Fn(&PrerequisiteSpec) -> LocalBoxFuture<..>` closure.
pub trait ComponentLoader {
    fn load(
        &self,
        spec: &PrerequisiteSpec,
    ) -> LocalBoxFuture<'static, Result<Resource, TransportError>>;
}

impl<F> ComponentLoader for F
where
    F: Fn(&PrerequisiteSpec) -> LocalBoxFuture<'static, Result<Resource, TransportError>>,
{
    fn load(
        &self,
        spec: &PrerequisiteSpec,
    ) -> LocalBoxFuture<'static, Result<Resource, TransportError>> {
        self(spec)
    }
}

/// Loaded resources by label.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<String, (PrerequisiteSpec, Resource)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, replacing any previous one with the same label.
    pub fn insert(&mut self, spec: PrerequisiteSpec, resource: Resource) {
        self.entries.insert(spec.label.clone(), (spec, resource));
    }

    /// The resource under `label`, if present and of type `T`.
    pub fn get<T: 'static>(&self, label: &str) -> Option<&T> {
        self.entries
            .get(label)
            .and_then(|(_, resource)| resource.downcast_ref::<T>())
    }

    pub fn resource(&self, label: &str) -> Option<Resource> {
        self.entries.get(label).map(|(_, resource)| resource.clone())
    }

    pub fn spec(&self, label: &str) -> Option<&PrerequisiteSpec> {
        self.entries.get(label).map(|(spec, _)| spec)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut labels: Vec<_> = self.entries.keys().collect();
        labels.sort();
        f.debug_struct("Registry").field("labels", &labels).finish()
    }
}

/// Resolves a batch of prerequisites into a single completion.
pub struct AsyncLoader {
    loader: Box<dyn ComponentLoader>,
}

impl AsyncLoader {
    pub fn new(loader: impl ComponentLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
        }
    }

    /// Load every spec; resolves after all succeed, or with the first failure.
    ///
    /// Requests are issued together and may complete in any order. On success
    /// every resource is inserted into `registry`; on failure nothing is.
    pub async fn load_all(
        &self,
        specs: &[PrerequisiteSpec],
        registry: &mut Registry,
    ) -> Result<(), LoadError> {
        let mut seen = HashSet::new();
        for spec in specs {
            if !seen.insert(spec.label.as_str()) {
                return Err(LoadError::DuplicateLabel(spec.label.clone()));
            }
        }

        log::info!("loading {} prerequisite(s)", specs.len());
        let requests = specs.iter().map(|spec| {
            let label = spec.label.clone();
            let identity = spec.identity.clone();
            self.loader.load(spec).map(move |result| {
                result.map_err(|source| LoadError::Prerequisite {
                    label,
                    identity,
                    source,
                })
            })
        });

        let resources = match try_join_all(requests).await {
            Ok(resources) => resources,
            Err(err) => {
                log::warn!("{}", err);
                return Err(err);
            }
        };

        for (spec, resource) in specs.iter().zip(resources) {
            log::debug!("prerequisite '{}' ready ({})", spec.label, spec.identity);
            registry.insert(spec.clone(), resource);
        }
        Ok(())
    }
}
