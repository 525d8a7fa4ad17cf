//! The service container.
//!
//! A `Container` maps a [`ServiceKey`] to a slot holding either an instance
//! built at registration time, a lazy provider, or a value handed over
//! directly. Operations are grouped by concern:
//!
//! - `register`: eager, lazy, factory and direct registration
//! - `resolve`: typed lookup, `try_*` and `must_*` variants
//! - `inject`: struct injection entry points used by the derives
//! - `lifecycle`: listing, validation, removal and cloning
//!
//! One `RwLock` guards the registry. Providers always run with that lock
//! released, so they can resolve their own dependencies; lazy slots carry
//! their own lock for construction.

mod inject;
mod lifecycle;
mod register;
mod resolve;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{ContainerConfig, MissingPolicy};
use crate::error::DiError;
use crate::events::{self, ContainerEvent, EventSink};
use crate::key::ServiceKey;
use crate::slot::{Instance, Slot};

pub use lifecycle::ServiceInfo;
use register::InFlight;

/// Runtime registry of services keyed by type and optional name.
pub struct Container {
    registry: RwLock<Registry>,
    sink: Option<EventSink>,
    on_missing: MissingPolicy,
}

#[derive(Default)]
struct Registry {
    services: HashMap<ServiceKey, Slot>,
    /// Keys resolved at least once.
    invoked: HashSet<ServiceKey>,
    /// Keys whose eager provider is running.
    constructing: HashMap<ServiceKey, Arc<InFlight>>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.len())
            .field("on_missing", &self.on_missing)
            .field("event_sink", &self.sink.is_some())
            .finish()
    }
}

impl Container {
    /// Creates an empty container that skips unresolved injected fields.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            sink: None,
            on_missing: MissingPolicy::default(),
        }
    }

    /// Creates an empty container using the given settings.
    pub fn from_config(config: &ContainerConfig) -> Self {
        Self::new().with_missing_policy(config.on_missing)
    }

    /// Installs a callback receiving every state transition.
    pub fn with_event_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&ContainerEvent) + Send + Sync + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Sets what struct injection does with fields that have no service.
    pub fn with_missing_policy(mut self, policy: MissingPolicy) -> Self {
        self.on_missing = policy;
        self
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.on_missing
    }

    /// Whether an unnamed `T` is registered.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.read().services.contains_key(&ServiceKey::of::<T>())
    }

    /// Whether `T` is registered under `name`.
    pub fn contains_named<T: ?Sized + 'static>(&self, name: &str) -> bool {
        self.read()
            .services
            .contains_key(&ServiceKey::named::<T>(name))
    }

    /// Whether the service under `key` has been resolved or injected.
    pub fn is_invoked(&self, key: &ServiceKey) -> bool {
        self.read().invoked.contains(key)
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.read().services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ContainerEvent) {
        events::emit(self.sink.as_ref(), event);
    }

    /// Produce the instance behind a slot, running a lazy provider if needed.
    fn materialize(&self, key: &ServiceKey, slot: &Slot) -> Result<Instance, DiError> {
        let lazy = match slot {
            Slot::Eager(instance) | Slot::Direct(instance) => return Ok(instance.clone()),
            Slot::Lazy(lazy) => lazy,
        };

        match lazy.get(self) {
            Ok(materialized) => {
                if materialized.fresh {
                    self.emit(ContainerEvent::Materialized { key: key.clone() });
                }
                Ok(materialized.instance)
            }
            Err(err) => {
                if let DiError::ProviderError { source, .. } = &err {
                    self.emit(ContainerEvent::ProviderFailed {
                        key: key.clone(),
                        error: format!("{source:#}"),
                    });
                }
                Err(err)
            }
        }
    }

    fn mark_invoked(&self, key: &ServiceKey) {
        if self.read().invoked.contains(key) {
            return;
        }

        let first = {
            let mut registry = self.write();
            registry.services.contains_key(key) && registry.invoked.insert(key.clone())
        };
        if first {
            self.emit(ContainerEvent::Invoked { key: key.clone() });
        }
    }
}
