//! Registration: eager providers, lazy providers, factories and direct values.
//!
//! Registration is first-writer-wins. Registering a key that already exists
//! is a logged no-op. An eager registration of a key whose eager provider is
//! still running waits for that provider and registers only if it failed;
//! lazy and direct registrations of such a key are ignored.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use super::Container;
use crate::error::DiError;
use crate::events::{ContainerEvent, SlotKind};
use crate::inject::FromContainer;
use crate::key::ServiceKey;
use crate::slot::{Instance, LazySlot, Provider, Slot};
use crate::waits::{self, ConstructionId, Owner};

impl Container {
    /// Builds `T` now and stores it.
    ///
    /// A provider failure is logged and leaves `T` unregistered; use
    /// [`try_register`](Self::try_register) to observe it.
    pub fn register<T, F>(&self, provider: F)
    where
        T: Send + Sync + 'static,
        F: FnOnce(&Container) -> anyhow::Result<T>,
    {
        // Failures are reported through the event log.
        let _ = self.try_register(provider);
    }

    /// Builds `T` now and stores it under `name`.
    pub fn register_named<T, F>(&self, name: &str, provider: F)
    where
        T: Send + Sync + 'static,
        F: FnOnce(&Container) -> anyhow::Result<T>,
    {
        let _ = self.try_register_named(name, provider);
    }

    /// Like [`register`](Self::register), returning the provider error.
    ///
    /// Registering an existing key is still `Ok(())` and never calls `provider`.
    pub fn try_register<T, F>(&self, provider: F) -> Result<(), DiError>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&Container) -> anyhow::Result<T>,
    {
        self.register_eager(ServiceKey::of::<T>(), |c| provider(c).map(Arc::new))
    }

    pub fn try_register_named<T, F>(&self, name: &str, provider: F) -> Result<(), DiError>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&Container) -> anyhow::Result<T>,
    {
        self.register_eager(ServiceKey::named::<T>(name), |c| {
            provider(c).map(Arc::new)
        })
    }

    /// Registers `T` to be built on first resolution and cached afterwards.
    ///
    /// A failed construction is not cached; the next resolution retries.
    pub fn register_lazy<T, F>(&self, provider: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.insert_lazy(ServiceKey::of::<T>(), boxed(provider));
    }

    pub fn register_lazy_named<T, F>(&self, name: &str, provider: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.insert_lazy(ServiceKey::named::<T>(name), boxed(provider));
    }

    /// Lazy registration for services handed out as `Arc<T>`, including
    /// trait objects.
    pub fn register_lazy_shared<T, F>(&self, provider: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> anyhow::Result<Arc<T>> + Send + Sync + 'static,
    {
        self.insert_lazy(ServiceKey::of::<T>(), boxed_shared(provider));
    }

    pub fn register_lazy_shared_named<T, F>(&self, name: &str, provider: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> anyhow::Result<Arc<T>> + Send + Sync + 'static,
    {
        self.insert_lazy(ServiceKey::named::<T>(name), boxed_shared(provider));
    }

    /// Registers `T` lazily, built through its [`FromContainer`] impl.
    pub fn register_lazy_from<T>(&self)
    where
        T: FromContainer + Send + Sync + 'static,
    {
        self.register_lazy(|c| Ok(T::from_container(c)?));
    }

    /// Registers an infallible constructor for `T`.
    ///
    /// The factory runs once, on first resolution; later resolutions share
    /// that instance.
    pub fn set_factory<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_lazy(move |_| Ok(factory()));
    }

    pub fn set_named_factory<T, F>(&self, name: &str, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_lazy_named(name, move |_| Ok(factory()));
    }

    /// Stores an already-built value.
    pub fn set_value<T: Send + Sync + 'static>(&self, value: T) {
        self.set_shared(Arc::new(value));
    }

    pub fn set_named_value<T: Send + Sync + 'static>(&self, name: &str, value: T) {
        self.set_named_shared(name, Arc::new(value));
    }

    /// Stores an already-shared value, such as an `Arc<dyn Trait>`.
    pub fn set_shared<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) {
        self.insert_slot(ServiceKey::of::<T>(), Slot::Direct(Instance::new(value)));
    }

    pub fn set_named_shared<T: ?Sized + Send + Sync + 'static>(&self, name: &str, value: Arc<T>) {
        self.insert_slot(
            ServiceKey::named::<T>(name),
            Slot::Direct(Instance::new(value)),
        );
    }

    fn insert_lazy(&self, key: ServiceKey, provider: Provider) {
        let slot = Slot::Lazy(Arc::new(LazySlot::new(key.clone(), provider)));
        self.insert_slot(key, slot);
    }

    fn insert_slot(&self, key: ServiceKey, slot: Slot) {
        let kind = slot.kind();
        let inserted = {
            let mut registry = self.write();
            if registry.services.contains_key(&key) || registry.constructing.contains_key(&key) {
                false
            } else {
                registry.services.insert(key.clone(), slot);
                true
            }
        };

        if inserted {
            self.emit(ContainerEvent::Registered { key, kind });
        } else {
            self.emit(ContainerEvent::DuplicateIgnored { key });
        }
    }

    fn register_eager<T, F>(&self, key: ServiceKey, provider: F) -> Result<(), DiError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&Container) -> anyhow::Result<Arc<T>>,
    {
        let flight = loop {
            let pending = {
                let mut registry = self.write();
                if registry.services.contains_key(&key) {
                    drop(registry);
                    self.emit(ContainerEvent::DuplicateIgnored { key });
                    return Ok(());
                }
                match registry.constructing.get(&key) {
                    Some(pending) => pending.clone(),
                    None => {
                        let flight = Arc::new(InFlight::new());
                        registry.constructing.insert(key.clone(), flight.clone());
                        break flight;
                    }
                }
            };

            // Another registration of this key is running. Wait for it, then
            // either find the key registered or take over after its failure.
            tracing::debug!(service = %key, "Waiting for in-flight registration");
            if waits::wait_for(pending.id, || pending.wait()).is_err() {
                tracing::warn!(service = %key, "Registration would wait on its own provider");
                return Err(DiError::CircularDependency { key });
            }
        };

        let constructing = ConstructingKey {
            container: self,
            key: &key,
            flight: &flight,
        };
        let owner = Owner::enter(flight.id);
        let outcome = provider(self);
        drop(owner);

        match outcome {
            Ok(value) => {
                let stored = {
                    let mut registry = self.write();
                    let current = registry
                        .constructing
                        .get(&key)
                        .is_some_and(|mark| Arc::ptr_eq(mark, &flight));
                    if current {
                        registry.constructing.remove(&key);
                        registry
                            .services
                            .entry(key.clone())
                            .or_insert_with(|| Slot::Eager(Instance::new(value)));
                    }
                    current
                };
                if stored {
                    self.emit(ContainerEvent::Registered {
                        key: key.clone(),
                        kind: SlotKind::Eager,
                    });
                } else {
                    tracing::debug!(service = %key, "Container cleared during construction, dropping instance");
                }
                drop(constructing);
                Ok(())
            }
            Err(source) => {
                self.emit(ContainerEvent::ProviderFailed {
                    key: key.clone(),
                    error: format!("{source:#}"),
                });
                drop(constructing);
                Err(DiError::ProviderError { key, source })
            }
        }
    }
}

/// An eager provider that is running.
pub(super) struct InFlight {
    id: ConstructionId,
    thread: ThreadId,
    done: Mutex<bool>,
    finished: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            id: waits::next_id(),
            thread: thread::current().id(),
            done: Mutex::new(false),
            finished: Condvar::new(),
        }
    }

    /// Whether the provider runs on the current thread.
    pub(super) fn is_current_thread(&self) -> bool {
        self.thread == thread::current().id()
    }

    fn wait(&self) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        while !*done {
            done = self
                .finished
                .wait(done)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn finish(&self) {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.finished.notify_all();
    }
}

/// Clears an eager key's in-flight mark and wakes waiters, including when
/// the provider panics.
struct ConstructingKey<'a> {
    container: &'a Container,
    key: &'a ServiceKey,
    flight: &'a Arc<InFlight>,
}

impl Drop for ConstructingKey<'_> {
    fn drop(&mut self) {
        {
            let mut registry = self.container.write();
            let current = registry
                .constructing
                .get(self.key)
                .is_some_and(|mark| Arc::ptr_eq(mark, self.flight));
            if current {
                registry.constructing.remove(self.key);
            }
        }
        self.flight.finish();
    }
}

fn boxed<T, F>(provider: F) -> Provider
where
    T: Send + Sync + 'static,
    F: Fn(&Container) -> anyhow::Result<T> + Send + Sync + 'static,
{
    Arc::new(move |c: &Container| provider(c).map(|value| Instance::new(Arc::new(value))))
}

fn boxed_shared<T, F>(provider: F) -> Provider
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&Container) -> anyhow::Result<Arc<T>> + Send + Sync + 'static,
{
    Arc::new(move |c: &Container| provider(c).map(Instance::new))
}
