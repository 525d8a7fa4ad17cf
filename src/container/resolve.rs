//! Typed resolution.

use std::any::type_name;
use std::sync::Arc;

use super::Container;
use crate::error::DiError;
use crate::key::ServiceKey;
use crate::slot::Slot;

impl Container {
    /// Resolves the unnamed `T`, building it first if it is lazy.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, DiError> {
        self.resolve_key(&ServiceKey::of::<T>())
    }

    /// Resolves `T` registered under `name`.
    ///
    /// Only that exact registration matches; there is no fallback to the
    /// unnamed `T`.
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, DiError> {
        self.resolve_key(&ServiceKey::named::<T>(name))
    }

    /// Like [`resolve`](Self::resolve), but a missing `T` is `Ok(None)`.
    ///
    /// A missing dependency of `T`'s provider is still an error.
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, DiError> {
        optional(&ServiceKey::of::<T>(), self.resolve())
    }

    pub fn try_resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<T>>, DiError> {
        optional(&ServiceKey::named::<T>(name), self.resolve_named(name))
    }

    /// Resolves `T` or panics.
    ///
    /// Meant for startup wiring, where a missing service is a programming error.
    pub fn must_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.resolve()
            .unwrap_or_else(|err| panic!("failed to resolve {}: {}", type_name::<T>(), err))
    }

    pub fn must_resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Arc<T> {
        self.resolve_named(name).unwrap_or_else(|err| {
            panic!("failed to resolve {}#{}: {}", type_name::<T>(), name, err)
        })
    }

    fn resolve_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &ServiceKey,
    ) -> Result<Arc<T>, DiError> {
        let found = self.find::<T>(key)?;
        let service = self
            .extract::<T>(&found)?
            .map_err(|actual| DiError::TypeMismatch {
                key: key.clone(),
                expected: type_name::<T>(),
                actual,
            })?;
        self.mark_invoked(&found.key);
        Ok(service)
    }

    /// Finds the slot serving `T` under `key`.
    ///
    /// When only an `Arc<T>` is registered under the same name, that slot is
    /// used and the extra pointer is stripped on extraction.
    pub(super) fn find<T: ?Sized + 'static>(&self, key: &ServiceKey) -> Result<Found, DiError> {
        match self.lookup(key) {
            Ok(slot) => Ok(Found {
                key: key.clone(),
                slot,
                wrapped: false,
            }),
            Err(DiError::ServiceNotFound { .. }) => {
                let wrapped = ServiceKey::with_name::<Arc<T>>(key.name());
                match self.lookup(&wrapped) {
                    Ok(slot) => Ok(Found {
                        key: wrapped,
                        slot,
                        wrapped: true,
                    }),
                    Err(DiError::ServiceNotFound { .. }) => {
                        Err(DiError::ServiceNotFound { key: key.clone() })
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Materializes `found` and takes `T` out of it. The inner `Err` carries
    /// the stored type name when it is not `T`.
    pub(super) fn extract<T: ?Sized + Send + Sync + 'static>(
        &self,
        found: &Found,
    ) -> Result<Result<Arc<T>, &'static str>, DiError> {
        let instance = self.materialize(&found.key, &found.slot)?;
        let service = if found.wrapped {
            instance
                .downcast::<Arc<T>>()
                .map(|outer| Arc::clone(&*outer))
        } else {
            instance.downcast::<T>()
        };
        Ok(service.ok_or(instance.type_name()))
    }

    /// Finds the slot for `key`.
    ///
    /// A key whose eager provider is running on this thread is a cycle, not
    /// a missing service.
    pub(super) fn lookup(&self, key: &ServiceKey) -> Result<Slot, DiError> {
        let registry = self.read();
        if let Some(slot) = registry.services.get(key) {
            return Ok(slot.clone());
        }

        if registry
            .constructing
            .get(key)
            .is_some_and(|flight| flight.is_current_thread())
        {
            Err(DiError::CircularDependency { key: key.clone() })
        } else {
            Err(DiError::ServiceNotFound { key: key.clone() })
        }
    }
}

/// A slot located for a typed request.
pub(super) struct Found {
    /// Key the slot is registered under.
    pub(super) key: ServiceKey,
    slot: Slot,
    /// The slot holds `Arc<T>` rather than `T`.
    wrapped: bool,
}

fn optional<T: ?Sized>(
    requested: &ServiceKey,
    result: Result<Arc<T>, DiError>,
) -> Result<Option<Arc<T>>, DiError> {
    match result {
        Ok(service) => Ok(Some(service)),
        Err(DiError::ServiceNotFound { key }) if key == *requested => Ok(None),
        Err(err) => Err(err),
    }
}
