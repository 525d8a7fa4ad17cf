//! Service slots: how a registered service is stored.

use std::any::{type_name, Any};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::OnceCell;

use crate::container::Container;
use crate::error::DiError;
use crate::events::SlotKind;
use crate::key::ServiceKey;
use crate::waits::{self, ConstructionId, Owner};

/// A type-erased service instance.
///
/// Holds an `Arc<T>` behind `dyn Any`, which lets unsized services such as
/// trait objects live in the same registry as plain structs.
#[derive(Clone)]
pub(crate) struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    pub(crate) fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Type-erased constructor for a lazy slot.
pub(crate) type Provider = Arc<dyn Fn(&Container) -> anyhow::Result<Instance> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Slot {
    Eager(Instance),
    Lazy(Arc<LazySlot>),
    Direct(Instance),
}

impl Slot {
    pub(crate) fn kind(&self) -> SlotKind {
        match self {
            Slot::Eager(_) => SlotKind::Eager,
            Slot::Lazy(_) => SlotKind::Lazy,
            Slot::Direct(_) => SlotKind::Direct,
        }
    }

    /// Type name of the stored value, once there is one.
    pub(crate) fn stored_type_name(&self) -> Option<&'static str> {
        match self {
            Slot::Eager(instance) | Slot::Direct(instance) => Some(instance.type_name()),
            Slot::Lazy(lazy) => lazy.cell.get().map(Instance::type_name),
        }
    }

    pub(crate) fn is_materialized(&self) -> bool {
        match self {
            Slot::Eager(_) | Slot::Direct(_) => true,
            Slot::Lazy(lazy) => lazy.is_materialized(),
        }
    }
}

/// Outcome of a lazy slot lookup.
pub(crate) struct Materialized {
    pub(crate) instance: Instance,
    /// True when this call ran the provider.
    pub(crate) fresh: bool,
}

/// A service built on first use and cached afterwards.
///
/// Construction is serialized by `init`. Before blocking on it, a caller
/// checks the wait-for graph: if the builder is the caller itself, or is
/// blocked on something the caller is building, the resolve fails with
/// `CircularDependency` instead of deadlocking. Other callers wait for the
/// builder and then read the cached instance.
pub(crate) struct LazySlot {
    id: ConstructionId,
    key: ServiceKey,
    provider: Provider,
    cell: OnceCell<Instance>,
    init: Mutex<()>,
}

impl LazySlot {
    pub(crate) fn new(key: ServiceKey, provider: Provider) -> Self {
        Self {
            id: waits::next_id(),
            key,
            provider,
            cell: OnceCell::new(),
            init: Mutex::new(()),
        }
    }

    pub(crate) fn is_materialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub(crate) fn get(&self, container: &Container) -> Result<Materialized, DiError> {
        if let Some(instance) = self.cell.get() {
            return Ok(Materialized {
                instance: instance.clone(),
                fresh: false,
            });
        }

        let _init = waits::wait_for(self.id, || lock(&self.init)).map_err(|_| {
            DiError::CircularDependency {
                key: self.key.clone(),
            }
        })?;
        if let Some(instance) = self.cell.get() {
            return Ok(Materialized {
                instance: instance.clone(),
                fresh: false,
            });
        }

        let _owner = Owner::enter(self.id);
        let instance = (self.provider)(container).map_err(|source| DiError::ProviderError {
            key: self.key.clone(),
            source,
        })?;

        Ok(Materialized {
            instance: self.cell.get_or_init(|| instance).clone(),
            fresh: true,
        })
    }
}

/// Lock a mutex, recovering from poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn lazy<T, F>(provider: F) -> LazySlot
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        LazySlot::new(
            ServiceKey::of::<T>(),
            Arc::new(move |c: &Container| provider(c).map(|v| Instance::new(Arc::new(v)))),
        )
    }

    #[test]
    fn test_instance_downcast() {
        let instance = Instance::new(Arc::new(42u32));
        assert_eq!(*instance.downcast::<u32>().unwrap(), 42);
        assert!(instance.downcast::<u64>().is_none());
        assert_eq!(instance.type_name(), "u32");
    }

    #[test]
    fn test_instance_holds_trait_objects() {
        let value: Arc<dyn Debug + Send + Sync> = Arc::new("hello");
        let instance = Instance::new(value);
        let back = instance.downcast::<dyn Debug + Send + Sync>().unwrap();
        assert_eq!(format!("{:?}", back), "\"hello\"");
    }

    #[test]
    fn test_lazy_runs_provider_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let slot = lazy(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(7u8)
        });
        let container = Container::new();

        assert!(!slot.is_materialized());
        let first = slot.get(&container).unwrap();
        let second = slot.get(&container).unwrap();

        assert!(first.fresh);
        assert!(!second.fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(
            &first.instance.downcast::<u8>().unwrap(),
            &second.instance.downcast::<u8>().unwrap()
        ));
    }

    #[test]
    fn test_lazy_failure_is_retryable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let slot = lazy(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("not yet");
            }
            Ok("ready")
        });
        let container = Container::new();

        let err = slot.get(&container).err().unwrap();
        assert!(matches!(err, DiError::ProviderError { .. }));
        assert!(!slot.is_materialized());

        assert!(slot.get(&container).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_owner_released_after_provider() {
        let slot = lazy(|_| Ok(1u8));
        let container = Container::new();

        slot.get(&container).unwrap();
        assert!(!waits::is_owned(slot.id));
    }

    #[test]
    fn test_reentrant_get_is_circular() {
        let slot = Arc::new(OnceCell::<Arc<LazySlot>>::new());
        let inner = slot.clone();
        let built = Arc::new(lazy(move |c| {
            let err = inner.get().unwrap().get(c).err().unwrap();
            Ok(matches!(err, DiError::CircularDependency { .. }))
        }));
        let _ = slot.set(built.clone());

        let materialized = built.get(&Container::new()).unwrap();
        assert!(*materialized.instance.downcast::<bool>().unwrap());
    }
}
