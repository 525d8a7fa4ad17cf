//! Introspection, validation, removal and cloning.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

use super::{Container, Registry};
use crate::error::DiError;
use crate::events::{ContainerEvent, SlotKind};
use crate::key::ServiceKey;
use crate::slot::Slot;

/// Snapshot of one registered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    /// Display form of the key, `type` or `type#name`.
    pub service: String,
    pub name: Option<String>,
    /// Type of the stored instance, or the declared type while a lazy
    /// service is not built yet.
    pub type_name: String,
    pub kind: SlotKind,
    pub invoked: bool,
    pub lazy: bool,
    pub materialized: bool,
}

impl Container {
    /// Lists every registered service, sorted by key.
    pub fn list_services(&self) -> Vec<ServiceInfo> {
        let registry = self.read();
        let mut services: Vec<ServiceInfo> = registry
            .services
            .iter()
            .map(|(key, slot)| ServiceInfo {
                service: key.to_string(),
                name: key.name().map(str::to_owned),
                type_name: slot
                    .stored_type_name()
                    .unwrap_or_else(|| key.type_name())
                    .to_string(),
                kind: slot.kind(),
                invoked: registry.invoked.contains(key),
                lazy: slot.kind() == SlotKind::Lazy,
                materialized: slot.is_materialized(),
            })
            .collect();
        services.sort_by(|a, b| a.service.cmp(&b.service));
        services
    }

    /// Builds every lazy service that is not built yet.
    ///
    /// Successful builds are cached as if resolved, but are not marked
    /// invoked. All failures are collected into [`DiError::Validation`].
    pub fn validate_all(&self) -> Result<(), DiError> {
        let mut pending: Vec<(ServiceKey, Slot)> = self
            .read()
            .services
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Lazy(_)))
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();
        pending.sort_by_key(|(key, _)| key.to_string());

        let failures: Vec<DiError> = pending
            .iter()
            .filter_map(|(key, slot)| self.materialize(key, slot).err())
            .collect();

        if failures.is_empty() {
            tracing::debug!(count = pending.len(), "All lazy services validated");
            Ok(())
        } else {
            Err(DiError::Validation { failures })
        }
    }

    /// Drops every service and all invocation state.
    ///
    /// Values already handed out or injected keep living. An eager provider
    /// still running when the container is cleared has its result dropped.
    pub fn clear(&self) {
        let count = {
            let mut registry = self.write();
            let count = registry.services.len();
            registry.services.clear();
            registry.invoked.clear();
            registry.constructing.clear();
            count
        };
        self.emit(ContainerEvent::Cleared { count });
    }

    /// Removes every registration of `T`, named or not. Returns how many
    /// were removed.
    pub fn remove_service<T: ?Sized + 'static>(&self) -> usize {
        let base = ServiceKey::of::<T>();
        self.remove_where(|key| key.same_type(&base))
    }

    /// Removes the registration of `T` under `name`.
    pub fn remove_named_service<T: ?Sized + 'static>(&self, name: &str) -> bool {
        let target = ServiceKey::named::<T>(name);
        self.remove_where(|key| *key == target) > 0
    }

    fn remove_where(&self, matches: impl Fn(&ServiceKey) -> bool) -> usize {
        let removed: Vec<ServiceKey> = {
            let mut registry = self.write();
            let removed: Vec<ServiceKey> = registry
                .services
                .keys()
                .filter(|key| matches(key))
                .cloned()
                .collect();
            for key in &removed {
                registry.services.remove(key);
                registry.invoked.remove(key);
            }
            removed
        };

        let count = removed.len();
        for key in removed {
            self.emit(ContainerEvent::Removed { key });
        }
        count
    }
}

impl Clone for Container {
    /// Shallow copy: the new container has its own registry and invocation
    /// state, but shares every service instance and lazy slot with `self`.
    fn clone(&self) -> Self {
        let registry = self.read();
        Self {
            registry: RwLock::new(Registry {
                services: registry.services.clone(),
                invoked: registry.invoked.clone(),
                constructing: HashMap::new(),
            }),
            sink: self.sink.clone(),
            on_missing: self.on_missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mailer;
    struct Queue;

    #[test]
    fn test_list_services_reports_state() {
        let container = Container::new();
        container.set_value(Mailer);
        container.set_factory(|| Queue);
        container.resolve::<Mailer>().unwrap();

        let services = container.list_services();
        assert_eq!(services.len(), 2);

        let mailer = services.iter().find(|s| s.service.ends_with("Mailer")).unwrap();
        assert_eq!(mailer.kind, SlotKind::Direct);
        assert!(mailer.invoked);
        assert!(!mailer.lazy);

        let queue = services.iter().find(|s| s.service.ends_with("Queue")).unwrap();
        assert!(queue.lazy);
        assert!(!queue.materialized);
        assert!(!queue.invoked);
    }

    #[test]
    fn test_validate_all_does_not_mark_invoked() {
        let container = Container::new();
        container.set_factory(|| Queue);

        container.validate_all().unwrap();

        let services = container.list_services();
        let info = &services[0];
        assert!(info.materialized);
        assert!(!info.invoked);
    }

    #[test]
    fn test_clear_drops_everything() {
        let container = Container::new();
        container.set_value(Mailer);
        container.set_named_value("bulk", Mailer);
        container.resolve::<Mailer>().unwrap();

        container.clear();

        assert!(container.is_empty());
        assert!(!container.is_invoked(&ServiceKey::of::<Mailer>()));
    }

    #[test]
    fn test_remove_named_leaves_others() {
        let container = Container::new();
        container.set_value(Mailer);
        container.set_named_value("bulk", Mailer);

        assert!(container.remove_named_service::<Mailer>("bulk"));
        assert!(!container.remove_named_service::<Mailer>("bulk"));
        assert!(container.contains::<Mailer>());
    }
}
