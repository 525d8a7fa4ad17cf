//! Service keys: a type identity plus an optional name.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a registered service.
///
/// Two keys are equal when they carry the same `TypeId` and the same name.
/// The type name is kept only for diagnostics. An empty name is the same as
/// no name, so `ServiceKey::named::<T>("")` addresses the unnamed slot.
#[derive(Debug, Clone)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<String>,
}

impl ServiceKey {
    /// Key for the unnamed registration of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::with_name::<T>(None)
    }

    /// Key for the registration of `T` under `name`.
    pub fn named<T: ?Sized + 'static>(name: &str) -> Self {
        Self::with_name::<T>(Some(name))
    }

    pub(crate) fn with_name<T: ?Sized + 'static>(name: Option<&str>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: name.filter(|n| !n.is_empty()).map(str::to_owned),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Whether both keys address the same base type, ignoring names.
    pub fn same_type(&self, other: &ServiceKey) -> bool {
        self.type_id == other.type_id
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}#{}", self.type_name, name),
            None => f.write_str(self.type_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Config;

    #[test]
    fn test_unnamed_and_named_are_distinct() {
        let base = ServiceKey::of::<Config>();
        let dev = ServiceKey::named::<Config>("dev");
        assert_ne!(base, dev);
        assert!(base.same_type(&dev));
        assert!(!base.is_named());
        assert_eq!(dev.name(), Some("dev"));
    }

    #[test]
    fn test_empty_name_is_unnamed() {
        assert_eq!(ServiceKey::named::<Config>(""), ServiceKey::of::<Config>());
    }

    #[test]
    fn test_different_types_never_equal() {
        assert_ne!(ServiceKey::of::<u32>(), ServiceKey::of::<u64>());
        assert!(!ServiceKey::of::<u32>().same_type(&ServiceKey::of::<i32>()));
    }

    #[test]
    fn test_hash_matches_equality() {
        let mut keys = HashSet::new();
        keys.insert(ServiceKey::of::<Config>());
        keys.insert(ServiceKey::named::<Config>("dev"));
        keys.insert(ServiceKey::named::<Config>("dev"));
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&ServiceKey::named::<Config>("")));
    }

    #[test]
    fn test_display() {
        let key = ServiceKey::named::<u32>("port");
        assert_eq!(key.to_string(), "u32#port");
        assert_eq!(ServiceKey::of::<u32>().to_string(), "u32");
    }
}
