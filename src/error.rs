//! Container error types.

use thiserror::Error;

use crate::key::ServiceKey;

/// Errors returned by container operations.
#[derive(Error, Debug)]
pub enum DiError {
    #[error("Service not found: {key}")]
    ServiceNotFound { key: ServiceKey },

    #[error("Circular dependency detected while constructing {key}")]
    CircularDependency { key: ServiceKey },

    #[error("Type mismatch for {key}: expected {expected}, found {actual}")]
    TypeMismatch {
        key: ServiceKey,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Incompatible type for field {field}: expected {expected}, found {actual}")]
    IncompatibleType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("No service registered for field {field} ({key})")]
    UnresolvedField { field: String, key: ServiceKey },

    #[error("Provider for {key} failed: {source}")]
    ProviderError {
        key: ServiceKey,
        #[source]
        source: anyhow::Error,
    },

    #[error("{} service(s) failed validation", .failures.len())]
    Validation { failures: Vec<DiError> },
}

impl DiError {
    /// The key this error is about, if it names one.
    pub fn key(&self) -> Option<&ServiceKey> {
        match self {
            DiError::ServiceNotFound { key }
            | DiError::CircularDependency { key }
            | DiError::TypeMismatch { key, .. }
            | DiError::UnresolvedField { key, .. }
            | DiError::ProviderError { key, .. } => Some(key),
            DiError::IncompatibleType { .. } | DiError::Validation { .. } => None,
        }
    }

    /// True if this error, or a provider failure it wraps, is a missing service.
    pub fn is_not_found(&self) -> bool {
        self.any_in_chain(&|err| matches!(err, DiError::ServiceNotFound { .. }))
    }

    /// True if this error, or a provider failure it wraps, is a dependency cycle.
    pub fn is_circular(&self) -> bool {
        self.any_in_chain(&|err| matches!(err, DiError::CircularDependency { .. }))
    }

    fn any_in_chain(&self, pred: &dyn Fn(&DiError) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            DiError::ProviderError { source, .. } => source
                .chain()
                .filter_map(|cause| cause.downcast_ref::<DiError>())
                .any(|cause| cause.any_in_chain(pred)),
            DiError::Validation { failures } => failures.iter().any(|f| f.any_in_chain(pred)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;

    #[test]
    fn test_not_found_message_names_key() {
        let err = DiError::ServiceNotFound {
            key: ServiceKey::named::<u32>("port"),
        };
        assert_eq!(err.to_string(), "Service not found: u32#port");
        assert!(err.is_not_found());
        assert!(!err.is_circular());
    }

    #[test]
    fn test_circular_detected_through_provider_chain() {
        let inner = DiError::CircularDependency {
            key: ServiceKey::of::<Database>(),
        };
        let err = DiError::ProviderError {
            key: ServiceKey::of::<u32>(),
            source: anyhow::Error::new(inner).context("building port"),
        };
        assert!(err.is_circular());
        assert!(!err.is_not_found());
        assert_eq!(err.key(), Some(&ServiceKey::of::<u32>()));
    }

    #[test]
    fn test_validation_counts_failures() {
        let err = DiError::Validation {
            failures: vec![
                DiError::ServiceNotFound {
                    key: ServiceKey::of::<u8>(),
                },
                DiError::CircularDependency {
                    key: ServiceKey::of::<u16>(),
                },
            ],
        };
        assert_eq!(err.to_string(), "2 service(s) failed validation");
        assert!(err.is_circular());
        assert!(err.key().is_none());
    }
}
