//! Struct injection entry points.

use std::any::type_name;
use std::iter;
use std::sync::Arc;

use super::Container;
use crate::config::MissingPolicy;
use crate::error::DiError;
use crate::events::ContainerEvent;
use crate::inject::{FieldNames, Inject};
use crate::key::ServiceKey;

impl Container {
    /// Populates the `#[inject]` fields of `target`.
    pub fn inject_struct<S: Inject + ?Sized>(&self, target: &mut S) -> Result<(), DiError> {
        self.inject_struct_named(target, &FieldNames::new())
    }

    /// Populates the `#[inject]` fields of `target`, qualifying the service
    /// for each field listed in `names` with the mapped name.
    pub fn inject_struct_named<S: Inject + ?Sized>(
        &self,
        target: &mut S,
        names: &FieldNames,
    ) -> Result<(), DiError> {
        target.inject_fields(self, names)
    }

    /// Injects `target` or panics.
    pub fn must_inject_struct<S: Inject + ?Sized>(&self, target: &mut S) {
        if let Err(err) = self.inject_struct(target) {
            panic!("failed to inject {}: {}", type_name::<S>(), err);
        }
    }

    /// Resolves the service for one injected field.
    ///
    /// Tries `T` under `qualifier` first, then the unnamed `T`; either may be
    /// served by an `Arc<T>` registration. Returns `Ok(None)` when nothing
    /// matches and the missing policy is `Skip`.
    #[doc(hidden)]
    pub fn resolve_for_field<T: ?Sized + Send + Sync + 'static>(
        &self,
        owner: &'static str,
        field: &'static str,
        qualifier: Option<&str>,
    ) -> Result<Option<Arc<T>>, DiError> {
        let base = ServiceKey::of::<T>();
        let qualified = qualifier
            .map(|name| ServiceKey::named::<T>(name))
            .filter(ServiceKey::is_named);

        for key in qualified.iter().chain(iter::once(&base)) {
            let found = match self.find::<T>(key) {
                Ok(found) => found,
                Err(DiError::ServiceNotFound { .. }) => continue,
                Err(err) => return Err(err),
            };

            let service = self
                .extract::<T>(&found)?
                .map_err(|actual| DiError::IncompatibleType {
                    field: format!("{owner}.{field}"),
                    expected: type_name::<T>(),
                    actual,
                })?;

            self.mark_invoked(&found.key);
            self.emit(ContainerEvent::Injected {
                key: found.key,
                field: format!("{owner}.{field}"),
            });
            return Ok(Some(service));
        }

        let key = qualified.unwrap_or(base);
        match self.on_missing {
            MissingPolicy::Skip => {
                tracing::debug!(
                    service = %key,
                    owner,
                    field,
                    "No service for injected field, skipping"
                );
                Ok(None)
            }
            MissingPolicy::Fail => Err(DiError::UnresolvedField {
                field: format!("{owner}.{field}"),
                key,
            }),
        }
    }
}
