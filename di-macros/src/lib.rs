//! Compile-time struct injection macros for xdi.
//!
//! This crate provides derive macros for DI:
//! - `#[derive(Inject)]` to populate marked fields of an existing value
//! - `#[derive(FromContainer)]` to build a whole value from a container
//!
//! Generated code refers to `::xdi::Container`, `::xdi::Inject`,
//! `::xdi::FromContainer` and `::xdi::DiError`.

use proc_macro::TokenStream;

mod field;
mod from_container;
mod inject;

/// Derive macro for populating fields from a container.
///
/// Only fields carrying `#[inject]` are touched. Each one resolves the
/// service named by the field type; the field's shape decides whether the
/// stored instance is shared or cloned:
///
/// | Field type        | Assigned value            |
/// |-------------------|---------------------------|
/// | `Arc<T>`          | the shared instance       |
/// | `Option<Arc<T>>`  | `Some(shared instance)`   |
/// | `T`               | a clone (`T: Clone`)      |
/// | `Option<T>`       | `Some(clone)`             |
///
/// # Attributes
///
/// - `#[inject]`: resolve the unnamed service.
/// - `#[inject(name = "dev")]`: prefer the service named `dev`, falling back
///   to the unnamed one. An entry for the field in the caller's `FieldNames`
///   map replaces this name.
/// - `#[inject(recurse)]`: after assigning an owned value, inject its fields
///   too. The field type must implement `Inject`.
/// - `#[inject(nested)]`: do not resolve the field; inject into it instead.
///
/// # Example
///
/// ```ignore
/// use xdi::Inject;
///
/// #[derive(Default, Inject)]
/// pub struct Handler {
///     #[inject]
///     db: Option<Arc<Database>>,
///     #[inject(name = "dev")]
///     config: Config,
///     #[inject(nested)]
///     audit: AuditHooks,
///     requests: u64,
/// }
/// ```
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    inject::derive_inject_impl(input)
}

/// Derive macro for types that can be constructed from a container.
///
/// When applied to a struct, generates a `FromContainer` implementation
/// that resolves every field from the container.
///
/// # Requirements
///
/// - `Arc<T>` and `T: Clone` fields must be registered
/// - `Option<Arc<T>>` and `Option<T>` fields are `None` when missing
/// - `#[from_container(name = "x")]` resolves the service named `x`
/// - `#[from_container(default)]` skips resolution and uses `Default`
///
/// # Example
///
/// ```ignore
/// use xdi::FromContainer;
///
/// #[derive(FromContainer)]
/// pub struct UserRepository {
///     db: Arc<Database>,             // container.resolve::<Database>()
///     #[from_container(name = "dev")]
///     config: Config,                // clone of container.resolve_named::<Config>("dev")
///     cache: Option<Arc<Cache>>,     // container.try_resolve::<Cache>()
/// }
///
/// // Generated implementation:
/// // impl FromContainer for UserRepository {
/// //     fn from_container(container: &Container) -> Result<Self, DiError> { ... }
/// // }
/// ```
#[proc_macro_derive(FromContainer, attributes(from_container))]
pub fn derive_from_container(input: TokenStream) -> TokenStream {
    from_container::derive_from_container_impl(input)
}
