//! Struct injection traits.
//!
//! Both traits are normally derived with the macros from `di-macros`:
//!
//! - `#[derive(Inject)]` fills the `#[inject]` fields of an existing value.
//! - `#[derive(FromContainer)]` builds a whole value from the container.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use xdi::{Container, FromContainer, Inject};
//!
//! #[derive(Default, Inject)]
//! struct Handler {
//!     #[inject]
//!     db: Option<Arc<Database>>,
//!     #[inject(name = "dev")]
//!     config: Config,
//!     requests: u64,
//! }
//!
//! #[derive(FromContainer)]
//! struct UserRepository {
//!     db: Arc<Database>,
//!     #[from_container(name = "dev")]
//!     config: Arc<Config>,
//! }
//!
//! let mut handler = Handler::default();
//! container.inject_struct(&mut handler)?;
//! container.register_lazy_from::<UserRepository>();
//! ```
//!
//! Field shapes decide how a stored instance is assigned: `Arc<T>` and
//! `Option<Arc<T>>` share it, `T` and `Option<T>` receive a clone.

use std::collections::HashMap;

use crate::container::Container;
use crate::error::DiError;

/// Per-call service name overrides, keyed by field name.
pub type FieldNames = HashMap<String, String>;

/// A value whose fields can be populated from a [`Container`].
pub trait Inject {
    fn inject_fields(&mut self, container: &Container, names: &FieldNames) -> Result<(), DiError>;
}

impl<T: Inject> Inject for Option<T> {
    fn inject_fields(&mut self, container: &Container, names: &FieldNames) -> Result<(), DiError> {
        match self {
            Some(inner) => inner.inject_fields(container, names),
            None => Ok(()),
        }
    }
}

impl<T: Inject + ?Sized> Inject for Box<T> {
    fn inject_fields(&mut self, container: &Container, names: &FieldNames) -> Result<(), DiError> {
        (**self).inject_fields(container, names)
    }
}

/// A value that can be constructed entirely from a [`Container`].
pub trait FromContainer: Sized {
    fn from_container(container: &Container) -> Result<Self, DiError>;
}
