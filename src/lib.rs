//! xdi - Service Container
//!
//! A runtime registry mapping a service type (and optional name) to an eager
//! instance, a lazy provider, or a value set directly. Lazy providers detect
//! dependency cycles instead of deadlocking, and structs receive services
//! through the `Inject` and `FromContainer` derives.

// Lets the derives refer to `::xdi` from inside this crate too.
extern crate self as xdi;

pub mod cli;
pub mod config;
pub mod container;
pub mod error;
pub mod events;
pub mod inject;
pub mod key;
mod slot;
mod waits;

pub use config::{Config, ContainerConfig, MissingPolicy};
pub use container::{Container, ServiceInfo};
pub use error::DiError;
pub use events::{ContainerEvent, EventSink, SlotKind};
pub use inject::{FieldNames, FromContainer, Inject};
pub use key::ServiceKey;

// Re-export derive macros next to the traits they implement
pub use di_macros::{FromContainer, Inject};
