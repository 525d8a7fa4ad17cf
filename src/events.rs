//! Container state transitions and the optional event sink.
//!
//! Every transition is logged through `tracing`. A sink installed with
//! [`Container::with_event_sink`](crate::Container::with_event_sink) receives
//! the same events; it is best-effort and a panicking sink is ignored.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use crate::key::ServiceKey;

/// Storage kind of a registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Built at registration time.
    Eager,
    /// Built on first resolution, then cached.
    Lazy,
    /// Handed to the container already built.
    Direct,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            SlotKind::Eager => "eager",
            SlotKind::Lazy => "lazy",
            SlotKind::Direct => "direct",
        })
    }
}

/// A container state transition.
#[derive(Debug, Clone)]
pub enum ContainerEvent {
    Registered { key: ServiceKey, kind: SlotKind },
    DuplicateIgnored { key: ServiceKey },
    ProviderFailed { key: ServiceKey, error: String },
    Materialized { key: ServiceKey },
    Invoked { key: ServiceKey },
    Injected { key: ServiceKey, field: String },
    Removed { key: ServiceKey },
    Cleared { count: usize },
}

impl fmt::Display for ContainerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerEvent::Registered { key, kind } => write!(f, "registered {kind} service {key}"),
            ContainerEvent::DuplicateIgnored { key } => {
                write!(f, "service {key} already registered, ignoring")
            }
            ContainerEvent::ProviderFailed { key, error } => {
                write!(f, "provider for {key} failed: {error}")
            }
            ContainerEvent::Materialized { key } => write!(f, "materialized lazy service {key}"),
            ContainerEvent::Invoked { key } => write!(f, "service {key} invoked"),
            ContainerEvent::Injected { key, field } => write!(f, "injected {key} into {field}"),
            ContainerEvent::Removed { key } => write!(f, "removed service {key}"),
            ContainerEvent::Cleared { count } => write!(f, "cleared {count} service(s)"),
        }
    }
}

/// Callback receiving container events.
pub type EventSink = Arc<dyn Fn(&ContainerEvent) + Send + Sync>;

/// Log an event and forward it to the sink, if any.
pub(crate) fn emit(sink: Option<&EventSink>, event: ContainerEvent) {
    match &event {
        ContainerEvent::DuplicateIgnored { key } => {
            tracing::warn!(service = %key, "Service already registered, ignoring")
        }
        ContainerEvent::ProviderFailed { key, error } => {
            tracing::warn!(service = %key, error = %error, "Service provider failed")
        }
        ContainerEvent::Cleared { count } => tracing::debug!(count, "Container cleared"),
        other => tracing::debug!("{}", other),
    }

    if let Some(sink) = sink {
        if catch_unwind(AssertUnwindSafe(|| sink(&event))).is_err() {
            tracing::warn!("Container event sink panicked, event dropped");
        }
    }
}
