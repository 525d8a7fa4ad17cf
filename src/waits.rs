//! Wait-for graph over in-flight constructions.
//!
//! Every lazy build and eager registration gets a construction id. The graph
//! records which thread runs each construction and which construction each
//! blocked thread is waiting for. Before blocking, a thread follows the chain
//! of owners from the construction it wants; reaching itself means the wait
//! would never end.
//!
//! The graph is process-wide because cloned containers share lazy slots.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use once_cell::sync::Lazy;

pub(crate) type ConstructionId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);
static GRAPH: Lazy<Mutex<WaitGraph>> = Lazy::new(Mutex::default);

pub(crate) fn next_id() -> ConstructionId {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Default)]
struct WaitGraph {
    owners: HashMap<ConstructionId, ThreadId>,
    waiting: HashMap<ThreadId, ConstructionId>,
}

impl WaitGraph {
    /// Whether the owner chain starting at `id` reaches `thread`.
    fn leads_to(&self, id: ConstructionId, thread: ThreadId) -> bool {
        let mut next = self.owners.get(&id);
        for _ in 0..=self.waiting.len() {
            let Some(&owner) = next else {
                return false;
            };
            if owner == thread {
                return true;
            }
            next = self
                .waiting
                .get(&owner)
                .and_then(|wanted| self.owners.get(wanted));
        }
        false
    }
}

/// Waiting would close a cycle of constructions.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Cycle;

/// Runs `block` with the current thread recorded as waiting on `id`.
///
/// Fails without running `block` when the construction is, directly or
/// through other blocked threads, owned by the current thread.
pub(crate) fn wait_for<R>(id: ConstructionId, block: impl FnOnce() -> R) -> Result<R, Cycle> {
    let current = thread::current().id();
    {
        let mut graph = graph();
        if graph.leads_to(id, current) {
            return Err(Cycle);
        }
        graph.waiting.insert(current, id);
    }

    let _waiting = Waiting(current);
    Ok(block())
}

struct Waiting(ThreadId);

impl Drop for Waiting {
    fn drop(&mut self) {
        graph().waiting.remove(&self.0);
    }
}

/// Marks the current thread as running construction `id` until dropped.
pub(crate) struct Owner(ConstructionId);

impl Owner {
    pub(crate) fn enter(id: ConstructionId) -> Self {
        graph().owners.insert(id, thread::current().id());
        Self(id)
    }
}

impl Drop for Owner {
    fn drop(&mut self) {
        graph().owners.remove(&self.0);
    }
}

fn graph() -> MutexGuard<'static, WaitGraph> {
    GRAPH.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
pub(crate) fn is_owned(id: ConstructionId) -> bool {
    graph().owners.contains_key(&id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_owner_cannot_wait_on_itself() {
        let id = next_id();
        let _owner = Owner::enter(id);
        assert_eq!(wait_for(id, || ()), Err(Cycle));
    }

    #[test]
    fn test_unowned_wait_runs_block() {
        assert_eq!(wait_for(next_id(), || 7), Ok(7));
    }

    #[test]
    fn test_owner_mark_cleared_on_drop() {
        let id = next_id();
        {
            let _owner = Owner::enter(id);
            assert!(is_owned(id));
        }
        assert!(!is_owned(id));
    }

    #[test]
    fn test_cycle_through_blocked_thread() {
        let first = next_id();
        let second = next_id();
        let _owner = Owner::enter(first);

        let (ready_tx, ready_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let other = thread::spawn(move || {
            let _owner = Owner::enter(second);
            wait_for(first, || {
                ready_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
        });

        ready_rx.recv().unwrap();
        assert_eq!(wait_for(second, || ()), Err(Cycle));

        release_tx.send(()).unwrap();
        assert!(other.join().unwrap().is_ok());
    }
}
