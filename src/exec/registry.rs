// src/exec/registry.rs

//! Live-process registry shared by supervisors and the shutdown coordinator.
//!
//! A supervisor registers its child right after spawn and gets back a
//! receiver on which at most one [`KillRequest`] will ever arrive. The
//! coordinator drains the registry once; after that the registry is closed
//! and late registrations are refused, so the caller kills its own child.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::engine::CommandName;

/// A request to kill one live process, acknowledged once delivered.
#[derive(Debug)]
pub struct KillRequest {
    pub ack: oneshot::Sender<Result<(), String>>,
}

/// Handle the coordinator uses to reach one live process.
#[derive(Debug)]
pub struct KillHandle {
    pub command: CommandName,
    pub pid: Option<u32>,
    pub tx: oneshot::Sender<KillRequest>,
}

#[derive(Debug, Default)]
struct Inner {
    live: BTreeMap<CommandName, KillHandle>,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LiveProcesses {
    inner: Arc<Mutex<Inner>>,
}

impl LiveProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly spawned process.
    ///
    /// Returns `None` once the registry has been drained for shutdown.
    pub fn register(
        &self,
        command: &str,
        pid: Option<u32>,
    ) -> Option<oneshot::Receiver<KillRequest>> {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        inner.live.insert(
            command.to_string(),
            KillHandle {
                command: command.to_string(),
                pid,
                tx,
            },
        );
        Some(rx)
    }

    /// Forget a process that has exited.
    pub fn deregister(&self, command: &str) {
        self.lock().live.remove(command);
    }

    /// Take every live handle and close the registry.
    pub fn take_all(&self) -> Vec<KillHandle> {
        let mut inner = self.lock();
        inner.closed = true;
        std::mem::take(&mut inner.live).into_values().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<CommandName> {
        self.lock().live.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_all_drains_and_closes() {
        let live = LiveProcesses::new();
        let _a = live.register("a", Some(1)).unwrap();
        let _b = live.register("b", None).unwrap();
        live.deregister("b");

        let handles = live.take_all();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].command, "a");
        assert!(live.is_empty());
        assert!(live.register("c", None).is_none());
        assert!(live.take_all().is_empty());
    }
}
