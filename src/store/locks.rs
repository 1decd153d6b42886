//! Per-QAID serialization of mutating operations.
//!
//! Every edit, publish transition, approval, and rollback on one FAQ must go
//! through its record lock so version numbers stay strictly increasing and
//! concurrent writers cannot lose updates. Read paths never take these locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Registry of per-record mutexes, keyed by QAID.
#[derive(Default)]
pub struct RecordLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock handle for one QAID, creating it on first use.
    pub fn handle(&self, qaid: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(qaid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Guard holding one record lock for the duration of a mutation.
pub struct RecordGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl<'a> RecordGuard<'a> {
    pub fn acquire(handle: &'a Arc<Mutex<()>>) -> Self {
        Self {
            _guard: handle.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }
}
