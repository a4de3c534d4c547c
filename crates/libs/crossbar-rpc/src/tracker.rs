//! In-flight request records for hang detection.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a dispatched call may run before the monitor flags it.
pub const WORKER_TIMEOUT: Duration = Duration::from_micros(10_000_000);

/// Handle naming one exact insertion.
///
/// Keys are not unique (concurrent calls to the same `object.method` are
/// separate records), so removal goes through the handle, never the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedCall(u64);

#[derive(Debug)]
struct TrackedRecord {
    key: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct TrackerState {
    next_handle: u64,
    records: BTreeMap<u64, TrackedRecord>,
}

/// Lock-guarded collection of in-flight `call` records.
///
/// Purely observational: the dispatch path inserts around each broker call so
/// the monitor can see what is running, and nothing here ever gates
/// admission. The lock is held only for the duration of each operation.
#[derive(Debug)]
pub struct RequestTracker {
    state: Mutex<TrackerState>,
    timeout: Duration,
}

impl RequestTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            timeout,
        }
    }

    /// Records a call under `key`, expiring `timeout` from now.
    pub fn track(&self, key: &str) -> TrackedCall {
        let mut state = self.state.lock().expect("request tracker mutex poisoned");
        let handle = state.next_handle;
        state.next_handle += 1;
        state.records.insert(
            handle,
            TrackedRecord {
                key: key.to_string(),
                expires_at: Instant::now() + self.timeout,
            },
        );
        TrackedCall(handle)
    }

    /// Removes exactly the record `call` names. Idempotent.
    pub fn untrack(&self, call: TrackedCall) {
        let mut state = self.state.lock().expect("request tracker mutex poisoned");
        state.records.remove(&call.0);
    }

    /// Reports every record past its expiry as `(key, overdue-by)` without
    /// removing it.
    pub fn scan_expired(&self) -> Vec<(String, Duration)> {
        let now = Instant::now();
        let state = self.state.lock().expect("request tracker mutex poisoned");
        state
            .records
            .values()
            .filter(|record| record.expires_at <= now)
            .map(|record| {
                (
                    record.key.clone(),
                    now.saturating_duration_since(record.expires_at),
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("request tracker mutex poisoned")
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new(WORKER_TIMEOUT)
    }
}
