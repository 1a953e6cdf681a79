//! Snapshot cache for directory scans.
//!
//! Holds the most recent successful scan as an immutable [`Snapshot`]
//! behind an `Arc`. Readers clone the `Arc` under a short read lock and
//! never wait for a scan: scans run outside any lock and the result is
//! swapped in under a short write lock (last writer wins).

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::provider::AppMap;

/// Monotonic time source. Lets tests move time forward without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic TTL tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One completed scan.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub apps: AppMap,
    pub scanned_at: Instant,
}

impl Snapshot {
    /// An empty snapshot, used before the first successful scan.
    pub fn empty(at: Instant) -> Self {
        Self {
            apps: AppMap::new(),
            scanned_at: at,
        }
    }
}

struct Entry {
    snapshot: Arc<Snapshot>,
    expired: bool,
}

/// TTL-governed holder of the current [`Snapshot`].
pub struct SnapshotCache {
    ttl: Duration,
    current: RwLock<Option<Entry>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: RwLock::new(None),
        }
    }

    /// The current snapshot, fresh or stale. `None` before the first scan.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|entry| Arc::clone(&entry.snapshot))
    }

    /// The current snapshot only if it has not been expired and is younger
    /// than the TTL at `now`.
    pub fn fresh(&self, now: Instant) -> Option<Arc<Snapshot>> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        let entry = guard.as_ref()?;
        if entry.expired || now.saturating_duration_since(entry.snapshot.scanned_at) >= self.ttl {
            return None;
        }
        Some(Arc::clone(&entry.snapshot))
    }

    /// Swap in a newly scanned snapshot and return it.
    pub fn store(&self, apps: AppMap, scanned_at: Instant) -> Arc<Snapshot> {
        let snap = Arc::new(Snapshot { apps, scanned_at });
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Entry {
            snapshot: Arc::clone(&snap),
            expired: false,
        });
        snap
    }

    /// Mark the current snapshot stale so the next lookup rescans.
    ///
    /// The data stays readable through [`SnapshotCache::current`].
    pub fn invalidate(&self) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = guard.as_mut() {
            entry.expired = true;
        }
    }
}
