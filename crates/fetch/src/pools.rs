use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const DEFAULT_ARTIFACT_LIMIT: usize = 1024;
const DEFAULT_FILE_LIMIT: usize = 64;
const DEFAULT_DIRECT_LIMIT: usize = 4;

const MAX_ARTIFACT_LIMIT: usize = 4096;
const MAX_FILE_LIMIT: usize = 1024;
const MAX_DIRECT_LIMIT: usize = 8;

/// Concurrency budgets for the fetch pools, fixed at startup and never
/// resized afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBudgets {
    /// Many small dependency downloads run in parallel across a dependency
    /// graph, so this tier is wide.
    pub artifact: usize,
    /// Per-file content fetches are heavier per unit, so this tier sits
    /// well below the artifact ceiling.
    pub file: usize,
    /// Direct fetches hit a rate-limited upstream; more than a handful of
    /// concurrent connections risks throttling or a ban.
    pub direct: usize,
}

impl Default for PoolBudgets {
    fn default() -> Self {
        Self {
            artifact: DEFAULT_ARTIFACT_LIMIT,
            file: DEFAULT_FILE_LIMIT,
            direct: DEFAULT_DIRECT_LIMIT,
        }
    }
}

impl PoolBudgets {
    /// Clamps overrides into each tier's safe range.
    pub fn clamped(self) -> Self {
        Self {
            artifact: self.artifact.clamp(1, MAX_ARTIFACT_LIMIT),
            file: self.file.clamp(1, MAX_FILE_LIMIT),
            direct: self.direct.clamp(1, MAX_DIRECT_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub name: &'static str,
    pub limit: usize,
    pub in_flight: usize,
    pub waiters: usize,
}

/// A named fixed-capacity worker pool. Queued work beyond capacity waits in
/// FIFO order rather than being rejected; the queue is unbounded.
#[derive(Clone)]
pub struct Pool {
    name: &'static str,
    limit: usize,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    waiters: Arc<AtomicUsize>,
}

impl Pool {
    fn new(name: &'static str, limit: usize) -> Self {
        Self {
            name,
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            waiters: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits for a worker slot. The permit bounds one unit of fetch work;
    /// dropping it releases the slot.
    pub async fn acquire(&self) -> PoolPermit {
        self.waiters.fetch_add(1, Ordering::Relaxed);
        // The semaphore is never closed; acquire failures are not expected.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("fetch pool semaphore closed"));
        self.waiters.fetch_sub(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        PoolPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            name: self.name,
            limit: self.limit,
            in_flight: self.in_flight.load(Ordering::Relaxed),
            waiters: self.waiters.load(Ordering::Relaxed),
        }
    }
}

pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// The process-wide pool set: created once at startup, shared by reference,
/// torn down only at process exit.
#[derive(Clone)]
pub struct FetchPools {
    general: Pool,
    artifact: Pool,
    file: Pool,
    direct: Pool,
}

impl FetchPools {
    pub fn new(budgets: PoolBudgets) -> Self {
        let budgets = budgets.clamped();
        Self {
            // Miscellaneous background work is never queued behind a budget.
            general: Pool::new("general", Semaphore::MAX_PERMITS),
            artifact: Pool::new("artifact-fetch", budgets.artifact),
            file: Pool::new("file-fetch", budgets.file),
            direct: Pool::new("direct-fetch", budgets.direct),
        }
    }

    pub fn general(&self) -> &Pool {
        &self.general
    }

    pub fn artifact(&self) -> &Pool {
        &self.artifact
    }

    pub fn file(&self) -> &Pool {
        &self.file
    }

    pub fn direct(&self) -> &Pool {
        &self.direct
    }

    pub fn snapshots(&self) -> Vec<PoolSnapshot> {
        vec![
            self.general.snapshot(),
            self.artifact.snapshot(),
            self.file.snapshot(),
            self.direct.snapshot(),
        ]
    }
}

impl Default for FetchPools {
    fn default() -> Self {
        Self::new(PoolBudgets::default())
    }
}
