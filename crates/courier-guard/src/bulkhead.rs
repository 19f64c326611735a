//! Bulkhead admission gate capping concurrent executions of a guarded method.
//!
//! Admission is non-blocking: a call either takes a permit immediately or is
//! rejected. There is no wait queue. The permit is an RAII guard, so release
//! runs on every exit path, including panics. The in-flight counter is adjusted
//! with a lock-free compare-exchange loop, which keeps concurrent admission
//! linearizable: N simultaneous attempts against a ceiling of M admit exactly
//! min(N, M) when no release interleaves.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Statistics snapshot for a bulkhead.
#[derive(Debug, Clone, Default)]
pub struct BulkheadStats {
    /// Configured permit ceiling.
    pub max_concurrent_calls: u32,
    /// Permits currently held.
    pub inflight: u32,
    /// Total admissions granted.
    pub acquired_total: u64,
    /// Total admissions rejected.
    pub rejected_total: u64,
}

/// Bounded-permit gate for one guarded method.
pub struct Bulkhead {
    max_concurrent_calls: u32,
    inflight: AtomicU32,
    acquired_total: AtomicU64,
    rejected_total: AtomicU64,
}

impl Bulkhead {
    /// Creates a bulkhead admitting at most `max_concurrent_calls` concurrent calls.
    pub fn new(max_concurrent_calls: u32) -> Self {
        Self {
            max_concurrent_calls,
            inflight: AtomicU32::new(0),
            acquired_total: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
        }
    }

    /// Attempts to take a permit. Returns `None` immediately when the ceiling
    /// is reached; never blocks or queues.
    pub fn try_acquire(&self) -> Option<BulkheadPermit<'_>> {
        let mut current = self.inflight.load(Ordering::Relaxed);
        loop {
            if current >= self.max_concurrent_calls {
                self.rejected_total.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            match self.inflight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.acquired_total.fetch_add(1, Ordering::Relaxed);
                    return Some(BulkheadPermit { owner: self });
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Configured permit ceiling.
    pub fn max_concurrent_calls(&self) -> u32 {
        self.max_concurrent_calls
    }

    /// Permits currently held.
    pub fn inflight(&self) -> u32 {
        self.inflight.load(Ordering::Acquire)
    }

    /// Returns a statistics snapshot.
    pub fn stats(&self) -> BulkheadStats {
        BulkheadStats {
            max_concurrent_calls: self.max_concurrent_calls,
            inflight: self.inflight.load(Ordering::Acquire),
            acquired_total: self.acquired_total.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bulkhead")
            .field("stats", &self.stats())
            .finish()
    }
}

/// RAII permit; dropping it releases the slot unconditionally.
pub struct BulkheadPermit<'a> {
    owner: &'a Bulkhead,
}

impl Drop for BulkheadPermit<'_> {
    fn drop(&mut self) {
        self.owner.inflight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for BulkheadPermit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkheadPermit")
            .field("inflight", &self.owner.inflight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_acquire_and_release() {
        let bulkhead = Bulkhead::new(2);
        let p1 = bulkhead.try_acquire().unwrap();
        let p2 = bulkhead.try_acquire().unwrap();
        assert_eq!(bulkhead.inflight(), 2);
        assert!(bulkhead.try_acquire().is_none());

        drop(p1);
        assert_eq!(bulkhead.inflight(), 1);
        let p3 = bulkhead.try_acquire().unwrap();
        assert_eq!(bulkhead.inflight(), 2);

        drop(p2);
        drop(p3);
        assert_eq!(bulkhead.inflight(), 0);
    }

    #[test]
    fn test_zero_permits_rejects_all() {
        let bulkhead = Bulkhead::new(0);
        assert!(bulkhead.try_acquire().is_none());
        assert_eq!(bulkhead.stats().rejected_total, 1);
    }

    #[test]
    fn test_stats_counters() {
        let bulkhead = Bulkhead::new(1);
        let permit = bulkhead.try_acquire().unwrap();
        assert!(bulkhead.try_acquire().is_none());
        assert!(bulkhead.try_acquire().is_none());
        drop(permit);

        let stats = bulkhead.stats();
        assert_eq!(stats.acquired_total, 1);
        assert_eq!(stats.rejected_total, 2);
        assert_eq!(stats.inflight, 0);
        assert_eq!(stats.max_concurrent_calls, 1);
    }

    #[test]
    fn test_release_runs_on_panic() {
        let bulkhead = Arc::new(Bulkhead::new(1));
        let inner = bulkhead.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _permit = inner.try_acquire().unwrap();
            panic!("guarded call failed");
        }));
        assert!(result.is_err());
        assert_eq!(bulkhead.inflight(), 0);
        assert!(bulkhead.try_acquire().is_some());
    }

    #[test]
    fn test_racing_admissions_admit_exactly_max() {
        const MAX: u32 = 10;
        const THREADS: usize = 40;

        let bulkhead = Arc::new(Bulkhead::new(MAX));
        let start = Arc::new(Barrier::new(THREADS));
        let release = Arc::new(Barrier::new(THREADS));
        let admitted = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..THREADS {
            let bulkhead = bulkhead.clone();
            let start = start.clone();
            let release = release.clone();
            let admitted = admitted.clone();
            let rejected = rejected.clone();
            handles.push(thread::spawn(move || {
                start.wait();
                let permit = bulkhead.try_acquire();
                match &permit {
                    Some(_) => admitted.fetch_add(1, Ordering::SeqCst),
                    None => rejected.fetch_add(1, Ordering::SeqCst),
                };
                // Hold every successful permit until all threads attempted.
                release.wait();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), MAX as usize);
        assert_eq!(rejected.load(Ordering::SeqCst), THREADS - MAX as usize);
        assert_eq!(bulkhead.inflight(), 0);
    }

    #[test]
    fn test_counter_returns_to_zero_after_churn() {
        let bulkhead = Arc::new(Bulkhead::new(4));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let bulkhead = bulkhead.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    if let Some(permit) = bulkhead.try_acquire() {
                        assert!(bulkhead.inflight() <= 4);
                        drop(permit);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(bulkhead.inflight(), 0);
    }
}
