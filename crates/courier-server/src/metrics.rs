//! Server-side dispatch metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use courier_proto::Fault;
use dashmap::DashMap;
use serde::Serialize;

/// Snapshot of dispatcher metrics at a point in time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerMetricsSnapshot {
    /// Requests received by the dispatcher.
    pub requests_total: u64,
    /// Invocations that returned a value.
    pub success_total: u64,
    /// Requests that could not be decoded.
    pub malformed_total: u64,
    /// Requests naming an unregistered method.
    pub unresolved_total: u64,
    /// Faults produced by constraint validation.
    pub validation_faults_total: u64,
    /// Faults produced by the admission gate.
    pub admission_rejections_total: u64,
    /// Faults produced by target invocation or encoding.
    pub remote_faults_total: u64,
}

/// Thread-safe dispatch metrics collector.
pub struct ServerMetrics {
    requests_total: AtomicU64,
    success_total: AtomicU64,
    malformed_total: AtomicU64,
    unresolved_total: AtomicU64,
    validation_faults_total: AtomicU64,
    admission_rejections_total: AtomicU64,
    remote_faults_total: AtomicU64,
    per_method: DashMap<String, u64>,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerMetrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl ServerMetrics {
    /// Creates a collector with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            success_total: AtomicU64::new(0),
            malformed_total: AtomicU64::new(0),
            unresolved_total: AtomicU64::new(0),
            validation_faults_total: AtomicU64::new(0),
            admission_rejections_total: AtomicU64::new(0),
            remote_faults_total: AtomicU64::new(0),
            per_method: DashMap::new(),
        }
    }

    /// Increments the received-request counter.
    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the success counter.
    pub fn inc_success(&self) {
        self.success_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the malformed-request counter.
    pub fn inc_malformed(&self) {
        self.malformed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the unresolved-method counter.
    pub fn inc_unresolved(&self) {
        self.unresolved_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Classifies a fault into its counter.
    pub fn record_fault(&self, fault: &Fault) {
        match fault {
            Fault::Validation { .. } => {
                self.validation_faults_total.fetch_add(1, Ordering::Relaxed);
            }
            Fault::AdmissionRejected { .. } => {
                self.admission_rejections_total
                    .fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.remote_faults_total.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Counts one completed call against a method key.
    pub fn record_method_call(&self, qualified_name: &str) {
        *self
            .per_method
            .entry(qualified_name.to_string())
            .or_insert(0) += 1;
    }

    /// Calls recorded for a method key.
    pub fn method_calls(&self, qualified_name: &str) -> u64 {
        self.per_method
            .get(qualified_name)
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Returns a counters snapshot.
    pub fn snapshot(&self) -> ServerMetricsSnapshot {
        ServerMetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            success_total: self.success_total.load(Ordering::Relaxed),
            malformed_total: self.malformed_total.load(Ordering::Relaxed),
            unresolved_total: self.unresolved_total.load(Ordering::Relaxed),
            validation_faults_total: self.validation_faults_total.load(Ordering::Relaxed),
            admission_rejections_total: self.admission_rejections_total.load(Ordering::Relaxed),
            remote_faults_total: self.remote_faults_total.load(Ordering::Relaxed),
        }
    }
}
