//! Closed fault taxonomy for remote invocations.
//!
//! Every failure a call can produce travels as one of these variants. The server
//! never lets a target exception escape as a transport-level error; it is captured
//! and encoded as a `Fault` inside a normal result reply. The client re-raises the
//! fault locally, preserving the classification and the remote type name, instead
//! of attempting to reconstruct arbitrary exception types across the process
//! boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single constraint violation reported by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Path of the violating value, e.g. `arg0` or `arg0.email`.
    pub path: String,
    /// Human-readable description of the violated constraint.
    pub message: String,
}

impl Violation {
    /// Creates a violation for the given path.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// One link in a remote fault's cause chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultCause {
    /// Type name of the causing error as reported by the server.
    pub type_name: String,
    /// Message of the causing error.
    pub message: String,
}

/// Terminal failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum Fault {
    /// Network or connection failure between client and server.
    #[error("transport failure: {reason}")]
    Transport {
        /// Description of the underlying transport problem.
        reason: String,
    },

    /// The server rejected the arguments before invoking the target.
    #[error("validation failed with {n} violation(s)", n = .violations.len())]
    Validation {
        /// Non-empty set of constraint violations.
        violations: Vec<Violation>,
    },

    /// The target method (or the dispatch around it) failed on the server.
    #[error("remote {type_name}: {message}")]
    Remote {
        /// Type name of the server-side error, carried verbatim.
        type_name: String,
        /// Message of the server-side error.
        message: String,
        /// Cause chain, outermost first.
        cause: Vec<FaultCause>,
    },

    /// The concurrency limiter refused admission for a guarded method.
    #[error("bulkhead full for {service}.{method}: max {max_concurrent_calls} concurrent calls")]
    AdmissionRejected {
        /// Service the guarded method belongs to.
        service: String,
        /// Guarded method name.
        method: String,
        /// Configured permit ceiling.
        max_concurrent_calls: u32,
    },

    /// A required argument failed its local contract before any I/O happened.
    #[error("argument contract violated: {message}")]
    ArgumentContract {
        /// Description of the violated contract.
        message: String,
    },
}

impl Fault {
    /// Creates a transport fault.
    pub fn transport(reason: impl Into<String>) -> Self {
        Fault::Transport {
            reason: reason.into(),
        }
    }

    /// Creates a remote fault with an empty cause chain.
    pub fn remote(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Fault::Remote {
            type_name: type_name.into(),
            message: message.into(),
            cause: Vec::new(),
        }
    }

    /// Creates an argument-contract fault.
    pub fn argument(message: impl Into<String>) -> Self {
        Fault::ArgumentContract {
            message: message.into(),
        }
    }

    /// Returns true for faults raised by the admission gate.
    pub fn is_admission_rejected(&self) -> bool {
        matches!(self, Fault::AdmissionRejected { .. })
    }
}
