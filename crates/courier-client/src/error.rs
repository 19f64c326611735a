//! Client-side error taxonomy.
//!
//! Mirrors the wire-level fault taxonomy, re-raised locally. A remote fault
//! whose type name matches a locally known error reconstructs as that variant
//! (`IllegalArgument`); every other remote type stays classified as a remote
//! error carrying the name verbatim.

use courier_proto::{Fault, FaultCause, ProtoError, Violation};
use thiserror::Error;

/// Terminal failure of a proxied call, as seen by the caller.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Network or connection failure; never retried by the proxy.
    #[error("transport failure: {reason}")]
    Transport {
        /// Description of the underlying transport problem.
        reason: String,
    },

    /// The server rejected the arguments before invoking the target.
    #[error("validation failed with {n} violation(s)", n = .violations.len())]
    Validation {
        /// Violations reported by the server-side validator.
        violations: Vec<Violation>,
    },

    /// The target method failed on the server.
    #[error("remote {type_name}: {message}")]
    Remote {
        /// Server-side error type name, carried verbatim.
        type_name: String,
        /// Server-side error message.
        message: String,
        /// Cause chain, outermost first.
        cause: Vec<FaultCause>,
    },

    /// The server's concurrency limiter refused admission.
    #[error("bulkhead full for {service}.{method}: max {max_concurrent_calls} concurrent calls")]
    AdmissionRejected {
        /// Service the guarded method belongs to.
        service: String,
        /// Guarded method name.
        method: String,
        /// Configured permit ceiling.
        max_concurrent_calls: u32,
    },

    /// An argument violated its contract (locally pre-flight, or reconstructed
    /// from a remote fault of the same type).
    #[error("{message}")]
    IllegalArgument {
        /// Description of the violated contract.
        message: String,
    },

    /// The service descriptor was invalid or the call did not match it.
    #[error("invalid service descriptor: {message}")]
    Descriptor {
        /// What was wrong with the descriptor or the call against it.
        message: String,
    },
}

impl ClientError {
    /// Creates a transport error.
    pub fn transport(reason: impl Into<String>) -> Self {
        ClientError::Transport {
            reason: reason.into(),
        }
    }

    /// Creates an argument-contract error.
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        ClientError::IllegalArgument {
            message: message.into(),
        }
    }

    /// True for argument-contract failures.
    pub fn is_illegal_argument(&self) -> bool {
        matches!(self, ClientError::IllegalArgument { .. })
    }

    /// True for admission (bulkhead full) rejections.
    pub fn is_admission_rejected(&self) -> bool {
        matches!(self, ClientError::AdmissionRejected { .. })
    }
}

impl From<Fault> for ClientError {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::Transport { reason } => ClientError::Transport { reason },
            Fault::Validation { violations } => ClientError::Validation { violations },
            Fault::Remote {
                type_name,
                message,
                cause,
            } => {
                if type_name == "IllegalArgument" {
                    ClientError::IllegalArgument { message }
                } else {
                    ClientError::Remote {
                        type_name,
                        message,
                        cause,
                    }
                }
            }
            Fault::AdmissionRejected {
                service,
                method,
                max_concurrent_calls,
            } => ClientError::AdmissionRejected {
                service,
                method,
                max_concurrent_calls,
            },
            Fault::ArgumentContract { message } => ClientError::IllegalArgument { message },
        }
    }
}

impl From<ProtoError> for ClientError {
    fn from(e: ProtoError) -> Self {
        ClientError::Transport {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_illegal_argument_reconstructs_locally() {
        let err = ClientError::from(Fault::remote("IllegalArgument", "username required"));
        assert!(err.is_illegal_argument());
        assert_eq!(err.to_string(), "username required");
    }

    #[test]
    fn test_unknown_remote_type_stays_remote() {
        let err = ClientError::from(Fault::remote("StorageCorruption", "bad block"));
        match err {
            ClientError::Remote { type_name, .. } => assert_eq!(type_name, "StorageCorruption"),
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[test]
    fn test_admission_fault_maps() {
        let err = ClientError::from(Fault::AdmissionRejected {
            service: "TestService".into(),
            method: "throttled".into(),
            max_concurrent_calls: 10,
        });
        assert!(err.is_admission_rejected());
    }

    #[test]
    fn test_argument_contract_maps_to_illegal_argument() {
        let err = ClientError::from(Fault::argument("key must not be null"));
        assert!(err.is_illegal_argument());
    }
}
