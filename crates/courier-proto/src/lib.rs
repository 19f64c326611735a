#![warn(missing_docs)]

//! Courier wire protocol: invocation request/result types, the closed fault taxonomy,
//! and the binary/JSON wire codecs negotiated per request.

pub mod codec;
pub mod fault;
pub mod invocation;

pub use codec::{ProtoError, WireFormat};
pub use fault::{Fault, FaultCause, Violation};
pub use invocation::{InvocationRequest, InvocationResult};
