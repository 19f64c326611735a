#![warn(missing_docs)]

//! Courier client subsystem: service descriptors, the service proxy with its
//! return-shape adaptation (sync, future, listenable future, callable), and the
//! HTTP invoker transport.

pub mod descriptor;
pub mod error;
pub mod handle;
pub mod proxy;
pub mod transport;

pub use descriptor::{MethodDescriptor, ReturnShape, ServiceDescriptor};
pub use error::ClientError;
pub use handle::{DeferredCall, ListenableCall, RemoteFuture};
pub use proxy::{ArgsBuilder, ServiceProxy};
pub use transport::{HttpTransport, InvokerTransport};
