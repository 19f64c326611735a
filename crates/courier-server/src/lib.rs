#![warn(missing_docs)]

//! Courier server subsystem: explicit service-method registry, the invocation
//! dispatch pipeline (decode, resolve, validate, admit, invoke, encode), the
//! axum HTTP endpoint, and server metrics.

pub mod config;
pub mod dispatcher;
pub mod http;
pub mod metrics;
pub mod registry;

pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use http::RemotingServer;
pub use metrics::{ServerMetrics, ServerMetricsSnapshot};
pub use registry::{ArgList, MethodSpec, RegistryBuilder, RegistryError, ServiceRegistry};
