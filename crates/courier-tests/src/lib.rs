//! Integration harness for the courier remoting stack.
//!
//! Provides a sample remote service — data model, server-side registration with
//! constraints and a guarded method, and a hand-written typed client adapter —
//! plus helpers to stand the service up on an ephemeral listener. The
//! end-to-end tests in `tests/` drive the full HTTP round trip through this
//! harness.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod client;
pub mod model;
pub mod service;

pub use client::TestClient;
pub use model::{Immutable, Scope, User};
pub use service::{
    build_registry, open_gate, release_gate, start_server, ReleaseGate, MAX_CONCURRENT_CALLS,
};

static TRACING: Once = Once::new();

/// Installs the fmt subscriber once for the whole test binary. Honors
/// `RUST_LOG`; silent by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(fmt::layer())
            .with(EnvFilter::from_default_env())
            .try_init();
    });
}
