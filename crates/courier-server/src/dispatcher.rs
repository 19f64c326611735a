//! Invocation dispatch pipeline.
//!
//! One pipeline per request: decode, resolve against the registry, enforce the
//! method's guarded-call policy (validation, then admission), invoke the
//! handler, encode the outcome. Every failure on this path — including handler
//! panics — is encoded as a fault reply; a caller can never distinguish a
//! target failure from a normal reply at the transport level.

use std::sync::Arc;

use courier_guard::{ConstraintValidator, RuleValidator};
use courier_proto::{Fault, InvocationRequest, InvocationResult, WireFormat};
use futures::FutureExt;
use tracing::{debug, warn};

use crate::metrics::ServerMetrics;
use crate::registry::{ArgList, ServiceRegistry};

/// Server-side dispatcher: resolves and runs invocation requests.
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    validator: Arc<dyn ConstraintValidator>,
    metrics: Arc<ServerMetrics>,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry` with the built-in rule validator.
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self::with_validator(registry, Arc::new(RuleValidator::new()))
    }

    /// Creates a dispatcher with an application-supplied constraint engine.
    pub fn with_validator(
        registry: Arc<ServiceRegistry>,
        validator: Arc<dyn ConstraintValidator>,
    ) -> Self {
        Self {
            registry,
            validator,
            metrics: Arc::new(ServerMetrics::new()),
        }
    }

    /// The method registry this dispatcher serves.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Dispatch metrics.
    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }

    /// Byte-level entry point: decodes the request, dispatches it, and encodes
    /// the result. The reply is always an encoded [`InvocationResult`].
    pub async fn dispatch(&self, body: &[u8], format: WireFormat) -> Vec<u8> {
        let result = match format.decode::<InvocationRequest>(body) {
            Ok(request) => self.dispatch_request(request, format).await,
            Err(e) => {
                self.metrics.inc_requests();
                self.metrics.inc_malformed();
                warn!(error = %e, format = %format, "malformed invocation request");
                InvocationResult::fault(Fault::remote("MalformedRequest", e.to_string()))
            }
        };
        match format.encode(&result) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "result encoding failed");
                let fallback = InvocationResult::fault(Fault::transport(format!(
                    "result encoding failed: {e}"
                )));
                format.encode(&fallback).unwrap_or_default()
            }
        }
    }

    /// Dispatches a decoded request through resolve, policy enforcement, and
    /// handler invocation.
    pub async fn dispatch_request(
        &self,
        request: InvocationRequest,
        format: WireFormat,
    ) -> InvocationResult {
        self.metrics.inc_requests();
        let qualified = request.qualified_name();

        let target = match self
            .registry
            .resolve(&request.service, &request.method, &request.signature)
        {
            Some(target) => target,
            None => {
                self.metrics.inc_unresolved();
                warn!(call = %qualified, "no registered method");
                let fault =
                    Fault::remote("MethodNotFound", format!("no registered method {qualified}"));
                self.metrics.record_fault(&fault);
                return InvocationResult::fault(fault);
            }
        };

        // Held until the end of this scope so the slot frees on every path.
        let _permit = match target.policy().enforce(self.validator.as_ref(), &request, format) {
            Ok(permit) => permit,
            Err(fault) => {
                self.metrics.record_fault(&fault);
                return InvocationResult::fault(fault);
            }
        };

        let args = ArgList::new(request.args, format);
        let outcome = std::panic::AssertUnwindSafe(target.invoke(args))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(value)) => {
                self.metrics.inc_success();
                self.metrics.record_method_call(&qualified);
                debug!(call = %qualified, "invocation completed");
                InvocationResult::Success { value }
            }
            Ok(Err(fault)) => {
                self.metrics.record_fault(&fault);
                debug!(call = %qualified, fault = %fault, "invocation faulted");
                InvocationResult::fault(fault)
            }
            Err(panic) => {
                let fault = Fault::remote("Panic", panic_message(panic));
                self.metrics.record_fault(&fault);
                warn!(call = %qualified, "handler panicked");
                InvocationResult::fault(fault)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
