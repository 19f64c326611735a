//! Declarative service and method descriptors.
//!
//! A proxy is constructed from a method table rather than synthesized at
//! runtime: each entry declares the method's name, its parameter-type
//! signature, how its return value is delivered, and which arguments are
//! required lookup keys checked before any I/O.

use courier_proto::invocation::method_key;
use courier_proto::WireFormat;

/// How a method's declared return type is produced from the raw result.
///
/// Exactly one shape is chosen per method, at proxy construction. The shape
/// governs when the round trip runs: in the calling task (`Sync`), on a
/// background task started immediately (`Future`, `ListenableFuture`), or
/// deferred until the handle is invoked (`Callable`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// The call blocks the caller and returns the value directly.
    Sync,
    /// The call is dispatched immediately; the caller awaits a handle.
    Future,
    /// Like `Future`, with completion callbacks.
    ListenableFuture,
    /// The round trip runs when the returned handle is invoked.
    Callable,
}

/// One entry of a service's declarative method table.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    /// Method name.
    pub name: &'static str,
    /// Declared parameter type names, in order.
    pub signature: &'static [&'static str],
    /// Return-shape classification.
    pub shape: ReturnShape,
    /// Indexes of arguments that must not be null, checked pre-flight.
    pub required: &'static [usize],
}

impl MethodDescriptor {
    /// Describes a method with no required arguments.
    pub const fn new(
        name: &'static str,
        signature: &'static [&'static str],
        shape: ReturnShape,
    ) -> Self {
        Self {
            name,
            signature,
            shape,
            required: &[],
        }
    }

    /// Marks argument indexes as required lookup keys.
    pub const fn required(mut self, required: &'static [usize]) -> Self {
        self.required = required;
        self
    }

    /// Table key of this entry, `name(type1,type2)`.
    pub fn key(&self) -> String {
        method_key(self.name, self.signature)
    }
}

/// Identity and location of a remote service, plus its method table.
///
/// Immutable once the proxy is constructed.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// Service identifier sent with every request.
    pub service: &'static str,
    /// Base URL of the remote endpoint, e.g. `http://localhost:8077`.
    pub endpoint: String,
    /// Serialization mode for this proxy.
    pub format: WireFormat,
    /// Declarative method table.
    pub methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    /// Starts a descriptor for `service` at `endpoint`.
    pub fn new(service: &'static str, endpoint: impl Into<String>, format: WireFormat) -> Self {
        Self {
            service,
            endpoint: endpoint.into(),
            format,
            methods: Vec::new(),
        }
    }

    /// Adds a method-table entry.
    pub fn method(mut self, descriptor: MethodDescriptor) -> Self {
        self.methods.push(descriptor);
        self
    }
}
