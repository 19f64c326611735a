//! Explicit service-method registry.
//!
//! Methods are registered once at startup, keyed by (service, method name,
//! parameter type signature), and resolved by exact key at dispatch time. There
//! is no runtime reflection: each entry carries its handler closure and its
//! guarded-call policy, and overloads are distinct entries distinguished by
//! signature.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use courier_guard::{CallPolicy, Rule};
use courier_proto::invocation::method_key;
use courier_proto::{Fault, WireFormat};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while building the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two registrations share a (service, method, signature) key.
    #[error("duplicate method registration: {service}.{key}")]
    DuplicateMethod {
        /// Service the duplicate belongs to.
        service: String,
        /// Method key, `name(type1,type2)`.
        key: String,
    },
}

/// Boxed future returned by a method handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, Fault>> + Send>>;

/// A registered method's invocation closure. Receives the owned argument list
/// and returns the encoded return value (`None` for void/null) or a fault.
pub type MethodHandler = Arc<dyn Fn(ArgList) -> HandlerFuture + Send + Sync>;

/// Owned, decoded-on-demand view of one call's arguments.
#[derive(Debug, Clone)]
pub struct ArgList {
    args: Vec<Option<Vec<u8>>>,
    format: WireFormat,
}

impl ArgList {
    /// Wraps raw arguments encoded in `format`.
    pub fn new(args: Vec<Option<Vec<u8>>>, format: WireFormat) -> Self {
        Self { args, format }
    }

    /// Number of arguments supplied by the caller.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// True when the call carried no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Wire format this call was encoded in.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Decodes the argument at `index`, faulting on null or absent slots.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, Fault> {
        match self.args.get(index) {
            Some(Some(bytes)) => self
                .format
                .decode(bytes)
                .map_err(|e| Fault::remote("DecodeError", e.to_string())),
            Some(None) => Err(Fault::remote(
                "IllegalArgument",
                format!("argument {index} must not be null"),
            )),
            None => Err(Fault::remote(
                "IllegalArgument",
                format!("argument {index} is missing"),
            )),
        }
    }

    /// Decodes the argument at `index`, mapping null to `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, Fault> {
        match self.args.get(index) {
            Some(Some(bytes)) => self
                .format
                .decode(bytes)
                .map(Some)
                .map_err(|e| Fault::remote("DecodeError", e.to_string())),
            Some(None) | None => Ok(None),
        }
    }

    /// Encodes a return value in the call's wire format.
    pub fn reply<T: Serialize + ?Sized>(&self, value: &T) -> Result<Option<Vec<u8>>, Fault> {
        self.format
            .encode(value)
            .map(Some)
            .map_err(|e| Fault::remote("EncodeError", e.to_string()))
    }

    /// A void or null return.
    pub fn reply_null(&self) -> Result<Option<Vec<u8>>, Fault> {
        Ok(None)
    }
}

/// Declarative description of one method being registered.
pub struct MethodSpec {
    method: String,
    signature: Vec<String>,
    policy: CallPolicy,
    handler: MethodHandler,
}

impl MethodSpec {
    /// Describes a method with its parameter-type signature and handler.
    pub fn new<F>(method: &str, signature: &[&str], handler: F) -> Self
    where
        F: Fn(ArgList) -> HandlerFuture + Send + Sync + 'static,
    {
        Self {
            method: method.to_string(),
            signature: signature.iter().map(|s| s.to_string()).collect(),
            policy: CallPolicy::new(),
            handler: Arc::new(handler),
        }
    }

    /// Attaches a constraint rule to a parameter.
    pub fn rule(mut self, param: usize, rule: Rule) -> Self {
        self.policy = self.policy.rule(param, rule);
        self
    }

    /// Guards the method with a bulkhead permit ceiling.
    pub fn bulkhead(mut self, max_concurrent_calls: u32) -> Self {
        self.policy = self.policy.bulkhead(max_concurrent_calls);
        self
    }
}

/// A resolved registry entry.
pub struct RegisteredMethod {
    service: String,
    method: String,
    signature: Vec<String>,
    policy: CallPolicy,
    handler: MethodHandler,
}

impl RegisteredMethod {
    /// Service this method belongs to.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Declared parameter type names.
    pub fn signature(&self) -> &[String] {
        &self.signature
    }

    /// The method's guarded-call policy.
    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    /// Registry key within the service, `name(type1,type2)`.
    pub fn key(&self) -> String {
        method_key(&self.method, &self.signature)
    }

    /// Runs the handler with the given arguments.
    pub fn invoke(&self, args: ArgList) -> HandlerFuture {
        (self.handler)(args)
    }
}

impl std::fmt::Debug for RegisteredMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredMethod")
            .field("service", &self.service)
            .field("key", &self.key())
            .finish()
    }
}

/// Builder assembling the registry at startup.
#[derive(Default)]
pub struct RegistryBuilder {
    methods: HashMap<String, Arc<RegisteredMethod>>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one method under a service. Duplicate keys are an error.
    pub fn register(mut self, service: &str, spec: MethodSpec) -> Result<Self, RegistryError> {
        let key = method_key(&spec.method, &spec.signature);
        let full_key = registry_key(service, &key);
        if self.methods.contains_key(&full_key) {
            return Err(RegistryError::DuplicateMethod {
                service: service.to_string(),
                key,
            });
        }
        let entry = RegisteredMethod {
            service: service.to_string(),
            method: spec.method,
            signature: spec.signature,
            policy: spec.policy,
            handler: spec.handler,
        };
        self.methods.insert(full_key, Arc::new(entry));
        Ok(self)
    }

    /// Finalizes the registry. It is immutable from here on.
    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            methods: self.methods,
        }
    }
}

/// Immutable method table shared by the dispatcher.
pub struct ServiceRegistry {
    methods: HashMap<String, Arc<RegisteredMethod>>,
}

impl ServiceRegistry {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Resolves a method by exact (service, method, signature).
    pub fn resolve(
        &self,
        service: &str,
        method: &str,
        signature: &[String],
    ) -> Option<Arc<RegisteredMethod>> {
        let key = registry_key(service, &method_key(method, signature));
        self.methods.get(&key).cloned()
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Iterates all registered methods.
    pub fn methods(&self) -> impl Iterator<Item = &Arc<RegisteredMethod>> {
        self.methods.values()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("methods", &self.methods.len())
            .finish()
    }
}

fn registry_key(service: &str, method_key: &str) -> String {
    format!("{service}#{method_key}")
}
