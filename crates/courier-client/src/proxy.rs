//! The service proxy.
//!
//! Constructed once from a [`ServiceDescriptor`]; the method table is validated
//! up front and immutable afterwards. Every call builds an invocation request,
//! runs the pre-flight required-argument checks before any transport I/O, and
//! adapts the reply into the method's declared return shape. The future-shaped
//! entry points start a background tokio task immediately and therefore must be
//! called from within a runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use courier_proto::invocation::method_key;
use courier_proto::{InvocationRequest, InvocationResult, WireFormat};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::descriptor::{MethodDescriptor, ReturnShape, ServiceDescriptor};
use crate::error::ClientError;
use crate::handle::{DeferredCall, ListenableCall, RemoteFuture};
use crate::transport::{HttpTransport, InvokerTransport};

/// Fluent builder for a call's encoded argument list.
///
/// Encoding problems are remembered and surfaced when the call is prepared,
/// so building chains without intermediate results.
pub struct ArgsBuilder {
    format: WireFormat,
    values: Vec<Option<Vec<u8>>>,
    error: Option<ClientError>,
}

impl ArgsBuilder {
    fn new(format: WireFormat) -> Self {
        Self {
            format,
            values: Vec::new(),
            error: None,
        }
    }

    /// Appends an encoded argument.
    pub fn push<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        if self.error.is_none() {
            match self.format.encode(value) {
                Ok(bytes) => self.values.push(Some(bytes)),
                Err(e) => self.error = Some(e.into()),
            }
        }
        self
    }

    /// Appends a null argument.
    pub fn push_null(mut self) -> Self {
        if self.error.is_none() {
            self.values.push(None);
        }
        self
    }

    /// Appends `Some` as an encoded argument and `None` as null.
    pub fn push_opt<T: Serialize + ?Sized>(self, value: Option<&T>) -> Self {
        match value {
            Some(value) => self.push(value),
            None => self.push_null(),
        }
    }

    fn take(self) -> Result<Vec<Option<Vec<u8>>>, ClientError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.values),
        }
    }
}

struct ProxyInner {
    service: &'static str,
    format: WireFormat,
    methods: HashMap<String, MethodDescriptor>,
    transport: Arc<dyn InvokerTransport>,
}

impl ProxyInner {
    fn lookup(
        &self,
        method: &str,
        signature: &[String],
        shape: ReturnShape,
    ) -> Result<&MethodDescriptor, ClientError> {
        let key = method_key(method, signature);
        let descriptor = self.methods.get(&key).ok_or_else(|| ClientError::Descriptor {
            message: format!("unknown method {}.{key}", self.service),
        })?;
        if descriptor.shape != shape {
            return Err(ClientError::Descriptor {
                message: format!(
                    "method {}.{key} declares {:?} return shape, called as {shape:?}",
                    self.service, descriptor.shape
                ),
            });
        }
        Ok(descriptor)
    }

    /// Builds the request after the pre-flight checks. Runs before any I/O on
    /// every shape; required null arguments never leave the client.
    fn prepare(
        &self,
        method: &str,
        signature: &[String],
        shape: ReturnShape,
        args: ArgsBuilder,
    ) -> Result<InvocationRequest, ClientError> {
        let descriptor = self.lookup(method, signature, shape)?;
        let values = args.take()?;
        if values.len() != descriptor.signature.len() {
            return Err(ClientError::illegal_argument(format!(
                "{}.{} expects {} argument(s), got {}",
                self.service,
                descriptor.key(),
                descriptor.signature.len(),
                values.len()
            )));
        }
        for &index in descriptor.required {
            if values.get(index).map_or(true, |v| v.is_none()) {
                return Err(ClientError::illegal_argument(format!(
                    "argument {index} of {}.{} must not be null",
                    self.service,
                    descriptor.key()
                )));
            }
        }
        Ok(InvocationRequest::new(
            self.service,
            method,
            descriptor.signature,
            values,
        ))
    }

    async fn fetch_nullable<R: DeserializeOwned>(
        &self,
        request: InvocationRequest,
    ) -> Result<Option<R>, ClientError> {
        debug!(call = %request.qualified_name(), format = %self.format, "dispatching remote call");
        let body = self.format.encode(&request)?;
        let reply = self.transport.exchange(self.format, body).await?;
        let result: InvocationResult = self.format.decode(&reply)?;
        match result.into_value().map_err(ClientError::from)? {
            None => Ok(None),
            Some(bytes) => self.format.decode(&bytes).map(Some).map_err(ClientError::from),
        }
    }

    async fn fetch<R: DeserializeOwned>(
        &self,
        request: InvocationRequest,
    ) -> Result<R, ClientError> {
        let qualified = request.qualified_name();
        match self.fetch_nullable(request).await? {
            Some(value) => Ok(value),
            None => Err(ClientError::Remote {
                type_name: "UnexpectedNullReturn".to_string(),
                message: format!("{qualified} returned null"),
                cause: Vec::new(),
            }),
        }
    }
}

/// Client-side stand-in for one remote service. Cheap to clone.
pub struct ServiceProxy {
    inner: Arc<ProxyInner>,
}

impl Clone for ServiceProxy {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl ServiceProxy {
    /// Validates the descriptor's method table and builds a proxy over the
    /// given transport.
    pub fn new(
        descriptor: ServiceDescriptor,
        transport: Arc<dyn InvokerTransport>,
    ) -> Result<Self, ClientError> {
        let mut methods = HashMap::new();
        for method in descriptor.methods {
            for &index in method.required {
                if index >= method.signature.len() {
                    return Err(ClientError::Descriptor {
                        message: format!(
                            "method {}.{} marks argument {index} required but has arity {}",
                            descriptor.service,
                            method.key(),
                            method.signature.len()
                        ),
                    });
                }
            }
            let key = method.key();
            if methods.insert(key.clone(), method).is_some() {
                return Err(ClientError::Descriptor {
                    message: format!("duplicate method {}.{key}", descriptor.service),
                });
            }
        }
        Ok(Self {
            inner: Arc::new(ProxyInner {
                service: descriptor.service,
                format: descriptor.format,
                methods,
                transport,
            }),
        })
    }

    /// Builds a proxy over an HTTP transport to the descriptor's endpoint.
    pub fn connect(descriptor: ServiceDescriptor, timeout: Duration) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpTransport::new(&descriptor.endpoint, timeout));
        Self::new(descriptor, transport)
    }

    /// Service identifier this proxy speaks for.
    pub fn service(&self) -> &str {
        self.inner.service
    }

    /// Serialization mode of this proxy.
    pub fn format(&self) -> WireFormat {
        self.inner.format
    }

    /// Starts an argument list in this proxy's wire format.
    pub fn args(&self) -> ArgsBuilder {
        ArgsBuilder::new(self.inner.format)
    }

    /// Synchronous call; faults if the server returns null.
    pub async fn invoke<R: DeserializeOwned>(
        &self,
        method: &str,
        signature: &[&str],
        args: ArgsBuilder,
    ) -> Result<R, ClientError> {
        let signature = owned_signature(signature);
        let request = self
            .inner
            .prepare(method, &signature, ReturnShape::Sync, args)?;
        self.inner.fetch(request).await
    }

    /// Synchronous call mapping a null or absent result to `None`.
    pub async fn invoke_nullable<R: DeserializeOwned>(
        &self,
        method: &str,
        signature: &[&str],
        args: ArgsBuilder,
    ) -> Result<Option<R>, ClientError> {
        let signature = owned_signature(signature);
        let request = self
            .inner
            .prepare(method, &signature, ReturnShape::Sync, args)?;
        self.inner.fetch_nullable(request).await
    }

    /// Dispatches the round trip to a background task immediately. Pre-flight
    /// faults surface through the handle's failure channel, still before any
    /// transport I/O.
    pub fn invoke_future<R>(
        &self,
        method: &str,
        signature: &[&str],
        args: ArgsBuilder,
    ) -> RemoteFuture<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let inner = self.inner.clone();
        let method = method.to_string();
        let signature = owned_signature(signature);
        RemoteFuture::spawn(async move {
            let request = inner.prepare(&method, &signature, ReturnShape::Future, args)?;
            inner.fetch(request).await
        })
    }

    /// Like [`Self::invoke_future`], returning a handle that also accepts
    /// completion callbacks.
    pub fn invoke_listenable<R>(
        &self,
        method: &str,
        signature: &[&str],
        args: ArgsBuilder,
    ) -> ListenableCall<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let inner = self.inner.clone();
        let method = method.to_string();
        let signature = owned_signature(signature);
        ListenableCall::spawn(async move {
            let request =
                inner.prepare(&method, &signature, ReturnShape::ListenableFuture, args)?;
            inner.fetch(request).await
        })
    }

    /// Defers the round trip until the returned handle is invoked.
    pub fn invoke_deferred<R>(
        &self,
        method: &str,
        signature: &[&str],
        args: ArgsBuilder,
    ) -> DeferredCall<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let inner = self.inner.clone();
        let method = method.to_string();
        let signature = owned_signature(signature);
        DeferredCall::new(move || {
            Box::pin(async move {
                let request = inner.prepare(&method, &signature, ReturnShape::Callable, args)?;
                inner.fetch(request).await
            })
        })
    }
}

impl std::fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("service", &self.inner.service)
            .field("format", &self.inner.format)
            .field("methods", &self.inner.methods.len())
            .finish()
    }
}

fn owned_signature(signature: &[&str]) -> Vec<String> {
    signature.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_proto::Fault;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type FakeHandler = Box<dyn Fn(InvocationRequest) -> InvocationResult + Send + Sync>;

    struct FakeTransport {
        calls: AtomicUsize,
        handler: FakeHandler,
    }

    impl FakeTransport {
        fn echo_first_arg() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                handler: Box::new(|request| InvocationResult::Success {
                    value: request.args.into_iter().next().flatten(),
                }),
            })
        }

        fn faulting(fault: Fault) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                handler: Box::new(move |_| InvocationResult::fault(fault.clone())),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InvokerTransport for FakeTransport {
        async fn exchange(
            &self,
            format: WireFormat,
            body: Vec<u8>,
        ) -> Result<Vec<u8>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let request: InvocationRequest = format.decode(&body)?;
            let result = (self.handler)(request);
            Ok(format.encode(&result)?)
        }
    }

    fn test_descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new("TestService", "http://localhost:0", WireFormat::Binary)
            .method(MethodDescriptor::new("echo", &["String"], ReturnShape::Sync))
            .method(
                MethodDescriptor::new("loadUser", &["String"], ReturnShape::Sync).required(&[0]),
            )
            .method(
                MethodDescriptor::new("loadFutureUser", &["String"], ReturnShape::Future)
                    .required(&[0]),
            )
            .method(
                MethodDescriptor::new(
                    "loadListenableUser",
                    &["String"],
                    ReturnShape::ListenableFuture,
                )
                .required(&[0]),
            )
            .method(
                MethodDescriptor::new("loadCallableUser", &["String"], ReturnShape::Callable)
                    .required(&[0]),
            )
    }

    fn proxy_over(transport: Arc<FakeTransport>) -> ServiceProxy {
        ServiceProxy::new(test_descriptor(), transport).unwrap()
    }

    #[tokio::test]
    async fn test_sync_echo() {
        let transport = FakeTransport::echo_first_arg();
        let proxy = proxy_over(transport.clone());
        let value: String = proxy
            .invoke("echo", &["String"], proxy.args().push(&"hello".to_string()))
            .await
            .unwrap();
        assert_eq!(value, "hello");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_shapes_return_the_same_value() {
        let transport = FakeTransport::echo_first_arg();
        let proxy = proxy_over(transport.clone());
        let key = "username".to_string();

        let sync: String = proxy
            .invoke("loadUser", &["String"], proxy.args().push(&key))
            .await
            .unwrap();
        let future: String = proxy
            .invoke_future("loadFutureUser", &["String"], proxy.args().push(&key))
            .get()
            .await
            .unwrap();
        let listenable: String = proxy
            .invoke_listenable("loadListenableUser", &["String"], proxy.args().push(&key))
            .get()
            .await
            .unwrap();
        let callable: String = proxy
            .invoke_deferred("loadCallableUser", &["String"], proxy.args().push(&key))
            .call()
            .await
            .unwrap();

        assert_eq!(sync, key);
        assert_eq!(future, key);
        assert_eq!(listenable, key);
        assert_eq!(callable, key);
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test]
    async fn test_null_required_key_never_reaches_the_transport() {
        let transport = FakeTransport::echo_first_arg();
        let proxy = proxy_over(transport.clone());

        let err = proxy
            .invoke::<String>("loadUser", &["String"], proxy.args().push_null())
            .await
            .unwrap_err();
        assert!(err.is_illegal_argument());

        let err = proxy
            .invoke_future::<String>("loadFutureUser", &["String"], proxy.args().push_null())
            .get()
            .await
            .unwrap_err();
        assert!(err.is_illegal_argument());

        let err = proxy
            .invoke_listenable::<String>(
                "loadListenableUser",
                &["String"],
                proxy.args().push_null(),
            )
            .get()
            .await
            .unwrap_err();
        assert!(err.is_illegal_argument());

        let err = proxy
            .invoke_deferred::<String>("loadCallableUser", &["String"], proxy.args().push_null())
            .call()
            .await
            .unwrap_err();
        assert!(err.is_illegal_argument());

        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_rejected() {
        let proxy = proxy_over(FakeTransport::echo_first_arg());
        let err = proxy
            .invoke::<String>(
                "loadFutureUser",
                &["String"],
                proxy.args().push(&"u".to_string()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Descriptor { .. }));
    }

    #[tokio::test]
    async fn test_unknown_method_is_rejected() {
        let proxy = proxy_over(FakeTransport::echo_first_arg());
        let err = proxy
            .invoke::<String>("missing", &[], proxy.args())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Descriptor { .. }));
    }

    #[tokio::test]
    async fn test_arity_mismatch_is_rejected() {
        let proxy = proxy_over(FakeTransport::echo_first_arg());
        let err = proxy
            .invoke::<String>("echo", &["String"], proxy.args())
            .await
            .unwrap_err();
        assert!(err.is_illegal_argument());
    }

    #[test]
    fn test_duplicate_method_table_rejected_at_construction() {
        let descriptor = ServiceDescriptor::new("S", "http://localhost:0", WireFormat::Binary)
            .method(MethodDescriptor::new("echo", &["String"], ReturnShape::Sync))
            .method(MethodDescriptor::new("echo", &["String"], ReturnShape::Future));
        let result = ServiceProxy::new(descriptor, FakeTransport::echo_first_arg());
        assert!(matches!(result, Err(ClientError::Descriptor { .. })));
    }

    #[test]
    fn test_required_index_out_of_range_rejected_at_construction() {
        let descriptor = ServiceDescriptor::new("S", "http://localhost:0", WireFormat::Binary)
            .method(MethodDescriptor::new("echo", &["String"], ReturnShape::Sync).required(&[1]));
        let result = ServiceProxy::new(descriptor, FakeTransport::echo_first_arg());
        assert!(matches!(result, Err(ClientError::Descriptor { .. })));
    }

    #[tokio::test]
    async fn test_overload_distinguished_by_signature() {
        let descriptor = ServiceDescriptor::new("S", "http://localhost:0", WireFormat::Binary)
            .method(MethodDescriptor::new("echo", &[], ReturnShape::Sync))
            .method(MethodDescriptor::new("echo", &["String"], ReturnShape::Sync));
        let proxy = ServiceProxy::new(descriptor, FakeTransport::echo_first_arg()).unwrap();
        // The zero-arg overload has nothing to echo; it resolves and runs.
        let value: Option<String> = proxy.invoke_nullable("echo", &[], proxy.args()).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_nullable_invoke_maps_absent_to_none() {
        let transport = FakeTransport::echo_first_arg();
        let proxy = proxy_over(transport);
        let value: Option<String> = proxy
            .invoke_nullable("echo", &["String"], proxy.args().push_null())
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_remote_fault_classification() {
        let proxy = proxy_over(FakeTransport::faulting(Fault::remote(
            "IllegalArgument",
            "this is a message",
        )));
        let err = proxy
            .invoke::<String>("echo", &["String"], proxy.args().push(&"x".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_illegal_argument());
        assert_eq!(err.to_string(), "this is a message");

        let proxy = proxy_over(FakeTransport::faulting(Fault::AdmissionRejected {
            service: "TestService".into(),
            method: "echo".into(),
            max_concurrent_calls: 3,
        }));
        let err = proxy
            .invoke::<String>("echo", &["String"], proxy.args().push(&"x".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_admission_rejected());
    }

    #[tokio::test]
    async fn test_unexpected_null_return_faults_plain_invoke() {
        let proxy = proxy_over(FakeTransport::echo_first_arg());
        let err = proxy
            .invoke::<String>("echo", &["String"], proxy.args().push_null())
            .await
            .unwrap_err();
        match err {
            ClientError::Remote { type_name, .. } => {
                assert_eq!(type_name, "UnexpectedNullReturn");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }
}
