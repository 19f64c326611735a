//! Hand-written typed client adapter for the sample remote service.
//!
//! One adapter method per remote method, built on the generic proxy machinery.
//! The method table below mirrors the server-side registration in
//! [`crate::service::build_registry`].

use std::time::Duration;

use courier_client::{
    ClientError, DeferredCall, ListenableCall, MethodDescriptor, RemoteFuture, ReturnShape,
    ServiceDescriptor, ServiceProxy,
};
use courier_proto::WireFormat;

use crate::model::{Immutable, Scope, User};

/// Typed client for `TestService`.
#[derive(Debug, Clone)]
pub struct TestClient {
    proxy: ServiceProxy,
}

impl TestClient {
    /// Connects to a remoting endpoint, e.g. `http://127.0.0.1:8077`.
    pub fn connect(endpoint: &str, format: WireFormat) -> Result<Self, ClientError> {
        let proxy = ServiceProxy::connect(
            Self::descriptor(endpoint, format),
            Duration::from_secs(10),
        )?;
        Ok(Self { proxy })
    }

    /// The service's declarative method table.
    pub fn descriptor(endpoint: &str, format: WireFormat) -> ServiceDescriptor {
        ServiceDescriptor::new("TestService", endpoint, format)
            .method(MethodDescriptor::new("ping", &[], ReturnShape::Sync))
            .method(MethodDescriptor::new("echo", &["String"], ReturnShape::Sync))
            .method(MethodDescriptor::new(
                "echoList",
                &["List<String>"],
                ReturnShape::Sync,
            ))
            .method(MethodDescriptor::new(
                "echoArray",
                &["String[]"],
                ReturnShape::Sync,
            ))
            .method(MethodDescriptor::new(
                "echoListWithArray",
                &["List<String[]>"],
                ReturnShape::Sync,
            ))
            .method(MethodDescriptor::new(
                "countAndAdd",
                &["List<String>", "i64"],
                ReturnShape::Sync,
            ))
            .method(MethodDescriptor::new(
                "echoImmutable",
                &["Immutable"],
                ReturnShape::Sync,
            ))
            .method(MethodDescriptor::new("echoScope", &["Scope"], ReturnShape::Sync))
            .method(MethodDescriptor::new("echoUser", &["User"], ReturnShape::Sync))
            .method(
                MethodDescriptor::new("loadUser", &["String"], ReturnShape::Sync).required(&[0]),
            )
            .method(MethodDescriptor::new(
                "searchUser",
                &["String"],
                ReturnShape::Sync,
            ))
            .method(
                MethodDescriptor::new("loadOptionalUser", &["String"], ReturnShape::Sync)
                    .required(&[0]),
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
            .method(MethodDescriptor::new(
                "throwException",
                &["String"],
                ReturnShape::Sync,
            ))
            .method(MethodDescriptor::new("throttled", &[], ReturnShape::Sync))
    }

    /// Void round trip.
    pub async fn ping(&self) -> Result<(), ClientError> {
        self.proxy
            .invoke_nullable::<()>("ping", &[], self.proxy.args())
            .await
            .map(|_| ())
    }

    /// Echoes a possibly-null string.
    pub async fn echo(&self, value: Option<&str>) -> Result<Option<String>, ClientError> {
        self.proxy
            .invoke_nullable("echo", &["String"], self.proxy.args().push_opt(value))
            .await
    }

    /// Echoes a list.
    pub async fn echo_list(&self, values: &[String]) -> Result<Vec<String>, ClientError> {
        self.proxy
            .invoke("echoList", &["List<String>"], self.proxy.args().push(values))
            .await
    }

    /// Echoes an array.
    pub async fn echo_array(&self, values: &[String]) -> Result<Vec<String>, ClientError> {
        self.proxy
            .invoke("echoArray", &["String[]"], self.proxy.args().push(values))
            .await
    }

    /// Echoes a list of arrays.
    pub async fn echo_list_with_array(
        &self,
        values: &[Vec<String>],
    ) -> Result<Vec<Vec<String>>, ClientError> {
        self.proxy
            .invoke(
                "echoListWithArray",
                &["List<String[]>"],
                self.proxy.args().push(values),
            )
            .await
    }

    /// Counts `values` and adds `delta`.
    pub async fn count_and_add(&self, values: &[String], delta: i64) -> Result<i64, ClientError> {
        self.proxy
            .invoke(
                "countAndAdd",
                &["List<String>", "i64"],
                self.proxy.args().push(values).push(&delta),
            )
            .await
    }

    /// Echoes a value object.
    pub async fn echo_immutable(&self, value: &Immutable) -> Result<Immutable, ClientError> {
        self.proxy
            .invoke("echoImmutable", &["Immutable"], self.proxy.args().push(value))
            .await
    }

    /// Echoes a scope; a null scope is rejected by server-side validation.
    pub async fn echo_scope(&self, scope: Option<Scope>) -> Result<Scope, ClientError> {
        self.proxy
            .invoke(
                "echoScope",
                &["Scope"],
                self.proxy.args().push_opt(scope.as_ref()),
            )
            .await
    }

    /// Echoes a user; the email field is constraint-checked server-side.
    pub async fn echo_user(&self, user: &User) -> Result<User, ClientError> {
        self.proxy
            .invoke("echoUser", &["User"], self.proxy.args().push(user))
            .await
    }

    /// Loads a user; the username is a required lookup key.
    pub async fn load_user(&self, username: Option<&str>) -> Result<User, ClientError> {
        self.proxy
            .invoke("loadUser", &["String"], self.proxy.args().push_opt(username))
            .await
    }

    /// Searches users; an empty pattern yields an empty list.
    pub async fn search_user(&self, username: &str) -> Result<Vec<User>, ClientError> {
        self.proxy
            .invoke("searchUser", &["String"], self.proxy.args().push(username))
            .await
    }

    /// Optional lookup: an unmatched (empty) key is `None`, a null key a fault.
    pub async fn load_optional_user(
        &self,
        username: Option<&str>,
    ) -> Result<Option<User>, ClientError> {
        self.proxy
            .invoke_nullable(
                "loadOptionalUser",
                &["String"],
                self.proxy.args().push_opt(username),
            )
            .await
    }

    /// Future-shaped lookup; dispatched to a background task immediately.
    pub fn load_future_user(&self, username: Option<&str>) -> RemoteFuture<User> {
        self.proxy.invoke_future(
            "loadFutureUser",
            &["String"],
            self.proxy.args().push_opt(username),
        )
    }

    /// Listenable lookup supporting completion callbacks.
    pub fn load_listenable_user(&self, username: Option<&str>) -> ListenableCall<User> {
        self.proxy.invoke_listenable(
            "loadListenableUser",
            &["String"],
            self.proxy.args().push_opt(username),
        )
    }

    /// Callable lookup; the round trip runs when the handle is invoked.
    pub fn load_callable_user(&self, username: Option<&str>) -> DeferredCall<User> {
        self.proxy.invoke_deferred(
            "loadCallableUser",
            &["String"],
            self.proxy.args().push_opt(username),
        )
    }

    /// Always faults remotely with the given message.
    pub async fn throw_exception(&self, message: &str) -> Result<(), ClientError> {
        self.proxy
            .invoke_nullable::<()>(
                "throwException",
                &["String"],
                self.proxy.args().push(message),
            )
            .await
            .map(|_| ())
    }

    /// Calls the bulkhead-guarded method.
    pub async fn throttled(&self) -> Result<(), ClientError> {
        self.proxy
            .invoke_nullable::<()>("throttled", &[], self.proxy.args())
            .await
            .map(|_| ())
    }
}
