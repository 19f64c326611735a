//! Server side of the sample remote service.
//!
//! `build_registry` registers every method of the test service, including the
//! constrained and bulkhead-guarded ones. The guarded method blocks on a
//! [`ReleaseGate`] so admission tests control exactly when permits free up.

use std::net::SocketAddr;
use std::sync::Arc;

use courier_guard::Rule;
use courier_proto::{Fault, Violation, WireFormat};
use courier_server::{
    Dispatcher, MethodSpec, RegistryError, RemotingServer, ServerConfig, ServiceRegistry,
};
use tokio::sync::watch;

use crate::model::{Immutable, Scope, User};

/// Permit ceiling of the guarded `throttled` method.
pub const MAX_CONCURRENT_CALLS: u32 = 10;

/// Signal the guarded method blocks on until the test releases it.
#[derive(Debug, Clone)]
pub struct ReleaseGate {
    rx: watch::Receiver<bool>,
}

impl ReleaseGate {
    /// Waits until the gate opens (or its sender is gone).
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// A closed gate plus the sender that opens it (`send(true)`).
pub fn release_gate() -> (watch::Sender<bool>, ReleaseGate) {
    let (tx, rx) = watch::channel(false);
    (tx, ReleaseGate { rx })
}

/// A gate that is already open; for tests not exercising the guarded method.
pub fn open_gate() -> ReleaseGate {
    let (tx, rx) = watch::channel(true);
    drop(tx);
    ReleaseGate { rx }
}

fn user_email_check(bytes: &[u8], format: WireFormat) -> Vec<Violation> {
    match format.decode::<User>(bytes) {
        Ok(user) => match user.email.as_deref() {
            Some(email) if !looks_like_email(email) => {
                vec![Violation::new("email", "must be a well-formed email address")]
            }
            _ => Vec::new(),
        },
        Err(e) => vec![Violation::new("", e.to_string())],
    }
}

fn looks_like_email(value: &str) -> bool {
    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    match parts.next() {
        Some(domain) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

fn lookup_user(username: &str) -> Result<User, Fault> {
    if username.trim().is_empty() {
        return Err(Fault::remote("IllegalArgument", "username must not be blank"));
    }
    Ok(User::named(username))
}

/// Builds the test service's method registry.
pub fn build_registry(throttle_gate: ReleaseGate) -> ServiceRegistry {
    match try_build_registry(throttle_gate) {
        Ok(registry) => registry,
        Err(e) => panic!("test registry construction failed: {e}"),
    }
}

fn try_build_registry(throttle_gate: ReleaseGate) -> Result<ServiceRegistry, RegistryError> {
    let builder = ServiceRegistry::builder()
        .register(
            "TestService",
            MethodSpec::new("ping", &[], |args| {
                Box::pin(async move { args.reply_null() })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("echo", &["String"], |args| {
                Box::pin(async move {
                    match args.get_opt::<String>(0)? {
                        Some(value) => args.reply(&value),
                        None => args.reply_null(),
                    }
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("echoList", &["List<String>"], |args| {
                Box::pin(async move {
                    let values: Vec<String> = args.get(0)?;
                    args.reply(&values)
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("echoArray", &["String[]"], |args| {
                Box::pin(async move {
                    let values: Vec<String> = args.get(0)?;
                    args.reply(&values)
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("echoListWithArray", &["List<String[]>"], |args| {
                Box::pin(async move {
                    let values: Vec<Vec<String>> = args.get(0)?;
                    args.reply(&values)
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("countAndAdd", &["List<String>", "i64"], |args| {
                Box::pin(async move {
                    let values: Vec<String> = args.get(0)?;
                    let delta: i64 = args.get(1)?;
                    args.reply(&(values.len() as i64 + delta))
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("echoImmutable", &["Immutable"], |args| {
                Box::pin(async move {
                    let value: Immutable = args.get(0)?;
                    args.reply(&value)
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("echoScope", &["Scope"], |args| {
                Box::pin(async move {
                    let scope: Scope = args.get(0)?;
                    args.reply(&scope)
                })
            })
            .rule(0, Rule::Required),
        )?
        .register(
            "TestService",
            MethodSpec::new("echoUser", &["User"], |args| {
                Box::pin(async move {
                    let user: User = args.get(0)?;
                    args.reply(&user)
                })
            })
            .rule(0, Rule::Required)
            .rule(
                0,
                Rule::Custom {
                    name: "user_email",
                    check: user_email_check,
                },
            ),
        )?
        .register(
            "TestService",
            MethodSpec::new("loadUser", &["String"], |args| {
                Box::pin(async move {
                    let username: String = args.get(0)?;
                    args.reply(&User::named(&username))
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("searchUser", &["String"], |args| {
                Box::pin(async move {
                    let username: String = args.get(0)?;
                    if username.is_empty() {
                        args.reply(&Vec::<User>::new())
                    } else {
                        args.reply(&vec![User::named(&username)])
                    }
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("loadOptionalUser", &["String"], |args| {
                Box::pin(async move {
                    let username: String = args.get(0)?;
                    if username.is_empty() {
                        args.reply_null()
                    } else {
                        args.reply(&User::named(&username))
                    }
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("loadFutureUser", &["String"], |args| {
                Box::pin(async move {
                    let username: String = args.get(0)?;
                    args.reply(&lookup_user(&username)?)
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("loadListenableUser", &["String"], |args| {
                Box::pin(async move {
                    let username: String = args.get(0)?;
                    args.reply(&lookup_user(&username)?)
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("loadCallableUser", &["String"], |args| {
                Box::pin(async move {
                    let username: String = args.get(0)?;
                    args.reply(&lookup_user(&username)?)
                })
            }),
        )?
        .register(
            "TestService",
            MethodSpec::new("throwException", &["String"], |args| {
                Box::pin(async move {
                    let message: String = args.get(0)?;
                    Err(Fault::remote("IllegalArgument", message))
                })
            }),
        )?
        .register("TestService", {
            let gate = throttle_gate;
            MethodSpec::new("throttled", &[], move |args| {
                let gate = gate.clone();
                Box::pin(async move {
                    gate.wait().await;
                    args.reply_null()
                })
            })
            .bulkhead(MAX_CONCURRENT_CALLS)
        })?;

    Ok(builder.build())
}

/// Binds an ephemeral listener, spawns the server, and returns its address
/// together with the dispatcher for metric assertions.
pub async fn start_server(
    registry: ServiceRegistry,
) -> anyhow::Result<(SocketAddr, Arc<Dispatcher>)> {
    crate::init_tracing();
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry)));
    let server = RemotingServer::new(dispatcher.clone(), ServerConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    Ok((addr, dispatcher))
}
