//! Call handles delivering a round trip's outcome in the caller's declared shape.
//!
//! `RemoteFuture` and `ListenableCall` are backed by a background task started
//! the moment the call is made; `DeferredCall` runs the round trip only when
//! invoked. Abandoning a handle does not cancel the server-side invocation —
//! there is no cancellation on the wire.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::{oneshot, Notify};

use crate::error::ClientError;

/// Boxed future used by deferred calls.
pub type BoxCallFuture<R> = Pin<Box<dyn Future<Output = Result<R, ClientError>> + Send>>;

/// Handle to a remote call dispatched to a background task.
///
/// Completes with the call's value or its classified error. Also usable as a
/// plain `Future`.
pub struct RemoteFuture<R> {
    rx: oneshot::Receiver<Result<R, ClientError>>,
}

impl<R: Send + 'static> RemoteFuture<R> {
    /// Starts `fut` on a background task and returns the handle.
    pub(crate) fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Result<R, ClientError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            // The receiver may have been abandoned; the call still ran.
            let _ = tx.send(fut.await);
        });
        Self { rx }
    }

    /// Waits for completion and returns the outcome.
    pub async fn get(self) -> Result<R, ClientError> {
        self.await
    }
}

impl<R> Future for RemoteFuture<R> {
    type Output = Result<R, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ClientError::transport(
                "background call aborted before completion",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<R> std::fmt::Debug for RemoteFuture<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFuture").finish_non_exhaustive()
    }
}

type Callback<R> = Box<dyn FnOnce(&Result<R, ClientError>) + Send>;

enum ListenableState<R> {
    Pending(Vec<Callback<R>>),
    Complete(Result<R, ClientError>),
}

struct ListenableShared<R> {
    state: Mutex<ListenableState<R>>,
    done: Notify,
}

/// Handle to a background remote call supporting completion callbacks.
///
/// Each registered callback runs exactly once after the call completes,
/// whether it was registered before or after completion.
pub struct ListenableCall<R> {
    shared: Arc<ListenableShared<R>>,
}

impl<R: Send + 'static> ListenableCall<R> {
    /// Starts `fut` on a background task and returns the handle.
    pub(crate) fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Result<R, ClientError>> + Send + 'static,
    {
        let shared = Arc::new(ListenableShared {
            state: Mutex::new(ListenableState::Pending(Vec::new())),
            done: Notify::new(),
        });
        let task_shared = shared.clone();
        tokio::spawn(async move {
            let result = fut.await;
            let mut state = task_shared
                .state
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            let callbacks = match &mut *state {
                ListenableState::Pending(callbacks) => std::mem::take(callbacks),
                ListenableState::Complete(_) => Vec::new(),
            };
            *state = ListenableState::Complete(result);
            // Callbacks run under the state lock: a registration racing with
            // completion either lands in the pending list or observes the
            // stored result, never both. Keep callbacks short.
            if let ListenableState::Complete(result) = &*state {
                for callback in callbacks {
                    callback(result);
                }
            }
            drop(state);
            task_shared.done.notify_waiters();
        });
        Self { shared }
    }

    /// Registers a callback invoked once with the outcome.
    pub fn on_complete(&self, callback: impl FnOnce(&Result<R, ClientError>) + Send + 'static) {
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
        match &mut *state {
            ListenableState::Pending(callbacks) => callbacks.push(Box::new(callback)),
            ListenableState::Complete(result) => callback(result),
        }
    }

    /// Registers a callback invoked once with the value on success.
    pub fn on_success(&self, callback: impl FnOnce(&R) + Send + 'static) {
        self.on_complete(move |result| {
            if let Ok(value) = result {
                callback(value);
            }
        });
    }

    /// Registers a callback invoked once with the error on failure.
    pub fn on_failure(&self, callback: impl FnOnce(&ClientError) + Send + 'static) {
        self.on_complete(move |result| {
            if let Err(e) = result {
                callback(e);
            }
        });
    }

    /// Waits for completion and returns a copy of the outcome.
    pub async fn get(&self) -> Result<R, ClientError>
    where
        R: Clone,
    {
        loop {
            let notified = self.shared.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(result) = self.try_result() {
                return result;
            }
            notified.await;
        }
    }

    fn try_result(&self) -> Option<Result<R, ClientError>>
    where
        R: Clone,
    {
        let state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            ListenableState::Complete(result) => Some(result.clone()),
            ListenableState::Pending(_) => None,
        }
    }
}

impl<R> std::fmt::Debug for ListenableCall<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenableCall").finish_non_exhaustive()
    }
}

/// Handle that runs the round trip in the calling task when invoked.
pub struct DeferredCall<R> {
    call: Box<dyn FnOnce() -> BoxCallFuture<R> + Send>,
}

impl<R> DeferredCall<R> {
    pub(crate) fn new(call: impl FnOnce() -> BoxCallFuture<R> + Send + 'static) -> Self {
        Self {
            call: Box::new(call),
        }
    }

    /// Performs the deferred round trip, pre-flight checks included.
    pub async fn call(self) -> Result<R, ClientError> {
        (self.call)().await
    }
}

impl<R> std::fmt::Debug for DeferredCall<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredCall").finish_non_exhaustive()
    }
}
