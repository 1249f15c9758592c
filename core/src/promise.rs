//! A request future whose status can be inspected without awaiting it.
//!
//! # Design
//! `EchoPromise` is a composite: a snapshot of the dispatched `HttpRequest`,
//! a write-once settlement slot shared with the task that performs the
//! request, and a shared signal that fires once the slot is filled.
//!
//! - The slot is an `OnceLock`, so the terminal state is written exactly once
//!   and read lock-free by any number of observers afterwards.
//! - The task owns a `SettleGuard`. If the task is torn down before it
//!   settles (runtime shutdown, panicking transport) the guard records
//!   `EchoError::Aborted` on drop, so the signal never fires with the slot
//!   still empty.
//! - `Future` is implemented by delegation to the signal. The promise is
//!   `Unpin` and `Clone`, so it can be awaited through `&mut` and still be
//!   inspected afterwards, or cloned and awaited from several places.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{ready, Context, Poll};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::EchoError;
use crate::http::HttpRequest;
use crate::types::EchoResponse;

/// Lifecycle of an `EchoPromise`. `Loading` moves to exactly one of the
/// terminal states and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EchoPromiseStatus {
    Loading,
    Success,
    Error,
}

type Settlement<T> = Result<EchoResponse<T>, EchoError>;

pub struct EchoPromise<T> {
    request: HttpRequest,
    state: Arc<OnceLock<Settlement<T>>>,
    settled: Shared<BoxFuture<'static, ()>>,
}

impl<T> EchoPromise<T>
where
    T: Send + Sync + 'static,
{
    /// Run `outcome` on the current tokio runtime and settle with its result.
    /// Outside a runtime the promise settles immediately with
    /// `EchoError::NoRuntime`.
    pub(crate) fn spawn<F>(request: HttpRequest, outcome: F) -> Self
    where
        F: Future<Output = Settlement<T>> + Send + 'static,
    {
        let (promise, guard) = Self::pending(request);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    guard.settle(outcome.await);
                });
            }
            Err(_) => guard.settle(Err(EchoError::NoRuntime)),
        }
        promise
    }

    /// A promise that is already settled when returned.
    pub(crate) fn settled(request: HttpRequest, outcome: Settlement<T>) -> Self {
        let (promise, guard) = Self::pending(request);
        guard.settle(outcome);
        promise
    }

    fn pending(request: HttpRequest) -> (Self, SettleGuard<T>) {
        let state = Arc::new(OnceLock::new());
        let (done, waiter) = oneshot::channel::<()>();
        let settled = async move {
            // Resolves when the guard drops its sender, after the slot is set.
            let _ = waiter.await;
        }
        .boxed()
        .shared();
        let guard = SettleGuard {
            state: Arc::clone(&state),
            _done: done,
        };
        let promise = EchoPromise {
            request,
            state,
            settled,
        };
        (promise, guard)
    }
}

impl<T> EchoPromise<T> {
    pub fn status(&self) -> EchoPromiseStatus {
        match self.state.get() {
            None => EchoPromiseStatus::Loading,
            Some(Ok(_)) => EchoPromiseStatus::Success,
            Some(Err(_)) => EchoPromiseStatus::Error,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status() == EchoPromiseStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status() == EchoPromiseStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status() == EchoPromiseStatus::Error
    }

    /// The request exactly as it was handed to the transport.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn response(&self) -> Option<&EchoResponse<T>> {
        self.state.get().and_then(|s| s.as_ref().ok())
    }

    pub fn data(&self) -> Option<&T> {
        self.response().map(|r| &r.data)
    }

    pub fn error(&self) -> Option<&EchoError> {
        self.state.get().and_then(|s| s.as_ref().err())
    }

    pub fn require_data(&self) -> Result<&T, EchoError> {
        self.data().ok_or(EchoError::PreconditionFailed("data"))
    }

    pub fn require_response(&self) -> Result<&EchoResponse<T>, EchoError> {
        self.response()
            .ok_or(EchoError::PreconditionFailed("response"))
    }

    pub fn require_error(&self) -> Result<&EchoError, EchoError> {
        self.error().ok_or(EchoError::PreconditionFailed("error"))
    }

    /// Wait for settlement without taking the value out.
    pub async fn wait(&self) -> EchoPromiseStatus {
        if self.state.get().is_none() {
            self.settled.clone().await;
        }
        self.status()
    }
}

impl<T: Clone> Future for EchoPromise<T> {
    type Output = Result<T, EchoError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.state.get().is_none() {
            ready!(this.settled.poll_unpin(cx));
        }
        Poll::Ready(match this.state.get() {
            Some(Ok(response)) => Ok(response.data.clone()),
            Some(Err(err)) => Err(err.clone()),
            None => Err(EchoError::Aborted),
        })
    }
}

impl<T> Clone for EchoPromise<T> {
    fn clone(&self) -> Self {
        EchoPromise {
            request: self.request.clone(),
            state: Arc::clone(&self.state),
            settled: self.settled.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for EchoPromise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EchoPromise")
            .field("status", &self.status())
            .field("request", &self.request)
            .field("response", &self.response())
            .field("error", &self.error())
            .finish()
    }
}

/// Owned by the settlement task. Dropping it without settling records
/// `Aborted`; dropping `_done` afterwards wakes every waiter.
struct SettleGuard<T> {
    state: Arc<OnceLock<Settlement<T>>>,
    _done: oneshot::Sender<()>,
}

impl<T> SettleGuard<T> {
    fn settle(self, outcome: Settlement<T>) {
        let _ = self.state.set(outcome);
    }
}

impl<T> Drop for SettleGuard<T> {
    fn drop(&mut self) {
        let _ = self.state.set(Err(EchoError::Aborted));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::http::HttpMethod;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "/points/1".to_string(),
            headers: BTreeMap::new(),
            parameters: BTreeMap::new(),
            body: None,
        }
    }

    fn success(x: i32) -> Settlement<serde_json::Value> {
        Ok(EchoResponse {
            data: serde_json::json!({ "x": x }),
            status: 200,
            headers: Vec::new(),
        })
    }

    #[tokio::test]
    async fn starts_loading_until_the_task_settles() {
        let (tx, rx) = oneshot::channel();
        let promise = EchoPromise::spawn(request(), async move {
            rx.await.unwrap_or(Err(EchoError::Aborted))
        });

        assert_eq!(promise.status(), EchoPromiseStatus::Loading);
        assert!(promise.is_loading());
        assert!(promise.data().is_none());
        assert!(promise.error().is_none());
        assert_eq!(promise.require_data(), Err(EchoError::PreconditionFailed("data")));

        tx.send(success(1)).unwrap();
        assert_eq!(promise.wait().await, EchoPromiseStatus::Success);
        assert!(!promise.is_loading());
    }

    #[tokio::test]
    async fn success_populates_response_and_data() {
        let mut promise = EchoPromise::spawn(request(), async { success(1) });
        let data = (&mut promise).await.unwrap();
        assert_eq!(data, serde_json::json!({ "x": 1 }));

        assert_eq!(promise.status(), EchoPromiseStatus::Success);
        assert!(promise.is_success());
        assert!(!promise.is_error());
        assert_eq!(promise.require_data().unwrap(), &serde_json::json!({ "x": 1 }));
        assert_eq!(promise.require_response().unwrap().status, 200);
        assert_eq!(
            promise.require_error(),
            Err(EchoError::PreconditionFailed("error"))
        );
    }

    #[tokio::test]
    async fn failure_sets_error_status() {
        let mut promise: EchoPromise<serde_json::Value> = EchoPromise::spawn(request(), async {
            Err(EchoError::Transport("connection refused".to_string()))
        });
        let err = (&mut promise).await.unwrap_err();
        assert_eq!(err, EchoError::Transport("connection refused".to_string()));

        // A failed request must not report success.
        assert_eq!(promise.status(), EchoPromiseStatus::Error);
        assert!(promise.is_error());
        assert!(!promise.is_success());
        assert_eq!(promise.require_error().unwrap(), &err);
        assert_eq!(promise.require_data(), Err(EchoError::PreconditionFailed("data")));
        assert!(matches!(
            promise.require_response(),
            Err(EchoError::PreconditionFailed("response"))
        ));
    }

    #[tokio::test]
    async fn reads_after_settlement_are_stable() {
        let promise = EchoPromise::spawn(request(), async { success(3) });
        promise.wait().await;
        for _ in 0..3 {
            assert!(promise.is_success());
            assert!(!promise.is_loading());
            assert!(!promise.is_error());
            assert_eq!(promise.data(), Some(&serde_json::json!({ "x": 3 })));
            assert!(promise.error().is_none());
        }
        assert_eq!(promise.clone().await.unwrap(), serde_json::json!({ "x": 3 }));
        assert_eq!(promise.wait().await, EchoPromiseStatus::Success);
    }

    #[tokio::test]
    async fn clones_observe_the_same_settlement() {
        let (tx, rx) = oneshot::channel();
        let first = EchoPromise::spawn(request(), async move {
            rx.await.unwrap_or(Err(EchoError::Aborted))
        });
        let second = first.clone();
        let waiter = tokio::spawn(second);

        tx.send(success(9)).unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), serde_json::json!({ "x": 9 }));
        assert_eq!(first.await.unwrap(), serde_json::json!({ "x": 9 }));
    }

    #[tokio::test]
    async fn panicking_task_settles_as_aborted() {
        let promise = EchoPromise::spawn(
            request(),
            futures::future::lazy(|_| -> Settlement<serde_json::Value> {
                panic!("transport exploded")
            }),
        );
        assert_eq!(promise.wait().await, EchoPromiseStatus::Error);
        assert_eq!(promise.error(), Some(&EchoError::Aborted));
        assert_eq!(promise.await, Err(EchoError::Aborted));
    }

    #[test]
    fn spawning_outside_a_runtime_settles_with_no_runtime() {
        let promise = EchoPromise::spawn(request(), async { success(1) });
        assert!(promise.is_error());
        assert_eq!(promise.error(), Some(&EchoError::NoRuntime));
    }

    #[test]
    fn pre_settled_promise_is_terminal_immediately() {
        let promise = EchoPromise::settled(request(), success(2));
        assert!(promise.is_success());
        assert_eq!(promise.request().url, "/points/1");
        let data = futures::executor::block_on(promise).unwrap();
        assert_eq!(data["x"], 2);
    }
}
