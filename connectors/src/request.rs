//! Single-shot request orchestration.
//!
//! A dispatched operation yields exactly one `Result` to whoever awaits its
//! [`RequestHandle`]. Dropping or cancelling the handle aborts the spawned
//! task, which drops the in-flight HTTP future and its connection.

use common::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawns provider operations, optionally bounding how many run at once
#[derive(Debug, Clone, Default)]
pub struct RequestDispatcher {
    root: CancellationToken,
    permits: Option<Arc<Semaphore>>,
}

impl RequestDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// At most `max_in_flight` operations run concurrently; the rest wait
    pub fn bounded(max_in_flight: usize) -> Self {
        Self {
            root: CancellationToken::new(),
            permits: Some(Arc::new(Semaphore::new(max_in_flight.max(1)))),
        }
    }

    pub fn dispatch<T, F>(&self, operation: F) -> RequestHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let token = self.root.child_token();
        let task_token = token.clone();
        let permits = self.permits.clone();

        let task = tokio::spawn(async move {
            let run = async move {
                let _permit = match permits {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire_owned()
                            .await
                            .map_err(|_| Error::Cancelled)?,
                    ),
                    None => None,
                };
                operation.await
            };

            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!("Request cancelled before completion");
                    Err(Error::Cancelled)
                }
                result = run => result,
            }
        });

        RequestHandle { task, token }
    }

    /// Cancel every operation dispatched through this dispatcher
    pub fn cancel_all(&self) {
        self.root.cancel();
    }
}

/// Pending result of one dispatched operation
#[derive(Debug)]
pub struct RequestHandle<T> {
    task: JoinHandle<Result<T>>,
    token: CancellationToken,
}

impl<T> RequestHandle<T> {
    /// Release interest in the result; nothing is delivered afterwards
    pub fn cancel(self) {
        // Drop does the work
    }

    /// Token that cancels this invocation only. Whoever is still awaiting the
    /// handle then sees `Error::Cancelled`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl<T> Future for RequestHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_cancelled() => Poll::Ready(Err(Error::Cancelled)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(Error::InternalError(format!(
                "Request task failed: {}",
                e
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for RequestHandle<T> {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}
