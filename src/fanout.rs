//! Bounded fork/join over remote work units.
//!
//! One task per unit, at most `limiter` permits in flight, every task raced
//! against a shared operation deadline. The join loop is the single point
//! where results and errors are collected:
//!
//! - the first error wins and aborts every sibling still running
//! - later errors and the cancellations caused by the abort are discarded
//! - the loop always drains the `JoinSet`, so it completes whether zero,
//!   one, or all workers fail

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::error::RemoteError;

/// Deadline shared by every call made on behalf of one operation.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Run a future, failing with `DeadlineExceeded` once the deadline passes.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<RemoteError>,
    {
        match tokio::time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::DeadlineExceeded(self.budget).into()),
        }
    }
}

/// Spawn `work` for every unit and join them all.
///
/// Results come back in completion order.
pub(crate) async fn fork_join<U, R, F, Fut>(
    units: Vec<U>,
    limiter: &Arc<Semaphore>,
    deadline: Deadline,
    work: F,
) -> Result<Vec<R>, RemoteError>
where
    U: Send + 'static,
    R: Send + 'static,
    F: Fn(U) -> Fut,
    Fut: Future<Output = Result<R, RemoteError>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for unit in units {
        let limiter = Arc::clone(limiter);
        let job = work(unit);
        tasks.spawn(async move {
            deadline
                .run(async move {
                    let _permit = limiter.acquire_owned().await.map_err(|_| {
                        RemoteError::Aborted("concurrency limiter closed".to_string())
                    })?;
                    job.await
                })
                .await
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    let mut first_error: Option<RemoteError> = None;

    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => continue,
            Err(e) => Err(RemoteError::Aborted(format!("worker failed: {}", e))),
        };
        match outcome {
            Ok(result) if first_error.is_none() => results.push(result),
            Ok(_) => {}
            Err(e) => {
                if first_error.is_none() {
                    tracing::warn!(error = %e, pending = tasks.len(), "Aborting fan-out after worker error");
                    tasks.abort_all();
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(results),
    }
}
