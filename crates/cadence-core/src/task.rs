//! Task bodies executed by a job.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskResult;

/// The unit of work a job runs on every fire.
#[async_trait]
pub trait Task: Send + Sync {
    async fn run(&self) -> TaskResult;
}

/// Adapter turning an async closure into a [`Task`].
pub struct FnTask<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send,
{
    async fn run(&self) -> TaskResult {
        (self.f)().await
    }
}

/// Build a shared task from an async closure.
///
/// ```rust
/// use cadence_core::task_fn;
///
/// let task = task_fn(|| async { Ok(()) });
/// ```
pub fn task_fn<F, Fut>(f: F) -> Arc<dyn Task>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    Arc::new(FnTask { f })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_task_fn_runs_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let task = task_fn(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        task.run().await.unwrap();
        task.run().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_task_fn_propagates_error() {
        let task = task_fn(|| async { Err(TaskError::new("disk full")) });
        let err = task.run().await.unwrap_err();
        assert_eq!(err.message(), "disk full");
    }
}
