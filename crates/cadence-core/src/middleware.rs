//! Middleware wrapped around task execution.
//!
//! Middleware registered first is the outermost layer: for `[a, b]` the
//! call order is `a -> b -> task -> b -> a`. A middleware may short-circuit
//! by returning without calling [`Next::run`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::TaskResult;
use crate::task::Task;

#[path = "middleware_builtin.rs"]
mod builtin;

pub use builtin::{LoggingMiddleware, TimingMiddleware};

/// Execution details handed to each middleware.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    pub job_name: String,
    /// 0-based attempt within the current cycle.
    pub attempt: u32,
    pub priority: i32,
    pub schedule: String,
}

/// A layer around task execution.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &MiddlewareContext, next: Next<'_>) -> TaskResult;
}

/// The rest of the chain after the current middleware.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    task: &'a dyn Task,
    ctx: &'a MiddlewareContext,
}

impl<'a> Next<'a> {
    /// Continue into the next middleware, or the task itself at the end of
    /// the chain.
    pub fn run(self) -> BoxFuture<'a, TaskResult> {
        match self.chain.split_first() {
            Some((head, rest)) => head.handle(
                self.ctx,
                Next {
                    chain: rest,
                    task: self.task,
                    ctx: self.ctx,
                },
            ),
            None => self.task.run(),
        }
    }
}

/// Ordered middleware list.
#[derive(Clone, Default)]
pub struct MiddlewarePipeline {
    chain: Vec<Arc<dyn Middleware>>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; it wraps everything registered after it.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.chain.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Run `task` through the chain. An empty chain runs the task directly.
    pub async fn execute(&self, ctx: &MiddlewareContext, task: &dyn Task) -> TaskResult {
        Next {
            chain: &self.chain,
            task,
            ctx,
        }
        .run()
        .await
    }
}

impl fmt::Debug for MiddlewarePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewarePipeline")
            .field("len", &self.chain.len())
            .finish()
    }
}

impl FromIterator<Arc<dyn Middleware>> for MiddlewarePipeline {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Middleware>>>(iter: I) -> Self {
        Self {
            chain: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;
