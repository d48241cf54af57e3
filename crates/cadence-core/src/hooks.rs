//! Lifecycle hooks.
//!
//! Hooks are async callbacks attached to a job event. Hooks for the same
//! event run one after another in registration order; the first failure
//! stops the remaining hooks and surfaces as a [`HookError`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{HookError, TaskError};

/// Points in a job's life where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookEvent {
    /// Job was registered with a scheduler.
    Initialize,
    /// An execution cycle began.
    CycleStart,
    /// An attempt is about to run.
    Start,
    /// An attempt failed and another one is scheduled.
    Retry,
    /// An attempt succeeded.
    Complete,
    /// The cycle failed for good.
    Error,
    /// An execution cycle finished, successfully or not.
    CycleEnd,
}

impl HookEvent {
    pub const ALL: [HookEvent; 7] = [
        HookEvent::Initialize,
        HookEvent::CycleStart,
        HookEvent::Start,
        HookEvent::Retry,
        HookEvent::Complete,
        HookEvent::Error,
        HookEvent::CycleEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::Initialize => "onInitialize",
            HookEvent::CycleStart => "onCycleStart",
            HookEvent::Start => "onStart",
            HookEvent::Retry => "onRetry",
            HookEvent::Complete => "onComplete",
            HookEvent::Error => "onError",
            HookEvent::CycleEnd => "onCycleEnd",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook sees when it is called.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub job_name: String,
    pub event: HookEvent,
    /// 0-based attempt within the current cycle.
    pub attempt: u32,
    /// Retries consumed so far by the job.
    pub retry_count: u32,
    /// Failure that triggered `Retry` or `Error` hooks.
    pub error: Option<TaskError>,
}

impl HookContext {
    pub fn new(job_name: impl Into<String>, event: HookEvent) -> Self {
        Self {
            job_name: job_name.into(),
            event,
            attempt: 0,
            retry_count: 0,
            error: None,
        }
    }

    pub fn with_attempt(mut self, attempt: u32, retry_count: u32) -> Self {
        self.attempt = attempt;
        self.retry_count = retry_count;
        self
    }

    pub fn with_error(mut self, error: TaskError) -> Self {
        self.error = Some(error);
        self
    }
}

/// A lifecycle callback.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, ctx: &HookContext) -> Result<(), TaskError>;
}

/// Adapter turning an async closure into a [`Hook`].
pub struct FnHook<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Hook for FnHook<F>
where
    F: Fn(HookContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    async fn call(&self, ctx: &HookContext) -> Result<(), TaskError> {
        (self.f)(ctx.clone()).await
    }
}

/// Build a shared hook from an async closure taking the call context.
pub fn hook_fn<F, Fut>(f: F) -> Arc<dyn Hook>
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    Arc::new(FnHook { f })
}

/// Per-job registry of hooks keyed by event.
#[derive(Default)]
pub struct LifecycleHooks {
    hooks: RwLock<HashMap<HookEvent, Vec<Arc<dyn Hook>>>>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to an event. Registering the same hook twice makes it
    /// run twice.
    pub fn register(&self, event: HookEvent, hook: Arc<dyn Hook>) {
        self.hooks.write().entry(event).or_default().push(hook);
    }

    /// Remove every registration of `hook` for `event`, matched by identity.
    pub fn unregister(&self, event: HookEvent, hook: &Arc<dyn Hook>) -> bool {
        let mut hooks = self.hooks.write();
        let Some(list) = hooks.get_mut(&event) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| !Arc::ptr_eq(h, hook));
        before != list.len()
    }

    pub fn count(&self, event: HookEvent) -> usize {
        self.hooks.read().get(&event).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().values().all(Vec::is_empty)
    }

    /// Drop all hooks for one event, or for every event when `None`.
    pub fn clear(&self, event: Option<HookEvent>) {
        let mut hooks = self.hooks.write();
        match event {
            Some(event) => {
                hooks.remove(&event);
            }
            None => hooks.clear(),
        }
    }

    /// Run the hooks registered for `ctx.event`, in order.
    pub async fn execute(&self, ctx: &HookContext) -> Result<(), HookError> {
        let snapshot: Vec<Arc<dyn Hook>> = self
            .hooks
            .read()
            .get(&ctx.event)
            .cloned()
            .unwrap_or_default();

        for hook in snapshot {
            trace!(job = %ctx.job_name, event = %ctx.event, "Running hook");
            hook.call(ctx).await.map_err(|source| HookError {
                job: ctx.job_name.clone(),
                event: ctx.event,
                attempt: ctx.attempt,
                task_failed: ctx.error.is_some(),
                source,
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read();
        let counts: Vec<(HookEvent, usize)> = HookEvent::ALL
            .iter()
            .filter_map(|e| hooks.get(e).map(|v| (*e, v.len())))
            .filter(|(_, n)| *n > 0)
            .collect();
        f.debug_struct("LifecycleHooks").field("hooks", &counts).finish()
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
