//! Operation descriptors
//!
//! Operations are named units of work registered in a [`Suite`](crate::Suite).
//! They are built once, never change, and are cheap to clone: the handlers
//! live behind `Arc`s so the same descriptor can be shared across suites
//! and executions.

use crate::context::{wait_for_stop_event, BackgroundContext, Context, DEFAULT_WAIT_TIME};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use upgrade_testing::TestResult;

/// Handler of a plain operation, a background setup or a verification
pub type OperationFn = Arc<dyn Fn(Context) -> BoxFuture<'static, TestResult> + Send + Sync>;

/// Long-running handler of a background operation
pub type BackgroundFn = Arc<dyn Fn(BackgroundContext) -> BoxFuture<'static, ()> + Send + Sync>;

fn operation_fn<F, Fut>(handler: F) -> OperationFn
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TestResult> + Send + 'static,
{
    Arc::new(move |ctx| handler(ctx).boxed())
}

/// An operation that runs once, to completion
#[derive(Clone)]
pub struct Operation {
    name: String,
    handler: OperationFn,
}

impl Operation {
    /// Create a new operation
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TestResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: operation_fn(handler),
        }
    }

    /// Name used for progress lines and as the sub-test name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The operation's handler
    #[inline]
    #[must_use]
    pub fn handler(&self) -> OperationFn {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("name", &self.name).finish_non_exhaustive()
    }
}

/// An operation that keeps running while later phases execute
///
/// `setup` runs synchronously when the continual tests are started. The
/// handler then runs in its own task until it receives a stop event, at
/// which point it verifies its work and finishes the event.
#[derive(Clone)]
pub struct BackgroundOperation {
    name: String,
    setup: OperationFn,
    handler: BackgroundFn,
}

impl BackgroundOperation {
    /// Create a new background operation
    pub fn new<S, SFut, H, HFut>(name: impl Into<String>, setup: S, handler: H) -> Self
    where
        S: Fn(Context) -> SFut + Send + Sync + 'static,
        SFut: Future<Output = TestResult> + Send + 'static,
        H: Fn(BackgroundContext) -> HFut + Send + Sync + 'static,
        HFut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            setup: operation_fn(setup),
            handler: Arc::new(move |bc| handler(bc).boxed()),
        }
    }

    /// Background operation that waits for the stop event and then verifies
    ///
    /// The stop channel is polled every [`DEFAULT_WAIT_TIME`]; `verify` runs
    /// against the handle attached to the stop event.
    pub fn verification<S, SFut, V, VFut>(name: impl Into<String>, setup: S, verify: V) -> Self
    where
        S: Fn(Context) -> SFut + Send + Sync + 'static,
        SFut: Future<Output = TestResult> + Send + 'static,
        V: Fn(Context) -> VFut + Send + Sync + 'static,
        VFut: Future<Output = TestResult> + Send + 'static,
    {
        Self::verification_every(name, DEFAULT_WAIT_TIME, setup, verify)
    }

    /// Like [`verification`](Self::verification), polling every `wait_time`
    pub fn verification_every<S, SFut, V, VFut>(
        name: impl Into<String>,
        wait_time: Duration,
        setup: S,
        verify: V,
    ) -> Self
    where
        S: Fn(Context) -> SFut + Send + Sync + 'static,
        SFut: Future<Output = TestResult> + Send + 'static,
        V: Fn(Context) -> VFut + Send + Sync + 'static,
        VFut: Future<Output = TestResult> + Send + 'static,
    {
        let verify = operation_fn(verify);
        Self::new(name, setup, move |bc| {
            let verify = Arc::clone(&verify);
            wait_for_stop_event(bc, wait_time, || async {}, move |ctx| verify(ctx))
        })
    }

    /// Name used for progress lines and sub-test names
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The synchronous setup step
    #[inline]
    #[must_use]
    pub fn setup(&self) -> OperationFn {
        Arc::clone(&self.setup)
    }

    /// The long-running handler
    #[inline]
    #[must_use]
    pub fn handler(&self) -> BackgroundFn {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for BackgroundOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundOperation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Any operation a phase can hold
#[derive(Debug, Clone)]
pub enum SuiteOperation {
    /// Runs once inside its phase
    Simple(Operation),
    /// Set up inside its phase, then runs until verified
    Background(BackgroundOperation),
}

impl SuiteOperation {
    /// Name of the wrapped operation
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(op) => op.name(),
            Self::Background(op) => op.name(),
        }
    }
}

impl From<Operation> for SuiteOperation {
    fn from(op: Operation) -> Self {
        Self::Simple(op)
    }
}

impl From<BackgroundOperation> for SuiteOperation {
    fn from(op: BackgroundOperation) -> Self {
        Self::Background(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Span;
    use upgrade_testing::TestHandle;

    #[tokio::test]
    async fn operation_handler_receives_context() {
        let op = Operation::new("install", |ctx: Context| async move {
            ctx.t.log("installing");
            Ok(())
        });
        let t = TestHandle::new("Op");

        let handler = op.handler();
        let result = handler(Context::new(t.clone(), Span::none())).await;

        assert!(result.is_ok());
        assert_eq!(op.name(), "install");
        assert_eq!(t.report().logs, vec!["installing".to_string()]);
    }

    #[test]
    fn suite_operation_exposes_name() {
        let simple: SuiteOperation = Operation::new("a", |_| async { Ok(()) }).into();
        let background: SuiteOperation =
            BackgroundOperation::verification("b", |_| async { Ok(()) }, |_| async { Ok(()) })
                .into();

        assert_eq!(simple.name(), "a");
        assert_eq!(background.name(), "b");
        assert!(matches!(background, SuiteOperation::Background(_)));
    }

    #[test]
    fn debug_shows_name_only() {
        let op = Operation::new("upgrade", |_| async { Ok(()) });
        assert_eq!(format!("{op:?}"), "Operation { name: \"upgrade\", .. }");
    }
}
