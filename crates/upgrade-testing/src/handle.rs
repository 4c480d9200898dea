//! Test handles
//!
//! A [`TestHandle`] is one node in a tree of named tests. Handles are cheap
//! to clone and safe to share across tasks: a background task may fail the
//! handle it was given while the owning task waits for it.

use crate::report::{Outcome, TestReport};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a test body
///
/// `Err` carries the reason the body stopped early. The handle has already
/// been marked by the time the token exists, so bodies usually produce it
/// through [`TestHandle::fatal`] or [`TestHandle::skip`] and return it.
pub type TestResult = Result<(), Abort>;

/// Early exit from a test body
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Abort {
    /// The test failed and must not continue
    #[error("test failed")]
    Failed,

    /// The test was skipped
    #[error("test skipped")]
    Skipped,
}

/// Handle to a single test node
#[derive(Debug, Clone)]
pub struct TestHandle {
    node: Arc<Node>,
}

#[derive(Debug)]
struct Node {
    name: String,
    started: Instant,
    state: Mutex<NodeState>,
}

#[derive(Debug, Default)]
struct NodeState {
    failed: bool,
    skipped: bool,
    parallel: bool,
    elapsed: Option<Duration>,
    logs: Vec<String>,
    children: Vec<Arc<Node>>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            started: Instant::now(),
            state: Mutex::new(NodeState::default()),
        }
    }

    fn snapshot(&self) -> TestReport {
        let (outcome, elapsed, parallel, logs, children) = {
            let state = self.state.lock();
            (
                state.outcome(),
                state.elapsed.unwrap_or_else(|| self.started.elapsed()),
                state.parallel,
                state.logs.clone(),
                state.children.clone(),
            )
        };

        TestReport {
            name: self.name.clone(),
            outcome,
            elapsed,
            parallel,
            logs,
            children: children.iter().map(|child| child.snapshot()).collect(),
        }
    }
}

impl NodeState {
    fn outcome(&self) -> Outcome {
        if self.failed {
            Outcome::Fail
        } else if self.skipped {
            Outcome::Skip
        } else {
            Outcome::Pass
        }
    }
}

impl TestHandle {
    /// Create a root handle
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            node: Arc::new(Node::new(rewrite(name.as_ref()))),
        }
    }

    /// Full slash-separated name of this test
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Append a line to this test's log
    pub fn log(&self, message: impl Into<String>) {
        self.node.state.lock().logs.push(message.into());
    }

    /// Log a message and mark the test failed, continuing execution
    pub fn error(&self, message: impl Into<String>) {
        let mut state = self.node.state.lock();
        state.logs.push(message.into());
        state.failed = true;
    }

    /// Mark the test failed, continuing execution
    pub fn fail(&self) {
        self.node.state.lock().failed = true;
    }

    /// Mark the test failed and return the token that stops it
    #[must_use = "return the Abort to stop the test body"]
    pub fn fail_now(&self) -> Abort {
        self.fail();
        Abort::Failed
    }

    /// Log a message, mark the test failed and return the stop token
    #[must_use = "return the Abort to stop the test body"]
    pub fn fatal(&self, message: impl Into<String>) -> Abort {
        self.error(message);
        Abort::Failed
    }

    /// Log a message, mark the test skipped and return the stop token
    #[must_use = "return the Abort to stop the test body"]
    pub fn skip(&self, message: impl Into<String>) -> Abort {
        self.log(message);
        self.skip_now()
    }

    /// Mark the test skipped and return the stop token
    #[must_use = "return the Abort to stop the test body"]
    pub fn skip_now(&self) -> Abort {
        self.node.state.lock().skipped = true;
        Abort::Skipped
    }

    /// Whether the test (or any of its sub-tests) has failed
    #[must_use]
    pub fn failed(&self) -> bool {
        self.node.state.lock().failed
    }

    /// Whether the test was skipped
    #[must_use]
    pub fn skipped(&self) -> bool {
        self.node.state.lock().skipped
    }

    /// Mark the test as willing to run alongside its siblings
    ///
    /// The flag is reported but does not change scheduling: sub-tests
    /// always run in the order they are started.
    pub fn parallel(&self) {
        self.node.state.lock().parallel = true;
    }

    /// Whether [`parallel`](Self::parallel) was called
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.node.state.lock().parallel
    }

    /// Apply the outcome of a test body to this handle
    pub fn record(&self, result: &TestResult) {
        match result {
            Ok(()) => {}
            Err(Abort::Failed) => self.fail(),
            Err(Abort::Skipped) => {
                let _ = self.skip_now();
            }
        }
    }

    /// Run `body` as a named sub-test and wait for it to complete
    ///
    /// Panics inside the body fail the sub-test instead of unwinding
    /// further. A failed sub-test fails this test as well.
    ///
    /// # Returns
    /// `true` when the sub-test did not fail (passing or skipped)
    pub async fn run<F, Fut>(&self, name: &str, body: F) -> bool
    where
        F: FnOnce(TestHandle) -> Fut,
        Fut: Future<Output = TestResult>,
    {
        let child = self.child(name);
        let handle = child.clone();

        let result = AssertUnwindSafe(async move { body(handle).await })
            .catch_unwind()
            .await;

        match result {
            Ok(result) => child.record(&result),
            Err(payload) => child.error(format!("panic: {}", panic_message(payload.as_ref()))),
        }
        child.finish();

        let passed = !child.failed();
        if !passed {
            self.fail();
        }

        tracing::trace!(test = %child.name(), passed, "sub-test finished");
        passed
    }

    /// Snapshot the result tree rooted at this handle
    #[must_use]
    pub fn report(&self) -> TestReport {
        self.node.snapshot()
    }

    fn child(&self, name: &str) -> TestHandle {
        let node = Arc::new(Node::new(format!("{}/{}", self.name(), rewrite(name))));
        self.node.state.lock().children.push(Arc::clone(&node));
        TestHandle { node }
    }

    fn finish(&self) {
        let elapsed = self.node.started.elapsed();
        self.node.state.lock().elapsed.get_or_insert(elapsed);
    }
}

/// Sub-test names never contain whitespace
fn rewrite(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Best-effort text of a panic payload
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
