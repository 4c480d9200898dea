//! Execution contexts handed to operations
//!
//! Plain operations, background setups and background verifications all
//! receive a [`Context`]. A background handler receives a
//! [`BackgroundContext`] instead, whose stop channel delivers exactly one
//! [`StopEvent`] once the suite is ready to verify it.

use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, Instrument, Span};
use upgrade_testing::{TestHandle, TestResult};

/// How often a background verification polls its stop channel by default
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_millis(20);

/// Context of a synchronously executed operation
#[derive(Debug, Clone)]
pub struct Context {
    /// Test handle of the sub-test the operation runs in
    pub t: TestHandle,
    /// Suite span; events recorded inside it carry the execution fields
    pub span: Span,
}

impl Context {
    /// Create a new context
    #[inline]
    #[must_use]
    pub fn new(t: TestHandle, span: Span) -> Self {
        Self { t, span }
    }
}

/// Context of a background handler
#[derive(Debug)]
pub struct BackgroundContext {
    /// Suite span
    pub span: Span,
    /// Receives the single stop event for this execution
    pub stop: oneshot::Receiver<StopEvent>,
}

/// Request for a background operation to stop and verify itself
///
/// Finishing the event releases the suite, which is blocked until then.
/// Dropping it unfinished releases the suite too, but fails the
/// verification.
#[derive(Debug)]
pub struct StopEvent {
    t: TestHandle,
    name: String,
    finished: oneshot::Sender<()>,
}

impl StopEvent {
    pub(crate) fn new(t: TestHandle, name: impl Into<String>, finished: oneshot::Sender<()>) -> Self {
        Self {
            t,
            name: name.into(),
            finished,
        }
    }

    /// Handle of the verification sub-test
    #[inline]
    #[must_use]
    pub fn t(&self) -> &TestHandle {
        &self.t
    }

    /// Name of the background operation being stopped
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal that verification is complete
    pub fn finish(self) {
        // The suite may have given up waiting; nothing to do then.
        let _ = self.finished.send(());
    }
}

/// Poll the stop channel until a stop event arrives, then verify
///
/// Each iteration checks the channel without blocking. While it is empty,
/// `on_wait` runs one probe iteration and the loop sleeps for `wait_time`.
/// When the event arrives, `on_stop` runs against the event's test handle,
/// its result is recorded on that handle and the event is finished.
///
/// If the suite drops the channel without sending an event, the loop
/// returns without verifying.
pub async fn wait_for_stop_event<W, WFut, S, SFut>(
    bc: BackgroundContext,
    wait_time: Duration,
    mut on_wait: W,
    on_stop: S,
) where
    W: FnMut() -> WFut,
    WFut: Future<Output = ()>,
    S: FnOnce(Context) -> SFut,
    SFut: Future<Output = TestResult>,
{
    let BackgroundContext { span, mut stop } = bc;

    loop {
        match stop.try_recv() {
            Ok(event) => {
                debug!(parent: &span, operation = event.name(), "stop event received");
                let ctx = Context::new(event.t.clone(), span.clone());
                let result = on_stop(ctx).instrument(span.clone()).await;
                event.t.record(&result);
                event.finish();
                return;
            }
            Err(TryRecvError::Closed) => {
                debug!(parent: &span, "stop channel closed before a stop event arrived");
                return;
            }
            Err(TryRecvError::Empty) => {
                on_wait().await;
                tokio::time::sleep(wait_time).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn background() -> (oneshot::Sender<StopEvent>, BackgroundContext) {
        let (tx, rx) = oneshot::channel();
        (
            tx,
            BackgroundContext {
                span: Span::none(),
                stop: rx,
            },
        )
    }

    #[tokio::test]
    async fn probes_until_stopped_then_verifies() {
        let (tx, bc) = background();
        let probes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&probes);

        let task = tokio::spawn(wait_for_stop_event(
            bc,
            Duration::from_millis(1),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {}
            },
            |ctx| async move {
                ctx.t.log("verified");
                Ok(())
            },
        ));

        while probes.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let t = TestHandle::new("Verify");
        let (done_tx, done_rx) = oneshot::channel();
        tx.send(StopEvent::new(t.clone(), "probe", done_tx)).unwrap();
        done_rx.await.unwrap();
        task.await.unwrap();

        assert!(!t.failed());
        assert_eq!(t.report().logs, vec!["verified".to_string()]);
    }

    #[tokio::test]
    async fn verification_result_is_recorded() {
        let (tx, bc) = background();
        let task = tokio::spawn(wait_for_stop_event(
            bc,
            Duration::from_millis(1),
            || async {},
            |_| async { Err(upgrade_testing::Abort::Failed) },
        ));

        let t = TestHandle::new("Verify");
        let (done_tx, done_rx) = oneshot::channel();
        tx.send(StopEvent::new(t.clone(), "probe", done_tx)).unwrap();
        done_rx.await.unwrap();
        task.await.unwrap();

        assert!(t.failed());
    }

    #[tokio::test]
    async fn closed_channel_ends_loop_without_verifying() {
        let (tx, bc) = background();
        let verified = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&verified);

        drop(tx);
        wait_for_stop_event(bc, Duration::from_millis(1), || async {}, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert_eq!(verified.load(Ordering::SeqCst), 0);
    }
}
