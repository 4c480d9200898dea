//! Background coordinator
//!
//! Continual tests are launched during the start phase and verified after
//! the downgrade tests. Between the two, each handler runs in its own task
//! and holds the receiving end of a one-shot stop channel.

use super::SuiteExecution;
use crate::context::{BackgroundContext, Context, StopEvent};
use crate::messages::Phase;
use crate::operation::BackgroundOperation;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, Instrument};
use upgrade_testing::{panic_message, TestHandle, TestResult};

/// A launched background operation waiting for its stop event
pub(super) struct PendingStop {
    name: String,
    sender: oneshot::Sender<StopEvent>,
    task: JoinHandle<()>,
}

impl PendingStop {
    /// Stop the handler and wait until it has verified itself
    ///
    /// There is no deadline: a handler that never reads its stop channel
    /// blocks here forever.
    async fn deliver(self, t: TestHandle) -> TestResult {
        let Self { name, sender, task } = self;
        let (finished, done) = oneshot::channel();

        if sender.send(StopEvent::new(t.clone(), name, finished)).is_err() {
            let cause = match task.await {
                Ok(()) => "background operation ended before it was stopped".to_string(),
                Err(err) if err.is_panic() => format!(
                    "background operation panicked before it was stopped: {}",
                    panic_message(err.into_panic().as_ref())
                ),
                Err(err) => format!("background operation was cancelled: {err}"),
            };
            return Err(t.fatal(cause));
        }

        if done.await.is_ok() {
            return Ok(());
        }

        // The event was dropped unfinished; the handler is expected to end.
        let cause = match task.await {
            Err(err) if err.is_panic() => format!(
                "background operation panicked during verification: {}",
                panic_message(err.into_panic().as_ref())
            ),
            Err(err) => format!("background operation was cancelled: {err}"),
            Ok(()) => "background operation dropped its stop event without finishing it".to_string(),
        };
        Err(t.fatal(cause))
    }
}

impl SuiteExecution<'_> {
    /// Set up a background operation and launch its handler
    pub(super) async fn start_background(&mut self, group: &TestHandle, op: &BackgroundOperation) {
        let setup = op.setup();
        let span = self.config.span.clone();
        let setup_span = span.clone();

        let passed = group
            .run(&format!("Setup{}", op.name()), |t| setup(Context::new(t, setup_span)))
            .await;
        if !passed {
            self.failed = true;
            return;
        }

        let (sender, stop) = oneshot::channel();
        let handler = op.handler();
        let bc = BackgroundContext {
            span: span.clone(),
            stop,
        };
        let task = tokio::spawn(handler(bc).instrument(span).with_current_subscriber());
        debug!(operation = op.name(), "background operation launched");

        self.stop_signals.push(PendingStop {
            name: op.name().to_string(),
            sender,
            task,
        });
    }

    /// Release launched handlers without verifying them
    ///
    /// Dropping a stop sender closes the channel, which ends a handler
    /// polling it through `wait_for_stop_event`.
    pub(super) fn abandon_background(&mut self) {
        for pending in self.stop_signals.drain(..) {
            debug!(operation = %pending.name, "releasing background operation without verification");
        }
    }

    /// Stop every launched operation in start order and wait for each
    /// verification before moving to the next one
    pub(super) async fn verify_continual_tests(&mut self) {
        let phase = Phase::VerifyContinualTests;
        let number = phase.number();
        let pending = std::mem::take(&mut self.stop_signals);

        if pending.is_empty() {
            info!(phase = number, "{}", phase.skipped());
            return;
        }

        let t = self.config.t.clone();
        t.run(phase.group_name(), |group| async move {
            info!(phase = number, count = pending.len(), "{}", phase.starting(pending.len()));
            for (i, stop) in pending.into_iter().enumerate() {
                let index = i + 1;
                let name = stop.name.clone();
                info!(
                    phase = number,
                    element = index,
                    operation = %name,
                    "{}",
                    phase.element(index, &name)
                );
                let passed = group.run(&name, |t| stop.deliver(t)).await;
                self.failed = self.failed || !passed;
            }
            Ok(())
        })
        .await;
    }
}
