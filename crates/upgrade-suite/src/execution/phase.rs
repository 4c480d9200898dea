//! Phase runner

use super::SuiteExecution;
use crate::context::Context;
use crate::messages::{skipping_operation, Phase};
use crate::operation::SuiteOperation;
use tracing::{debug, info};
use upgrade_testing::TestHandle;

impl SuiteExecution<'_> {
    /// Run one phase inside its group sub-test
    ///
    /// Operations run strictly in order. The first failing operation ends
    /// the phase; nothing after it is announced.
    pub(super) async fn process_phase(&mut self, phase: Phase) {
        debug_assert_ne!(phase, Phase::VerifyContinualTests);

        let operations = self.suite.operations(phase);
        let t = self.config.t.clone();
        t.run(phase.group_name(), |group| async move {
            self.run_operations(phase, &group, operations).await;
            Ok(())
        })
        .await;
    }

    async fn run_operations(
        &mut self,
        phase: Phase,
        group: &TestHandle,
        operations: Vec<SuiteOperation>,
    ) {
        let number = phase.number();
        if operations.is_empty() {
            info!(phase = number, "{}", phase.skipped());
            return;
        }

        info!(phase = number, count = operations.len(), "{}", phase.starting(operations.len()));
        for (i, operation) in operations.into_iter().enumerate() {
            let index = i + 1;
            info!(
                phase = number,
                element = index,
                operation = operation.name(),
                "{}",
                phase.element(index, operation.name())
            );
            if self.failed {
                debug!(operation = operation.name(), "{}", skipping_operation(operation.name()));
                return;
            }

            match operation {
                SuiteOperation::Simple(op) => {
                    let handler = op.handler();
                    let span = self.config.span.clone();
                    let passed = group
                        .run(op.name(), |t| handler(Context::new(t, span)))
                        .await;
                    self.failed = self.failed || !passed;
                }
                SuiteOperation::Background(op) => self.start_background(group, &op).await,
            }

            if self.failed {
                return;
            }
        }
    }
}
