//! Suite model and entry point

use crate::execution::SuiteExecution;
use crate::messages::Phase;
use crate::operation::{BackgroundOperation, Operation, SuiteOperation};
use tracing::Span;
use upgrade_testing::TestHandle;

/// Tests registered in a suite
#[derive(Debug, Clone, Default)]
pub struct Tests {
    /// Run before the upgrade
    pub pre_upgrade: Vec<Operation>,
    /// Run after the upgrade
    pub post_upgrade: Vec<Operation>,
    /// Run after the downgrade
    pub post_downgrade: Vec<Operation>,
    /// Run in the background from before the upgrade until after the downgrade
    pub continual: Vec<BackgroundOperation>,
}

/// Installation steps registered in a suite
#[derive(Debug, Clone, Default)]
pub struct Installations {
    /// Install the baseline (previous release)
    pub base: Vec<Operation>,
    /// Upgrade to the version under test
    pub upgrade_with: Vec<Operation>,
    /// Downgrade back to the baseline
    pub downgrade_with: Vec<Operation>,
}

/// Declarative upgrade test suite
///
/// Operations in every list run in registration order.
#[derive(Debug, Clone, Default)]
pub struct Suite {
    /// Test operations
    pub tests: Tests,
    /// Installation operations
    pub installations: Installations,
}

/// Execution-time dependencies of a suite run
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Handle every phase reports into
    pub t: TestHandle,
    /// Span the suite's events are recorded in
    pub span: Span,
}

impl Configuration {
    /// Configuration reporting into `t`, with a fresh `upgrade_suite` span
    #[must_use]
    pub fn new(t: TestHandle) -> Self {
        let span = tracing::info_span!(
            "upgrade_suite",
            test = %t.name(),
            execution_id = %uuid::Uuid::new_v4()
        );
        Self { t, span }
    }

    /// Record suite events in `span` instead
    #[inline]
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Terminal state of a suite run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// No phase failed
    Success,
    /// At least one phase failed
    Failure,
}

impl Terminal {
    /// Whether the run succeeded
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Suite {
    /// Create an empty suite
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the suite
    ///
    /// Results are reported through `config.t`; the terminal state is also
    /// returned for callers that do not inspect the handle. A fresh
    /// execution is created for every call.
    pub async fn execute(&self, config: Configuration) -> Terminal {
        SuiteExecution::new(self, config).run().await
    }

    /// Operations of a phase, in execution order
    ///
    /// The verification phase holds the continual tests, like the start
    /// phase; only the ones that were started get verified.
    #[must_use]
    pub fn operations(&self, phase: Phase) -> Vec<SuiteOperation> {
        fn simple(ops: &[Operation]) -> Vec<SuiteOperation> {
            ops.iter().cloned().map(SuiteOperation::Simple).collect()
        }

        match phase {
            Phase::InstallingBase => simple(&self.installations.base),
            Phase::PreUpgradeTests => simple(&self.tests.pre_upgrade),
            Phase::StartContinualTests | Phase::VerifyContinualTests => self
                .tests
                .continual
                .iter()
                .cloned()
                .map(SuiteOperation::Background)
                .collect(),
            Phase::UpgradeWith => simple(&self.installations.upgrade_with),
            Phase::PostUpgradeTests => simple(&self.tests.post_upgrade),
            Phase::DowngradeWith => simple(&self.installations.downgrade_with),
            Phase::PostDowngradeTests => simple(&self.tests.post_downgrade),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(name: &str) -> Operation {
        Operation::new(name, |_| async { Ok(()) })
    }

    #[test]
    fn operations_follow_registration_order() {
        let suite = Suite {
            installations: Installations {
                base: vec![op("first"), op("second")],
                ..Default::default()
            },
            ..Default::default()
        };

        let names: Vec<String> = suite
            .operations(Phase::InstallingBase)
            .iter()
            .map(|op| op.name().to_string())
            .collect();

        assert_eq!(names, vec!["first", "second"]);
        assert!(suite.operations(Phase::UpgradeWith).is_empty());
    }

    #[test]
    fn continual_tests_back_both_continual_phases() {
        let suite = Suite {
            tests: Tests {
                continual: vec![BackgroundOperation::verification(
                    "probe",
                    |_| async { Ok(()) },
                    |_| async { Ok(()) },
                )],
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(suite.operations(Phase::StartContinualTests).len(), 1);
        assert_eq!(suite.operations(Phase::VerifyContinualTests).len(), 1);
    }

    #[test]
    fn configuration_keeps_handle() {
        let t = TestHandle::new("Upgrade");
        let config = Configuration::new(t.clone()).with_span(Span::none());
        assert_eq!(config.t.name(), "Upgrade");
        assert!(config.span.is_none());
    }
}
