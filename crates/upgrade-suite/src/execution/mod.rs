//! Suite execution
//!
//! A [`SuiteExecution`] is created for every [`Suite::execute`] call and
//! dropped when it returns. It owns the only mutable state of a run: the
//! failure flag, the stop senders of launched background operations and the
//! execution state.
//!
//! # Invariant
//!
//! The failure flag is only touched by the task driving the suite.
//! Background handlers report back exclusively through their stop event,
//! whose verification handle is read after the handler finished it.

mod background;
mod phase;

use crate::messages::{Phase, SUITE_FAILURE, SUITE_RUNNING, SUITE_SUCCESS};
use crate::suite::{Configuration, Suite, Terminal};
use background::PendingStop;
use tracing::{debug, error, info, warn, Instrument};

/// Phases run before background operations are launched
const LEADING_PHASES: [Phase; 3] = [
    Phase::InstallingBase,
    Phase::PreUpgradeTests,
    Phase::StartContinualTests,
];

/// Phases run while background operations are live
const CONCURRENT_PHASES: [Phase; 4] = [
    Phase::UpgradeWith,
    Phase::PostUpgradeTests,
    Phase::DowngradeWith,
    Phase::PostDowngradeTests,
];

/// Lifecycle of a single execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Not started
    Created,
    /// Running the operations of a phase
    Running(Phase),
    /// Stopping and verifying background operations
    VerifyingBackground,
    /// Finished
    Terminal(Terminal),
}

impl ExecutionState {
    /// Whether moving from `self` to `next` is allowed
    #[must_use]
    pub fn can_transition(self, next: ExecutionState) -> bool {
        use ExecutionState::{Created, Running, Terminal, VerifyingBackground};

        match (self, next) {
            (Created, Running(Phase::InstallingBase)) => true,
            (Running(from), Running(to)) => {
                to != Phase::VerifyContinualTests && to.number() == from.number() + 1
            }
            (Running(from), VerifyingBackground) => {
                from >= Phase::UpgradeWith && from != Phase::VerifyContinualTests
            }
            (Running(_) | VerifyingBackground, Terminal(_)) => true,
            _ => false,
        }
    }

    /// Whether the execution has finished
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

/// Single-use execution of a suite
pub(crate) struct SuiteExecution<'a> {
    suite: &'a Suite,
    config: Configuration,
    failed: bool,
    stop_signals: Vec<PendingStop>,
    state: ExecutionState,
}

impl<'a> SuiteExecution<'a> {
    pub(crate) fn new(suite: &'a Suite, config: Configuration) -> Self {
        Self {
            suite,
            config,
            failed: false,
            stop_signals: Vec::new(),
            state: ExecutionState::Created,
        }
    }

    /// Run every phase and return the terminal state
    pub(crate) async fn run(mut self) -> Terminal {
        let span = self.config.span.clone();
        self.execute().instrument(span).await
    }

    async fn execute(&mut self) -> Terminal {
        info!("{SUITE_RUNNING}");

        for phase in LEADING_PHASES {
            self.advance(ExecutionState::Running(phase));
            self.process_phase(phase).await;
            if self.failed {
                self.abandon_background();
                return self.finish();
            }
        }

        for phase in CONCURRENT_PHASES {
            self.advance(ExecutionState::Running(phase));
            self.process_phase(phase).await;
            if self.failed {
                break;
            }
        }

        self.advance(ExecutionState::VerifyingBackground);
        self.verify_continual_tests().await;
        self.finish()
    }

    fn finish(&mut self) -> Terminal {
        let terminal = if self.failed {
            error!("{SUITE_FAILURE}");
            Terminal::Failure
        } else {
            info!("{SUITE_SUCCESS}");
            Terminal::Success
        };
        self.advance(ExecutionState::Terminal(terminal));
        terminal
    }

    fn advance(&mut self, next: ExecutionState) {
        if !self.state.can_transition(next) {
            warn!(from = ?self.state, to = ?next, "unexpected suite state transition");
            debug_assert!(false, "illegal transition {:?} -> {next:?}", self.state);
        }
        debug!(from = ?self.state, to = ?next, "suite state changed");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ExecutionState::{Created, Running, VerifyingBackground};

    #[test]
    fn happy_path_transitions_are_legal() {
        let mut state = Created;
        for phase in LEADING_PHASES.into_iter().chain(CONCURRENT_PHASES) {
            assert!(state.can_transition(Running(phase)), "{state:?} -> {phase:?}");
            state = Running(phase);
        }
        assert!(state.can_transition(VerifyingBackground));
        assert!(VerifyingBackground.can_transition(ExecutionState::Terminal(Terminal::Success)));
    }

    #[test]
    fn phases_cannot_be_skipped_or_repeated() {
        assert!(!Created.can_transition(Running(Phase::PreUpgradeTests)));
        assert!(!Running(Phase::InstallingBase).can_transition(Running(Phase::UpgradeWith)));
        assert!(!Running(Phase::UpgradeWith).can_transition(Running(Phase::UpgradeWith)));
        assert!(!Running(Phase::PostDowngradeTests)
            .can_transition(Running(Phase::VerifyContinualTests)));
    }

    #[test]
    fn verification_only_after_background_launch() {
        assert!(!Running(Phase::PreUpgradeTests).can_transition(VerifyingBackground));
        assert!(!Running(Phase::StartContinualTests).can_transition(VerifyingBackground));
        assert!(Running(Phase::UpgradeWith).can_transition(VerifyingBackground));
    }

    #[test]
    fn early_failure_may_terminate() {
        let failed = ExecutionState::Terminal(Terminal::Failure);
        assert!(Running(Phase::InstallingBase).can_transition(failed));
        assert!(failed.is_terminal());
        assert!(!failed.can_transition(Created));
        assert!(!Created.can_transition(failed));
    }
}
