//! Testing utilities for the upgrade suite workspace
//!
//! Shared fixtures: operations that record when they run and finish with a
//! scripted verdict, plus a runner that captures the suite's progress lines.

#![allow(missing_docs)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument::WithSubscriber;
use upgrade_suite::logging::MessageCollector;
use upgrade_suite::prelude::*;
use upgrade_testing::TestReport;

/// Polling interval used by fixture probes
pub const PROBE_WAIT: Duration = Duration::from_millis(2);

/// Ordered log of fixture invocations, shared across tasks
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: &str) {
        self.entries.lock().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }
}

/// How a fixture body ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Skip,
    Panic,
}

impl Verdict {
    /// Finish a body on `t`
    ///
    /// # Panics
    /// For `Verdict::Panic`, on purpose.
    pub fn apply(self, t: &TestHandle) -> TestResult {
        match self {
            Verdict::Pass => Ok(()),
            Verdict::Fail => Err(t.fatal("scripted failure")),
            Verdict::Skip => Err(t.skip("scripted skip")),
            Verdict::Panic => panic!("scripted panic"),
        }
    }
}

/// Operation that records its name, then ends with `verdict`
pub fn scripted(name: &str, recorder: &Recorder, verdict: Verdict) -> Operation {
    let recorder = recorder.clone();
    let entry = name.to_string();
    Operation::new(name, move |ctx: Context| {
        recorder.push(&entry);
        async move { verdict.apply(&ctx.t) }
    })
}

pub fn recording(name: &str, recorder: &Recorder) -> Operation {
    scripted(name, recorder, Verdict::Pass)
}

pub fn failing(name: &str, recorder: &Recorder) -> Operation {
    scripted(name, recorder, Verdict::Fail)
}

pub fn skipping(name: &str, recorder: &Recorder) -> Operation {
    scripted(name, recorder, Verdict::Skip)
}

/// Continual test recording `Setup<name>` and `Verify<name>`
///
/// Setup passes; verification ends with `verdict`.
pub fn probe(name: &str, recorder: &Recorder, verdict: Verdict) -> BackgroundOperation {
    probe_with_setup(name, recorder, Verdict::Pass, verdict)
}

/// Continual test whose setup ends with `setup` and verification with `verify`
pub fn probe_with_setup(
    name: &str,
    recorder: &Recorder,
    setup: Verdict,
    verify: Verdict,
) -> BackgroundOperation {
    let setup_entry = format!("Setup{name}");
    let verify_entry = format!("Verify{name}");
    let setup_recorder = recorder.clone();
    let verify_recorder = recorder.clone();

    BackgroundOperation::verification_every(
        name,
        PROBE_WAIT,
        move |ctx: Context| {
            setup_recorder.push(&setup_entry);
            async move { setup.apply(&ctx.t) }
        },
        move |ctx: Context| {
            verify_recorder.push(&verify_entry);
            async move { verify.apply(&ctx.t) }
        },
    )
}

/// Continual test whose handler returns without waiting for a stop event
pub fn quitter(name: &str) -> BackgroundOperation {
    BackgroundOperation::new(name, |_: Context| async { Ok(()) }, |_: BackgroundContext| async {})
}

/// Outcome of [`run_suite`]
#[derive(Debug)]
pub struct SuiteRun {
    pub t: TestHandle,
    pub terminal: Terminal,
    pub collector: MessageCollector,
}

impl SuiteRun {
    /// Progress lines (INFO and above) in emission order
    pub fn messages(&self) -> Vec<String> {
        self.collector.info_messages()
    }

    /// Numbered phase headers, e.g. `3) 🔄 Starting continual tests. ...`
    pub fn phase_markers(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|line| {
                line.split_once(") ")
                    .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            })
            .collect()
    }

    pub fn report(&self) -> TestReport {
        self.t.report()
    }
}

/// Execute `suite` under a fresh `TestUpgrade` handle, capturing events
pub async fn run_suite(suite: &Suite) -> SuiteRun {
    let collector = MessageCollector::new();
    let dispatch = collector.dispatch();
    let t = TestHandle::new("TestUpgrade");

    let config = tracing::dispatcher::with_default(&dispatch, || Configuration::new(t.clone()));
    let terminal = suite.execute(config).with_subscriber(dispatch).await;

    SuiteRun {
        t,
        terminal,
        collector,
    }
}
