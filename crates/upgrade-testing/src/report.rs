//! Result trees and Go-style rendering

use serde::{Serialize, Serializer};
use std::fmt::Write as _;
use std::time::Duration;

/// Final state of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Neither failed nor skipped
    Pass,
    /// Failed directly or through a sub-test
    Fail,
    /// Skipped without failing
    Skip,
}

impl Outcome {
    /// Upper-case label used in rendered result lines
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        }
    }
}

/// Snapshot of a test and its sub-tests
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    /// Full slash-separated name
    pub name: String,
    /// Final (or current) outcome
    pub outcome: Outcome,
    /// Time spent, or time so far for tests still running
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    /// Whether the test asked to run in parallel
    pub parallel: bool,
    /// Lines logged through the handle
    pub logs: Vec<String>,
    /// Sub-tests in start order
    pub children: Vec<TestReport>,
}

impl TestReport {
    /// Render result lines the way `go test -v` prints them
    ///
    /// Sub-tests are indented four spaces per level. Logs are printed only
    /// for tests that did not pass.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "    ".repeat(depth);
        let _ = writeln!(
            out,
            "{indent}--- {}: {} ({:.2}s)",
            self.outcome.label(),
            self.name,
            self.elapsed.as_secs_f64()
        );
        if self.outcome != Outcome::Pass {
            for line in &self.logs {
                let _ = writeln!(out, "{indent}    {line}");
            }
        }
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }

    /// Depth-first walk over this report and all sub-reports
    #[must_use]
    pub fn walk(&self) -> Vec<&TestReport> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// Find a report by its full name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&TestReport> {
        self.walk().into_iter().find(|node| node.name == name)
    }

    /// Names of the tests where failures originated
    ///
    /// A failed test is listed when none of its sub-tests failed, so that
    /// failures propagated upwards are not reported twice.
    #[must_use]
    pub fn failures(&self) -> Vec<&str> {
        self.walk()
            .into_iter()
            .filter(|node| {
                node.outcome == Outcome::Fail
                    && node.children.iter().all(|c| c.outcome != Outcome::Fail)
            })
            .map(|node| node.name.as_str())
            .collect()
    }
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
