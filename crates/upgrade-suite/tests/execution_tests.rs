//! Suite Execution Tests
//!
//! Phase ordering, progress lines and fail-fast behaviour of plain
//! operations.

use pretty_assertions::assert_eq;
use upgrade_suite::messages::{Phase, SUITE_FAILURE, SUITE_RUNNING, SUITE_SUCCESS};
use upgrade_suite::prelude::*;
use upgrade_test_utils::{failing, recording, run_suite, scripted, skipping, Recorder, Verdict};
use upgrade_testing::Outcome;

fn lines(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| (*line).to_string()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_empty_suite_skips_every_phase() {
    let run = run_suite(&Suite::new()).await;

    let mut expected = vec![SUITE_RUNNING.to_string()];
    expected.extend(Phase::ALL.iter().map(|phase| phase.skipped()));
    expected.push(SUITE_SUCCESS.to_string());

    assert_eq!(run.messages(), expected);
    assert_eq!(run.terminal, Terminal::Success);
    assert!(!run.t.failed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_install_upgrade_downgrade_scenario() {
    let recorder = Recorder::new();
    let suite = Suite {
        installations: Installations {
            base: vec![
                recording("installA", &recorder),
                recording("installB", &recorder),
            ],
            upgrade_with: vec![recording("headA", &recorder)],
            downgrade_with: vec![recording("stableA", &recorder)],
        },
        ..Default::default()
    };

    let run = run_suite(&suite).await;

    let expected = lines(&[
        SUITE_RUNNING,
        "1) 💿 Installing base installations. 2 are registered.",
        "1.1) Installing base install of \"installA\".",
        "1.2) Installing base install of \"installB\".",
        "2) ✅️️ No pre upgrade tests registered. Skipping.",
        "3) 🔄 No continual tests registered. Skipping.",
        "4) 📀 Upgrading with 1 registered operations.",
        "4.1) Upgrading with \"headA\".",
        "5) ✅️️ No post upgrade tests registered. Skipping.",
        "6) 💿 Downgrading with 1 registered operations.",
        "6.1) Downgrading with \"stableA\".",
        "7) ✅️️ No post downgrade tests registered. Skipping.",
        "8) ✋ No continual tests registered. Skipping.",
        SUITE_SUCCESS,
    ]);
    assert_eq!(run.messages(), expected);
    assert_eq!(run.phase_markers().len(), 8);
    assert_eq!(
        recorder.entries(),
        lines(&["installA", "installB", "headA", "stableA"])
    );
    assert_eq!(run.terminal, Terminal::Success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_stops_phase_and_suite() {
    let recorder = Recorder::new();
    let suite = Suite {
        installations: Installations {
            base: vec![
                recording("a", &recorder),
                failing("b", &recorder),
                recording("c", &recorder),
            ],
            upgrade_with: vec![recording("up", &recorder)],
            ..Default::default()
        },
        tests: Tests {
            pre_upgrade: vec![recording("pre", &recorder)],
            ..Default::default()
        },
    };

    let run = run_suite(&suite).await;

    let expected = lines(&[
        SUITE_RUNNING,
        "1) 💿 Installing base installations. 3 are registered.",
        "1.1) Installing base install of \"a\".",
        "1.2) Installing base install of \"b\".",
        SUITE_FAILURE,
    ]);
    assert_eq!(run.messages(), expected);
    assert_eq!(recorder.entries(), lines(&["a", "b"]));
    assert_eq!(run.terminal, Terminal::Failure);
    assert!(run.t.failed());
    assert_eq!(run.report().failures(), vec!["TestUpgrade/InstallingBase/b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_in_upgrade_skips_later_phases() {
    let recorder = Recorder::new();
    let suite = Suite {
        installations: Installations {
            upgrade_with: vec![failing("head", &recorder)],
            downgrade_with: vec![recording("stable", &recorder)],
            ..Default::default()
        },
        tests: Tests {
            post_upgrade: vec![recording("post", &recorder)],
            ..Default::default()
        },
    };

    let run = run_suite(&suite).await;

    let messages = run.messages();
    assert!(messages.contains(&"4.1) Upgrading with \"head\".".to_string()));
    assert!(!messages.iter().any(|line| line.starts_with("5)")));
    assert!(!messages.iter().any(|line| line.starts_with("6)")));
    assert!(!messages.iter().any(|line| line.starts_with("7)")));
    assert_eq!(
        messages.last().map(String::as_str),
        Some(SUITE_FAILURE)
    );
    assert_eq!(recorder.entries(), lines(&["head"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_skipped_operation_does_not_fail_suite() {
    let recorder = Recorder::new();
    let suite = Suite {
        tests: Tests {
            pre_upgrade: vec![skipping("flaky", &recorder), recording("stable", &recorder)],
            ..Default::default()
        },
        ..Default::default()
    };

    let run = run_suite(&suite).await;

    assert_eq!(run.terminal, Terminal::Success);
    assert_eq!(recorder.entries(), lines(&["flaky", "stable"]));

    let report = run.report();
    let flaky = report
        .find("TestUpgrade/PreUpgradeTests/flaky")
        .expect("flaky sub-test");
    assert_eq!(flaky.outcome, Outcome::Skip);
    assert_eq!(flaky.logs, lines(&["scripted skip"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_operation_fails_its_sub_test() {
    let recorder = Recorder::new();
    let suite = Suite {
        installations: Installations {
            base: vec![scripted("boom", &recorder, Verdict::Panic)],
            ..Default::default()
        },
        ..Default::default()
    };

    let run = run_suite(&suite).await;

    assert_eq!(run.terminal, Terminal::Failure);
    let report = run.report();
    let boom = report.find("TestUpgrade/InstallingBase/boom").expect("boom sub-test");
    assert_eq!(boom.outcome, Outcome::Fail);
    assert_eq!(boom.logs, lines(&["panic: scripted panic"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_operation_names_with_spaces_become_sub_test_names() {
    let recorder = Recorder::new();
    let suite = Suite {
        installations: Installations {
            base: vec![failing("Serving v1", &recorder)],
            ..Default::default()
        },
        ..Default::default()
    };

    let run = run_suite(&suite).await;

    assert!(run
        .messages()
        .contains(&"1.1) Installing base install of \"Serving v1\".".to_string()));
    assert_eq!(
        run.report().failures(),
        vec!["TestUpgrade/InstallingBase/Serving_v1"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_suite_can_be_executed_twice() {
    let recorder = Recorder::new();
    let suite = Suite {
        installations: Installations {
            base: vec![recording("install", &recorder)],
            ..Default::default()
        },
        ..Default::default()
    };

    let first = run_suite(&suite).await;
    let second = run_suite(&suite).await;

    assert_eq!(first.messages(), second.messages());
    assert_eq!(recorder.entries(), lines(&["install", "install"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_progress_lines_carry_structured_fields() {
    let recorder = Recorder::new();
    let suite = Suite {
        installations: Installations {
            upgrade_with: vec![recording("head", &recorder)],
            ..Default::default()
        },
        ..Default::default()
    };

    let run = run_suite(&suite).await;

    let events = run.collector.events();
    let element = events
        .iter()
        .find(|event| event.message == "4.1) Upgrading with \"head\".")
        .expect("element line");
    assert_eq!(element.field("phase"), Some("4"));
    assert_eq!(element.field("element"), Some("1"));
    assert_eq!(element.field("operation"), Some("head"));

    let header = events
        .iter()
        .find(|event| event.message.starts_with("4) "))
        .expect("phase header");
    assert_eq!(header.field("count"), Some("1"));
}
