use anyhow::Context as _;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use upgrade_suite::logging::{self, LogFormat};
use upgrade_suite::prelude::*;
use upgrade_suite::settings::Settings;
use upgrade_suite::{wait_for_stop_event, Phase};

/// Simulated duration of every demo step
const STEP_TIME: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("upgrade-suite")
        .version(upgrade_suite::VERSION)
        .about("Staged upgrade/downgrade test execution")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("demo")
                .about("Run a simulated upgrade suite")
                .arg(
                    Arg::new("continual")
                        .long("continual")
                        .default_value("2")
                        .value_parser(value_parser!(usize))
                        .help("Number of continual background probes"),
                )
                .arg(
                    Arg::new("fail-at")
                        .long("fail-at")
                        .value_parser(parse_phase)
                        .help("Phase group name whose first operation fails"),
                )
                .arg(
                    Arg::new("skip-verify")
                        .long("skip-verify")
                        .action(ArgAction::SetTrue)
                        .help("Skip the verification of the first continual probe"),
                )
                .arg(
                    Arg::new("wait-ms")
                        .long("wait-ms")
                        .value_parser(value_parser!(u64))
                        .help("Stop-channel polling interval of continual probes"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Settings file (TOML)"),
                )
                .arg(
                    Arg::new("log-format")
                        .long("log-format")
                        .value_parser(["pretty", "json"])
                        .help("Log output format"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the test report as JSON"),
                ),
        )
        .subcommand(Command::new("phases").about("List the suite phases"));

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("demo", args)) => run_demo(args).await,
        Some(("phases", _)) => {
            for phase in Phase::ALL {
                println!("{}) {}", phase.number(), phase.group_name());
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Options of the `demo` subcommand
#[derive(Debug, Clone)]
struct DemoOptions {
    continual: usize,
    fail_at: Option<Phase>,
    skip_verify: bool,
    wait_time: Duration,
}

async fn run_demo(args: &ArgMatches) -> anyhow::Result<()> {
    let mut settings = match args.get_one::<PathBuf>("config") {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(format) = args.get_one::<String>("log-format") {
        settings.log.format = if format == "json" {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };
    }
    if let Some(wait_ms) = args.get_one::<u64>("wait-ms") {
        settings.wait_time_ms = *wait_ms;
    }
    logging::init(&settings.log)?;

    let options = DemoOptions {
        continual: args
            .get_one::<usize>("continual")
            .copied()
            .context("--continual has a default value")?,
        fail_at: args.get_one::<Phase>("fail-at").copied(),
        skip_verify: args.get_flag("skip-verify"),
        wait_time: settings.wait_time(),
    };

    let suite = demo_suite(&options);
    let t = TestHandle::new("TestUpgradeDemo");
    let terminal = suite.execute(Configuration::new(t.clone())).await;

    let report = t.report();
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }

    std::process::exit(if terminal.is_success() { 0 } else { 1 });
}

fn parse_phase(value: &str) -> Result<Phase, String> {
    Phase::from_group_name(value).ok_or_else(|| {
        let known: Vec<&str> = Phase::ALL.iter().map(|p| p.group_name()).collect();
        format!("unknown phase {value:?}, expected one of: {}", known.join(", "))
    })
}

fn demo_suite(options: &DemoOptions) -> Suite {
    let step = |phase: Phase, name: &str| demo_step(name, options.fail_at == Some(phase));

    Suite {
        installations: Installations {
            base: vec![
                step(Phase::InstallingBase, "Serving v1"),
                demo_step("Eventing v1", false),
            ],
            upgrade_with: vec![step(Phase::UpgradeWith, "Serving HEAD")],
            downgrade_with: vec![step(Phase::DowngradeWith, "Serving v1")],
        },
        tests: Tests {
            pre_upgrade: vec![step(Phase::PreUpgradeTests, "Smoke")],
            post_upgrade: vec![step(Phase::PostUpgradeTests, "Smoke")],
            post_downgrade: vec![step(Phase::PostDowngradeTests, "Smoke")],
            continual: (1..=options.continual)
                .map(|i| demo_probe(i, options))
                .collect(),
        },
    }
}

fn demo_step(name: &str, fail: bool) -> Operation {
    let label = name.to_string();
    Operation::new(name, move |ctx: Context| {
        let label = label.clone();
        async move {
            tokio::time::sleep(STEP_TIME).await;
            if fail {
                return Err(ctx.t.fatal(format!("{label}: injected failure")));
            }
            tracing::debug!(step = %label, "demo step done");
            Ok(())
        }
    })
}

fn demo_probe(index: usize, options: &DemoOptions) -> BackgroundOperation {
    let first = index == 1;
    let fail_setup = first && options.fail_at == Some(Phase::StartContinualTests);
    let fail_verify = first && options.fail_at == Some(Phase::VerifyContinualTests);
    let skip_verify = first && options.skip_verify;
    let wait_time = options.wait_time;

    BackgroundOperation::new(
        format!("Probe{index}"),
        move |ctx: Context| async move {
            if fail_setup {
                return Err(ctx.t.fatal("prober could not be deployed"));
            }
            Ok(())
        },
        move |bc: BackgroundContext| {
            let probes = Arc::new(AtomicU64::new(0));
            let counter = Arc::clone(&probes);
            wait_for_stop_event(
                bc,
                wait_time,
                move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                    async {}
                },
                move |ctx: Context| async move {
                    let count = probes.load(Ordering::Relaxed);
                    ctx.t.log(format!("{count} probe iterations while upgrading"));
                    if skip_verify {
                        return Err(ctx.t.skip("verification skipped on request"));
                    }
                    if fail_verify {
                        return Err(ctx.t.fatal("injected verification failure"));
                    }
                    Ok(())
                },
            )
        },
    )
}
