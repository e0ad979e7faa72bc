// tests/cli_commands.rs

mod common;
use crate::common::{init_tracing, ledger_dir, with_timeout};

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;

use suitedag::cli::{CliArgs, Command, RecordArgs, RunArgs};
use suitedag::config::default_config_path;
use suitedag::engine::RunSummary;
use suitedag::ledger::Ledger;
use suitedag::types::{OrderStrategyKind, RecordStatus, TestOutcome};
use suitedag::{record, run_tests};

type TestResult = Result<(), Box<dyn Error>>;

fn run_args(config: PathBuf) -> RunArgs {
    RunArgs {
        config,
        max_concurrency: None,
        ledger_dir: None,
        order: None,
        history: None,
        groups: vec![],
        exclude_groups: vec![],
        ignore_delays: false,
        no_exit: false,
        dry_run: false,
    }
}

fn write_config(dir: &Path, executor: &str, testcases: &str) -> std::io::Result<PathBuf> {
    let path = dir.join("Suitedag.toml");
    let contents = format!(
        "[config]\nledger_dir = {ledger:?}\npoll_interval = \"10ms\"\n\n{executor}\n\n{testcases}\n",
        ledger = dir.display().to_string(),
    );
    std::fs::write(&path, contents)?;
    Ok(path)
}

#[test]
fn parses_run_flags() -> TestResult {
    let args = CliArgs::try_parse_from([
        "suitedag",
        "--log-level",
        "debug",
        "run",
        "--config",
        "ci/Suitedag.toml",
        "--max-concurrency",
        "3",
        "--order",
        "max-total-delay",
        "--group",
        "smoke",
        "--group",
        "shop",
        "--exclude-group",
        "slow",
        "--no-exit",
    ])?;

    let Command::Run(run) = args.command else {
        panic!("expected run subcommand");
    };
    assert_eq!(run.config, PathBuf::from("ci/Suitedag.toml"));
    assert_eq!(run.max_concurrency, Some(3));
    assert_eq!(run.order, Some(OrderStrategyKind::MaxTotalDelay));
    assert_eq!(run.groups, vec!["smoke", "shop"]);
    assert_eq!(run.exclude_groups, vec!["slow"]);
    assert!(run.no_exit);
    assert!(!run.dry_run);
    Ok(())
}

#[test]
fn run_defaults_to_config_in_working_directory() -> TestResult {
    let args = CliArgs::try_parse_from(["suitedag", "run"])?;
    let Command::Run(run) = args.command else {
        panic!("expected run subcommand");
    };
    assert_eq!(run.config, default_config_path());
    assert_eq!(run.config, PathBuf::from("Suitedag.toml"));
    Ok(())
}

#[test]
fn parses_record_flags() -> TestResult {
    let args = CliArgs::try_parse_from([
        "suitedag",
        "record",
        "--ledger-dir",
        "logs",
        "--testcase",
        "A",
        "--test",
        "testFoo",
        "--status",
        "done",
        "--outcome",
        "broken",
        "--message",
        "driver crashed",
    ])?;

    let Command::Record(rec) = args.command else {
        panic!("expected record subcommand");
    };
    assert_eq!(rec.status, RecordStatus::Done);
    assert_eq!(rec.outcome, Some(TestOutcome::Broken));
    assert_eq!(rec.message.as_deref(), Some("driver crashed"));
    Ok(())
}

#[test]
fn record_writes_test_results() -> TestResult {
    let dir = ledger_dir();
    let args = |status, outcome| RecordArgs {
        ledger_dir: dir.path().to_path_buf(),
        testcase: "A".to_string(),
        test: "testFoo".to_string(),
        status,
        outcome,
        message: None,
    };

    record(args(RecordStatus::Started, None))?;
    record(args(RecordStatus::Done, Some(TestOutcome::Failed)))?;

    let doc = Ledger::new(dir.path()).load()?;
    let test = doc.test("A", "testFoo").ok_or("missing test")?;
    assert_eq!(test.state.status, RecordStatus::Done);
    assert_eq!(test.state.outcome, Some(TestOutcome::Failed));
    assert!(test.state.start.is_some());

    let err = record(args(RecordStatus::Done, None)).unwrap_err();
    assert!(err.to_string().contains("--outcome"), "{err}");
    Ok(())
}

#[test]
fn exit_code_follows_the_run_summary() {
    let passed = RunSummary {
        total: 2,
        passed: 2,
        ..RunSummary::default()
    };
    let failed = RunSummary {
        total: 2,
        passed: 1,
        failed: 1,
        ..RunSummary::default()
    };
    let cancelled = RunSummary {
        total: 2,
        passed: 1,
        incomplete: 1,
        cancelled: true,
        ..RunSummary::default()
    };

    assert_eq!(passed.exit_code(false), 0);
    assert_eq!(failed.exit_code(false), 1);
    assert_eq!(failed.exit_code(true), 0);
    assert_eq!(cancelled.exit_code(true), 1);
    assert_eq!(cancelled.exit_code(false), 1);
}

#[tokio::test]
async fn dry_run_validates_without_starting_anything() -> TestResult {
    let dir = ledger_dir();
    let config = write_config(
        dir.path(),
        "[executor]\nprogram = \"/definitely/not/a/real/program\"",
        "[[testcase]]\nid = \"A\"\n\n[[testcase]]\nid = \"B\"\ndepends_on = \"A\"\ndelay_minutes = 2",
    )?;

    let mut args = run_args(config);
    args.dry_run = true;

    assert!(run_tests(args).await?.is_none());
    assert!(Ledger::new(dir.path()).load()?.testcases.is_empty());
    Ok(())
}

#[tokio::test]
async fn configuration_errors_abort_before_running() -> TestResult {
    let dir = ledger_dir();
    let config = write_config(
        dir.path(),
        "[executor]\nprogram = \"/definitely/not/a/real/program\"",
        "[[testcase]]\nid = \"A\"\ndepends_on = \"Missing\"",
    )?;

    let err = run_tests(run_args(config)).await.unwrap_err();
    assert!(err.to_string().contains("Missing"), "{err}");
    Ok(())
}

#[tokio::test]
async fn history_file_may_come_from_the_command_line() -> TestResult {
    let dir = ledger_dir();
    let config = write_config(
        dir.path(),
        "[executor]\nprogram = \"run-test\"",
        "[[testcase]]\nid = \"A\"",
    )?;
    let contents = std::fs::read_to_string(&config)?.replacen("[config]", "[config]\norder = \"history\"", 1);
    std::fs::write(&config, contents)?;

    let mut args = run_args(config.clone());
    args.dry_run = true;
    let err = run_tests(args).await.unwrap_err();
    assert!(err.to_string().contains("history file"), "{err}");

    let timings = dir.path().join("timings.json");
    std::fs::write(&timings, r#"{ "A": 3 }"#)?;
    let mut args = run_args(config);
    args.dry_run = true;
    args.history = Some(timings);
    assert!(run_tests(args).await?.is_none());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn runs_real_processes_and_workers_record_tests() -> TestResult {
    init_tracing();

    let dir = ledger_dir();
    let executor = format!(
        "[executor]\nprogram = {bin:?}\nargs = [\"record\", \"--test\", \"test_{{testcase}}\", \"--status\", \"done\", \"--outcome\", \"passed\"]",
        bin = env!("CARGO_BIN_EXE_suitedag"),
    );
    let config = write_config(
        dir.path(),
        &executor,
        "[[testcase]]\nid = \"A\"\n\n[[testcase]]\nid = \"B\"\ndepends_on = \"A\"\n\n[[testcase]]\nid = \"C\"",
    )?;

    let summary = with_timeout(run_tests(run_args(config)))
        .await?
        .ok_or("expected a summary")?;
    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 3);
    assert!(summary.is_success());

    let doc = Ledger::new(dir.path()).load()?;
    for id in ["A", "B", "C"] {
        let testcase = doc.testcase(id).ok_or("missing testcase")?;
        assert_eq!(testcase.state.outcome, Some(TestOutcome::Passed));
        let test = doc
            .test(id, &format!("test_{id}"))
            .ok_or("worker did not record its test")?;
        assert_eq!(test.state.outcome, Some(TestOutcome::Passed));
    }
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failing_process_skips_dependents() -> TestResult {
    let dir = ledger_dir();
    let config = write_config(
        dir.path(),
        "[executor]\nprogram = \"sh\"\nargs = [\"-c\", \"test \\\"$0\\\" != Bad\", \"{testcase}\"]",
        "[[testcase]]\nid = \"Bad\"\n\n[[testcase]]\nid = \"After\"\ndepends_on = \"Bad\"\n\n[[testcase]]\nid = \"Good\"",
    )?;

    let summary = with_timeout(run_tests(run_args(config)))
        .await?
        .ok_or("expected a summary")?;
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!summary.is_success());
    Ok(())
}
