// tests/process_executor.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, ledger_dir, with_timeout};

use std::collections::BTreeMap;
use std::error::Error;
use std::time::Duration;

use suitedag::config::ExecutorSection;
use suitedag::exec::{Executor, ProcessExecutor, ProcessExit, ProcessHandle, ProcessPoll};

type TestResult = Result<(), Box<dyn Error>>;

fn shell(script: &str) -> ExecutorSection {
    ExecutorSection {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "{testcase}".to_string()],
        env: BTreeMap::from([("EXTRA".to_string(), "extra-value".to_string())]),
    }
}

async fn wait_for_exit(
    executor: &mut ProcessExecutor,
    handle: &mut ProcessHandle,
) -> Result<ProcessExit, Box<dyn Error>> {
    loop {
        match executor.poll(handle)? {
            ProcessPoll::Exited(exit) => return Ok(exit),
            ProcessPoll::Running => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
}

#[tokio::test]
async fn passes_testcase_id_environment_and_captures_output() -> TestResult {
    init_tracing();
    let dir = ledger_dir();

    let mut executor = ProcessExecutor::new(
        &shell(r#"echo "arg=$0"; echo "env=$SUITEDAG_TESTCASE"; echo "ledger=$SUITEDAG_LEDGER_DIR"; echo "$EXTRA" >&2"#),
        dir.path(),
    );
    let mut handle = executor.start("Shop.LoginTest")?;
    let exit = with_timeout(wait_for_exit(&mut executor, &mut handle)).await?;

    assert_eq!(exit.exit_code, Some(0));
    assert!(exit.stdout.contains("arg=Shop.LoginTest"), "{}", exit.stdout);
    assert!(exit.stdout.contains("env=Shop.LoginTest"), "{}", exit.stdout);
    assert!(
        exit.stdout
            .contains(&format!("ledger={}", dir.path().display())),
        "{}",
        exit.stdout
    );
    assert_eq!(exit.stderr.trim(), "extra-value");
    Ok(())
}

#[tokio::test]
async fn reports_non_zero_exit_codes() -> TestResult {
    let dir = ledger_dir();
    let mut executor = ProcessExecutor::new(&shell("echo 'assertion failed' >&2; exit 1"), dir.path());

    let mut handle = executor.start("A")?;
    let exit = with_timeout(wait_for_exit(&mut executor, &mut handle)).await?;

    assert_eq!(exit.exit_code, Some(1));
    assert_eq!(exit.stderr.trim(), "assertion failed");
    Ok(())
}

#[tokio::test]
async fn background_children_do_not_hold_the_testcase_open() -> TestResult {
    let dir = ledger_dir();
    let mut executor = ProcessExecutor::new(&shell("echo ready; sleep 30 & exit 0"), dir.path());

    let started = std::time::Instant::now();
    let mut handle = executor.start("A")?;
    let exit = with_timeout(wait_for_exit(&mut executor, &mut handle)).await?;

    assert_eq!(exit.exit_code, Some(0));
    assert!(started.elapsed() < Duration::from_secs(5), "{:?}", started.elapsed());
    Ok(())
}

#[tokio::test]
async fn killed_process_has_no_exit_code() -> TestResult {
    let dir = ledger_dir();
    let mut executor = ProcessExecutor::new(&shell("exec sleep 30"), dir.path());

    let mut handle = executor.start("A")?;
    assert_eq!(executor.poll(&mut handle)?, ProcessPoll::Running);

    executor.kill(&mut handle)?;
    let exit = with_timeout(wait_for_exit(&mut executor, &mut handle)).await?;
    assert_eq!(exit.exit_code, None);
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_launch_error() {
    let dir = ledger_dir();
    let section = ExecutorSection {
        program: "/definitely/not/a/real/program".to_string(),
        args: vec![],
        env: BTreeMap::new(),
    };
    let mut executor = ProcessExecutor::new(&section, dir.path());

    let err = executor.start("A").unwrap_err();
    assert!(err.to_string().contains("failed to launch"), "{err}");
}
