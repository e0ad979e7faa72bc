// tests/ledger.rs

mod common;
use crate::common::ledger_dir;

use std::error::Error;
use std::sync::Arc;
use std::thread;

use suitedag::errors::LedgerError;
use suitedag::ledger::{LEDGER_FILE_NAME, Ledger, RecordUpdate};
use suitedag::types::{RecordStatus, TestOutcome};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn started_then_done_keeps_one_record_with_original_start() -> TestResult {
    let dir = ledger_dir();
    let ledger = Ledger::new(dir.path());
    ledger.cleanup()?;

    ledger.upsert_test_result("Shop\\LoginTest", "testLogin", RecordUpdate::started())?;
    let first_start = ledger
        .load()?
        .test("Shop\\LoginTest", "testLogin")
        .and_then(|t| t.state.start)
        .ok_or("missing start")?;

    std::thread::sleep(std::time::Duration::from_millis(20));
    ledger.upsert_test_result(
        "Shop\\LoginTest",
        "testLogin",
        RecordUpdate::done(TestOutcome::Passed),
    )?;

    let doc = ledger.load()?;
    let testcase = doc.testcase("Shop\\LoginTest").ok_or("missing testcase")?;
    assert_eq!(testcase.tests.len(), 1);

    let test = &testcase.tests[0];
    assert_eq!(test.state.status, RecordStatus::Done);
    assert_eq!(test.state.outcome, Some(TestOutcome::Passed));
    assert_eq!(test.state.start, Some(first_start));
    assert!(test.state.end.ok_or("missing end")? >= first_start);
    Ok(())
}

#[test]
fn repeated_started_does_not_move_start_or_regress_done() -> TestResult {
    let dir = ledger_dir();
    let ledger = Ledger::new(dir.path());

    ledger.upsert_testcase_result("A", RecordUpdate::started())?;
    let start = ledger.load()?.testcase("A").and_then(|t| t.state.start);

    ledger.upsert_testcase_result("A", RecordUpdate::done(TestOutcome::Failed).with_message("boom"))?;
    ledger.upsert_testcase_result("A", RecordUpdate::started())?;

    let doc = ledger.load()?;
    let record = doc.testcase("A").ok_or("missing testcase")?;
    assert_eq!(record.state.status, RecordStatus::Done);
    assert_eq!(record.state.outcome, Some(TestOutcome::Failed));
    assert_eq!(record.state.message.as_deref(), Some("boom"));
    assert_eq!(record.state.start, start);
    Ok(())
}

#[test]
fn same_test_name_under_different_testcases_stays_separate() -> TestResult {
    let dir = ledger_dir();
    let ledger = Ledger::new(dir.path());
    ledger.cleanup()?;

    ledger.upsert_test_result("A", "testFoo", RecordUpdate::started())?;
    ledger.upsert_test_result("B", "testFoo", RecordUpdate::started())?;
    ledger.upsert_test_result("A", "testFoo", RecordUpdate::done(TestOutcome::Passed))?;
    ledger.upsert_test_result("B", "testFoo", RecordUpdate::done(TestOutcome::Failed))?;

    let doc = ledger.load()?;
    assert_eq!(doc.testcases.len(), 2);
    assert_eq!(
        doc.test("A", "testFoo").and_then(|t| t.state.outcome),
        Some(TestOutcome::Passed)
    );
    assert_eq!(
        doc.test("B", "testFoo").and_then(|t| t.state.outcome),
        Some(TestOutcome::Failed)
    );
    Ok(())
}

#[test]
fn concurrent_writers_never_lose_records() -> TestResult {
    let dir = ledger_dir();
    let ledger = Arc::new(Ledger::new(dir.path()));
    ledger.cleanup()?;

    let writers: Vec<_> = (0..8)
        .map(|w| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || -> Result<(), LedgerError> {
                let testcase = format!("Testcase{}", w % 2);
                for t in 0..5 {
                    let test = format!("test{w}_{t}");
                    ledger.upsert_test_result(&testcase, &test, RecordUpdate::started())?;
                    ledger.upsert_test_result(
                        &testcase,
                        &test,
                        RecordUpdate::done(TestOutcome::Passed),
                    )?;
                    // Same test name written from every thread.
                    ledger.upsert_test_result(&testcase, "testFoo", RecordUpdate::started())?;
                }
                Ok(())
            })
        })
        .collect();

    for writer in writers {
        writer.join().map_err(|_| "writer panicked")??;
    }

    let doc = ledger.load()?;
    assert_eq!(doc.testcases.len(), 2);
    for testcase in &doc.testcases {
        // 4 writers x 5 tests + the shared testFoo.
        assert_eq!(testcase.tests.len(), 21, "{}", testcase.id);
        assert!(
            testcase
                .tests
                .iter()
                .filter(|t| t.name != "testFoo")
                .all(|t| t.state.status == RecordStatus::Done && t.state.start.is_some())
        );
    }
    Ok(())
}

#[test]
fn cleanup_discards_previous_run() -> TestResult {
    let dir = ledger_dir();
    let ledger = Ledger::new(dir.path());

    ledger.upsert_test_result("Old", "testOld", RecordUpdate::done(TestOutcome::Passed))?;
    ledger.upsert_test_result("A", "testFoo", RecordUpdate::done(TestOutcome::Failed))?;

    ledger.cleanup()?;
    assert!(ledger.load()?.testcases.is_empty());

    ledger.upsert_test_result("A", "testFoo", RecordUpdate::started())?;
    let doc = ledger.load()?;
    assert_eq!(doc.testcases.len(), 1);
    let record = doc.test("A", "testFoo").ok_or("missing test")?;
    assert_eq!(record.state.status, RecordStatus::Started);
    assert_eq!(record.state.outcome, None);
    Ok(())
}

#[test]
fn test_record_creates_placeholder_testcase() -> TestResult {
    let dir = ledger_dir();
    let ledger = Ledger::new(dir.path());

    ledger.upsert_test_result("A", "testFoo", RecordUpdate::started())?;
    let doc = ledger.load()?;
    let testcase = doc.testcase("A").ok_or("missing testcase")?;
    assert_eq!(testcase.state.status, RecordStatus::Started);
    assert_eq!(testcase.state.start, None);

    // The scheduler's own record later fills in the testcase fields.
    ledger.upsert_testcase_result("A", RecordUpdate::started())?;
    let doc = ledger.load()?;
    let testcase = doc.testcase("A").ok_or("missing testcase")?;
    assert!(testcase.state.start.is_some());
    assert_eq!(testcase.tests.len(), 1);
    Ok(())
}

#[test]
fn done_without_started_has_no_start() -> TestResult {
    let dir = ledger_dir();
    let ledger = Ledger::new(dir.path());

    ledger.upsert_testcase_result("A", RecordUpdate::done(TestOutcome::Skipped))?;
    let doc = ledger.load()?;
    let record = doc.testcase("A").ok_or("missing testcase")?;
    assert_eq!(record.state.start, None);
    assert!(record.state.end.is_some());
    Ok(())
}

#[test]
fn missing_directory_is_a_lock_error() {
    let dir = ledger_dir();
    let ledger = Ledger::new(dir.path().join("does-not-exist"));

    let err = ledger
        .upsert_test_result("A", "testFoo", RecordUpdate::started())
        .unwrap_err();
    assert!(matches!(err, LedgerError::Lock { .. }), "{err:?}");
    assert!(!dir.path().join("does-not-exist").exists());
}

#[test]
fn corrupt_ledger_is_reported_not_overwritten() -> TestResult {
    let dir = ledger_dir();
    std::fs::write(dir.path().join(LEDGER_FILE_NAME), "{ not json")?;
    let ledger = Ledger::new(dir.path());

    let err = ledger
        .upsert_testcase_result("A", RecordUpdate::started())
        .unwrap_err();
    assert!(matches!(err, LedgerError::Parse { .. }), "{err:?}");
    assert_eq!(
        std::fs::read_to_string(dir.path().join(LEDGER_FILE_NAME))?,
        "{ not json"
    );
    Ok(())
}

#[test]
fn empty_file_reads_as_empty_ledger() -> TestResult {
    let dir = ledger_dir();
    std::fs::write(dir.path().join(LEDGER_FILE_NAME), "")?;
    let ledger = Ledger::new(dir.path());

    assert!(ledger.load()?.testcases.is_empty());
    Ok(())
}

#[test]
fn ledger_file_is_plain_json() -> TestResult {
    let dir = ledger_dir();
    let ledger = Ledger::new(dir.path());
    ledger.upsert_test_result("A", "testFoo", RecordUpdate::done(TestOutcome::Passed))?;

    let raw = std::fs::read_to_string(ledger.path())?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let test = &value["testcases"][0]["tests"][0];
    assert_eq!(test["name"], "testFoo");
    assert_eq!(test["status"], "done");
    assert_eq!(test["outcome"], "passed");
    assert!(test.get("start").is_none());
    Ok(())
}
