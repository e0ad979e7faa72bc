// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod ledger;
pub mod logging;
pub mod types;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, RecordArgs, RunArgs};
use crate::config::{ConfigFile, ConfigSection, load_and_validate};
use crate::dag::{OrderStrategy, Scheduler, SchedulerOptions, Tree, strategy_for};
use crate::discovery::{Discovery, GroupFilter, ManifestDiscovery};
use crate::engine::{RunSummary, Runtime, RuntimeOptions};
use crate::exec::ProcessExecutor;
use crate::ledger::{Ledger, RecordUpdate};
use crate::types::{OrderStrategyKind, RecordStatus};

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    match args.command {
        Command::Run(run_args) => {
            let no_exit = run_args.no_exit;
            let summary = run_tests(run_args).await?;
            Ok(summary.map_or(0, |summary| summary.exit_code(no_exit)))
        }
        Command::Record(record_args) => {
            record(record_args)?;
            Ok(0)
        }
    }
}

/// The `run` subcommand.
///
/// This wires together:
/// - config loading and CLI overrides
/// - discovery and group filtering
/// - graph building and the order strategy
/// - ledger reset, process executor and the async runtime
///
/// Returns `None` for a dry run.
pub async fn run_tests(args: RunArgs) -> Result<Option<RunSummary>> {
    let mut cfg = load_and_validate(&args.config)
        .with_context(|| format!("failed to load config {:?}", args.config))?;
    apply_overrides(&mut cfg.config, &args)?;

    let entries = ManifestDiscovery::new(&cfg).discover()?;
    let entries = GroupFilter::new(args.groups.clone(), args.exclude_groups.clone()).apply(entries);
    let tree = dag::build(entries)?;
    info!(
        testcases = tree.len(),
        height = tree.height(),
        "testcase tree built"
    );

    let strategy = strategy_for(cfg.config.order, cfg.config.history_file.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &tree, strategy.as_ref());
        return Ok(None);
    }

    let ledger = Ledger::new(cfg.config.ledger_dir.clone());
    ledger.cleanup()?;

    let executor = ProcessExecutor::new(&cfg.executor, cfg.config.ledger_dir.clone());
    let scheduler = Scheduler::new(
        tree,
        strategy.as_ref(),
        SchedulerOptions {
            max_concurrency: cfg.config.max_concurrency,
            ignore_delays: cfg.config.ignore_delays,
            process_timeout: cfg.config.process_timeout,
        },
    );
    let options = RuntimeOptions {
        poll_interval: cfg.config.poll_interval,
    };

    let summary = Runtime::new(scheduler, executor, ledger, options).run().await?;
    Ok(Some(summary))
}

/// CLI flags win over the `[config]` section.
fn apply_overrides(config: &mut ConfigSection, args: &RunArgs) -> Result<()> {
    if let Some(n) = args.max_concurrency {
        if n == 0 {
            bail!("--max-concurrency must be >= 1 (got 0)");
        }
        config.max_concurrency = n;
    }
    if let Some(ref dir) = args.ledger_dir {
        config.ledger_dir = dir.clone();
    }
    if let Some(order) = args.order {
        config.order = order;
    }
    if let Some(ref history) = args.history {
        config.history_file = Some(history.clone());
        if args.order.is_none() {
            config.order = OrderStrategyKind::History;
        }
    }
    config.ignore_delays |= args.ignore_delays;
    Ok(())
}

/// The `record` subcommand: upsert one test record into the ledger.
pub fn record(args: RecordArgs) -> Result<()> {
    let mut update = match args.status {
        RecordStatus::Started => {
            if let Some(outcome) = args.outcome {
                warn!(%outcome, "ignoring --outcome for a started record");
            }
            RecordUpdate::started()
        }
        RecordStatus::Done => {
            let outcome = args
                .outcome
                .ok_or_else(|| anyhow!("--outcome is required with --status done"))?;
            RecordUpdate::done(outcome)
        }
    };
    if let Some(message) = args.message {
        update = update.with_message(message);
    }

    let ledger = Ledger::new(args.ledger_dir.clone());
    ledger
        .upsert_test_result(&args.testcase, &args.test, update)
        .with_context(|| format!("failed to record test '{}'", args.test))?;
    Ok(())
}

/// Print the tree with delays and priorities.
fn print_dry_run(cfg: &ConfigFile, tree: &Tree, strategy: &dyn OrderStrategy) {
    let priorities = strategy.optimize(tree);

    println!("suitedag dry-run");
    println!("  config.max_concurrency = {}", cfg.config.max_concurrency);
    println!("  config.ledger_dir = {}", cfg.config.ledger_dir.display());
    println!("  config.order = {}", strategy.name());
    if cfg.config.ignore_delays {
        println!("  config.ignore_delays = true");
    }
    println!(
        "  executor = {} {}",
        cfg.executor.program,
        cfg.executor.args.join(" ")
    );
    println!();

    println!("testcases ({}, height {}):", tree.len(), tree.height());
    for &node in tree.preorder() {
        if node == tree.root() {
            continue;
        }
        let id = tree.id(node);
        let indent = "  ".repeat(tree.depth(node) + 1);
        let priority = priorities
            .get(id)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());

        match tree.dependency(node) {
            Some(_) => println!(
                "{indent}- {id} (+{} min, total {} min, priority {priority})",
                tree.edge_delay(node),
                tree.accumulated_delay(node)
            ),
            None => println!("{indent}- {id} (priority {priority})"),
        }
    }

    debug!("dry-run complete (no execution)");
}
