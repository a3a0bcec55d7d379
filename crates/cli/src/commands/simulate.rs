//! `simulate` command implementation.
//!
//! Dispatches over a configured group with an operation that fails on the
//! sources named by `--fail` and succeeds everywhere else.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use contracts::{Attempt, Dispatched, GroupConfig, Round};
use dispatcher::{CancellationToken, Dispatcher};
use observability::RoundStatsAggregator;

use super::load_config;
use crate::cli::SimulateArgs;
use crate::error::CliError;

/// Pass cap applied when the group would otherwise poll forever
const DEFAULT_SIMULATED_PASSES: u64 = 10;

/// One operation invocation
#[derive(Debug, Clone, Serialize)]
struct TraceEntry {
    pass: u64,
    index: usize,
    source: String,
    retry: u32,
    ok: bool,
}

impl TraceEntry {
    fn new(attempt: &Attempt<String>, ok: bool) -> Self {
        Self {
            pass: attempt.pass,
            index: attempt.index,
            source: attempt.source.clone(),
            retry: attempt.retry,
            ok,
        }
    }
}

#[derive(Serialize)]
struct SimulationOutput<'a> {
    group: &'a str,
    dispatcher: String,
    trace: &'a [TraceEntry],
    results: &'a [String],
    report: contracts::RoundReport,
}

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let group = config.group(&args.group)?.clone();

    for source in &args.fail {
        if !group.sources.contains(source) {
            return Err(CliError::unknown_source(&group.name, source).into());
        }
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let mut options = config.options_for(&group)?;
    if let Some(ms) = args.interval_ms {
        options = options.with_fail_retry_interval(Duration::from_millis(ms));
    }

    let dispatcher: Dispatcher<String> = Dispatcher::new(group.sources.clone(), options)?
        .with_name(group.name.clone())
        .with_error_action(|attempt: &Attempt<String>, error: &anyhow::Error| {
            debug!(source = %attempt.source, retry = attempt.retry, error = %error, "Observed failure");
        });
    let round = simulation_round(&group, args.passes);
    let failing: HashSet<String> = args.fail.iter().cloned().collect();

    info!(
        group = %group.name,
        dispatcher = %dispatcher,
        failing = failing.len(),
        async_path = args.use_async,
        ?round,
        "Starting simulation"
    );

    let (dispatched, trace) = if args.use_async {
        simulate_async(&dispatcher, &round, &failing).await?
    } else {
        let dispatcher = dispatcher.clone();
        tokio::task::spawn_blocking(move || simulate_sync(&dispatcher, &round, &failing))
            .await
            .context("Simulation task failed")?
    };

    let mut stats = RoundStatsAggregator::new();
    stats.update(&dispatched.report);

    if args.json {
        let output = SimulationOutput {
            group: &group.name,
            dispatcher: dispatcher.to_string(),
            trace: &trace,
            results: &dispatched.results,
            report: dispatched.report,
        };
        let json =
            serde_json::to_string_pretty(&output).context("Failed to serialize simulation")?;
        println!("{}", json);
    } else {
        print_trace(&trace);
        println!(
            "\nRound ended: {} after {} passes (index {}, {} results)",
            dispatched.report.end,
            dispatched.report.cursor.passes,
            dispatched.report.cursor.index,
            dispatched.results.len()
        );
        println!("\n{}", stats.summary());
    }

    if dispatched.report.exhausted() {
        warn!(group = %group.name, "Every source was exhausted");
    }

    Ok(())
}

/// Round described by the group, continuous with `passes` as cap when given
fn simulation_round(group: &GroupConfig, passes: Option<u64>) -> Round<String> {
    match passes {
        Some(cap) => Round::continuous().max_passes(cap),
        None => {
            let round: Round<String> = group.round();
            if round.is_continuous() && round.pass_cap().is_none() {
                info!(
                    passes = DEFAULT_SIMULATED_PASSES,
                    "Group is uncapped, limiting the simulation"
                );
                round.max_passes(DEFAULT_SIMULATED_PASSES)
            } else {
                round
            }
        }
    }
}

fn attempt_source(failing: &HashSet<String>, attempt: &Attempt<String>) -> Result<String> {
    if failing.contains(&attempt.source) {
        anyhow::bail!("simulated failure on {}", attempt.source);
    }
    Ok(format!("{}#{}", attempt.source, attempt.pass))
}

fn simulate_sync(
    dispatcher: &Dispatcher<String>,
    round: &Round<String>,
    failing: &HashSet<String>,
) -> (Dispatched<String>, Vec<TraceEntry>) {
    let mut trace = Vec::new();
    let dispatched = dispatcher.dispatch_func_with_report(
        |attempt: &Attempt<String>| {
            let result = attempt_source(failing, attempt);
            trace.push(TraceEntry::new(attempt, result.is_ok()));
            result
        },
        round,
    );
    (dispatched, trace)
}

async fn simulate_async(
    dispatcher: &Dispatcher<String>,
    round: &Round<String>,
    failing: &HashSet<String>,
) -> Result<(Dispatched<String>, Vec<TraceEntry>)> {
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl+C, cancelling at the next backoff");
                cancel.cancel();
            }
        })
    };

    let mut trace = Vec::new();
    let result = dispatcher
        .dispatch_func_with_report_async(
            |attempt: Attempt<String>| {
                let result = attempt_source(failing, &attempt);
                trace.push(TraceEntry::new(&attempt, result.is_ok()));
                std::future::ready(result)
            },
            round,
            &cancel,
        )
        .await;
    ctrl_c.abort();

    let dispatched = result.map_err(CliError::from)?;
    Ok((dispatched, trace))
}

fn print_trace(trace: &[TraceEntry]) {
    println!("pass  index  source                retry  outcome");
    for entry in trace {
        println!(
            "{:<5} {:<6} {:<21} {:<6} {}",
            entry.pass,
            entry.index,
            entry.source,
            entry.retry,
            if entry.ok { "ok" } else { "failed" }
        );
    }
}
