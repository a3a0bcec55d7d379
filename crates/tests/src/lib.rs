//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Config file -> dispatcher -> round
//! - Concurrent calls over one shared dispatcher
//! - Background pollers built from config groups

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_defaults() {
        let options = contracts::DispatchOptions::default();
        assert_eq!(options.fail_retries, contracts::DEFAULT_FAIL_RETRIES);
        assert_eq!(options.fail_retry_interval, contracts::DEFAULT_FAIL_RETRY_INTERVAL);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Attempt, DispatchConfig, RoundEnd};
    use dispatcher::{CancellationToken, Dispatcher, PollerHandle};
    use observability::RoundStatsAggregator;

    const CONFIG: &str = r#"
[options]
fail_retries = 2
fail_retry_interval_ms = 100

[[groups]]
name = "hosts"
sources = ["h1", "h2", "h3"]
continuous = false

[[groups]]
name = "db"
sources = ["db-primary", "db-replica", "db-primary"]
max_passes = 5

[groups.options]
fail_retries = 1
fail_retry_interval_ms = 1000
"#;

    fn load() -> DispatchConfig {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).expect("config should load")
    }

    fn group_dispatcher(config: &DispatchConfig, name: &str) -> Dispatcher<String, String> {
        let group = config.group(name).unwrap();
        Dispatcher::new(group.sources.clone(), config.options_for(group).unwrap())
            .unwrap()
            .with_name(name)
    }

    /// Config group -> async round: h1 burns its budget, h2 answers
    #[tokio::test(start_paused = true)]
    async fn test_e2e_config_to_single_pass() {
        let config = load();
        let dispatcher = group_dispatcher(&config, "hosts");
        let round = config.group("hosts").unwrap().round();
        let down: HashSet<&str> = ["h1"].into_iter().collect();
        let cancel = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let dispatched = dispatcher
            .dispatch_func_with_report_async(
                |attempt: Attempt<String>| {
                    let result = if down.contains(attempt.source.as_str()) {
                        Err(format!("{} unreachable", attempt.source))
                    } else {
                        Ok(attempt.source.clone())
                    };
                    std::future::ready(result)
                },
                &round,
                &cancel,
            )
            .await
            .unwrap();

        // h1 first pass ends in failover; the group is single-pass
        assert_eq!(dispatched.report.end, RoundEnd::Single);
        assert!(dispatched.results.is_empty());
        assert_eq!(dispatched.report.cursor.index, 1);
        assert_eq!(dispatched.report.cursor.failures, 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200), "elapsed: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(250), "elapsed: {elapsed:?}");
    }

    /// Duplicate sources collapse in the display string but still take a slot
    #[tokio::test(start_paused = true)]
    async fn test_e2e_duplicate_sources() {
        let config = load();
        let dispatcher = group_dispatcher(&config, "db");
        assert_eq!(dispatcher.to_string(), "db-primary,db-replica");
        assert_eq!(dispatcher.count(), 3);

        let round = config.group("db").unwrap().round();
        let seen = Mutex::new(Vec::new());
        let report = dispatcher
            .dispatch_action_async(
                |attempt: Attempt<String>| {
                    seen.lock().unwrap().push(attempt.index);
                    std::future::ready(Err::<(), _>("down".to_string()))
                },
                &round,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.end, RoundEnd::RotationExhausted);
        assert_eq!(*seen.lock().unwrap(), vec![0, 0, 1, 1, 2, 2]);
    }

    /// One dispatcher shared by concurrent calls: each call keeps its own cursor
    #[tokio::test(start_paused = true)]
    async fn test_e2e_concurrent_rounds_share_nothing() {
        let config = load();
        let dispatcher = Arc::new(group_dispatcher(&config, "hosts"));
        let round = Arc::new(contracts::Round::<String>::once());

        let failing = {
            let dispatcher = Arc::clone(&dispatcher);
            let round = Arc::clone(&round);
            tokio::spawn(async move {
                dispatcher
                    .dispatch_action_async(
                        |_: Attempt<String>| std::future::ready(Err::<(), _>("down".to_string())),
                        &round,
                        &CancellationToken::new(),
                    )
                    .await
            })
        };
        let healthy = {
            let dispatcher = Arc::clone(&dispatcher);
            let round = Arc::clone(&round);
            tokio::spawn(async move {
                dispatcher
                    .dispatch_action_async(
                        |_: Attempt<String>| std::future::ready(Ok::<(), String>(())),
                        &round,
                        &CancellationToken::new(),
                    )
                    .await
            })
        };

        let failing = failing.await.unwrap().unwrap();
        let healthy = healthy.await.unwrap().unwrap();

        assert_eq!(failing.cursor.index, 1);
        assert_eq!(healthy.cursor.index, 0);
        assert_eq!(healthy.cursor.failures, 0);
        assert_eq!(dispatcher.metrics().snapshot().rounds, 2);
    }

    /// Poller over a config group, stats aggregated like the CLI does
    #[tokio::test(start_paused = true)]
    async fn test_e2e_poller_from_config() {
        let config = load();
        let dispatcher = group_dispatcher(&config, "hosts");
        let polls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&polls);

        let handle = PollerHandle::spawn(
            dispatcher,
            move |attempt: Attempt<String>| {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                // h1 goes down after its fifth poll
                let result = if attempt.source == "h1" && n >= 5 {
                    Err("h1 down".to_string())
                } else {
                    Ok(())
                };
                std::future::ready(result)
            },
            Duration::from_millis(500),
        );

        tokio::time::sleep(Duration::from_secs(10)).await;
        let metrics = Arc::clone(handle.metrics());
        let report = handle.shutdown().await.unwrap().unwrap();

        assert_eq!(report.end, RoundEnd::Stopped);
        assert_eq!(report.cursor.index, 1);
        assert_eq!(report.cursor.failovers, 1);
        assert_eq!(metrics.snapshot().failures, 3);

        let mut stats = RoundStatsAggregator::new();
        stats.update(&report);
        let summary = stats.summary();
        assert_eq!(summary.rounds, 1);
        assert_eq!(summary.exhausted_rounds, 0);
        assert_eq!(summary.failovers, 1);
    }

    /// Sync path honours the same config semantics
    #[test]
    fn test_e2e_sync_stop_predicate() {
        let config = load();
        let group = config.group("hosts").unwrap();
        let options = config.options_for(group).unwrap().with_fail_retry_interval(Duration::ZERO);
        let dispatcher: Dispatcher<String, String> =
            Dispatcher::new(group.sources.clone(), options).unwrap();
        let round = contracts::Round::continuous().stop_when(|p| p.results() >= 3);

        let served = dispatcher.dispatch_func(
            |attempt: &Attempt<String>| {
                if attempt.source == "h3" {
                    Ok(attempt.pass)
                } else {
                    Err(format!("{} down", attempt.source))
                }
            },
            &round,
        );

        // pass 1 fails over h1, pass 2 fails over h2, passes 3-5 on h3
        assert_eq!(served, vec![3, 4, 5]);
    }
}
