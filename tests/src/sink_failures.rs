//! Sink failure tests for mottag
//!
//! Transport errors and slow consumers are absorbed by the sink tasks; the
//! tick loop keeps its pace and never sees them.

use std::time::Duration;

use integration_tests::{
    batch_config, free_local_port, init_test_logging, unit_square, MockSink, MockSinkBehavior,
    MockStore, TestResult,
};
use mottag_common::{DocumentStoreConfig, SinkMode};
use mottag_sim::{SimRng, TickDriver};
use mottag_sink::{SinkExit, SinkSet, DEFAULT_SHUTDOWN_GRACE};
use tokio::sync::watch;

fn stopped(exits: &[SinkExit], name: &str) -> (u64, u64, u64) {
    exits
        .iter()
        .find_map(|e| match e {
            SinkExit::Stopped { report, drops } if report.name == name => {
                Some((report.published, report.failed, *drops))
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("sink {name} did not stop cleanly: {exits:?}"))
}

#[tokio::test]
async fn test_failing_sink_does_not_halt_run() -> TestResult {
    init_test_logging();

    let config = batch_config(&unit_square(), 31, 50);
    let mut sinks = SinkSet::new();
    let (broken, broken_recorder) = MockSink::with_behavior("broken", MockSinkBehavior::FailAll);
    let (healthy, healthy_recorder) = MockSink::new("healthy");
    sinks.spawn(broken, 64);
    sinks.spawn(healthy, 64);

    let mut driver = TickDriver::new(&config, SimRng::seeded(31))?;
    let (_tx, rx) = watch::channel(false);
    let summary = driver.run(&mut sinks, rx).await?;
    assert_eq!(summary.ticks, 50);
    assert!(!summary.cancelled);

    let exits = sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    assert_eq!(stopped(&exits, "broken"), (0, 50, 0));
    assert_eq!(stopped(&exits, "healthy"), (50, 0, 0));
    assert_eq!(broken_recorder.failures(), 50);
    assert!(broken_recorder.is_closed());
    assert_eq!(healthy_recorder.published(), 50);
    Ok(())
}

#[tokio::test]
async fn test_intermittent_failures_are_counted() -> TestResult {
    let config = batch_config(&unit_square(), 32, 30);
    let mut sinks = SinkSet::new();
    let (flaky, recorder) = MockSink::with_behavior("flaky", MockSinkBehavior::FailEvery(3));
    sinks.spawn(flaky, 64);

    let mut driver = TickDriver::new(&config, SimRng::seeded(32))?;
    let (_tx, rx) = watch::channel(false);
    driver.run(&mut sinks, rx).await?;

    let exits = sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    assert_eq!(stopped(&exits, "flaky"), (20, 10, 0));
    assert!(recorder.ticks().iter().all(|t| t % 3 != 0));
    Ok(())
}

#[tokio::test]
async fn test_slow_sink_drops_instead_of_stalling() -> TestResult {
    init_test_logging();

    let config = batch_config(&unit_square(), 33, 200);
    let mut sinks = SinkSet::new();
    let (slow, slow_recorder) = MockSink::with_behavior(
        "slow",
        MockSinkBehavior::Slow(Duration::from_millis(50)),
    );
    let (fast, fast_recorder) = MockSink::new("fast");
    sinks.spawn(slow, 2);
    sinks.spawn(fast, 512);

    let mut driver = TickDriver::new(&config, SimRng::seeded(33))?;
    let (_tx, rx) = watch::channel(false);
    let summary = tokio::time::timeout(Duration::from_secs(5), driver.run(&mut sinks, rx)).await??;

    assert_eq!(summary.ticks, 200);
    assert!(summary.sink_drops >= 100, "drops {}", summary.sink_drops);
    assert_eq!(summary.sink_drops, sinks.total_drops());

    let exits = sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    let (slow_published, _, slow_drops) = stopped(&exits, "slow");
    assert_eq!(slow_published + slow_drops, 200);
    assert_eq!(slow_published as usize, slow_recorder.published());
    assert_eq!(stopped(&exits, "fast"), (200, 0, 0));
    assert_eq!(fast_recorder.published(), 200);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_document_store() -> TestResult {
    init_test_logging();

    let port = free_local_port().await;
    let mut config = batch_config(&unit_square(), 34, 20);
    config.trail = 0;
    config.sink.mode = SinkMode::DocumentStore;
    config.sink.document_store = Some(DocumentStoreConfig::new(
        format!("http://127.0.0.1:{port}"),
        "dev",
    ));

    let (mut sinks, _) = SinkSet::from_config(&config)?;
    let mut driver = TickDriver::new(&config, SimRng::seeded(34))?;
    let (_tx, rx) = watch::channel(false);
    let summary = driver.run(&mut sinks, rx).await?;
    assert_eq!(summary.ticks, 20);

    let exits = sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    assert_eq!(stopped(&exits, "document-store"), (0, 20, 0));
    Ok(())
}

#[tokio::test]
async fn test_store_error_status_counts_as_failure() -> TestResult {
    let store = MockStore::start().await?;
    store.set_status(503);

    let mut config = batch_config(&unit_square(), 35, 6);
    config.trail = 0;
    config.sink.mode = SinkMode::DocumentStore;
    config.sink.document_store = Some(DocumentStoreConfig::new(store.base_url(), "dev"));

    let (mut sinks, _) = SinkSet::from_config(&config)?;
    let mut driver = TickDriver::new(&config, SimRng::seeded(35))?;
    let (_tx, rx) = watch::channel(false);
    driver.run(&mut sinks, rx).await?;

    let exits = sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    assert_eq!(stopped(&exits, "document-store"), (0, 6, 0));
    assert_eq!(store.put_count().await, 6);
    Ok(())
}
