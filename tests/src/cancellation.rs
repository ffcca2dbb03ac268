//! Cancellation tests for mottag
//!
//! The run loop stops at a tick boundary once the token flips, and the sinks
//! still drain and close afterwards.

use std::time::{Duration, Instant};

use integration_tests::{
    init_test_logging, paced_config, wait_for_condition, MockSink, MockSinkEvent, TestResult,
    DEFAULT_POLL_INTERVAL, DEFAULT_TEST_TIMEOUT,
};
use mottag_sim::{SimRng, TickDriver};
use mottag_sink::{SinkExit, SinkSet, DEFAULT_SHUTDOWN_GRACE};
use tokio::sync::watch;
use tokio::time::timeout;

#[tokio::test]
async fn test_cancel_paced_run() -> TestResult {
    init_test_logging();

    let config = paced_config(3, 0.02);
    let mut sinks = SinkSet::new();
    let (mock, recorder) = MockSink::new("mock");
    sinks.spawn(mock, 64);

    let (tx, rx) = watch::channel(false);
    let run = tokio::spawn(async move {
        let mut driver = TickDriver::new(&config, SimRng::seeded(3))?;
        let summary = driver.run(&mut sinks, rx).await?;
        Ok::<_, mottag_common::Error>((summary, sinks))
    });

    wait_for_condition(
        || async { recorder.published() >= 5 },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await?;
    tx.send(true)?;

    let (summary, sinks) = timeout(DEFAULT_TEST_TIMEOUT, run).await???;
    assert!(summary.cancelled);
    assert!(summary.ticks >= 5);

    let exits = sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    assert!(exits.iter().all(SinkExit::is_clean));
    assert!(recorder.is_closed());
    assert_eq!(recorder.published() as u64, summary.ticks);
    assert_eq!(
        recorder.ticks(),
        (0..summary.ticks).collect::<Vec<_>>(),
        "no tick may be cut short or skipped"
    );
    Ok(())
}

#[tokio::test]
async fn test_cancel_interrupts_long_wait() -> TestResult {
    init_test_logging();

    let config = paced_config(4, 30.0);
    let mut sinks = SinkSet::new();
    let (mock, mut recorder) = MockSink::new("mock");
    sinks.spawn(mock, 8);

    let (tx, rx) = watch::channel(false);
    let started = Instant::now();
    let run = tokio::spawn(async move {
        let mut driver = TickDriver::new(&config, SimRng::seeded(4))?;
        let summary = driver.run(&mut sinks, rx).await?;
        Ok::<_, mottag_common::Error>((summary, sinks))
    });

    // first tick fires immediately, the second is 30 s away
    assert_eq!(
        timeout(DEFAULT_TEST_TIMEOUT, recorder.next_event()).await?,
        Some(MockSinkEvent::Published { tick: 0 })
    );
    tx.send(true)?;

    let (summary, sinks) = timeout(DEFAULT_TEST_TIMEOUT, run).await???;
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(summary.cancelled);
    assert_eq!(summary.ticks, 1);

    sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    assert_eq!(recorder.drain_events(), vec![MockSinkEvent::Closed]);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_before_start() -> TestResult {
    let config = paced_config(5, 0.01);
    let mut sinks = SinkSet::new();
    let (mock, recorder) = MockSink::new("mock");
    sinks.spawn(mock, 8);

    let mut driver = TickDriver::new(&config, SimRng::seeded(5))?;
    let (_tx, rx) = watch::channel(true);
    let summary = driver.run(&mut sinks, rx).await?;

    assert!(summary.cancelled);
    assert_eq!(summary.ticks, 0);
    sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    assert_eq!(recorder.published(), 0);
    assert!(recorder.is_closed());
    Ok(())
}

#[tokio::test]
async fn test_dropped_token_sender_stops_run() -> TestResult {
    let config = paced_config(6, 0.01);
    let mut sinks = SinkSet::new();

    let mut driver = TickDriver::new(&config, SimRng::seeded(6))?;
    let (tx, rx) = watch::channel(false);
    drop(tx);

    let summary = timeout(DEFAULT_TEST_TIMEOUT, driver.run(&mut sinks, rx)).await??;
    assert!(summary.cancelled);
    sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    Ok(())
}
