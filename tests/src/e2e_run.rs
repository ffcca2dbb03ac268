//! End-to-end run tests for mottag
//!
//! Drive the simulator through real sink tasks and check what arrives at
//! the other end.

use integration_tests::{
    batch_config, init_test_logging, unit_square, MockSink, MockStore, TestResult,
};
use mottag_common::{DocumentStoreConfig, SinkMode};
use mottag_sim::{ManualClock, SimRng, TickDriver};
use mottag_sink::payload::round2;
use mottag_sink::{SinkExit, SinkSet, DEFAULT_SHUTDOWN_GRACE};
use tokio::sync::watch;

#[tokio::test]
async fn test_batch_run_reaches_tick_limit() -> TestResult {
    init_test_logging();

    let mut config = batch_config(&unit_square(), 21, 120);
    config.trail = 50;

    let (mut sinks, trail) = SinkSet::from_config(&config)?;
    let (mock, recorder) = MockSink::new("mock");
    sinks.spawn(mock, 256);

    let mut driver = TickDriver::new(&config, SimRng::from_optional_seed(config.seed))?;
    let (_tx, rx) = watch::channel(false);
    let summary = driver.run(&mut sinks, rx).await?;

    assert_eq!(summary.ticks, 120);
    assert_eq!(summary.sink_drops, 0);
    assert!(!summary.cancelled);

    let exits = sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    assert!(exits.iter().all(SinkExit::is_clean));

    assert_eq!(recorder.ticks(), (0..120).collect::<Vec<_>>());
    assert!(recorder.is_closed());

    let snapshot = trail.expect("trail enabled").snapshot();
    assert_eq!(snapshot.len(), 50);
    assert_eq!(snapshot.last_tick, Some(119));
    let samples = recorder.samples();
    assert_eq!(snapshot.true_positions[49], samples[119].true_position);
    assert_eq!(snapshot.estimated_positions[0], samples[70].estimated_position);
    Ok(())
}

#[tokio::test]
async fn test_same_seed_same_stream() -> TestResult {
    init_test_logging();

    let mut streams = Vec::new();
    for _ in 0..2 {
        let config = batch_config(&unit_square(), 77, 200);
        let mut sinks = SinkSet::new();
        let (mock, recorder) = MockSink::new("mock");
        sinks.spawn(mock, 512);

        let mut driver = TickDriver::new(&config, SimRng::seeded(77))?
            .with_clock(Box::new(ManualClock::new(1_700_000_000_000, 200)));
        let (_tx, rx) = watch::channel(false);
        driver.run(&mut sinks, rx).await?;
        sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
        streams.push(recorder.samples());
    }

    assert_eq!(streams[0].len(), 200);
    assert_eq!(streams[0], streams[1]);

    let config = batch_config(&unit_square(), 78, 200);
    let mut driver = TickDriver::new(&config, SimRng::seeded(78))?;
    let other = driver.tick()?;
    assert_ne!(other.readings, streams[0][0].readings);
    Ok(())
}

#[tokio::test]
async fn test_document_store_receives_every_tick() -> TestResult {
    init_test_logging();

    let store = MockStore::start().await?;
    let mut config = batch_config(&unit_square(), 5, 8);
    config.trail = 0;
    config.sink.mode = SinkMode::DocumentStore;
    config.sink.document_store = Some(DocumentStoreConfig::new(store.base_url(), "tag-9"));
    config.validate()?;

    let (mut sinks, _) = SinkSet::from_config(&config)?;
    let (mock, recorder) = MockSink::new("mock");
    sinks.spawn(mock, 64);

    let mut driver = TickDriver::new(&config, SimRng::seeded(5))?;
    let (_tx, rx) = watch::channel(false);
    let summary = driver.run(&mut sinks, rx).await?;
    assert_eq!(summary.ticks, 8);

    let exits = sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    match &exits[0] {
        SinkExit::Stopped { report, drops } => {
            assert_eq!(report.name, "document-store");
            assert_eq!(report.published, 8);
            assert_eq!(report.failed, 0);
            assert_eq!(*drops, 0);
        }
        other => panic!("document store did not stop cleanly: {other:?}"),
    }

    let puts = store.puts().await;
    let samples = recorder.samples();
    assert_eq!(puts.len(), 8);
    for (put, sample) in puts.iter().zip(&samples) {
        assert_eq!(put.path, "/feed/tag-9.json");
        for i in 0..4 {
            let entry = &put.body[format!("scan{}", i + 1)];
            assert_eq!(entry["rssi"].as_f64(), Some(round2(sample.readings[i])));
            assert_eq!(entry["server_timestamp"].as_u64(), Some(sample.timestamp_ms));
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_estimates_follow_truth_on_average() -> TestResult {
    let mut config = batch_config(&unit_square(), 9, 2000);
    config.noise_std = 0.0;

    let mut driver = TickDriver::new(&config, SimRng::seeded(9))?;
    let mut total_error = 0.0;
    for _ in 0..2000 {
        total_error += driver.tick()?.position_error();
    }
    let mean_error = total_error / 2000.0;

    assert!(mean_error < 6.0, "mean error {mean_error}");
    Ok(())
}
