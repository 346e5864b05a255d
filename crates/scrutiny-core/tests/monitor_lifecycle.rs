//! End-to-end lifecycle tests for the job monitor, driven by the scripted
//! backend under virtual time.

use scrutiny_client::types::{JobStatus, ProgressFrame, RawFileResult, ResultsResponse};
use scrutiny_core::monitor::{JobMonitor, MonitorEvent, refresh_report};
use scrutiny_core::testing::{MockBackend, status};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;

const POLL: Duration = Duration::from_secs(2);

fn results_with_one_issue() -> ResultsResponse {
    ResultsResponse {
        results: vec![RawFileResult {
            file: "app.py".to_string(),
            total_issues: 1,
            ..RawFileResult::default()
        }],
        ..ResultsResponse::default()
    }
}

async fn drain_until_terminal(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<MonitorEvent>,
) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn completed_on_attach_skips_straight_to_results() {
    let backend = Arc::new(
        MockBackend::new(vec![status("j1", "completed", 100.0, "done")])
            .with_results(results_with_one_issue()),
    );
    let (_monitor, mut rx) = JobMonitor::spawn(backend.clone(), "j1", POLL);

    let events = drain_until_terminal(&mut rx).await;
    assert!(matches!(
        events[0],
        MonitorEvent::Status(ref s) if s.status == JobStatus::Completed
    ));
    assert!(matches!(events[1], MonitorEvent::Report(_)));

    // One initial snapshot, one results fetch, nothing else.
    assert_eq!(backend.status_calls(), 1);
    assert_eq!(backend.results_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn processing_job_completes_via_polling() {
    let backend = Arc::new(
        MockBackend::new(vec![
            status("j1", "processing", 20.0, "scanning"),
            status("j1", "processing", 60.0, "evaluating"),
            status("j1", "completed", 100.0, "done"),
        ])
        .with_results(results_with_one_issue()),
    );
    let (_monitor, mut rx) = JobMonitor::spawn(backend.clone(), "j1", POLL);

    let events = drain_until_terminal(&mut rx).await;

    // Progress moved forward, the channel was reported lost (none was
    // scripted), and exactly one report arrived at the end.
    let progresses: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Status(s) => Some(s.progress),
            _ => None,
        })
        .collect();
    assert_eq!(progresses, vec![20, 60, 100]);
    assert!(events.iter().any(|e| matches!(e, MonitorEvent::ChannelLost)));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, MonitorEvent::Report(_)))
            .count(),
        1
    );
    assert_eq!(backend.results_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_job_emits_failure_and_never_fetches_results() {
    let backend = Arc::new(MockBackend::new(vec![
        status("j1", "processing", 40.0, ""),
        status("j1", "failed", 40.0, "security agent crashed"),
    ]));
    let (_monitor, mut rx) = JobMonitor::spawn(backend.clone(), "j1", POLL);

    let events = drain_until_terminal(&mut rx).await;
    assert!(events.iter().any(|e| matches!(
        e,
        MonitorEvent::JobFailed { message } if message == "security agent crashed"
    )));
    assert_eq!(backend.results_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn results_fetch_failure_is_nonfatal_and_retryable() {
    let backend = Arc::new(
        MockBackend::new(vec![status("j1", "completed", 100.0, "")])
            .with_results_error("results not ready"),
    );
    let (_monitor, mut rx) = JobMonitor::spawn(backend.clone(), "j1", POLL);

    let events = drain_until_terminal(&mut rx).await;
    // The job is completed; the results trouble is its own event, not a
    // job failure.
    assert!(!events.iter().any(|e| matches!(e, MonitorEvent::JobFailed { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        MonitorEvent::ResultsError { message } if message.contains("results not ready")
    )));
    assert_eq!(backend.results_calls(), 1);

    // An explicit refresh re-runs fetch-and-transform.
    assert!(refresh_report(&*backend, "j1").await.is_err());
    assert_eq!(backend.results_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn progress_frames_ratchet_and_polling_still_finishes() {
    let backend = Arc::new(
        MockBackend::new(vec![
            status("j1", "processing", 0.0, ""),
            status("j1", "processing", 0.0, ""),
            status("j1", "completed", 100.0, ""),
        ])
        .with_progress(vec![
            ProgressFrame::Progress {
                progress: 10.0,
                message: Some("parsing".to_string()),
            },
            ProgressFrame::Progress {
                progress: 55.0,
                message: None,
            },
            // Out-of-order frame must not move the gauge backwards.
            ProgressFrame::Progress {
                progress: 30.0,
                message: None,
            },
        ])
        .with_results(results_with_one_issue()),
    );
    let (_monitor, mut rx) = JobMonitor::spawn(backend.clone(), "j1", POLL);

    let events = drain_until_terminal(&mut rx).await;
    let progresses: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Status(s) => Some(s.progress),
            _ => None,
        })
        .collect();

    // 10 and 55 from the channel, 100 from the completing poll; the
    // regressing 30 never surfaces.
    assert!(progresses.contains(&10));
    assert!(progresses.contains(&55));
    assert!(!progresses.contains(&30));
    assert_eq!(*progresses.last().unwrap(), 100);
    assert!(progresses.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(backend.results_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_poll_stops_all_activity() {
    // A job that never finishes: the monitor would poll forever.
    let backend = Arc::new(MockBackend::new(vec![status(
        "j1",
        "processing",
        50.0,
        "stuck",
    )]));
    let (monitor, mut rx) = JobMonitor::spawn(backend.clone(), "j1", POLL);

    // Let a few poll intervals elapse.
    tokio::time::sleep(POLL * 3).await;
    assert!(backend.status_calls() > 1);

    monitor.shutdown();
    // Drain whatever was emitted before teardown.
    while rx.try_recv().is_ok() {}
    let calls_at_shutdown = backend.status_calls();

    // Advance virtual time well past several poll intervals: a dangling
    // timer or channel would show up as new calls or events here.
    tokio::time::sleep(POLL * 10).await;

    assert_eq!(backend.status_calls(), calls_at_shutdown);
    match rx.try_recv() {
        Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
        Ok(event) => panic!("event delivered after teardown: {event:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_is_teardown_too() {
    let backend = Arc::new(MockBackend::new(vec![status(
        "j1",
        "processing",
        10.0,
        "",
    )]));
    let (monitor, mut rx) = JobMonitor::spawn(backend.clone(), "j1", POLL);

    tokio::time::sleep(POLL).await;
    drop(monitor);
    while rx.try_recv().is_ok() {}
    let calls = backend.status_calls();

    tokio::time::sleep(POLL * 5).await;
    assert_eq!(backend.status_calls(), calls);
}
