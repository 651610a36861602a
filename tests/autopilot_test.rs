mod common;

use std::{sync::atomic::Ordering, time::Duration};

use common::{FakeApi, FakeClock, paused, playing, track, tracks, uris};
use spotpilot::{
    autopilot::{
        Autopilot, AutopilotConfig, EnqueueResult, LoopPhase, RefillPlan, TickReport, enqueue,
        refill, should_refill,
    },
    error::ApiError,
    exclusions::SessionMemory,
    mood::MoodFeatures,
    types::QueueSnapshot,
};
use tokio::sync::watch;

const NOW: i64 = 1_700_000_000;

fn config(threshold: usize) -> AutopilotConfig {
    AutopilotConfig {
        threshold,
        ..Default::default()
    }
}

fn refill_of(report: TickReport) -> spotpilot::autopilot::RefillReport {
    match report {
        TickReport::TrackChanged {
            refill: Some(refill),
            ..
        } => refill,
        other => panic!("expected a refill, got {other:?}"),
    }
}

#[test]
fn test_should_refill() {
    assert!(should_refill(true, 2, 3));
    assert!(should_refill(true, 0, 1));
    assert!(!should_refill(true, 3, 3));
    assert!(!should_refill(false, 0, 3));
}

#[tokio::test]
async fn test_track_change_with_short_queue_refills_in_order() {
    let api = FakeApi::new()
        .with_playback(Some(playing("A")))
        .with_recommendations(tracks(&["A", "B", "C", "D"]));
    let clock = FakeClock::at(NOW);
    let mut pilot = Autopilot::new(&api, config(3), clock.clone());

    let report = refill_of(pilot.tick().await.unwrap());

    assert_eq!(
        api.queued(),
        vec!["spotify:track:B", "spotify:track:C", "spotify:track:D"]
    );
    assert_eq!(uris(&report.queued), api.queued());
    assert_eq!(report.source, "recommendations");
    assert!(report.skipped.is_empty());

    let state = pilot.state();
    for uri in api.queued() {
        assert!(state.memory.contains(&uri));
    }
    assert_eq!(state.last_refill_at, Some(NOW));
    assert_eq!(state.phase, LoopPhase::Tracking);

    let request = &api.recommendation_requests.lock().unwrap()[0];
    assert_eq!(request.seed_tracks, vec!["A"]);
    assert_eq!(request.limit, 3 + 10);
}

#[tokio::test]
async fn test_healthy_queue_is_left_alone() {
    let api = FakeApi::new()
        .with_playback(Some(playing("A")))
        .with_queue(tracks(&["q1", "q2", "q3"]))
        .with_recommendations(tracks(&["B"]));
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));

    let report = pilot.tick().await.unwrap();

    assert_eq!(
        report,
        TickReport::TrackChanged {
            track: track("A"),
            queue_depth: 3,
            refill: None,
        }
    );
    assert!(api.queued().is_empty());
    assert!(api.recommendation_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_enqueue_is_skipped() {
    let api = FakeApi::new()
        .with_playback(Some(playing("A")))
        .with_recommendations(tracks(&["B", "C", "D", "E"]))
        .failing("spotify:track:C");
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));

    let report = refill_of(pilot.tick().await.unwrap());

    assert_eq!(
        api.queued(),
        vec!["spotify:track:B", "spotify:track:D", "spotify:track:E"]
    );
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, track("C"));
    assert!(report.skipped[0].1.contains("Invalid track uri"));
    assert!(!pilot.state().memory.contains("spotify:track:C"));
}

#[tokio::test]
async fn test_same_track_is_not_refilled_twice() {
    let api = FakeApi::new()
        .with_playback(Some(playing("A")))
        .with_recommendations(tracks(&["B"]));
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));

    pilot.tick().await.unwrap();
    let second = pilot.tick().await.unwrap();

    assert_eq!(second, TickReport::Unchanged);
    assert_eq!(api.queue_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.recommendation_requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_pause_and_resume_same_track_is_not_a_change() {
    let api = FakeApi::new()
        .with_playback(Some(playing("A")))
        .with_queue(tracks(&["q1", "q2", "q3"]));
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));
    pilot.tick().await.unwrap();

    api.set_playback(Some(paused("A")));
    assert_eq!(
        pilot.tick().await.unwrap(),
        TickReport::Idle { entered: true }
    );
    assert_eq!(
        pilot.tick().await.unwrap(),
        TickReport::Idle { entered: false }
    );
    assert_eq!(pilot.state().phase, LoopPhase::Idle);

    api.set_playback(Some(playing("A")));
    assert_eq!(pilot.tick().await.unwrap(), TickReport::Unchanged);
    assert_eq!(api.queue_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_nothing_playing_on_start_is_announced_once() {
    let api = FakeApi::new();
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));

    assert_eq!(
        pilot.tick().await.unwrap(),
        TickReport::Idle { entered: true }
    );
    assert_eq!(
        pilot.tick().await.unwrap(),
        TickReport::Idle { entered: false }
    );
    assert_eq!(api.queue_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_second_refill_avoids_what_was_queued_before() {
    let api = FakeApi::new()
        .with_playback(Some(playing("A")))
        .with_recommendations(tracks(&["B", "C", "D"]));
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));
    pilot.tick().await.unwrap();

    // B started, the rest of the queue got cleared elsewhere
    *api.queue.lock().unwrap() = QueueSnapshot::default();
    api.set_playback(Some(playing("B")));
    *api.recommendations.lock().unwrap() = Some(tracks(&["B", "C", "D", "E", "F", "G"]));

    let report = refill_of(pilot.tick().await.unwrap());

    assert_eq!(
        uris(&report.queued),
        vec!["spotify:track:E", "spotify:track:F", "spotify:track:G"]
    );
}

#[tokio::test]
async fn test_dedup_window_lets_old_tracks_return() {
    let api = FakeApi::new()
        .with_playback(Some(playing("A")))
        .with_recommendations(tracks(&["B", "C", "D"]));
    let clock = FakeClock::at(NOW);
    let mut pilot = Autopilot::new(
        &api,
        AutopilotConfig {
            dedup_window: Some(Duration::from_secs(60)),
            ..config(3)
        },
        clock.clone(),
    );
    pilot.tick().await.unwrap();

    *api.queue.lock().unwrap() = QueueSnapshot::default();
    api.set_playback(Some(playing("X")));
    clock.advance(120);

    let report = refill_of(pilot.tick().await.unwrap());

    assert_eq!(
        uris(&report.queued),
        vec!["spotify:track:B", "spotify:track:C", "spotify:track:D"]
    );
    assert_eq!(pilot.state().last_refill_at, Some(NOW + 120));
}

#[tokio::test]
async fn test_exhausted_discovery_queues_nothing() {
    let api = FakeApi::new().with_playback(Some(playing("A")));
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));

    let report = refill_of(pilot.tick().await.unwrap());

    assert!(report.queued.is_empty());
    assert_eq!(report.source, "nothing");
    assert_eq!(pilot.state().last_refill_at, None);
}

#[tokio::test]
async fn test_tick_error_is_returned() {
    let api = FakeApi::new().with_playback(Some(playing("A")));
    api.set_offline(true);
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));

    let err = pilot.tick().await.unwrap_err();

    assert!(matches!(err, ApiError::Transient(_)));
}

#[tokio::test]
async fn test_run_survives_errors_until_shutdown() {
    let api = FakeApi::new();
    api.set_offline(true);
    let clock = FakeClock::at(NOW);
    let mut pilot = Autopilot::new(&api, config(3), clock.clone());
    let (tx, rx) = watch::channel(false);

    let stopper = async {
        while api.playback_calls.load(Ordering::SeqCst) < 3 {
            tokio::task::yield_now().await;
        }
        tx.send(true).unwrap();
    };
    tokio::join!(pilot.run(rx), stopper);

    assert!(api.playback_calls.load(Ordering::SeqCst) >= 3);
    assert!(clock.sleeps().iter().all(|d| *d == Duration::from_secs(3)));
}

#[tokio::test]
async fn test_shutdown_during_refill_lets_the_tick_finish() {
    let (tx, rx) = watch::channel(false);
    let api = FakeApi::new()
        .with_playback(Some(playing("A")))
        .with_recommendations(tracks(&["B", "C", "D"]))
        .on_enqueue(move || {
            let _ = tx.send(true);
        });
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));

    pilot.run(rx).await;

    assert_eq!(
        api.queued(),
        vec!["spotify:track:B", "spotify:track:C", "spotify:track:D"]
    );
    assert_eq!(api.playback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_does_not_start_after_shutdown() {
    let api = FakeApi::new();
    let mut pilot = Autopilot::new(&api, config(3), FakeClock::at(NOW));
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    pilot.run(rx).await;

    assert_eq!(api.playback_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refill_helper_remembers_queued_tracks() {
    let api = FakeApi::new()
        .with_recent(tracks(&["r1"]))
        .with_recommendations(tracks(&["r1", "n1", "n2"]));
    let mut memory = SessionMemory::new(None);

    let report = refill(
        &api,
        Some(&track("now")),
        &QueueSnapshot::default(),
        RefillPlan {
            needed: 5,
            overfetch: 0,
            mood: MoodFeatures::default(),
        },
        &mut memory,
        NOW,
    )
    .await
    .unwrap();

    assert_eq!(uris(&report.queued), vec!["spotify:track:n1", "spotify:track:n2"]);
    assert_eq!(memory.len(), 2);
}

#[tokio::test]
async fn test_enqueue_reports_skip_reason() {
    let api = FakeApi::new().failing("spotify:track:bad");

    assert_eq!(enqueue(&api, &track("good")).await, EnqueueResult::Ok);
    match enqueue(&api, &track("bad")).await {
        EnqueueResult::Skip(reason) => assert!(reason.contains("HTTP 400")),
        EnqueueResult::Ok => panic!("bad track was queued"),
    }
}
