use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    autopilot::{DEFAULT_OVERFETCH, RefillPlan, refill},
    cli::{connect, resolve_mood},
    clock::{Clock, SystemClock},
    config::Settings,
    error,
    exclusions::SessionMemory,
    info,
    spotify::MusicApi,
    success,
    types::QueueTableRow,
    warning,
};

pub async fn show_queue(settings: &Settings) {
    let client = connect(settings).await;
    let queue = match client.queue().await {
        Ok(queue) => queue,
        Err(e) => error!("Cannot read the queue: {}", e),
    };

    match &queue.currently_playing {
        Some(track) => info!("Now playing: {} by {}", track.name, track.artist_name),
        None => info!("Nothing playing"),
    }

    if queue.upcoming.is_empty() {
        warning!("The queue is empty");
        return;
    }

    let rows: Vec<QueueTableRow> = queue
        .upcoming
        .iter()
        .enumerate()
        .map(|(i, t)| QueueTableRow {
            position: i + 1,
            name: t.name.clone(),
            artist: t.artist_name.clone(),
        })
        .collect();

    println!("{}", Table::new(rows));
}

/// One-shot refill up to `target` queued tracks, using a fresh session memory.
pub async fn fill_queue(settings: &Settings, target: usize, mood: &str) {
    let mood = resolve_mood(mood);
    let client = connect(settings).await;

    let playback = match client.playback().await {
        Ok(playback) => playback,
        Err(e) => error!("Cannot read playback state: {}", e),
    };
    let queue = match client.queue().await {
        Ok(queue) => queue,
        Err(e) => error!("Cannot read the queue: {}", e),
    };

    let needed = target.max(1).saturating_sub(queue.depth());
    if needed == 0 {
        success!("Queue already holds {} tracks", queue.depth());
        return;
    }

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Finding {} track(s) for a {} mood...", needed, mood));

    let current = playback.map(|p| p.track_ref());
    let mut memory = SessionMemory::new(None);
    let result = refill(
        &client,
        current.as_ref(),
        &queue,
        RefillPlan {
            needed,
            overfetch: DEFAULT_OVERFETCH,
            mood: mood.features(),
        },
        &mut memory,
        SystemClock.now(),
    )
    .await;
    pb.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => error!("Refill failed: {}", e),
    };

    for track in &report.queued {
        info!("Queued: {} by {}", track.name, track.artist_name);
    }
    if !report.skipped.is_empty() {
        warning!("{} candidate(s) could not be queued", report.skipped.len());
    }

    if report.queued.is_empty() {
        warning!("No fresh recommendations available to add");
    } else {
        success!(
            "Added {} of {} track(s) from {}",
            report.queued.len(),
            needed,
            report.source
        );
    }
}
