//! The autopilot: a polling loop that keeps the playback queue topped up.
//!
//! Every tick reads the player. A refill is considered only on a track
//! change, and only happens when the queue holds fewer tracks than the
//! threshold. All state that survives between ticks lives in [`LoopState`].
//!
//! ```text
//!            nothing playing / paused
//!   ┌──────┐ ◄─────────────────────── ┌──────────┐
//!   │ Idle │                          │ Tracking │ ◄─┐
//!   └──────┘ ───────────────────────► └──────────┘   │ refill done
//!              playing (new track)          │        │ or exhausted
//!                                           ▼        │
//!                               track changed and ┌───────────┐
//!                               depth < threshold │ Refilling │
//!                                                 └───────────┘
//! ```

use std::time::Duration;

use tokio::sync::watch;

use crate::{
    clock::{Clock, SystemClock},
    discovery::{DiscoveryEngine, DiscoveryOutcome, HISTORY_DEPTH, SeedSet},
    error::ApiError,
    exclusions::{SessionMemory, build_exclusions},
    info,
    mood::{Mood, MoodFeatures},
    spotify::MusicApi,
    success,
    types::{PlaybackSnapshot, QueueSnapshot, TrackRef},
    warning,
};

/// Extra candidates requested on top of what is needed, to absorb tracks
/// that are filtered out or fail to enqueue.
pub const DEFAULT_OVERFETCH: usize = 10;

#[derive(Debug, Clone)]
pub struct AutopilotConfig {
    /// Refill when fewer than this many tracks are queued.
    pub threshold: usize,
    pub mood: Mood,
    pub interval: Duration,
    pub overfetch: usize,
    /// How long a queued URI stays in session memory. `None` is forever.
    pub dedup_window: Option<Duration>,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            threshold: 3,
            mood: Mood::Flow,
            interval: Duration::from_secs(3),
            overfetch: DEFAULT_OVERFETCH,
            dedup_window: None,
        }
    }
}

impl AutopilotConfig {
    /// Threshold of at least one track, interval of at least one second.
    pub fn normalized(mut self) -> Self {
        self.threshold = self.threshold.max(1);
        self.interval = self.interval.max(Duration::from_secs(1));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    #[default]
    Idle,
    Tracking,
    Refilling,
}

/// What a single player observation means for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Nothing playing, or paused.
    Idle,
    Unchanged,
    TrackChanged,
}

#[derive(Debug, Clone, Default)]
pub struct LoopState {
    pub phase: LoopPhase,
    /// Survives pauses, so resuming the same track is not a change.
    pub last_seen_uri: Option<String>,
    pub memory: SessionMemory,
    /// Unix seconds of the last refill that queued something.
    pub last_refill_at: Option<i64>,
    pub polls: u64,
}

impl LoopState {
    pub fn new(memory: SessionMemory) -> Self {
        Self {
            memory,
            ..Default::default()
        }
    }

    /// Folds one observation into the state. The first track seen after
    /// start counts as a change.
    pub fn observe(&mut self, playback: Option<&PlaybackSnapshot>) -> Observation {
        self.polls += 1;
        let Some(playback) = playback.filter(|p| p.is_playing) else {
            self.phase = LoopPhase::Idle;
            return Observation::Idle;
        };

        self.phase = LoopPhase::Tracking;
        if self.last_seen_uri.as_deref() == Some(playback.track_uri.as_str()) {
            return Observation::Unchanged;
        }

        self.last_seen_uri = Some(playback.track_uri.clone());
        Observation::TrackChanged
    }
}

pub fn should_refill(track_changed: bool, queue_depth: usize, threshold: usize) -> bool {
    track_changed && queue_depth < threshold
}

/// Result of trying to queue a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueResult {
    Ok,
    Skip(String),
}

pub async fn enqueue<A: MusicApi>(api: &A, track: &TrackRef) -> EnqueueResult {
    match api.add_to_queue(&track.uri, None).await {
        Ok(()) => EnqueueResult::Ok,
        Err(e) => EnqueueResult::Skip(e.to_string()),
    }
}

/// How much to queue and in which mood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefillPlan {
    pub needed: usize,
    pub overfetch: usize,
    pub mood: MoodFeatures,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefillReport {
    pub needed: usize,
    pub source: &'static str,
    pub queued: Vec<TrackRef>,
    pub skipped: Vec<(TrackRef, String)>,
}

/// Queues up to `plan.needed` fresh tracks.
///
/// Seeds come from `current` and recent history; the exclusions are built
/// from `queue`, history and `memory`. Candidates are tried one at a time and
/// a failing candidate is skipped. Every queued URI goes into `memory` right
/// away.
pub async fn refill<A: MusicApi>(
    api: &A,
    current: Option<&TrackRef>,
    queue: &QueueSnapshot,
    plan: RefillPlan,
    memory: &mut SessionMemory,
    now: i64,
) -> Result<RefillReport, ApiError> {
    let RefillPlan {
        needed,
        overfetch,
        mood,
    } = plan;
    memory.prune(now);

    let recent = match api.recently_played(HISTORY_DEPTH).await {
        Ok(recent) => recent,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            log::warn!("recent history unavailable: {e}");
            Vec::new()
        }
    };

    let current = current.or(queue.currently_playing.as_ref());
    let seeds = SeedSet::from_context(current, &recent, mood);
    let mut exclusions = build_exclusions(queue, current, &recent, memory);
    log::debug!(
        "refill: need {needed}, {} seed tracks, {} excluded",
        seeds.track_ids.len(),
        exclusions.len()
    );

    let outcome = DiscoveryEngine::new(api)
        .recommend(&seeds, needed + overfetch, &exclusions)
        .await?;
    let source = outcome.label();

    let mut report = RefillReport {
        needed,
        source,
        queued: Vec::new(),
        skipped: Vec::new(),
    };

    if let DiscoveryOutcome::Exhausted = outcome {
        log::info!("no candidates available for refill");
        return Ok(report);
    }

    for track in outcome.into_tracks() {
        if report.queued.len() >= needed {
            break;
        }
        if exclusions.contains(&track.uri) {
            continue;
        }

        match enqueue(api, &track).await {
            EnqueueResult::Ok => {
                memory.remember(track.uri.clone(), now);
                exclusions.insert(track.uri.clone());
                report.queued.push(track);
            }
            EnqueueResult::Skip(reason) => {
                log::warn!("could not queue {}: {}", track.uri, reason);
                report.skipped.push((track, reason));
            }
        }
    }

    Ok(report)
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    /// `entered` is true on the tick playback stopped.
    Idle { entered: bool },
    Unchanged,
    TrackChanged {
        track: TrackRef,
        queue_depth: usize,
        refill: Option<RefillReport>,
    },
}

pub struct Autopilot<'a, A, C = SystemClock> {
    api: &'a A,
    config: AutopilotConfig,
    clock: C,
    state: LoopState,
}

impl<'a, A: MusicApi, C: Clock> Autopilot<'a, A, C> {
    pub fn new(api: &'a A, config: AutopilotConfig, clock: C) -> Self {
        let config = config.normalized();
        let state = LoopState::new(SessionMemory::new(config.dedup_window));
        Self {
            api,
            config,
            clock,
            state,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    /// One poll. Upstream calls happen strictly one after another.
    pub async fn tick(&mut self) -> Result<TickReport, ApiError> {
        let announce_idle = self.state.polls == 0 || self.state.phase != LoopPhase::Idle;
        let playback = self.api.playback().await?;

        let playback = match self.state.observe(playback.as_ref()) {
            Observation::Idle => return Ok(TickReport::Idle { entered: announce_idle }),
            Observation::Unchanged => return Ok(TickReport::Unchanged),
            Observation::TrackChanged => match playback {
                Some(playback) => playback,
                None => return Ok(TickReport::Unchanged),
            },
        };

        let track = playback.track_ref();
        let queue = self.api.queue().await?;
        let queue_depth = queue.depth();

        if !should_refill(true, queue_depth, self.config.threshold) {
            return Ok(TickReport::TrackChanged {
                track,
                queue_depth,
                refill: None,
            });
        }

        self.state.phase = LoopPhase::Refilling;
        let now = self.clock.now();
        let result = refill(
            self.api,
            Some(&track),
            &queue,
            RefillPlan {
                needed: self.config.threshold - queue_depth,
                overfetch: self.config.overfetch,
                mood: self.config.mood.features(),
            },
            &mut self.state.memory,
            now,
        )
        .await;
        self.state.phase = LoopPhase::Tracking;

        let report = result?;
        if !report.queued.is_empty() {
            self.state.last_refill_at = Some(now);
        }

        Ok(TickReport::TrackChanged {
            track,
            queue_depth,
            refill: Some(report),
        })
    }

    /// Polls until `shutdown` flips to true (or its sender goes away).
    ///
    /// A tick in progress always completes; only the sleep between ticks is
    /// cut short. Errors never end the loop.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Autopilot engaged. Mood: {}, threshold: {}",
            self.config.mood, self.config.threshold
        );
        info!("Listening for track changes. Press Ctrl+C to stop.");
        log::info!(
            "autopilot started (mood {}, threshold {}, interval {:?})",
            self.config.mood,
            self.config.threshold,
            self.config.interval
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.tick().await {
                Ok(report) => render(&report, self.config.threshold),
                Err(e) => {
                    warning!("Autopilot tick failed: {}", e);
                    log::warn!("autopilot tick failed: {e}");
                }
            }

            tokio::select! {
                _ = self.clock.sleep(self.config.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        log::info!("autopilot stopped");
        info!("Autopilot disengaged.");
    }
}

fn render(report: &TickReport, threshold: usize) {
    match report {
        TickReport::Idle { entered: true } => info!("Nothing playing. Waiting for playback."),
        TickReport::Idle { entered: false } | TickReport::Unchanged => {}
        TickReport::TrackChanged {
            track,
            queue_depth,
            refill,
        } => {
            info!("Track changed: {} by {}", track.name, track.artist_name);
            info!("  Queue depth: {} / threshold: {}", queue_depth, threshold);

            match refill {
                None => info!("  Queue healthy, no refill needed"),
                Some(report) if report.queued.is_empty() => {
                    warning!("No fresh recommendations available to add")
                }
                Some(report) => {
                    for queued in &report.queued {
                        info!("  Queued: {} by {}", queued.name, queued.artist_name);
                    }
                    success!(
                        "Refilled {} track(s) from {} at {}",
                        report.queued.len(),
                        report.source,
                        chrono::Local::now().format("%H:%M:%S")
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(uri: &str, is_playing: bool) -> PlaybackSnapshot {
        PlaybackSnapshot {
            track_uri: uri.into(),
            track_name: "Song".into(),
            artist_name: "Artist".into(),
            artist_id: None,
            progress_ms: 0,
            duration_ms: 180_000,
            is_playing,
            device_id: Some("dev".into()),
            shuffle_state: false,
            repeat_state: "off".into(),
        }
    }

    #[test]
    fn first_track_is_a_change() {
        let mut state = LoopState::default();
        assert_eq!(
            state.observe(Some(&playing("spotify:track:a", true))),
            Observation::TrackChanged
        );
        assert_eq!(state.phase, LoopPhase::Tracking);
        assert_eq!(
            state.observe(Some(&playing("spotify:track:a", true))),
            Observation::Unchanged
        );
    }

    #[test]
    fn pause_keeps_last_seen_track() {
        let mut state = LoopState::default();
        state.observe(Some(&playing("spotify:track:a", true)));

        assert_eq!(
            state.observe(Some(&playing("spotify:track:a", false))),
            Observation::Idle
        );
        assert_eq!(state.phase, LoopPhase::Idle);
        assert_eq!(state.last_seen_uri.as_deref(), Some("spotify:track:a"));

        assert_eq!(
            state.observe(Some(&playing("spotify:track:a", true))),
            Observation::Unchanged
        );
    }

    #[test]
    fn nothing_playing_is_idle() {
        let mut state = LoopState::default();
        assert_eq!(state.observe(None), Observation::Idle);
        assert!(state.last_seen_uri.is_none());
    }

    #[test]
    fn config_is_clamped() {
        let config = AutopilotConfig {
            threshold: 0,
            interval: Duration::ZERO,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.threshold, 1);
        assert_eq!(config.interval, Duration::from_secs(1));
    }
}
