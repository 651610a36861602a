//! URIs that must not be suggested again.
//!
//! The [`ExclusionSet`] is rebuilt from fresh upstream reads for every refill
//! and thrown away afterwards. [`SessionMemory`] is the only part that
//! outlives a single refill: it remembers what this process queued itself,
//! because a freshly queued track shows up in neither "recently played" nor,
//! once it has played, the queue.

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use crate::types::{QueueSnapshot, TrackRef};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    uris: HashSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.uris.contains(uri)
    }

    /// Returns `false` if the URI was already present. Empty URIs are ignored.
    pub fn insert(&mut self, uri: impl Into<String>) -> bool {
        let uri = uri.into();
        if uri.is_empty() {
            return false;
        }
        self.uris.insert(uri)
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.uris.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ExclusionSet::new();
        for uri in iter {
            set.insert(uri);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for ExclusionSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for uri in iter {
            self.insert(uri);
        }
    }
}

/// URIs queued by this process, with the unix second they were queued at.
///
/// Without a window entries live as long as the process. With one, entries
/// older than the window are dropped by [`SessionMemory::prune`] so a long
/// session can eventually hear a track again.
#[derive(Debug, Clone, Default)]
pub struct SessionMemory {
    queued_at: HashMap<String, i64>,
    window_secs: Option<i64>,
}

impl SessionMemory {
    pub fn new(window: Option<Duration>) -> Self {
        Self {
            queued_at: HashMap::new(),
            window_secs: window.map(|w| i64::try_from(w.as_secs()).unwrap_or(i64::MAX)),
        }
    }

    pub fn remember(&mut self, uri: impl Into<String>, now: i64) {
        self.queued_at.insert(uri.into(), now);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.queued_at.contains_key(uri)
    }

    /// Forgets entries that fell out of the window. No-op without a window.
    pub fn prune(&mut self, now: i64) {
        if let Some(window) = self.window_secs {
            let cutoff = now.saturating_sub(window);
            self.queued_at.retain(|_, queued| *queued > cutoff);
        }
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.queued_at.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queued_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued_at.is_empty()
    }
}

/// Union of the playing track, the upcoming queue, recent history and the
/// session memory. Pure; performs no I/O.
pub fn build_exclusions(
    queue: &QueueSnapshot,
    currently_playing: Option<&TrackRef>,
    recently_played: &[TrackRef],
    memory: &SessionMemory,
) -> ExclusionSet {
    let mut set = ExclusionSet::new();

    set.extend(currently_playing.map(|t| t.uri.as_str()));
    set.extend(queue.currently_playing.iter().map(|t| t.uri.as_str()));
    set.extend(queue.upcoming.iter().map(|t| t.uri.as_str()));
    set.extend(recently_played.iter().map(|t| t.uri.as_str()));
    set.extend(memory.uris());

    set
}
