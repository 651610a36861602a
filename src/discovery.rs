//! Candidate discovery.
//!
//! [`DiscoveryEngine::recommend`] tries the recommendation endpoint first.
//! When that yields nothing usable (the endpoint is unavailable for many
//! apps) it assembles a pool from several cheaper sources: top tracks, top
//! artists, genre and mood searches, and the generated discovery playlists.
//! As a last resort it searches around the current artist and title.
//!
//! Excluded URIs never enter a result. Upstream refusals of individual
//! sources are logged and skipped; lost connectivity or auth failures abort.

use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::{
    error::ApiError,
    exclusions::ExclusionSet,
    mood::{MoodFeatures, derive_mood_terms},
    spotify::{MusicApi, RecommendationRequest},
    types::{TimeRange, TrackRef},
    utils,
};

pub const MAX_SEED_TRACKS: usize = 5;
pub const MAX_SEED_ARTISTS: usize = 5;
/// Track seeds taken from context (current track plus history).
const CONTEXT_SEED_TRACKS: usize = 3;
/// History entries considered when seeding.
pub const HISTORY_DEPTH: usize = 5;
/// The pool stops growing once it holds more than `limit * POOL_FACTOR`.
const POOL_FACTOR: usize = 3;

const TOP_TRACKS_PER_RANGE: usize = 15;
const TOP_ARTISTS: usize = 5;
const PER_ARTIST: usize = 5;
const GENRES: usize = 3;
const PER_GENRE: usize = 5;
const PER_MOOD_TERM: usize = 5;
const PER_COMBINED_TERM: usize = 3;
const MOOD_GENRES: usize = 2;
const PER_SIMILAR: usize = 5;
const PLAYLIST_SCAN: usize = 50;

/// Seeds for one discovery call. Built fresh for every refill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedSet {
    /// Most recent first, at most [`MAX_SEED_TRACKS`].
    pub track_ids: Vec<String>,
    pub artist_ids: Vec<String>,
    pub mood: MoodFeatures,
    /// The track the seeds were built around, used by the search fallbacks.
    pub anchor: Option<TrackRef>,
}

impl SeedSet {
    pub fn new(mood: MoodFeatures) -> Self {
        Self {
            mood,
            ..Default::default()
        }
    }

    /// Seeds from the current track and up to [`HISTORY_DEPTH`] recent
    /// tracks: at most three track ids and five artist ids.
    pub fn from_context(current: Option<&TrackRef>, recent: &[TrackRef], mood: MoodFeatures) -> Self {
        let mut seeds = SeedSet::new(mood);
        seeds.anchor = current.cloned();

        for track in current.into_iter().chain(recent.iter().take(HISTORY_DEPTH)) {
            if seeds.track_ids.len() < CONTEXT_SEED_TRACKS {
                if let Some(id) = utils::track_id_from_uri(&track.uri) {
                    seeds.push_track(id);
                }
            }
            if let Some(artist_id) = track.artist_id.as_deref() {
                seeds.push_artist(artist_id);
            }
        }

        seeds
    }

    /// Ignores duplicates and anything past [`MAX_SEED_TRACKS`].
    pub fn push_track(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.track_ids.len() < MAX_SEED_TRACKS && !id.is_empty() && !self.track_ids.contains(&id) {
            self.track_ids.push(id);
        }
    }

    pub fn push_artist(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.artist_ids.len() < MAX_SEED_ARTISTS && !id.is_empty() && !self.artist_ids.contains(&id) {
            self.artist_ids.push(id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty() && self.artist_ids.is_empty()
    }
}

/// Which path produced the candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryOutcome {
    /// Recommendation endpoint, upstream order kept.
    Primary(Vec<TrackRef>),
    /// Pool assembly or related-track search, shuffled.
    Fallback(Vec<TrackRef>),
    Exhausted,
}

impl DiscoveryOutcome {
    pub fn tracks(&self) -> &[TrackRef] {
        match self {
            DiscoveryOutcome::Primary(tracks) | DiscoveryOutcome::Fallback(tracks) => tracks,
            DiscoveryOutcome::Exhausted => &[],
        }
    }

    pub fn into_tracks(self) -> Vec<TrackRef> {
        match self {
            DiscoveryOutcome::Primary(tracks) | DiscoveryOutcome::Fallback(tracks) => tracks,
            DiscoveryOutcome::Exhausted => Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DiscoveryOutcome::Primary(_) => "recommendations",
            DiscoveryOutcome::Fallback(_) => "smart discovery",
            DiscoveryOutcome::Exhausted => "nothing",
        }
    }
}

/// Deduplicating accumulator that refuses excluded URIs.
struct CandidatePool<'e> {
    tracks: Vec<TrackRef>,
    seen: HashSet<String>,
    exclusions: &'e ExclusionSet,
    capacity: usize,
}

impl<'e> CandidatePool<'e> {
    fn new(exclusions: &'e ExclusionSet, capacity: usize) -> Self {
        Self {
            tracks: Vec::new(),
            seen: HashSet::new(),
            exclusions,
            capacity,
        }
    }

    fn extend(&mut self, tracks: Vec<TrackRef>) {
        for track in tracks {
            if self.exclusions.contains(&track.uri) || !self.seen.insert(track.uri.clone()) {
                continue;
            }
            self.tracks.push(track);
        }
    }

    fn is_full(&self) -> bool {
        self.tracks.len() > self.capacity
    }

    fn shuffled(mut self, limit: usize) -> Vec<TrackRef> {
        self.tracks.shuffle(&mut rand::rng());
        self.tracks.truncate(limit);
        self.tracks
    }
}

/// Keeps a strategy's failure local unless it means the whole call is doomed.
fn tolerate<T>(strategy: &str, result: Result<Vec<T>, ApiError>) -> Result<Vec<T>, ApiError> {
    match result {
        Ok(items) => Ok(items),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            log::warn!("discovery source '{strategy}' skipped: {e}");
            Ok(Vec::new())
        }
    }
}

pub struct DiscoveryEngine<'a, A> {
    api: &'a A,
}

impl<'a, A: MusicApi> DiscoveryEngine<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// At most `limit` tracks, none of them in `exclusions`.
    ///
    /// `limit` should already include some headroom for tracks that turn out
    /// not to be queueable. Empty results are [`DiscoveryOutcome::Exhausted`],
    /// never an error.
    pub async fn recommend(
        &self,
        seeds: &SeedSet,
        limit: usize,
        exclusions: &ExclusionSet,
    ) -> Result<DiscoveryOutcome, ApiError> {
        if limit == 0 {
            return Ok(DiscoveryOutcome::Exhausted);
        }

        let mut seeds = seeds.clone();
        if seeds.is_empty() {
            self.seed_from_history(&mut seeds).await?;
        }

        if !seeds.is_empty() {
            let primary = self.primary(&seeds, limit, exclusions).await?;
            if !primary.is_empty() {
                log::debug!("recommendation endpoint returned {} candidates", primary.len());
                return Ok(DiscoveryOutcome::Primary(primary));
            }
        }

        log::info!("recommendations empty, assembling discovery pool");
        let pool = self.smart_pool(&seeds, limit, exclusions).await?;
        if !pool.is_empty() {
            return Ok(DiscoveryOutcome::Fallback(pool));
        }

        if let Some(anchor) = &seeds.anchor {
            log::info!("discovery pool empty, searching around {}", anchor.artist_name);
            let related = self
                .related_tracks(&anchor.artist_name, &anchor.name, limit, exclusions)
                .await?;
            if !related.is_empty() {
                return Ok(DiscoveryOutcome::Fallback(related));
            }
        }

        Ok(DiscoveryOutcome::Exhausted)
    }

    /// Same-artist deep cuts, loose artist matches, same-title tracks (covers)
    /// and current top tracks for variety. Deduplicated, shuffled, cut to
    /// `limit`.
    pub async fn related_tracks(
        &self,
        artist_name: &str,
        track_name: &str,
        limit: usize,
        exclusions: &ExclusionSet,
    ) -> Result<Vec<TrackRef>, ApiError> {
        let mut pool = CandidatePool::new(exclusions, usize::MAX);
        let artist_name = artist_name.trim();
        let track_name = track_name.trim();

        if !artist_name.is_empty() {
            let query = format!("artist:\"{}\"", artist_name);
            pool.extend(tolerate("artist deep cuts", self.api.search_tracks(&query, limit + 5).await)?);

            let query = format!("\"{}\"", artist_name);
            pool.extend(tolerate("artist mentions", self.api.search_tracks(&query, limit).await)?);
        }

        if !track_name.is_empty() {
            let query = format!("\"{}\"", track_name);
            pool.extend(tolerate("same title", self.api.search_tracks(&query, 5).await)?);
        }

        pool.extend(tolerate(
            "top tracks",
            self.api.top_tracks(TimeRange::ShortTerm, 10).await,
        )?);

        Ok(pool.shuffled(limit))
    }

    async fn seed_from_history(&self, seeds: &mut SeedSet) -> Result<(), ApiError> {
        let recent = tolerate(
            "recently played",
            self.api.recently_played(HISTORY_DEPTH).await,
        )?;

        for track in &recent {
            if seeds.track_ids.len() >= CONTEXT_SEED_TRACKS {
                break;
            }
            if let Some(id) = utils::track_id_from_uri(&track.uri) {
                seeds.push_track(id);
            }
        }

        if seeds.anchor.is_none() {
            seeds.anchor = recent.into_iter().next();
        }
        Ok(())
    }

    async fn primary(
        &self,
        seeds: &SeedSet,
        limit: usize,
        exclusions: &ExclusionSet,
    ) -> Result<Vec<TrackRef>, ApiError> {
        let request = RecommendationRequest {
            seed_tracks: seeds.track_ids.clone(),
            seed_artists: seeds.artist_ids.clone(),
            features: seeds.mood,
            limit,
        };

        let mut tracks = tolerate("recommendations", self.api.recommendations(&request).await)?;
        tracks.retain(|t| !exclusions.contains(&t.uri));
        utils::remove_duplicate_tracks(&mut tracks);
        tracks.truncate(limit);
        Ok(tracks)
    }

    async fn smart_pool(
        &self,
        seeds: &SeedSet,
        limit: usize,
        exclusions: &ExclusionSet,
    ) -> Result<Vec<TrackRef>, ApiError> {
        let mut pool = CandidatePool::new(exclusions, limit.saturating_mul(POOL_FACTOR));
        let anchor_artist = seeds
            .anchor
            .as_ref()
            .map(|t| t.artist_name.trim())
            .filter(|name| !name.is_empty() && *name != "Unknown");

        for range in [TimeRange::ShortTerm, TimeRange::MediumTerm] {
            pool.extend(tolerate(
                "top tracks",
                self.api.top_tracks(range, TOP_TRACKS_PER_RANGE).await,
            )?);
            if pool.is_full() {
                return Ok(pool.shuffled(limit));
            }
        }

        let artists = tolerate(
            "top artists",
            self.api.top_artists(TimeRange::ShortTerm, TOP_ARTISTS).await,
        )?;
        for artist in &artists {
            let query = format!("artist:\"{}\"", artist.name);
            pool.extend(tolerate("top artist tracks", self.api.search_tracks(&query, PER_ARTIST).await)?);
            if pool.is_full() {
                return Ok(pool.shuffled(limit));
            }
        }

        let mut genres: Vec<&str> = Vec::new();
        for genre in artists.iter().flat_map(|a| a.genres.iter()) {
            if genres.len() < GENRES && !genres.contains(&genre.as_str()) {
                genres.push(genre.as_str());
            }
        }
        for genre in &genres {
            let query = format!("genre:\"{}\"", genre);
            pool.extend(tolerate("genre search", self.api.search_tracks(&query, PER_GENRE).await)?);
            if pool.is_full() {
                return Ok(pool.shuffled(limit));
            }
        }

        for term in derive_mood_terms(&seeds.mood) {
            pool.extend(tolerate("mood search", self.api.search_tracks(term, PER_MOOD_TERM).await)?);

            if let Some(artist) = anchor_artist {
                let query = format!("artist:\"{}\" {}", artist, term);
                pool.extend(tolerate(
                    "artist mood search",
                    self.api.search_tracks(&query, PER_COMBINED_TERM).await,
                )?);
            }

            for genre in genres.iter().take(MOOD_GENRES) {
                let query = format!("genre:\"{}\" {}", genre, term);
                pool.extend(tolerate(
                    "genre mood search",
                    self.api.search_tracks(&query, PER_COMBINED_TERM).await,
                )?);
            }

            if pool.is_full() {
                return Ok(pool.shuffled(limit));
            }
        }

        if let Some(artist) = anchor_artist {
            let query = format!("{} similar", artist);
            pool.extend(tolerate("similar search", self.api.search_tracks(&query, PER_SIMILAR).await)?);
            if pool.is_full() {
                return Ok(pool.shuffled(limit));
            }
        }

        let playlists = tolerate("playlists", self.api.playlists(PLAYLIST_SCAN).await)?;
        for playlist in playlists.iter().filter(|p| utils::is_discovery_playlist(&p.name)) {
            log::debug!("pulling candidates from playlist '{}'", playlist.name);
            pool.extend(tolerate(
                "discovery playlist",
                self.api.playlist_tracks(&playlist.id).await,
            )?);
            if pool.is_full() {
                break;
            }
        }

        Ok(pool.shuffled(limit))
    }
}
