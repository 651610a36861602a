//! # Spotify Integration Module
//!
//! Request/response wrapper around the Spotify Web API. Everything here is
//! stateless apart from the token manager: every call asks it for a valid
//! bearer token first, so callers never deal with expiry themselves.
//!
//! ## Architecture
//!
//! ```text
//! Autopilot / CLI
//!          ↓
//! DiscoveryEngine ── MusicApi (trait)
//!          ↓
//! SpotifyClient ── TokenManager ── CredentialStore
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Submodules
//!
//! - [`auth`] - Authorization code flow with PKCE and the refresh grant
//! - [`client`] - [`SpotifyClient`], request plumbing and error mapping
//! - [`player`] - Playback state, queue, devices and transport controls
//! - [`library`] - Search, recommendations, top items, history and playlists
//!
//! ## Error Handling
//!
//! - Non-2xx answers become [`ApiError::Upstream`] carrying Spotify's own
//!   error message when the body has one.
//! - Timeouts and connection failures become [`ApiError::Transient`]. They are
//!   not retried here; only the token refresh retries.
//! - `429 Too Many Requests` waits for `Retry-After` (up to 120 seconds) and
//!   re-issues the request once.
//!
//! ## API Coverage
//!
//! - `GET /me/player`, `GET /me/player/queue`, `POST /me/player/queue`
//! - `GET /me/player/devices`, `PUT /me/player/pause`, `PUT /me/player/play`
//! - `POST /me/player/next`, `POST /me/player/previous`
//! - `GET /me/player/recently-played`, `GET /me/top/{tracks,artists}`
//! - `GET /search`, `GET /recommendations`
//! - `GET /me/playlists`, `GET /playlists/{id}/tracks`, `GET /me`

pub mod auth;
pub mod client;
pub mod library;
pub mod player;

pub use client::SpotifyClient;

use crate::{
    error::ApiError,
    mood::MoodFeatures,
    types::{ArtistSummary, PlaybackSnapshot, PlaylistSummary, QueueSnapshot, TimeRange, TrackRef},
};

/// Parameters for the recommendation endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationRequest {
    pub seed_tracks: Vec<String>,
    pub seed_artists: Vec<String>,
    pub features: MoodFeatures,
    pub limit: usize,
}

/// The slice of the Web API the discovery engine and the autopilot need.
///
/// [`SpotifyClient`] is the real implementation; tests substitute an
/// in-memory one.
#[allow(async_fn_in_trait)]
pub trait MusicApi {
    /// `None` when nothing is loaded in the player.
    async fn playback(&self) -> Result<Option<PlaybackSnapshot>, ApiError>;

    async fn queue(&self) -> Result<QueueSnapshot, ApiError>;

    /// Without a device id the active (or first available) device is used.
    async fn add_to_queue(&self, uri: &str, device_id: Option<&str>) -> Result<(), ApiError>;

    /// Most recent first.
    async fn recently_played(&self, limit: usize) -> Result<Vec<TrackRef>, ApiError>;

    async fn top_tracks(&self, range: TimeRange, limit: usize) -> Result<Vec<TrackRef>, ApiError>;

    async fn top_artists(
        &self,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<ArtistSummary>, ApiError>;

    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<TrackRef>, ApiError>;

    /// May fail or come back empty: the endpoint is unavailable for many apps.
    async fn recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<TrackRef>, ApiError>;

    async fn playlists(&self, limit: usize) -> Result<Vec<PlaylistSummary>, ApiError>;

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackRef>, ApiError>;
}

impl MusicApi for SpotifyClient {
    async fn playback(&self) -> Result<Option<PlaybackSnapshot>, ApiError> {
        self.current_playback().await
    }

    async fn queue(&self) -> Result<QueueSnapshot, ApiError> {
        self.get_queue().await
    }

    async fn add_to_queue(&self, uri: &str, device_id: Option<&str>) -> Result<(), ApiError> {
        self.enqueue(uri, device_id).await
    }

    async fn recently_played(&self, limit: usize) -> Result<Vec<TrackRef>, ApiError> {
        self.get_recently_played(limit).await
    }

    async fn top_tracks(&self, range: TimeRange, limit: usize) -> Result<Vec<TrackRef>, ApiError> {
        self.get_top_tracks(range, limit).await
    }

    async fn top_artists(
        &self,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<ArtistSummary>, ApiError> {
        self.get_top_artists(range, limit).await
    }

    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<TrackRef>, ApiError> {
        self.search(query, limit).await
    }

    async fn recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<TrackRef>, ApiError> {
        self.get_recommendations(request).await
    }

    async fn playlists(&self, limit: usize) -> Result<Vec<PlaylistSummary>, ApiError> {
        self.get_playlists(limit).await
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackRef>, ApiError> {
        self.get_playlist_tracks(playlist_id).await
    }
}
