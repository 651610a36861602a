use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Seconds before expiry at which a token is already treated as stale.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// OAuth session as persisted in `token.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Session {
    pub fn has_any_token(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some()
    }

    /// Unset expiry counts as stale.
    pub fn is_stale(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + REFRESH_MARGIN_SECS,
            None => true,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at <= now)
    }
}

/// Client credentials as persisted in `credentials.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.client_id) && present(&self.client_secret)
    }

    /// Values set in `overrides` win over the stored ones.
    pub fn overlay(self, overrides: Credentials) -> Credentials {
        Credentials {
            client_id: overrides.client_id.or(self.client_id),
            client_secret: overrides.client_secret.or(self.client_secret),
        }
    }
}

/// Shared between the `auth` command and the callback handler while a login
/// is in flight.
#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub credentials: Credentials,
    /// Filled in by the callback once the code exchange succeeded.
    pub session: Option<Session>,
}

/// Successful answer of the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub uri: String,
    pub name: String,
    pub artist_name: String,
    #[serde(default)]
    pub artist_id: Option<String>,
}

/// One observation of the player. Re-fetched on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub track_uri: String,
    pub track_name: String,
    pub artist_name: String,
    pub artist_id: Option<String>,
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub device_id: Option<String>,
    pub shuffle_state: bool,
    pub repeat_state: String,
}

impl PlaybackSnapshot {
    pub fn track_ref(&self) -> TrackRef {
        TrackRef {
            uri: self.track_uri.clone(),
            name: self.track_name.clone(),
            artist_name: self.artist_name.clone(),
            artist_id: self.artist_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    pub currently_playing: Option<TrackRef>,
    pub upcoming: Vec<TrackRef>,
}

impl QueueSnapshot {
    pub fn depth(&self) -> usize {
        self.upcoming.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub volume_percent: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

/// Time windows accepted by the top-items endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

// ---- Web API wire types ----

#[derive(Debug, Clone, Deserialize)]
pub struct ApiArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ApiArtistRef>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl ApiTrack {
    /// Local files and some episodes come without a URI and cannot be queued.
    pub fn into_track_ref(self) -> Option<TrackRef> {
        let uri = self.uri.filter(|u| !u.is_empty())?;
        let first = self.artists.into_iter().next();
        Some(TrackRef {
            uri,
            name: self.name,
            artist_name: first
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            artist_id: first.and_then(|a| a.id),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerResponse {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<ApiTrack>,
    #[serde(default)]
    pub device: Option<Device>,
    #[serde(default)]
    pub shuffle_state: Option<bool>,
    #[serde(default)]
    pub repeat_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueResponse {
    #[serde(default)]
    pub currently_playing: Option<ApiTrack>,
    #[serde(default)]
    pub queue: Vec<ApiTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistoryItem {
    pub track: ApiTrack,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<Paging<ApiTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub tracks: Vec<ApiTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPlaylist {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<ApiTrack>,
}

// ---- table rows ----

#[derive(Tabled)]
pub struct QueueTableRow {
    #[tabled(rename = "#")]
    pub position: usize,
    pub name: String,
    pub artist: String,
}

#[derive(Tabled)]
pub struct DeviceTableRow {
    pub name: String,
    #[tabled(rename = "type")]
    pub kind: String,
    pub active: String,
    pub volume: String,
}
