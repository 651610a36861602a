#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::post,
};
use spotpilot::{
    clock::Clock,
    error::ApiError,
    management::{RefreshFailure, TokenEndpoint},
    spotify::{MusicApi, RecommendationRequest},
    types::{
        ArtistSummary, Credentials, PlaybackSnapshot, PlaylistSummary, QueueSnapshot, TimeRange,
        TokenResponse, TrackRef,
    },
};

pub fn track(id: &str) -> TrackRef {
    TrackRef {
        uri: format!("spotify:track:{id}"),
        name: format!("Track {id}"),
        artist_name: "Some Artist".to_string(),
        artist_id: Some(format!("artist-{id}")),
    }
}

pub fn tracks(ids: &[&str]) -> Vec<TrackRef> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn uris(tracks: &[TrackRef]) -> Vec<String> {
    tracks.iter().map(|t| t.uri.clone()).collect()
}

pub fn playing(id: &str) -> PlaybackSnapshot {
    let t = track(id);
    PlaybackSnapshot {
        track_uri: t.uri,
        track_name: t.name,
        artist_name: t.artist_name,
        artist_id: t.artist_id,
        progress_ms: 10_000,
        duration_ms: 200_000,
        is_playing: true,
        device_id: Some("device-1".to_string()),
        shuffle_state: false,
        repeat_state: "off".to_string(),
    }
}

pub fn paused(id: &str) -> PlaybackSnapshot {
    PlaybackSnapshot {
        is_playing: false,
        ..playing(id)
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::upstream(404, format!("{what} unavailable"))
}

/// In-memory stand-in for the Web API. Every field can be changed between
/// calls; every call is recorded.
#[derive(Default)]
pub struct FakeApi {
    pub playback: Mutex<Option<PlaybackSnapshot>>,
    pub queue: Mutex<QueueSnapshot>,
    pub recent: Mutex<Vec<TrackRef>>,
    pub top_tracks: Mutex<Vec<TrackRef>>,
    pub top_artists: Mutex<Vec<ArtistSummary>>,
    /// Exact query -> results. Unknown queries return nothing.
    pub search_results: Mutex<HashMap<String, Vec<TrackRef>>>,
    /// `None` makes the endpoint answer 404.
    pub recommendations: Mutex<Option<Vec<TrackRef>>>,
    pub playlists: Mutex<Vec<PlaylistSummary>>,
    pub playlist_tracks: Mutex<HashMap<String, Vec<TrackRef>>>,
    /// URIs the enqueue call refuses.
    pub failing_uris: Mutex<HashSet<String>>,
    /// Every call fails as if the network were down.
    pub offline: Mutex<bool>,

    pub queued: Mutex<Vec<String>>,
    pub searches: Mutex<Vec<String>>,
    pub recommendation_requests: Mutex<Vec<RecommendationRequest>>,
    pub playback_calls: AtomicUsize,
    pub queue_calls: AtomicUsize,
    /// Runs after every successful enqueue.
    pub on_enqueue: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playback(self, playback: Option<PlaybackSnapshot>) -> Self {
        *self.playback.lock().unwrap() = playback;
        self
    }

    pub fn with_queue(self, upcoming: Vec<TrackRef>) -> Self {
        self.queue.lock().unwrap().upcoming = upcoming;
        self
    }

    pub fn with_recent(self, recent: Vec<TrackRef>) -> Self {
        *self.recent.lock().unwrap() = recent;
        self
    }

    pub fn with_recommendations(self, tracks: Vec<TrackRef>) -> Self {
        *self.recommendations.lock().unwrap() = Some(tracks);
        self
    }

    pub fn with_top_tracks(self, tracks: Vec<TrackRef>) -> Self {
        *self.top_tracks.lock().unwrap() = tracks;
        self
    }

    pub fn with_top_artists(self, artists: Vec<ArtistSummary>) -> Self {
        *self.top_artists.lock().unwrap() = artists;
        self
    }

    pub fn with_search(self, query: &str, tracks: Vec<TrackRef>) -> Self {
        self.search_results
            .lock()
            .unwrap()
            .insert(query.to_string(), tracks);
        self
    }

    pub fn with_playlist(self, id: &str, name: &str, tracks: Vec<TrackRef>) -> Self {
        self.playlists.lock().unwrap().push(PlaylistSummary {
            id: id.to_string(),
            name: name.to_string(),
        });
        self.playlist_tracks
            .lock()
            .unwrap()
            .insert(id.to_string(), tracks);
        self
    }

    pub fn failing(self, uri: &str) -> Self {
        self.failing_uris.lock().unwrap().insert(uri.to_string());
        self
    }

    pub fn on_enqueue(self, hook: impl Fn() + Send + 'static) -> Self {
        *self.on_enqueue.lock().unwrap() = Some(Box::new(hook));
        self
    }

    pub fn set_playback(&self, playback: Option<PlaybackSnapshot>) {
        *self.playback.lock().unwrap() = playback;
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn queued(&self) -> Vec<String> {
        self.queued.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), ApiError> {
        if *self.offline.lock().unwrap() {
            return Err(ApiError::Transient("connection refused".to_string()));
        }
        Ok(())
    }
}

impl MusicApi for FakeApi {
    async fn playback(&self) -> Result<Option<PlaybackSnapshot>, ApiError> {
        self.playback_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.playback.lock().unwrap().clone())
    }

    async fn queue(&self) -> Result<QueueSnapshot, ApiError> {
        self.queue_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let mut queue = self.queue.lock().unwrap().clone();
        queue.currently_playing = self
            .playback
            .lock()
            .unwrap()
            .as_ref()
            .map(PlaybackSnapshot::track_ref);
        Ok(queue)
    }

    async fn add_to_queue(&self, uri: &str, _device_id: Option<&str>) -> Result<(), ApiError> {
        self.check_online()?;
        if self.failing_uris.lock().unwrap().contains(uri) {
            return Err(ApiError::upstream(400, "Invalid track uri"));
        }
        self.queued.lock().unwrap().push(uri.to_string());
        self.queue.lock().unwrap().upcoming.push(TrackRef {
            uri: uri.to_string(),
            name: uri.to_string(),
            artist_name: "Queued".to_string(),
            artist_id: None,
        });
        if let Some(hook) = self.on_enqueue.lock().unwrap().as_ref() {
            hook();
        }
        Ok(())
    }

    async fn recently_played(&self, limit: usize) -> Result<Vec<TrackRef>, ApiError> {
        self.check_online()?;
        Ok(self.recent.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn top_tracks(&self, _range: TimeRange, limit: usize) -> Result<Vec<TrackRef>, ApiError> {
        self.check_online()?;
        Ok(self
            .top_tracks
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn top_artists(
        &self,
        _range: TimeRange,
        limit: usize,
    ) -> Result<Vec<ArtistSummary>, ApiError> {
        self.check_online()?;
        Ok(self
            .top_artists
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<TrackRef>, ApiError> {
        self.check_online()?;
        self.searches.lock().unwrap().push(query.to_string());
        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(query)
            .map(|t| t.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<TrackRef>, ApiError> {
        self.check_online()?;
        self.recommendation_requests
            .lock()
            .unwrap()
            .push(request.clone());
        self.recommendations
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| not_found("recommendations"))
    }

    async fn playlists(&self, limit: usize) -> Result<Vec<PlaylistSummary>, ApiError> {
        self.check_online()?;
        Ok(self
            .playlists
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackRef>, ApiError> {
        self.check_online()?;
        self.playlist_tracks
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| not_found("playlist"))
    }
}

#[derive(Default)]
struct EndpointInner {
    script: Mutex<VecDeque<Result<TokenResponse, RefreshFailure>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(Credentials, String)>>,
}

/// Token endpoint answering from a script. Clones share the script and the
/// call log.
#[derive(Clone, Default)]
pub struct FakeTokenEndpoint {
    inner: Arc<EndpointInner>,
}

impl FakeTokenEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: Result<TokenResponse, RefreshFailure>) -> &Self {
        self.inner.script.lock().unwrap().push_back(response);
        self
    }

    pub fn grant(&self, access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> &Self {
        self.respond(Ok(TokenResponse {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(String::from),
            expires_in: Some(expires_in),
            scope: None,
        }))
    }

    pub fn transient(&self) -> &Self {
        self.respond(Err(RefreshFailure::Transient("HTTP 503".to_string())))
    }

    pub fn revoked(&self) -> &Self {
        self.respond(Err(RefreshFailure::Revoked {
            status: 400,
            reason: "invalid_grant".to_string(),
        }))
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.inner
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }
}

impl TokenEndpoint for FakeTokenEndpoint {
    async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<TokenResponse, RefreshFailure> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .seen
            .lock()
            .unwrap()
            .push((credentials.clone(), refresh_token.to_string()));
        self.inner
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RefreshFailure::Transient("no scripted response".to_string())))
    }
}

#[derive(Default)]
struct ClockInner {
    now: AtomicI64,
    sleeps: Mutex<Vec<Duration>>,
}

/// Frozen clock. `sleep` returns immediately and only records the request.
#[derive(Clone, Default)]
pub struct FakeClock {
    inner: Arc<ClockInner>,
}

impl FakeClock {
    pub fn at(now: i64) -> Self {
        let clock = Self::default();
        clock.inner.now.store(now, Ordering::SeqCst);
        clock
    }

    pub fn advance(&self, secs: i64) {
        self.inner.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.sleeps.lock().unwrap().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> i64 {
        self.inner.now.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        self.inner.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Request seen by [`serve_token_endpoint`]: the `Authorization` header and
/// the raw form body.
#[derive(Clone, Default)]
pub struct TokenRequests(Arc<Mutex<Vec<(Option<String>, String)>>>);

impl TokenRequests {
    pub fn all(&self) -> Vec<(Option<String>, String)> {
        self.0.lock().unwrap().clone()
    }
}

/// Serves a token endpoint on a random local port that answers every POST
/// with `status` and `body`. Returns the endpoint URL.
pub async fn serve_token_endpoint(status: StatusCode, body: &'static str) -> (String, TokenRequests) {
    let requests = TokenRequests::default();
    let recorder = requests.clone();
    let app = Router::new().route(
        "/api/token",
        post(move |headers: HeaderMap, form: String| {
            let recorder = recorder.clone();
            async move {
                let auth = headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                recorder.0.lock().unwrap().push((auth, form));
                (status, body)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api/token"), requests)
}

/// Accepts connections and never answers them.
pub async fn serve_silent_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("http://{addr}/api/token")
}

/// URL of a local port nobody listens on.
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    format!("http://{addr}/api/token")
}
