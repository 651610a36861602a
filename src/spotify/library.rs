use crate::{
    error::ApiError,
    spotify::{RecommendationRequest, SpotifyClient},
    types::{
        ApiArtist, ApiPlaylist, ApiTrack, ArtistSummary, Paging, PlayHistoryItem, PlaylistItem,
        PlaylistSummary, RecommendationsResponse, SearchResponse, TimeRange, TrackRef, UserProfile,
    },
};

/// Page size ceiling of the paged endpoints.
const MAX_PAGE: usize = 50;
/// The recommendation endpoint allows more per call.
const MAX_RECOMMENDATIONS: usize = 100;
/// Upstream allows at most five seeds of all kinds together.
const MAX_SEEDS: usize = 5;

fn page(limit: usize) -> String {
    limit.clamp(1, MAX_PAGE).to_string()
}

fn track_refs(tracks: impl IntoIterator<Item = ApiTrack>) -> Vec<TrackRef> {
    tracks
        .into_iter()
        .filter_map(ApiTrack::into_track_ref)
        .collect()
}

impl SpotifyClient {
    /// Retrieves the user's listening history from the Spotify Web API.
    ///
    /// Tracks come back most recent first. History entries whose track has no
    /// usable URI (local files, removed tracks) are dropped.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of tracks to return (clamped to 1-50)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<TrackRef>)` - Recently played tracks, newest first
    /// - `Err(ApiError)` - Authentication, network or upstream error
    ///
    /// # API Endpoint
    ///
    /// Uses `GET /me/player/recently-played` and needs the
    /// `user-read-recently-played` scope.
    pub async fn get_recently_played(&self, limit: usize) -> Result<Vec<TrackRef>, ApiError> {
        let history: Paging<PlayHistoryItem> = self
            .get_json(
                "me/player/recently-played",
                &[("limit", page(limit))],
                "get recently played tracks",
            )
            .await?;

        Ok(track_refs(history.items.into_iter().map(|i| i.track)))
    }

    /// Retrieves the user's most played tracks over a time range.
    ///
    /// # Arguments
    ///
    /// * `range` - Listening window (`short_term`, `medium_term`, `long_term`)
    /// * `limit` - Maximum number of tracks to return (clamped to 1-50)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<TrackRef>)` - Top tracks in upstream rank order
    /// - `Err(ApiError)` - Authentication, network or upstream error
    pub async fn get_top_tracks(
        &self,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<TrackRef>, ApiError> {
        let top: Paging<ApiTrack> = self
            .get_json(
                "me/top/tracks",
                &[
                    ("time_range", range.as_str().to_string()),
                    ("limit", page(limit)),
                ],
                "get top tracks",
            )
            .await?;

        Ok(track_refs(top.items))
    }

    /// Retrieves the user's most played artists over a time range.
    ///
    /// Each artist carries its genre list, which the discovery pool turns
    /// into genre searches.
    ///
    /// # Arguments
    ///
    /// * `range` - Listening window (`short_term`, `medium_term`, `long_term`)
    /// * `limit` - Maximum number of artists to return (clamped to 1-50)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<ArtistSummary>)` - Artists with id, name and genres, in rank order
    /// - `Err(ApiError)` - Authentication, network or upstream error
    ///
    /// # API Endpoint
    ///
    /// Uses `GET /me/top/artists` with `time_range` and `limit`. Requires the
    /// `user-top-read` scope; without it upstream answers 403, which surfaces as
    /// `ApiError::Upstream`.
    pub async fn get_top_artists(
        &self,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<ArtistSummary>, ApiError> {
        let top: Paging<ApiArtist> = self
            .get_json(
                "me/top/artists",
                &[
                    ("time_range", range.as_str().to_string()),
                    ("limit", page(limit)),
                ],
                "get top artists",
            )
            .await?;

        Ok(top
            .items
            .into_iter()
            .map(|a| ArtistSummary {
                id: a.id,
                name: a.name,
                genres: a.genres,
            })
            .collect())
    }

    /// Searches the catalog for tracks.
    ///
    /// # Arguments
    ///
    /// * `query` - Free text or field filters such as `genre:"indie pop"`
    /// * `limit` - Maximum number of tracks to return (clamped to 1-50)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<TrackRef>)` - Matching tracks; empty when nothing matched
    /// - `Err(ApiError)` - Authentication, network or upstream error
    ///
    /// # Example
    ///
    /// ```
    /// let tracks = client.search("genre:\"shoegaze\"", 20).await?;
    /// println!("Found {} tracks", tracks.len());
    /// ```
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackRef>, ApiError> {
        let result: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", page(limit)),
                ],
                "search tracks",
            )
            .await?;

        Ok(result.tracks.map(|p| track_refs(p.items)).unwrap_or_default())
    }

    /// Asks the recommendation endpoint for tracks similar to the given seeds.
    ///
    /// The seeds and the mood's `target_*` values are encoded by
    /// [`recommendation_query`], so at most five seeds reach upstream with
    /// track seeds taking precedence over artist seeds.
    ///
    /// # Arguments
    ///
    /// * `request` - Seed track ids, seed artist ids, mood features and the
    ///   number of tracks wanted (clamped to 1-100)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<TrackRef>)` - Recommended tracks in upstream order
    /// - `Err(ApiError)` - Authentication, network or upstream error
    ///
    /// # Errors
    ///
    /// Applications registered after the endpoint was restricted get a 404 or
    /// 403 here. That arrives as `ApiError::Upstream`, which the discovery
    /// engine treats as an empty answer and falls back to its search pool.
    pub async fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<TrackRef>, ApiError> {
        let mut query = recommendation_query(request);
        query.push((
            "limit",
            request.limit.clamp(1, MAX_RECOMMENDATIONS).to_string(),
        ));

        let response: RecommendationsResponse = self
            .get_json("recommendations", &query, "get recommendations")
            .await?;

        Ok(track_refs(response.tracks))
    }

    /// Lists the playlists the user owns or follows.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of playlists to return (clamped to 1-50)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<PlaylistSummary>)` - Playlist ids and names
    /// - `Err(ApiError)` - Authentication, network or upstream error
    pub async fn get_playlists(&self, limit: usize) -> Result<Vec<PlaylistSummary>, ApiError> {
        // deleted playlists come back as null entries
        let playlists: Paging<Option<ApiPlaylist>> = self
            .get_json("me/playlists", &[("limit", page(limit))], "list playlists")
            .await?;

        Ok(playlists
            .items
            .into_iter()
            .flatten()
            .map(|p| PlaylistSummary {
                id: p.id,
                name: p.name.unwrap_or_default(),
            })
            .collect())
    }

    /// Retrieves the first page of tracks of a playlist.
    ///
    /// Episodes and unavailable items are skipped.
    ///
    /// # Arguments
    ///
    /// * `playlist_id` - Spotify ID of the playlist
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<TrackRef>)` - Up to 50 tracks in playlist order
    /// - `Err(ApiError)` - Authentication, network or upstream error, including
    ///   404 for an unknown or private playlist
    pub async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackRef>, ApiError> {
        let items: Paging<PlaylistItem> = self
            .get_json(
                &format!("playlists/{}/tracks", playlist_id),
                &[("limit", MAX_PAGE.to_string())],
                "get playlist tracks",
            )
            .await?;

        Ok(track_refs(items.items.into_iter().filter_map(|i| i.track)))
    }

    /// Retrieves the profile of the logged-in user.
    pub async fn get_profile(&self) -> Result<UserProfile, ApiError> {
        self.get_json("me", &[], "get user profile").await
    }
}

/// Seed and `target_*` parameters. Track seeds come first and the total
/// never exceeds five.
pub fn recommendation_query(request: &RecommendationRequest) -> Vec<(&'static str, String)> {
    let tracks: Vec<&str> = request
        .seed_tracks
        .iter()
        .take(MAX_SEEDS)
        .map(String::as_str)
        .collect();
    let artists: Vec<&str> = request
        .seed_artists
        .iter()
        .take(MAX_SEEDS - tracks.len())
        .map(String::as_str)
        .collect();

    let mut query = Vec::new();
    if !tracks.is_empty() {
        query.push(("seed_tracks", tracks.join(",")));
    }
    if !artists.is_empty() {
        query.push(("seed_artists", artists.join(",")));
    }
    query.extend(request.features.query_params());
    query
}
