use reqwest::Method;

use crate::{
    error::ApiError,
    spotify::SpotifyClient,
    types::{Device, DevicesResponse, PlaybackSnapshot, PlayerResponse, QueueResponse, QueueSnapshot},
};

/// Status used when no device is available to act on.
const NO_DEVICE_STATUS: u16 = 404;

impl SpotifyClient {
    /// Retrieves the current player state from the Spotify Web API.
    ///
    /// Upstream answers 204 when no device has anything loaded. That case, an
    /// advert, and a local file all come back as `None`, because none of them
    /// can seed recommendations.
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Some(PlaybackSnapshot))` - Track, progress, device and play state
    /// - `Ok(None)` - Nothing playing, or the item is not a track
    /// - `Err(ApiError)` - Authentication, network or upstream error
    ///
    /// # API Endpoint
    ///
    /// Uses `GET /me/player`; requires the `user-read-playback-state` scope.
    pub async fn current_playback(&self) -> Result<Option<PlaybackSnapshot>, ApiError> {
        let player: Option<PlayerResponse> = self
            .get_optional_json("me/player", &[], "get playback state")
            .await?;

        Ok(player.and_then(playback_snapshot))
    }

    /// Retrieves the playing track and the tracks queued after it.
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(QueueSnapshot)` - Empty when upstream reports no queue
    /// - `Err(ApiError)` - Authentication, network or upstream error
    ///
    /// # Notes
    ///
    /// Upstream mixes the user's manual queue with upcoming context tracks and
    /// truncates the list, so the length is a lower bound of what will play.
    pub async fn get_queue(&self) -> Result<QueueSnapshot, ApiError> {
        let queue: Option<QueueResponse> = self
            .get_optional_json("me/player/queue", &[], "get the queue")
            .await?;

        let Some(queue) = queue else {
            return Ok(QueueSnapshot::default());
        };

        Ok(QueueSnapshot {
            currently_playing: queue.currently_playing.and_then(|t| t.into_track_ref()),
            upcoming: queue
                .queue
                .into_iter()
                .filter_map(|t| t.into_track_ref())
                .collect(),
        })
    }

    /// Appends a track to the end of the playback queue.
    ///
    /// # Arguments
    ///
    /// * `uri` - Track URI such as `spotify:track:4uLU6hMCjMI75M1A2tKUQC`
    /// * `device_id` - Target device. When `None` the active device is used,
    ///   falling back to the first listed device with an id
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(())` - The track was accepted
    /// - `Err(ApiError)` - Authentication, network or upstream error
    ///
    /// # Errors
    ///
    /// - No usable device gives `ApiError::Upstream` with status 404
    /// - Free accounts get 403 from upstream (Premium required)
    /// - Unknown or malformed URIs get 400
    ///
    /// # Example
    ///
    /// ```
    /// client.enqueue("spotify:track:4uLU6hMCjMI75M1A2tKUQC", None).await?;
    /// ```
    pub async fn enqueue(&self, uri: &str, device_id: Option<&str>) -> Result<(), ApiError> {
        let device_id = match device_id {
            Some(id) => id.to_string(),
            None => self.target_device_id().await?,
        };

        self.command(
            Method::POST,
            "me/player/queue",
            &[("uri", uri.to_string()), ("device_id", device_id)],
            "add track to queue",
        )
        .await
    }

    /// Lists the devices the user can control.
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<Device>)` - Available devices; restricted ones may lack an id
    /// - `Err(ApiError)` - Authentication, network or upstream error
    pub async fn get_devices(&self) -> Result<Vec<Device>, ApiError> {
        let response: DevicesResponse = self
            .get_json("me/player/devices", &[], "list devices")
            .await?;
        Ok(response.devices)
    }

    /// Pauses playback on the active device.
    pub async fn pause(&self) -> Result<(), ApiError> {
        self.command(Method::PUT, "me/player/pause", &[], "pause playback")
            .await
    }

    /// Resumes playback, on the active device or the first one listed.
    pub async fn resume(&self) -> Result<(), ApiError> {
        let device_id = self.target_device_id().await?;
        self.command(
            Method::PUT,
            "me/player/play",
            &[("device_id", device_id)],
            "resume playback",
        )
        .await
    }

    /// Skips to the next track.
    pub async fn next(&self) -> Result<(), ApiError> {
        self.command(Method::POST, "me/player/next", &[], "skip to next track")
            .await
    }

    pub async fn previous(&self) -> Result<(), ApiError> {
        self.command(
            Method::POST,
            "me/player/previous",
            &[],
            "skip to previous track",
        )
        .await
    }

    async fn target_device_id(&self) -> Result<String, ApiError> {
        let devices = self.get_devices().await?;
        pick_device(&devices)
            .and_then(|d| d.id.clone())
            .ok_or_else(|| {
                ApiError::upstream(
                    NO_DEVICE_STATUS,
                    "No active device. Start playback in a Spotify app first",
                )
            })
    }
}

/// The active device, otherwise the first listed one that has an id.
pub fn pick_device(devices: &[Device]) -> Option<&Device> {
    devices
        .iter()
        .find(|d| d.is_active && d.id.is_some())
        .or_else(|| devices.iter().find(|d| d.id.is_some()))
}

fn playback_snapshot(player: PlayerResponse) -> Option<PlaybackSnapshot> {
    let item = player.item?;
    let duration_ms = item.duration_ms.unwrap_or_default();
    let track = item.into_track_ref()?;

    Some(PlaybackSnapshot {
        track_uri: track.uri,
        track_name: track.name,
        artist_name: track.artist_name,
        artist_id: track.artist_id,
        progress_ms: player.progress_ms.unwrap_or_default(),
        duration_ms,
        is_playing: player.is_playing,
        device_id: player.device.and_then(|d| d.id),
        shuffle_state: player.shuffle_state.unwrap_or_default(),
        repeat_state: player.repeat_state.unwrap_or_else(|| "off".to_string()),
    })
}
