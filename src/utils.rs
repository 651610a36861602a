use std::collections::HashSet;

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::types::TrackRef;

const TRACK_URI_PREFIX: &str = "spotify:track:";

/// Name fragments of the playlists Spotify generates per user.
const DISCOVERY_PLAYLIST_MARKERS: [&str; 2] = ["discover weekly", "release radar"];
const DISCOVERY_PLAYLIST_PREFIXES: [&str; 1] = ["daily mix"];

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Value for an `Authorization: Basic` header.
pub fn basic_auth_value(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", client_id, client_secret))
    )
}

/// `spotify:track:abc` -> `abc`. Anything that is not a track URI yields `None`.
pub fn track_id_from_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix(TRACK_URI_PREFIX).filter(|id| !id.is_empty())
}

/// Keeps the first occurrence of every URI, preserving order.
pub fn remove_duplicate_tracks(tracks: &mut Vec<TrackRef>) {
    let mut seen_uris = HashSet::new();
    tracks.retain(|track| seen_uris.insert(track.uri.clone()));
}

/// Discover Weekly, Release Radar and the Daily Mixes.
pub fn is_discovery_playlist(name: &str) -> bool {
    let name = name.to_lowercase();
    DISCOVERY_PLAYLIST_MARKERS
        .iter()
        .any(|marker| name.contains(marker))
        || DISCOVERY_PLAYLIST_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

pub fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
