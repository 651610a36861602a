//! # CLI Module
//!
//! Thin command wrappers. Each command gathers configuration, builds a
//! [`SpotifyClient`], calls into the core and renders the outcome with the
//! console macros. Commands terminate the process with [`crate::error!`] on
//! failure; the core itself never exits.
//!
//! ## Commands
//!
//! - [`auth`] - Save client credentials and run the PKCE login
//! - [`autopilot`] - Keep the queue topped up until interrupted
//! - [`show_queue`], [`fill_queue`] - Inspect or refill the queue once
//! - [`now_playing`], [`devices`], [`pause`], [`resume`], [`next`],
//!   [`previous`] - Player shortcuts
//!
//! ## Usage
//!
//! ```bash
//! spotpilot auth --client-id <ID> --client-secret <SECRET>
//! spotpilot autopilot --mood focus --threshold 4
//! spotpilot queue fill --target 8
//! ```

mod auth;
mod autopilot;
mod player;
mod queue;

pub use auth::auth;
pub use autopilot::autopilot;
pub use player::{devices, next, now_playing, pause, previous, resume};
pub use queue::{fill_queue, show_queue};

use crate::{
    config::{self, Settings},
    error,
    mood::Mood,
    spotify::SpotifyClient,
    types::Credentials,
    warning,
};

/// Credentials from the environment. They take precedence over
/// `credentials.json`.
pub fn env_credentials() -> Credentials {
    Credentials {
        client_id: config::spotify_client_id(),
        client_secret: config::spotify_client_secret(),
    }
}

/// Unknown moods fall back to [`Mood::Flow`] with a warning.
pub fn resolve_mood(name: &str) -> Mood {
    match name.parse::<Mood>() {
        Ok(mood) => mood,
        Err(_) => {
            let known: Vec<&str> = Mood::ALL.iter().map(Mood::name).collect();
            warning!(
                "Unknown mood '{}', using '{}'. Known moods: {}",
                name,
                Mood::Flow,
                known.join(", ")
            );
            Mood::Flow
        }
    }
}

async fn connect(settings: &Settings) -> SpotifyClient {
    match SpotifyClient::from_settings(settings, env_credentials()).await {
        Ok(client) => client,
        Err(e) => error!("Cannot set up the Spotify client: {}", e),
    }
}
