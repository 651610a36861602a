//! Configuration management for spotpilot.
//!
//! This module handles loading and accessing configuration values from
//! environment variables and `.env` files. Every value has a working default
//! so a fresh install only needs client credentials.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults
//!
//! The core never reads the environment itself. The command layer collects
//! everything into a [`Settings`] value and hands that down.

use std::{env, path::PathBuf, time::Duration};

const APP_DIR: &str = "spotpilot";

const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SCOPE: &str = "user-read-playback-state user-modify-playback-state \
user-read-currently-playing playlist-read-private playlist-read-collaborative \
user-top-read user-read-recently-played";

/// Plain configuration values handed to the core.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub api_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scope: String,
    pub server_addr: String,
    pub http_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            config_dir: config_dir(),
            api_url: spotify_apiurl(),
            auth_url: spotify_apiauth_url(),
            token_url: spotify_apitoken_url(),
            redirect_uri: spotify_redirect_uri(),
            scope: spotify_scope(),
            server_addr: server_addr(),
            http_timeout: http_timeout(),
        }
    }

    pub fn token_path(&self) -> PathBuf {
        self.config_dir.join("token.json")
    }
}

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file lives under `spotpilot/.env` in the platform-specific local data
/// directory:
/// - Linux: `~/.local/share/spotpilot/.env`
/// - macOS: `~/Library/Application Support/spotpilot/.env`
/// - Windows: `%LOCALAPPDATA%/spotpilot/.env`
///
/// A missing file is fine; variables already present in the process
/// environment are never overwritten.
///
/// # Errors
///
/// Fails if the directory cannot be created or the file exists but cannot be
/// parsed.
pub async fn load_env() -> Result<(), String> {
    let mut path = data_dir();
    path.push(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

fn var_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Directory holding `token.json`, `credentials.json` and the log file.
///
/// `SPOTPILOT_CONFIG_DIR` overrides the default `<data_local_dir>/spotpilot`.
pub fn config_dir() -> PathBuf {
    non_empty_var("SPOTPILOT_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(data_dir)
}

/// Address the local OAuth callback server binds to, e.g. `127.0.0.1:8888`.
pub fn server_addr() -> String {
    var_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// Client ID from `SPOTIFY_CLIENT_ID`. Takes precedence over `credentials.json`.
pub fn spotify_client_id() -> Option<String> {
    non_empty_var("SPOTIFY_CLIENT_ID")
}

/// Client secret from `SPOTIFY_CLIENT_SECRET`. Takes precedence over
/// `credentials.json`.
///
/// The client secret should be kept confidential and never exposed in logs.
pub fn spotify_client_secret() -> Option<String> {
    non_empty_var("SPOTIFY_CLIENT_SECRET")
}

/// OAuth redirect URI. Must match the URI registered for the application.
pub fn spotify_redirect_uri() -> String {
    var_or("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

/// Space separated OAuth scopes requested during authorization.
pub fn spotify_scope() -> String {
    var_or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE)
}

pub fn spotify_apiauth_url() -> String {
    var_or("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL)
}

pub fn spotify_apiurl() -> String {
    var_or("SPOTIFY_API_URL", DEFAULT_API_URL)
}

pub fn spotify_apitoken_url() -> String {
    var_or("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL)
}

/// Timeout applied to every upstream HTTP call.
pub fn http_timeout() -> Duration {
    let secs = env::var("SPOTPILOT_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    Duration::from_secs(secs)
}
