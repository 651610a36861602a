use std::time::Duration;

use reqwest::{
    Client, Method, Response, StatusCode,
    header::{CONTENT_LENGTH, RETRY_AFTER},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    clock::SystemClock,
    config::Settings,
    error::{ApiError, AuthError},
    management::{CredentialStore, TokenManager},
    spotify::auth::SpotifyTokenEndpoint,
    types::Credentials,
};

/// Longest `Retry-After` we are willing to sit through before giving up.
const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Thin wrapper around the Web API. Holds the HTTP client and the token
/// manager; the endpoint methods live in [`super::player`] and
/// [`super::library`].
pub struct SpotifyClient {
    http: Client,
    base_url: String,
    tokens: Mutex<TokenManager<SpotifyTokenEndpoint, SystemClock>>,
}

impl SpotifyClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        tokens: TokenManager<SpotifyTokenEndpoint, SystemClock>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            tokens: Mutex::new(tokens),
        }
    }

    /// Client wired to the stores in `settings.config_dir`. Credentials in
    /// `overrides` win over `credentials.json`.
    pub async fn from_settings(settings: &Settings, overrides: Credentials) -> Result<Self, ApiError> {
        let http = http_client(settings.http_timeout)?;
        let store = CredentialStore::with_token_path(&settings.config_dir, settings.token_path());
        let endpoint = SpotifyTokenEndpoint::new(http.clone(), &settings.token_url);
        let tokens = TokenManager::load(store, overrides, endpoint, SystemClock).await?;
        Ok(Self::new(http, &settings.api_url, tokens))
    }

    /// Valid bearer token. Refreshes are serialized by the mutex, so two
    /// concurrent calls never refresh twice.
    async fn bearer(&self) -> Result<String, AuthError> {
        self.tokens.lock().await.ensure_valid().await
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Sends a request and maps every non-2xx answer to [`ApiError::Upstream`].
    ///
    /// A 429 is retried once after `Retry-After` if the wait is reasonable.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        action: &str,
    ) -> Result<Response, ApiError> {
        let token = self.bearer().await?;
        let url = self.url(path);
        let mut throttled = false;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&token)
                .query(query);
            if method != Method::GET {
                // the player endpoints reject body-less writes without it
                request = request.header(CONTENT_LENGTH, 0);
            }

            log::debug!("{} {}", method, url);
            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && !throttled {
                match retry_after(&response) {
                    Some(wait) if wait <= MAX_RETRY_AFTER_SECS => {
                        log::warn!("rate limited while trying to {action}, retrying in {wait}s");
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                        throttled = true;
                        continue;
                    }
                    Some(wait) => log::warn!("rate limited for {wait}s, giving up on {action}"),
                    None => log::warn!("rate limited without Retry-After, giving up on {action}"),
                }
            }

            if status.is_success() {
                return Ok(response);
            }

            let message = upstream_message(response)
                .await
                .unwrap_or_else(|| format!("Failed to {}", action));
            log::debug!("{} {} failed with HTTP {}: {}", method, url, status.as_u16(), message);
            return Err(ApiError::upstream(status.as_u16(), message));
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        action: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, query, action).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Like [`Self::get_json`] but `204 No Content` or an empty body is `None`.
    pub(crate) async fn get_optional_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        action: &str,
    ) -> Result<Option<T>, ApiError> {
        let response = self.send(Method::GET, path, query, action).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Write call whose response body is irrelevant.
    pub(crate) async fn command(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        action: &str,
    ) -> Result<(), ApiError> {
        self.send(method, path, query, action).await.map(|_| ())
    }
}

pub fn http_client(timeout: Duration) -> Result<Client, ApiError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("spotpilot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::Transient(e.to_string()))
}

fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Spotify wraps failures as `{"error": {"status": 404, "message": "..."}}`;
/// the accounts service uses `{"error": "...", "error_description": "..."}`.
async fn upstream_message(response: Response) -> Option<String> {
    let body: Value = response.json().await.ok()?;
    error_message(&body)
}

pub(crate) fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    let message = match error {
        Value::Object(_) => error.get("message")?.as_str()?,
        Value::String(s) => body
            .get("error_description")
            .and_then(Value::as_str)
            .unwrap_or(s),
        _ => return None,
    };

    (!message.trim().is_empty()).then(|| message.to_string())
}
