use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::{Client, StatusCode, Url, header::AUTHORIZATION};
use tokio::sync::Mutex;

use crate::{
    config::Settings,
    error,
    management::{CredentialStore, RefreshFailure, TokenEndpoint},
    server::start_api_server,
    spotify::client::http_client,
    success,
    types::{Credentials, PkceToken, Session, TokenResponse},
    utils, warning,
};

/// How long `auth` waits for the browser to hit the callback.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Refresh grant against the accounts service.
///
/// With a client secret the request authenticates with HTTP Basic; without
/// one (public PKCE client) the client id travels in the form body.
#[derive(Debug, Clone)]
pub struct SpotifyTokenEndpoint {
    http: Client,
    token_url: String,
}

impl SpotifyTokenEndpoint {
    pub fn new(http: Client, token_url: impl Into<String>) -> Self {
        Self {
            http,
            token_url: token_url.into(),
        }
    }
}

impl TokenEndpoint for SpotifyTokenEndpoint {
    async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<TokenResponse, RefreshFailure> {
        let client_id = credentials.client_id.as_deref().unwrap_or_default();
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let mut request = self.http.post(&self.token_url);
        match credentials.client_secret.as_deref() {
            Some(secret) if !secret.is_empty() => {
                request = request.header(AUTHORIZATION, utils::basic_auth_value(client_id, secret));
            }
            _ => form.push(("client_id", client_id)),
        }

        let response = request
            .form(&form)
            .send()
            .await
            .map_err(|e| RefreshFailure::Transient(e.to_string()))?;

        let status = response.status();
        // 429 is throttling, not a verdict on the refresh token
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            let reason = response.text().await.unwrap_or_default();
            return Err(RefreshFailure::Revoked {
                status: status.as_u16(),
                reason,
            });
        }
        if !status.is_success() {
            return Err(RefreshFailure::Transient(format!(
                "token endpoint answered HTTP {}",
                status.as_u16()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| RefreshFailure::Transient(e.to_string()))
    }
}

/// Builds the URL the user has to open to grant access.
pub fn authorize_url(
    settings: &Settings,
    client_id: &str,
    code_challenge: &str,
) -> Result<Url, String> {
    Url::parse_with_params(
        &settings.auth_url,
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("scope", settings.scope.as_str()),
        ],
    )
    .map_err(|e| e.to_string())
}

/// Runs the authorization code flow with PKCE and stores the resulting
/// session.
///
/// 1. Generates a code verifier and its S256 challenge
/// 2. Starts the local callback server
/// 3. Opens the authorization URL in the default browser
/// 4. Waits up to a minute for the callback to complete the code exchange
/// 5. Persists the session to `token.json`
///
/// A missing client id, a failed exchange or a timeout terminate the
/// program with an error message.
pub async fn auth(
    settings: &Settings,
    credentials: Credentials,
    shared_state: Arc<Mutex<Option<PkceToken>>>,
) {
    let Some(client_id) = credentials.client_id.clone() else {
        error!(
            "Missing Spotify credentials. Set SPOTIFY_CLIENT_ID or run \"spotpilot auth --client-id <ID>\"."
        );
    };

    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    let auth_url = match authorize_url(settings, &client_id, &code_challenge) {
        Ok(url) => url,
        Err(e) => error!("Invalid authorization URL {}: {}", settings.auth_url, e),
    };

    // verifier must be in place before the browser can redirect back
    {
        let mut lock = shared_state.lock().await;
        *lock = Some(PkceToken {
            code_verifier,
            token_url: settings.token_url.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            credentials,
            session: None,
        });
    }

    let http = match http_client(settings.http_timeout) {
        Ok(http) => http,
        Err(e) => error!("Failed to build HTTP client: {}", e),
    };

    let server_state = Arc::clone(&shared_state);
    let server_addr = settings.server_addr.clone();
    tokio::spawn(async move {
        start_api_server(server_state, &server_addr, http).await;
    });

    if webbrowser::open(auth_url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let Some(session) = wait_for_session(shared_state).await else {
        error!("Authentication failed or timed out.");
    };

    let store = CredentialStore::with_token_path(&settings.config_dir, settings.token_path());
    if let Err(e) = store.save_session(&session).await {
        error!("Failed to save token: {}", e);
    }

    log::info!("new session stored at {}", store.token_path().display());
    success!("Authentication successful!");
}

/// Polls the shared state once a second until the callback handler has put a
/// session there, or [`LOGIN_TIMEOUT`] has passed.
async fn wait_for_session(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Session> {
    let started = tokio::time::Instant::now();

    while started.elapsed() < LOGIN_TIMEOUT {
        {
            let lock = shared_state.lock().await;
            if let Some(session) = lock.as_ref().and_then(|pkce| pkce.session.clone()) {
                return Some(session);
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Exchanges an authorization code for a session, proving possession of the
/// code verifier.
pub async fn exchange_code_pkce(
    http: &Client,
    pkce: &PkceToken,
    code: &str,
) -> Result<Session, reqwest::Error> {
    let client_id = pkce.credentials.client_id.as_deref().unwrap_or_default();
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("code_verifier", pkce.code_verifier.as_str()),
        ("redirect_uri", pkce.redirect_uri.as_str()),
    ];

    let mut request = http.post(&pkce.token_url);
    match pkce.credentials.client_secret.as_deref() {
        Some(secret) if !secret.is_empty() => {
            request = request.header(AUTHORIZATION, utils::basic_auth_value(client_id, secret));
        }
        _ => form.push(("client_id", client_id)),
    }

    let grant: TokenResponse = request
        .form(&form)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(session_from_grant(grant, Utc::now().timestamp()))
}

pub fn session_from_grant(grant: TokenResponse, now: i64) -> Session {
    Session {
        access_token: Some(grant.access_token),
        refresh_token: grant.refresh_token.filter(|t| !t.is_empty()),
        expires_at: Some(now + grant.expires_in.unwrap_or(3600)),
    }
}
