use crate::{
    clock::{Clock, REFRESH_ATTEMPTS, SystemClock, refresh_backoff},
    error::AuthError,
    management::CredentialStore,
    types::{Credentials, Session, TokenResponse},
};

/// Why a refresh request did not yield a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// 4xx from the token endpoint. The refresh token is dead.
    Revoked { status: u16, reason: String },
    /// Timeout, connection failure or 5xx. Worth another attempt.
    Transient(String),
}

/// The OAuth token endpoint, as far as refreshing is concerned.
#[allow(async_fn_in_trait)]
pub trait TokenEndpoint {
    async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<TokenResponse, RefreshFailure>;
}

/// Keeps a usable access token around for the lifetime of the process.
///
/// The session on disk is shared with other processes (a `spotpilot auth`
/// running in another terminal, a second autopilot). Before every refresh the
/// manager re-reads disk and only refreshes if the fresh state is still stale.
pub struct TokenManager<E, C = SystemClock> {
    store: CredentialStore,
    overrides: Credentials,
    credentials: Credentials,
    session: Session,
    endpoint: E,
    clock: C,
}

impl<E: TokenEndpoint, C: Clock> TokenManager<E, C> {
    /// `overrides` are credentials from the environment. They win over
    /// `credentials.json` on every reload.
    pub fn new(
        store: CredentialStore,
        overrides: Credentials,
        session: Session,
        endpoint: E,
        clock: C,
    ) -> Self {
        Self {
            store,
            credentials: overrides.clone(),
            overrides,
            session,
            endpoint,
            clock,
        }
    }

    /// Builds a manager from whatever is currently stored on disk.
    pub async fn load(
        store: CredentialStore,
        overrides: Credentials,
        endpoint: E,
        clock: C,
    ) -> Result<Self, AuthError> {
        let mut manager = Self::new(store, overrides, Session::default(), endpoint, clock);
        manager.credentials = manager
            .store
            .load_credentials()
            .await?
            .overlay(manager.overrides.clone());
        manager.session = manager.store.load_session().await?;
        Ok(manager)
    }

    /// Returns an access token that is valid for at least another minute,
    /// refreshing it first when necessary.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthenticated`] when no token of any kind exists
    /// - [`AuthError::SessionExpired`] when a refresh was needed and failed
    pub async fn ensure_valid(&mut self) -> Result<String, AuthError> {
        if !self.session.has_any_token() {
            self.reload_from_disk().await;
            if !self.session.has_any_token() {
                return Err(AuthError::Unauthenticated);
            }
        }

        if self.session.refresh_token.is_some() && self.session.is_stale(self.clock.now()) {
            self.reload_from_disk().await;

            if self.session.is_stale(self.clock.now()) && self.session.refresh_token.is_some() {
                self.refresh().await?;
            }
        }

        match &self.session.access_token {
            Some(token) => Ok(token.clone()),
            None if self.session.refresh_token.is_some() => Err(AuthError::SessionExpired),
            None => Err(AuthError::Unauthenticated),
        }
    }

    pub async fn persist(&self) -> Result<(), AuthError> {
        self.store.save_session(&self.session).await?;
        Ok(())
    }

    pub fn current_session(&self) -> &Session {
        &self.session
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Prefers whatever is on disk. A missing or unreadable file leaves the
    /// in-memory state untouched.
    async fn reload_from_disk(&mut self) {
        match self.store.load_credentials().await {
            Ok(stored) => self.credentials = stored.overlay(self.overrides.clone()),
            Err(e) => log::warn!("could not re-read credentials: {}", e),
        }

        match self.store.load_session().await {
            Ok(session) if session.has_any_token() => self.session = session,
            Ok(_) => {}
            Err(e) => log::warn!("could not re-read token file: {}", e),
        }
    }

    async fn refresh(&mut self) -> Result<(), AuthError> {
        let Some(refresh_token) = self.session.refresh_token.clone() else {
            return Err(AuthError::SessionExpired);
        };

        if self.credentials.client_id.is_none() {
            // Without a client id the endpoint would answer 4xx and we would
            // wipe a perfectly good refresh token.
            log::warn!("cannot refresh: no client id configured");
            return Err(AuthError::Unauthenticated);
        }

        for attempt in 1..=REFRESH_ATTEMPTS {
            log::debug!("refreshing access token (attempt {attempt}/{REFRESH_ATTEMPTS})");

            match self.endpoint.refresh(&self.credentials, &refresh_token).await {
                Ok(grant) => {
                    self.session.access_token = Some(grant.access_token);
                    self.session.expires_at =
                        Some(self.clock.now() + grant.expires_in.unwrap_or(3600));
                    // refresh tokens may be single-use
                    if let Some(rotated) = grant.refresh_token.filter(|t| !t.is_empty()) {
                        self.session.refresh_token = Some(rotated);
                    }
                    self.persist().await?;
                    log::info!("access token refreshed");
                    return Ok(());
                }
                Err(RefreshFailure::Revoked { status, reason }) => {
                    log::warn!("refresh token revoked (HTTP {status}): {reason}");
                    self.session = Session::default();
                    self.persist().await?;
                    return Err(AuthError::SessionExpired);
                }
                Err(RefreshFailure::Transient(reason)) => {
                    log::warn!("token refresh attempt {attempt} failed: {reason}");
                    if attempt < REFRESH_ATTEMPTS {
                        self.clock.sleep(refresh_backoff(attempt)).await;
                    }
                }
            }
        }

        if self.session.access_token.is_some() && !self.session.is_expired(self.clock.now()) {
            log::warn!("token refresh failed, using the current token until it expires");
            return Ok(());
        }

        Err(AuthError::SessionExpired)
    }
}
