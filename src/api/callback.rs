use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::{spotify::auth::exchange_code_pkce, types::PkceToken, warning};

/// Receives the redirect from the accounts service and trades the code for a
/// session. The waiting `auth` command picks the session up from the shared
/// state.
///
/// The shared state is only locked to read the verifier and to store the
/// result, never across the exchange itself.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared_state): Extension<Arc<Mutex<Option<PkceToken>>>>,
    Extension(http): Extension<Client>,
) -> Html<&'static str> {
    if let Some(reason) = params.get("error") {
        warning!("Authorization was denied: {}", reason);
        return Html("<h4>Authorization denied.</h4>");
    }

    let Some(code) = params.get("code") else {
        return Html("<h4>Missing authorization code.</h4>");
    };

    let Some(pkce) = shared_state.lock().await.clone() else {
        return Html("<h4>Missing PKCE code verifier.</h4>");
    };

    match exchange_code_pkce(&http, &pkce, code).await {
        Ok(session) => {
            if let Some(pkce_state) = shared_state.lock().await.as_mut() {
                pkce_state.session = Some(session);
            }
            Html("<h2>Authentication successful.</h2><p>You can close this window.</p>")
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            log::warn!("authorization code exchange failed: {e}");
            Html("<h4>Login failed.</h4>")
        }
    }
}
