use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    cli::{connect, env_credentials},
    config::Settings,
    error, info,
    management::CredentialStore,
    spotify, success,
    types::{Credentials, PkceToken},
};

pub async fn auth(
    settings: &Settings,
    client_id: Option<String>,
    client_secret: Option<String>,
    shared_state: Arc<Mutex<Option<PkceToken>>>,
) {
    let store = CredentialStore::with_token_path(&settings.config_dir, settings.token_path());
    if store.is_configured().await {
        info!("Existing login found, it will be replaced");
    }

    let stored = match store.load_credentials().await {
        Ok(credentials) => credentials,
        Err(e) => error!("Cannot read {}: {}", store.credentials_path().display(), e),
    };

    let stored = if client_id.is_some() || client_secret.is_some() {
        let updated = stored.overlay(Credentials {
            client_id,
            client_secret,
        });
        if let Err(e) = store.save_credentials(&updated).await {
            error!("Cannot save credentials: {}", e);
        }
        success!("Credentials saved to {}", store.credentials_path().display());
        updated
    } else {
        stored
    };

    let credentials = stored.overlay(env_credentials());
    spotify::auth::auth(settings, credentials, shared_state).await;

    let client = connect(settings).await;
    match client.get_profile().await {
        Ok(profile) => info!(
            "Logged in as {} ({})",
            profile.display_name.as_deref().unwrap_or(&profile.id),
            profile.product.as_deref().unwrap_or("unknown plan")
        ),
        Err(e) => log::warn!("could not fetch profile after login: {e}"),
    }
}
