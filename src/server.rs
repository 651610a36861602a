use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Extension, Router, routing::get};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::{api, error, types::PkceToken};

/// `http` is used for the code exchange and should carry a timeout.
pub fn router(state: Arc<Mutex<Option<PkceToken>>>, http: Client) -> Router {
    Router::new().route("/health", get(api::health)).route(
        "/callback",
        get(api::callback)
            .layer::<_, std::convert::Infallible>(Extension(state))
            .layer(Extension(http)),
    )
}

/// Serves the OAuth callback on `addr` until the process exits.
pub async fn start_api_server(state: Arc<Mutex<Option<PkceToken>>>, addr: &str, http: Client) {
    let addr = match SocketAddr::from_str(addr) {
        Ok(addr) => addr,
        Err(e) => error!("Failed to parse server address {}: {}", addr, e),
    };

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => error!("Cannot listen on {} for the OAuth callback: {}", addr, e),
    };

    log::debug!("callback server listening on {}", addr);
    if let Err(e) = axum::serve(listener, router(state, http)).await {
        error!("Callback server stopped: {}", e);
    }
}
