mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{closed_endpoint, serve_silent_endpoint, serve_token_endpoint};
use spotpilot::{
    management::{RefreshFailure, TokenEndpoint},
    spotify::{auth::SpotifyTokenEndpoint, client::http_client},
    types::Credentials,
    utils::basic_auth_value,
};

const GRANT: &str = r#"{"access_token":"a2","refresh_token":"r2","expires_in":1800}"#;

fn endpoint(url: String) -> SpotifyTokenEndpoint {
    SpotifyTokenEndpoint::new(http_client(Duration::from_millis(500)).unwrap(), url)
}

fn confidential() -> Credentials {
    Credentials {
        client_id: Some("cid".to_string()),
        client_secret: Some("sec".to_string()),
    }
}

fn public() -> Credentials {
    Credentials {
        client_id: Some("cid".to_string()),
        client_secret: None,
    }
}

#[tokio::test]
async fn test_bad_request_revokes() {
    let (url, _) = serve_token_endpoint(StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#).await;

    match endpoint(url).refresh(&confidential(), "r1").await {
        Err(RefreshFailure::Revoked { status, reason }) => {
            assert_eq!(status, 400);
            assert!(reason.contains("invalid_grant"));
        }
        other => panic!("expected revocation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_revokes() {
    let (url, _) = serve_token_endpoint(StatusCode::UNAUTHORIZED, "").await;

    let result = endpoint(url).refresh(&confidential(), "r1").await;

    assert!(matches!(result, Err(RefreshFailure::Revoked { status: 401, .. })));
}

#[tokio::test]
async fn test_throttling_is_transient() {
    let (url, _) = serve_token_endpoint(StatusCode::TOO_MANY_REQUESTS, "slow down").await;

    let result = endpoint(url).refresh(&confidential(), "r1").await;

    assert!(matches!(result, Err(RefreshFailure::Transient(_))));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (url, _) = serve_token_endpoint(StatusCode::SERVICE_UNAVAILABLE, "").await;

    match endpoint(url).refresh(&confidential(), "r1").await {
        Err(RefreshFailure::Transient(message)) => assert!(message.contains("503")),
        other => panic!("expected a transient failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_grant_is_transient() {
    let (url, _) = serve_token_endpoint(StatusCode::OK, "<html>maintenance</html>").await;

    let result = endpoint(url).refresh(&confidential(), "r1").await;

    assert!(matches!(result, Err(RefreshFailure::Transient(_))));
}

#[tokio::test]
async fn test_refused_connection_is_transient() {
    let url = closed_endpoint().await;

    let result = endpoint(url).refresh(&confidential(), "r1").await;

    assert!(matches!(result, Err(RefreshFailure::Transient(_))));
}

#[tokio::test]
async fn test_unanswered_request_times_out_as_transient() {
    let url = serve_silent_endpoint().await;

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        endpoint(url).refresh(&confidential(), "r1"),
    )
    .await
    .expect("refresh did not time out");

    assert!(matches!(result, Err(RefreshFailure::Transient(_))));
}

#[tokio::test]
async fn test_grant_is_decoded() {
    let (url, _) = serve_token_endpoint(StatusCode::OK, GRANT).await;

    let grant = endpoint(url).refresh(&confidential(), "r1").await.unwrap();

    assert_eq!(grant.access_token, "a2");
    assert_eq!(grant.refresh_token.as_deref(), Some("r2"));
    assert_eq!(grant.expires_in, Some(1800));
}

#[tokio::test]
async fn test_secret_is_sent_as_basic_auth() {
    let (url, requests) = serve_token_endpoint(StatusCode::OK, GRANT).await;

    endpoint(url).refresh(&confidential(), "r1").await.unwrap();

    let seen = requests.all();
    assert_eq!(seen.len(), 1);
    let (auth, form) = &seen[0];
    assert_eq!(auth.as_deref(), Some(basic_auth_value("cid", "sec").as_str()));
    assert!(form.contains("grant_type=refresh_token"));
    assert!(form.contains("refresh_token=r1"));
    assert!(!form.contains("client_id"));
}

#[tokio::test]
async fn test_public_client_sends_id_in_form() {
    let (url, requests) = serve_token_endpoint(StatusCode::OK, GRANT).await;

    endpoint(url).refresh(&public(), "r1").await.unwrap();

    let seen = requests.all();
    let (auth, form) = &seen[0];
    assert_eq!(*auth, None);
    assert!(form.contains("client_id=cid"));
    assert!(form.contains("grant_type=refresh_token"));
    assert!(form.contains("refresh_token=r1"));
}
