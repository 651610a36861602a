//! # API Module
//!
//! HTTP endpoints served by the short-lived local server that `spotpilot auth`
//! starts while waiting for the browser.
//!
//! ## Endpoints
//!
//! - [`callback`] - OAuth redirect target. Exchanges the authorization code
//!   (plus the PKCE verifier) for a session and hands it back to the waiting
//!   command through shared state.
//! - [`health`] - Liveness check returning status and version.
//!
//! The router itself is assembled in [`crate::server`].

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
