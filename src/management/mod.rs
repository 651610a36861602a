mod auth;
mod store;

pub use auth::RefreshFailure;
pub use auth::TokenEndpoint;
pub use auth::TokenManager;
pub use store::CredentialStore;
