//! OAuth 2.0 with PKCE against Google's authorization server.

mod flow;
mod pkce;
mod token;

pub use flow::{generate_state, AuthorizationCallback, AuthorizationRequest, OAuthFlow};
pub use pkce::{PkceChallenge, PKCE_METHOD};
pub use token::{OAuthToken, TokenResponse};
