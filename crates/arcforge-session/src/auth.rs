//! Authentication hook for validating player identity.
//!
//! Arcforge doesn't implement authentication itself — that's the job of
//! whatever identity provider a deployment already trusts (a JWT issuer,
//! a matchmaking service, a bare "accept any token" stand-in for local
//! testing). [`Authenticator`] is the one seam the handshake calls
//! through: hand it a token string, get back a [`PlayerId`] or a reason
//! it was rejected.

use arcforge_protocol::PlayerId;

use crate::SessionError;

/// Validates a client's auth token and returns their identity.
///
/// Implementations must be `Send + Sync + 'static`: the handshake runs
/// on whatever task accepted the connection, so the authenticator has to
/// be shareable across tasks and outlive any single connection.
///
/// # Example
///
/// ```rust
/// use arcforge_session::{Authenticator, SessionError};
/// use arcforge_protocol::PlayerId;
///
/// /// Treats the raw token as a numeric player ID. Only fit for local
/// /// testing — a real deployment verifies a signed token instead.
/// struct NumericTokenAuth;
///
/// impl Authenticator for NumericTokenAuth {
///     async fn authenticate(
///         &self,
///         token: &str,
///     ) -> Result<PlayerId, SessionError> {
///         token
///             .parse()
///             .map(PlayerId)
///             .map_err(|_| SessionError::AuthFailed("token must be a number".into()))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the given token and returns the player's identity.
    ///
    /// Called once per connection, during the handshake, with the token
    /// from the client's
    /// [`SystemMessage::Handshake`](arcforge_protocol::SystemMessage::Handshake).
    /// Returns [`SessionError::AuthFailed`] for any rejection — expired
    /// token, bad signature, revoked account, whatever the implementation
    /// considers invalid.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<PlayerId, SessionError>> + Send;
}
