//! Error types for gateway operations
//!
//! The gateway recovers exactly one failure class transparently (expired
//! access token with a valid refresh token). Everything else surfaces here
//! unchanged: the caller owns presentation and navigation.

/// Errors from gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Login or register rejected (wrong password, validation failure).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The session cannot be recovered: no refresh token was stored, or the
    /// refresh attempt itself was rejected. The credential store has been
    /// cleared by the time this is returned.
    #[error("session expired")]
    SessionExpired,

    /// Connection-level failure from the HTTP client. Not retried.
    #[error("network error: {0}")]
    Transport(String),

    /// Non-authorization HTTP failure from a domain endpoint.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Auth service misbehaved in a way that is neither a credential
    /// rejection nor a transport failure (5xx, malformed body).
    #[error("auth service error: {0}")]
    AuthService(String),

    /// Credential store I/O or parse failure.
    #[error("credential store error: {0}")]
    Credential(String),
}

impl From<opsdeck_auth::Error> for Error {
    fn from(err: opsdeck_auth::Error) -> Self {
        match err {
            opsdeck_auth::Error::InvalidCredentials(msg) => Error::Auth(msg),
            opsdeck_auth::Error::Http(msg) => Error::Transport(msg),
            opsdeck_auth::Error::Endpoint(msg) => Error::AuthService(msg),
            opsdeck_auth::Error::CredentialParse(msg) | opsdeck_auth::Error::Io(msg) => {
                Error::Credential(msg)
            }
        }
    }
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status_and_message() {
        let err = Error::Api {
            status: 404,
            message: "Project not found".into(),
        };
        assert_eq!(err.to_string(), "API error (404): Project not found");
    }

    #[test]
    fn auth_error_converts_by_class() {
        let auth: Error = opsdeck_auth::Error::InvalidCredentials("bad password".into()).into();
        assert!(matches!(auth, Error::Auth(_)));

        let transport: Error = opsdeck_auth::Error::Http("connection refused".into()).into();
        assert!(matches!(transport, Error::Transport(_)));

        let service: Error = opsdeck_auth::Error::Endpoint("500".into()).into();
        assert!(matches!(service, Error::AuthService(_)));

        let store: Error = opsdeck_auth::Error::Io("disk full".into()).into();
        assert!(matches!(store, Error::Credential(_)));
    }
}
