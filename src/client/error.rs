use reqwest::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The liveness probe failed before a credential call was attempted.
    #[error("Server is not available. Please make sure the backend is running.")]
    ServerUnavailable,
    /// Connection failure or timeout on the call itself.
    #[error("Cannot connect to server: {0}")]
    Unreachable(String),
    /// No token held, or the server refused the one we sent.
    #[error("Not authenticated")]
    Unauthenticated,
    /// The server answered with an error body.
    #[error("{message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
    #[error("{0}")]
    Validation(String),
    #[error("Unexpected response from server: {0}")]
    Decode(String),
    /// A newer session transition happened while this call was in flight.
    #[error("Session changed while the request was in flight")]
    Superseded,
}

impl ClientError {
    pub fn rejected(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            status: status.as_u16(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// The held token is no good: it was refused, or its user is gone.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Unauthenticated => true,
            Self::Rejected { status, code, .. } => matches!(
                (*status, code.as_str()),
                (401, "unauthenticated") | (404, "not_found")
            ),
            _ => false,
        }
    }

    /// Worth retrying later without touching credentials.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ServerUnavailable | Self::Unreachable(_) | Self::Decode(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Unreachable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ClientError::Unauthenticated.is_auth_failure());
        assert!(
            ClientError::rejected(StatusCode::NOT_FOUND, "not_found", "User not found")
                .is_auth_failure()
        );
        assert!(
            !ClientError::rejected(StatusCode::CONFLICT, "conflict", "taken").is_auth_failure()
        );
        assert!(ClientError::ServerUnavailable.is_transient());
        assert!(
            ClientError::rejected(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "x")
                .is_transient()
        );
        assert!(!ClientError::Unauthenticated.is_transient());
    }

    #[test]
    fn unknown_route_is_not_an_auth_failure() {
        // A wrong base path yields a bare 404 without an error code.
        let err = ClientError::rejected(StatusCode::NOT_FOUND, "", "404 Not Found");
        assert!(!err.is_auth_failure());
        let err = ClientError::rejected(StatusCode::UNAUTHORIZED, "invalid_credentials", "x");
        assert!(!err.is_auth_failure());
    }
}
