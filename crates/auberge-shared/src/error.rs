use thiserror::Error;

/// Failure talking to the storage or persistence collaborator.
///
/// `Clone` so a shared in-flight request can hand the same failure to every
/// waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("{0}")]
    Rejected(String),

    #[error("Service unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Failure reported by the collaborator with `success=false`, keeping
    /// its message verbatim.
    pub fn rejected(message: Option<String>) -> Self {
        Self::Rejected(message.unwrap_or_else(|| "Request rejected by server".to_string()))
    }
}
