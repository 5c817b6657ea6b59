/// Unified error type for all store trait methods.
///
/// `Duplicate` and `NotFound` are distinguishable kinds so callers can
/// map them to conflict/not-found responses and the consistency layer can
/// tell "nothing to compensate" apart from a real backend failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Backend failure (connection, constraint other than uniqueness, …).
    /// Transient from the caller's point of view.
    #[error("store backend: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Error sending a message through the push provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PushError {
    #[error("push transport: {0}")]
    Transport(String),

    /// Provider accepted the request but rejected the message.
    #[error("push rejected: {0}")]
    Rejected(String),
}
