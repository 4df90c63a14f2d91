//! Error taxonomy for the memory engine.
//!
//! Per the propagation policy: every subsystem below the CLI is lenient —
//! callers absorb, log, and continue. `Error` exists so call sites *can*
//! distinguish failure classes when they choose to (the CLI surface does),
//! not so the engine ever unwinds a pipeline on first failure.

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Brain Synapse memory engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("lock contention exhausted for {0}")]
    LockContention(String),

    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl Error {
    /// Transient I/O, lock contention, and embedder-unavailable errors are
    /// the ones the leniency policy expects call sites to catch, log, and
    /// substitute a neutral value for.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::LockContention(_) | Error::EmbedderUnavailable(_)
        )
    }

    /// User input errors are the only ones the CLI surfaces as a non-zero exit.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_flagged() {
        let err = Error::LockContention("synapse_weights.json".into());
        assert!(err.is_transient());
        assert!(!err.is_user_error());
    }

    #[test]
    fn user_errors_are_flagged() {
        let err = Error::InvalidInput("missing colon".into());
        assert!(err.is_user_error());
        assert!(!err.is_transient());
    }
}
