use thiserror::Error;

use crate::utils::UtilError;

/// Errors from challenge (nonce) issuance and consumption.
#[derive(Debug, Error)]
pub enum ChallengeError {
    /// The challenge was never issued, already consumed, or evicted
    #[error("Challenge not found: {0}")]
    NotFound(String),

    /// The challenge outlived its time-to-live
    #[error("Challenge expired: {0}")]
    Expired(String),

    /// Error accessing the cache store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error from utility operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChallengeError::NotFound("conn1".to_string());
        assert_eq!(err.to_string(), "Challenge not found: conn1");

        let err = ChallengeError::Expired("conn2".to_string());
        assert_eq!(err.to_string(), "Challenge expired: conn2");
    }

    #[test]
    fn test_error_is_sync_and_send() {
        fn assert_sync_send<T: Sync + Send>() {}
        assert_sync_send::<ChallengeError>();
    }
}
