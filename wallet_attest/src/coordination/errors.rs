//! Error types for the coordination layer

use thiserror::Error;

use crate::challenge::ChallengeError;
use crate::utils::UtilError;

/// Errors that can occur while orchestrating an attestation exchange.
///
/// `AttestationDenied` is deliberately uniform: which pipeline check
/// rejected the attestation is logged internally but never surfaced, so
/// the error text cannot be used as an oracle against the verifier.
#[derive(Error, Debug)]
pub enum CoordinationError {
    /// The attestation was definitively rejected; not retryable
    #[error("Credential issuance denied")]
    AttestationDenied,

    /// Verification could not complete due to service trouble; the
    /// exchange may be retried from the top with a fresh challenge
    #[error("Attestation service unavailable: {0}")]
    Unavailable(String),

    /// Error from challenge management
    #[error("Challenge error: {0}")]
    ChallengeError(ChallengeError),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    UtilsError(UtilError),
}

// Custom From implementations that automatically log errors

impl From<ChallengeError> for CoordinationError {
    fn from(err: ChallengeError) -> Self {
        let error = Self::ChallengeError(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<UtilError> for CoordinationError {
    fn from(err: UtilError) -> Self {
        let error = Self::UtilsError(err);
        tracing::error!("{}", error);
        error
    }
}
