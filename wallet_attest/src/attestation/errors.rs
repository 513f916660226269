use thiserror::Error;

use super::types::StructuralCheck;

/// Errors that can occur while verifying a device attestation.
///
/// Every pipeline stage returns one of these instead of raising past its
/// boundary; the facade aggregates the first failure and stops. `Transient`
/// is the only category the orchestration layer may retry.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// The payload could not be decoded into an attestation envelope
    #[error("Malformed attestation payload: {0}")]
    Malformed(String),

    /// The certificate chain is broken, unsigned, or uses an unsupported algorithm
    #[error("Certificate chain invalid: {0}")]
    ChainInvalid(String),

    /// The nonce commitment in the credential certificate does not match
    /// the server-issued challenge
    #[error("Nonce commitment mismatch")]
    NonceMismatch,

    /// A fixed-layout authenticator data check failed
    #[error("Structural check failed: {0}")]
    Structural(StructuralCheck),

    /// The Play Integrity verdict failed the acceptance predicate
    #[error("Integrity verdict rejected: {0}")]
    VerdictRejected(String),

    /// Network or platform-service unavailability; eligible for retry by
    /// the caller, never by this crate
    #[error("Transient error: {0}")]
    Transient(String),
}

impl AttestationError {
    /// Logs internal detail for a rejection without widening the error
    /// type; the detail never reaches the caller-facing value.
    pub(crate) fn log_detail(self, detail: String) -> Self {
        tracing::debug!("{}", detail);
        self
    }
}
