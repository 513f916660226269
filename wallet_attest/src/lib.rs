//! wallet-attest - Device-attestation verification for credential issuance
//!
//! This crate verifies that a mobile wallet runs on a genuine device
//! before a credential is offered to it: Apple App Attest envelopes are
//! checked against the App Attest root of trust, Google Play Integrity
//! tokens are decoded and evaluated against the expected verdict, and
//! both are bound to a server-issued one-time challenge.

mod attestation;
mod challenge;
mod coordination;
mod storage;
mod utils;

#[cfg(test)]
mod test_utils;

pub use attestation::{
    AttestationError, AttestationRequest, AttestationVerifier, CredentialAttribute,
    CredentialAttributeSet, IntegrityTokenVerifier, Platform, RejectionReason,
    RootCertificateCache, StructuralCheck, TrustedRoot, VerificationResult, fetch_trusted_root,
    http_client, load_trusted_root,
};

pub use challenge::{ChallengeError, issue_challenge, take_challenge};

pub use coordination::{
    ChallengeResponse, CoordinationError, handle_challenge_response, request_attestation_nonce,
};

/// Initialize the attestation verification layer
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the underlying stores and validate configuration
    storage::init().await?;
    attestation::init().await?;
    Ok(())
}
