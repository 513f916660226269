mod config;
mod errors;
mod main;
mod types;

pub use errors::AttestationError;

pub use main::{
    AttestationVerifier, IntegrityTokenVerifier, RootCertificateCache, TrustedRoot,
    fetch_trusted_root, http_client, load_trusted_root,
};

pub use types::{
    AttestationRequest, CredentialAttribute, CredentialAttributeSet, Platform, RejectionReason,
    StructuralCheck, VerificationResult,
};

pub(crate) use config::{APPLE_APP_ID, GOOGLE_PACKAGE_NAME};

#[cfg(test)]
pub(crate) use main::test_utils;

pub(crate) async fn init() -> Result<(), AttestationError> {
    // Validate required environment variables early
    let _ = *config::APPLE_APP_ID;

    Ok(())
}
