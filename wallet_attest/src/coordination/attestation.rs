use std::sync::LazyLock;

use chrono::Utc;
use serde::Deserialize;

use crate::attestation::{
    APPLE_APP_ID, AttestationRequest, AttestationVerifier, CredentialAttribute,
    CredentialAttributeSet, GOOGLE_PACKAGE_NAME, Platform, VerificationResult,
};
use crate::challenge::{ChallengeError, issue_challenge, take_challenge};

use super::errors::CoordinationError;

/// Bounded retries for transient verification failures. Definitive
/// rejections are never retried.
static TRANSIENT_RETRIES: LazyLock<u32> = LazyLock::new(|| {
    std::env::var("ATTEST_TRANSIENT_RETRIES")
        .map(|v| v.parse::<u32>().unwrap_or(2))
        .unwrap_or(2)
});

/// Vendor recorded on issued credentials.
static ATTEST_APP_VENDOR: LazyLock<String> =
    LazyLock::new(|| std::env::var("ATTEST_APP_VENDOR").unwrap_or_default());

/// The device's answer to an attestation challenge, as carried in the
/// message layer's payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeResponse {
    pub platform: Platform,
    /// Base64 CBOR envelope (Apple) or opaque integrity token (Google)
    pub attestation_object: String,
    /// Base64 key identifier; Apple only
    #[serde(default)]
    pub key_id: Option<String>,
}

/// Issues a fresh challenge for a session and returns it for delivery to
/// the device. Re-requesting replaces any outstanding challenge.
pub async fn request_attestation_nonce(session_key: &str) -> Result<String, CoordinationError> {
    let nonce = issue_challenge(session_key).await?;
    Ok(nonce)
}

/// Verifies a device's challenge response and, on success, assembles the
/// attribute set for the credential offer.
///
/// The cached nonce is consumed before anything else: if it is absent or
/// expired the exchange is denied outright, without running any
/// verification. Transient verification failures are retried a bounded
/// number of times; rejections are terminal.
pub async fn handle_challenge_response(
    session_key: &str,
    response: &ChallengeResponse,
    verifier: &AttestationVerifier,
) -> Result<CredentialAttributeSet, CoordinationError> {
    let nonce = match take_challenge(session_key).await {
        Ok(nonce) => nonce,
        Err(ChallengeError::NotFound(_)) | Err(ChallengeError::Expired(_)) => {
            tracing::warn!(
                "No live challenge for session {}; denying without verification",
                session_key
            );
            return Err(CoordinationError::AttestationDenied);
        }
        Err(e) => return Err(e.into()),
    };

    let request = AttestationRequest {
        platform: response.platform,
        payload: response.attestation_object.clone(),
        key_identifier: response.key_id.clone(),
        nonce,
    };

    let mut attempts = 0u32;
    loop {
        match verifier.verify(&request).await {
            VerificationResult::Valid => {
                tracing::info!(
                    "Valid {} attestation for session {}",
                    response.platform,
                    session_key
                );
                return Ok(build_attribute_set(response.platform));
            }
            VerificationResult::Invalid(reason) => {
                // Details stay in the logs; callers get the uniform denial
                tracing::info!(
                    "Attestation for session {} rejected: {:?}",
                    session_key,
                    reason
                );
                return Err(CoordinationError::AttestationDenied);
            }
            VerificationResult::TransientError(cause) => {
                attempts += 1;
                if attempts > *TRANSIENT_RETRIES {
                    tracing::error!(
                        "Attestation for session {} failed after {} transient attempts: {}",
                        session_key,
                        attempts,
                        cause
                    );
                    return Err(CoordinationError::Unavailable(cause));
                }
                tracing::warn!(
                    "Transient attestation failure for session {} (attempt {}): {}",
                    session_key,
                    attempts,
                    cause
                );
            }
        }
    }
}

/// Attribute name/value pairs for the credential offered after a valid
/// attestation.
fn build_attribute_set(platform: Platform) -> CredentialAttributeSet {
    let app_id = match platform {
        Platform::Apple => APPLE_APP_ID.to_string(),
        Platform::Google => GOOGLE_PACKAGE_NAME.to_string(),
    };

    let attributes = vec![
        CredentialAttribute {
            name: "operating_system".to_string(),
            value: platform.operating_system().to_string(),
        },
        CredentialAttribute {
            name: "validation_method".to_string(),
            value: platform.validation_method().to_string(),
        },
        CredentialAttribute {
            name: "app_id".to_string(),
            value: app_id,
        },
        CredentialAttribute {
            name: "app_vendor".to_string(),
            value: ATTEST_APP_VENDOR.to_string(),
        },
        CredentialAttribute {
            name: "issue_date_dateint".to_string(),
            value: Utc::now().format("%Y%m%d").to_string(),
        },
    ];

    CredentialAttributeSet { attributes }
}
