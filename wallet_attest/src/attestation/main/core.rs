use std::sync::Arc;
use std::time::Duration;

use crate::attestation::config::{APPLE_APP_ID, ATTEST_HTTP_TIMEOUT, GOOGLE_AUTH_JSON_PATH};
use crate::attestation::errors::AttestationError;
use crate::attestation::types::{AttestationEnvelope, AttestationRequest, VerificationResult};

use super::apple::verify_apple_attestation;
use super::decode::decode_envelope;
use super::google::IntegrityTokenVerifier;
use super::root::TrustedRoot;

/// Platform-dispatching verification facade.
///
/// One invocation runs the selected pipeline to a terminal outcome; there
/// are no retries inside. Given a fixed nonce and trusted root, identical
/// inputs always produce the identical result.
pub struct AttestationVerifier {
    trusted_root: Arc<TrustedRoot>,
    integrity: Option<IntegrityTokenVerifier>,
}

impl AttestationVerifier {
    pub fn new(trusted_root: Arc<TrustedRoot>, integrity: Option<IntegrityTokenVerifier>) -> Self {
        Self {
            trusted_root,
            integrity,
        }
    }

    /// Builds a verifier from environment configuration. Play Integrity
    /// verification is enabled only when a service-account key path is
    /// configured; Apple verification needs nothing beyond the root.
    pub fn from_config(trusted_root: Arc<TrustedRoot>) -> Result<Self, AttestationError> {
        let integrity = if GOOGLE_AUTH_JSON_PATH.is_some() {
            Some(IntegrityTokenVerifier::from_config()?)
        } else {
            tracing::warn!("GOOGLE_AUTH_JSON_PATH not set; Play Integrity verification disabled");
            None
        };

        Ok(Self::new(trusted_root, integrity))
    }

    /// Verifies one attestation to a terminal `VerificationResult`.
    ///
    /// The rejection reason is logged here and carried in the result for
    /// internal consumers; user-facing responses must not expose it.
    pub async fn verify(&self, request: &AttestationRequest) -> VerificationResult {
        match self.run(request).await {
            Ok(()) => {
                tracing::info!("Successful {} attestation", request.platform);
                VerificationResult::Valid
            }
            Err(e) => {
                match &e {
                    AttestationError::Transient(cause) => {
                        tracing::warn!("Transient {} attestation failure: {}", request.platform, cause);
                    }
                    other => {
                        tracing::info!("{} attestation rejected: {}", request.platform, other);
                    }
                }
                e.into()
            }
        }
    }

    async fn run(&self, request: &AttestationRequest) -> Result<(), AttestationError> {
        let envelope = decode_envelope(request.platform, &request.payload)?;

        match envelope {
            AttestationEnvelope::Apple {
                auth_data,
                cert_chain,
            } => {
                let key_identifier = request.key_identifier.as_deref().ok_or_else(|| {
                    AttestationError::Malformed(
                        "Key identifier is required for Apple attestations".to_string(),
                    )
                })?;

                verify_apple_attestation(
                    &auth_data,
                    &cert_chain,
                    key_identifier,
                    &request.nonce,
                    self.trusted_root.der(),
                    &APPLE_APP_ID,
                )
            }
            AttestationEnvelope::Google { token } => {
                let integrity = self.integrity.as_ref().ok_or_else(|| {
                    AttestationError::Transient(
                        "Play Integrity verification is not configured".to_string(),
                    )
                })?;

                integrity.verify(&token, &request.nonce).await
            }
        }
    }
}

/// Shared HTTP client for outbound calls, bounded by the configured
/// timeout so a stalled platform service surfaces as `Transient`.
pub fn http_client() -> Result<reqwest::Client, AttestationError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(*ATTEST_HTTP_TIMEOUT))
        .build()
        .map_err(|e| AttestationError::Transient(format!("Failed to build HTTP client: {e}")))
}
