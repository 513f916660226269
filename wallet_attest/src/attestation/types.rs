use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::AttestationError;

/// Attestation platforms this service can verify.
///
/// A closed set: callers deserialize straight into this enum and every
/// dispatch over it is an exhaustive match, so adding a platform is a
/// compile-time-visible change rather than a silent default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Apple,
    Google,
}

impl Platform {
    /// The validation-method attribute value recorded on issued credentials.
    pub fn validation_method(&self) -> &'static str {
        match self {
            Platform::Apple => "apple:app-attest",
            Platform::Google => "google:play-integrity",
        }
    }

    /// The operating system attribute value recorded on issued credentials.
    pub fn operating_system(&self) -> &'static str {
        match self {
            Platform::Apple => "ios",
            Platform::Google => "android",
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = AttestationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apple" => Ok(Platform::Apple),
            "google" => Ok(Platform::Google),
            other => Err(AttestationError::Malformed(format!(
                "Unsupported platform: {other}"
            ))),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Apple => write!(f, "apple"),
            Platform::Google => write!(f, "google"),
        }
    }
}

/// Input to the verification facade.
#[derive(Debug, Clone)]
pub struct AttestationRequest {
    pub platform: Platform,
    /// Base64 CBOR envelope (Apple) or opaque integrity token (Google)
    pub payload: String,
    /// Base64 key identifier; required for the Apple pipeline
    pub key_identifier: Option<String>,
    /// The server-issued challenge the attestation must be bound to
    pub nonce: String,
}

/// Platform-tagged attestation envelope produced by the decoder.
///
/// Derived, read-only, and scoped to a single verification call.
#[derive(Debug, Clone)]
pub(crate) enum AttestationEnvelope {
    Apple {
        auth_data: Vec<u8>,
        /// DER certificates, credential (leaf) certificate first
        cert_chain: Vec<Vec<u8>>,
    },
    Google {
        token: String,
    },
}

/// Which fixed-layout authenticator-data check failed.
///
/// Internal detail for logs; never shown to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralCheck {
    /// Credential certificate key is not an uncompressed P-256 point
    UnsupportedKey,
    /// SHA-256 of the credential public key != key identifier
    KeyIdentifier,
    /// SHA-256 of the app identifier != RP ID hash
    RpIdHash,
    /// Sign counter was not zero
    Counter,
    /// AAGUID is neither the development nor the production marker
    Aaguid,
    /// Credential ID != key identifier
    CredentialId,
}

impl fmt::Display for StructuralCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StructuralCheck::UnsupportedKey => "unsupported-key",
            StructuralCheck::KeyIdentifier => "key-id-mismatch",
            StructuralCheck::RpIdHash => "rp-id-mismatch",
            StructuralCheck::Counter => "counter-nonzero",
            StructuralCheck::Aaguid => "aaguid-mismatch",
            StructuralCheck::CredentialId => "cred-id-mismatch",
        };
        write!(f, "{s}")
    }
}

/// Why an attestation was definitively rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    Malformed(String),
    ChainInvalid(String),
    NonceMismatch,
    Structural(StructuralCheck),
    VerdictRejected(String),
}

/// Terminal outcome of one verification call.
///
/// `TransientError` is never conflated with `Invalid`: a transient outcome
/// may be retried by the orchestration layer, a rejection may not.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    Valid,
    Invalid(RejectionReason),
    TransientError(String),
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationResult::Valid)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, VerificationResult::TransientError(_))
    }
}

impl From<AttestationError> for VerificationResult {
    fn from(err: AttestationError) -> Self {
        match err {
            AttestationError::Malformed(msg) => {
                VerificationResult::Invalid(RejectionReason::Malformed(msg))
            }
            AttestationError::ChainInvalid(msg) => {
                VerificationResult::Invalid(RejectionReason::ChainInvalid(msg))
            }
            AttestationError::NonceMismatch => {
                VerificationResult::Invalid(RejectionReason::NonceMismatch)
            }
            AttestationError::Structural(check) => {
                VerificationResult::Invalid(RejectionReason::Structural(check))
            }
            AttestationError::VerdictRejected(msg) => {
                VerificationResult::Invalid(RejectionReason::VerdictRejected(msg))
            }
            AttestationError::Transient(cause) => VerificationResult::TransientError(cause),
        }
    }
}

/// One attribute on the credential offered after successful verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialAttribute {
    pub name: String,
    pub value: String,
}

/// Attribute name/value pairs assembled only after a `Valid` outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialAttributeSet {
    pub attributes: Vec<CredentialAttribute>,
}

impl CredentialAttributeSet {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}
