use std::sync::{Arc, RwLock};

use x509_parser::certificate::X509Certificate;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;

use crate::attestation::config::{APPLE_ATTESTATION_ROOT_CA_PEM, APPLE_ATTESTATION_ROOT_CA_URL};
use crate::attestation::errors::AttestationError;

/// The attestation root of trust, held as DER bytes.
///
/// Certificates are re-parsed per verification call; the parsed form
/// borrows the input, and a verification takes microseconds against it.
pub struct TrustedRoot {
    der: Vec<u8>,
}

impl TrustedRoot {
    /// Decodes a PEM-encoded root certificate and checks that the payload
    /// actually parses as X.509 before accepting it.
    pub fn from_pem(pem: &[u8]) -> Result<Self, AttestationError> {
        let (_, parsed_pem) = parse_x509_pem(pem).map_err(|e| {
            AttestationError::Malformed(format!("Trusted root is not valid PEM: {e}"))
        })?;

        X509Certificate::from_der(&parsed_pem.contents).map_err(|e| {
            AttestationError::Malformed(format!("Trusted root is not a valid certificate: {e}"))
        })?;

        Ok(Self {
            der: parsed_pem.contents,
        })
    }

    pub(crate) fn der(&self) -> &[u8] {
        &self.der
    }
}

/// Process-wide holder for the trusted root with read-copy-update
/// semantics: readers clone an `Arc`, `refresh` swaps it without
/// coordinating with in-flight verifications. Old and new roots both
/// remain valid signers of already-issued certificates, so no further
/// locking is needed.
pub struct RootCertificateCache {
    inner: RwLock<Arc<TrustedRoot>>,
}

impl RootCertificateCache {
    pub fn new(root: TrustedRoot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(root)),
        }
    }

    pub fn current(&self) -> Arc<TrustedRoot> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn refresh(&self, root: TrustedRoot) {
        let root = Arc::new(root);
        match self.inner.write() {
            Ok(mut guard) => *guard = root,
            Err(poisoned) => *poisoned.into_inner() = root,
        }
    }
}

/// Loads the trusted root: the pinned PEM when configured, otherwise a
/// one-time fetch from the configured certificate authority URL.
pub async fn load_trusted_root(client: &reqwest::Client) -> Result<TrustedRoot, AttestationError> {
    if let Some(pem) = APPLE_ATTESTATION_ROOT_CA_PEM.as_ref() {
        tracing::debug!("Using pinned attestation root certificate");
        return TrustedRoot::from_pem(pem.as_bytes());
    }

    fetch_trusted_root(client).await
}

/// Fetches the root certificate PEM over the network. Transport failures
/// are transient: the caller may retry on its own schedule.
pub async fn fetch_trusted_root(client: &reqwest::Client) -> Result<TrustedRoot, AttestationError> {
    let url = APPLE_ATTESTATION_ROOT_CA_URL.as_str();
    tracing::debug!("Fetching attestation root certificate from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AttestationError::Transient(format!("Root certificate fetch failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AttestationError::Transient(format!(
            "Root certificate fetch returned status {status}"
        )));
    }

    let body = response.bytes().await.map_err(|e| {
        AttestationError::Transient(format!("Failed to read root certificate response: {e}"))
    })?;

    TrustedRoot::from_pem(&body)
}
