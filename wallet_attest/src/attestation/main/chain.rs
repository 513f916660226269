use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::attestation::errors::AttestationError;

/// Validates the App Attest certificate chain against the trusted root.
///
/// The chain is `[credential_cert, intermediate_cert]`, leaf first. Checks
/// run in a fixed order and the first failure wins:
/// issuer linkage, leaf signature algorithm, intermediate signature under
/// the root key, leaf signature under the intermediate key. An invalid
/// signature is the expected failure path here, not an exceptional one.
pub(super) fn validate_certificate_chain(
    cert_chain: &[Vec<u8>],
    trusted_root_der: &[u8],
) -> Result<(), AttestationError> {
    let (_, root) = X509Certificate::from_der(trusted_root_der).map_err(|e| {
        AttestationError::ChainInvalid(format!("Failed to parse trusted root certificate: {e}"))
    })?;

    let (_, credential_cert) = X509Certificate::from_der(&cert_chain[0]).map_err(|e| {
        AttestationError::ChainInvalid(format!("Failed to parse credential certificate: {e}"))
    })?;

    let (_, intermediate_cert) = X509Certificate::from_der(&cert_chain[1]).map_err(|e| {
        AttestationError::ChainInvalid(format!("Failed to parse intermediate certificate: {e}"))
    })?;

    tracing::debug!("Credential certificate subject: {}", credential_cert.subject());
    tracing::debug!("Intermediate certificate subject: {}", intermediate_cert.subject());

    if intermediate_cert.issuer() != root.subject() {
        return Err(AttestationError::ChainInvalid(
            "Intermediate certificate was not issued by the trusted root".to_string(),
        ));
    }

    let leaf_sig_alg = &credential_cert.signature_algorithm.algorithm;
    if *leaf_sig_alg != oid_registry::OID_SIG_ECDSA_WITH_SHA256 {
        return Err(AttestationError::ChainInvalid(format!(
            "Unsupported credential certificate signature algorithm: {leaf_sig_alg}"
        )));
    }

    intermediate_cert
        .verify_signature(Some(root.public_key()))
        .map_err(|_| {
            AttestationError::ChainInvalid(
                "Intermediate certificate signature did not verify under the root key".to_string(),
            )
        })?;

    credential_cert
        .verify_signature(Some(intermediate_cert.public_key()))
        .map_err(|_| {
            AttestationError::ChainInvalid(
                "Credential certificate signature did not verify under the intermediate key"
                    .to_string(),
            )
        })?;

    tracing::debug!("Certificate chain verified against trusted root");

    Ok(())
}
