use ring::digest;
use subtle::ConstantTimeEq;
use x509_parser::certificate::X509Certificate;
use x509_parser::der_parser::{ber::BerObjectContent, oid::Oid, parse_ber};
use x509_parser::prelude::FromDer;

use crate::attestation::errors::AttestationError;
use crate::utils::base64_decode;

use super::authdata::{self, AuthenticatorData};
use super::chain::validate_certificate_chain;

// App Attest nonce extension on the credential certificate.
const APPLE_NONCE_EXTENSION_OID: &[u64] = &[1, 2, 840, 113635, 100, 8, 2];

/// Runs the Apple App Attest pipeline over a decoded envelope:
/// certificate chain, nonce binding, then the fixed-order structural
/// checks. The first failing stage short-circuits.
pub(super) fn verify_apple_attestation(
    auth_data: &[u8],
    cert_chain: &[Vec<u8>],
    key_identifier: &str,
    nonce: &str,
    trusted_root_der: &[u8],
    app_id: &str,
) -> Result<(), AttestationError> {
    tracing::debug!("Apple attestation: validating certificate chain");
    validate_certificate_chain(cert_chain, trusted_root_der)?;

    let (_, credential_cert) = X509Certificate::from_der(&cert_chain[0]).map_err(|e| {
        AttestationError::Malformed(format!("Failed to parse credential certificate: {e}"))
    })?;

    tracing::debug!("Apple attestation: verifying nonce binding");
    verify_nonce_binding(auth_data, nonce, &credential_cert)?;

    tracing::debug!("Apple attestation: running structural checks");
    let key_id = base64_decode(key_identifier).map_err(|e| {
        AttestationError::Malformed(format!("Failed to decode key identifier: {e}"))
    })?;

    let parsed = AuthenticatorData::parse(auth_data)?;

    authdata::verify_key_identifier(&credential_cert, &key_id)?;
    authdata::verify_rp_id_hash(&parsed, app_id)?;
    authdata::verify_counter(&parsed)?;
    authdata::verify_aaguid(&parsed)?;
    authdata::verify_credential_id(&parsed, &key_id)?;

    tracing::debug!("Apple attestation verified");

    Ok(())
}

/// Recomputes the expected nonce commitment:
/// `SHA256(authData || SHA256(challenge))`.
///
/// Deterministic: fixed authenticator data and challenge always produce
/// the same bytes.
pub(super) fn compute_composite_nonce(auth_data: &[u8], nonce: &str) -> Vec<u8> {
    let client_data_hash = digest::digest(&digest::SHA256, nonce.as_bytes());

    let mut composite = Vec::with_capacity(auth_data.len() + client_data_hash.as_ref().len());
    composite.extend_from_slice(auth_data);
    composite.extend_from_slice(client_data_hash.as_ref());

    digest::digest(&digest::SHA256, &composite).as_ref().to_vec()
}

fn verify_nonce_binding(
    auth_data: &[u8],
    nonce: &str,
    credential_cert: &X509Certificate,
) -> Result<(), AttestationError> {
    let expected = compute_composite_nonce(auth_data, nonce);
    let embedded = extract_nonce_extension(credential_cert)?;

    if !bool::from(expected.ct_eq(&embedded)) {
        return Err(AttestationError::NonceMismatch);
    }

    Ok(())
}

/// Pulls the nonce commitment out of the credential certificate's
/// vendor extension.
fn extract_nonce_extension(credential_cert: &X509Certificate) -> Result<Vec<u8>, AttestationError> {
    let oid = Oid::from(APPLE_NONCE_EXTENSION_OID).map_err(|_| {
        AttestationError::NonceMismatch.log_detail("Failed to build nonce extension OID".to_string())
    })?;

    let extension = credential_cert
        .extensions()
        .iter()
        .find(|ext| ext.oid == oid)
        .ok_or_else(|| {
            AttestationError::NonceMismatch.log_detail(
                "Credential certificate has no nonce extension".to_string(),
            )
        })?;

    decode_nonce_extension(extension.value)
}

/// Decodes the extension value: a DER SEQUENCE whose first element wraps a
/// single OCTET STRING holding the commitment bytes.
fn decode_nonce_extension(ext_value: &[u8]) -> Result<Vec<u8>, AttestationError> {
    let (_, obj) = parse_ber(ext_value).map_err(|e| {
        AttestationError::NonceMismatch
            .log_detail(format!("Nonce extension is not valid DER: {e}"))
    })?;

    let BerObjectContent::Sequence(items) = &obj.content else {
        return Err(AttestationError::NonceMismatch
            .log_detail("Nonce extension is not a DER sequence".to_string()));
    };

    let first = items.first().ok_or_else(|| {
        AttestationError::NonceMismatch.log_detail("Nonce extension sequence is empty".to_string())
    })?;

    match &first.content {
        // Bare OCTET STRING at index 0
        BerObjectContent::OctetString(_) => {
            let octets = first.as_slice().map_err(|e| {
                AttestationError::NonceMismatch
                    .log_detail(format!("Unexpected nonce extension element: {e}"))
            })?;
            Ok(octets.to_vec())
        }
        // Context-specific wrapper around the OCTET STRING
        _ => {
            let inner_bytes = first.as_slice().map_err(|e| {
                AttestationError::NonceMismatch
                    .log_detail(format!("Unexpected nonce extension element: {e}"))
            })?;
            let (_, inner) = parse_ber(inner_bytes).map_err(|e| {
                AttestationError::NonceMismatch
                    .log_detail(format!("Nonce extension payload is not valid DER: {e}"))
            })?;
            let octets = inner.as_slice().map_err(|e| {
                AttestationError::NonceMismatch
                    .log_detail(format!("Nonce extension payload is not an octet string: {e}"))
            })?;
            Ok(octets.to_vec())
        }
    }
}
