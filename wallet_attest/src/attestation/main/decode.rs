use ciborium::value::Value as CborValue;

use crate::attestation::errors::AttestationError;
use crate::attestation::types::{AttestationEnvelope, Platform};
use crate::utils::base64_decode;

const APPLE_ATTESTATION_FORMAT: &str = "apple-appattest";

/// Converts a platform-specific payload into an `AttestationEnvelope`.
///
/// Any structural or encoding problem yields `Malformed`; this function
/// never panics and never returns a partially-populated envelope.
pub(super) fn decode_envelope(
    platform: Platform,
    payload: &str,
) -> Result<AttestationEnvelope, AttestationError> {
    match platform {
        Platform::Apple => decode_apple_envelope(payload),
        Platform::Google => Ok(AttestationEnvelope::Google {
            token: payload.to_string(),
        }),
    }
}

fn decode_apple_envelope(payload: &str) -> Result<AttestationEnvelope, AttestationError> {
    let bytes = base64_decode(payload)
        .map_err(|e| AttestationError::Malformed(format!("Failed to decode payload: {e}")))?;

    let cbor: CborValue = ciborium::de::from_reader(&bytes[..])
        .map_err(|e| AttestationError::Malformed(format!("Invalid CBOR data: {e}")))?;

    let CborValue::Map(map) = cbor else {
        return Err(AttestationError::Malformed(
            "Attestation object is not a CBOR map".to_string(),
        ));
    };

    let mut fmt = None;
    let mut auth_data = None;
    let mut att_stmt = None;

    for (key, value) in map {
        if let CborValue::Text(k) = key {
            match k.as_str() {
                "fmt" => {
                    if let CborValue::Text(f) = value {
                        fmt = Some(f);
                    }
                }
                "authData" => {
                    if let CborValue::Bytes(data) = value {
                        auth_data = Some(data);
                    }
                }
                "attStmt" => {
                    if let CborValue::Map(stmt) = value {
                        att_stmt = Some(stmt);
                    }
                }
                _ => {}
            }
        }
    }

    let (fmt, auth_data, att_stmt) = match (fmt, auth_data, att_stmt) {
        (Some(f), Some(d), Some(s)) => (f, d, s),
        _ => {
            return Err(AttestationError::Malformed(
                "Missing required attestation data".to_string(),
            ));
        }
    };

    if fmt != APPLE_ATTESTATION_FORMAT {
        return Err(AttestationError::Malformed(format!(
            "Unexpected attestation format: {fmt}"
        )));
    }

    let cert_chain = extract_certificate_chain(&att_stmt)?;

    tracing::debug!(
        "Decoded attestation envelope: {} bytes of authenticator data, {} certificates",
        auth_data.len(),
        cert_chain.len()
    );

    Ok(AttestationEnvelope::Apple {
        auth_data,
        cert_chain,
    })
}

/// Pulls the `x5c` certificate array out of the attestation statement.
/// The chain must hold at least the credential and intermediate
/// certificates, in that order.
fn extract_certificate_chain(
    att_stmt: &[(CborValue, CborValue)],
) -> Result<Vec<Vec<u8>>, AttestationError> {
    let mut cert_chain = Vec::new();

    for (k, v) in att_stmt {
        if let (CborValue::Text(key_str), CborValue::Array(certs)) = (k, v) {
            if key_str == "x5c" {
                for cert in certs {
                    if let CborValue::Bytes(cert_bytes) = cert {
                        cert_chain.push(cert_bytes.clone());
                    }
                }
            }
        }
    }

    if cert_chain.len() < 2 {
        return Err(AttestationError::Malformed(format!(
            "Certificate chain must contain credential and intermediate certificates, found {}",
            cert_chain.len()
        )));
    }

    Ok(cert_chain)
}
