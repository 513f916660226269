use ring::digest;
use subtle::ConstantTimeEq;
use x509_parser::certificate::X509Certificate;
use x509_parser::public_key::PublicKey;

use crate::attestation::errors::AttestationError;
use crate::attestation::types::StructuralCheck;

// Byte layout of App Attest authenticator data. These offsets are fixed by
// the attestation format; a format change means a new version of this
// module, not a knob.
pub(super) const RP_ID_HASH_END: usize = 32;
pub(super) const COUNTER_START: usize = 33;
pub(super) const COUNTER_END: usize = 37;
pub(super) const AAGUID_START: usize = 37;
pub(super) const AAGUID_END: usize = 53;
pub(super) const CRED_ID_LEN_START: usize = 53;
pub(super) const CRED_ID_START: usize = 55;

/// AAGUID marking an attestation from the App Attest sandbox.
pub(super) const AAGUID_DEVELOPMENT: [u8; 16] = *b"appattestdevelop";
/// AAGUID marking a production attestation: `appattest` padded with zeros.
pub(super) const AAGUID_PRODUCTION: [u8; 16] = *b"appattest\x00\x00\x00\x00\x00\x00\x00";

/// Parsed view of the fixed-layout authenticator data blob.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AuthenticatorData {
    pub(crate) rp_id_hash: [u8; 32],
    pub(crate) flags: u8,
    pub(crate) counter: u32,
    pub(crate) aaguid: [u8; 16],
    pub(crate) credential_id: Vec<u8>,
}

impl AuthenticatorData {
    /// Splits the blob into its named sub-ranges, bounds-checking every
    /// access. Truncated input is a malformed payload, never a panic.
    pub(crate) fn parse(auth_data: &[u8]) -> Result<Self, AttestationError> {
        if auth_data.len() < CRED_ID_START {
            return Err(AttestationError::Malformed(format!(
                "Authenticator data too short: {} bytes",
                auth_data.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&auth_data[..RP_ID_HASH_END]);

        let flags = auth_data[RP_ID_HASH_END];

        let mut counter_bytes = [0u8; 4];
        counter_bytes.copy_from_slice(&auth_data[COUNTER_START..COUNTER_END]);
        let counter = u32::from_be_bytes(counter_bytes);

        let mut aaguid = [0u8; 16];
        aaguid.copy_from_slice(&auth_data[AAGUID_START..AAGUID_END]);

        let cred_id_len = ((auth_data[CRED_ID_LEN_START] as usize) << 8)
            | (auth_data[CRED_ID_LEN_START + 1] as usize);

        if auth_data.len() < CRED_ID_START + cred_id_len {
            return Err(AttestationError::Malformed(
                "Authenticator data too short for credential ID".to_string(),
            ));
        }

        let credential_id = auth_data[CRED_ID_START..CRED_ID_START + cred_id_len].to_vec();

        Ok(Self {
            rp_id_hash,
            flags,
            counter,
            aaguid,
            credential_id,
        })
    }
}

/// SHA-256 of the credential certificate's public key in uncompressed
/// point form must equal the key identifier the app registered.
pub(super) fn verify_key_identifier(
    credential_cert: &X509Certificate,
    key_identifier: &[u8],
) -> Result<(), AttestationError> {
    let public_key = credential_cert.public_key().parsed().map_err(|e| {
        AttestationError::Structural(StructuralCheck::UnsupportedKey).log_detail(format!(
            "Failed to parse credential certificate public key: {e}"
        ))
    })?;

    let point = match public_key {
        PublicKey::EC(point) => point,
        _ => {
            return Err(AttestationError::Structural(StructuralCheck::UnsupportedKey)
                .log_detail("Credential certificate key is not an EC key".to_string()));
        }
    };

    // Uncompressed SEC1 form: 0x04 || X (32 bytes) || Y (32 bytes)
    let point_bytes = point.data();
    if point_bytes.len() != 65 || point_bytes[0] != 0x04 {
        return Err(AttestationError::Structural(StructuralCheck::UnsupportedKey)
            .log_detail("Credential certificate key is not an uncompressed P-256 point".to_string()));
    }

    let public_key_hash = digest::digest(&digest::SHA256, point_bytes);

    if !bool::from(public_key_hash.as_ref().ct_eq(key_identifier)) {
        return Err(AttestationError::Structural(StructuralCheck::KeyIdentifier));
    }

    Ok(())
}

/// The RP ID hash must be the SHA-256 of the application identifier.
pub(super) fn verify_rp_id_hash(
    auth_data: &AuthenticatorData,
    app_id: &str,
) -> Result<(), AttestationError> {
    let app_id_hash = digest::digest(&digest::SHA256, app_id.as_bytes());

    if auth_data.rp_id_hash.as_slice() != app_id_hash.as_ref() {
        return Err(AttestationError::Structural(StructuralCheck::RpIdHash));
    }

    Ok(())
}

/// A freshly attested key has never signed an assertion, so its counter
/// must be exactly zero.
pub(super) fn verify_counter(auth_data: &AuthenticatorData) -> Result<(), AttestationError> {
    if auth_data.counter != 0 {
        return Err(AttestationError::Structural(StructuralCheck::Counter));
    }

    Ok(())
}

pub(super) fn verify_aaguid(auth_data: &AuthenticatorData) -> Result<(), AttestationError> {
    if auth_data.aaguid != AAGUID_DEVELOPMENT && auth_data.aaguid != AAGUID_PRODUCTION {
        return Err(AttestationError::Structural(StructuralCheck::Aaguid));
    }

    Ok(())
}

/// The credential ID embedded in the authenticator data must equal the
/// key identifier the app registered.
pub(super) fn verify_credential_id(
    auth_data: &AuthenticatorData,
    key_identifier: &[u8],
) -> Result<(), AttestationError> {
    if !bool::from(auth_data.credential_id.ct_eq(key_identifier)) {
        return Err(AttestationError::Structural(StructuralCheck::CredentialId));
    }

    Ok(())
}
