//! Shared fixtures for attestation tests: a real App Attest envelope
//! captured from a development device, the root CA that anchors its
//! chain, and builders for synthetic authenticator data.

use x509_parser::pem::parse_x509_pem;

use crate::attestation::types::{AttestationEnvelope, Platform};

use super::decode::decode_envelope;

/// App Attest root CA anchoring the fixture chain.
pub(crate) const APPLE_ROOT_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIICITCCAaegAwIBAgIQC/O+DvHN0uD7jG5yH2IXmDAKBggqhkjOPQQDAzBSMSYw
JAYDVQQDDB1BcHBsZSBBcHAgQXR0ZXN0YXRpb24gUm9vdCBDQTETMBEGA1UECgwK
QXBwbGUgSW5jLjETMBEGA1UECAwKQ2FsaWZvcm5pYTAeFw0yMDAzMTgxODMyNTNa
Fw00NTAzMTUwMDAwMDBaMFIxJjAkBgNVBAMMHUFwcGxlIEFwcCBBdHRlc3RhdGlv
biBSb290IENBMRMwEQYDVQQKDApBcHBsZSBJbmMuMRMwEQYDVQQIDApDYWxpZm9y
bmlhMHYwEAYHKoZIzj0CAQYFK4EEACIDYgAERTHhmLW07ATaFQIEVwTtT4dyctdh
NbJhFs/Ii2FdCgAHGbpphY3+d8qjuDngIN3WVhQUBHAoMeQ/cLiP1sOUtgjqK9au
Yen1mMEvRq9Sk3Jm5X8U62H+xTD3FE9TgS41o0IwQDAPBgNVHRMBAf8EBTADAQH/
MB0GA1UdDgQWBBSskRBTM72+aEH/pwyp5frq5eWKoTAOBgNVHQ8BAf8EBAMCAQYw
CgYIKoZIzj0EAwMDaAAwZQIwQgFGnByvsiVbpTKwSga0kP0e8EeDS4+sQmTvb7vn
53O5+FRXgeLhpJ06ysC5PrOyAjEAp5U4xDgEgllF7En3VcE3iexZZtKeYnpqtijV
oyFraWVIyd/dganmrduC1bmTBGwD
-----END CERTIFICATE-----
";

const APP_ATTEST_FIXTURE_B64: &str = include_str!("../../../tests/data/app_attest_fixture.b64");

/// App ID the fixture's RP ID hash commits to.
pub(crate) const FIXTURE_APP_ID: &str = "762U5G7236.network.gandalf.connect";

/// Key identifier registered for the fixture's credential key.
pub(crate) const FIXTURE_KEY_ID: &str = "G3ef9pHt9N4DxUjo/hli9tV5gGDKaD3Ue7K8cqeN/r8=";

pub(crate) fn fixture_payload() -> String {
    APP_ATTEST_FIXTURE_B64.trim().to_string()
}

pub(crate) fn apple_test_root_der() -> Vec<u8> {
    let (_, pem) =
        parse_x509_pem(APPLE_ROOT_CA_PEM.as_bytes()).expect("test root PEM should parse");
    pem.contents
}

fn fixture_envelope() -> (Vec<u8>, Vec<Vec<u8>>) {
    match decode_envelope(Platform::Apple, &fixture_payload())
        .expect("fixture envelope should decode")
    {
        AttestationEnvelope::Apple {
            auth_data,
            cert_chain,
        } => (auth_data, cert_chain),
        AttestationEnvelope::Google { .. } => unreachable!("fixture is an Apple envelope"),
    }
}

pub(crate) fn fixture_auth_data() -> Vec<u8> {
    fixture_envelope().0
}

pub(crate) fn fixture_cert_chain() -> Vec<Vec<u8>> {
    fixture_envelope().1
}

/// Assembles a synthetic authenticator data blob from its sub-ranges.
pub(crate) fn build_auth_data(
    rp_id_hash: &[u8; 32],
    counter: u32,
    aaguid: &[u8; 16],
    credential_id: &[u8],
) -> Vec<u8> {
    let mut blob = Vec::with_capacity(55 + credential_id.len());
    blob.extend_from_slice(rp_id_hash);
    blob.push(0x40); // attested credential data present
    blob.extend_from_slice(&counter.to_be_bytes());
    blob.extend_from_slice(aaguid);
    blob.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
    blob.extend_from_slice(credential_id);
    blob
}
