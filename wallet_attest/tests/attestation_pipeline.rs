//! End-to-end exercises of the attestation exchange through the crate's
//! public surface: challenge issuance, verification, denial paths, and
//! replay protection.

use std::sync::Arc;

use serial_test::serial;
use wallet_attest::{
    AttestationRequest, AttestationVerifier, ChallengeResponse, CoordinationError, Platform,
    RejectionReason, RootCertificateCache, TrustedRoot, VerificationResult,
    handle_challenge_response, request_attestation_nonce, take_challenge,
};

/// Real App Attest envelope captured from a development device.
const APP_ATTEST_FIXTURE_B64: &str = include_str!("data/app_attest_fixture.b64");

/// Key identifier registered for the fixture's credential key.
const FIXTURE_KEY_ID: &str = "G3ef9pHt9N4DxUjo/hli9tV5gGDKaD3Ue7K8cqeN/r8=";

/// App Attest root CA anchoring the fixture chain.
const APPLE_ROOT_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
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

async fn setup() {
    dotenvy::from_filename(".env_test").ok();
    wallet_attest::init().await.expect("init should succeed");
}

fn fixture_verifier() -> AttestationVerifier {
    let root = TrustedRoot::from_pem(APPLE_ROOT_CA_PEM.as_bytes()).expect("root PEM should parse");
    AttestationVerifier::new(Arc::new(root), None)
}

fn apple_challenge_response() -> ChallengeResponse {
    ChallengeResponse {
        platform: Platform::Apple,
        attestation_object: APP_ATTEST_FIXTURE_B64.trim().to_string(),
        key_id: Some(FIXTURE_KEY_ID.to_string()),
    }
}

#[tokio::test]
#[serial]
async fn full_exchange_with_stale_attestation_is_denied() {
    setup().await;
    let verifier = fixture_verifier();

    // The fixture is a genuine attestation, but it was bound to a
    // challenge this server never issued: decode and chain validation
    // pass, nonce binding rejects, and the caller sees only the uniform
    // denial
    request_attestation_nonce("it-session-1").await.unwrap();
    let result = handle_challenge_response("it-session-1", &apple_challenge_response(), &verifier).await;

    match result {
        Err(CoordinationError::AttestationDenied) => {}
        other => panic!("Expected AttestationDenied, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn exchange_without_issued_challenge_is_denied() {
    setup().await;
    let verifier = fixture_verifier();

    let result =
        handle_challenge_response("it-session-never-issued", &apple_challenge_response(), &verifier)
            .await;

    assert!(matches!(result, Err(CoordinationError::AttestationDenied)));
}

#[tokio::test]
#[serial]
async fn challenge_is_consumed_by_the_exchange() {
    setup().await;
    let verifier = fixture_verifier();

    request_attestation_nonce("it-session-replay").await.unwrap();

    let first =
        handle_challenge_response("it-session-replay", &apple_challenge_response(), &verifier)
            .await;
    assert!(first.is_err());

    // The nonce is gone: a replay cannot even reach verification
    assert!(take_challenge("it-session-replay").await.is_err());
}

#[tokio::test]
#[serial]
async fn facade_reports_nonce_mismatch_for_wrong_challenge() {
    setup().await;
    let verifier = fixture_verifier();

    let request = AttestationRequest {
        platform: Platform::Apple,
        payload: APP_ATTEST_FIXTURE_B64.trim().to_string(),
        key_identifier: Some(FIXTURE_KEY_ID.to_string()),
        nonce: "challenge-the-device-never-saw".to_string(),
    };

    let result = verifier.verify(&request).await;
    assert_eq!(
        result,
        VerificationResult::Invalid(RejectionReason::NonceMismatch)
    );
}

#[tokio::test]
#[serial]
async fn facade_reports_malformed_for_undecodable_payload() {
    setup().await;
    let verifier = fixture_verifier();

    for bad_payload in ["", "!!!", "AAAA", "bm90IGNib3IgYXQgYWxs"] {
        let request = AttestationRequest {
            platform: Platform::Apple,
            payload: bad_payload.to_string(),
            key_identifier: Some(FIXTURE_KEY_ID.to_string()),
            nonce: "challenge".to_string(),
        };

        match verifier.verify(&request).await {
            VerificationResult::Invalid(RejectionReason::Malformed(_)) => {}
            other => panic!("Expected Malformed for {bad_payload:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
#[serial]
async fn challenge_response_wire_format() {
    setup().await;

    let parsed: ChallengeResponse = serde_json::from_str(
        r#"{
            "platform": "apple",
            "attestation_object": "b2JqZWN0",
            "key_id": "a2V5"
        }"#,
    )
    .unwrap();
    assert_eq!(parsed.platform, Platform::Apple);
    assert_eq!(parsed.key_id.as_deref(), Some("a2V5"));

    // key_id is optional on the wire (Google responses omit it)
    let parsed: ChallengeResponse = serde_json::from_str(
        r#"{"platform": "google", "attestation_object": "token"}"#,
    )
    .unwrap();
    assert_eq!(parsed.platform, Platform::Google);
    assert!(parsed.key_id.is_none());

    // Unknown platforms fail at the deserialization boundary
    let unknown: Result<ChallengeResponse, _> = serde_json::from_str(
        r#"{"platform": "symbian", "attestation_object": "token"}"#,
    );
    assert!(unknown.is_err());
}

#[tokio::test]
#[serial]
async fn root_cache_refresh_does_not_disturb_verifiers() {
    setup().await;

    let cache = RootCertificateCache::new(
        TrustedRoot::from_pem(APPLE_ROOT_CA_PEM.as_bytes()).unwrap(),
    );

    // A verifier built before the refresh keeps its root and still
    // produces the same outcome afterwards
    let verifier = AttestationVerifier::new(cache.current(), None);
    let request = AttestationRequest {
        platform: Platform::Apple,
        payload: APP_ATTEST_FIXTURE_B64.trim().to_string(),
        key_identifier: Some(FIXTURE_KEY_ID.to_string()),
        nonce: "some-challenge".to_string(),
    };

    let before = verifier.verify(&request).await;
    cache.refresh(TrustedRoot::from_pem(APPLE_ROOT_CA_PEM.as_bytes()).unwrap());
    let after = verifier.verify(&request).await;

    assert_eq!(before, after);

    let rebuilt = AttestationVerifier::new(cache.current(), None);
    assert_eq!(rebuilt.verify(&request).await, before);
}
