use std::{env, sync::LazyLock};

/// The App ID the attestation must be bound to: team identifier plus
/// bundle identifier, e.g. `L796QSLV3E.ca.bc.gov.BCWallet`.
pub(crate) static APPLE_APP_ID: LazyLock<String> =
    LazyLock::new(|| env::var("APPLE_APP_ID").expect("APPLE_APP_ID must be set"));

/// Pinned PEM for the App Attest root CA. When unset the root is fetched
/// from `APPLE_ATTESTATION_ROOT_CA_URL` at startup instead.
pub(super) static APPLE_ATTESTATION_ROOT_CA_PEM: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("APPLE_ATTESTATION_ROOT_CA_PEM").ok());

pub(super) static APPLE_ATTESTATION_ROOT_CA_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("APPLE_ATTESTATION_ROOT_CA_URL").unwrap_or_else(|_| {
        "https://www.apple.com/certificateauthority/Apple_App_Attestation_Root_CA.pem".to_string()
    })
});

/// Android application package name expected in integrity verdicts.
pub(crate) static GOOGLE_PACKAGE_NAME: LazyLock<String> =
    LazyLock::new(|| env::var("GOOGLE_PACKAGE_NAME").expect("GOOGLE_PACKAGE_NAME must be set"));

/// Accept apps Play does not recognize (sideloaded test builds).
pub(super) static GOOGLE_ALLOW_UNRECOGNIZED_APPS: LazyLock<bool> = LazyLock::new(|| {
    env::var("GOOGLE_ALLOW_UNRECOGNIZED_APPS").map_or(false, |v| match v.to_lowercase().as_str() {
        "true" => true,
        "false" => false,
        invalid => {
            tracing::warn!(
                "Invalid GOOGLE_ALLOW_UNRECOGNIZED_APPS: {}. Using default 'false'",
                invalid
            );
            false
        }
    })
});

/// Path to the Google service-account key JSON used to authenticate
/// against the Play Integrity decode endpoint.
pub(super) static GOOGLE_AUTH_JSON_PATH: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("GOOGLE_AUTH_JSON_PATH").ok());

pub(super) static PLAY_INTEGRITY_BASE_URL: LazyLock<String> = LazyLock::new(|| {
    let url = env::var("PLAY_INTEGRITY_BASE_URL")
        .unwrap_or_else(|_| "https://playintegrity.googleapis.com/v1".to_string());
    if url::Url::parse(&url).is_err() {
        panic!("PLAY_INTEGRITY_BASE_URL is not a valid URL: {url}");
    }
    url
});

/// Timeout in seconds for outbound calls (root CA fetch, token exchange,
/// integrity decode). Timeouts surface as transient errors.
pub(super) static ATTEST_HTTP_TIMEOUT: LazyLock<u64> = LazyLock::new(|| {
    env::var("ATTEST_HTTP_TIMEOUT")
        .map(|v| v.parse::<u64>().unwrap_or(30))
        .unwrap_or(30)
});
