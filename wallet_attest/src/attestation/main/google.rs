use serde::Deserialize;
use serde_json::json;

use crate::attestation::config::{
    GOOGLE_ALLOW_UNRECOGNIZED_APPS, GOOGLE_AUTH_JSON_PATH, GOOGLE_PACKAGE_NAME,
    PLAY_INTEGRITY_BASE_URL,
};
use crate::attestation::errors::AttestationError;

use super::core::http_client;
use super::service_account::ServiceAccountTokenSource;

const MEETS_DEVICE_INTEGRITY: &str = "MEETS_DEVICE_INTEGRITY";
const PLAY_RECOGNIZED: &str = "PLAY_RECOGNIZED";

/// Decoded Play Integrity verdict, as returned by the
/// `decodeIntegrityToken` endpoint.
///
/// Fields the predicate needs are optional at the serde layer: Google
/// omits sections it could not evaluate, and an absent field must read as
/// a failed conjunct rather than a deserialization error.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IntegrityVerdict {
    #[serde(rename = "tokenPayloadExternal")]
    pub(crate) token_payload_external: TokenPayloadExternal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenPayloadExternal {
    #[serde(rename = "requestDetails", default)]
    pub(crate) request_details: RequestDetails,
    #[serde(rename = "appIntegrity", default)]
    pub(crate) app_integrity: AppIntegrity,
    #[serde(rename = "deviceIntegrity", default)]
    pub(crate) device_integrity: DeviceIntegrity,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RequestDetails {
    #[serde(default)]
    pub(crate) nonce: Option<String>,
    #[serde(rename = "requestPackageName", default)]
    pub(crate) request_package_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AppIntegrity {
    #[serde(rename = "appRecognitionVerdict", default)]
    pub(crate) app_recognition_verdict: Option<String>,
    #[serde(rename = "packageName", default)]
    pub(crate) package_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DeviceIntegrity {
    #[serde(rename = "deviceRecognitionVerdict", default)]
    pub(crate) device_recognition_verdict: Vec<String>,
}

/// Verifies Play Integrity tokens by submitting them to Google's decode
/// endpoint and evaluating the returned verdict.
pub struct IntegrityTokenVerifier {
    client: reqwest::Client,
    token_source: ServiceAccountTokenSource,
}

impl IntegrityTokenVerifier {
    /// Builds a verifier from environment configuration: shared HTTP
    /// client with the configured timeout, service-account token source
    /// read from `GOOGLE_AUTH_JSON_PATH`.
    pub fn from_config() -> Result<Self, AttestationError> {
        let client = http_client()?;

        let path = GOOGLE_AUTH_JSON_PATH.as_ref().ok_or_else(|| {
            AttestationError::Transient("GOOGLE_AUTH_JSON_PATH is not set".to_string())
        })?;

        let token_source = ServiceAccountTokenSource::from_file(path, client.clone())?;

        Ok(Self::with_token_source(client, token_source))
    }

    pub(crate) fn with_token_source(
        client: reqwest::Client,
        token_source: ServiceAccountTokenSource,
    ) -> Self {
        Self {
            client,
            token_source,
        }
    }

    /// Decodes the opaque token and evaluates the verdict against the
    /// expected nonce. Service trouble is `Transient`; a verdict that
    /// fails the predicate is `VerdictRejected`.
    pub(crate) async fn verify(
        &self,
        token: &str,
        expected_nonce: &str,
    ) -> Result<(), AttestationError> {
        let verdict = self.decode_integrity_token(token).await?;

        evaluate_verdict(
            &verdict,
            expected_nonce,
            &GOOGLE_PACKAGE_NAME,
            *GOOGLE_ALLOW_UNRECOGNIZED_APPS,
        )
    }

    /// Submits the opaque token for decoding on Google's servers.
    async fn decode_integrity_token(
        &self,
        token: &str,
    ) -> Result<IntegrityVerdict, AttestationError> {
        let access_token = self.token_source.access_token().await?;

        let url = format!(
            "{}/{}:decodeIntegrityToken",
            PLAY_INTEGRITY_BASE_URL.as_str(),
            GOOGLE_PACKAGE_NAME.as_str()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({ "integrityToken": token }))
            .send()
            .await
            .map_err(|e| {
                AttestationError::Transient(format!("Integrity decode request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttestationError::Transient(format!(
                "Integrity decode returned status {status}"
            )));
        }

        let response_body = response.text().await.map_err(|e| {
            AttestationError::Transient(format!("Failed to read integrity decode response: {e}"))
        })?;

        tracing::debug!("Integrity decode response body: {:#?}", response_body);

        let verdict: IntegrityVerdict = serde_json::from_str(&response_body).map_err(|e| {
            AttestationError::Transient(format!("Failed to deserialize integrity verdict: {e}"))
        })?;

        Ok(verdict)
    }
}

/// The acceptance predicate over a decoded verdict. All conjuncts must
/// hold; the first miss rejects with internal detail for the logs.
pub(crate) fn evaluate_verdict(
    verdict: &IntegrityVerdict,
    expected_nonce: &str,
    package_name: &str,
    allow_unrecognized_apps: bool,
) -> Result<(), AttestationError> {
    let payload = &verdict.token_payload_external;

    if payload.request_details.nonce.as_deref() != Some(expected_nonce) {
        return Err(AttestationError::VerdictRejected(
            "Verdict nonce does not match the issued challenge".to_string(),
        ));
    }

    if payload.request_details.request_package_name.as_deref() != Some(package_name) {
        return Err(AttestationError::VerdictRejected(format!(
            "Unexpected request package name: {:?}",
            payload.request_details.request_package_name
        )));
    }

    if payload.app_integrity.package_name.as_deref() != Some(package_name) {
        return Err(AttestationError::VerdictRejected(format!(
            "Unexpected app package name: {:?}",
            payload.app_integrity.package_name
        )));
    }

    if !payload
        .device_integrity
        .device_recognition_verdict
        .iter()
        .any(|v| v == MEETS_DEVICE_INTEGRITY)
    {
        return Err(AttestationError::VerdictRejected(format!(
            "Device integrity not met: {:?}",
            payload.device_integrity.device_recognition_verdict
        )));
    }

    let app_recognized =
        payload.app_integrity.app_recognition_verdict.as_deref() == Some(PLAY_RECOGNIZED);
    if !app_recognized {
        if allow_unrecognized_apps {
            tracing::warn!(
                "Accepting unrecognized app build: {:?}",
                payload.app_integrity.app_recognition_verdict
            );
        } else {
            return Err(AttestationError::VerdictRejected(format!(
                "App not recognized by Play: {:?}",
                payload.app_integrity.app_recognition_verdict
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PACKAGE: &str = "com.example.wallet";
    const NONCE: &str = "expected-nonce-value";

    fn verdict_json() -> serde_json::Value {
        json!({
            "tokenPayloadExternal": {
                "requestDetails": {
                    "requestPackageName": PACKAGE,
                    "nonce": NONCE,
                    "timestampMillis": "1705000000000"
                },
                "appIntegrity": {
                    "appRecognitionVerdict": "PLAY_RECOGNIZED",
                    "packageName": PACKAGE,
                    "certificateSha256Digest": ["6a6a1474b5cbbb2b1aa57e0bc3"],
                    "versionCode": "42"
                },
                "deviceIntegrity": {
                    "deviceRecognitionVerdict": ["MEETS_DEVICE_INTEGRITY"]
                },
                "accountDetails": {
                    "appLicensingVerdict": "LICENSED"
                }
            }
        })
    }

    fn parse_verdict(value: serde_json::Value) -> IntegrityVerdict {
        serde_json::from_value(value).expect("verdict JSON should deserialize")
    }

    #[test]
    fn test_valid_verdict_passes() {
        let verdict = parse_verdict(verdict_json());
        assert!(evaluate_verdict(&verdict, NONCE, PACKAGE, false).is_ok());
    }

    #[test]
    fn test_nonce_mismatch_rejected() {
        let verdict = parse_verdict(verdict_json());

        match evaluate_verdict(&verdict, "some-other-nonce", PACKAGE, false) {
            Err(AttestationError::VerdictRejected(msg)) => {
                assert!(msg.contains("nonce"));
            }
            other => panic!("Expected VerdictRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_nonce_rejected() {
        let mut value = verdict_json();
        value["tokenPayloadExternal"]["requestDetails"]
            .as_object_mut()
            .unwrap()
            .remove("nonce");
        let verdict = parse_verdict(value);

        assert!(evaluate_verdict(&verdict, NONCE, PACKAGE, false).is_err());
    }

    #[test]
    fn test_request_package_name_mismatch_rejected() {
        let mut value = verdict_json();
        value["tokenPayloadExternal"]["requestDetails"]["requestPackageName"] =
            json!("com.example.impostor");
        let verdict = parse_verdict(value);

        assert!(evaluate_verdict(&verdict, NONCE, PACKAGE, false).is_err());
    }

    #[test]
    fn test_app_package_name_mismatch_rejected() {
        let mut value = verdict_json();
        value["tokenPayloadExternal"]["appIntegrity"]["packageName"] =
            json!("com.example.impostor");
        let verdict = parse_verdict(value);

        assert!(evaluate_verdict(&verdict, NONCE, PACKAGE, false).is_err());
    }

    #[test]
    fn test_device_integrity_not_met_rejected() {
        let mut value = verdict_json();
        value["tokenPayloadExternal"]["deviceIntegrity"]["deviceRecognitionVerdict"] =
            json!(["MEETS_BASIC_INTEGRITY"]);
        let verdict = parse_verdict(value);

        match evaluate_verdict(&verdict, NONCE, PACKAGE, false) {
            Err(AttestationError::VerdictRejected(msg)) => {
                assert!(msg.contains("Device integrity"));
            }
            other => panic!("Expected VerdictRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_superset_of_device_verdicts_passes() {
        let mut value = verdict_json();
        value["tokenPayloadExternal"]["deviceIntegrity"]["deviceRecognitionVerdict"] = json!([
            "MEETS_BASIC_INTEGRITY",
            "MEETS_DEVICE_INTEGRITY",
            "MEETS_STRONG_INTEGRITY"
        ]);
        let verdict = parse_verdict(value);

        assert!(evaluate_verdict(&verdict, NONCE, PACKAGE, false).is_ok());
    }

    #[test]
    fn test_unrecognized_app_rejected_by_default() {
        let mut value = verdict_json();
        value["tokenPayloadExternal"]["appIntegrity"]["appRecognitionVerdict"] =
            json!("UNRECOGNIZED_VERSION");
        let verdict = parse_verdict(value);

        assert!(evaluate_verdict(&verdict, NONCE, PACKAGE, false).is_err());
    }

    #[test]
    fn test_unrecognized_app_allowed_when_configured() {
        let mut value = verdict_json();
        value["tokenPayloadExternal"]["appIntegrity"]["appRecognitionVerdict"] =
            json!("UNRECOGNIZED_VERSION");
        let verdict = parse_verdict(value);

        assert!(evaluate_verdict(&verdict, NONCE, PACKAGE, true).is_ok());
    }

    #[test]
    fn test_verdict_with_absent_sections_deserializes() {
        // Google omits sections it could not evaluate; that must parse and
        // then fail the predicate, not the deserializer
        let value = json!({ "tokenPayloadExternal": {} });
        let verdict = parse_verdict(value);

        assert!(evaluate_verdict(&verdict, NONCE, PACKAGE, false).is_err());
    }

    #[test]
    fn test_malformed_verdict_fails_deserialization() {
        let result: Result<IntegrityVerdict, _> =
            serde_json::from_str("{\"unexpected\": \"shape\"}");
        assert!(result.is_err());
    }
}
