use base64::{Engine as _, engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::SecureRandom;

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

/// Decodes standard (non-url-safe) base64, the encoding mobile platforms
/// use for attestation payloads and key identifiers.
pub(crate) fn base64_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    let decoded = STANDARD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64".to_string()))?;
    Ok(decoded)
}

pub fn gen_random_string(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf)
        .map_err(|_| UtilError::Crypto("Failed to generate random string".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}
