use std::sync::LazyLock;
use std::time::SystemTime;

mod errors;
mod types;

pub use errors::ChallengeError;
use types::StoredChallenge;

use crate::storage::{CacheData, GENERIC_CACHE_STORE};
use crate::utils::gen_random_string;

const CHALLENGE_CACHE_PREFIX: &str = "attest_challenge";

/// Seconds a challenge may sit unanswered before it expires.
pub(crate) static CHALLENGE_TTL: LazyLock<u64> = LazyLock::new(|| {
    std::env::var("ATTEST_CHALLENGE_TTL")
        .map(|v| v.parse::<u64>().unwrap_or(600))
        .unwrap_or(600)
});

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Generates and stores a fresh one-time challenge for a session.
///
/// Any live challenge for the same key is overwritten, so a session never
/// has more than one nonce outstanding.
pub async fn issue_challenge(session_key: &str) -> Result<String, ChallengeError> {
    let nonce = gen_random_string(32)?;

    let stored = StoredChallenge {
        nonce: nonce.clone(),
        created_at: unix_now(),
        ttl: *CHALLENGE_TTL,
    };

    GENERIC_CACHE_STORE
        .lock()
        .await
        .put_with_ttl(
            CHALLENGE_CACHE_PREFIX,
            session_key,
            stored.into(),
            *CHALLENGE_TTL as usize,
        )
        .await
        .map_err(|e| ChallengeError::Storage(e.to_string()))?;

    tracing::debug!("Issued attestation challenge for session {}", session_key);

    Ok(nonce)
}

/// Consumes the stored challenge for a session (read-once).
///
/// The record is removed whether or not it is still fresh; a second call
/// for the same key always fails with `NotFound`.
pub async fn take_challenge(session_key: &str) -> Result<String, ChallengeError> {
    let data: Option<CacheData> = GENERIC_CACHE_STORE
        .lock()
        .await
        .get(CHALLENGE_CACHE_PREFIX, session_key)
        .await
        .map_err(|e| ChallengeError::Storage(e.to_string()))?;

    let stored: StoredChallenge = data
        .ok_or_else(|| ChallengeError::NotFound(session_key.to_string()))?
        .try_into()?;

    remove_challenge(session_key).await?;

    let age = unix_now().saturating_sub(stored.created_at);
    if age > stored.ttl {
        tracing::warn!(
            "Challenge for session {} expired after {} seconds (ttl: {})",
            session_key,
            age,
            stored.ttl
        );
        return Err(ChallengeError::Expired(session_key.to_string()));
    }

    Ok(stored.nonce)
}

async fn remove_challenge(session_key: &str) -> Result<(), ChallengeError> {
    GENERIC_CACHE_STORE
        .lock()
        .await
        .remove(CHALLENGE_CACHE_PREFIX, session_key)
        .await
        .map_err(|e| ChallengeError::Storage(e.to_string()))
}
