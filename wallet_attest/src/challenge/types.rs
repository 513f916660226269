use serde::{Deserialize, Serialize};

use super::errors::ChallengeError;
use crate::storage::CacheData;

/// A server-issued nonce awaiting its attestation response.
///
/// At most one lives per session key; issuing a new challenge for the
/// same key overwrites the previous record.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub(crate) struct StoredChallenge {
    pub(crate) nonce: String,
    pub(crate) created_at: u64,
    pub(crate) ttl: u64,
}

impl From<StoredChallenge> for CacheData {
    fn from(data: StoredChallenge) -> Self {
        Self {
            value: serde_json::to_string(&data).expect("Failed to serialize StoredChallenge"),
        }
    }
}

impl TryFrom<CacheData> for StoredChallenge {
    type Error = ChallengeError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value).map_err(|e| ChallengeError::Storage(e.to_string()))
    }
}
