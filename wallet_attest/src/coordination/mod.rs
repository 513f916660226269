mod attestation;
mod errors;

pub use attestation::{ChallengeResponse, handle_challenge_response, request_attestation_nonce};
pub use errors::CoordinationError;
