//! Test utilities module for shared test initialization
//!
//! Centralized setup so every test sees the same environment
//! configuration and an initialized cache store.

use std::sync::Once;

/// Loads test environment variables (`.env_test`, falling back to `.env`)
/// once per process and makes sure the cache store global is initialized.
pub(crate) async fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }
    });

    if let Err(e) = crate::storage::init().await {
        eprintln!("Warning: Failed to initialize cache store: {e}");
    }
}
